//! Person Entity
//!
//! A person known to the Attendance Store, keyed by an externally-assigned
//! `person_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Lifecycle status of a person record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "person_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PersonStatus {
    Active,
    Inactive,
    Deleted,
}

impl Default for PersonStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A person known to the attendance system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    person_id: String,
    name: String,
    email: Option<String>,
    department: Option<String>,
    position: Option<String>,
    phone: Option<String>,
    status: PersonStatus,
    metadata: Json,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Person {
    /// Creates a new person record.
    pub fn new(person_id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            person_id,
            name,
            email: None,
            department: None,
            position: None,
            phone: None,
            status: PersonStatus::default(),
            metadata: Json::Object(Default::default()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a person from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        person_id: String,
        name: String,
        email: Option<String>,
        department: Option<String>,
        position: Option<String>,
        phone: Option<String>,
        status: PersonStatus,
        metadata: Json,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            person_id,
            name,
            email,
            department,
            position,
            phone,
            status,
            metadata,
            created_at,
            updated_at,
        }
    }

    pub fn person_id(&self) -> &str {
        &self.person_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    pub fn position(&self) -> Option<&str> {
        self.position.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn status(&self) -> PersonStatus {
        self.status
    }

    pub fn metadata(&self) -> &Json {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    pub fn set_email(&mut self, email: Option<String>) {
        self.email = email;
        self.updated_at = Utc::now();
    }

    pub fn set_department(&mut self, department: Option<String>) {
        self.department = department;
        self.updated_at = Utc::now();
    }

    pub fn set_position(&mut self, position: Option<String>) {
        self.position = position;
        self.updated_at = Utc::now();
    }

    pub fn set_phone(&mut self, phone: Option<String>) {
        self.phone = phone;
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: PersonStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn mark_deleted(&mut self) {
        self.set_status(PersonStatus::Deleted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_person_defaults_to_active() {
        let person = Person::new("A1".into(), "Alice".into());
        assert_eq!(person.status(), PersonStatus::Active);
        assert_eq!(person.person_id(), "A1");
    }

    #[test]
    fn mark_deleted_sets_status() {
        let mut person = Person::new("A1".into(), "Alice".into());
        person.mark_deleted();
        assert_eq!(person.status(), PersonStatus::Deleted);
    }
}
