//! Person Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::Person;
use crate::domain::repositories::{PersonRepository, RepoResult, RepositoryError};
use crate::infrastructure::database::models::PersonRow;

/// PostgreSQL person repository.
pub struct PgPersonRepository {
    pool: PgPool,
}

impl PgPersonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_person(r: PersonRow) -> Person {
        Person::from_db(
            r.person_id,
            r.name,
            r.email,
            r.department,
            r.position,
            r.phone,
            r.status,
            r.metadata,
            r.created_at,
            r.updated_at,
        )
    }
}

#[async_trait]
impl PersonRepository for PgPersonRepository {
    async fn find_by_id(&self, person_id: &str) -> RepoResult<Option<Person>> {
        let row: Option<PersonRow> = sqlx::query_as(
            r#"
            SELECT person_id, name, email, department, position, phone,
                   status, metadata, created_at, updated_at
            FROM persons
            WHERE person_id = $1
            "#,
        )
        .bind(person_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_person))
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepoResult<Vec<Person>> {
        let rows: Vec<PersonRow> = sqlx::query_as(
            r#"
            SELECT person_id, name, email, department, position, phone,
                   status, metadata, created_at, updated_at
            FROM persons
            WHERE status != 'deleted'
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::row_to_person).collect())
    }

    async fn save(&self, person: &Person) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO persons (
                person_id, name, email, department, position, phone,
                status, metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(person.person_id())
        .bind(person.name())
        .bind(person.email())
        .bind(person.department())
        .bind(person.position())
        .bind(person.phone())
        .bind(person.status())
        .bind(person.metadata())
        .bind(person.created_at())
        .bind(person.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, person: &Person) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE persons SET
                name = $2,
                email = $3,
                department = $4,
                position = $5,
                phone = $6,
                status = $7,
                metadata = $8,
                updated_at = $9
            WHERE person_id = $1
            "#,
        )
        .bind(person.person_id())
        .bind(person.name())
        .bind(person.email())
        .bind(person.department())
        .bind(person.position())
        .bind(person.phone())
        .bind(person.status())
        .bind(person.metadata())
        .bind(person.updated_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Person {}", person.person_id())));
        }

        Ok(())
    }

    async fn delete(&self, person_id: &str) -> RepoResult<()> {
        let result = sqlx::query(r#"UPDATE persons SET status = 'deleted', updated_at = now() WHERE person_id = $1"#)
            .bind(person_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Person {}", person_id)));
        }

        Ok(())
    }

    async fn count(&self) -> RepoResult<i64> {
        let result: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM persons WHERE status != 'deleted'"#)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }
}
