//! System Log Entity
//!
//! A durable tail of `tracing` events, captured by a custom subscriber layer
//! so `logs:list(filters)` can read from storage instead of a log transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "log_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

/// A single captured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemLogRow {
    id: Uuid,
    level: LogLevel,
    target: String,
    message: String,
    ts: DateTime<Utc>,
}

impl SystemLogRow {
    pub fn new(level: LogLevel, target: String, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            target,
            message,
            ts: Utc::now(),
        }
    }

    pub fn from_db(id: Uuid, level: LogLevel, target: String, message: String, ts: DateTime<Utc>) -> Self {
        Self {
            id,
            level,
            target,
            message,
            ts,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn ts(&self) -> DateTime<Utc> {
        self.ts
    }
}
