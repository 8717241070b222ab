//! Run-State Entity
//!
//! A single durable record describing whether a source is active and which,
//! consulted exactly once at process start to resume the background loop.

use serde::{Deserialize, Serialize};

/// The kind of transport the active source was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Device,
    Rtsp,
    Http,
    Rtmp,
    File,
}

/// The process-wide run state, persisted at every source/active transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    active: bool,
    source: Option<String>,
    source_type: Option<SourceType>,
}

impl RunState {
    /// The inactive, no-source state.
    pub fn inactive() -> Self {
        Self {
            active: false,
            source: None,
            source_type: None,
        }
    }

    /// An active state bound to a given source.
    pub fn active(source: String, source_type: SourceType) -> Self {
        Self {
            active: true,
            source: Some(source),
            source_type: Some(source_type),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn source_type(&self) -> Option<SourceType> {
        self.source_type
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::inactive()
    }
}
