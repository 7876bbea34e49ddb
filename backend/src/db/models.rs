//! Session records as stored and exchanged with the session service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id_type;
use crate::models::ScheduleResult;

define_id_type!(i64, SessionId);

/// Listing entry for a saved session. Never carries the result itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub academic_year: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub resident_count: usize,
}

/// A full snapshot: the summary plus the stored solver response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub api_response: ScheduleResult,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.summary.id
    }

    pub fn name(&self) -> &str {
        &self.summary.name
    }
}

/// Payload for creating a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub name: String,
    pub api_response: ScheduleResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewSession {
    pub fn new(name: impl Into<String>, api_response: ScheduleResult) -> Self {
        Self {
            name: name.into(),
            api_response,
            academic_year: None,
            notes: None,
        }
    }

    pub fn with_academic_year(mut self, academic_year: Option<String>) -> Self {
        self.academic_year = academic_year;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_response: Option<ScheduleResult>,
}

impl SessionUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.notes.is_none()
            && self.academic_year.is_none()
            && self.api_response.is_none()
    }
}
