use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::Serialize;

/// An entry of the daily event log, one JSON object per line on disk. The
/// log is append-only: entries are never rewritten, the whole day is replayed
/// on every load.
///
/// The on-disk schema grew over time. The earliest logs only contain `Start`
/// and `End`, task checkoffs were then recorded as separate `CheckTask`
/// (later `Check`) lines, and current writers attach the checked tasks and an
/// optional note directly to the `End` line. All shapes deserialize into this
/// one type.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "kind")]
pub enum EventEntity {
    Start {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
    End {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        /// Tasks checked during the session this entry closes. `None` on
        /// legacy lines that predate the field.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tasks: Option<BTreeSet<Arc<str>>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<Arc<str>>,
    },
    #[serde(alias = "CheckTask")]
    Check {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        task: Arc<str>,
    },
}

impl EventEntity {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            EventEntity::Start { timestamp }
            | EventEntity::End { timestamp, .. }
            | EventEntity::Check { timestamp, .. } => *timestamp,
        }
    }

    /// Uppercase tag for the entries list, matching the historical display.
    pub fn kind_name(&self) -> &'static str {
        match self {
            EventEntity::Start { .. } => "START",
            EventEntity::End { .. } => "END",
            EventEntity::Check { .. } => "CHECK",
        }
    }
}
