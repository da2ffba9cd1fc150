// Notice Board - transient operator notices
//
// Notices are short-lived toasts: they expire after a fixed time-to-live and
// the board never grows past its capacity.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Normal,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Normal => "normal",
            Severity::High => "high",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: u64,
    pub severity: Severity,
    pub operation: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct NoticeBoard {
    notices: Cache<u64, Notice>,
    next_id: Arc<AtomicU64>,
}

impl NoticeBoard {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            notices: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn raise(
        &self,
        severity: Severity,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Notice {
        let notice = Notice {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            severity,
            operation: operation.into(),
            message: message.into(),
            raised_at: Utc::now(),
        };
        self.notices.insert(notice.id, notice.clone()).await;
        notice
    }

    /// Unexpired notices, newest first
    pub fn recent(&self) -> Vec<Notice> {
        let mut notices: Vec<Notice> = self.notices.iter().map(|(_, notice)| notice).collect();
        notices.sort_by(|a, b| b.id.cmp(&a.id));
        notices
    }
}

impl fmt::Debug for NoticeBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoticeBoard")
            .field("entries", &self.notices.entry_count())
            .finish()
    }
}
