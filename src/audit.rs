use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::engine::EngineError;
use crate::limits::MAX_AUDIT_ENTRIES;

/// One recorded operation: who did what, when, and how it came out.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub login: String,
    pub action: &'static str,
    pub detail: String,
    /// `None` on success, the error text otherwise.
    pub error: Option<String>,
}

/// Bounded in-memory audit trail. Oldest entries fall off the front.
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock().expect("audit log poisoned");
        if entries.len() == MAX_AUDIT_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The `n` most recent entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock().expect("audit log poisoned");
        entries.iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `op`, record one audit entry with its outcome, and pass the result
/// through unchanged. This is the logging-around-a-call seam: composed at
/// the call site instead of woven in as advice.
pub async fn audited<T, F>(
    log: &AuditLog,
    login: &str,
    action: &'static str,
    detail: String,
    op: F,
) -> Result<T, EngineError>
where
    F: std::future::Future<Output = Result<T, EngineError>>,
{
    let started = Instant::now();
    let result = op.await;
    let error = result.as_ref().err().map(|e| e.to_string());

    let status = if error.is_none() { "ok" } else { "error" };
    metrics::counter!(
        crate::observability::OPERATIONS_TOTAL,
        "action" => action,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        crate::observability::OPERATION_DURATION_SECONDS,
        "action" => action
    )
    .record(started.elapsed().as_secs_f64());

    match &error {
        None => tracing::info!(login, action, detail = %detail, "ok"),
        Some(e) => tracing::warn!(login, action, detail = %detail, error = %e, "failed"),
    }

    log.record(AuditEntry {
        at: Utc::now(),
        login: login.to_string(),
        action,
        detail,
        error,
    });

    result
}
