//! Request-scoping metadata that can travel with a [`QueryStatus`](crate::status::QueryStatus).
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Identifies the request a query ran for and whether it was cancelled.
///
/// Clones share the cancellation flag, so a handle kept by the caller can
/// cancel the request while the status report holds another clone.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    deadline: Option<DateTime<Utc>>,
    cancelled: Arc<AtomicBool>,
}

impl RequestContext {
    /// Creates a context with a fresh random request id and no deadline.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(request_id: Uuid) -> Self {
        RequestContext {
            request_id,
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True when cancelled or when `now` is past the deadline.
    pub fn is_done_at(&self, now: DateTime<Utc>) -> bool {
        self.is_cancelled() || self.deadline.map_or(false, |deadline| now >= deadline)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// `request=<uuid>[ deadline=<rfc3339>][ cancelled]`
impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request={}", self.request_id)?;
        if let Some(deadline) = self.deadline {
            write!(f, " deadline={}", deadline.to_rfc3339())?;
        }
        if self.is_cancelled() {
            f.write_str(" cancelled")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_display() {
        let id = Uuid::nil();
        let deadline = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let ctx = RequestContext::with_id(id).with_deadline(deadline);
        assert_eq!(
            ctx.to_string(),
            "request=00000000-0000-0000-0000-000000000000 deadline=2024-01-02T03:04:05+00:00"
        );

        ctx.clone().cancel();
        assert!(ctx.to_string().ends_with(" cancelled"));
    }

    #[test]
    fn test_done_at_deadline() {
        let now = Utc::now();
        let ctx = RequestContext::new().with_deadline(now + Duration::seconds(5));
        assert!(!ctx.is_done_at(now));
        assert!(ctx.is_done_at(now + Duration::seconds(5)));
    }

    #[test]
    fn test_fresh_ids_differ() {
        assert_ne!(RequestContext::new().request_id(), RequestContext::new().request_id());
    }
}
