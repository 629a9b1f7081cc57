use std::sync::Arc;

use crate::audit::{audited, AuditEntry, AuditLog};
use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::session::{Caller, Identity};

#[derive(Debug)]
pub enum ServiceError {
    /// Token missing/expired, or the caller lacks the admin role.
    Unauthorized,
    Engine(EngineError),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Unauthorized => write!(f, "unauthorized"),
            ServiceError::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<EngineError> for ServiceError {
    fn from(e: EngineError) -> Self {
        ServiceError::Engine(e)
    }
}

/// Token-validating facade over the engine: what a transport layer (HTTP,
/// CLI) calls. It owns none of the booking logic; it resolves the caller,
/// wraps mutations in the audit trail, and passes typed outcomes through.
pub struct BookingService {
    engine: Arc<Engine>,
    identity: Arc<dyn Identity>,
    audit: Arc<AuditLog>,
}

impl BookingService {
    pub fn new(engine: Arc<Engine>, identity: Arc<dyn Identity>, audit: Arc<AuditLog>) -> Self {
        Self {
            engine,
            identity,
            audit,
        }
    }

    async fn caller(&self, token: &str) -> Result<Caller, ServiceError> {
        self.identity
            .authenticate(token)
            .await
            .ok_or(ServiceError::Unauthorized)
    }

    async fn admin(&self, token: &str) -> Result<Caller, ServiceError> {
        let caller = self.caller(token).await?;
        if !caller.is_admin {
            return Err(ServiceError::Unauthorized);
        }
        Ok(caller)
    }

    // ── Bookings ─────────────────────────────────────────

    pub async fn reserve(
        &self,
        token: &str,
        space_name: &str,
        range: BookingRange,
    ) -> Result<BookingId, ServiceError> {
        let caller = self.caller(token).await?;
        let detail = format!("{space_name} {range}");
        Ok(audited(
            &self.audit,
            &caller.login,
            "reserve",
            detail,
            self.engine.reserve(&caller.login, space_name, range),
        )
        .await?)
    }

    pub async fn cancel(&self, token: &str, id: BookingId) -> Result<(), ServiceError> {
        let caller = self.caller(token).await?;
        Ok(audited(
            &self.audit,
            &caller.login,
            "cancel",
            id.to_string(),
            self.engine.cancel(&caller.login, id, caller.is_admin),
        )
        .await?)
    }

    pub async fn my_bookings(&self, token: &str) -> Result<Vec<BookingInfo>, ServiceError> {
        let caller = self.caller(token).await?;
        Ok(self.engine.bookings_for_user(&caller.login).await)
    }

    // ── Browsing ─────────────────────────────────────────

    pub async fn spaces(&self, token: &str) -> Result<Vec<SpaceInfo>, ServiceError> {
        self.caller(token).await?;
        Ok(self.engine.list_spaces().await)
    }

    pub async fn available_slots(
        &self,
        token: &str,
        space_name: &str,
    ) -> Result<Vec<DayFreeSlots>, ServiceError> {
        self.caller(token).await?;
        Ok(self.engine.list_available_slots(space_name).await?)
    }

    pub async fn is_range_available(
        &self,
        token: &str,
        space_name: &str,
        range: &BookingRange,
    ) -> Result<bool, ServiceError> {
        self.caller(token).await?;
        Ok(self.engine.is_range_available(space_name, range).await?)
    }

    // ── Administration ───────────────────────────────────

    pub async fn create_space(
        &self,
        token: &str,
        name: &str,
        begin_hour: Hour,
        end_hour: Hour,
        days: u16,
    ) -> Result<(), ServiceError> {
        let caller = self.admin(token).await?;
        let detail = format!("{name} {begin_hour:02}:00–{end_hour:02}:00 {days}d");
        Ok(audited(
            &self.audit,
            &caller.login,
            "create_space",
            detail,
            self.engine.create_space(name, begin_hour, end_hour, days),
        )
        .await?)
    }

    pub async fn delete_space(&self, token: &str, name: &str) -> Result<(), ServiceError> {
        let caller = self.admin(token).await?;
        Ok(audited(
            &self.audit,
            &caller.login,
            "delete_space",
            name.to_string(),
            self.engine.delete_space(name),
        )
        .await?)
    }

    pub async fn space_bookings(
        &self,
        token: &str,
        space_name: &str,
    ) -> Result<Vec<BookingInfo>, ServiceError> {
        self.admin(token).await?;
        Ok(self.engine.bookings_for_space(space_name).await?)
    }

    pub async fn audit_trail(
        &self,
        token: &str,
        n: usize,
    ) -> Result<Vec<AuditEntry>, ServiceError> {
        self.admin(token).await?;
        Ok(self.audit.recent(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyHub;
    use crate::session::SessionStore;
    use chrono::{Days, NaiveDate};

    fn test_wal_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("coworkd_test_service");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn day(off: u64) -> NaiveDate {
        crate::engine::today() + Days::new(off)
    }

    struct Fixture {
        service: BookingService,
        sessions: Arc<SessionStore>,
        audit: Arc<AuditLog>,
        admin_token: String,
        alice_token: String,
    }

    fn fixture(name: &str) -> Fixture {
        let engine = Arc::new(
            Engine::new(test_wal_path(name), Arc::new(NotifyHub::new())).unwrap(),
        );
        let sessions = Arc::new(SessionStore::new(chrono::Duration::minutes(30)));
        let audit = Arc::new(AuditLog::new());
        let service = BookingService::new(
            engine,
            sessions.clone() as Arc<dyn Identity>,
            audit.clone(),
        );
        let admin_token = sessions.issue("root", true).unwrap();
        let alice_token = sessions.issue("alice", false).unwrap();
        Fixture {
            service,
            sessions,
            audit,
            admin_token,
            alice_token,
        }
    }

    #[tokio::test]
    async fn bad_token_is_unauthorized() {
        let fx = fixture("svc_bad_token.wal");
        let result = fx.service.spaces("bogus").await;
        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[tokio::test]
    async fn space_management_requires_admin() {
        let fx = fixture("svc_admin_only.wal");
        let result = fx
            .service
            .create_space(&fx.alice_token, "Hall", 8, 18, 5)
            .await;
        assert!(matches!(result, Err(ServiceError::Unauthorized)));

        fx.service
            .create_space(&fx.admin_token, "Hall", 8, 18, 5)
            .await
            .unwrap();
        let result = fx.service.delete_space(&fx.alice_token, "Hall").await;
        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[tokio::test]
    async fn booking_flow_runs_under_the_callers_login() {
        let fx = fixture("svc_flow.wal");
        fx.service
            .create_space(&fx.admin_token, "Hall", 8, 18, 5)
            .await
            .unwrap();

        let range = BookingRange::single_day(day(0), 9, 11);
        let id = fx.service.reserve(&fx.alice_token, "Hall", range).await.unwrap();

        let mine = fx.service.my_bookings(&fx.alice_token).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].login, "alice");

        // bob cannot cancel alice's booking through the facade either.
        let bob_token = fx.sessions.issue("bob", false).unwrap();
        let result = fx.service.cancel(&bob_token, id).await;
        assert!(matches!(
            result,
            Err(ServiceError::Engine(EngineError::BookingNotFound(_)))
        ));

        fx.service.cancel(&fx.alice_token, id).await.unwrap();
        assert!(fx
            .service
            .is_range_available(&fx.alice_token, "Hall", &range)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn admin_cancel_overrides_ownership() {
        let fx = fixture("svc_admin_cancel.wal");
        fx.service
            .create_space(&fx.admin_token, "Hall", 8, 18, 5)
            .await
            .unwrap();
        let range = BookingRange::single_day(day(0), 9, 11);
        let id = fx.service.reserve(&fx.alice_token, "Hall", range).await.unwrap();

        fx.service.cancel(&fx.admin_token, id).await.unwrap();
        assert!(fx.service.my_bookings(&fx.alice_token).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mutations_land_in_the_audit_trail() {
        let fx = fixture("svc_audit.wal");
        fx.service
            .create_space(&fx.admin_token, "Hall", 8, 18, 5)
            .await
            .unwrap();
        let range = BookingRange::single_day(day(0), 9, 11);
        fx.service.reserve(&fx.alice_token, "Hall", range).await.unwrap();
        // A failed reserve is audited too.
        let _ = fx.service.reserve(&fx.alice_token, "Hall", range).await;

        let trail = fx.service.audit_trail(&fx.admin_token, 10).await.unwrap();
        assert_eq!(trail.len(), 3);
        assert_eq!(trail[0].action, "reserve");
        assert!(trail[0].error.is_some());
        assert_eq!(trail[1].action, "reserve");
        assert!(trail[1].error.is_none());
        assert_eq!(trail[2].action, "create_space");
        assert_eq!(trail[2].login, "root");

        // Reads are not audited, and non-admins cannot read the trail.
        assert_eq!(fx.audit.len(), 3);
        let result = fx.service.audit_trail(&fx.alice_token, 10).await;
        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[tokio::test]
    async fn invalidated_session_loses_access() {
        let fx = fixture("svc_logout.wal");
        fx.sessions.invalidate(&fx.alice_token);
        let result = fx.service.my_bookings(&fx.alice_token).await;
        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }
}
