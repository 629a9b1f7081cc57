//! Input bounds enforced at the engine and session-store surfaces.

pub const MAX_SPACES: usize = 4096;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_LOGIN_LEN: usize = 256;
pub const MAX_HORIZON_DAYS: usize = 366;
pub const MAX_AUDIT_ENTRIES: usize = 10_000;
pub const MAX_SESSIONS: usize = 65_536;
