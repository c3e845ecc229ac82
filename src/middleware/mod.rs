pub mod auth;
pub mod fingerprint;
pub mod security;

pub use auth::AdminUser;
pub use fingerprint::SubmitterFingerprint;
