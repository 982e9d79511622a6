pub mod auth;
pub mod expiry;

pub use auth::{attach_credentials, mask_token};
pub use expiry::SessionExpiry;
