pub mod context;
pub mod store;

pub use context::{ExpiryOutcome, SessionContext, SessionSnapshot};
pub use store::{Credential, CredentialStore, FileStore, MemoryStore};
