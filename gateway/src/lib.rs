// Library exports for the gateway binary and integration tests

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod navigation;
pub mod notify;
pub mod request;
pub mod session;
pub mod stream;
pub mod transport;

pub use config::GatewayConfig;
pub use error::{ErrorKind, GatewayError, Result, SESSION_EXPIRED_MESSAGE};
pub use gateway::{ApiResponse, Gateway, GatewayBuilder};
pub use navigation::Navigator;
pub use notify::{Notice, NoticeLevel, Notifier};
pub use request::{ContentType, FilePart, MultipartForm, RequestDescriptor};
pub use session::{Credential, CredentialStore, ExpiryOutcome, SessionContext};
pub use stream::{CloseReason, EventHandler, StreamCallbacks, StreamHandle};
pub use transport::Transport;
