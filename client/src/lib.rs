pub mod config;
pub mod console;
pub mod error;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use error::ClientError;
pub use session::{Session, SessionEvent};
pub use transport::WsTransport;
