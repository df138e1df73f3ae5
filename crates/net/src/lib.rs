//! Per-connection role state machines and the dispatcher (C6, C7, §4.4,
//! §4.8).

pub mod creator;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod reader;
pub mod session;
pub mod subscriber;
pub mod writer;

pub use creator::CreatorSession;
pub use directory::CapsuleDirectory;
pub use dispatch::dispatch;
pub use error::SessionError;
pub use reader::ReaderSession;
pub use session::Session;
pub use subscriber::SubscriberSession;
pub use writer::WriterSession;
