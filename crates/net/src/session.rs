//! The common `Session` trait every role implements (C6, §4.4), so the
//! dispatcher can hold one `Box<dyn Session>` per connection regardless of
//! which role Init selected.

use std::future::Future;
use std::pin::Pin;

use proto::Message;

use crate::error::SessionError;

pub trait Session: Send {
    /// Handles one request frame. Returns `Ok(None)` for `write()`, which is
    /// fire-and-forget at the protocol level (§10); every other operation
    /// returns `Ok(Some(response))`. Errors that should close the
    /// connection are returned as `Err`; errors the protocol models as a
    /// typed "absent"/"failed" response value are `Ok(Some(..))` instead.
    fn handle<'a>(&'a mut self, msg: Message) -> Pin<Box<dyn Future<Output = Result<Option<Message>, SessionError>> + Send + 'a>>;
}
