//! Reader role (§4.4.3): `read`, `prove`, and optional `startCache`. Session
//! state (the hash cache and last-proven-block) is strictly per-connection.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use primitives::DatacapsuleId;
use proto::{Message, ProveResponse, ReadResponse};

use crate::directory::CapsuleDirectory;
use crate::error::SessionError;
use crate::session::Session;

pub struct ReaderSession {
    directory: Arc<dyn CapsuleDirectory>,
    id: DatacapsuleId,
    state: merkle::CacheState,
}

impl ReaderSession {
    pub fn new(directory: Arc<dyn CapsuleDirectory>, id: DatacapsuleId) -> Self {
        let state = merkle::CacheState::new(directory.hash_cache_capacity(), directory.merkle_fanout());
        Self { directory, id, state }
    }
}

impl Session for ReaderSession {
    fn handle<'a>(&'a mut self, msg: Message) -> Pin<Box<dyn Future<Output = Result<Option<Message>, SessionError>> + Send + 'a>> {
        Box::pin(async move {
            match msg {
                Message::ReadRequest(req) => {
                    let bytes = self.directory.store().record(&self.id, &req.hash)?;
                    let response = match bytes {
                        Some(b) => ReadResponse::Bytes(b),
                        None => ReadResponse::Absent,
                    };
                    Ok(Some(Message::ReadResponse(response)))
                }
                Message::ProveRequest(req) => {
                    let view = self.directory.store().view(self.id);
                    let sig_avoid_max_extra_hashes = self.directory.sig_avoid_max_extra_hashes();
                    let response = match merkle::assemble(&view, req.hash, &mut self.state, sig_avoid_max_extra_hashes) {
                        Some(stream) => ProveResponse::Ok(stream),
                        None => ProveResponse::Invalid,
                    };
                    Ok(Some(Message::ProveResponse(response)))
                }
                Message::StartCacheRequest(req) => {
                    self.state.cache.replay(&req.hashes);
                    Ok(None)
                }
                _ => Err(SessionError::Protocol("Reader connection expects ReadRequest, ProveRequest, or StartCacheRequest".into())),
            }
        })
    }
}
