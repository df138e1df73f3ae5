//! Creator role (§4.4.1): a single operation, then the connection closes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use proto::{CreateResponse, Message};

use crate::directory::CapsuleDirectory;
use crate::error::SessionError;
use crate::session::Session;

pub struct CreatorSession {
    directory: Arc<dyn CapsuleDirectory>,
}

impl CreatorSession {
    pub fn new(directory: Arc<dyn CapsuleDirectory>) -> Self {
        Self { directory }
    }
}

impl Session for CreatorSession {
    fn handle<'a>(&'a mut self, msg: Message) -> Pin<Box<dyn Future<Output = Result<Option<Message>, SessionError>> + Send + 'a>> {
        Box::pin(async move {
            let Message::CreateRequest(req) = msg else {
                return Err(SessionError::Protocol("Creator connection expects CreateRequest".into()));
            };

            let id = crypto::datacapsule_id(&req.creator_pubkey, &req.writer_pubkey, &req.description);

            // creator_sig must cover writer_pubkey as well as description, or
            // an intercepted (description, creator_sig) pair could be replayed
            // against an attacker-chosen writer_pubkey to mint Datacapsules
            // under the creator's identity (see DESIGN.md Open Questions).
            if !crypto::verify(&req.creator_pubkey, id.0.as_bytes(), &req.creator_sig) {
                return Ok(Some(Message::CreateResponse(CreateResponse { ok: false })));
            }
            let meta = storage::CapsuleMeta {
                creator_pubkey: req.creator_pubkey,
                creator_sig: req.creator_sig,
                writer_pubkey: req.writer_pubkey,
                description: req.description.clone(),
            };

            match self.directory.create(id, meta) {
                Ok(_) => Ok(Some(Message::CreateResponse(CreateResponse { ok: true }))),
                Err(storage::StorageError::AlreadyExists(_)) => Ok(Some(Message::CreateResponse(CreateResponse { ok: false }))),
                Err(e) => Err(SessionError::Storage(e)),
            }
        })
    }
}
