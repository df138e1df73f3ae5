//! Writer role (§4.4.2): stage uncommitted records in memory, commit them
//! as a batch. At most one Writer session per Datacapsule holds the
//! writer-exclusivity lock (acquired at construction, held for the
//! session's lifetime).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use proto::{CommitResponse, Message};
use tokio::sync::OwnedMutexGuard;

use crate::directory::CapsuleDirectory;
use crate::error::SessionError;
use crate::session::Session;

pub struct WriterSession {
    directory: Arc<dyn CapsuleDirectory>,
    capsule: Arc<capsule::CapsuleState>,
    uncommitted: Vec<capsule::UncommittedRecord>,
    _writer_guard: OwnedMutexGuard<()>,
}

impl WriterSession {
    pub fn new(directory: Arc<dyn CapsuleDirectory>, capsule: Arc<capsule::CapsuleState>) -> Result<Self, SessionError> {
        let guard = capsule.try_acquire_writer()?;
        Ok(Self { directory, capsule, uncommitted: Vec::new(), _writer_guard: guard })
    }
}

impl Session for WriterSession {
    fn handle<'a>(&'a mut self, msg: Message) -> Pin<Box<dyn Future<Output = Result<Option<Message>, SessionError>> + Send + 'a>> {
        Box::pin(async move {
            match msg {
                Message::WriteRequest(req) => {
                    let expected_seq = self.capsule.latest_seq().map_or(0, |s| s + 1) + self.uncommitted.len() as u64;
                    if req.seq != expected_seq {
                        return Err(SessionError::Protocol(format!(
                            "write seq {} does not match expected {}",
                            req.seq, expected_seq
                        )));
                    }
                    let hash = crypto::h(&req.encrypted_bytes);
                    self.uncommitted.push(capsule::UncommittedRecord { hash, ciphertext: req.encrypted_bytes });
                    Ok(None)
                }
                Message::CommitRequest(req) => {
                    let result = capsule::commit(
                        self.directory.store(),
                        &self.capsule,
                        self.directory.server_keypair(),
                        &self.uncommitted,
                        req.client_root,
                        req.client_signed_root,
                        req.include_prev_root,
                        self.directory.merkle_fanout(),
                    )
                    .await;
                    self.uncommitted.clear();
                    match result {
                        Ok(signed) => Ok(Some(Message::CommitResponse(CommitResponse::Ok(signed)))),
                        Err(capsule::CommitError::RootMismatch) | Err(capsule::CommitError::BadSignature) => {
                            Ok(Some(Message::CommitResponse(CommitResponse::Failed)))
                        }
                        Err(capsule::CommitError::Storage(e)) => Err(SessionError::Storage(e)),
                    }
                }
                _ => Err(SessionError::Protocol("Writer connection expects WriteRequest or CommitRequest".into())),
            }
        })
    }
}
