//! Subscriber role (§4.4.4): lookups against the persisted sequence index,
//! plus `wait_after`, which suspends on the Datacapsule's notify hub.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use primitives::DatacapsuleId;
use proto::{GetLastNumResponse, Message, NameFromNumResponse, NumFromNameResponse, WaitAfterResponse};

use crate::directory::CapsuleDirectory;
use crate::error::SessionError;
use crate::session::Session;

pub struct SubscriberSession {
    directory: Arc<dyn CapsuleDirectory>,
    id: DatacapsuleId,
    capsule: Arc<capsule::CapsuleState>,
}

impl SubscriberSession {
    pub fn new(directory: Arc<dyn CapsuleDirectory>, id: DatacapsuleId, capsule: Arc<capsule::CapsuleState>) -> Self {
        Self { directory, id, capsule }
    }
}

impl Session for SubscriberSession {
    fn handle<'a>(&'a mut self, msg: Message) -> Pin<Box<dyn Future<Output = Result<Option<Message>, SessionError>> + Send + 'a>> {
        Box::pin(async move {
            match msg {
                Message::GetLastNumRequest(_) => {
                    Ok(Some(Message::GetLastNumResponse(GetLastNumResponse { seq: self.capsule.latest_seq() })))
                }
                Message::NameFromNumRequest(req) => {
                    let hash = self.directory.store().name_from_num(&self.id, req.seq)?;
                    Ok(Some(Message::NameFromNumResponse(NameFromNumResponse { hash })))
                }
                Message::NumFromNameRequest(req) => {
                    let seq = self.directory.store().num_from_name(&self.id, &req.hash)?;
                    Ok(Some(Message::NumFromNameResponse(NumFromNameResponse { seq })))
                }
                Message::WaitAfterRequest(req) => {
                    let mut rx = self.capsule.subscribe();
                    let new_seq = capsule::wait_after(&mut rx, req.seq).await;
                    Ok(Some(Message::WaitAfterResponse(WaitAfterResponse { new_seq })))
                }
                _ => Err(SessionError::Protocol(
                    "Subscriber connection expects GetLastNumRequest, NameFromNumRequest, NumFromNameRequest, or WaitAfterRequest".into(),
                )),
            }
        })
    }
}
