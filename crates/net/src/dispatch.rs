//! The per-connection dispatcher (C7, §4.4/§4.8): read the `Init` frame,
//! accept or reject it, then loop reading request frames and writing
//! response frames until the connection closes or a protocol violation
//! ends it.

use std::sync::Arc;

use primitives::Role;
use proto::{read_frame, write_frame, FrameError, Init, InitResponse, Message, WaitAfterResponse};
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite};

use crate::creator::CreatorSession;
use crate::directory::CapsuleDirectory;
use crate::error::SessionError;
use crate::reader::ReaderSession;
use crate::session::Session;
use crate::subscriber::SubscriberSession;
use crate::writer::WriterSession;

/// Drives one connection to completion. Returns `Ok(())` on a clean close
/// (EOF, or a rejected Init); `Err` for a protocol violation or resource
/// error that a caller may want to log.
pub async fn dispatch<S>(stream: S, directory: Arc<dyn CapsuleDirectory>) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut read_half, mut write_half) = split(stream);

    let init = match read_frame(&mut read_half).await {
        Ok(Message::Init(init)) => init,
        Ok(_) => return Err(SessionError::Protocol("connection must open with Init".into())),
        Err(FrameError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut session: Box<dyn Session> = match build_session(&init, &directory)? {
        Some(session) => {
            write_frame(&mut write_half, &Message::InitResponse(InitResponse { ok: true })).await?;
            session
        }
        None => {
            write_frame(&mut write_half, &Message::InitResponse(InitResponse { ok: false })).await?;
            return Ok(());
        }
    };

    // Creator is a single operation and the connection closes after it
    // (§4.4.1); every other role loops until EOF or a protocol violation.
    if init.role == Role::Creator {
        let msg = match read_frame(&mut read_half).await {
            Ok(msg) => msg,
            Err(FrameError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if let Some(response) = session.handle(msg).await? {
            write_frame(&mut write_half, &response).await?;
        }
        return Ok(());
    }

    // The Subscriber's `waitAfter` (§4.4.4) can suspend indefinitely, so it
    // is raced against the socket closing instead of going through the
    // generic loop below (§5 "Cancellation": a disconnect mid-wait must
    // release the waiter without a response, not wait for the next commit).
    if init.role == Role::Subscriber {
        let id = init.datacapsule.expect("Subscriber Init already validated by build_session");
        let capsule = directory.get(&id).expect("datacapsule validated by build_session is still present");
        return run_subscriber(read_half, write_half, session.as_mut(), capsule).await;
    }

    loop {
        let msg = match read_frame(&mut read_half).await {
            Ok(msg) => msg,
            Err(FrameError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if let Some(response) = session.handle(msg).await? {
            write_frame(&mut write_half, &response).await?;
        }
    }
}

/// `waitAfter` is handled inline (raced against the read half going idle due
/// to close) so that a disconnect releases the waiter immediately; every
/// other Subscriber request goes through `Session::handle` as usual.
async fn run_subscriber<R, W>(
    mut read_half: R,
    mut write_half: W,
    session: &mut dyn Session,
    capsule: Arc<capsule::CapsuleState>,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let msg = match read_frame(&mut read_half).await {
            Ok(msg) => msg,
            Err(FrameError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let Message::WaitAfterRequest(req) = msg else {
            if let Some(response) = session.handle(msg).await? {
                write_frame(&mut write_half, &response).await?;
            }
            continue;
        };

        let mut rx = capsule.subscribe();
        let mut close_probe = [0u8; 1];
        tokio::select! {
            new_seq = capsule::wait_after(&mut rx, req.seq) => {
                write_frame(&mut write_half, &Message::WaitAfterResponse(WaitAfterResponse { new_seq })).await?;
            }
            _ = read_half.read(&mut close_probe) => {
                // Either a clean EOF or the client broke request/response
                // discipline by sending more bytes while a wait was
                // outstanding; both end the connection with no response.
                return Ok(());
            }
        }
    }
}

/// `Ok(None)` means the Init is rejected (unknown Datacapsule, or a Writer
/// refused for contention); `Err` means the Init frame itself is malformed.
fn build_session(init: &Init, directory: &Arc<dyn CapsuleDirectory>) -> Result<Option<Box<dyn Session>>, SessionError> {
    match init.role {
        Role::Creator => Ok(Some(Box::new(CreatorSession::new(directory.clone())))),
        Role::Writer => {
            let Some(id) = init.datacapsule else {
                return Err(SessionError::Protocol("Writer Init requires a datacapsule id".into()));
            };
            let Some(capsule) = directory.get(&id) else {
                return Ok(None);
            };
            match WriterSession::new(directory.clone(), capsule) {
                Ok(session) => Ok(Some(Box::new(session))),
                Err(SessionError::Contention(_)) => Ok(None),
                Err(e) => Err(e),
            }
        }
        Role::Reader => {
            let Some(id) = init.datacapsule else {
                return Err(SessionError::Protocol("Reader Init requires a datacapsule id".into()));
            };
            if directory.get(&id).is_none() {
                return Ok(None);
            }
            Ok(Some(Box::new(ReaderSession::new(directory.clone(), id))))
        }
        Role::Subscriber => {
            let Some(id) = init.datacapsule else {
                return Err(SessionError::Protocol("Subscriber Init requires a datacapsule id".into()));
            };
            let Some(capsule) = directory.get(&id) else {
                return Ok(None);
            };
            Ok(Some(Box::new(SubscriberSession::new(directory.clone(), id, capsule))))
        }
    }
}
