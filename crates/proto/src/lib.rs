//! Wire message vocabulary and frame codec (§6).

pub mod frame;
pub mod message;

pub use frame::{read_frame, write_frame, FrameError, MAX_FRAME_LEN};
pub use message::*;
