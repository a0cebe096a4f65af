//! Audio subsystem
//!
//! Sample formats, the sample codec, the transfer buffer and the frame
//! repacker that fills it.

pub mod buffer;
pub mod codec;
pub mod repack;
pub mod types;

pub use buffer::TransferBuffer;
pub use codec::{convert, encode_into};
pub use repack::FrameRepacker;
pub use types::{FrameLayout, SampleFormat, StreamMarker, TARGET_SAMPLE_WIDTH};
