//! Native-messaging bridge between the browser extension and this process

pub mod client;
pub mod codec;
pub mod host;

pub use client::BridgeClient;
pub use codec::{Envelope, MAX_FRAME_BYTES, read_frame, write_frame};
pub use host::NativeHost;
