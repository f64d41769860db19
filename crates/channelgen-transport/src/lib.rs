//! channelgen-transport - Message envelopes and framing codec
//!
//! This crate provides:
//! - [`MessageEnvelope`] for one raw message (headers plus JSON body)
//! - Dispatch-value extraction along a [`channelgen_core::DispatchKey`] path
//! - [`Codec`] trait and [`JsonCodec`] for framing envelopes on the wire

mod codec;
mod envelope;

pub use codec::{Codec, CodecError, JsonCodec};
pub use envelope::MessageEnvelope;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Codec, CodecError, JsonCodec, MessageEnvelope};
}
