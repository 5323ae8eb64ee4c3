//! Error types shared by the decoders and the command encoder.
//!
//! Only two kinds of failure ever leave this crate as an `Err`:
//!
//! - [`DecodeError`] – a buffer cannot be interpreted as the packet type it
//!   claims to be at all (it is too short, or an envelope is incomplete).
//! - [`ValidationError`] – an encoder was handed a zone id or a control value
//!   outside the range the device accepts.
//!
//! Everything softer than that is absorbed into the decoded value instead:
//! an unknown field byte becomes an `Unknown(byte)` variant, an unrecognized
//! sync layout sets [`crate::SyncPacketLayout::recognized`] to `false`, a short
//! ALLNAMES payload sets [`crate::NameTable::truncated`], and traffic that is not
//! a change notification decodes to `None`.

use thiserror::Error;

/// Errors returned when an inbound buffer cannot be decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer is shorter than the layout that was detected (or assumed)
    /// requires.  No partial result is produced.
    #[error("truncated {context}: need at least {needed} bytes, got {available}")]
    TruncatedPacket {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    /// A frame needs more bytes than are currently buffered: an envelope
    /// declares a longer length, or a bare sync section is shorter than
    /// 68 bytes.
    ///
    /// Unlike [`DecodeError::TruncatedPacket`] this is expected on a TCP stream:
    /// the caller should wait for more bytes and try again.
    #[error("incomplete frame: need {declared} bytes, {available} available")]
    IncompleteFrame { declared: usize, available: usize },
}

/// Errors returned by the command encoder for out-of-range arguments.
///
/// The outbound path never clamps silently: a malformed frame could
/// desynchronize the device, so the caller must not send anything when one of
/// these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Zone ids are 1-based and the device always has exactly 8 zones.
    #[error("invalid zone id {0}: must be 1-8")]
    InvalidZone(u8),

    /// Input ids are 1-based and the device always has exactly 8 inputs.
    #[error("invalid input id {0}: must be 1-8")]
    InvalidInput(u8),

    #[error("invalid volume {0}: must be 0-38")]
    VolumeOutOfRange(u8),

    #[error("invalid balance {0}: must be -100 to +100")]
    BalanceOutOfRange(i8),

    /// Bass or treble outside -12..=+12.
    #[error("invalid {control} level {value}: must be -12 to +12")]
    ToneOutOfRange { control: &'static str, value: i8 },

    /// The name frame carries a single length byte.
    #[error("name is {len} bytes long; at most 255 bytes fit in a rename frame")]
    NameTooLong { len: usize },
}
