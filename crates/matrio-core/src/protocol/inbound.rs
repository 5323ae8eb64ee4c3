//! Classifies one inbound buffer and dispatches it to the right decoder.
//!
//! # Framing (for beginners)
//!
//! A TCP read can hold several frames, or only part of one.  [`frame_extent`]
//! finds where the frame at the start of the buffer ends, without decoding
//! it:
//!
//! - enveloped frames declare their own length;
//! - a bare `82 0C` sync section is at least 68 bytes long;
//! - a bare change broadcast (`82 cmd value pattern[7]`) ends at the next
//!   `0x82` marker;
//! - anything else runs to the next envelope magic, or to the end of the
//!   buffer.
//!
//! [`decode_inbound`] decodes that frame and reports how many bytes it
//! consumed.  [`DecodeError::IncompleteFrame`] means the frame is not fully
//! buffered yet.  When a complete frame fails to decode, `frame_extent` still
//! tells the caller how many bytes to skip.

use tracing::debug;

use crate::domain::change::ZoneChangeEvent;
use crate::domain::names::{InputMapping, NameTable};
use crate::error::DecodeError;
use crate::protocol::change::{decode_change, DIRECT_MIN_LEN};
use crate::protocol::layout::{SYNC_LEN_68, SYNC_LEN_96};
use crate::protocol::names::parse_names;
use crate::protocol::sync::{decode_sync, SyncSnapshot};
use crate::protocol::wire::{
    declared_frame_len, has_envelope_magic, CommandCode, COMMAND_MARKER,
    ENVELOPE_COMMAND_OFFSET, ENVELOPE_HEADER_SIZE, ENVELOPE_LENGTH_END, ENVELOPE_MAGIC,
    ENVELOPE_MARKER_OFFSET, PAS_TAG, SYNC_SIGNATURE,
};

/// One classified inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPacket {
    Sync(SyncSnapshot),
    Names(NameTable),
    Change(ZoneChangeEvent),
    /// Well-formed traffic none of the decoders recognize (acks, UPnP noise).
    Unrecognized,
}

/// How the frame at the start of a buffer is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Envelope with a usable length word.
    Enveloped,
    /// Envelope whose length word does not fit in memory.
    Oversized,
    /// Bare `82 0C` sync section.
    BareSync,
    /// Bare broadcast or other unframed traffic.
    Bare,
}

/// Returns the number of bytes the frame at the start of `bytes` occupies.
///
/// Use it to skip a complete frame that [`decode_inbound`] could not decode
/// without discarding the frames buffered behind it.
///
/// # Errors
///
/// Returns [`DecodeError::IncompleteFrame`] when the frame is not fully
/// buffered yet.
pub fn frame_extent(bytes: &[u8]) -> Result<usize, DecodeError> {
    locate(bytes).map(|(_, len)| len)
}

/// Decodes the frame at the start of `bytes`.
///
/// Returns the packet and the number of bytes it occupied.
///
/// # Errors
///
/// - [`DecodeError::IncompleteFrame`] – the frame is not fully buffered yet;
///   read more and call again.
/// - [`DecodeError::TruncatedPacket`] – a complete sync or names frame is too
///   short to decode.  [`frame_extent`] gives the number of bytes to skip.
///
/// # Examples
///
/// ```rust
/// use matrio_core::{decode_inbound, encode_command, ControlCommand, InboundPacket, InputMapping};
///
/// let frame = encode_command(&ControlCommand::Mute { zone: 2, muted: true }).unwrap();
/// let (packet, consumed) = decode_inbound(&frame, &InputMapping::default()).unwrap();
/// assert!(matches!(packet, InboundPacket::Change(_)));
/// assert_eq!(consumed, frame.len());
/// ```
pub fn decode_inbound(
    bytes: &[u8],
    inputs: &InputMapping,
) -> Result<(InboundPacket, usize), DecodeError> {
    let (framing, len) = locate(bytes)?;
    let frame = &bytes[..len];
    let packet = match framing {
        Framing::Enveloped => decode_enveloped(frame, inputs)?,
        Framing::Oversized => {
            debug!(len, "envelope length word out of range");
            InboundPacket::Unrecognized
        }
        Framing::BareSync => InboundPacket::Sync(decode_sync(frame, inputs)?),
        Framing::Bare => change_or_unrecognized(frame, inputs),
    };
    Ok((packet, len))
}

fn locate(bytes: &[u8]) -> Result<(Framing, usize), DecodeError> {
    if has_envelope_magic(bytes) {
        if bytes.len() < ENVELOPE_LENGTH_END {
            return Err(DecodeError::IncompleteFrame {
                declared: ENVELOPE_HEADER_SIZE,
                available: bytes.len(),
            });
        }
        return match declared_frame_len(bytes) {
            Some(declared) if declared > bytes.len() => Err(DecodeError::IncompleteFrame {
                declared,
                available: bytes.len(),
            }),
            Some(declared) => Ok((Framing::Enveloped, declared)),
            None => Ok((Framing::Oversized, bare_end(bytes))),
        };
    }

    if bytes.starts_with(&SYNC_SIGNATURE) {
        return match next_envelope(bytes) {
            Some(end) => Ok((Framing::BareSync, end)),
            None if bytes.len() < SYNC_LEN_68 => Err(DecodeError::IncompleteFrame {
                declared: SYNC_LEN_68,
                available: bytes.len(),
            }),
            None => Ok((Framing::BareSync, bytes.len())),
        };
    }

    if starts_change_broadcast(bytes) {
        let end = bare_end(bytes);
        let next_broadcast = bytes[..end]
            .iter()
            .skip(DIRECT_MIN_LEN)
            .position(|&byte| byte == COMMAND_MARKER)
            .map(|position| position + DIRECT_MIN_LEN);
        return Ok((Framing::Bare, next_broadcast.unwrap_or(end)));
    }

    Ok((Framing::Bare, bare_end(bytes)))
}

/// `true` for `82 <cmd>` where `cmd` is one the change decoder maps.
fn starts_change_broadcast(bytes: &[u8]) -> bool {
    match bytes {
        [COMMAND_MARKER, command, ..] => matches!(
            CommandCode::try_from(*command),
            Ok(CommandCode::Power
                | CommandCode::Volume
                | CommandCode::Mute
                | CommandCode::Input
                | CommandCode::Balance
                | CommandCode::Bass
                | CommandCode::Treble
                | CommandCode::TotalVolume)
        ),
        _ => false,
    }
}

/// End of an unframed run: the next envelope magic, or the whole buffer.
fn bare_end(bytes: &[u8]) -> usize {
    next_envelope(bytes).unwrap_or(bytes.len())
}

/// Position of the first envelope magic after the start of `bytes`.
fn next_envelope(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(ENVELOPE_MAGIC.len())
        .skip(1)
        .position(|window| window == ENVELOPE_MAGIC)
        .map(|position| position + 1)
}

/// Decodes one complete enveloped frame.
fn decode_enveloped(frame: &[u8], inputs: &InputMapping) -> Result<InboundPacket, DecodeError> {
    let tagged = frame.get(ENVELOPE_HEADER_SIZE..ENVELOPE_MARKER_OFFSET) == Some(&PAS_TAG[..]);
    let command = frame
        .get(ENVELOPE_COMMAND_OFFSET)
        .filter(|_| tagged)
        .and_then(|&byte| CommandCode::try_from(byte).ok());
    debug!(frame_len = frame.len(), ?command, "enveloped frame");

    let packet = match command {
        Some(CommandCode::Sync) => {
            // A full 96-byte frame is decoded as is; anything else is decoded
            // from its 82 0C section.
            let section = if frame.len() == SYNC_LEN_96 {
                frame
            } else {
                &frame[ENVELOPE_MARKER_OFFSET..]
            };
            InboundPacket::Sync(decode_sync(section, inputs)?)
        }
        Some(CommandCode::AllNames) => InboundPacket::Names(parse_names(frame)?),
        _ => change_or_unrecognized(frame, inputs),
    };
    Ok(packet)
}

fn change_or_unrecognized(bytes: &[u8], inputs: &InputMapping) -> InboundPacket {
    match decode_change(bytes, inputs) {
        Some(event) => InboundPacket::Change(event),
        None => InboundPacket::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change::ZoneChange;
    use crate::protocol::commands::{encode_state_query, encode_volume};
    use crate::protocol::layout::SyncLayout;

    const SYNC_96: &str = "189618204c0000009e08000000000000000000004d43552b5041532b820c0104030208080804050a01271d0805050d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d1f3d1f1f1f1f1f1f02010201020101010101010101020101010240180c14ffffcc26";

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn change_of(packet: &InboundPacket) -> Option<&ZoneChange> {
        match packet {
            InboundPacket::Change(event) => Some(&event.change),
            _ => None,
        }
    }

    #[test]
    fn test_enveloped_sync_frame_is_decoded_with_96_byte_layout() {
        // Arrange
        let bytes = hex(SYNC_96);

        // Act
        let (packet, consumed) = decode_inbound(&bytes, &InputMapping::default()).unwrap();

        // Assert
        assert_eq!(consumed, 96);
        match packet {
            InboundPacket::Sync(snapshot) => {
                assert_eq!(snapshot.layout.layout, SyncLayout::NinetySix);
                assert_eq!(snapshot.zones[0].volume, 4);
            }
            other => panic!("expected sync, got {other:?}"),
        }
    }

    #[test]
    fn test_two_frames_in_one_buffer_are_split() {
        // Arrange
        let mut bytes = encode_volume(1, 10).unwrap();
        let first_len = bytes.len();
        bytes.extend_from_slice(&hex(SYNC_96));

        // Act
        let (first, consumed) = decode_inbound(&bytes, &InputMapping::default()).unwrap();
        let (second, _) = decode_inbound(&bytes[consumed..], &InputMapping::default()).unwrap();

        // Assert
        assert_eq!(consumed, first_len);
        assert_eq!(change_of(&first), Some(&ZoneChange::Volume(10)));
        assert!(matches!(second, InboundPacket::Sync(_)));
    }

    #[test]
    fn test_partial_frame_reports_incomplete() {
        let bytes = hex(SYNC_96);
        let err = decode_inbound(&bytes[..50], &InputMapping::default()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::IncompleteFrame {
                declared: 96,
                available: 50
            }
        );
    }

    #[test]
    fn test_header_shorter_than_length_word_reports_incomplete() {
        let err = decode_inbound(&[0x18, 0x96, 0x18, 0x20, 0x4c], &InputMapping::default())
            .unwrap_err();
        assert!(matches!(err, DecodeError::IncompleteFrame { .. }));
    }

    #[test]
    fn test_state_query_echo_is_unrecognized() {
        let bytes = encode_state_query();
        let (packet, consumed) = decode_inbound(&bytes, &InputMapping::default()).unwrap();
        assert_eq!(packet, InboundPacket::Unrecognized);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_bare_sync_section_is_decoded() {
        let bytes = hex(&SYNC_96[56..]);
        let (packet, consumed) = decode_inbound(&bytes, &InputMapping::default()).unwrap();
        assert_eq!(consumed, 68);
        match packet {
            InboundPacket::Sync(s) => assert_eq!(s.layout.layout, SyncLayout::SixtyEight),
            other => panic!("expected sync, got {other:?}"),
        }
    }

    #[test]
    fn test_short_bare_sync_waits_for_more_bytes() {
        // Arrange
        let bytes = hex(&SYNC_96[56..120]);

        // Act
        let result = decode_inbound(&bytes, &InputMapping::default());

        // Assert
        assert_eq!(
            result,
            Err(DecodeError::IncompleteFrame {
                declared: 68,
                available: 32
            })
        );
    }

    #[test]
    fn test_bare_sync_cut_short_by_envelope_is_truncated() {
        // Arrange
        let mut bytes = hex(&SYNC_96[56..136]);
        bytes.extend_from_slice(&encode_volume(2, 5).unwrap());

        // Act
        let result = decode_inbound(&bytes, &InputMapping::default());

        // Assert
        assert!(matches!(result, Err(DecodeError::TruncatedPacket { .. })));
        assert_eq!(frame_extent(&bytes), Ok(40));
    }

    #[test]
    fn test_malformed_enveloped_sync_reports_its_extent() {
        // Arrange: the envelope ends right after the 82 0C signature
        let mut bytes = hex("189618200a000000000000000000000000000000");
        bytes.extend_from_slice(b"MCU+PAS+");
        bytes.extend_from_slice(&[0x82, 0x0C]);
        let malformed_len = bytes.len();
        bytes.extend_from_slice(&encode_volume(2, 10).unwrap());

        // Act
        let result = decode_inbound(&bytes, &InputMapping::default());
        let extent = frame_extent(&bytes).unwrap();
        let (next, _) = decode_inbound(&bytes[extent..], &InputMapping::default()).unwrap();

        // Assert
        assert!(matches!(result, Err(DecodeError::TruncatedPacket { .. })));
        assert_eq!(extent, malformed_len);
        assert_eq!(change_of(&next), Some(&ZoneChange::Volume(10)));
    }

    #[test]
    fn test_frame_extent_reports_incomplete_envelope() {
        let bytes = hex(SYNC_96);
        assert_eq!(
            frame_extent(&bytes[..50]),
            Err(DecodeError::IncompleteFrame {
                declared: 96,
                available: 50
            })
        );
    }

    #[test]
    fn test_maximum_length_word_does_not_panic() {
        let mut bytes = vec![0x18, 0x96, 0x18, 0x20, 0xFF, 0xFF, 0xFF, 0xFF];
        bytes.resize(40, 0x00);

        let result = decode_inbound(&bytes, &InputMapping::default());

        assert!(matches!(
            result,
            Err(DecodeError::IncompleteFrame { .. }) | Ok((InboundPacket::Unrecognized, 40))
        ));
    }

    #[test]
    fn test_back_to_back_broadcasts_are_split() {
        // Arrange
        let power_off = [0x82, 0x08, 0x01, 0x02, 0x01, 0x02, 0x02, 0x02, 0x02, 0x02];
        let volume = [0x82, 0x01, 0x0B, 0x01, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0xCC];
        let mut bytes = power_off.to_vec();
        bytes.extend_from_slice(&volume);

        // Act
        let (first, consumed) = decode_inbound(&bytes, &InputMapping::default()).unwrap();
        let (second, rest) = decode_inbound(&bytes[consumed..], &InputMapping::default()).unwrap();

        // Assert
        assert_eq!(consumed, power_off.len());
        assert_eq!(rest, volume.len());
        assert_eq!(change_of(&first), Some(&ZoneChange::Power { on: false }));
        assert_eq!(change_of(&second), Some(&ZoneChange::Volume(10)));
    }

    #[test]
    fn test_bare_broadcast_stops_at_following_envelope() {
        // Arrange
        let broadcast = [0x82, 0x0E, 0x02, 0x01, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0xCC];
        let mut bytes = broadcast.to_vec();
        bytes.extend_from_slice(&encode_volume(2, 5).unwrap());

        // Act
        let (first, consumed) = decode_inbound(&bytes, &InputMapping::default()).unwrap();
        let (second, rest) = decode_inbound(&bytes[consumed..], &InputMapping::default()).unwrap();

        // Assert
        assert_eq!(consumed, broadcast.len());
        assert_eq!(change_of(&first), Some(&ZoneChange::Mute { muted: true }));
        assert_eq!(change_of(&second), Some(&ZoneChange::Volume(5)));
        assert_eq!(consumed + rest, bytes.len());
    }

    #[test]
    fn test_unknown_bytes_are_unrecognized() {
        let (packet, consumed) =
            decode_inbound(b"NOTIFY * HTTP/1.1", &InputMapping::default()).unwrap();
        assert_eq!(packet, InboundPacket::Unrecognized);
        assert_eq!(consumed, 17);
    }
}
