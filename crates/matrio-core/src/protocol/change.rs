//! Broadcast and command-echo decoder.
//!
//! Two shapes carry a single change:
//!
//! ```text
//! direct broadcast:  [0x82][cmd][value][pattern:7]...
//! command echo:      [magic:4][len:4][opaque:12]["MCU+PAS+"][0x82][cmd][value][pattern:7]...
//! ```
//!
//! The 7-byte pattern covers zones 1-7 only.  Zone 8 never appears in a
//! change notification even though outbound commands can address it.
//!
//! Anything that is not one of these shapes, or carries a command byte this
//! decoder does not map, yields `None`.  That is the normal outcome for most
//! traffic on the socket and is not an error.

use tracing::debug;

use crate::domain::change::{ZoneChange, ZoneChangeEvent};
use crate::domain::names::InputMapping;
use crate::domain::zone::ZoneId;
use crate::protocol::values::{balance_wire_to_ui, tone_wire_to_ui, volume_wire_to_ui};
use crate::protocol::wire::{
    has_envelope_magic, CommandCode, CHANGE_PATTERN_LEN, COMMAND_MARKER, ENVELOPE_COMMAND_OFFSET,
    ENVELOPE_HEADER_SIZE, PAS_TAG, ZONE_SELECTED,
};

/// Command byte plus the eight payload bytes after it.
const CHANGE_BODY_LEN: usize = 1 + 1 + CHANGE_PATTERN_LEN;

/// Minimum length of a direct broadcast: marker, command and the payload.
pub const DIRECT_MIN_LEN: usize = 1 + CHANGE_BODY_LEN;

/// Minimum length of a command echo: header, tag, marker, command, payload.
pub const ECHO_MIN_LEN: usize = ENVELOPE_COMMAND_OFFSET + CHANGE_BODY_LEN;

/// Decodes one change notification.
///
/// Input changes are named through `inputs`, falling back to `"Input {id}"`
/// when the mapping has no entry.
///
/// # Examples
///
/// ```rust
/// use matrio_core::{decode_change, InputMapping, ZoneChange};
///
/// let bytes = [0x82, 0x08, 0x02, 0x01, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02];
/// let event = decode_change(&bytes, &InputMapping::default()).unwrap();
/// assert_eq!(event.change, ZoneChange::Power { on: true });
/// assert_eq!(event.zones.len(), 1);
/// assert_eq!(event.zones[0].get(), 1);
///
/// assert!(decode_change(&[0x00, 0x01], &InputMapping::default()).is_none());
/// ```
pub fn decode_change(bytes: &[u8], inputs: &InputMapping) -> Option<ZoneChangeEvent> {
    let body = change_body(bytes)?;
    let command = body[0];
    let mut raw_payload = [0u8; 8];
    raw_payload.copy_from_slice(&body[1..9]);

    let value = raw_payload[0];
    let zones = selected_zones(&raw_payload[1..]);

    let change = match CommandCode::try_from(command).ok()? {
        CommandCode::Power => ZoneChange::Power { on: value == 0x02 },
        CommandCode::Volume => ZoneChange::Volume(volume_wire_to_ui(value)),
        CommandCode::Mute => ZoneChange::Mute {
            muted: value == 0x02,
        },
        CommandCode::Input => ZoneChange::Input {
            id: value,
            name: inputs
                .get(value)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Input {value}")),
        },
        CommandCode::Balance => {
            ZoneChange::Balance(balance_wire_to_ui(value).numeric().unwrap_or(0))
        }
        CommandCode::Bass => ZoneChange::Bass(tone_wire_to_ui(value)),
        CommandCode::Treble => ZoneChange::Treble(tone_wire_to_ui(value)),
        CommandCode::TotalVolume => ZoneChange::TotalVolume(volume_wire_to_ui(value)),
        CommandCode::StateQuery
        | CommandCode::Sync
        | CommandCode::Rename
        | CommandCode::AllNames => return None,
    };

    debug!(command, ?zones, ?change, "decoded change");
    Some(ZoneChangeEvent {
        zones,
        change,
        raw_command: command,
        raw_payload,
    })
}

/// Locates `[cmd][value][pattern:7]` in either packet shape.
fn change_body(bytes: &[u8]) -> Option<&[u8]> {
    if has_envelope_magic(bytes) && bytes.len() >= ENVELOPE_HEADER_SIZE {
        let tag = bytes.get(ENVELOPE_HEADER_SIZE..ENVELOPE_HEADER_SIZE + PAS_TAG.len())?;
        if tag != PAS_TAG {
            return None;
        }
        return bytes.get(ENVELOPE_COMMAND_OFFSET..ENVELOPE_COMMAND_OFFSET + CHANGE_BODY_LEN);
    }

    if bytes.first() == Some(&COMMAND_MARKER) {
        return bytes.get(1..DIRECT_MIN_LEN);
    }

    None
}

fn selected_zones(pattern: &[u8]) -> Vec<ZoneId> {
    pattern
        .iter()
        .take(CHANGE_PATTERN_LEN)
        .enumerate()
        .filter(|(_, byte)| **byte == ZONE_SELECTED)
        .map(|(index, _)| ZoneId::from_index(index))
        .collect()
}
