//! Outbound command encoder.
//!
//! Every encoder validates its zone id and its value before building a frame
//! and returns [`ValidationError`] instead of clamping.  A frame the device
//! does not expect can leave it in a confused state, so an `Err` here means
//! nothing must be sent.
//!
//! Frame shapes:
//!
//! ```text
//! power on   envelope(AB 04, 82 08, pattern[11])                 + FF CC 26
//! power off  envelope(AA 04, 82 08, pattern[9])                  + FF CC 26
//! volume     envelope(B6 04, 82 01, wire, pattern[8])            + FF CC 26
//! mute       envelope(B1 04 | B0 04, 82 0E, 02 | 01, pattern[8]) + FF CC 26
//! input      envelope(B6 04, 82 0D, input id, pattern[8])        + FF CC 26
//! balance    envelope(E3 04, 82 05, wire, pattern[8])            + FF CC 26
//! bass       envelope(E3 04, 82 03, wire, pattern[8])            + FF CC 26
//! treble     envelope(E3 04, 82 02, wire, pattern[8])            + FF CC 26
//! rename     82 13 [01 zone | 02 input] id len name CC    (no envelope)
//! state      envelope(57 06, 82 0A, FF FF FF 89 26)
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::zone::ZoneId;
use crate::domain::INPUT_COUNT;
use crate::error::ValidationError;
use crate::protocol::values::{
    balance_ui_to_wire, tone_ui_to_wire, volume_ui_to_wire, BALANCE_MAX, BALANCE_MIN, TONE_MAX,
    TONE_MIN, VOLUME_MAX,
};
use crate::protocol::wire::{
    zone_pattern, CommandCode, COMMAND_MARKER, COMMAND_PATTERN_LEN, COMMAND_TRAILER,
    ENVELOPE_HEADER_SIZE, ENVELOPE_MAGIC, NAME_TERMINATOR, OPAQUE_BLOCK_SIZE, OPAQUE_LEVEL,
    OPAQUE_MUTE_OFF, OPAQUE_MUTE_ON, OPAQUE_POWER_OFF, OPAQUE_POWER_ON, OPAQUE_STATE_QUERY,
    OPAQUE_TONE, PAS_TAG, POWER_OFF_PATTERN_LEN, POWER_ON_PATTERN_LEN, STATE_QUERY_PAYLOAD,
};

/// What a rename frame renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NameTarget {
    Zone = 0x01,
    Input = 0x02,
}

/// One control operation, as accepted by [`encode_command`].
///
/// Zone and input ids are the raw 1-based numbers a user typed; they are
/// validated during encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    Power { zone: u8, on: bool },
    Volume { zone: u8, level: u8 },
    Mute { zone: u8, muted: bool },
    Input { zone: u8, input: u8 },
    Balance { zone: u8, value: i8 },
    Bass { zone: u8, level: i8 },
    Treble { zone: u8, level: i8 },
    RenameZone { zone: u8, name: String },
    RenameInput { input: u8, name: String },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes any [`ControlCommand`] into its wire frame.
///
/// # Errors
///
/// Returns [`ValidationError`] when the zone, input or value is out of range.
///
/// # Examples
///
/// ```rust
/// use matrio_core::{encode_command, ControlCommand, ValidationError};
///
/// let frame = encode_command(&ControlCommand::Volume { zone: 3, level: 20 }).unwrap();
/// assert_eq!(&frame[..4], &[0x18, 0x96, 0x18, 0x20]);
///
/// let err = encode_command(&ControlCommand::Volume { zone: 9, level: 20 }).unwrap_err();
/// assert_eq!(err, ValidationError::InvalidZone(9));
/// ```
pub fn encode_command(command: &ControlCommand) -> Result<Vec<u8>, ValidationError> {
    match command {
        ControlCommand::Power { zone, on } => encode_power(*zone, *on),
        ControlCommand::Volume { zone, level } => encode_volume(*zone, *level),
        ControlCommand::Mute { zone, muted } => encode_mute(*zone, *muted),
        ControlCommand::Input { zone, input } => encode_input(*zone, *input),
        ControlCommand::Balance { zone, value } => encode_balance(*zone, *value),
        ControlCommand::Bass { zone, level } => encode_bass(*zone, *level),
        ControlCommand::Treble { zone, level } => encode_treble(*zone, *level),
        ControlCommand::RenameZone { zone, name } => encode_zone_name(*zone, name),
        ControlCommand::RenameInput { input, name } => encode_input_name(*input, name),
    }
}

/// The frame that asks the device for a sync packet followed by ALLNAMES.
pub fn encode_state_query() -> Vec<u8> {
    envelope(
        &OPAQUE_STATE_QUERY,
        CommandCode::StateQuery,
        &STATE_QUERY_PAYLOAD,
        &[],
    )
}

/// Powers one zone on or off.
///
/// The two directions use different pattern widths.  Both mark the pattern
/// at the position equal to the 1-based zone id, so position 0 is never the
/// target; power-off additionally marks position 0.
pub fn encode_power(zone: u8, on: bool) -> Result<Vec<u8>, ValidationError> {
    let position = usize::from(ZoneId::new(zone)?.get());
    let frame = if on {
        let pattern: [u8; POWER_ON_PATTERN_LEN] = zone_pattern(&[position]);
        envelope(&OPAQUE_POWER_ON, CommandCode::Power, &pattern, &COMMAND_TRAILER)
    } else {
        let pattern: [u8; POWER_OFF_PATTERN_LEN] = zone_pattern(&[0, position]);
        envelope(&OPAQUE_POWER_OFF, CommandCode::Power, &pattern, &COMMAND_TRAILER)
    };
    Ok(frame)
}

/// Sets one zone's volume (0-38).
pub fn encode_volume(zone: u8, level: u8) -> Result<Vec<u8>, ValidationError> {
    let zone = ZoneId::new(zone)?;
    if level > VOLUME_MAX {
        return Err(ValidationError::VolumeOutOfRange(level));
    }
    Ok(zone_command(
        &OPAQUE_LEVEL,
        CommandCode::Volume,
        volume_ui_to_wire(level),
        zone,
    ))
}

pub fn encode_mute(zone: u8, muted: bool) -> Result<Vec<u8>, ValidationError> {
    let zone = ZoneId::new(zone)?;
    let (opaque, value) = if muted {
        (&OPAQUE_MUTE_ON, 0x02)
    } else {
        (&OPAQUE_MUTE_OFF, 0x01)
    };
    Ok(zone_command(opaque, CommandCode::Mute, value, zone))
}

/// Selects input `input` (1-8) on one zone.  Input ids go on the wire as is.
pub fn encode_input(zone: u8, input: u8) -> Result<Vec<u8>, ValidationError> {
    let zone = ZoneId::new(zone)?;
    validate_input(input)?;
    Ok(zone_command(&OPAQUE_LEVEL, CommandCode::Input, input, zone))
}

pub fn encode_balance(zone: u8, value: i8) -> Result<Vec<u8>, ValidationError> {
    let zone = ZoneId::new(zone)?;
    if !(BALANCE_MIN..=BALANCE_MAX).contains(&value) {
        return Err(ValidationError::BalanceOutOfRange(value));
    }
    Ok(zone_command(
        &OPAQUE_TONE,
        CommandCode::Balance,
        balance_ui_to_wire(value),
        zone,
    ))
}

pub fn encode_bass(zone: u8, level: i8) -> Result<Vec<u8>, ValidationError> {
    let zone = ZoneId::new(zone)?;
    validate_tone("bass", level)?;
    Ok(zone_command(
        &OPAQUE_TONE,
        CommandCode::Bass,
        tone_ui_to_wire(level),
        zone,
    ))
}

pub fn encode_treble(zone: u8, level: i8) -> Result<Vec<u8>, ValidationError> {
    let zone = ZoneId::new(zone)?;
    validate_tone("treble", level)?;
    Ok(zone_command(
        &OPAQUE_TONE,
        CommandCode::Treble,
        tone_ui_to_wire(level),
        zone,
    ))
}

/// Renames a zone.  Rename frames are sent without the envelope.
pub fn encode_zone_name(zone: u8, name: &str) -> Result<Vec<u8>, ValidationError> {
    let zone = ZoneId::new(zone)?;
    name_frame(NameTarget::Zone, zone.get(), name)
}

pub fn encode_input_name(input: u8, name: &str) -> Result<Vec<u8>, ValidationError> {
    validate_input(input)?;
    name_frame(NameTarget::Input, input, name)
}

// ── Frame builders ────────────────────────────────────────────────────────────

/// `[value][pattern:8]` addressed to a single zone.
fn zone_command(
    opaque: &[u8; OPAQUE_BLOCK_SIZE],
    command: CommandCode,
    value: u8,
    zone: ZoneId,
) -> Vec<u8> {
    let pattern: [u8; COMMAND_PATTERN_LEN] = zone_pattern(&[zone.index()]);
    let mut body = Vec::with_capacity(1 + COMMAND_PATTERN_LEN);
    body.push(value);
    body.extend_from_slice(&pattern);
    envelope(opaque, command, &body, &COMMAND_TRAILER)
}

/// Wraps `body` in the shared envelope.  The length word counts everything
/// after the 20-byte header.
fn envelope(
    opaque: &[u8; OPAQUE_BLOCK_SIZE],
    command: CommandCode,
    body: &[u8],
    trailer: &[u8],
) -> Vec<u8> {
    let after_header = PAS_TAG.len() + 2 + body.len() + trailer.len();
    let mut buf = Vec::with_capacity(ENVELOPE_HEADER_SIZE + after_header);

    buf.extend_from_slice(&ENVELOPE_MAGIC);
    buf.extend_from_slice(&(after_header as u32).to_le_bytes());
    buf.extend_from_slice(opaque);
    buf.extend_from_slice(&PAS_TAG);
    buf.push(COMMAND_MARKER);
    buf.push(command as u8);
    buf.extend_from_slice(body);
    buf.extend_from_slice(trailer);
    buf
}

fn name_frame(target: NameTarget, id: u8, name: &str) -> Result<Vec<u8>, ValidationError> {
    let bytes = name.as_bytes();
    let len = u8::try_from(bytes.len()).map_err(|_| ValidationError::NameTooLong {
        len: bytes.len(),
    })?;

    let mut buf = Vec::with_capacity(6 + bytes.len());
    buf.push(COMMAND_MARKER);
    buf.push(CommandCode::Rename as u8);
    buf.push(target as u8);
    buf.push(id);
    buf.push(len);
    buf.extend_from_slice(bytes);
    buf.push(NAME_TERMINATOR);
    Ok(buf)
}

fn validate_input(input: u8) -> Result<(), ValidationError> {
    if (1..=INPUT_COUNT as u8).contains(&input) {
        Ok(())
    } else {
        Err(ValidationError::InvalidInput(input))
    }
}

fn validate_tone(control: &'static str, value: i8) -> Result<(), ValidationError> {
    if (TONE_MIN..=TONE_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::ToneOutOfRange { control, value })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
