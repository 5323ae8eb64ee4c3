//! Fixed byte sequences of the amplifier's control protocol.
//!
//! Wire format of an enveloped frame:
//! ```text
//! [magic:4][len:4 LE][opaque:12]["MCU+PAS+":8][0x82][cmd:1][payload:N][trailer]
//! ```
//! `len` counts every byte after the 20-byte header.  The opaque block is a
//! per-command constant the firmware insists on; it has no known structure
//! and is reproduced byte for byte.

// ── Envelope ──────────────────────────────────────────────────────────────────

/// First four bytes of every enveloped frame.
pub const ENVELOPE_MAGIC: [u8; 4] = [0x18, 0x96, 0x18, 0x20];

/// Magic (4) + length word (4) + opaque block (12).
pub const ENVELOPE_HEADER_SIZE: usize = 20;

/// Offset just past the little-endian length word.
pub const ENVELOPE_LENGTH_END: usize = 8;

/// Length of the opaque command block that follows the length word.
pub const OPAQUE_BLOCK_SIZE: usize = 12;

/// ASCII tag that opens the body of every enveloped frame.
pub const PAS_TAG: [u8; 8] = *b"MCU+PAS+";

/// Marker byte preceding every command code.
pub const COMMAND_MARKER: u8 = 0x82;

/// Trailer appended to enveloped control commands.
pub const COMMAND_TRAILER: [u8; 3] = [0xFF, 0xCC, 0x26];

/// Offset of the command marker inside an enveloped frame.
pub const ENVELOPE_MARKER_OFFSET: usize = ENVELOPE_HEADER_SIZE + PAS_TAG.len();

/// Offset of the command byte inside an enveloped frame.
pub const ENVELOPE_COMMAND_OFFSET: usize = ENVELOPE_MARKER_OFFSET + 1;

/// Two bytes that open a sync section.
pub const SYNC_SIGNATURE: [u8; 2] = [COMMAND_MARKER, 0x0C];

/// Terminator of a rename frame.
pub const NAME_TERMINATOR: u8 = 0xCC;

// ── Opaque command blocks ─────────────────────────────────────────────────────

pub const OPAQUE_POWER_ON: [u8; OPAQUE_BLOCK_SIZE] = opaque(0xAB, 0x04);
pub const OPAQUE_POWER_OFF: [u8; OPAQUE_BLOCK_SIZE] = opaque(0xAA, 0x04);
/// Shared by volume and input selection.
pub const OPAQUE_LEVEL: [u8; OPAQUE_BLOCK_SIZE] = opaque(0xB6, 0x04);
pub const OPAQUE_MUTE_ON: [u8; OPAQUE_BLOCK_SIZE] = opaque(0xB1, 0x04);
pub const OPAQUE_MUTE_OFF: [u8; OPAQUE_BLOCK_SIZE] = opaque(0xB0, 0x04);
/// Shared by balance, bass and treble.
pub const OPAQUE_TONE: [u8; OPAQUE_BLOCK_SIZE] = opaque(0xE3, 0x04);
pub const OPAQUE_STATE_QUERY: [u8; OPAQUE_BLOCK_SIZE] = opaque(0x57, 0x06);

const fn opaque(first: u8, second: u8) -> [u8; OPAQUE_BLOCK_SIZE] {
    let mut block = [0u8; OPAQUE_BLOCK_SIZE];
    block[0] = first;
    block[1] = second;
    block
}

/// Payload of the state query that follows `0x82 0x0A`.
pub const STATE_QUERY_PAYLOAD: [u8; 5] = [0xFF, 0xFF, 0xFF, 0x89, 0x26];

// ── Zone selection patterns ───────────────────────────────────────────────────

/// Pattern byte for a selected zone.
pub const ZONE_SELECTED: u8 = 0x01;

/// Pattern byte for an unselected zone.
pub const ZONE_UNSELECTED: u8 = 0x02;

/// Width of the zone pattern in volume/mute/input/tone commands.
pub const COMMAND_PATTERN_LEN: usize = 8;

/// Width of the zone pattern in a power-on command.
pub const POWER_ON_PATTERN_LEN: usize = 11;

/// Width of the zone pattern in a power-off command.
pub const POWER_OFF_PATTERN_LEN: usize = 9;

/// Width of the zone pattern in a change notification.
pub const CHANGE_PATTERN_LEN: usize = 7;

// ── Command codes ─────────────────────────────────────────────────────────────

/// Command byte following [`COMMAND_MARKER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    Volume = 0x01,
    Treble = 0x02,
    Bass = 0x03,
    Balance = 0x05,
    Power = 0x08,
    StateQuery = 0x0A,
    Sync = 0x0C,
    Input = 0x0D,
    Mute = 0x0E,
    TotalVolume = 0x10,
    Rename = 0x13,
    AllNames = 0x15,
}

impl TryFrom<u8> for CommandCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(CommandCode::Volume),
            0x02 => Ok(CommandCode::Treble),
            0x03 => Ok(CommandCode::Bass),
            0x05 => Ok(CommandCode::Balance),
            0x08 => Ok(CommandCode::Power),
            0x0A => Ok(CommandCode::StateQuery),
            0x0C => Ok(CommandCode::Sync),
            0x0D => Ok(CommandCode::Input),
            0x0E => Ok(CommandCode::Mute),
            0x10 => Ok(CommandCode::TotalVolume),
            0x13 => Ok(CommandCode::Rename),
            0x15 => Ok(CommandCode::AllNames),
            _ => Err(()),
        }
    }
}

/// Returns `true` when `bytes` opens with the envelope magic.
pub fn has_envelope_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&ENVELOPE_MAGIC)
}

/// Total frame length declared by an envelope header.
///
/// `None` when fewer than eight bytes are available, or when the declared
/// length does not fit in a `usize`.
pub fn declared_frame_len(bytes: &[u8]) -> Option<usize> {
    let word: [u8; 4] = bytes.get(4..ENVELOPE_LENGTH_END)?.try_into().ok()?;
    let body = usize::try_from(u32::from_le_bytes(word)).ok()?;
    ENVELOPE_HEADER_SIZE.checked_add(body)
}

/// Builds an `N`-byte pattern with [`ZONE_SELECTED`] at each position in
/// `selected` and [`ZONE_UNSELECTED`] elsewhere.
pub(crate) fn zone_pattern<const N: usize>(selected: &[usize]) -> [u8; N] {
    let mut pattern = [ZONE_UNSELECTED; N];
    for &position in selected {
        if let Some(slot) = pattern.get_mut(position) {
            *slot = ZONE_SELECTED;
        }
    }
    pattern
}
