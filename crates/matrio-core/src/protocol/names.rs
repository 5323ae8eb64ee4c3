//! ALLNAMES response parser.
//!
//! ```text
//! [envelope header:20]["MCU+PAS+" 82 15:10][len][device name]([len][zone name])x8([len][input name])x8 ...
//! ```
//!
//! The device regularly cuts the response short, most often just before the
//! eighth input name.  Running out of bytes after the device name is
//! therefore not an error: the remaining names get their defaults and
//! [`NameTable::truncated`] is set.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::names::{default_input_name, default_zone_name, NameTable};
use crate::domain::{INPUT_COUNT, ZONE_COUNT};
use crate::error::DecodeError;
use crate::protocol::wire::{ENVELOPE_HEADER_SIZE, PAS_TAG};

/// Bytes skipped before the first name: envelope header, tag, `82 15`.
pub const NAMES_DATA_OFFSET: usize = ENVELOPE_HEADER_SIZE + PAS_TAG.len() + 2;

/// Parses an ALLNAMES response.
///
/// # Errors
///
/// Returns [`DecodeError::TruncatedPacket`] when the buffer does not even
/// contain the complete device name.
pub fn parse_names(bytes: &[u8]) -> Result<NameTable, DecodeError> {
    let mut reader = PascalReader::new(bytes.get(NAMES_DATA_OFFSET..).unwrap_or_default());

    let device_name = match reader.next_string() {
        Some(name) => name,
        None => {
            let declared = bytes.get(NAMES_DATA_OFFSET).copied().unwrap_or(0);
            return Err(DecodeError::TruncatedPacket {
                context: "names payload",
                needed: NAMES_DATA_OFFSET + 1 + usize::from(declared),
                available: bytes.len(),
            });
        }
    };

    let zone_names: Vec<String> = (1..=ZONE_COUNT as u8)
        .map(|zone| reader.next_string().unwrap_or_else(|| default_zone_name(zone)))
        .collect();

    let input_names: BTreeMap<u8, String> = (1..=INPUT_COUNT as u8)
        .map(|id| {
            let name = reader.next_string().unwrap_or_else(|| default_input_name(id));
            (id, name)
        })
        .collect();

    let truncated = reader.exhausted;
    if truncated {
        warn!(
            available = bytes.len(),
            "names payload truncated; missing names use defaults"
        );
    }
    debug!(device = %device_name, ?zone_names, "parsed names");

    Ok(NameTable {
        device_name,
        zone_names,
        input_names,
        truncated,
    })
}

/// Reads consecutive `[len][bytes]` strings.
///
/// Once a string cannot be read in full the reader stays exhausted, so a
/// short buffer never yields a name that starts in the middle of another.
struct PascalReader<'a> {
    data: &'a [u8],
    pos: usize,
    exhausted: bool,
}

impl<'a> PascalReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            exhausted: false,
        }
    }

    fn next_string(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        let Some(&len) = self.data.get(self.pos) else {
            self.exhausted = true;
            return None;
        };
        let start = self.pos + 1;
        let Some(raw) = self.data.get(start..start + usize::from(len)) else {
            self.exhausted = true;
            return None;
        };
        self.pos = start + usize::from(len);
        // Non-ASCII bytes are dropped.
        Some(raw.iter().filter(|b| b.is_ascii()).map(|&b| char::from(b)).collect())
    }
}
