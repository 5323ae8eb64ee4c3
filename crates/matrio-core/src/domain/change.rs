//! Discrete change notifications.
//!
//! The amplifier broadcasts a short packet whenever any controller (the
//! wall keypad, the vendor app, or this library) changes a zone setting, and it
//! echoes every command it accepts.  Both shapes decode into a
//! [`ZoneChangeEvent`]: the affected zones plus one [`ZoneChange`].

use serde::{Deserialize, Serialize};

use crate::domain::zone::ZoneId;

/// Which setting a change touches, without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Power,
    Volume,
    Mute,
    Input,
    Balance,
    Bass,
    Treble,
    TotalVolume,
}

/// The new value of one zone setting, in UI units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneChange {
    Power { on: bool },
    Volume(u8),
    Mute { muted: bool },
    Input { id: u8, name: String },
    Balance(i8),
    Bass(i8),
    Treble(i8),
    /// Master volume across all zones; carries no per-zone meaning.
    TotalVolume(u8),
}

impl ZoneChange {
    pub fn kind(&self) -> CommandKind {
        match self {
            ZoneChange::Power { .. } => CommandKind::Power,
            ZoneChange::Volume(_) => CommandKind::Volume,
            ZoneChange::Mute { .. } => CommandKind::Mute,
            ZoneChange::Input { .. } => CommandKind::Input,
            ZoneChange::Balance(_) => CommandKind::Balance,
            ZoneChange::Bass(_) => CommandKind::Bass,
            ZoneChange::Treble(_) => CommandKind::Treble,
            ZoneChange::TotalVolume(_) => CommandKind::TotalVolume,
        }
    }
}

/// One decoded change packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneChangeEvent {
    /// Zones selected by the packet's pattern, ascending.  May be empty.
    pub zones: Vec<ZoneId>,
    pub change: ZoneChange,
    /// The raw command byte, kept for logging.
    pub raw_command: u8,
    /// The eight payload bytes following the command byte.
    pub raw_payload: [u8; 8],
}

impl ZoneChangeEvent {
    pub fn kind(&self) -> CommandKind {
        self.change.kind()
    }

    /// Returns `true` when the event selects `zone`.
    pub fn affects(&self, zone: ZoneId) -> bool {
        self.zones.contains(&zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(ZoneChange::Power { on: true }.kind(), CommandKind::Power);
        assert_eq!(ZoneChange::TotalVolume(3).kind(), CommandKind::TotalVolume);
        assert_eq!(
            ZoneChange::Input {
                id: 1,
                name: "TV".into()
            }
            .kind(),
            CommandKind::Input
        );
    }

    #[test]
    fn test_event_affects_only_selected_zones() {
        // Arrange
        let event = ZoneChangeEvent {
            zones: vec![ZoneId::new(1).unwrap(), ZoneId::new(4).unwrap()],
            change: ZoneChange::Volume(10),
            raw_command: 0x01,
            raw_payload: [0x0b, 1, 2, 2, 1, 2, 2, 2],
        };

        // Act / Assert
        assert!(event.affects(ZoneId::new(4).unwrap()));
        assert!(!event.affects(ZoneId::new(2).unwrap()));
        assert_eq!(event.kind(), CommandKind::Volume);
    }
}
