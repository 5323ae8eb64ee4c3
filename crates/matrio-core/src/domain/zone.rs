//! Zone identifiers and decoded per-zone state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::change::ZoneChange;
use crate::domain::ZONE_COUNT;
use crate::error::ValidationError;

/// A 1-based zone id (1..=8).
///
/// On the wire zones are addressed by their 0-based position in an 8-byte
/// selection pattern; [`ZoneId::index`] returns that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ZoneId(u8);

impl ZoneId {
    /// Validates a 1-based zone id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidZone`] for 0 or anything above 8.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use matrio_core::ZoneId;
    ///
    /// assert_eq!(ZoneId::new(3).unwrap().index(), 2);
    /// assert!(ZoneId::new(0).is_err());
    /// assert!(ZoneId::new(9).is_err());
    /// ```
    pub fn new(id: u8) -> Result<Self, ValidationError> {
        if (1..=ZONE_COUNT as u8).contains(&id) {
            Ok(Self(id))
        } else {
            Err(ValidationError::InvalidZone(id))
        }
    }

    /// Builds a zone id from a 0-based wire position.
    ///
    /// Callers iterate `0..ZONE_COUNT`, so the position is always in range.
    pub(crate) fn from_index(index: usize) -> Self {
        debug_assert!(index < ZONE_COUNT, "zone index {index} out of range");
        Self(index as u8 + 1)
    }

    /// The 1-based id as shown to users.
    pub fn get(self) -> u8 {
        self.0
    }

    /// The 0-based wire position.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// All eight zones in ascending order.
    pub fn all() -> impl Iterator<Item = ZoneId> {
        (1..=ZONE_COUNT as u8).map(ZoneId)
    }
}

impl TryFrom<u8> for ZoneId {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ZoneId> for u8 {
    fn from(zone: ZoneId) -> Self {
        zone.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Decoded field values ──────────────────────────────────────────────────────

/// Zone power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    On,
    Off,
    /// A byte that matches neither encoding of the active layout.
    Unknown(u8),
}

/// Zone mute state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MuteState {
    /// Not muted; the device reports this as its default state.
    Default,
    Muted,
    Unknown(u8),
}

impl MuteState {
    pub fn is_muted(self) -> bool {
        matches!(self, MuteState::Muted)
    }
}

/// Left/right balance, -100 (full left) to +100 (full right).
///
/// The three anchor points the device uses are reported symbolically; every
/// other in-range byte is interpolated into [`BalanceValue::Numeric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceValue {
    MaxLeft,
    MaxRight,
    Center,
    Numeric(i8),
    Unknown(u8),
}

impl BalanceValue {
    /// The numeric UI value, or `None` for an unknown byte.
    ///
    /// ```rust
    /// use matrio_core::BalanceValue;
    ///
    /// assert_eq!(BalanceValue::MaxLeft.numeric(), Some(-100));
    /// assert_eq!(BalanceValue::Center.numeric(), Some(0));
    /// assert_eq!(BalanceValue::Unknown(0x7f).numeric(), None);
    /// ```
    pub fn numeric(self) -> Option<i8> {
        match self {
            BalanceValue::MaxLeft => Some(-100),
            BalanceValue::MaxRight => Some(100),
            BalanceValue::Center => Some(0),
            BalanceValue::Numeric(value) => Some(value),
            BalanceValue::Unknown(_) => None,
        }
    }

    /// Maps a numeric UI value back to its symbolic form where one exists.
    pub fn from_numeric(value: i8) -> Self {
        match value {
            -100 => BalanceValue::MaxLeft,
            0 => BalanceValue::Center,
            100 => BalanceValue::MaxRight,
            other => BalanceValue::Numeric(other),
        }
    }
}

/// The input selected on a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputRef {
    /// An input id resolved through the caller's [`crate::InputMapping`].
    Named { id: u8, name: String },
    /// An input byte the mapping has no entry for.
    Unknown(u8),
}

impl InputRef {
    /// The raw input id carried by either variant.
    pub fn id(&self) -> u8 {
        match self {
            InputRef::Named { id, .. } => *id,
            InputRef::Unknown(id) => *id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            InputRef::Named { name, .. } => Some(name),
            InputRef::Unknown(_) => None,
        }
    }
}

/// The undecoded source byte of every field, kept for diagnostics.
///
/// These always reflect the sync packet the snapshot was decoded from; they
/// are not rewritten when a single change is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawZoneBytes {
    pub power: u8,
    pub input: u8,
    pub volume: u8,
    pub balance: u8,
    pub mute: u8,
    pub bass: u8,
    pub treble: u8,
}

/// Decoded state of one zone.
///
/// Produced fresh by every successful sync decode.  A snapshot is never
/// mutated in place: [`ZoneSnapshot::apply`] returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub zone: ZoneId,
    pub power: PowerState,
    pub input: InputRef,
    /// Volume in UI units (0-38).
    pub volume: u8,
    pub balance: BalanceValue,
    pub mute: MuteState,
    /// Bass in UI units (-12..=12).
    pub bass: i8,
    /// Treble in UI units (-12..=12).
    pub treble: i8,
    pub raw: RawZoneBytes,
}

impl ZoneSnapshot {
    /// Returns a copy of this snapshot with `change` applied.
    ///
    /// A [`ZoneChange::TotalVolume`] has no per-zone field and leaves the
    /// snapshot unchanged.
    pub fn apply(&self, change: &ZoneChange) -> ZoneSnapshot {
        let mut next = self.clone();
        match change {
            ZoneChange::Power { on } => {
                next.power = if *on { PowerState::On } else { PowerState::Off };
            }
            ZoneChange::Volume(volume) => next.volume = *volume,
            ZoneChange::Mute { muted } => {
                next.mute = if *muted { MuteState::Muted } else { MuteState::Default };
            }
            ZoneChange::Input { id, name } => {
                next.input = InputRef::Named {
                    id: *id,
                    name: name.clone(),
                };
            }
            ZoneChange::Balance(value) => next.balance = BalanceValue::from_numeric(*value),
            ZoneChange::Bass(level) => next.bass = *level,
            ZoneChange::Treble(level) => next.treble = *level,
            ZoneChange::TotalVolume(_) => {}
        }
        next
    }

    pub fn is_on(&self) -> bool {
        self.power == PowerState::On
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
