//! Value codecs: wire byte to UI value and back.
//!
//! Every decode function is total.  A byte that matches no known encoding
//! becomes an `Unknown(byte)` variant so a diagnostic view can still show it,
//! with one exception: bass and treble decode out-of-range bytes to `0`.
//! That asymmetry matches what the device has been observed to do and is kept
//! as is.
//!
//! Encode functions assume their argument was already range-checked by the
//! command encoder; they clamp only to keep the arithmetic total.

use crate::domain::zone::{BalanceValue, MuteState, PowerState};
use crate::protocol::layout::SyncLayout;

// ── Ranges ────────────────────────────────────────────────────────────────────

/// Highest volume the device accepts, in UI units.
pub const VOLUME_MAX: u8 = 38;

pub const BALANCE_MIN: i8 = -100;
pub const BALANCE_MAX: i8 = 100;

/// Bass and treble share one range.
pub const TONE_MIN: i8 = -12;
pub const TONE_MAX: i8 = 12;

pub const BALANCE_WIRE_LEFT: u8 = 0x01;
pub const BALANCE_WIRE_CENTER: u8 = 0x1F;
pub const BALANCE_WIRE_RIGHT: u8 = 0x3D;

pub const TONE_WIRE_MIN: u8 = 0x01;
pub const TONE_WIRE_MAX: u8 = 0x19;
/// Wire byte for a flat (0) bass or treble setting.
pub const TONE_WIRE_FLAT: u8 = 0x0D;

// ── Volume ────────────────────────────────────────────────────────────────────

/// `ui = wire - 1`, floored at 0.
pub fn volume_wire_to_ui(wire: u8) -> u8 {
    wire.saturating_sub(1)
}

/// `wire = ui + 1`, never below 1.  The device rejects a wire volume of 0.
pub fn volume_ui_to_wire(ui: u8) -> u8 {
    ui.saturating_add(1).max(1)
}

// ── Balance ───────────────────────────────────────────────────────────────────

/// Decodes a balance byte.
///
/// The three anchors map to their symbolic variants.  Any other byte inside
/// `0x01..=0x3D` is interpolated linearly onto -100..=100 and rounded to the
/// nearest integer.
///
/// ```rust
/// use matrio_core::protocol::values::balance_wire_to_ui;
/// use matrio_core::BalanceValue;
///
/// assert_eq!(balance_wire_to_ui(0x1f), BalanceValue::Center);
/// assert_eq!(balance_wire_to_ui(0x10), BalanceValue::Numeric(-50));
/// assert_eq!(balance_wire_to_ui(0x40), BalanceValue::Unknown(0x40));
/// ```
pub fn balance_wire_to_ui(wire: u8) -> BalanceValue {
    match wire {
        BALANCE_WIRE_LEFT => BalanceValue::MaxLeft,
        BALANCE_WIRE_CENTER => BalanceValue::Center,
        BALANCE_WIRE_RIGHT => BalanceValue::MaxRight,
        BALANCE_WIRE_LEFT..=BALANCE_WIRE_RIGHT => {
            // (wire - 1) / 60 * 200, rounded.  The numerator is never an exact
            // half of 3, so (x + 1) / 3 is round-to-nearest.
            let steps = i16::from(wire - BALANCE_WIRE_LEFT);
            let scaled = (steps * 10 + 1) / 3;
            BalanceValue::Numeric((scaled - 100) as i8)
        }
        other => BalanceValue::Unknown(other),
    }
}

/// Encodes a balance value using the same three anchors as the decoder.
///
/// -100..=0 maps onto `0x01..=0x1F` and 0..=100 onto `0x1F..=0x3D`.
pub fn balance_ui_to_wire(value: i8) -> u8 {
    let value = i16::from(value).clamp(i16::from(BALANCE_MIN), i16::from(BALANCE_MAX));
    let wire = if value <= 0 {
        i16::from(BALANCE_WIRE_LEFT) + ((value + 100) * 30 + 50) / 100
    } else {
        i16::from(BALANCE_WIRE_CENTER) + (value * 30 + 50) / 100
    };
    wire.clamp(i16::from(BALANCE_WIRE_LEFT), i16::from(BALANCE_WIRE_RIGHT)) as u8
}

// ── Bass / treble ─────────────────────────────────────────────────────────────

/// `ui = wire - 0x0D` for bytes in `0x01..=0x19`; anything else decodes to 0.
pub fn tone_wire_to_ui(wire: u8) -> i8 {
    if (TONE_WIRE_MIN..=TONE_WIRE_MAX).contains(&wire) {
        wire as i8 - TONE_WIRE_FLAT as i8
    } else {
        0
    }
}

pub fn tone_ui_to_wire(value: i8) -> u8 {
    (i16::from(value) + i16::from(TONE_WIRE_FLAT))
        .clamp(i16::from(TONE_WIRE_MIN), i16::from(TONE_WIRE_MAX)) as u8
}

// ── Power / mute ──────────────────────────────────────────────────────────────

/// Decodes a power byte.  The two layouts use opposite encodings.
pub fn power_wire_to_ui(wire: u8, layout: SyncLayout) -> PowerState {
    match (layout, wire) {
        (SyncLayout::NinetySix, 0x02) | (SyncLayout::SixtyEight, 0x01) => PowerState::On,
        (SyncLayout::NinetySix, 0x01) | (SyncLayout::SixtyEight, 0x02) => PowerState::Off,
        (_, other) => PowerState::Unknown(other),
    }
}

/// Decodes a mute byte.  Only the "not muted" byte differs between layouts.
pub fn mute_wire_to_ui(wire: u8, layout: SyncLayout) -> MuteState {
    match (layout, wire) {
        (SyncLayout::NinetySix, 0x01) | (SyncLayout::SixtyEight, 0x0D) => MuteState::Default,
        (_, 0x02) => MuteState::Muted,
        (_, other) => MuteState::Unknown(other),
    }
}
