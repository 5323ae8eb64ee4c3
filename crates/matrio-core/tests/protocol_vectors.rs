//! Integration tests for the matrio-core codec against captured device traffic.
//!
//! The hex vectors below were recorded from a DAX88 on a live network.  They
//! exercise the public API end to end: layout detection, value codecs, the
//! change decoder, the names parser and the command encoder.

use matrio_core::protocol::commands::{
    encode_balance, encode_bass, encode_input, encode_input_name, encode_mute, encode_power,
    encode_treble, encode_volume, encode_zone_name,
};
use matrio_core::protocol::values::{
    balance_ui_to_wire, balance_wire_to_ui, tone_ui_to_wire, tone_wire_to_ui, volume_ui_to_wire,
    volume_wire_to_ui,
};
use matrio_core::{
    decode_change, decode_inbound, decode_sync, extract_sync_section, parse_names, BalanceValue,
    InboundPacket, InputMapping, MuteState, PowerState, SyncLayout, ValidationError, ZoneChange,
    ZoneId,
};

// ── Captured vectors ──────────────────────────────────────────────────────────

const SYNC_SECTION_68: &str = "820c0104030208080804050a01271d0805050d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d1f3d1f1f1f1f1f1f02010201020101010101010101020101010240180c14ffffcc26";

const SYNC_PREAMBLE_28: &str = "189618204c0000009e08000000000000000000004d43552b5041532b";

const ALLNAMES: &str = concat!(
    "18961820a3000000823400000000000000000000",
    "4d43552b5041532b82150b4441582038385f363136450b4c6976696e6720526f6f6d0e4d617374",
    "657220426564726f6f6d0d4465636b2055707374616972730f4465636b20446f776e7374616972",
    "730a446f776e737461697273065a4f4e453636055a4f4e4537055a4f4e45380254560c476f6f67",
    "6c65204d7573696306496e7075743306496e7075743406496e7075743507496e70757436360649",
    "6e70757437cc26",
);

fn hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).expect("valid hex"))
        .collect()
}

fn zone(id: u8) -> ZoneId {
    ZoneId::new(id).expect("valid zone")
}

// ── Sync packets ──────────────────────────────────────────────────────────────

#[test]
fn test_sync_68_zone_one_matches_field_table() {
    // Arrange
    let bytes = hex(SYNC_SECTION_68);
    assert_eq!(bytes.len(), 68);

    // Act
    let snapshot = decode_sync(&bytes, &InputMapping::default()).expect("decode");
    let z1 = snapshot.zone(zone(1));

    // Assert
    assert_eq!(z1.raw.input, 0x01);
    assert_eq!(z1.raw.volume, 0x05);
    assert_eq!(z1.volume, 4);
    assert_eq!(z1.raw.power, 0x01);
    assert_eq!(z1.power, PowerState::On);
    assert_eq!(z1.raw.mute, bytes[28]);
    assert_eq!(z1.mute, MuteState::Default);
}

#[test]
fn test_sync_96_normalizes_to_same_values_as_68() {
    // Arrange
    let section = hex(SYNC_SECTION_68);
    let mut enveloped = hex(SYNC_PREAMBLE_28);
    enveloped.extend_from_slice(&section);

    // Act
    let short = decode_sync(&section, &InputMapping::default()).expect("68-byte decode");
    let long = decode_sync(&enveloped, &InputMapping::default()).expect("96-byte decode");

    // Assert
    assert_eq!(short.layout.layout, SyncLayout::SixtyEight);
    assert_eq!(long.layout.layout, SyncLayout::NinetySix);
    for id in ZoneId::all() {
        let (a, b) = (short.zone(id), long.zone(id));
        assert_eq!(a.input, b.input, "zone {id} input");
        assert_eq!(a.volume, b.volume, "zone {id} volume");
        assert_eq!(a.balance, b.balance, "zone {id} balance");
        assert_eq!(a.bass, b.bass, "zone {id} bass");
        assert_eq!(a.treble, b.treble, "zone {id} treble");
    }
}

#[test]
fn test_sync_uses_caller_input_mapping() {
    // Arrange
    let names = parse_names(&hex(ALLNAMES)).expect("names");
    let mapping = InputMapping::from(&names);

    // Act
    let snapshot = decode_sync(&hex(SYNC_SECTION_68), &mapping).expect("decode");

    // Assert: zone 1 is on input 1 ("TV"), zone 3 on input 3
    assert_eq!(snapshot.zone(zone(1)).input.name(), Some("TV"));
    assert_eq!(snapshot.zone(zone(3)).input.name(), Some("Input3"));
}

#[test]
fn test_extracted_section_from_larger_buffer_decodes() {
    let mut buf = vec![0x00, 0x11, 0x22];
    buf.extend_from_slice(&hex(SYNC_SECTION_68));
    let section = extract_sync_section(&buf).expect("signature present");
    let snapshot = decode_sync(section, &InputMapping::default()).expect("decode");
    assert_eq!(snapshot.zone(zone(2)).balance, BalanceValue::MaxRight);
}

// ── Change notifications ──────────────────────────────────────────────────────

#[test]
fn test_direct_power_change() {
    let bytes = [0x82, 0x08, 0x02, 0x01, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02];
    let event = decode_change(&bytes, &InputMapping::default()).expect("power change");
    assert_eq!(event.zones, vec![zone(1)]);
    assert_eq!(event.change, ZoneChange::Power { on: true });
}

#[test]
fn test_non_protocol_bytes_are_none() {
    let mapping = InputMapping::default();
    assert!(decode_change(&[0x01, 0x02, 0x03], &mapping).is_none());
    assert!(decode_change(&[0x18, 0x96, 0x18], &mapping).is_none());
    assert!(decode_change(&[0xFF; 64], &mapping).is_none());
}

#[test]
fn test_encoded_volume_round_trips_through_change_decoder() {
    // Arrange
    let frame = encode_volume(3, 20).expect("encode");

    // Act: the full frame decodes as a command echo, the section after the
    // envelope header and tag decodes as a direct broadcast
    let echo = decode_change(&frame, &InputMapping::default()).expect("echo");
    let direct = decode_change(&frame[28..], &InputMapping::default()).expect("direct");

    // Assert
    for event in [echo, direct] {
        assert_eq!(event.change, ZoneChange::Volume(20));
        assert_eq!(event.zones, vec![zone(3)]);
    }
}

#[test]
fn test_encoded_commands_round_trip_as_echoes() {
    let mapping = InputMapping::default();
    let cases = [
        (encode_mute(2, true), ZoneChange::Mute { muted: true }),
        (encode_bass(2, -5), ZoneChange::Bass(-5)),
        (encode_treble(2, 7), ZoneChange::Treble(7)),
        (encode_balance(2, 50), ZoneChange::Balance(50)),
        (
            encode_input(2, 4),
            ZoneChange::Input {
                id: 4,
                name: "Input4".to_string(),
            },
        ),
    ];
    for (frame, expected) in cases {
        let frame = frame.expect("encode");
        let event = decode_change(&frame, &mapping).expect("decode");
        assert_eq!(event.change, expected);
        assert_eq!(event.zones, vec![zone(2)]);
    }
}

// ── Names ─────────────────────────────────────────────────────────────────────

#[test]
fn test_allnames_capture_parses_and_defaults_eighth_input() {
    // Arrange
    let bytes = hex(ALLNAMES);
    assert_eq!(bytes.len(), 183);

    // Act
    let table = parse_names(&bytes).expect("names");

    // Assert
    assert_eq!(table.device_name, "DAX 88_616E");
    assert_eq!(
        table.zone_names,
        vec![
            "Living Room",
            "Master Bedroom",
            "Deck Upstairs",
            "Deck Downstairs",
            "Downstairs",
            "ZONE66",
            "ZONE7",
            "ZONE8",
        ]
    );
    assert_eq!(table.input_name(1), Some("TV"));
    assert_eq!(table.input_name(2), Some("Google Music"));
    assert_eq!(table.input_name(6), Some("Input66"));
    assert_eq!(table.input_name(7), Some("Input7"));
    assert_eq!(table.input_name(8), Some("Wi-Fi"));
    assert!(table.truncated);
}

#[test]
fn test_allnames_is_classified_by_inbound_decoder() {
    let bytes = hex(ALLNAMES);
    let (packet, consumed) = decode_inbound(&bytes, &InputMapping::default()).expect("decode");
    assert_eq!(consumed, bytes.len());
    assert!(matches!(packet, InboundPacket::Names(ref t) if t.device_name == "DAX 88_616E"));
}

// ── Validation ────────────────────────────────────────────────────────────────

#[test]
fn test_every_encoder_rejects_zone_zero_and_nine() {
    for bad in [0u8, 9] {
        let expected = Err(ValidationError::InvalidZone(bad));
        assert_eq!(encode_power(bad, true), expected);
        assert_eq!(encode_power(bad, false), expected);
        assert_eq!(encode_volume(bad, 10), expected);
        assert_eq!(encode_mute(bad, true), expected);
        assert_eq!(encode_input(bad, 1), expected);
        assert_eq!(encode_balance(bad, 0), expected);
        assert_eq!(encode_bass(bad, 0), expected);
        assert_eq!(encode_treble(bad, 0), expected);
        assert_eq!(encode_zone_name(bad, "Den"), expected);
    }
    assert_eq!(encode_input_name(0, "Den"), Err(ValidationError::InvalidInput(0)));
}

// ── Codec properties ──────────────────────────────────────────────────────────

#[test]
fn test_volume_codec_round_trip() {
    for v in 0..=38u8 {
        assert_eq!(volume_wire_to_ui(volume_ui_to_wire(v)), v);
    }
}

#[test]
fn test_tone_codec_round_trip() {
    for b in -12..=12i8 {
        assert_eq!(tone_wire_to_ui(tone_ui_to_wire(b)), b);
    }
}

#[test]
fn test_balance_anchor_points() {
    assert_eq!(balance_ui_to_wire(-100), 0x01);
    assert_eq!(balance_ui_to_wire(0), 0x1F);
    assert_eq!(balance_ui_to_wire(100), 0x3D);
    assert_eq!(balance_wire_to_ui(0x01).numeric(), Some(-100));
    assert_eq!(balance_wire_to_ui(0x1F).numeric(), Some(0));
    assert_eq!(balance_wire_to_ui(0x3D).numeric(), Some(100));
}
