//! matrio-client library crate.
//!
//! Everything needed to talk to a live amplifier: the TCP control channel,
//! the UPnP handshake some firmware insists on before it accepts binary
//! commands, and a session that keeps the latest decoded state.
//!
//! # Architecture
//!
//! ```text
//! matrio (CLI)
//!       ↕
//! [matrio-client]
//!   ├── domain/           ClientConfig (read-only TOML + defaults)
//!   ├── application/      DeviceSession, Transport trait
//!   └── infrastructure/
//!         ├── connection/ TCP control channel (port 8899)
//!         └── upnp/       SUBSCRIBE + SOAP handshake (port 59152)
//!       ↕
//! amplifier
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `matrio-core` and the [`Transport`]
//!   trait it defines; it never touches a socket directly.
//! - `infrastructure` implements [`Transport`] on top of `tokio`.
//!
//! # For beginners: why a `Transport` trait?
//!
//! The session logic (send a command, wait for the echo, apply whatever the
//! device sent back) is the part worth testing.  Putting the socket behind a
//! trait lets the tests drive the session with an in-memory fake instead of a
//! real amplifier.
//!
//! [`Transport`]: application::Transport

/// Domain layer: configuration types.
pub mod domain;

/// Application layer: the device session.
pub mod application;

/// Infrastructure layer: TCP connection and UPnP handshake.
pub mod infrastructure;
