//! Infrastructure layer: everything that touches the network.
//!
//! - [`connection`] – the binary control channel, implementing
//!   [`crate::application::Transport`] over a TCP stream.
//! - [`upnp`] – the HTTP handshake some firmware requires before the control
//!   channel accepts commands, plus local address discovery.

pub mod connection;
pub mod upnp;

pub use connection::{ConnectionError, DeviceConnection};
pub use upnp::{local_ip, perform_handshake, HandshakeError, HandshakeSettings};
