//! Application layer: session logic over an abstract transport.
//!
//! Nothing in here opens a socket.  [`DeviceSession`] is generic over
//! [`Transport`], which the infrastructure layer implements for TCP and the
//! tests implement with scripted replies.

pub mod session;
pub mod transport;

pub use session::{DeviceSession, SessionError, SessionTimeouts, SessionUpdate};
pub use transport::{Transport, TransportError};
