//! UPnP handshake.
//!
//! Some firmware ignores the binary control channel until a controller has
//! subscribed to its UPnP events and issued a few SOAP queries, the way the
//! vendor's phone app does on launch.  The sequence is:
//!
//! 1. `SUBSCRIBE` to `/upnp/event/rendertransport1`
//! 2. `SUBSCRIBE` to `/upnp/event/rendercontrol1`
//! 3. `SUBSCRIBE` to `/upnp/event/PlayQueue1`
//! 4. `POST` `RenderingControl:1#GetControlDeviceInfo`
//! 5. `POST` `AVTransport:1#GetInfoEx`
//! 6. `POST` `RenderingControl:1#GetChannel` (channel `Master`)
//!
//! Each request goes out on its own short-lived TCP connection to the UPnP
//! port and waits for a reply, with a short pause between steps.  Replies are
//! not parsed; the device only needs to have seen the requests.
//!
//! # Why raw TCP instead of an HTTP client? (for beginners)
//!
//! The device compares request headers against what the phone app sends,
//! including the `User-Agent` and header order.  Writing the request text
//! ourselves keeps it byte-for-byte predictable.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time;
use tracing::{debug, info, warn};

/// Event endpoints subscribed to, in order.
pub const EVENT_PATHS: [&str; 3] = [
    "/upnp/event/rendertransport1",
    "/upnp/event/rendercontrol1",
    "/upnp/event/PlayQueue1",
];

/// Requested subscription lifetime.
pub const SUBSCRIPTION_TIMEOUT: &str = "Second-1800";

/// The `User-Agent` the vendor app identifies itself with.
pub const USER_AGENT: &str = "iOS/7.0 UPnP/1.1 UPNPX/1.2.4";

/// One SOAP query of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoapCall {
    pub path: &'static str,
    /// Service type name, e.g. `RenderingControl`.
    pub service: &'static str,
    pub action: &'static str,
    /// Adds `<Channel>Master</Channel>` after the instance id.
    pub master_channel: bool,
}

/// SOAP queries issued after the subscriptions, in order.
pub const SOAP_CALLS: [SoapCall; 3] = [
    SoapCall {
        path: "/upnp/control/rendercontrol1",
        service: "RenderingControl",
        action: "GetControlDeviceInfo",
        master_channel: false,
    },
    SoapCall {
        path: "/upnp/control/rendertransport1",
        service: "AVTransport",
        action: "GetInfoEx",
        master_channel: false,
    },
    SoapCall {
        path: "/upnp/control/rendercontrol1",
        service: "RenderingControl",
        action: "GetChannel",
        master_channel: true,
    },
];

/// Errors from the handshake.  Any failed step aborts the sequence.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("handshake request to {path} failed: {source}")]
    Io {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("handshake request to {path} timed out after {timeout:?}")]
    Timeout {
        path: &'static str,
        timeout: Duration,
    },
}

/// Where and how to run the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeSettings {
    /// Device address and UPnP port.
    pub upnp_addr: SocketAddr,
    /// Port announced in the `CALLBACK` header.
    pub callback_port: u16,
    /// Pause between consecutive requests.
    pub step_delay: Duration,
    /// Limit for connecting, writing and reading one step.
    pub timeout: Duration,
}

// ── Request builders ──────────────────────────────────────────────────────────

/// Builds the `SUBSCRIBE` request for `path`.
pub fn subscribe_request(upnp_addr: SocketAddr, path: &str, callback: SocketAddr) -> String {
    format!(
        "SUBSCRIBE {path} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         Content-Length: 0\r\n\
         Connection: keep-alive\r\n\
         TIMEOUT: {SUBSCRIPTION_TIMEOUT}\r\n\
         NT: upnp:event\r\n\
         User-Agent: {USER_AGENT}\r\n\
         CALLBACK: <http://{callback}/Event>\r\n\
         Accept-Encoding: gzip, deflate\r\n\
         \r\n",
        host = upnp_addr.ip(),
        port = upnp_addr.port(),
    )
}

/// The SOAP envelope for `call`.
pub fn soap_body(call: &SoapCall) -> String {
    let channel = if call.master_channel {
        "<Channel>Master</Channel>"
    } else {
        ""
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <s:Envelope s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\" \
         xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <s:Body><u:{action} xmlns:u=\"urn:schemas-upnp-org:service:{service}:1\">\
         <InstanceID>0</InstanceID>{channel}</u:{action}></s:Body></s:Envelope>",
        action = call.action,
        service = call.service,
    )
}

/// Builds the `POST` request for `call`.  `Host` carries the bare address.
pub fn soap_request(device: IpAddr, call: &SoapCall) -> String {
    let body = soap_body(call);
    format!(
        "POST {path} HTTP/1.1\r\n\
         Host: {device}\r\n\
         SOAPACTION: \"urn:schemas-upnp-org:service:{service}:1#{action}\"\r\n\
         Content-Type: text/xml; charset=\"utf-8\"\r\n\
         Content-Length: {len}\r\n\
         \r\n\
         {body}",
        path = call.path,
        service = call.service,
        action = call.action,
        len = body.len(),
    )
}

// ── Handshake ─────────────────────────────────────────────────────────────────

/// Runs the six-step handshake against `settings.upnp_addr`.
///
/// `local_ip` is announced in the subscription callback URL; see [`local_ip`].
///
/// # Errors
///
/// Returns the first step's [`HandshakeError`]; later steps are not attempted.
pub async fn perform_handshake(
    settings: &HandshakeSettings,
    local_ip: IpAddr,
) -> Result<(), HandshakeError> {
    let callback = SocketAddr::new(local_ip, settings.callback_port);
    let device = settings.upnp_addr.ip();

    let steps = EVENT_PATHS
        .iter()
        .map(|path| (*path, subscribe_request(settings.upnp_addr, path, callback)))
        .chain(
            SOAP_CALLS
                .iter()
                .map(|call| (call.path, soap_request(device, call))),
        );

    for (index, (path, request)) in steps.enumerate() {
        if index > 0 {
            time::sleep(settings.step_delay).await;
        }
        let replied = exchange(settings.upnp_addr, path, &request, settings.timeout).await?;
        if replied == 0 {
            warn!(path, "handshake step got an empty reply");
        }
    }

    info!(addr = %settings.upnp_addr, "UPnP handshake complete");
    Ok(())
}

/// One request/response on a fresh connection.  Returns the reply length.
async fn exchange(
    addr: SocketAddr,
    path: &'static str,
    request: &str,
    timeout: Duration,
) -> Result<usize, HandshakeError> {
    let step = async {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(request.as_bytes()).await?;
        let mut reply = [0u8; 1024];
        stream.read(&mut reply).await
    };

    match time::timeout(timeout, step).await {
        Ok(Ok(len)) => {
            debug!(path, len, "handshake step answered");
            Ok(len)
        }
        Ok(Err(source)) => Err(HandshakeError::Io { path, source }),
        Err(_) => Err(HandshakeError::Timeout { path, timeout }),
    }
}

// ── Local address discovery ───────────────────────────────────────────────────

/// The local address the device can call back on.
///
/// Connecting a UDP socket sends nothing but makes the OS pick the outbound
/// interface.  Tries the device itself, then a public address, then falls
/// back to loopback.
pub async fn local_ip(device: IpAddr) -> IpAddr {
    let targets = [
        SocketAddr::new(device, 80),
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80),
    ];
    for target in targets {
        if let Some(ip) = route_source(target).await {
            return ip;
        }
    }
    warn!("could not determine local address; announcing loopback");
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

async fn route_source(target: SocketAddr) -> Option<IpAddr> {
    let bind = if target.is_ipv4() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
    } else {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
    };
    let socket = UdpSocket::bind(bind).await.ok()?;
    socket.connect(target).await.ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
