//! DeviceSession: the live view of one amplifier.
//!
//! The session owns the only mutable state in the controller:
//!
//! - the [`NameTable`] read from the ALLNAMES packet,
//! - the [`InputMapping`] derived from it and injected into every decoder,
//! - the latest `[ZoneSnapshot; 8]` table.
//!
//! Every inbound byte goes through [`DeviceSession::ingest`], which reassembles
//! frames, classifies them with `matrio_core::decode_inbound` and folds the
//! result into the cache.  Commands are validated and encoded by the core,
//! written to the [`Transport`], and count as acknowledged as soon as the
//! device sends anything back within the response timeout.
//!
//! # Why is a missing names packet not an error? (for beginners)
//!
//! Zone state is useless without the sync packet, so initialization fails
//! without one.  Names are cosmetic: older firmware sometimes skips ALLNAMES,
//! and "Zone 3" / "Input3" are perfectly usable labels.

use std::collections::VecDeque;
use std::time::Duration;

use matrio_core::domain::ZONE_COUNT;
use matrio_core::{
    decode_inbound, encode_command, encode_state_query, frame_extent, ControlCommand, DecodeError,
    InboundPacket, InputMapping, NameTable, SyncPacketLayout, ValidationError, ZoneChangeEvent,
    ZoneId, ZoneSnapshot,
};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::application::transport::{Transport, TransportError};

/// Upper bound on bytes buffered while waiting for a frame to complete.
const MAX_BUFFERED: usize = 4096;

/// Error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The command was rejected before anything was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Initialization finished without a sync packet.
    #[error("device sent no state within {0:?}")]
    NoState(Duration),

    /// The device did not answer a command.
    #[error("device did not respond within {0:?}")]
    NoResponse(Duration),
}

/// How long the session waits for the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// Per-command wait for any reply.
    pub response: Duration,
    /// Wait for the sync and names frames after a state query.
    pub init: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            response: Duration::from_secs(2),
            init: Duration::from_secs(5),
        }
    }
}

/// What changed in the cache after an inbound frame was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "update", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// A sync packet replaced the whole zone table.
    Synced,
    /// An ALLNAMES packet replaced the name table and input mapping.
    NamesUpdated,
    /// A single change was applied to the listed zones.
    Changed(ZoneChangeEvent),
}

/// A session with one amplifier over a [`Transport`].
pub struct DeviceSession<T> {
    transport: T,
    timeouts: SessionTimeouts,
    names: NameTable,
    inputs: InputMapping,
    zones: Option<[ZoneSnapshot; ZONE_COUNT]>,
    layout: Option<SyncPacketLayout>,
    recv_buf: Vec<u8>,
    /// Updates decoded while waiting for something else, oldest first.
    pending: VecDeque<SessionUpdate>,
}

impl<T: Transport> DeviceSession<T> {
    /// Creates a session with default names and no zone state yet.
    pub fn new(transport: T, timeouts: SessionTimeouts) -> Self {
        Self {
            transport,
            timeouts,
            names: NameTable::default(),
            inputs: InputMapping::default(),
            zones: None,
            layout: None,
            recv_buf: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    // ── Initialization ────────────────────────────────────────────────────────

    /// Sends the state query and waits for the sync and names frames.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoState`] if no sync packet arrived within the
    ///   initialization timeout.
    /// - [`SessionError::Transport`] if the connection failed.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        self.transport.send(&encode_state_query()).await?;
        debug!("state query sent");

        let deadline = Instant::now() + self.timeouts.init;
        let mut synced = false;
        let mut named = false;

        while !(synced && named) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let Some(chunk) = self.transport.recv(remaining).await? else {
                break;
            };
            for update in self.ingest(&chunk) {
                match update {
                    SessionUpdate::Synced => synced = true,
                    SessionUpdate::NamesUpdated => named = true,
                    other => self.pending.push_back(other),
                }
            }
        }

        if !synced {
            return Err(SessionError::NoState(self.timeouts.init));
        }
        if !named {
            warn!("device sent no names table; using default names");
        }
        info!(device = %self.names.device_name, "session initialized");
        Ok(())
    }

    /// Re-reads the full state.  Same contract as [`Self::initialize`].
    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        self.initialize().await
    }

    /// Heartbeat: `true` if the device answers a state query in time.
    ///
    /// Whatever it sends back is applied to the cache.
    pub async fn is_alive(&mut self) -> bool {
        if let Err(e) = self.transport.send(&encode_state_query()).await {
            warn!(error = %e, "heartbeat send failed");
            return false;
        }
        match self.transport.recv(self.timeouts.response).await {
            Ok(Some(chunk)) => {
                let updates = self.ingest(&chunk);
                self.pending.extend(updates);
                true
            }
            Ok(None) => {
                warn!("heartbeat unanswered");
                false
            }
            Err(e) => {
                warn!(error = %e, "heartbeat receive failed");
                false
            }
        }
    }

    // ── Inbound ───────────────────────────────────────────────────────────────

    /// Classifies and applies one complete frame.
    ///
    /// Decode failures are logged and yield `None`.
    pub fn handle_packet(&mut self, bytes: &[u8]) -> Option<SessionUpdate> {
        match decode_inbound(bytes, &self.inputs) {
            Ok((packet, _)) => self.apply(packet),
            Err(e) => {
                warn!(error = %e, len = bytes.len(), "could not decode packet");
                None
            }
        }
    }

    /// Appends `chunk` to the receive buffer and applies every complete frame.
    ///
    /// An incomplete trailing frame stays buffered for the next chunk.  A
    /// complete frame that cannot be decoded is skipped with a warning; the
    /// frames behind it are still applied.
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<SessionUpdate> {
        self.recv_buf.extend_from_slice(chunk);
        if self.recv_buf.len() > MAX_BUFFERED {
            warn!(buffered = self.recv_buf.len(), "receive buffer overflow; discarding");
            self.recv_buf.clear();
            return Vec::new();
        }

        let mut updates = Vec::new();
        while !self.recv_buf.is_empty() {
            match decode_inbound(&self.recv_buf, &self.inputs) {
                Ok((packet, consumed)) => {
                    if consumed == 0 {
                        break;
                    }
                    self.recv_buf.drain(..consumed.min(self.recv_buf.len()));
                    updates.extend(self.apply(packet));
                }
                Err(DecodeError::IncompleteFrame {
                    declared,
                    available,
                }) => {
                    debug!(declared, available, "waiting for rest of frame");
                    break;
                }
                Err(e) => match frame_extent(&self.recv_buf) {
                    Ok(skip) if skip > 0 => {
                        warn!(error = %e, skip, "skipping undecodable frame");
                        self.recv_buf.drain(..skip.min(self.recv_buf.len()));
                    }
                    _ => {
                        warn!(error = %e, "discarding undecodable bytes");
                        self.recv_buf.clear();
                        break;
                    }
                },
            }
        }
        updates
    }

    /// Returns the next update, reading from the transport for up to `wait`.
    ///
    /// Updates decoded earlier (while awaiting a command reply) are returned
    /// first.  `Ok(None)` means nothing happened in time.
    pub async fn next_update(
        &mut self,
        wait: Duration,
    ) -> Result<Option<SessionUpdate>, SessionError> {
        if let Some(update) = self.pending.pop_front() {
            return Ok(Some(update));
        }

        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let Some(chunk) = self.transport.recv(remaining).await? else {
                return Ok(None);
            };
            let updates = self.ingest(&chunk);
            self.pending.extend(updates);
            if let Some(update) = self.pending.pop_front() {
                return Ok(Some(update));
            }
        }
    }

    fn apply(&mut self, packet: InboundPacket) -> Option<SessionUpdate> {
        match packet {
            InboundPacket::Sync(snapshot) => {
                if !snapshot.layout.recognized {
                    warn!("sync packet layout not recognized; decoded with 68-byte table");
                }
                self.layout = Some(snapshot.layout);
                self.zones = Some(snapshot.zones);
                Some(SessionUpdate::Synced)
            }
            InboundPacket::Names(table) => {
                debug!(device = %table.device_name, truncated = table.truncated, "names received");
                self.inputs = InputMapping::from(&table);
                self.names = table;
                self.resolve_inputs();
                Some(SessionUpdate::NamesUpdated)
            }
            InboundPacket::Change(event) => {
                if let Some(zones) = self.zones.as_mut() {
                    for zone in &event.zones {
                        let slot = &mut zones[zone.index()];
                        *slot = slot.apply(&event.change);
                    }
                }
                Some(SessionUpdate::Changed(event))
            }
            InboundPacket::Unrecognized => None,
        }
    }

    /// Re-names every cached zone input through the current mapping.
    fn resolve_inputs(&mut self) {
        if let Some(zones) = self.zones.as_mut() {
            for zone in zones.iter_mut() {
                zone.input = self.inputs.resolve(zone.input.id());
            }
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    pub async fn set_power(&mut self, zone: u8, on: bool) -> Result<(), SessionError> {
        self.send_command(ControlCommand::Power { zone, on }).await
    }

    pub async fn set_volume(&mut self, zone: u8, level: u8) -> Result<(), SessionError> {
        self.send_command(ControlCommand::Volume { zone, level }).await
    }

    pub async fn set_mute(&mut self, zone: u8, muted: bool) -> Result<(), SessionError> {
        self.send_command(ControlCommand::Mute { zone, muted }).await
    }

    pub async fn set_input(&mut self, zone: u8, input: u8) -> Result<(), SessionError> {
        self.send_command(ControlCommand::Input { zone, input }).await
    }

    pub async fn set_balance(&mut self, zone: u8, value: i8) -> Result<(), SessionError> {
        self.send_command(ControlCommand::Balance { zone, value }).await
    }

    pub async fn set_bass(&mut self, zone: u8, level: i8) -> Result<(), SessionError> {
        self.send_command(ControlCommand::Bass { zone, level }).await
    }

    pub async fn set_treble(&mut self, zone: u8, level: i8) -> Result<(), SessionError> {
        self.send_command(ControlCommand::Treble { zone, level }).await
    }

    /// Renames a zone and updates the cached name table on success.
    pub async fn rename_zone(&mut self, zone: u8, name: &str) -> Result<(), SessionError> {
        self.send_command(ControlCommand::RenameZone {
            zone,
            name: name.to_string(),
        })
        .await?;
        self.names.set_zone_name(ZoneId::new(zone)?, name);
        Ok(())
    }

    /// Renames an input and updates the name table and input mapping on success.
    pub async fn rename_input(&mut self, input: u8, name: &str) -> Result<(), SessionError> {
        self.send_command(ControlCommand::RenameInput {
            input,
            name: name.to_string(),
        })
        .await?;
        self.names.set_input_name(input, name);
        self.inputs.insert(input, name);
        self.resolve_inputs();
        Ok(())
    }

    /// Encodes, sends and waits for any reply.
    async fn send_command(&mut self, command: ControlCommand) -> Result<(), SessionError> {
        let frame = encode_command(&command)?;
        self.transport.send(&frame).await?;
        debug!(?command, len = frame.len(), "command sent");

        match self.transport.recv(self.timeouts.response).await? {
            Some(chunk) => {
                let updates = self.ingest(&chunk);
                self.pending.extend(updates);
                Ok(())
            }
            None => Err(SessionError::NoResponse(self.timeouts.response)),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// All eight zones, or `None` before the first sync.
    pub fn zones(&self) -> Option<&[ZoneSnapshot; ZONE_COUNT]> {
        self.zones.as_ref()
    }

    pub fn zone(&self, zone: ZoneId) -> Option<&ZoneSnapshot> {
        self.zones.as_ref().map(|zones| &zones[zone.index()])
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn input_mapping(&self) -> &InputMapping {
        &self.inputs
    }

    /// Layout of the last sync packet.
    pub fn layout(&self) -> Option<SyncPacketLayout> {
        self.layout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
