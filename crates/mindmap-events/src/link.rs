//! Host-side view of the rendering surface's lifecycle.
//!
//! ```text
//! Loading --ready--> Ready
//!    |                 |
//!    +--timeout/error--+--> Failed --retry--> Loading
//! ```
//!
//! While loading, outgoing messages are buffered. Once the surface reports
//! `ready`, [`SurfaceLink::handshake`] sends `init` first and then replays
//! the buffered view-state messages; buffered graph-data messages are
//! dropped since `init` carries the full payload.

use crate::channel::{ChannelError, HostPort, SurfacePort, duplex};
use crate::protocol::{HostMessage, SurfaceMessage};
use mindmap_core::GraphPayload;
use std::time::{Duration, Instant};

/// Creates (or recreates) the isolated rendering surface on the far end of a
/// fresh channel.
pub trait SurfaceFactory: Send {
    fn spawn(&mut self, port: SurfacePort) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Loading { since: Instant },
    Ready,
    Failed { reason: String },
}

pub struct SurfaceLink {
    port: HostPort,
    state: LinkState,
    pending: Vec<HostMessage>,
    ready_timeout: Duration,
    factory: Option<Box<dyn SurfaceFactory>>,
    generation: u32,
    /// Set when a message was lost on a live surface; the mirror needs a
    /// full update.
    stale: bool,
}

impl SurfaceLink {
    /// Wraps an already-connected port whose surface was created by the caller.
    pub fn new(port: HostPort, ready_timeout: Duration) -> Self {
        Self {
            port,
            state: LinkState::Loading {
                since: Instant::now(),
            },
            pending: Vec::new(),
            ready_timeout,
            factory: None,
            generation: 0,
            stale: false,
        }
    }

    /// Creates a channel and spawns the surface through `factory`. The
    /// factory is kept for [`SurfaceLink::retry`].
    pub fn spawn(
        mut factory: Box<dyn SurfaceFactory>,
        ready_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let (host, surface) = duplex();
        factory.spawn(surface)?;
        let mut link = Self::new(host, ready_timeout);
        link.factory = Some(factory);
        Ok(link)
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LinkState::Ready
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Reports, once, that a message to the ready surface was lost.
    pub fn take_stale(&mut self) -> bool {
        std::mem::take(&mut self.stale)
    }

    /// Sends now when ready, buffers while loading, drops when failed.
    pub fn send(&mut self, message: HostMessage) {
        match &self.state {
            LinkState::Ready => self.transmit(&message),
            LinkState::Loading { .. } => {
                tracing::trace!(kind = message.kind(), "Buffering message until surface is ready");
                self.pending.push(message);
            }
            LinkState::Failed { .. } => {
                tracing::debug!(kind = message.kind(), "Dropping message for failed surface");
            }
        }
    }

    fn transmit(&mut self, message: &HostMessage) {
        match self.port.send(message) {
            Ok(()) => {}
            Err(ChannelError::Disconnected) => {
                self.fail("Rendering surface disconnected".to_string());
            }
            Err(error) => {
                tracing::error!(kind = message.kind(), %error, "Failed to send message to surface");
                self.stale = true;
            }
        }
    }

    fn fail(&mut self, reason: String) {
        if matches!(self.state, LinkState::Failed { .. }) {
            return;
        }
        tracing::warn!(generation = self.generation, %reason, "Rendering surface failed");
        self.state = LinkState::Failed { reason };
        self.pending.clear();
    }

    /// Drains incoming messages and advances the lifecycle.
    ///
    /// A readiness timeout or a lost channel is reported as a synthetic
    /// `error` message, so callers handle every failure the same way.
    pub fn receive(&mut self, now: Instant) -> Vec<SurfaceMessage> {
        let mut out = Vec::new();
        if matches!(self.state, LinkState::Failed { .. }) {
            return out;
        }

        let incoming = match self.port.drain() {
            Ok(messages) => messages,
            Err(error) => {
                let message = format!("Rendering surface unavailable: {error}");
                self.fail(message.clone());
                out.push(SurfaceMessage::Error { message });
                return out;
            }
        };

        for message in incoming {
            match &message {
                SurfaceMessage::Ready => {
                    if let LinkState::Loading { since } = self.state {
                        tracing::info!(
                            generation = self.generation,
                            elapsed_ms = now.saturating_duration_since(since).as_millis() as u64,
                            "Rendering surface ready"
                        );
                        self.state = LinkState::Ready;
                    }
                }
                SurfaceMessage::Error { message: reason } => {
                    self.fail(reason.clone());
                }
                _ => {}
            }
            out.push(message);
        }

        if let LinkState::Loading { since } = self.state
            && now.saturating_duration_since(since) >= self.ready_timeout
        {
            let message = format!(
                "Rendering surface did not become ready within {} ms",
                self.ready_timeout.as_millis()
            );
            self.fail(message.clone());
            out.push(SurfaceMessage::Error { message });
        }
        out
    }

    /// Sends `init` and replays buffered view-state messages. Call right
    /// after `receive` reported `ready`.
    pub fn handshake(&mut self, payload: GraphPayload) {
        if !self.is_ready() {
            tracing::debug!("Handshake requested before surface is ready");
            return;
        }
        self.stale = false;
        self.transmit(&HostMessage::Init(payload));
        let pending = std::mem::take(&mut self.pending);
        for message in pending {
            if message.carries_graph_data() {
                continue;
            }
            self.transmit(&message);
        }
    }

    /// Tears the surface down and creates a new one. No partial state is
    /// carried over; the caller re-sends its view state after the next
    /// handshake.
    pub fn retry(&mut self, now: Instant) -> anyhow::Result<()> {
        let factory = self
            .factory
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No surface factory registered for retry"))?;
        let (host, surface) = duplex();
        // Dropping the old port disconnects the previous surface.
        self.port = host;
        self.pending.clear();
        self.stale = false;
        self.generation += 1;
        self.state = LinkState::Loading { since: now };
        if let Err(error) = factory.spawn(surface) {
            self.fail(format!("Failed to recreate rendering surface: {error}"));
            return Err(error);
        }
        tracing::info!(generation = self.generation, "Recreated rendering surface");
        Ok(())
    }
}
