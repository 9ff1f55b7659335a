use crate::protocol::{HostMessage, SurfaceMessage, decode, encode};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Channel disconnected")]
    Disconnected,
}

/// One end of the duplex text pipe. Messages are serialized to JSON before
/// crossing, so either side may live behind a sandbox boundary.
///
/// Each direction is an independent FIFO; there is no ordering between the
/// two directions.
pub struct Port<Out, In> {
    tx: Sender<String>,
    rx: Receiver<String>,
    _marker: PhantomData<fn(Out) -> In>,
}

pub type HostPort = Port<HostMessage, SurfaceMessage>;
pub type SurfacePort = Port<SurfaceMessage, HostMessage>;

/// Creates a connected host/surface pair.
pub fn duplex() -> (HostPort, SurfacePort) {
    let (host_tx, surface_rx) = unbounded();
    let (surface_tx, host_rx) = unbounded();
    (
        Port {
            tx: host_tx,
            rx: host_rx,
            _marker: PhantomData,
        },
        Port {
            tx: surface_tx,
            rx: surface_rx,
            _marker: PhantomData,
        },
    )
}

impl<Out, In> Port<Out, In>
where
    Out: Serialize,
    In: for<'de> Deserialize<'de>,
{
    /// Fire-and-forget send. No acknowledgement is given.
    pub fn send(&self, message: &Out) -> Result<(), ChannelError> {
        let text = encode(message).map_err(ChannelError::Encode)?;
        self.send_text(text)
    }

    /// Sends pre-encoded text as-is.
    pub fn send_text(&self, text: String) -> Result<(), ChannelError> {
        self.tx.send(text).map_err(|_| ChannelError::Disconnected)
    }

    /// Next message if one is queued. `Ok(None)` means the queue is empty.
    pub fn try_recv(&self) -> Result<Option<In>, ChannelError> {
        match self.rx.try_recv() {
            Ok(text) => decode(&text).map(Some).map_err(ChannelError::Decode),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<In>, ChannelError> {
        match self.rx.recv_timeout(timeout) {
            Ok(text) => decode(&text).map(Some).map_err(ChannelError::Decode),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }

    /// Drains everything currently queued, in arrival order. Malformed
    /// messages are logged and skipped.
    pub fn drain(&self) -> Result<Vec<In>, ChannelError> {
        let mut messages = Vec::new();
        loop {
            match self.try_recv() {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => return Ok(messages),
                Err(ChannelError::Decode(error)) => {
                    tracing::warn!(%error, "Skipping malformed channel message");
                }
                Err(ChannelError::Disconnected) if !messages.is_empty() => return Ok(messages),
                Err(error) => return Err(error),
            }
        }
    }
}
