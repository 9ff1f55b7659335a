pub mod channel;
pub mod link;
pub mod protocol;

pub use channel::{ChannelError, HostPort, Port, SurfacePort, duplex};
pub use link::{LinkState, SurfaceFactory, SurfaceLink};
pub use protocol::{HostMessage, ModeKind, SurfaceMessage, ZoomDirection, resolve_mode};

use crossbeam_channel::{Receiver, Sender, unbounded};
use mindmap_core::{NodeId, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

/// Notifications from the session towards the UI chrome (toolbar, dialogs,
/// action sheet). None of these carry canonical state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Dismissible banner.
    Alert { level: AlertLevel, message: String },
    /// Double-tap on a node: open the label editor.
    EditRequested { node_id: NodeId },
    /// Double-tap on empty canvas: collect a label for a new node here.
    AddNodeRequested { position: Vec2 },
    /// Long press on a node: show the context menu at the canvas point.
    ContextMenuRequested { node_id: NodeId, position: Vec2 },
    SelectionChanged { node_id: Option<NodeId> },
    SurfaceReady,
    /// The surface is unusable; the UI should offer a retry.
    SurfaceFailed { message: String },
}

impl SessionEvent {
    pub fn error(message: impl Into<String>) -> Self {
        SessionEvent::Alert {
            level: AlertLevel::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        SessionEvent::Alert {
            level: AlertLevel::Warning,
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<SessionEvent> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<SessionEvent> {
        self.rx.clone()
    }

    pub fn publish(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Dispatch all pending events to a listener.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }

    /// Pending events, oldest first.
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.rx.try_iter().collect()
    }
}

/// Implement this to receive events from the [`EventBus`].
pub trait EventListener {
    fn handle_event(&mut self, event: &SessionEvent);
}
