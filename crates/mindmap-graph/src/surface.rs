//! The sandboxed rendering surface: interprets host messages against its
//! mirror, runs the physics, turns pointer input into user intents and
//! reports them back over the channel.

use crate::emphasis::{self, EdgeEmphasis, Emphasis, EmphasisConfig, EmphasisInput};
use crate::layout::{ForceLayout, LayoutConfig};
use crate::scene::Scene;
use crate::style::{EdgeStyle, NodeColors, edge_style, node_colors};
use crate::viewport::{DEFAULT_SCREEN, Viewport};
use crossbeam_channel::{Receiver, Sender, unbounded};
use mindmap_core::{EdgeId, GraphMode, Node, NodeId, NodeShape, Size, Vec2, ViewTransform};
use mindmap_events::{
    ChannelError, HostMessage, SurfaceFactory, SurfaceMessage, SurfacePort, resolve_mode,
};
use mindmap_input::{
    GestureConfig, GestureConfigError, GestureController, GestureIntent, HitTest, PointerId,
    topmost,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Invalid gesture configuration: {0}")]
    Gestures(#[from] GestureConfigError),
    #[error("Invalid layout configuration: {0}")]
    Layout(String),
    #[error("Invalid surface configuration: {0}")]
    Config(String),
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub gestures: GestureConfig,
    pub layout: LayoutConfig,
    pub emphasis: EmphasisConfig,
    pub screen_width: f64,
    pub screen_height: f64,
    /// Screen padding kept around the graph on `fit`.
    pub fit_padding: f64,
    /// Physics and long-press polling interval.
    pub tick_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            gestures: GestureConfig::default(),
            layout: LayoutConfig::default(),
            emphasis: EmphasisConfig::default(),
            screen_width: DEFAULT_SCREEN.width,
            screen_height: DEFAULT_SCREEN.height,
            fit_padding: 40.0,
            tick_ms: 16,
        }
    }
}

impl SurfaceConfig {
    pub fn validate(&self) -> Result<(), SurfaceError> {
        self.gestures.validate()?;
        self.layout.validate().map_err(SurfaceError::Layout)?;
        if !(self.screen_width > 0.0 && self.screen_height > 0.0) {
            return Err(SurfaceError::Config(format!(
                "screen size must be positive, got {}x{}",
                self.screen_width, self.screen_height
            )));
        }
        if !(self.fit_padding >= 0.0) {
            return Err(SurfaceError::Config("fit_padding must not be negative".to_string()));
        }
        if self.tick_ms == 0 {
            return Err(SurfaceError::Config("tick_ms must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Raw platform input delivered to the surface. Coordinates are screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceInput {
    PointerDown { pointer: PointerId, x: f64, y: f64 },
    PointerMove { pointer: PointerId, x: f64, y: f64 },
    PointerUp { pointer: PointerId, x: f64, y: f64 },
    Wheel { x: f64, y: f64, steps: f64 },
    Resize { width: f64, height: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameNode {
    pub id: NodeId,
    pub label: String,
    /// Canvas-space center.
    pub position: Vec2,
    pub size: Size,
    pub shape: NodeShape,
    pub colors: NodeColors,
    pub opacity: f32,
    pub accent: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameEdge {
    pub id: EdgeId,
    pub from: Vec2,
    pub to: Vec2,
    pub style: EdgeStyle,
    pub label: Option<String>,
    pub highlighted: bool,
}

/// Everything needed to draw one frame. Hidden elements are left out.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub view: ViewTransform,
    pub nodes: Vec<FrameNode>,
    pub edges: Vec<FrameEdge>,
}

/// Hit testing restricted to what is currently drawn.
struct VisibleNodes<'a> {
    nodes: &'a [Node],
    emphasis: &'a Emphasis,
}

impl HitTest for VisibleNodes<'_> {
    fn node_at(&self, canvas: Vec2) -> Option<(NodeId, Vec2)> {
        topmost(
            self.nodes.iter().filter(|n| !self.emphasis.node(&n.id).hidden),
            canvas,
        )
    }
}

pub struct RenderSurface {
    config: SurfaceConfig,
    scene: Scene,
    layout: ForceLayout,
    viewport: Viewport,
    gestures: GestureController,
    selected: Option<NodeId>,
    mode: GraphMode,
    search: Option<String>,
    emphasis: Emphasis,
    outbox: Vec<SurfaceMessage>,
    dirty: bool,
}

impl RenderSurface {
    pub fn new(config: SurfaceConfig) -> Result<Self, SurfaceError> {
        config.validate()?;
        let viewport = Viewport::new(
            Size::new(config.screen_width, config.screen_height),
            config.fit_padding,
            config.gestures.min_zoom,
            config.gestures.max_zoom,
        );
        Ok(Self {
            scene: Scene::default(),
            layout: ForceLayout::new(config.layout.clone()),
            gestures: GestureController::new(config.gestures.clone()),
            viewport,
            selected: None,
            mode: GraphMode::Global,
            search: None,
            emphasis: Emphasis::default(),
            outbox: Vec::new(),
            dirty: true,
            config,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn emphasis(&self) -> &Emphasis {
        &self.emphasis
    }

    pub fn mode(&self) -> &GraphMode {
        &self.mode
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn is_simulating(&self) -> bool {
        !self.layout.status().is_frozen()
    }

    fn refresh(&mut self) {
        self.emphasis = emphasis::compute(
            EmphasisInput {
                nodes: self.scene.nodes(),
                edges: self.scene.edges(),
                selected: self.selected.as_ref(),
                mode: &self.mode,
                search: self.search.as_deref(),
            },
            &self.config.emphasis,
        );
        self.dirty = true;
    }

    fn fit_visible(&mut self) {
        let emphasis = &self.emphasis;
        let bounds = self.scene.bounds(|n| !emphasis.node(&n.id).hidden);
        self.viewport.fit(bounds);
    }

    fn focus_node(&mut self, id: &NodeId) {
        if let Some(node) = self.scene.node(id) {
            self.viewport.focus(node.position);
        }
    }

    /// Drops view state that points at nodes no longer in the mirror.
    fn prune_view_state(&mut self) {
        if let Some(id) = &self.selected
            && !self.scene.contains(id)
        {
            self.selected = None;
        }
        if let Some(focus) = self.mode.focus()
            && !self.scene.contains(focus)
        {
            tracing::debug!(%focus, "Local focus removed; returning to global view");
            self.mode = GraphMode::Global;
        }
    }

    pub fn handle(&mut self, message: HostMessage) {
        tracing::trace!(kind = message.kind(), "Surface received message");
        match message {
            HostMessage::Init(payload) => {
                self.scene.replace(payload);
                self.selected = None;
                self.mode = GraphMode::Global;
                self.search = None;
                self.layout.restart();
                self.refresh();
                self.fit_visible();
            }
            HostMessage::Update(payload) => {
                self.scene.replace(payload);
                self.prune_view_state();
                self.refresh();
            }
            HostMessage::Select { node_id } => {
                self.selected = node_id.filter(|id| self.scene.contains(id));
                self.refresh();
            }
            HostMessage::AddNode { node } => {
                self.scene.insert_free(node);
                self.layout.restart();
                self.refresh();
            }
            HostMessage::UpdateNode { node } => {
                let id = node.id.clone();
                if !self.scene.update(node) {
                    tracing::warn!(node_id = %id, "Update for unknown node ignored");
                }
                self.refresh();
            }
            HostMessage::RemoveNode { node_id } => {
                self.scene.remove(&node_id);
                self.prune_view_state();
                self.refresh();
            }
            HostMessage::AddEdge { edge } => {
                let id = edge.id.clone();
                if self.scene.add_edge(edge) {
                    if self.scene.has_free_nodes() {
                        self.layout.restart();
                    }
                } else {
                    tracing::warn!(edge_id = %id, "Invalid edge ignored");
                }
                self.refresh();
            }
            HostMessage::RemoveEdge { edge_id } => {
                self.scene.remove_edge(&edge_id);
                self.refresh();
            }
            HostMessage::Fit => self.fit_visible(),
            HostMessage::Focus { node_id } => self.focus_node(&node_id),
            HostMessage::Search { query } => {
                self.search = Some(query).filter(|q| !q.trim().is_empty());
                self.refresh();
                if let Some(first) = self.emphasis.first_match().cloned() {
                    self.focus_node(&first);
                }
            }
            HostMessage::SetMode {
                mode,
                node_id,
                depth,
            } => {
                let mut mode = resolve_mode(mode, node_id, depth);
                if let Some(focus) = mode.focus()
                    && !self.scene.contains(focus)
                {
                    tracing::warn!(%focus, "Local view requested for unknown node");
                    mode = GraphMode::Global;
                }
                self.mode = mode;
                match self.mode.focus().cloned() {
                    Some(focus) => {
                        self.refresh();
                        self.focus_node(&focus);
                    }
                    None => {
                        self.selected = None;
                        self.search = None;
                        self.refresh();
                        self.fit_visible();
                    }
                }
            }
            HostMessage::Zoom { direction } => {
                self.viewport.zoom(direction, self.config.gestures.zoom_step);
            }
            HostMessage::Reset => self.viewport.reset(),
        }
        self.dirty = true;
    }

    pub fn input(&mut self, input: SurfaceInput, now: Instant) {
        self.gestures.set_view(self.viewport.transform());
        let hits = VisibleNodes {
            nodes: self.scene.nodes(),
            emphasis: &self.emphasis,
        };
        let intents = match input {
            SurfaceInput::PointerDown { pointer, x, y } => {
                self.gestures.pointer_down(pointer, Vec2::new(x, y), now, &hits)
            }
            SurfaceInput::PointerMove { pointer, x, y } => {
                self.gestures.pointer_move(pointer, Vec2::new(x, y), now)
            }
            SurfaceInput::PointerUp { pointer, x, y } => {
                self.gestures.pointer_up(pointer, Vec2::new(x, y), now)
            }
            SurfaceInput::Wheel { x, y, steps } => self.gestures.zoom_steps(Vec2::new(x, y), steps),
            SurfaceInput::Resize { width, height } => {
                self.viewport.resize(Size::new(width, height));
                Vec::new()
            }
        };
        self.apply(intents);
    }

    /// Drives time-based gestures (long press).
    pub fn poll(&mut self, now: Instant) {
        let intents = self.gestures.poll(now);
        self.apply(intents);
    }

    fn apply(&mut self, intents: Vec<GestureIntent>) {
        for intent in intents {
            match intent {
                GestureIntent::View(view) => self.viewport.set_transform(view),
                GestureIntent::Message(message) => {
                    if let SurfaceMessage::NodeMove { node_id, x, y } = &message {
                        self.scene.move_node(node_id, Vec2::new(*x, *y));
                        if self.scene.has_free_nodes() {
                            self.layout.restart();
                        }
                    }
                    self.outbox.push(message);
                }
            }
            self.dirty = true;
        }
    }

    /// Advances the physics one tick. Auto-placed nodes that settle are
    /// reported with `nodeMove` so the host can keep their positions.
    pub fn tick(&mut self) -> bool {
        if self.layout.status().is_frozen() {
            return false;
        }
        let placed = self.scene.simulate(&mut self.layout);
        for (node_id, position) in placed {
            tracing::debug!(%node_id, x = position.x, y = position.y, "Auto-placed node settled");
            self.outbox.push(SurfaceMessage::NodeMove {
                node_id,
                x: position.x,
                y: position.y,
            });
        }
        self.dirty = true;
        self.is_simulating()
    }

    /// Ticks until the physics freezes.
    pub fn settle(&mut self) {
        while self.tick() {}
    }

    pub fn take_outbox(&mut self) -> Vec<SurfaceMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn frame(&self) -> Frame {
        let nodes = self
            .scene
            .nodes()
            .iter()
            .filter_map(|node| {
                let emphasis = self.emphasis.node(&node.id);
                if emphasis.hidden {
                    return None;
                }
                Some(FrameNode {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    position: node.position,
                    size: node.size,
                    shape: node.shape,
                    colors: node_colors(node, emphasis.opacity, emphasis.accent),
                    opacity: emphasis.opacity,
                    accent: emphasis.accent,
                    selected: self.selected.as_ref() == Some(&node.id),
                })
            })
            .collect();

        let edges = self
            .scene
            .edges()
            .iter()
            .filter_map(|edge| {
                let EdgeEmphasis {
                    hidden,
                    opacity,
                    highlighted,
                } = self.emphasis.edge(&edge.id);
                if hidden {
                    return None;
                }
                let from = self.scene.node(&edge.source)?.position;
                let to = self.scene.node(&edge.target)?.position;
                Some(FrameEdge {
                    id: edge.id.clone(),
                    from,
                    to,
                    style: edge_style(edge, opacity, highlighted, self.config.emphasis.highlight_width),
                    label: edge.label.clone(),
                    highlighted,
                })
            })
            .collect();

        Frame {
            view: self.viewport.transform(),
            nodes,
            edges,
        }
    }
}

/// Surface event loop. Reports `ready` once initialized, or `error` and
/// stops if the configuration is unusable. Returns when the host side of
/// the channel goes away.
pub fn run(
    port: SurfacePort,
    config: SurfaceConfig,
    input: Receiver<SurfaceInput>,
    frames: Option<Sender<Frame>>,
) -> Result<(), SurfaceError> {
    let mut surface = match RenderSurface::new(config) {
        Ok(surface) => surface,
        Err(error) => {
            tracing::error!(%error, "Rendering surface failed to initialize");
            port.send(&SurfaceMessage::Error {
                message: error.to_string(),
            })?;
            return Err(error);
        }
    };
    port.send(&SurfaceMessage::Ready)?;
    tracing::info!("Rendering surface ready");

    let tick = Duration::from_millis(surface.config.tick_ms);
    loop {
        let mut next = port.recv_timeout(tick);
        loop {
            match next {
                Ok(Some(message)) => surface.handle(message),
                Ok(None) => break,
                Err(ChannelError::Disconnected) => {
                    tracing::info!("Host disconnected; rendering surface stopping");
                    return Ok(());
                }
                Err(ChannelError::Decode(error)) => {
                    tracing::warn!(%error, "Skipping malformed host message");
                }
                Err(error) => return Err(error.into()),
            }
            next = port.try_recv();
        }

        let now = Instant::now();
        for event in input.try_iter() {
            surface.input(event, now);
        }
        surface.poll(now);
        surface.tick();

        for message in surface.take_outbox() {
            match port.send(&message) {
                Ok(()) => {}
                Err(ChannelError::Disconnected) => return Ok(()),
                Err(error) => return Err(error.into()),
            }
        }
        if let Some(frames) = &frames
            && surface.take_dirty()
        {
            let _ = frames.send(surface.frame());
        }
    }
}

/// Host-facing ends of a threaded surface: raw input in, frames out.
pub struct SurfaceHandle {
    pub input: Sender<SurfaceInput>,
    pub frames: Receiver<Frame>,
}

/// Runs each surface instance on its own thread. A retry spawns a fresh
/// thread; the previous one exits when its channel disconnects.
pub struct ThreadSurfaceFactory {
    config: SurfaceConfig,
    input: Receiver<SurfaceInput>,
    frames: Sender<Frame>,
    spawned: u32,
}

impl ThreadSurfaceFactory {
    pub fn new(config: SurfaceConfig) -> (Self, SurfaceHandle) {
        let (input_tx, input_rx) = unbounded();
        let (frames_tx, frames_rx) = unbounded();
        (
            Self {
                config,
                input: input_rx,
                frames: frames_tx,
                spawned: 0,
            },
            SurfaceHandle {
                input: input_tx,
                frames: frames_rx,
            },
        )
    }
}

impl SurfaceFactory for ThreadSurfaceFactory {
    fn spawn(&mut self, port: SurfacePort) -> anyhow::Result<()> {
        self.spawned += 1;
        let config = self.config.clone();
        let input = self.input.clone();
        let frames = self.frames.clone();
        std::thread::Builder::new()
            .name(format!("mindmap-surface-{}", self.spawned))
            .spawn(move || {
                if let Err(error) = run(port, config, input, Some(frames)) {
                    tracing::warn!(%error, "Rendering surface exited with error");
                }
            })?;
        Ok(())
    }
}
