//! Graph session controller: the canonical owner of one open document.
//!
//! Every mutation is applied to the local document first, mirrored to the
//! rendering surface second and persisted last, through the session's
//! ordered write queue. Failed writes surface as alerts on the event bus;
//! local state is not rolled back.

use crate::error::SessionError;
use crate::settings::SessionSettings;
use crate::writer::WriteQueue;
use crossbeam_channel::Receiver;
use mindmap_core::{
    CoreError, Document, DocumentId, DocumentPatch, Edge, EdgeId, GraphMode, IdGenerator, Node,
    NodeId, NodePatch, Vec2, ViewTransform, reachable_within, search_matches, validate_label,
};
use mindmap_events::{
    EventBus, HostMessage, SessionEvent, SurfaceLink, SurfaceMessage, ZoomDirection,
};
use mindmap_storage::{DocumentStore, StoreError};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub struct GraphSession<S> {
    store: Arc<S>,
    runtime: Handle,
    link: SurfaceLink,
    events: EventBus,
    settings: SessionSettings,
    ids: IdGenerator,
    document: Option<Document>,
    selected: Option<NodeId>,
    mode: GraphMode,
    search: String,
    /// Source node while the user is picking a connection target.
    connect_from: Option<NodeId>,
    /// At most one scheduled position write per node.
    pending_moves: HashMap<NodeId, JoinHandle<()>>,
    pending_view: Option<JoinHandle<()>>,
    /// Debounce timers left behind by a previously loaded document.
    detached: Vec<JoinHandle<()>>,
    writes: WriteQueue,
}

impl<S: DocumentStore + 'static> GraphSession<S> {
    pub fn new(store: Arc<S>, link: SurfaceLink, settings: SessionSettings, runtime: Handle) -> Self {
        let ids = if settings.pseudo_random_ids {
            IdGenerator::PseudoRandom
        } else {
            IdGenerator::Secure
        };
        let events = EventBus::new();
        let writes = WriteQueue::spawn(&runtime, events.clone());
        Self {
            store,
            runtime,
            link,
            events,
            settings,
            ids,
            document: None,
            selected: None,
            mode: GraphMode::Global,
            search: String::new(),
            connect_from: None,
            pending_moves: HashMap::new(),
            pending_view: None,
            detached: Vec::new(),
            writes,
        }
    }

    /// Subscribe to UI-facing notifications.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events.receiver()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn link(&self) -> &SurfaceLink {
        &self.link
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn mode(&self) -> &GraphMode {
        &self.mode
    }

    pub fn search_query(&self) -> &str {
        &self.search
    }

    pub fn connecting_from(&self) -> Option<&NodeId> {
        self.connect_from.as_ref()
    }

    fn require_document(&self) -> Result<&Document, SessionError> {
        self.document.as_ref().ok_or(SessionError::NoDocument)
    }

    fn require_document_mut(&mut self) -> Result<&mut Document, SessionError> {
        self.document.as_mut().ok_or(SessionError::NoDocument)
    }

    fn require_node(&self, id: &NodeId) -> Result<(), SessionError> {
        if self.require_document()?.contains_node(id) {
            Ok(())
        } else {
            Err(CoreError::NodeNotFound(id.clone()).into())
        }
    }

    /// Queues `write` once `delay` has passed. Aborting the returned timer
    /// before then drops the write; after that it is already queued.
    fn schedule_write<F>(&self, what: &'static str, delay: Duration, write: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let writes = self.writes.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            writes.push(what, write);
        })
    }

    /// Fetches the full document. On failure nothing is replaced and an
    /// alert is raised; the caller is expected to navigate away.
    pub async fn load_document(&mut self, id: &DocumentId) -> Result<&Document, SessionError> {
        let mut document = match self.store.fetch_document(id).await {
            Ok(document) => document,
            Err(source) => {
                tracing::error!(document = %id, error = %source, "Failed to load document");
                self.events
                    .publish(SessionEvent::error(format!("Could not open mind map: {source}")));
                return Err(SessionError::Load {
                    id: id.clone(),
                    source,
                });
            }
        };
        let dropped = document.prune_invalid_edges();
        if dropped > 0 {
            tracing::warn!(document = %id, dropped, "Ignored edges with missing or repeated endpoints");
        }

        // Writes for the previous document still run to completion.
        self.detached.retain(|h| !h.is_finished());
        self.detached
            .extend(self.pending_moves.drain().map(|(_, handle)| handle));
        self.detached.extend(self.pending_view.take());
        self.selected = None;
        self.mode = GraphMode::Global;
        self.search.clear();
        self.connect_from = None;

        tracing::info!(
            document = %id,
            nodes = document.nodes.len(),
            edges = document.edges.len(),
            "Document loaded"
        );
        let payload = document.payload();
        let seed = self.settings.seed_empty && document.is_empty();
        self.document = Some(document);
        self.link.send(HostMessage::Init(payload));

        if seed {
            let label = self.settings.seed_label.clone();
            self.create_node(Vec2::ZERO, &label)?;
        }
        self.require_document()
    }

    /// Nodes shown under the current mode, in collection order.
    pub fn visible_nodes(&self) -> Vec<&Node> {
        let Some(document) = &self.document else {
            return Vec::new();
        };
        match self.visible_set(document) {
            Some(visible) => document
                .nodes
                .iter()
                .filter(|n| visible.contains(&n.id))
                .collect(),
            None => document.nodes.iter().collect(),
        }
    }

    pub fn visible_edges(&self) -> Vec<&Edge> {
        let Some(document) = &self.document else {
            return Vec::new();
        };
        match self.visible_set(document) {
            Some(visible) => document
                .edges
                .iter()
                .filter(|e| visible.contains(&e.source) && visible.contains(&e.target))
                .collect(),
            None => document.edges.iter().collect(),
        }
    }

    fn visible_set(&self, document: &Document) -> Option<HashSet<NodeId>> {
        match &self.mode {
            GraphMode::Global => None,
            GraphMode::Local { focus, depth } => {
                Some(reachable_within(&document.edges, focus, *depth))
            }
        }
    }

    /// Selecting while a connection is pending completes it; selecting
    /// empty canvas cancels it.
    pub fn select_node(&mut self, node_id: Option<NodeId>) {
        let node_id = node_id.filter(|id| {
            self.document
                .as_ref()
                .is_some_and(|document| document.contains_node(id))
        });

        if let Some(from) = self.connect_from.take() {
            match &node_id {
                Some(to) if *to != from => {
                    if let Err(error) = self.create_connection(&from, to) {
                        tracing::warn!(%error, "Could not complete connection");
                    }
                }
                Some(_) => self.connect_from = Some(from),
                None => tracing::debug!(%from, "Connection cancelled"),
            }
        }

        if self.selected == node_id {
            return;
        }
        self.selected = node_id.clone();
        self.link.send(HostMessage::Select {
            node_id: node_id.clone(),
        });
        self.events.publish(SessionEvent::SelectionChanged { node_id });
    }

    /// Switching back to global also clears search and selection.
    pub fn set_mode(&mut self, mode: GraphMode) -> Result<(), SessionError> {
        if let Some(focus) = mode.focus() {
            self.require_node(focus)?;
        }
        if mode == GraphMode::Global {
            self.search.clear();
            if self.selected.take().is_some() {
                self.events
                    .publish(SessionEvent::SelectionChanged { node_id: None });
            }
        }
        tracing::debug!(?mode, "Graph mode changed");
        self.mode = mode;
        self.link.send(HostMessage::set_mode(&self.mode));
        Ok(())
    }

    pub fn show_local(&mut self, focus: NodeId, depth: Option<u32>) -> Result<(), SessionError> {
        self.set_mode(GraphMode::Local {
            focus,
            depth: depth.unwrap_or(GraphMode::DEFAULT_LOCAL_DEPTH),
        })
    }

    /// Returns the visible matches, or nothing for a query too short to
    /// search. The surface applies the matching emphasis itself.
    pub fn search(&mut self, query: &str) -> Vec<NodeId> {
        self.search = query.trim().to_string();
        self.link.send(HostMessage::Search {
            query: self.search.clone(),
        });
        let Some(document) = &self.document else {
            return Vec::new();
        };
        let visible = self.visible_set(document);
        search_matches(&document.nodes, &self.search)
            .unwrap_or_default()
            .into_iter()
            .filter(|id| visible.as_ref().is_none_or(|v| v.contains(*id)))
            .cloned()
            .collect()
    }

    pub fn fit(&mut self) {
        self.link.send(HostMessage::Fit);
    }

    pub fn zoom(&mut self, direction: ZoomDirection) {
        self.link.send(HostMessage::Zoom { direction });
    }

    pub fn zoom_in(&mut self) {
        self.zoom(ZoomDirection::In);
    }

    pub fn zoom_out(&mut self) {
        self.zoom(ZoomDirection::Out);
    }

    pub fn reset_view(&mut self) {
        self.link.send(HostMessage::Reset);
    }

    pub fn focus_node(&mut self, id: &NodeId) -> Result<(), SessionError> {
        self.require_node(id)?;
        self.link.send(HostMessage::Focus {
            node_id: id.clone(),
        });
        Ok(())
    }

    pub fn create_node(&mut self, position: Vec2, label: &str) -> Result<NodeId, SessionError> {
        let ids = self.ids;
        let document = self.require_document_mut()?;
        let label = validate_label(label)?;
        let id = NodeId::new(ids.generate());
        let node = Node::new(id.clone(), label, position);
        document.insert_node(node.clone())?;
        let doc_id = document.id.clone();
        tracing::info!(document = %doc_id, node = %id, label = %node.label, "Created node");

        self.link.send(HostMessage::AddNode { node: node.clone() });
        let store = Arc::clone(&self.store);
        self.writes.push("new node", async move {
            store.create_node(&doc_id, &node).await
        });
        Ok(id)
    }

    /// Moves a node and mirrors it to the surface. Persistence is debounced.
    pub fn move_node(&mut self, id: &NodeId, position: Vec2) -> Result<(), SessionError> {
        let node = self.apply_move(id, position)?;
        self.link.send(HostMessage::UpdateNode { node });
        Ok(())
    }

    /// Local update plus a debounced write that replaces any write still
    /// waiting for the same node.
    fn apply_move(&mut self, id: &NodeId, position: Vec2) -> Result<Node, SessionError> {
        let document = self.require_document_mut()?;
        let node = document.move_node(id, position)?.clone();
        let doc_id = document.id.clone();

        if let Some(previous) = self.pending_moves.remove(id) {
            previous.abort();
            tracing::trace!(node = %id, "Superseded pending position write");
        }
        let store = Arc::clone(&self.store);
        let node_id = id.clone();
        let handle = self.schedule_write(
            "node position",
            self.settings.move_debounce(),
            async move {
                store
                    .update_node(&doc_id, &node_id, &NodePatch::position(position))
                    .await
                    .map(|_| ())
            },
        );
        self.pending_moves.insert(id.clone(), handle);
        Ok(node)
    }

    pub fn update_node(&mut self, id: &NodeId, mut patch: NodePatch) -> Result<Node, SessionError> {
        if let Some(label) = &patch.label {
            patch.label = Some(validate_label(label)?);
        }
        let document = self.require_document_mut()?;
        if patch.is_empty() {
            return document
                .node(id)
                .cloned()
                .ok_or_else(|| CoreError::NodeNotFound(id.clone()).into());
        }
        let node = document.update_node(id, &patch)?.clone();
        let doc_id = document.id.clone();
        tracing::info!(document = %doc_id, node = %id, "Updated node");

        if patch.position.is_some()
            && let Some(pending) = self.pending_moves.remove(id)
        {
            pending.abort();
        }
        self.link.send(HostMessage::UpdateNode { node: node.clone() });
        let store = Arc::clone(&self.store);
        let node_id = id.clone();
        self.writes.push("node", async move {
            store.update_node(&doc_id, &node_id, &patch).await.map(|_| ())
        });
        Ok(node)
    }

    /// Removes the node and every edge touching it. The store is asked to
    /// drop the edges before the node.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<(), SessionError> {
        let document = self.require_document_mut()?;
        let (_, edges) = document.remove_node(id)?;
        let doc_id = document.id.clone();
        tracing::info!(document = %doc_id, node = %id, edges = edges.len(), "Deleted node");

        if let Some(pending) = self.pending_moves.remove(id) {
            pending.abort();
        }
        if self.connect_from.as_ref() == Some(id) {
            self.connect_from = None;
        }
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
            self.events
                .publish(SessionEvent::SelectionChanged { node_id: None });
        }
        self.link.send(HostMessage::RemoveNode {
            node_id: id.clone(),
        });
        if self.mode.focus() == Some(id) {
            self.set_mode(GraphMode::Global)?;
        }

        let store = Arc::clone(&self.store);
        let node_id = id.clone();
        self.writes.push("node deletion", async move {
            let removed = store.delete_edges_for_node(&doc_id, &node_id).await?;
            tracing::debug!(node = %node_id, removed, "Deleted stored edges for node");
            store.delete_node(&doc_id, &node_id).await
        });
        Ok(())
    }

    /// Self loops and repeated pairs (either direction) are refused
    /// silently with `Ok(None)`.
    pub fn create_connection(
        &mut self,
        source: &NodeId,
        target: &NodeId,
    ) -> Result<Option<EdgeId>, SessionError> {
        let ids = self.ids;
        let document = self.require_document_mut()?;
        match document.check_connection(source, target) {
            Ok(()) => {}
            Err(refusal) if refusal.is_invariant_refusal() => {
                tracing::debug!(%source, %target, reason = %refusal, "Connection refused");
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        }
        let edge = Edge::new(EdgeId::new(ids.generate()), source.clone(), target.clone());
        document.insert_edge(edge.clone())?;
        let doc_id = document.id.clone();
        tracing::info!(document = %doc_id, edge = %edge.id, %source, %target, "Created connection");

        let edge_id = edge.id.clone();
        self.link.send(HostMessage::AddEdge { edge: edge.clone() });
        let store = Arc::clone(&self.store);
        self.writes.push("connection", async move {
            store.create_edge(&doc_id, &edge).await
        });
        Ok(Some(edge_id))
    }

    pub fn delete_connection(&mut self, edge_id: &EdgeId) -> Result<(), SessionError> {
        let document = self.require_document_mut()?;
        document.remove_edge(edge_id)?;
        let doc_id = document.id.clone();
        tracing::info!(document = %doc_id, edge = %edge_id, "Deleted connection");

        self.link.send(HostMessage::RemoveEdge {
            edge_id: edge_id.clone(),
        });
        let store = Arc::clone(&self.store);
        let edge_id = edge_id.clone();
        self.writes.push("connection deletion", async move {
            store.delete_edge(&doc_id, &edge_id).await
        });
        Ok(())
    }

    /// Arms connect mode: the next selection of another node completes it.
    pub fn begin_connection(&mut self, from: &NodeId) -> Result<(), SessionError> {
        self.require_node(from)?;
        tracing::debug!(%from, "Waiting for connection target");
        self.connect_from = Some(from.clone());
        Ok(())
    }

    pub fn cancel_connection(&mut self) {
        if let Some(from) = self.connect_from.take() {
            tracing::debug!(%from, "Connection cancelled");
        }
    }

    /// Remembers the canvas transform in the document metadata. Persisted
    /// with the same debounce as node moves.
    pub fn set_view_transform(&mut self, view: ViewTransform) -> Result<(), SessionError> {
        if !view.is_valid() {
            return Err(CoreError::InvalidPosition(view.pan.x, view.pan.y).into());
        }
        let patch = DocumentPatch {
            view: Some(view),
            ..Default::default()
        };
        let document = self.require_document_mut()?;
        document.update_meta(&patch);
        let doc_id = document.id.clone();

        if let Some(pending) = self.pending_view.take() {
            pending.abort();
        }
        let store = Arc::clone(&self.store);
        let handle = self.schedule_write(
            "view",
            self.settings.move_debounce(),
            async move {
                store
                    .update_document_metadata(&doc_id, &patch)
                    .await
                    .map(|_| ())
            },
        );
        self.pending_view = Some(handle);
        Ok(())
    }

    pub fn rename_document(
        &mut self,
        title: &str,
        description: Option<&str>,
    ) -> Result<(), SessionError> {
        let patch = DocumentPatch {
            title: Some(validate_label(title)?),
            description: description.map(|d| d.trim().to_string()),
            view: None,
        };
        let document = self.require_document_mut()?;
        document.update_meta(&patch);
        let doc_id = document.id.clone();
        tracing::info!(document = %doc_id, title = ?patch.title, "Renamed document");

        let store = Arc::clone(&self.store);
        self.writes.push("document details", async move {
            store
                .update_document_metadata(&doc_id, &patch)
                .await
                .map(|_| ())
        });
        Ok(())
    }

    /// Processes everything the surface sent since the last call and
    /// advances its lifecycle. Returns the number of messages handled.
    pub fn pump_surface(&mut self, now: Instant) -> usize {
        let messages = self.link.receive(now);
        let count = messages.len();
        for message in messages {
            self.handle_surface_message(message);
        }
        if self.link.take_stale() {
            tracing::warn!("Surface missed a change");
            self.resync();
        }
        count
    }

    /// Replaces the surface's nodes and edges with the canonical ones. View
    /// state the surface still holds is kept where its nodes survive.
    pub fn resync(&mut self) {
        let Some(document) = &self.document else {
            return;
        };
        tracing::debug!(
            document = %document.id,
            nodes = document.nodes.len(),
            "Resynchronizing surface"
        );
        let payload = document.payload();
        self.link.send(HostMessage::Update(payload));
    }

    /// The surface named a node the host does not have: its mirror drifted.
    fn is_stale_reference(&mut self, node_id: &NodeId) -> bool {
        let known = self
            .document
            .as_ref()
            .is_some_and(|document| document.contains_node(node_id));
        if !known {
            tracing::warn!(node = %node_id, "Surface referenced an unknown node");
            self.resync();
        }
        !known
    }

    fn handle_surface_message(&mut self, message: SurfaceMessage) {
        tracing::trace!(kind = message.kind(), "Surface message");
        match message {
            SurfaceMessage::Ready => {
                let payload = self
                    .document
                    .as_ref()
                    .map(Document::payload)
                    .unwrap_or_default();
                self.link.handshake(payload);
                self.replay_view_state();
                self.events.publish(SessionEvent::SurfaceReady);
            }
            SurfaceMessage::Error { message } => {
                tracing::error!(%message, "Rendering surface reported an error");
                self.events.publish(SessionEvent::SurfaceFailed { message });
            }
            SurfaceMessage::NodeSelect { node_id } => {
                if node_id.as_ref().is_some_and(|id| self.is_stale_reference(id)) {
                    return;
                }
                self.select_node(node_id);
            }
            SurfaceMessage::NodeDoubleTap { node_id } => {
                if self.is_stale_reference(&node_id) {
                    return;
                }
                self.events.publish(SessionEvent::EditRequested { node_id });
            }
            SurfaceMessage::AddNode { x, y } => {
                self.events.publish(SessionEvent::AddNodeRequested {
                    position: Vec2::new(x, y),
                });
            }
            SurfaceMessage::NodeMove { node_id, x, y } => {
                if self.is_stale_reference(&node_id) {
                    return;
                }
                // The surface already shows the node there; no echo.
                if let Err(error) = self.apply_move(&node_id, Vec2::new(x, y)) {
                    tracing::warn!(node = %node_id, %error, "Ignoring move from surface");
                }
            }
            SurfaceMessage::LongPress { node_id, x, y } => {
                if self.is_stale_reference(&node_id) {
                    return;
                }
                self.events.publish(SessionEvent::ContextMenuRequested {
                    node_id,
                    position: Vec2::new(x, y),
                });
            }
        }
    }

    /// Re-sends view state a fresh surface would not know about.
    fn replay_view_state(&mut self) {
        if let Some(node_id) = self.selected.clone() {
            self.link.send(HostMessage::Select {
                node_id: Some(node_id),
            });
        }
        if self.mode.is_local() {
            self.link.send(HostMessage::set_mode(&self.mode));
        }
        if !self.search.is_empty() {
            self.link.send(HostMessage::Search {
                query: self.search.clone(),
            });
        }
    }

    /// Recreates a failed surface from scratch.
    pub fn retry_surface(&mut self, now: Instant) -> Result<(), SessionError> {
        self.link
            .retry(now)
            .map_err(|e| SessionError::Surface(e.to_string()))
    }

    /// Waits for every outstanding write, including debounced ones.
    pub async fn flush(&mut self) {
        let timers: Vec<JoinHandle<()>> = self
            .detached
            .drain(..)
            .chain(self.pending_moves.drain().map(|(_, handle)| handle))
            .chain(self.pending_view.take())
            .collect();
        for timer in timers {
            if let Err(error) = timer.await
                && !error.is_cancelled()
            {
                tracing::error!(%error, "Debounce timer panicked");
            }
        }
        self.writes.drained().await;
    }
}
