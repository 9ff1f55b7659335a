use mindmap_app::{GraphSession, MindmapSettings, SessionSettings, spawn_surface};
use mindmap_core::{Document, DocumentId, Vec2};
use mindmap_events::{SessionEvent, SurfaceLink, SurfaceMessage, SurfacePort, duplex};
use mindmap_graph::{RenderSurface, SurfaceConfig, SurfaceInput};
use mindmap_storage::{DocumentStore, SqliteDocumentStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

fn doc_id() -> DocumentId {
    DocumentId::new("polity")
}

async fn store_with_empty_document() -> Arc<SqliteDocumentStore> {
    let store = Arc::new(SqliteDocumentStore::new_in_memory().unwrap());
    store
        .create_document(&Document::new(doc_id(), "Polity"))
        .await
        .unwrap();
    store
}

fn in_process_session(
    store: Arc<SqliteDocumentStore>,
    settings: SessionSettings,
) -> (GraphSession<SqliteDocumentStore>, SurfacePort) {
    let (host, port) = duplex();
    let link = SurfaceLink::new(host, settings.ready_timeout());
    (
        GraphSession::new(store, link, settings, Handle::current()),
        port,
    )
}

fn deliver(port: &SurfacePort, surface: &mut RenderSurface) {
    for message in port.drain().unwrap() {
        surface.handle(message);
    }
}

fn report(surface: &mut RenderSurface, port: &SurfacePort) {
    for message in surface.take_outbox() {
        port.send(&message).unwrap();
    }
}

fn tap(surface: &mut RenderSurface, pointer: u64, x: f64, y: f64, at: Instant) {
    surface.input(SurfaceInput::PointerDown { pointer, x, y }, at);
    surface.input(
        SurfaceInput::PointerUp { pointer, x, y },
        at + Duration::from_millis(40),
    );
}

#[tokio::test]
async fn test_first_node_is_persisted_and_centered() {
    let store = store_with_empty_document().await;
    let settings = SessionSettings {
        seed_empty: false,
        ..Default::default()
    };
    let (mut session, port) = in_process_session(Arc::clone(&store), settings);
    session.load_document(&doc_id()).await.unwrap();

    let root = session.create_node(Vec2::ZERO, "Root").unwrap();
    session.fit();

    port.send(&SurfaceMessage::Ready).unwrap();
    session.pump_surface(Instant::now());
    let mut surface = RenderSurface::new(SurfaceConfig::default()).unwrap();
    deliver(&port, &mut surface);

    assert_eq!(surface.scene().nodes().len(), 1);
    assert!(surface.viewport().canvas_center().distance(Vec2::ZERO) < 1e-9);

    session.flush().await;
    let stored = store.fetch_document(&doc_id()).await.unwrap();
    assert_eq!(stored.nodes.len(), 1);
    assert_eq!(stored.nodes[0].id, root);
    assert_eq!(stored.nodes[0].label, "Root");
    assert!(!root.as_str().is_empty());
}

#[tokio::test]
async fn test_double_tap_adds_connected_node_that_settles() {
    let store = store_with_empty_document().await;
    let settings = SessionSettings {
        move_debounce_ms: 10,
        ..Default::default()
    };
    let (mut session, port) = in_process_session(Arc::clone(&store), settings);
    session.load_document(&doc_id()).await.unwrap();
    let root = session.document().unwrap().nodes[0].id.clone();
    let events = session.events();

    port.send(&SurfaceMessage::Ready).unwrap();
    session.pump_surface(Instant::now());
    let mut surface = RenderSurface::new(SurfaceConfig::default()).unwrap();
    deliver(&port, &mut surface);

    // Root is alone and centered, so the screen point (700, 550) is canvas (300, 250).
    let t0 = Instant::now();
    tap(&mut surface, 1, 700.0, 550.0, t0);
    tap(&mut surface, 2, 700.0, 550.0, t0 + Duration::from_millis(150));
    report(&mut surface, &port);
    session.pump_surface(Instant::now());

    let position = events
        .try_iter()
        .find_map(|event| match event {
            SessionEvent::AddNodeRequested { position } => Some(position),
            _ => None,
        })
        .expect("double tap on canvas requests a node");
    assert_eq!(position, Vec2::new(300.0, 250.0));

    let child = session.create_node(position, "Fundamental rights").unwrap();
    assert!(session.create_connection(&root, &child).unwrap().is_some());
    deliver(&port, &mut surface);
    surface.settle();
    report(&mut surface, &port);
    session.pump_surface(Instant::now());

    let placed = surface.scene().node(&child).unwrap().position;
    assert_eq!(
        session.document().unwrap().node(&child).unwrap().position,
        placed
    );

    session.flush().await;
    let stored = store.fetch_document(&doc_id()).await.unwrap();
    assert_eq!(stored.nodes.len(), 2);
    assert_eq!(stored.edges.len(), 1);
    assert_eq!(stored.node(&child).unwrap().position, placed);
}

#[tokio::test]
async fn test_threaded_surface_renders_session_changes() {
    let store = store_with_empty_document().await;
    let settings = MindmapSettings {
        session: SessionSettings {
            seed_empty: false,
            ..Default::default()
        },
        surface: SurfaceConfig {
            tick_ms: 2,
            ..Default::default()
        },
    };
    let (link, handle) = spawn_surface(&settings).unwrap();
    let mut session = GraphSession::new(store, link, settings.session.clone(), Handle::current());
    let events = session.events();
    session.load_document(&doc_id()).await.unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !session.link().is_ready() {
        assert!(Instant::now() < deadline, "surface never became ready");
        session.pump_surface(Instant::now());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(events.try_iter().any(|e| e == SessionEvent::SurfaceReady));

    session.create_node(Vec2::ZERO, "Preamble").unwrap();
    let rendered = loop {
        assert!(Instant::now() < deadline, "node never rendered");
        let frame = handle.frames.recv_timeout(Duration::from_millis(50));
        if let Ok(frame) = frame
            && frame.nodes.iter().any(|n| n.label == "Preamble")
        {
            break frame;
        }
    };
    assert_eq!(rendered.nodes.len(), 1);
    session.flush().await;
}
