//! Host-side orchestration for a mind map: the graph session, its settings,
//! and wiring to a threaded rendering surface.

mod error;
mod session;
mod settings;
mod writer;

pub use error::SessionError;
pub use session::GraphSession;
pub use settings::{MindmapSettings, SessionSettings};

use mindmap_events::SurfaceLink;
use mindmap_graph::{SurfaceHandle, ThreadSurfaceFactory};

/// Starts a rendering surface on its own thread and returns the link the
/// session drives plus the handle for raw input and rendered frames.
pub fn spawn_surface(
    settings: &MindmapSettings,
) -> Result<(SurfaceLink, SurfaceHandle), SessionError> {
    let (factory, handle) = ThreadSurfaceFactory::new(settings.surface.clone());
    let link = SurfaceLink::spawn(Box::new(factory), settings.session.ready_timeout())
        .map_err(|e| SessionError::Surface(e.to_string()))?;
    Ok((link, handle))
}
