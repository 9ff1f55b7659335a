pub mod emphasis;
pub mod layout;
pub mod scene;
pub mod style;
pub mod surface;
pub mod viewport;

pub use emphasis::{EdgeEmphasis, Emphasis, EmphasisConfig, EmphasisInput, NodeEmphasis};
pub use layout::{Body, ForceLayout, LayoutConfig, LayoutStatus};
pub use scene::Scene;
pub use style::{Color, EdgeStyle, NodeColors, edge_style, node_colors, palette_color};
pub use surface::{
    Frame, FrameEdge, FrameNode, RenderSurface, SurfaceConfig, SurfaceError, SurfaceHandle,
    SurfaceInput, ThreadSurfaceFactory, run,
};
pub use viewport::{DEFAULT_SCREEN, Viewport};
