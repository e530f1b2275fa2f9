pub mod anchor;
pub mod connection;
pub mod geometry;
pub mod id;
pub mod model;
pub mod scene;
pub mod snapshot;
pub mod viewport;

pub use anchor::{Anchor, AnchorCorner, AnchorPosition, anchor_corner};
pub use connection::{ArrowType, Binding, BindingState, ConnectionLine, Direction, LineEnd};
pub use id::ShapeId;
pub use model::*;
pub use scene::{Scene, grid_shape};
pub use snapshot::{ShapeDescriptor, Snapshot, TransactionType};
pub use viewport::{Viewport, ZoomBounds};

// Re-export petgraph and kurbo types so downstream crates don't need a direct dependency
pub use kurbo::{Affine, Point, Rect, Size, Vec2};
pub use petgraph::graph::NodeIndex;
