pub mod clipboard;
pub mod config;
pub mod connection;
pub mod context_menu;
pub mod grid;
pub mod guidelines;
pub mod handler;
pub mod input;
pub mod interaction;
pub mod minimap;
pub mod shortcuts;
pub mod timing;
pub mod transaction;

pub use clipboard::Clipboard;
pub use config::{EditorConfig, GridBounds};
pub use connection::ConnectionHandler;
pub use context_menu::{ContextMenu, MenuCommand, MenuItem};
pub use grid::resize_grid;
pub use guidelines::{Axis, GuideLine, GuidelineHandler};
pub use handler::{EditorAction, Handler};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use interaction::{Cursor, InteractionMode};
pub use minimap::MiniMap;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use transaction::TransactionHandler;
