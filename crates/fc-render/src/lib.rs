pub mod display;
pub mod hit;
pub mod paint;

pub use display::{DisplayList, HANDLE_RADIUS, Overlay, Paint, Primitive, build_display_list, build_minimap_list};
pub use hit::{hit_endpoint, hit_test, hit_test_rect};
pub use paint::paint_display_list;
