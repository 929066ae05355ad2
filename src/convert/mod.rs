//! The two tree walks between the native and the source model, plus the box adapter.

mod bbox;
mod coord;
mod forward;
mod reverse;

pub use bbox::box_to_polygon;
pub use forward::ToSource;
pub use reverse::ToNative;
