//! Effect Plugins
//!
//! Frame mutators. Each instance owns its state (the trails ring buffer,
//! the transport virtual-frame machine); chains apply them in order.

pub mod blend_color;
pub mod brightness_contrast;
pub mod flip;
pub mod hue_rotate;
pub mod invert;
pub mod mirror;
pub mod posterize;
pub mod saturation;
pub mod strobe;
pub mod temperature;
pub mod tint;
pub mod trails;
pub mod transport;
