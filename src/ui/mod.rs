pub mod hud;
pub mod popup;

pub use hud::*;
pub use popup::*;
