pub mod spawning;
pub mod systems;
pub mod types;

pub use spawning::*;
pub use systems::*;
pub use types::*;
