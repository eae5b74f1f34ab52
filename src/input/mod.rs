pub mod provider;
pub mod queue;
pub mod systems;

pub use provider::{BevyInputProvider, InputKey, InputMouseButton, InputProvider};
pub use queue::{CommandQueue, InputCommand, InputSnapshot, InputSystem, INPUT_QUEUE_CAP};
pub use systems::*;
