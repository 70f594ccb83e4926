pub mod events;
pub mod retry;
pub mod wiring;
pub mod worker;
pub mod worker_inputs;

pub use events::*;
pub use retry::*;
pub use wiring::*;
pub use worker::*;
pub use worker_inputs::*;
