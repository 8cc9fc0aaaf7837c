pub mod controller;
pub mod events;
pub mod history;
pub mod state;
mod tracker;

pub use controller::{WalkConfig, WalkController};
pub use events::WalkEvent;
pub use history::{WalkHistory, WalkSummary};
pub use state::{WalkSnapshot, WalkState, WalkStatus};
