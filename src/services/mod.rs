pub mod coordinator;
pub mod selection;

pub use coordinator::{Coordinator, Deselection, SelectionStats, StateError};
