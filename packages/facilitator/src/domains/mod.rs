pub mod agents;
pub mod threads;
