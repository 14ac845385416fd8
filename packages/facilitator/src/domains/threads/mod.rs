pub mod actions;
pub mod broadcast;
pub mod models;

pub use actions::{submit_message, SubmissionOutcome};
pub use models::*;
