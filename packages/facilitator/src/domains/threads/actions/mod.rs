//! Threads domain actions
//!
//! Entry points called by the transport layer. They do the work and return
//! values; agent decisions happen inside the agent runtime.

mod submit_message;

pub use submit_message::{submit_message, SubmissionOutcome};
