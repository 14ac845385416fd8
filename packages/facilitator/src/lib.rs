// Discussion Facilitator - Agent Engine Core
//
// This crate decides, for every facilitation agent attached to a discussion
// thread, whether and when it speaks: rejecting a message, letting it
// through, or generating a contribution that is delivered asynchronously to
// live participants.
//
// Infrastructure lives in kernel/, facilitation logic in domains/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
