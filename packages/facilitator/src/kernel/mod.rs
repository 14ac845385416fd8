//! Kernel module - facilitator infrastructure and dependencies.

pub mod ai;
pub mod deps;
pub mod pg_store;
pub mod prompt;
pub mod scheduler;
pub mod stream_hub;
pub mod test_dependencies;
pub mod traits;

/// Default completion model.
pub const GPT_4O: &str = "gpt-4o";

pub use ai::OpenAiCompletionService;
pub use deps::FacilitatorDeps;
pub use pg_store::PgStore;
pub use scheduler::{tick_channel, CronScheduler, TickReceiver, TickSender};
pub use stream_hub::StreamHub;
pub use test_dependencies::TestDependencies;
pub use traits::*;
