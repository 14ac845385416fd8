pub mod activity;
pub mod dispatch;
pub mod error;
pub mod initializer;
pub mod models;
pub mod registry;
pub mod runtime;
pub mod tick;
pub mod types;
pub mod window;

pub use activity::{ActivityTracker, AgentState};
pub use dispatch::{DispatchWorker, GenerationQueue, GenerationTask};
pub use error::AgentError;
pub use initializer::{initialize_all, InitializationReport};
pub use models::*;
pub use registry::AgentTypeRegistry;
pub use runtime::{Activation, AgentRuntime, InitializeOutcome};
pub use tick::{handle_tick, TickWorker};
pub use types::{
    builtin_registry, AgentBehavior, AgentContext, AgentType, CivilityModerator,
    DiscussionFacilitator, PeriodicReflector,
};
