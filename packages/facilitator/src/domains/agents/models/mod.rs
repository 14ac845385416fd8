pub mod agent;
pub mod evaluation;

pub use agent::{Agent, Pseudonym};
pub use evaluation::{AgentResponse, Evaluation, EvaluationAction};
