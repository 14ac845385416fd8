use serde::{Deserialize, Serialize};

use crate::domains::threads::models::Message;

/// What an agent decided about one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationAction {
    /// Let the message through, nothing to add.
    Ok,
    /// Refuse the submitted message.
    Reject,
    /// Generate a contribution asynchronously.
    Contribute,
}

/// Result of `evaluate`. Every field is always present, even when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Triggering message; `None` on periodic ticks
    pub user_message: Option<Message>,
    pub action: EvaluationAction,
    pub user_contribution_visible: bool,
    /// Returned to the submitter, typically with REJECT
    pub suggestion: Option<String>,
}

impl Evaluation {
    pub fn ok(user_message: Option<&Message>) -> Self {
        Self {
            user_message: user_message.cloned(),
            action: EvaluationAction::Ok,
            user_contribution_visible: true,
            suggestion: None,
        }
    }

    pub fn reject(user_message: &Message, suggestion: Option<String>) -> Self {
        Self {
            user_message: Some(user_message.clone()),
            action: EvaluationAction::Reject,
            user_contribution_visible: false,
            suggestion,
        }
    }

    pub fn contribute(user_message: Option<&Message>, user_contribution_visible: bool) -> Self {
        Self {
            user_message: user_message.cloned(),
            action: EvaluationAction::Contribute,
            user_contribution_visible,
            suggestion: None,
        }
    }

    pub fn is_reject(&self) -> bool {
        self.action == EvaluationAction::Reject
    }
}

/// One message produced by `respond`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub visible: bool,
    pub message: String,
}

impl AgentResponse {
    pub fn visible(message: impl Into<String>) -> Self {
        Self {
            visible: true,
            message: message.into(),
        }
    }
}
