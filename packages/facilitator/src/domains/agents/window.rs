//! Conversation window formatting.
//!
//! Turns the tail of a thread into "speaker: body" lines for prompts.
//! Agent contributions are attributed to a single generic speaker so the
//! model never sees agent pseudonyms as participants.

use crate::domains::threads::models::Message;

/// Speaker label for every agent-authored message.
pub const AGENT_SPEAKER: &str = "Facilitator";

/// The last `n` messages, oldest first, then `in_flight` if given.
///
/// Returns at most `n + 1` lines.
pub fn conversation_window(messages: &[Message], n: usize, in_flight: Option<&Message>) -> Vec<String> {
    let start = messages.len().saturating_sub(n);
    messages[start..]
        .iter()
        .chain(in_flight)
        .map(format_line)
        .collect()
}

/// Join window lines into one transcript block.
pub fn transcript(lines: &[String]) -> String {
    lines.join("\n")
}

fn format_line(message: &Message) -> String {
    let speaker = if message.from_agent {
        AGENT_SPEAKER
    } else {
        message.pseudonym.as_str()
    };
    format!("{}: {}", speaker, message.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ThreadId;
    use crate::domains::agents::models::Pseudonym;

    fn human(thread_id: ThreadId, who: &str, body: &str) -> Message {
        Message::from_participant(thread_id, who, body)
    }

    #[test]
    fn keeps_last_n_oldest_first_with_in_flight_last() {
        let t = ThreadId::new();
        let messages = vec![
            human(t, "Heron", "one"),
            human(t, "Otter", "two"),
            human(t, "Heron", "three"),
        ];
        let pending = human(t, "Otter", "four");

        let lines = conversation_window(&messages, 2, Some(&pending));

        assert_eq!(lines, vec!["Otter: two", "Heron: three", "Otter: four"]);
    }

    #[test]
    fn agent_messages_use_generic_speaker() {
        let t = ThreadId::new();
        let messages = vec![Message::from_agent(t, &Pseudonym::new("Moderator Bot"), "Welcome!", true)];

        let lines = conversation_window(&messages, 5, None);

        assert_eq!(lines, vec![format!("{}: Welcome!", AGENT_SPEAKER)]);
    }

    #[test]
    fn zero_window_yields_only_in_flight() {
        let t = ThreadId::new();
        let messages = vec![human(t, "Heron", "old")];
        let pending = human(t, "Otter", "new");

        assert_eq!(conversation_window(&messages, 0, Some(&pending)), vec!["Otter: new"]);
        assert!(conversation_window(&messages, 0, None).is_empty());
    }

    #[test]
    fn window_larger_than_history_returns_everything() {
        let t = ThreadId::new();
        let messages = vec![human(t, "Heron", "a"), human(t, "Otter", "b")];
        assert_eq!(conversation_window(&messages, 10, None).len(), 2);
    }
}
