//! `message:new` events for live thread participants.

use serde_json::json;

use super::models::{Message, Thread};
use crate::kernel::stream_hub::{StreamHub, MESSAGE_NEW};

/// Publish `message` on the thread's channel with the thread's running message count.
pub async fn publish_new_message(hub: &StreamHub, thread: &Thread, message: &Message) {
    hub.publish(
        &thread.id.to_string(),
        MESSAGE_NEW,
        json!({
            "message": message,
            "count": thread.messages.len(),
        }),
    )
    .await;
}
