//! Asynchronous generation: persistence, broadcast and failure isolation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use facilitator_core::domains::agents::{
    AgentError, AgentState, AgentType, DispatchWorker, EvaluationAction,
};
use facilitator_core::domains::threads::Message;
use facilitator_core::kernel::stream_hub::MESSAGE_NEW;
use facilitator_core::kernel::test_dependencies::MockCompletionService;

fn contributor(max_tokens: usize) -> (AgentType, Arc<ScriptedBehavior>) {
    scripted(
        ScriptedType::reactive("contributor").max_tokens(max_tokens),
        ScriptedBehavior::new(EvaluationAction::Contribute),
    )
}

#[tokio::test]
async fn counter_is_persisted_before_the_task_is_queued() {
    let (agent_type, _) = contributor(100);
    let mut harness = TestHarness::new(registry_of([agent_type]));
    let thread = harness.thread_with_messages("Parks", 2);
    let agent = harness.agent("contributor", &thread);

    harness.runtime(agent.clone()).evaluate(&thread, None).await.unwrap();

    let queued = harness.queued_generations();
    assert_eq!(queued.len(), 1);
    // Already committed when the worker would pick the task up
    assert_eq!(harness.stored_agent(&agent).last_active_message_count, 2);
    assert_eq!(harness.deps.activity.state(agent.id), AgentState::Dispatching);
}

#[tokio::test]
async fn generated_message_is_persisted_appended_and_broadcast() {
    let (agent_type, _) = contributor(100);
    let completion = MockCompletionService::new().with_response("Who hasn't spoken yet?");
    let mut harness = TestHarness::with_completion(registry_of([agent_type]), completion);
    let thread = harness.thread_with_messages("Parks", 2);
    let agent = harness.agent("contributor", &thread);
    let mut events = harness.stream_hub.subscribe(&thread.id.to_string()).await;

    harness.runtime(agent.clone()).evaluate(&thread, None).await.unwrap();
    let results = harness.drain_generations().await;

    let posted = results.into_iter().next().unwrap().unwrap();
    assert_eq!(posted.len(), 1);
    let message = &posted[0];
    assert_eq!(message.body, "Who hasn't spoken yet?");
    assert!(message.from_agent);
    assert!(message.visible);
    assert_eq!(message.pseudonym, agent.pseudonym().name);
    assert_eq!(message.pseudonym_id, Some(agent.pseudonym().id));

    let stored = harness.reload_thread(&thread).await;
    assert_eq!(stored.messages.len(), 3);
    assert_eq!(stored.messages.last().map(|m| m.id), Some(message.id));
    assert_eq!(stored.human_message_count(), 2);

    let event = events.try_recv().unwrap();
    assert_eq!(event.event, MESSAGE_NEW);
    assert_eq!(event.payload["message"]["body"], "Who hasn't spoken yet?");
    assert_eq!(event.payload["count"], 3);

    assert_eq!(harness.deps.activity.state(agent.id), AgentState::Idle);
}

#[tokio::test]
async fn generation_is_capped_at_the_type_token_budget() {
    let (agent_type, _) = contributor(42);
    let mut harness = TestHarness::new(registry_of([agent_type]));
    let thread = harness.thread_with_messages("Parks", 2);
    let agent = harness.agent("contributor", &thread);

    harness.runtime(agent).evaluate(&thread, None).await.unwrap();
    harness.drain_generations().await;

    assert_eq!(harness.completion.last_max_tokens(), Some(42));
}

#[tokio::test]
async fn in_flight_message_appears_once_in_the_generation_window() {
    let (agent_type, _) = contributor(100);
    let mut harness = TestHarness::new(registry_of([agent_type]));
    let thread = harness.thread_with_messages("Parks", 1);
    let agent = harness.agent("contributor", &thread);

    let trigger = Message::from_participant(thread.id, "Otter", "what about shade trees?");
    harness
        .runtime(agent)
        .evaluate(&thread, Some(&trigger))
        .await
        .unwrap();

    // Ingestion persists the trigger before the worker runs
    let mut persisted = thread.clone();
    persisted.push_message(trigger.clone());
    harness.store.insert_thread(&persisted);

    harness.drain_generations().await;

    let prompt = harness.completion.last_prompt().unwrap();
    assert_eq!(prompt.matches("what about shade trees?").count(), 1);
}

#[tokio::test]
async fn unpersisted_trigger_is_appended_to_the_generation_window() {
    let (agent_type, _) = contributor(100);
    let mut harness = TestHarness::new(registry_of([agent_type]));
    let thread = harness.thread_with_messages("Parks", 1);
    let agent = harness.agent("contributor", &thread);

    let trigger = Message::from_participant(thread.id, "Otter", "benches please");
    harness
        .runtime(agent)
        .evaluate(&thread, Some(&trigger))
        .await
        .unwrap();
    harness.drain_generations().await;

    let prompt = harness.completion.last_prompt().unwrap();
    assert!(prompt.ends_with("Otter: benches please"));
}

#[tokio::test]
async fn generation_failure_leaves_the_evaluation_intact() {
    let (agent_type, _) = contributor(100);
    let completion = MockCompletionService::new().failing("model unavailable");
    let mut harness = TestHarness::with_completion(registry_of([agent_type]), completion);
    let thread = harness.thread_with_messages("Parks", 2);
    let agent = harness.agent("contributor", &thread);

    let evaluation = harness
        .runtime(agent.clone())
        .evaluate(&thread, None)
        .await
        .unwrap();
    assert_eq!(evaluation.action, EvaluationAction::Contribute);

    let results = harness.drain_generations().await;

    assert!(matches!(
        results.as_slice(),
        [Err(AgentError::GenerationFailure { .. })]
    ));
    assert_eq!(harness.stored_agent(&agent).last_active_message_count, 2);
    assert_eq!(harness.reload_thread(&thread).await.messages.len(), 2);
    assert_eq!(harness.deps.activity.state(agent.id), AgentState::Idle);
    // At most one attempt
    assert_eq!(harness.completion.call_count(), 1);

    // Later activations still run
    let evaluation = harness
        .runtime(harness.stored_agent(&agent))
        .evaluate(&thread, None)
        .await
        .unwrap();
    assert_eq!(evaluation.action, EvaluationAction::Contribute);
}

#[tokio::test]
async fn empty_response_is_invalid() {
    let (agent_type, _) = contributor(100);
    let completion = MockCompletionService::new().with_response("   ");
    let mut harness = TestHarness::with_completion(registry_of([agent_type]), completion);
    let thread = harness.thread_with_messages("Parks", 1);
    let agent = harness.agent("contributor", &thread);

    harness.runtime(agent).evaluate(&thread, None).await.unwrap();
    let results = harness.drain_generations().await;

    assert!(matches!(
        results.as_slice(),
        [Err(AgentError::InvalidResponse { .. })]
    ));
    assert_eq!(harness.reload_thread(&thread).await.messages.len(), 1);
}

#[tokio::test]
async fn over_limit_response_is_invalid() {
    let (agent_type, _) = contributor(3);
    let completion =
        MockCompletionService::new().with_response("This reply is far longer than twelve characters");
    let mut harness = TestHarness::with_completion(registry_of([agent_type]), completion);
    let thread = harness.thread_with_messages("Parks", 1);
    let agent = harness.agent("contributor", &thread);

    harness.runtime(agent).evaluate(&thread, None).await.unwrap();
    let results = harness.drain_generations().await;

    assert!(matches!(
        results.as_slice(),
        [Err(AgentError::InvalidResponse { .. })]
    ));
    assert_eq!(harness.reload_thread(&thread).await.messages.len(), 1);
}

#[tokio::test]
async fn generation_for_a_deleted_thread_fails_quietly() {
    let (agent_type, _) = contributor(100);
    let mut harness = TestHarness::new(registry_of([agent_type]));
    let thread = harness.thread_with_messages("Parks", 1);
    let agent = harness.agent("contributor", &thread);

    harness.runtime(agent.clone()).evaluate(&thread, None).await.unwrap();
    harness.store.remove_thread(thread.id);

    let results = harness.drain_generations().await;

    assert!(matches!(results.as_slice(), [Err(AgentError::MissingThread(_))]));
    assert_eq!(harness.deps.activity.state(agent.id), AgentState::Idle);
}

#[tokio::test]
async fn worker_delivers_contributions_to_subscribers() {
    let (agent_type, _) = contributor(100);
    let completion = MockCompletionService::new().with_response("Let's hear from someone new.");
    let mut harness = TestHarness::with_completion(registry_of([agent_type]), completion);
    let thread = harness.thread_with_messages("Parks", 2);
    let agent = harness.agent("contributor", &thread);
    let mut events = harness.stream_hub.subscribe(&thread.id.to_string()).await;

    let (_, placeholder) = tokio::sync::mpsc::unbounded_channel();
    let generations = std::mem::replace(&mut harness.generations, placeholder);
    tokio::spawn(DispatchWorker::new(Arc::clone(&harness.deps), generations).run());

    harness.runtime(agent).evaluate(&thread, None).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("broadcast within timeout")
        .unwrap();
    assert_eq!(event.event, MESSAGE_NEW);
    assert_eq!(event.payload["message"]["body"], "Let's hear from someone new.");
}
