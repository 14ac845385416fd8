// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into FacilitatorDeps for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::prompt::{render_template, PromptVariables};
use super::{
    BaseCompletionService, BaseScheduler, BaseStore, FacilitatorDeps, StreamHub, TimerPayload,
};
use crate::common::{AgentId, ThreadId};
use crate::domains::agents::dispatch::{GenerationQueue, GenerationReceiver};
use crate::domains::agents::models::Agent;
use crate::domains::agents::registry::AgentTypeRegistry;
use crate::domains::agents::types::builtin_registry;
use crate::domains::threads::models::{Message, Thread};

// =============================================================================
// Mock Completion Service
// =============================================================================

pub struct MockCompletionService {
    responses: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
    max_tokens: Arc<Mutex<Vec<usize>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MockCompletionService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            max_tokens: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Add a text response to the queue
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(response.into());
        self
    }

    /// Add a JSON response to the queue (will be serialized)
    pub fn with_json_response<T: serde::Serialize>(self, data: &T) -> Self {
        let json = serde_json::to_string(data).expect("Failed to serialize mock response");
        self.responses.lock().unwrap().push(json);
        self
    }

    /// Make every completion fail with `reason`
    pub fn failing(self, reason: impl Into<String>) -> Self {
        *self.failure.lock().unwrap() = Some(reason.into());
        self
    }

    /// Get all rendered prompts that were completed
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the last rendered prompt
    pub fn last_prompt(&self) -> Option<String> {
        self.calls.lock().unwrap().last().cloned()
    }

    /// Check if a prompt containing the given text was sent
    pub fn was_called_with(&self, text: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|p| p.contains(text))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Token budget passed with the last completion
    pub fn last_max_tokens(&self) -> Option<usize> {
        self.max_tokens.lock().unwrap().last().copied()
    }
}

impl Default for MockCompletionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseCompletionService for MockCompletionService {
    async fn complete(
        &self,
        template: &str,
        variables: &PromptVariables,
        max_tokens: usize,
    ) -> Result<String> {
        let prompt = render_template(template, variables)?;
        self.calls.lock().unwrap().push(prompt);
        self.max_tokens.lock().unwrap().push(max_tokens);

        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(anyhow!(reason));
        }

        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            Ok(responses.remove(0))
        } else {
            Ok("Mock completion".to_string())
        }
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// `BaseStore` over plain collections. Threads and messages are kept apart,
/// as in Postgres, so `find_thread` only sees messages that were saved.
#[derive(Default)]
pub struct InMemoryStore {
    agents: Mutex<Vec<Agent>>,
    threads: Mutex<HashMap<ThreadId, Thread>>,
    messages: Mutex<Vec<Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `thread` and any of its messages not stored yet
    pub fn insert_thread(&self, thread: &Thread) {
        let mut row = thread.clone();
        row.messages.clear();
        self.threads.lock().unwrap().insert(thread.id, row);

        let mut messages = self.messages.lock().unwrap();
        for message in &thread.messages {
            if !messages.iter().any(|m| m.id == message.id) {
                messages.push(message.clone());
            }
        }
    }

    /// Insert or replace `agent`
    pub fn insert_agent(&self, agent: &Agent) {
        let mut agents = self.agents.lock().unwrap();
        match agents.iter_mut().find(|a| a.id == agent.id) {
            Some(existing) => *existing = agent.clone(),
            None => agents.push(agent.clone()),
        }
    }

    /// Simulate a thread deleted out from under its agents
    pub fn remove_thread(&self, id: ThreadId) {
        self.threads.lock().unwrap().remove(&id);
        self.messages.lock().unwrap().retain(|m| m.thread_id != id);
    }

    pub fn agent(&self, id: AgentId) -> Option<Agent> {
        self.agents.lock().unwrap().iter().find(|a| a.id == id).cloned()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.lock().unwrap().len()
    }

    /// Saved messages of a thread, in save order
    pub fn messages(&self, thread_id: ThreadId) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BaseStore for InMemoryStore {
    async fn find_agent(&self, id: AgentId) -> Result<Option<Agent>> {
        Ok(self.agent(id))
    }

    async fn list_agents(&self) -> Result<Vec<Agent>> {
        Ok(self.agents.lock().unwrap().clone())
    }

    async fn list_agents_for_thread(&self, thread_id: ThreadId) -> Result<Vec<Agent>> {
        Ok(self
            .agents
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.thread_id == thread_id)
            .cloned()
            .collect())
    }

    async fn save_agent(&self, agent: &Agent) -> Result<()> {
        self.insert_agent(agent);
        Ok(())
    }

    async fn delete_agent(&self, id: AgentId) -> Result<()> {
        self.agents.lock().unwrap().retain(|a| a.id != id);
        Ok(())
    }

    async fn find_thread(&self, id: ThreadId) -> Result<Option<Thread>> {
        let Some(mut thread) = self.threads.lock().unwrap().get(&id).cloned() else {
            return Ok(None);
        };
        thread.messages = self.messages(id);
        Ok(Some(thread))
    }

    async fn save_thread(&self, thread: &Thread) -> Result<()> {
        let mut row = thread.clone();
        row.messages.clear();
        self.threads.lock().unwrap().insert(thread.id, row);
        Ok(())
    }

    async fn save_message(&self, message: &Message) -> Result<()> {
        let mut messages = self.messages.lock().unwrap();
        match messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message.clone(),
            None => messages.push(message.clone()),
        }
        Ok(())
    }
}

// =============================================================================
// Recording Scheduler
// =============================================================================

/// One call made against the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerCall {
    Every {
        job_name: String,
        period: Duration,
        payload: TimerPayload,
    },
    Cancel {
        job_name: String,
    },
}

/// `BaseScheduler` that never fires on its own. Tests read the job table and
/// deliver ticks by hand.
#[derive(Default)]
pub struct RecordingScheduler {
    calls: Mutex<Vec<SchedulerCall>>,
    jobs: Mutex<HashMap<String, (Duration, TimerPayload)>>,
    started: Mutex<bool>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn is_started(&self) -> bool {
        *self.started.lock().unwrap()
    }

    pub fn active_jobs(&self) -> Vec<String> {
        let mut names: Vec<_> = self.jobs.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn period(&self, job_name: &str) -> Option<Duration> {
        self.jobs.lock().unwrap().get(job_name).map(|(p, _)| *p)
    }

    /// Payload a firing of `job_name` would deliver
    pub fn fire(&self, job_name: &str) -> Option<TimerPayload> {
        self.jobs.lock().unwrap().get(job_name).map(|(_, p)| *p)
    }
}

#[async_trait]
impl BaseScheduler for RecordingScheduler {
    async fn start(&self) -> Result<()> {
        *self.started.lock().unwrap() = true;
        Ok(())
    }

    async fn every(&self, period: Duration, job_name: &str, payload: TimerPayload) -> Result<()> {
        self.calls.lock().unwrap().push(SchedulerCall::Every {
            job_name: job_name.to_string(),
            period,
            payload,
        });
        self.jobs
            .lock()
            .unwrap()
            .insert(job_name.to_string(), (period, payload));
        Ok(())
    }

    async fn cancel(&self, job_name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(SchedulerCall::Cancel {
            job_name: job_name.to_string(),
        });
        self.jobs.lock().unwrap().remove(job_name);
        Ok(())
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub completion: Arc<MockCompletionService>,
    pub store: Arc<InMemoryStore>,
    pub scheduler: Arc<RecordingScheduler>,
    pub stream_hub: StreamHub,
    pub registry: Arc<AgentTypeRegistry>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            completion: Arc::new(MockCompletionService::new()),
            store: Arc::new(InMemoryStore::new()),
            scheduler: Arc::new(RecordingScheduler::new()),
            stream_hub: StreamHub::new(),
            registry: Arc::new(builtin_registry().expect("Built-in agent types must register")),
        }
    }

    /// Set a mock completion service
    pub fn mock_completion(mut self, completion: MockCompletionService) -> Self {
        self.completion = Arc::new(completion);
        self
    }

    /// Replace the built-in agent types
    pub fn registry(mut self, registry: AgentTypeRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Build the container. The receiver stands in for the dispatch worker;
    /// tests drain it with `process_generation`.
    pub fn into_deps(self) -> (Arc<FacilitatorDeps>, GenerationReceiver) {
        let (generation_queue, generations) = GenerationQueue::channel();
        let deps = FacilitatorDeps::new(
            self.store,
            self.completion,
            self.scheduler,
            self.stream_hub,
            self.registry,
            generation_queue,
        );
        (Arc::new(deps), generations)
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
