//! In-memory test harness.
//!
//! Wires `FacilitatorDeps` to the mocks from `kernel::test_dependencies` and
//! keeps handles on each so tests can arrange state and inspect effects.
//! Generation tasks are not processed by a background worker; tests drain
//! them explicitly with `drain_generations`.

use std::sync::Arc;

use facilitator_core::domains::agents::dispatch::{process_generation, GenerationReceiver};
use facilitator_core::domains::agents::{
    Agent, AgentError, AgentRuntime, AgentTypeRegistry, GenerationTask,
};
use facilitator_core::domains::threads::{Message, Thread};
use facilitator_core::kernel::test_dependencies::{
    InMemoryStore, MockCompletionService, RecordingScheduler,
};
use facilitator_core::kernel::{BaseStore, FacilitatorDeps, StreamHub, TestDependencies};

pub struct TestHarness {
    pub deps: Arc<FacilitatorDeps>,
    pub generations: GenerationReceiver,
    pub store: Arc<InMemoryStore>,
    pub scheduler: Arc<RecordingScheduler>,
    pub completion: Arc<MockCompletionService>,
    pub stream_hub: StreamHub,
}

impl TestHarness {
    pub fn new(registry: AgentTypeRegistry) -> Self {
        Self::with_completion(registry, MockCompletionService::new())
    }

    pub fn with_completion(registry: AgentTypeRegistry, completion: MockCompletionService) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let test_deps = TestDependencies::new()
            .mock_completion(completion)
            .registry(registry);
        let store = Arc::clone(&test_deps.store);
        let scheduler = Arc::clone(&test_deps.scheduler);
        let completion = Arc::clone(&test_deps.completion);
        let stream_hub = test_deps.stream_hub.clone();
        let (deps, generations) = test_deps.into_deps();

        Self {
            deps,
            generations,
            store,
            scheduler,
            completion,
            stream_hub,
        }
    }

    /// Store an empty thread.
    pub fn thread(&self, name: &str) -> Thread {
        let thread = Thread::new(name);
        self.store.insert_thread(&thread);
        thread
    }

    /// Store a thread holding `humans` participant messages.
    pub fn thread_with_messages(&self, name: &str, humans: usize) -> Thread {
        let mut thread = Thread::new(name);
        for i in 0..humans {
            let author = if i % 2 == 0 { "Heron" } else { "Otter" };
            thread.push_message(Message::from_participant(
                thread.id,
                author,
                format!("message {}", i + 1),
            ));
        }
        self.store.insert_thread(&thread);
        thread
    }

    /// Provision and store an agent of `type_id` on `thread`.
    pub fn agent(&self, type_id: &str, thread: &Thread) -> Agent {
        let agent_type = self
            .deps
            .registry
            .lookup(type_id)
            .expect("agent type must be registered");
        let agent = Agent::provision(agent_type, thread.id);
        self.store.insert_agent(&agent);
        agent
    }

    pub fn runtime(&self, agent: Agent) -> AgentRuntime {
        AgentRuntime::new(agent, Arc::clone(&self.deps))
    }

    /// Thread as currently stored.
    pub async fn reload_thread(&self, thread: &Thread) -> Thread {
        self.store
            .find_thread(thread.id)
            .await
            .expect("store failure")
            .expect("thread must exist")
    }

    pub fn stored_agent(&self, agent: &Agent) -> Agent {
        self.store.agent(agent.id).expect("agent must exist")
    }

    /// Queued generation tasks, without running them.
    pub fn queued_generations(&mut self) -> Vec<GenerationTask> {
        let mut tasks = Vec::new();
        while let Ok(task) = self.generations.try_recv() {
            tasks.push(task);
        }
        tasks
    }

    /// Run every queued generation to completion, in queue order.
    pub async fn drain_generations(&mut self) -> Vec<Result<Vec<Message>, AgentError>> {
        let mut results = Vec::new();
        for task in self.queued_generations() {
            results.push(process_generation(&self.deps, task).await);
        }
        results
    }
}
