//! Facilitator dependencies (using traits for testability)
//!
//! This module provides the central dependency container shared by the agent
//! runtime, message ingestion and the background workers. All external
//! services are trait objects so tests can swap in the mocks from
//! `test_dependencies`.

use std::sync::Arc;

use super::stream_hub::StreamHub;
use super::{BaseCompletionService, BaseScheduler, BaseStore};
use crate::domains::agents::activity::ActivityTracker;
use crate::domains::agents::dispatch::GenerationQueue;
use crate::domains::agents::registry::AgentTypeRegistry;

#[derive(Clone)]
pub struct FacilitatorDeps {
    pub store: Arc<dyn BaseStore>,
    pub completion: Arc<dyn BaseCompletionService>,
    pub scheduler: Arc<dyn BaseScheduler>,
    /// In-process pub/sub hub for live thread subscribers
    pub stream_hub: StreamHub,
    /// Read-only after startup
    pub registry: Arc<AgentTypeRegistry>,
    /// Hand-off to the dispatch worker for CONTRIBUTE activations
    pub generation_queue: GenerationQueue,
    pub activity: ActivityTracker,
}

impl FacilitatorDeps {
    pub fn new(
        store: Arc<dyn BaseStore>,
        completion: Arc<dyn BaseCompletionService>,
        scheduler: Arc<dyn BaseScheduler>,
        stream_hub: StreamHub,
        registry: Arc<AgentTypeRegistry>,
        generation_queue: GenerationQueue,
    ) -> Self {
        Self {
            store,
            completion,
            scheduler,
            stream_hub,
            registry,
            generation_queue,
            activity: ActivityTracker::new(),
        }
    }
}
