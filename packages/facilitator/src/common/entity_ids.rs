//! Typed ID definitions for facilitation entities.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Agent entities (one per agent-thread pairing).
pub struct Agent;

/// Marker type for discussion Thread entities.
pub struct Thread;

/// Marker type for Message entities.
pub struct Message;

/// Marker type for Pseudonym entities (display identities).
pub struct Pseudonym;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

pub type AgentId = Id<Agent>;

pub type ThreadId = Id<Thread>;

pub type MessageId = Id<Message>;

pub type PseudonymId = Id<Pseudonym>;
