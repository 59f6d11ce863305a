//! # tripflow-core - Agent graph engine
//!
//! The orchestration substrate for tripflow's dialogue agents. Each agent is
//! a small directed graph of processing nodes over one typed state record;
//! this crate provides the pieces every agent shares:
//!
//! - [`ConversationState`] - the universal working record (transcript,
//!   accumulated context, streaming cursor, routing hint).
//! - [`Node`] - the explicit node contract: `async fn run(state) -> state`,
//!   capabilities injected at construction.
//! - [`Guarded`] - the wrapper applied to **every** node, enforcing state
//!   sanitation, error containment, response backfill, and the guardrail
//!   monitor/validator passes.
//! - [`StreamCursor`]/[`StreamUpdateNode`] - the chunked-reveal state
//!   machine that turns a finished response into a sequence of "typing"
//!   updates via a self-looping node.
//! - [`GraphBuilder`]/[`AgentGraph`] - construction-time-validated graphs
//!   over closed node-key enums, walked cooperatively with a snapshot
//!   yielded per node.
//! - [`AgentRuntime`] - the per-turn protocol over a checkpointed session
//!   store: lock, restore, walk, checkpoint once.
//!
//! ## Shape of a turn
//!
//! ```text
//! user message
//!      │
//!      ▼
//! AgentRuntime ── restore checkpoint ──▶ AgentGraph::walk
//!                                            │ per node: Guarded(run) → snapshot
//!                                            ▼
//!                                   TurnUpdate stream ──▶ client
//!                                            │
//!                             checkpoint ◀───┘ (once, at the boundary)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tripflow_core::{AgentRuntime, GraphBuilder, Step, TurnRequest};
//! use tripflow_guardrail::{ResponseMonitor, ResponseValidator};
//! use tripflow_session::InMemorySessionStore;
//!
//! let graph = GraphBuilder::new(Arc::new(ResponseValidator::new()), Arc::new(ResponseMonitor::new()))
//!     .add_node(Key::Greet, GreetNode::new(llm))
//!     .set_entry(Key::Greet)
//!     .add_edge(Key::Greet, Step::End)
//!     .compile()?;
//!
//! let runtime = AgentRuntime::new(graph, Arc::new(InMemorySessionStore::new()));
//! let updates = runtime.process_collect(TurnRequest::new("session-1", "안녕하세요")).await?;
//! ```

pub mod error;
pub mod graph;
pub mod node;
pub mod runner;
pub mod state;
pub mod streaming;
pub mod wrapper;

pub use error::{GraphError, Result};
pub use graph::{AgentGraph, GraphBuilder, NodeKey, Step, WalkOptions};
pub use node::{Node, NodeError};
pub use runner::{AgentRuntime, TurnRequest};
pub use state::{ChatMessage, ConfigData, ConversationState, Role, TurnUpdate};
pub use streaming::{
    streaming_complete, StreamCursor, StreamUpdateNode, DEFAULT_CHUNK_SIZE, STREAM_NODE_NAME,
};
pub use wrapper::Guarded;
