//! # tripflow-agents - The dialogue agents
//!
//! Five specialized agents answer travel-planning conversations, each a
//! small graph over the `tripflow-core` engine:
//!
//! | agent        | job                                          |
//! |--------------|----------------------------------------------|
//! | conversation | greetings, small talk, farewells             |
//! | itinerary    | plan generation (tool-using loop) + listing  |
//! | place search | Kakao keyword search with slot extraction    |
//! | calendar     | registering saved itineraries as events      |
//! | sharing      | creating expiring share links                |
//!
//! A raw user message first hits the [`IntentRouter`], which picks the agent
//! and its start node; the [`Orchestrator`] then runs the matching graph
//! over the shared session store and streams `TurnUpdate` snapshots back.
//!
//! Capabilities (LLM, place search, calendar, share links, itinerary
//! storage) arrive bundled in [`AgentDeps`] and are injected into node
//! structs at graph construction.

pub mod deps;
pub mod extract;
pub mod graphs;
pub mod orchestrator;
pub mod place_parse;
pub mod prompts;
pub mod router;
pub mod share_extract;
pub mod tools;

pub use deps::AgentDeps;
pub use orchestrator::Orchestrator;
pub use router::{AgentKind, Intent, IntentRouter, RouteTarget};
