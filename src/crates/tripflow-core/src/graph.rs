//! Graph construction and execution.
//!
//! An agent graph is a closed set of named nodes plus a transition table.
//! Node identifiers are **enums**, not strings: each agent declares a
//! [`NodeKey`] type, so a misspelled transition target is a compile error
//! and the remaining structural mistakes (missing transition, undeclared
//! conditional target, unset entry) are caught by [`GraphBuilder::compile`]
//! before the graph can run.
//!
//! ```text
//!  entry ──▶ [processing nodes] ──▶ update_stream ─┐
//!                                        ▲         │ not complete
//!                                        └─────────┘
//!                                        │ complete
//!                                        ▼
//!                                       END
//! ```
//!
//! Execution is a cooperative single-threaded walk: each node's output is
//! the next node's input, and a [`TurnUpdate`] snapshot is yielded after
//! every node so the hosting layer can stream partial responses. Between
//! incomplete streaming ticks the walker sleeps the configured pacing delay
//! (a tokio sleep - other sessions keep running).

use crate::error::{GraphError, Result};
use crate::node::Node;
use crate::state::{ConversationState, TurnUpdate};
use crate::streaming::streaming_complete;
use crate::wrapper::Guarded;
use futures::Stream;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tripflow_guardrail::{ResponseMonitor, ResponseValidator};

/// Closed identifier set for one agent's nodes.
///
/// Implemented by a small `enum` per agent. `parse` is the tolerant inverse
/// of `as_str` used for wire-level `next_node`/`start_node` hints; an
/// unrecognized name falls back to the graph entry rather than failing.
pub trait NodeKey: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    fn as_str(&self) -> &'static str;
    fn parse(name: &str) -> Option<Self>
    where
        Self: Sized;
}

/// Where a transition leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<K> {
    /// Continue with the named node.
    Node(K),
    /// Terminate the walk.
    End,
}

type EdgeFn<K> = Arc<dyn Fn(&ConversationState) -> Step<K> + Send + Sync>;

enum Transition<K> {
    Direct(Step<K>),
    Conditional {
        router: EdgeFn<K>,
        targets: Vec<Step<K>>,
    },
}

/// Mutable graph under construction.
pub struct GraphBuilder<K: NodeKey> {
    nodes: HashMap<K, Arc<Guarded>>,
    transitions: HashMap<K, Transition<K>>,
    entry: Option<K>,
    validator: Arc<ResponseValidator>,
    monitor: Arc<ResponseMonitor>,
}

impl<K: NodeKey> GraphBuilder<K> {
    /// Builder sharing the given guardrail components. Every node added is
    /// wrapped in [`Guarded`]; there is no unwrapped registration path.
    pub fn new(validator: Arc<ResponseValidator>, monitor: Arc<ResponseMonitor>) -> Self {
        Self {
            nodes: HashMap::new(),
            transitions: HashMap::new(),
            entry: None,
            validator,
            monitor,
        }
    }

    /// Register a node under its key.
    pub fn add_node(mut self, key: K, node: impl Node + 'static) -> Self {
        let guarded = Guarded::new(
            Arc::new(node),
            self.validator.clone(),
            self.monitor.clone(),
        );
        self.nodes.insert(key, Arc::new(guarded));
        self
    }

    /// Mark the default entry node.
    pub fn set_entry(mut self, key: K) -> Self {
        self.entry = Some(key);
        self
    }

    /// Unconditional transition.
    pub fn add_edge(mut self, from: K, to: Step<K>) -> Self {
        self.transitions.insert(from, Transition::Direct(to));
        self
    }

    /// Conditional transition. `targets` declares every step the router may
    /// return; undeclared node targets fail compilation.
    pub fn add_conditional_edge(
        mut self,
        from: K,
        router: impl Fn(&ConversationState) -> Step<K> + Send + Sync + 'static,
        targets: Vec<Step<K>>,
    ) -> Self {
        self.transitions.insert(
            from,
            Transition::Conditional {
                router: Arc::new(router),
                targets,
            },
        );
        self
    }

    /// Validate the structure and produce an executable graph.
    pub fn compile(self) -> Result<AgentGraph<K>> {
        let entry = self
            .entry
            .ok_or_else(|| GraphError::Validation("graph has no entry point".into()))?;

        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::Validation(format!(
                "entry node '{}' is not registered",
                entry.as_str()
            )));
        }

        for key in self.nodes.keys() {
            if !self.transitions.contains_key(key) {
                return Err(GraphError::Validation(format!(
                    "node '{}' has no outgoing transition",
                    key.as_str()
                )));
            }
        }

        for (from, transition) in &self.transitions {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::Validation(format!(
                    "transition declared for unregistered node '{}'",
                    from.as_str()
                )));
            }
            let declared: Vec<Step<K>> = match transition {
                Transition::Direct(step) => vec![*step],
                Transition::Conditional { targets, .. } => targets.clone(),
            };
            for step in declared {
                if let Step::Node(target) = step {
                    if !self.nodes.contains_key(&target) {
                        return Err(GraphError::Validation(format!(
                            "transition from '{}' targets unregistered node '{}'",
                            from.as_str(),
                            target.as_str()
                        )));
                    }
                }
            }
        }

        Ok(AgentGraph {
            nodes: self.nodes,
            transitions: self.transitions,
            entry,
        })
    }
}

/// Knobs for one walk of a graph.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Cooperative delay between incomplete streaming ticks (the "typing"
    /// effect). Zero disables pacing; tests run with zero.
    pub pacing: Duration,
    /// Upper bound on node executions per turn.
    pub max_steps: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            pacing: Duration::from_secs(1),
            max_steps: 256,
        }
    }
}

/// A compiled, immutable agent graph.
pub struct AgentGraph<K: NodeKey> {
    nodes: HashMap<K, Arc<Guarded>>,
    transitions: HashMap<K, Transition<K>>,
    entry: K,
}

impl<K: NodeKey> AgentGraph<K> {
    /// The default entry node.
    pub fn entry(&self) -> K {
        self.entry
    }

    /// Resolve a wire-level start-node hint. Unknown or absent names fall
    /// back to the entry - routing hints degrade, they never fail a turn.
    pub fn resolve_start(&self, name: Option<&str>) -> K {
        name.and_then(K::parse)
            .filter(|key| self.nodes.contains_key(key))
            .unwrap_or(self.entry)
    }

    /// Walk the graph from `start`, yielding a snapshot after every node.
    ///
    /// The walk ends at a [`Step::End`] transition, on a contained error
    /// state, or when the step budget runs out. Node failures never escape:
    /// the guarded wrapper converts them into error states first.
    pub fn walk(
        self: Arc<Self>,
        state: ConversationState,
        start: K,
        options: WalkOptions,
    ) -> impl Stream<Item = Result<(ConversationState, TurnUpdate)>> + Send {
        let graph = self;

        async_stream::stream! {
            let mut state = state;
            let mut current = start;
            let mut steps = 0usize;

            loop {
                steps += 1;
                if steps > options.max_steps {
                    tracing::error!(steps, "walk exceeded step budget");
                    yield Err(GraphError::Execution(format!(
                        "walk exceeded {} steps without terminating",
                        options.max_steps
                    )));
                    break;
                }

                let Some(node) = graph.nodes.get(&current).cloned() else {
                    yield Err(GraphError::Validation(format!(
                        "walk reached unregistered node '{}'",
                        current.as_str()
                    )));
                    break;
                };

                state = match node.run(state).await {
                    Ok(next) => next,
                    Err(error) => {
                        yield Err(GraphError::NodeExecution {
                            node: current.as_str().to_string(),
                            message: error.message().to_string(),
                        });
                        break;
                    }
                };

                let update = TurnUpdate::from_state(&state);
                let errored = state.error.is_some();
                yield Ok((state.clone(), update));

                if errored {
                    break;
                }

                let next = match graph.transitions.get(&current) {
                    Some(Transition::Direct(step)) => *step,
                    Some(Transition::Conditional { router, .. }) => router(&state),
                    None => Step::End,
                };

                match next {
                    Step::End => break,
                    Step::Node(key) => {
                        if !graph.nodes.contains_key(&key) {
                            yield Err(GraphError::Validation(format!(
                                "conditional edge from '{}' returned undeclared node '{}'",
                                current.as_str(),
                                key.as_str()
                            )));
                            break;
                        }
                        if !streaming_complete(&state) && !options.pacing.is_zero() {
                            tokio::time::sleep(options.pacing).await;
                        }
                        current = key;
                    }
                }
            }
        }
    }
}
