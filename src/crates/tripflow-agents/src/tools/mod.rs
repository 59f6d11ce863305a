//! The itinerary agent's tool-use loop.
//!
//! A bounded reason/act cycle: the model is shown the registered tools and
//! asked to answer either with a tool directive
//!
//! ```text
//! Action: place_search
//! Action Input: 서울 카페
//! ```
//!
//! or a final answer (`Action: FinalAnswer`). Observations are fed back
//! through a scratchpad until the model finishes or the iteration budget
//! runs out.
//!
//! Two correctness properties are load-bearing:
//!
//! - **Repeat breaker** - issuing the same `(tool, normalized input)` pair
//!   twice within one invocation short-circuits to a fixed closing message
//!   instead of calling the tool again. The cache key is explicit; without
//!   it a confused model can ping-pong the same search forever.
//! - **Overload retry** - the model call retries on
//!   [`LlmError::Overloaded`] only, a fixed number of times with a fixed
//!   delay, then propagates.

pub mod calendar;
pub mod place_search;

pub use calendar::CalendarRegisterTool;
pub use place_search::PlaceSearchTool;

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tripflow_core::ChatMessage;
use tripflow_llm::{retry::MAX_RETRIES, retry::RETRY_DELAY, retry_on_overload, LlmClient, LlmError};

/// Response used when the model repeats an identical tool call.
pub const REPEATED_TOOL_MESSAGE: &str = "동일한 도구를 반복해서 사용하여 일정을 종료합니다.";

/// Response used when the iteration budget runs out.
pub const ITERATION_BUDGET_MESSAGE: &str =
    "요청을 처리하는 단계가 너무 길어져 여기서 마무리합니다. 조금 더 구체적으로 말씀해주시면 다시 시도해볼게요.";

/// Default iteration bound for the reason/act cycle.
pub const MAX_ITERATIONS: usize = 12;

/// A tool failure. Reported back to the model as an observation; it does
/// not abort the loop.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ToolError(pub String);

/// One external capability the loop may invoke.
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn call(&self, input: &str) -> Result<String, ToolError>;
}

/// What the model asked for in one iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Invoke a tool with the given input.
    Act { tool: String, input: String },
    /// The final answer text.
    Final(String),
    /// No directive shape found; treat the whole output as the answer.
    Plain(String),
}

/// Parse a model answer into a [`Directive`].
pub fn parse_directive(output: &str) -> Directive {
    static ACTION: OnceLock<Regex> = OnceLock::new();
    static INPUT: OnceLock<Regex> = OnceLock::new();

    let action = ACTION
        .get_or_init(|| Regex::new(r"Action:\s*([A-Za-z_][A-Za-z0-9_]*)").expect("action pattern"))
        .captures(output);
    let Some(action) = action else {
        return Directive::Plain(output.trim().to_string());
    };

    let input = INPUT
        .get_or_init(|| Regex::new(r"(?s)Action Input:\s*(.+)").expect("input pattern"))
        .captures(output)
        .map(|captures| captures[1].trim().to_string())
        .unwrap_or_default();

    let tool = action[1].to_string();
    if tool == "FinalAnswer" {
        Directive::Final(input)
    } else {
        Directive::Act { tool, input }
    }
}

/// Normalize a tool input for repeat detection: case-folded, whitespace
/// collapsed.
fn normalize_input(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Bounded reason/act loop over a set of tools.
pub struct ToolLoop {
    llm: Arc<dyn LlmClient>,
    tools: Vec<Arc<dyn AgentTool>>,
    max_iterations: usize,
}

impl ToolLoop {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Vec<Arc<dyn AgentTool>>) -> Self {
        Self {
            llm,
            tools,
            max_iterations: MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Tool list rendered for the system prompt.
    pub fn tool_descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Comma-separated tool names for the system prompt.
    pub fn tool_names(&self) -> String {
        self.tools
            .iter()
            .map(|tool| tool.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn AgentTool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Run the loop for one task. Returns the final answer text; the only
    /// error that escapes is a model failure that survived the overload
    /// retry.
    pub async fn run(
        &self,
        system_prompt: &str,
        task: &str,
        history: &[ChatMessage],
    ) -> Result<String, LlmError> {
        let mut scratchpad = String::new();
        let mut executed: HashSet<(String, String)> = HashSet::new();

        for iteration in 0..self.max_iterations {
            let prompt = if scratchpad.is_empty() {
                format!("{system_prompt}\n\n요청: {task}")
            } else {
                format!("{system_prompt}\n\n요청: {task}\n\n지금까지의 작업:\n{scratchpad}")
            };

            let output = retry_on_overload(MAX_RETRIES, RETRY_DELAY, || {
                self.llm.generate(&prompt, history)
            })
            .await?;

            match parse_directive(&output) {
                Directive::Final(answer) | Directive::Plain(answer) => {
                    tracing::debug!(iteration, "tool loop finished");
                    return Ok(answer);
                }
                Directive::Act { tool, input } => {
                    let key = (tool.clone(), normalize_input(&input));
                    if !executed.insert(key) {
                        tracing::warn!(%tool, "repeated identical tool call; ending loop");
                        return Ok(REPEATED_TOOL_MESSAGE.to_string());
                    }

                    let observation = match self.find_tool(&tool) {
                        Some(found) => match found.call(&input).await {
                            Ok(result) => result,
                            Err(error) => {
                                tracing::warn!(%tool, %error, "tool call failed");
                                format!("[도구 오류] {error}")
                            }
                        },
                        None => format!("알 수 없는 도구: {tool}"),
                    };

                    scratchpad.push_str(&format!(
                        "Action: {tool}\nAction Input: {input}\nObservation: {observation}\n\n"
                    ));
                }
            }
        }

        tracing::warn!(max_iterations = self.max_iterations, "tool loop budget exhausted");
        Ok(ITERATION_BUDGET_MESSAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tripflow_llm::Result as LlmResult;

    struct ScriptedLlm {
        responses: Mutex<VecDeque<LlmResult<String>>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<LlmResult<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, _prompt: &str, _history: &[ChatMessage]) -> LlmResult<String> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("Action: FinalAnswer\nAction Input: 기본 응답".to_string()))
        }
    }

    struct EchoTool;

    #[async_trait]
    impl AgentTool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "입력을 그대로 돌려줍니다"
        }

        async fn call(&self, input: &str) -> Result<String, ToolError> {
            Ok(format!("메아리: {input}"))
        }
    }

    fn tool_loop(responses: Vec<LlmResult<String>>) -> ToolLoop {
        ToolLoop::new(Arc::new(ScriptedLlm::new(responses)), vec![Arc::new(EchoTool)])
    }

    #[test]
    fn directive_parsing() {
        assert_eq!(
            parse_directive("Action: place_search\nAction Input: 서울 카페"),
            Directive::Act {
                tool: "place_search".into(),
                input: "서울 카페".into()
            }
        );
        assert_eq!(
            parse_directive("Action: FinalAnswer\nAction Input: 1일차: 경복궁"),
            Directive::Final("1일차: 경복궁".into())
        );
        assert_eq!(
            parse_directive("그냥 설명 텍스트"),
            Directive::Plain("그냥 설명 텍스트".into())
        );
    }

    #[tokio::test]
    async fn acts_then_finishes() {
        let looped = tool_loop(vec![
            Ok("Action: echo\nAction Input: 안녕".to_string()),
            Ok("Action: FinalAnswer\nAction Input: 1일차: 경복궁 방문".to_string()),
        ]);

        let answer = looped.run("시스템", "서울 일정", &[]).await.unwrap();
        assert_eq!(answer, "1일차: 경복궁 방문");
    }

    #[tokio::test]
    async fn repeated_identical_call_breaks_the_loop() {
        let looped = tool_loop(vec![
            Ok("Action: echo\nAction Input: 서울 카페".to_string()),
            // Same tool, same input modulo spacing/case.
            Ok("Action: echo\nAction Input:  서울   카페 ".to_string()),
            Ok("Action: FinalAnswer\nAction Input: 도달하면 안 됨".to_string()),
        ]);

        let answer = looped.run("시스템", "서울 일정", &[]).await.unwrap();
        assert_eq!(answer, REPEATED_TOOL_MESSAGE);
    }

    #[tokio::test]
    async fn unknown_tool_becomes_an_observation() {
        let looped = tool_loop(vec![
            Ok("Action: teleport\nAction Input: 제주".to_string()),
            Ok("Action: FinalAnswer\nAction Input: 마무리".to_string()),
        ]);

        let answer = looped.run("시스템", "일정", &[]).await.unwrap();
        assert_eq!(answer, "마무리");
    }

    #[tokio::test]
    async fn iteration_budget_produces_canned_message() {
        let responses: Vec<LlmResult<String>> = (0..20)
            .map(|n| Ok(format!("Action: echo\nAction Input: 입력 {n}")))
            .collect();
        let looped = tool_loop(responses).with_max_iterations(3);

        let answer = looped.run("시스템", "일정", &[]).await.unwrap();
        assert_eq!(answer, ITERATION_BUDGET_MESSAGE);
    }

    #[tokio::test]
    async fn non_overload_model_failure_propagates() {
        let looped = tool_loop(vec![Err(LlmError::Authentication("bad key".into()))]);
        let result = looped.run("시스템", "일정", &[]).await;
        assert!(matches!(result, Err(LlmError::Authentication(_))));
    }
}
