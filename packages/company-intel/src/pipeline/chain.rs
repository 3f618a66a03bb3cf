//! Sequential prompt chains.
//!
//! A [`Chain`] is an ordered list of [`ChainStage`]s run under one system
//! persona. Each stage renders its template from the chain inputs plus the
//! outputs of every earlier stage, calls the backend once, and stores the
//! parsed answer under its output key.
//!
//! Execution is a small state machine:
//!
//! ```text
//! Pending -> Stage(0) -> Stage(1) -> ... -> Completed
//!                 |           |
//!                 +-----------+--> ShortCircuited { stage }   (sentinel answer)
//!                 +-----------+--> Failed { stage, reason }   (backend error, timeout, render error)
//! ```
//!
//! The executor never returns an error. Callers inspect the final
//! [`ChainState`] and treat short-circuits and failures as "no result".

use std::future::Future;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::{debug, error, warn};

use crate::error::{IntelError, Result};
use crate::pipeline::normalize::{is_sentinel, parse_comma_list};
use crate::pipeline::prompts::{Persona, PromptTemplate};
use crate::traits::ai::AI;

/// How a stage's raw completion is turned into its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputParser {
    /// Trimmed text
    #[default]
    Text,

    /// Comma separated items, trimmed, empties dropped
    CommaList,
}

impl OutputParser {
    pub fn parse(&self, raw: &str) -> ChainOutput {
        match self {
            OutputParser::Text => ChainOutput::Text(raw.trim().to_string()),
            OutputParser::CommaList => ChainOutput::List(parse_comma_list(raw)),
        }
    }
}

/// Parsed output of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutput {
    Text(String),
    List(Vec<String>),
}

impl ChainOutput {
    /// Text form fed to later stages.
    pub fn as_text(&self) -> String {
        match self {
            ChainOutput::Text(text) => text.clone(),
            ChainOutput::List(items) => items.join(", "),
        }
    }
}

/// One completion call in a chain.
#[derive(Debug, Clone)]
pub struct ChainStage {
    pub template: PromptTemplate,
    pub output_key: &'static str,
    pub parser: OutputParser,

    /// Stop the chain when the raw answer is the `NONE` sentinel
    pub stop_on_sentinel: bool,
}

impl ChainStage {
    pub fn new(template: PromptTemplate, output_key: &'static str) -> Self {
        Self {
            template,
            output_key,
            parser: OutputParser::Text,
            stop_on_sentinel: true,
        }
    }

    pub fn with_parser(mut self, parser: OutputParser) -> Self {
        self.parser = parser;
        self
    }

    /// Keep going even when the model answers `NONE`.
    pub fn without_sentinel(mut self) -> Self {
        self.stop_on_sentinel = false;
        self
    }
}

/// Where a chain run ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainState {
    Pending,
    Stage(usize),
    ShortCircuited { stage: usize },
    Completed,
    Failed { stage: usize, reason: String },
}

/// Outputs of every stage that produced one, plus the terminal state.
#[derive(Debug, Clone)]
pub struct ChainExecutionResult {
    pub outputs: IndexMap<String, ChainOutput>,
    pub state: ChainState,
}

impl ChainExecutionResult {
    /// Did a sentinel answer end the chain.
    pub fn is_terminal_sentinel(&self) -> bool {
        matches!(self.state, ChainState::ShortCircuited { .. })
    }

    pub fn is_completed(&self) -> bool {
        self.state == ChainState::Completed
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, ChainState::Failed { .. })
    }

    pub fn get(&self, key: &str) -> Option<&ChainOutput> {
        self.outputs.get(key)
    }

    /// Text output for `key`, if the stage produced text.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.outputs.get(key)? {
            ChainOutput::Text(text) => Some(text),
            ChainOutput::List(_) => None,
        }
    }

    /// List output for `key`, if the stage produced a list.
    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.outputs.get(key)? {
            ChainOutput::List(items) => Some(items),
            ChainOutput::Text(_) => None,
        }
    }
}

/// Await `fut` for at most `timeout`, mapping expiry to [`IntelError::Timeout`].
pub async fn bounded<T, F>(label: &str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| IntelError::Timeout {
            stage: label.to_string(),
            timeout,
        })?
}

/// An ordered sequence of stages run under one persona.
#[derive(Debug, Clone)]
pub struct Chain {
    name: &'static str,
    persona: Persona,
    stages: Vec<ChainStage>,
}

impl Chain {
    pub fn new(name: &'static str, persona: Persona) -> Self {
        Self {
            name,
            persona,
            stages: Vec::new(),
        }
    }

    pub fn stage(mut self, stage: ChainStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stages(&self) -> &[ChainStage] {
        &self.stages
    }

    /// Run every stage in order.
    ///
    /// `inputs` are visible to all stages; each stage's output is added to
    /// what later stages can reference. Every backend call is bounded by
    /// `timeout`.
    pub async fn run<A: AI + ?Sized>(
        &self,
        ai: &A,
        inputs: &[(&str, &str)],
        timeout: Duration,
    ) -> ChainExecutionResult {
        let mut context: IndexMap<String, String> = inputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut outputs = IndexMap::new();
        let mut state = ChainState::Pending;

        for (index, stage) in self.stages.iter().enumerate() {
            state = ChainState::Stage(index);

            let prompt = {
                let values: Vec<(&str, &str)> = context
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                match stage.template.render(&values) {
                    Ok(prompt) => prompt,
                    Err(e) => {
                        error!(chain = self.name, stage = index, error = %e, "Prompt render failed");
                        state = ChainState::Failed {
                            stage: index,
                            reason: e.to_string(),
                        };
                        break;
                    }
                }
            };

            let start = Instant::now();
            let label = format!("{}[{}]", self.name, index);
            let raw = match bounded(
                &label,
                timeout,
                ai.complete(self.persona.system_prompt(), &prompt),
            )
            .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    error!(chain = self.name, stage = index, error = %e, "Chain stage failed");
                    state = ChainState::Failed {
                        stage: index,
                        reason: e.to_string(),
                    };
                    break;
                }
            };

            debug!(
                chain = self.name,
                stage = index,
                template = stage.template.name(),
                prompt_len = prompt.len(),
                response_len = raw.len(),
                duration_ms = start.elapsed().as_millis(),
                "Chain stage completed"
            );

            if stage.stop_on_sentinel && is_sentinel(&raw) {
                warn!(chain = self.name, stage = index, "Sentinel answer, stopping chain");
                state = ChainState::ShortCircuited { stage: index };
                break;
            }

            let output = stage.parser.parse(&raw);
            context.insert(stage.output_key.to_string(), output.as_text());
            outputs.insert(stage.output_key.to_string(), output);
        }

        if matches!(state, ChainState::Pending | ChainState::Stage(_)) {
            state = ChainState::Completed;
        }

        ChainExecutionResult { outputs, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAI;

    const GREET: PromptTemplate = PromptTemplate::new("greet", "Say hi to {name}", &["name"]);
    const ECHO: PromptTemplate =
        PromptTemplate::new("echo", "Repeat {greeting} for {name}", &["greeting", "name"]);
    const BROKEN: PromptTemplate = PromptTemplate::new("broken", "Use {missing}", &["missing"]);

    fn two_stage() -> Chain {
        Chain::new("test", Persona::Summarization)
            .stage(ChainStage::new(GREET, "greeting"))
            .stage(ChainStage::new(ECHO, "echoed").with_parser(OutputParser::CommaList))
    }

    #[tokio::test]
    async fn test_outputs_flow_to_later_stages() {
        let ai = MockAI::new().with_responses(["  hello ada  ", "a, b,, c"]);

        let result = two_stage()
            .run(&ai, &[("name", "ada")], Duration::from_secs(5))
            .await;

        assert!(result.is_completed());
        assert_eq!(result.text("greeting"), Some("hello ada"));
        assert_eq!(
            result.list("echoed"),
            Some(&["a".to_string(), "b".to_string(), "c".to_string()][..])
        );
        assert_eq!(ai.prompts()[1], "Repeat hello ada for ada");
    }

    #[tokio::test]
    async fn test_sentinel_short_circuits() {
        let ai = MockAI::new().with_responses([" none \n"]);

        let result = two_stage()
            .run(&ai, &[("name", "ada")], Duration::from_secs(5))
            .await;

        assert_eq!(result.state, ChainState::ShortCircuited { stage: 0 });
        assert!(result.is_terminal_sentinel());
        assert!(result.outputs.is_empty());
        assert_eq!(ai.completion_count(), 1);
    }

    #[tokio::test]
    async fn test_sentinel_can_be_disabled() {
        let ai = MockAI::new().with_responses(["NONE"]);
        let chain = Chain::new("lenient", Persona::Summarization)
            .stage(ChainStage::new(GREET, "greeting").without_sentinel());

        let result = chain
            .run(&ai, &[("name", "ada")], Duration::from_secs(5))
            .await;

        assert!(result.is_completed());
        assert_eq!(result.text("greeting"), Some("NONE"));
    }

    #[tokio::test]
    async fn test_backend_failure_stops_chain() {
        let ai = MockAI::new()
            .with_response("Say hi", "hello")
            .with_failure("Repeat");

        let result = two_stage()
            .run(&ai, &[("name", "ada")], Duration::from_secs(5))
            .await;

        assert!(result.is_failed());
        assert!(matches!(result.state, ChainState::Failed { stage: 1, .. }));
        assert_eq!(result.outputs.len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_fails_stage() {
        let ai = MockAI::new().with_delay(Duration::from_millis(200));

        let result = two_stage()
            .run(&ai, &[("name", "ada")], Duration::from_millis(10))
            .await;

        match result.state {
            ChainState::Failed { stage, reason } => {
                assert_eq!(stage, 0);
                assert!(reason.contains("timed out after 10ms"));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bounded_keeps_sub_second_deadline() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<(), IntelError>(())
        };

        let err = bounded("embed_chunks", Duration::from_millis(25), slow)
            .await
            .unwrap_err();

        match err {
            IntelError::Timeout { stage, timeout } => {
                assert_eq!(stage, "embed_chunks");
                assert_eq!(timeout, Duration::from_millis(25));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_input_fails_without_backend_call() {
        let ai = MockAI::new();
        let chain = Chain::new("broken", Persona::Summarization)
            .stage(ChainStage::new(BROKEN, "out"));

        let result = chain.run(&ai, &[], Duration::from_secs(5)).await;

        assert!(result.is_failed());
        assert_eq!(ai.completion_count(), 0);
    }

    #[tokio::test]
    async fn test_persona_is_sent_as_system_message() {
        let ai = MockAI::new().with_responses(["x", "y"]);

        two_stage()
            .run(&ai, &[("name", "ada")], Duration::from_secs(5))
            .await;

        match &ai.calls()[0] {
            crate::testing::MockAICall::Complete { persona, .. } => {
                assert_eq!(persona, Persona::Summarization.system_prompt());
            }
            other => panic!("unexpected call {other:?}"),
        }
    }
}
