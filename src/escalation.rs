use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::confidence::UncertaintyDetector;
use crate::error::{QaError, QaResult};
use crate::llm::Generator;
use crate::prompts;
use crate::retriever::{Retriever, ScoredRecipe};
use crate::web::WebSearch;

/// Upper bound on generation calls per question: one grounded pass, one web pass.
pub const MAX_GENERATION_PASSES: u8 = 2;

pub const NO_CONTEXT_MESSAGE: &str =
    "I couldn't find any relevant recipes in the database. Let me search the web...";

/// How a question was finally answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing retrieved; no generation or web call was made.
    NoContext,
    /// The recipe-grounded answer was confident.
    Direct,
    /// Pass 1 was uncertain or failed; the web-augmented pass succeeded.
    WebAugmented,
    /// The web-augmented generation pass failed.
    WebAugmentedFailed,
}

#[derive(Debug)]
pub struct QaResponse {
    pub outcome: Outcome,
    pub answer: String,
    /// Names of the recipes used as grounding, nearest first.
    pub recipes: Vec<String>,
    pub generation_passes: u8,
    pub web_searched: bool,
}

/// Per-question state, dropped once the response is assembled.
struct Escalation<'q> {
    question: &'q str,
    retrieved: Vec<ScoredRecipe>,
    generation_passes: u8,
}

impl Escalation<'_> {
    fn finish(self, outcome: Outcome, answer: String, web_searched: bool) -> QaResponse {
        QaResponse {
            outcome,
            answer,
            recipes: self
                .retrieved
                .into_iter()
                .map(|r| r.recipe.name)
                .collect(),
            generation_passes: self.generation_passes,
            web_searched,
        }
    }
}

/// Retrieve, answer from recipes, and escalate to a web-augmented pass when the
/// first answer is uncertain or the generation service fails.
pub struct EscalationEngine {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    web: Arc<dyn WebSearch>,
    detector: UncertaintyDetector,
    top_k: usize,
}

impl EscalationEngine {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn Generator>,
        web: Arc<dyn WebSearch>,
        detector: UncertaintyDetector,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            web,
            detector,
            top_k,
        }
    }

    /// Answer one question end to end.
    ///
    /// Only an embedding failure during retrieval is returned as an error;
    /// generation and web search failures are folded into the answer text.
    pub async fn answer(&self, question: &str) -> QaResult<QaResponse> {
        info!(question, "Processing question");

        let retrieved = self.retriever.retrieve(question, self.top_k).await?;
        let mut state = Escalation {
            question,
            retrieved,
            generation_passes: 0,
        };

        if state.retrieved.is_empty() {
            info!("No relevant recipes found");
            return Ok(state.finish(Outcome::NoContext, NO_CONTEXT_MESSAGE.to_string(), false));
        }

        let recipes: Vec<_> = state.retrieved.iter().map(|r| r.recipe.clone()).collect();
        let prompt = prompts::recipe_prompt(&recipes, question);
        debug!(prompt_len = prompt.len(), "Recipe prompt prepared");

        let first = self.generate(&mut state, &prompt).await;
        let first_text = match first {
            Ok(answer) if !self.detector.is_uncertain(&answer) => {
                info!(answer_len = answer.len(), "Answered from recipes");
                return Ok(state.finish(Outcome::Direct, answer, false));
            }
            Ok(answer) => {
                info!("Uncertain answer, escalating to web search");
                answer
            }
            Err(e) => {
                warn!(error = %e, "Generation failed, escalating to web search");
                format!("Error with Ollama: {}", e)
            }
        };

        let web_results = match self.web.search(state.question).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Web search failed, continuing with error text");
                e.to_string()
            }
        };
        debug!(
            "Web search results: {}",
            &web_results[..floor_char_boundary(&web_results, 200)]
        );

        let prompt = prompts::web_prompt(&web_results, question);
        match self.generate(&mut state, &prompt).await {
            Ok(second) => {
                info!(
                    answer_len = second.len(),
                    still_uncertain = self.detector.is_uncertain(&second),
                    "Web-augmented answer received"
                );
                let answer = format!(
                    "Original answer: {}\n\nAfter web search: {}",
                    first_text, second
                );
                Ok(state.finish(Outcome::WebAugmented, answer, true))
            }
            Err(e) => {
                warn!(error = %e, "Web-augmented generation failed");
                let answer = format!(
                    "Original answer: {}\n\nWeb search results:\n{}\n\nError with Ollama after web search: {}",
                    first_text, web_results, e
                );
                Ok(state.finish(Outcome::WebAugmentedFailed, answer, true))
            }
        }
    }

    async fn generate(&self, state: &mut Escalation<'_>, prompt: &str) -> QaResult<String> {
        if state.generation_passes >= MAX_GENERATION_PASSES {
            return Err(QaError::Generation(format!(
                "generation pass limit of {} reached",
                MAX_GENERATION_PASSES
            )));
        }
        state.generation_passes += 1;
        debug!(pass = state.generation_passes, "Calling generation service");
        self.generator.generate(prompt).await
    }
}

/// Largest char boundary at or below `max`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}
