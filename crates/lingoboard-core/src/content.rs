//! Boundary to the exercise content provider and answer checker.
//!
//! Generated items are opaque JSON values. They belong to the block's view
//! state ([`ContentStore`]), not to the persisted board, and can always be
//! regenerated from the block parameters.

use crate::block::{Block, BlockId, Difficulty, ExerciseType, Tone};
use crate::storage::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use thiserror::Error;

/// Opaque generated exercise items.
pub type ItemList = Vec<Value>;

/// Errors reported by content collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentError {
    #[error("Content provider error: {0}")]
    Provider(String),
    #[error("Invalid content: {0}")]
    InvalidResponse(String),
    #[error("Content provider unavailable")]
    Unavailable,
}

/// Parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub exercise: ExerciseType,
    pub difficulty: Difficulty,
    pub tone: Tone,
    pub theme: String,
    /// Number of items to generate.
    pub amount: u32,
    pub focus_vocabulary: Vec<String>,
    pub vocab_rate: f64,
    pub focus_grammar: Vec<String>,
    pub grammar_rate: f64,
}

impl GenerationRequest {
    /// Build a request from a block. The manual quantity wins over `default_amount`.
    pub fn from_block(block: &Block, default_amount: u32) -> Self {
        let params = block.params.clone().normalized();
        Self {
            exercise: block.exercise,
            difficulty: params.difficulty,
            tone: params.tone,
            theme: params.theme,
            amount: params.quantity.unwrap_or(default_amount).max(1),
            focus_vocabulary: params.focus_vocabulary,
            vocab_rate: params.vocab_rate,
            focus_grammar: params.focus_grammar,
            grammar_rate: params.grammar_rate,
        }
    }
}

/// Produces exercise items for a request.
///
/// Retries, if any, are the provider's business.
pub trait ContentProvider: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> BoxFuture<'_, Result<ItemList, ContentError>>;
}

/// Verdict on a learner's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub is_correct: bool,
    pub feedback: String,
}

/// Judges free-form answers. Used by exercise widgets.
pub trait AnswerChecker: Send + Sync {
    fn check(&self, kind: ExerciseType, context: &Value, response: &str) -> BoxFuture<'_, Result<CheckOutcome, ContentError>>;
}

/// Offline checker comparing against an expected answer.
///
/// The context is either the expected string or an object with an `answer`
/// field (string or list of accepted strings). Comparison ignores case,
/// surrounding whitespace and repeated inner whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatchChecker;

fn normalize_answer(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn accepted_answers(context: &Value) -> Option<Vec<String>> {
    let answer = match context {
        Value::Object(map) => map.get("answer")?,
        other => other,
    };
    match answer {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => Some(items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()),
        _ => None,
    }
}

impl AnswerChecker for ExactMatchChecker {
    fn check(&self, _kind: ExerciseType, context: &Value, response: &str) -> BoxFuture<'_, Result<CheckOutcome, ContentError>> {
        let result = match accepted_answers(context) {
            Some(accepted) if !accepted.is_empty() => {
                let given = normalize_answer(response);
                let is_correct = accepted.iter().any(|a| normalize_answer(a) == given);
                let feedback = if is_correct {
                    "Correct!".to_string()
                } else {
                    format!("Expected: {}", accepted[0])
                };
                Ok(CheckOutcome { is_correct, feedback })
            }
            _ => Err(ContentError::InvalidResponse("no expected answer in context".to_string())),
        };
        Box::pin(async move { result })
    }
}

/// Provider returning canned or synthesized items, for offline hosts and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticContentProvider {
    fixtures: HashMap<ExerciseType, ItemList>,
    fail_with: Option<String>,
}

impl StaticContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `items` for one exercise type, truncated to the requested amount.
    pub fn with_items(mut self, exercise: ExerciseType, items: ItemList) -> Self {
        self.fixtures.insert(exercise, items);
        self
    }

    /// Fail every request with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    fn items_for(&self, request: &GenerationRequest) -> ItemList {
        let amount = request.amount as usize;
        if let Some(items) = self.fixtures.get(&request.exercise) {
            return items.iter().take(amount).cloned().collect();
        }
        (0..amount)
            .map(|i| {
                json!({
                    "index": i,
                    "type": request.exercise.token(),
                    "prompt": format!("{} item {} ({})", request.exercise, i + 1, request.theme),
                })
            })
            .collect()
    }
}

impl ContentProvider for StaticContentProvider {
    fn generate(&self, request: &GenerationRequest) -> BoxFuture<'_, Result<ItemList, ContentError>> {
        let result = match &self.fail_with {
            Some(message) => Err(ContentError::Provider(message.clone())),
            None => Ok(self.items_for(request)),
        };
        Box::pin(async move { result })
    }
}

/// Content state of a block.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedContent {
    /// A generation call is in flight.
    Pending,
    Ready(ItemList),
    /// Shown inline in the block; the user may retry by regenerating.
    Failed(String),
}

impl GeneratedContent {
    pub fn items(&self) -> Option<&ItemList> {
        match self {
            GeneratedContent::Ready(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, GeneratedContent::Failed(_))
    }
}

/// Per-block generated content, kept outside the persisted board.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    entries: HashMap<BlockId, GeneratedContent>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: BlockId) -> Option<&GeneratedContent> {
        self.entries.get(&id)
    }

    pub fn mark_pending(&mut self, id: BlockId) {
        self.entries.insert(id, GeneratedContent::Pending);
    }

    /// Store the outcome of a generation call. Failures stay local to the block.
    pub fn resolve(&mut self, id: BlockId, result: Result<ItemList, ContentError>) -> &GeneratedContent {
        let content = match result {
            Ok(items) => GeneratedContent::Ready(items),
            Err(e) => {
                log::warn!("Generation for block {} failed: {}", id, e);
                GeneratedContent::Failed(e.to_string())
            }
        };
        self.entries.entry(id).insert_entry(content).into_mut()
    }

    pub fn remove(&mut self, id: BlockId) -> Option<GeneratedContent> {
        self.entries.remove(&id)
    }

    /// Drop content of blocks that no longer exist.
    pub fn retain_blocks(&mut self, ids: &[BlockId]) {
        self.entries.retain(|id, _| ids.contains(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{DEFAULT_BLOCK_SIZE, ExerciseParams};
    use kurbo::Point;
    use pollster::block_on;

    fn block_with(params: ExerciseParams) -> Block {
        let mut block = Block::new(1, ExerciseType::Matching, Point::ZERO, DEFAULT_BLOCK_SIZE);
        block.params = params;
        block
    }

    #[test]
    fn test_request_uses_default_amount() {
        let request = GenerationRequest::from_block(&block_with(ExerciseParams::default()), 6);
        assert_eq!(request.amount, 6);
        assert_eq!(request.exercise, ExerciseType::Matching);
    }

    #[test]
    fn test_request_quantity_override_and_clamped_rates() {
        let params = ExerciseParams {
            quantity: Some(3),
            vocab_rate: 4.0,
            theme: "travel".into(),
            ..ExerciseParams::default()
        };
        let request = GenerationRequest::from_block(&block_with(params), 6);
        assert_eq!(request.amount, 3);
        assert!((request.vocab_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(request.theme, "travel");
    }

    #[test]
    fn test_static_provider_synthesizes_items() {
        let provider = StaticContentProvider::new();
        let request = GenerationRequest::from_block(&block_with(ExerciseParams::default()), 4);
        let items = block_on(provider.generate(&request)).unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0]["type"], "matching");
    }

    #[test]
    fn test_static_provider_fixtures_truncate() {
        let provider = StaticContentProvider::new().with_items(ExerciseType::Matching, vec![json!(1), json!(2), json!(3)]);
        let request = GenerationRequest::from_block(&block_with(ExerciseParams::default()), 2);
        let items = block_on(provider.generate(&request)).unwrap();
        assert_eq!(items, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_failure_becomes_inline_state() {
        let provider = StaticContentProvider::failing("quota exceeded");
        let request = GenerationRequest::from_block(&block_with(ExerciseParams::default()), 2);
        let mut store = ContentStore::new();
        store.mark_pending(1);

        let content = store.resolve(1, block_on(provider.generate(&request)));
        assert!(content.is_failed());
        assert!(content.items().is_none());
        match store.get(1) {
            Some(GeneratedContent::Failed(message)) => assert!(message.contains("quota exceeded")),
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[test]
    fn test_store_retain_blocks() {
        let mut store = ContentStore::new();
        store.resolve(1, Ok(vec![]));
        store.resolve(2, Ok(vec![]));
        store.retain_blocks(&[2]);
        assert!(store.get(1).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_exact_match_checker() {
        let checker = ExactMatchChecker;
        let context = json!({ "answer": ["the cat", "a cat"] });

        let ok = block_on(checker.check(ExerciseType::Translation, &context, "  The   Cat ")).unwrap();
        assert!(ok.is_correct);

        let wrong = block_on(checker.check(ExerciseType::Translation, &context, "dog")).unwrap();
        assert!(!wrong.is_correct);
        assert_eq!(wrong.feedback, "Expected: the cat");

        let plain = block_on(checker.check(ExerciseType::FillInTheBlank, &json!("went"), "went")).unwrap();
        assert!(plain.is_correct);

        assert!(block_on(checker.check(ExerciseType::FillInTheBlank, &json!(42), "42")).is_err());
    }
}
