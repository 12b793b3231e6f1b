//! Exercise type registry.
//!
//! Each exercise type maps to one [`ExerciseRenderer`]. Adding a type means
//! registering one more renderer; nothing else dispatches on the type.

use crate::block::{ExerciseType, MIN_BLOCK_HEIGHT, MIN_BLOCK_WIDTH, clamp_size};
use crate::content::ItemList;
use kurbo::Size;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Item count requested when neither block nor renderer says otherwise.
pub const FALLBACK_QUANTITY: u32 = 5;

/// Height of a block's title bar.
const HEADER_HEIGHT: f64 = 56.0;
/// Height of one rendered item line.
const LINE_HEIGHT: f64 = 28.0;
/// Vertical padding below the last line.
const BODY_PADDING: f64 = 24.0;

/// Generated content that a renderer cannot display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No items were generated")]
    Empty,
    #[error("Item {index} is not an object")]
    NotAnObject { index: usize },
    #[error("Item {index} has none of the fields {fields:?}")]
    MissingField { index: usize, fields: Vec<String> },
}

/// Static facts about an exercise type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseDescriptor {
    pub exercise: ExerciseType,
    pub label: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub default_quantity: u32,
}

/// Text layout of a block's content.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedExercise {
    pub lines: Vec<String>,
    /// Size the block needs to show every line, never below the minimum.
    pub preferred_size: Size,
}

/// Renderer for one exercise type.
pub trait ExerciseRenderer: Send + Sync {
    fn describe(&self) -> &ExerciseDescriptor;

    /// Check that generated items can be displayed.
    fn validate(&self, items: &ItemList) -> Result<(), ValidationError>;

    /// Lay out items for a block `width` wide.
    fn render(&self, items: &ItemList, width: f64) -> RenderedExercise;
}

/// Renderer showing one text field per item.
///
/// An item qualifies if it carries any of `text_fields` as a string; the
/// first one present becomes its line.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    descriptor: ExerciseDescriptor,
    text_fields: &'static [&'static str],
}

impl TextRenderer {
    pub fn new(descriptor: ExerciseDescriptor, text_fields: &'static [&'static str]) -> Self {
        Self { descriptor, text_fields }
    }

    fn line_for(&self, item: &Value) -> Option<String> {
        self.text_fields
            .iter()
            .find_map(|field| item.get(*field).and_then(Value::as_str))
            .map(str::to_string)
    }
}

impl ExerciseRenderer for TextRenderer {
    fn describe(&self) -> &ExerciseDescriptor {
        &self.descriptor
    }

    fn validate(&self, items: &ItemList) -> Result<(), ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::Empty);
        }
        for (index, item) in items.iter().enumerate() {
            if !item.is_object() {
                return Err(ValidationError::NotAnObject { index });
            }
            if self.line_for(item).is_none() {
                return Err(ValidationError::MissingField {
                    index,
                    fields: self.text_fields.iter().map(|f| f.to_string()).collect(),
                });
            }
        }
        Ok(())
    }

    fn render(&self, items: &ItemList, width: f64) -> RenderedExercise {
        let lines: Vec<String> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.line_for(item).map(|text| format!("{}. {}", i + 1, text)))
            .collect();
        let height = HEADER_HEIGHT + lines.len() as f64 * LINE_HEIGHT + BODY_PADDING;
        RenderedExercise {
            preferred_size: clamp_size(width.max(MIN_BLOCK_WIDTH), height.max(MIN_BLOCK_HEIGHT)),
            lines,
        }
    }
}

fn default_renderer(exercise: ExerciseType) -> TextRenderer {
    let (label, description, icon, default_quantity, fields): (&str, &str, &str, u32, &'static [&'static str]) = match exercise {
        ExerciseType::FillInTheBlank => (
            "Fill in the Blank",
            "Complete sentences with the missing word",
            "✏️",
            5,
            &["sentence", "prompt"][..],
        ),
        ExerciseType::MultipleChoice => (
            "Multiple Choice",
            "Pick the right answer from several options",
            "🔘",
            5,
            &["question", "prompt"][..],
        ),
        ExerciseType::Matching => ("Matching", "Pair words with their meanings", "🔗", 6, &["term", "left", "prompt"][..]),
        ExerciseType::SentenceOrdering => (
            "Sentence Ordering",
            "Put the words back in order",
            "🔀",
            4,
            &["sentence", "prompt"][..],
        ),
        ExerciseType::Translation => ("Translation", "Translate short sentences", "🌐", 5, &["source", "prompt"][..]),
        ExerciseType::TrueFalse => ("True or False", "Decide whether statements hold", "✅", 6, &["statement", "prompt"][..]),
        ExerciseType::Listening => ("Listening", "Answer questions about a recording", "🎧", 3, &["transcript", "prompt"][..]),
        ExerciseType::Conversation => ("Conversation", "Role-play a short dialogue", "💬", 4, &["line", "prompt"][..]),
    };
    TextRenderer::new(
        ExerciseDescriptor {
            exercise,
            label,
            description,
            icon,
            default_quantity,
        },
        fields,
    )
}

/// Map from exercise type to its renderer.
#[derive(Default)]
pub struct ExerciseRegistry {
    renderers: BTreeMap<ExerciseType, Box<dyn ExerciseRenderer>>,
}

impl std::fmt::Debug for ExerciseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExerciseRegistry")
            .field("types", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExerciseRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a text renderer for every built-in exercise type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for exercise in ExerciseType::ALL {
            registry.register(Box::new(default_renderer(exercise)));
        }
        registry
    }

    /// Register a renderer, replacing any previous one for the same type.
    pub fn register(&mut self, renderer: Box<dyn ExerciseRenderer>) {
        let exercise = renderer.describe().exercise;
        self.renderers.insert(exercise, renderer);
    }

    pub fn get(&self, exercise: ExerciseType) -> Option<&dyn ExerciseRenderer> {
        self.renderers.get(&exercise).map(|r| r.as_ref())
    }

    /// Descriptors in palette order.
    pub fn descriptors(&self) -> Vec<&ExerciseDescriptor> {
        self.renderers.values().map(|r| r.describe()).collect()
    }

    pub fn default_quantity(&self, exercise: ExerciseType) -> u32 {
        self.get(exercise)
            .map(|r| r.describe().default_quantity)
            .unwrap_or(FALLBACK_QUANTITY)
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}
