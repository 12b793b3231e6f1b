//! Exercise blocks placed on the whiteboard.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a block. Assigned monotonically by the board.
pub type BlockId = u64;

/// Minimum block width in world units.
pub const MIN_BLOCK_WIDTH: f64 = 350.0;
/// Minimum block height in world units.
pub const MIN_BLOCK_HEIGHT: f64 = 150.0;

/// Default size for a freshly created block.
pub const DEFAULT_BLOCK_SIZE: Size = Size::new(400.0, 300.0);

/// Clamp a size to the minimum block bounds.
///
/// Non-finite components collapse to the minimum.
pub fn clamp_size(width: f64, height: f64) -> Size {
    let width = if width.is_finite() { width.max(MIN_BLOCK_WIDTH) } else { MIN_BLOCK_WIDTH };
    let height = if height.is_finite() { height.max(MIN_BLOCK_HEIGHT) } else { MIN_BLOCK_HEIGHT };
    Size::new(width, height)
}

/// The kind of exercise a block generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseType {
    FillInTheBlank,
    MultipleChoice,
    Matching,
    SentenceOrdering,
    Translation,
    TrueFalse,
    Listening,
    Conversation,
}

impl ExerciseType {
    /// All exercise types, in palette order.
    pub const ALL: [ExerciseType; 8] = [
        ExerciseType::FillInTheBlank,
        ExerciseType::MultipleChoice,
        ExerciseType::Matching,
        ExerciseType::SentenceOrdering,
        ExerciseType::Translation,
        ExerciseType::TrueFalse,
        ExerciseType::Listening,
        ExerciseType::Conversation,
    ];

    /// Drag-and-drop token for this type.
    pub fn token(self) -> &'static str {
        match self {
            ExerciseType::FillInTheBlank => "fill-in-the-blank",
            ExerciseType::MultipleChoice => "multiple-choice",
            ExerciseType::Matching => "matching",
            ExerciseType::SentenceOrdering => "sentence-ordering",
            ExerciseType::Translation => "translation",
            ExerciseType::TrueFalse => "true-false",
            ExerciseType::Listening => "listening",
            ExerciseType::Conversation => "conversation",
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Error returned when a drag token does not name an exercise type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown exercise type: {0}")]
pub struct UnknownExerciseType(pub String);

impl FromStr for ExerciseType {
    type Err = UnknownExerciseType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        ExerciseType::ALL
            .into_iter()
            .find(|kind| kind.token().eq_ignore_ascii_case(token))
            .ok_or_else(|| UnknownExerciseType(token.to_string()))
    }
}

/// Learner level the content is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

/// Register of the generated sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Neutral,
    Casual,
    Formal,
    Playful,
}

/// Parameters sent to the content provider when a block is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExerciseParams {
    pub difficulty: Difficulty,
    pub tone: Tone,
    pub theme: String,
    pub focus_vocabulary: Vec<String>,
    /// Share of items that should use the focus vocabulary (0..=1).
    pub vocab_rate: f64,
    pub focus_grammar: Vec<String>,
    /// Share of items that should exercise the focus grammar (0..=1).
    pub grammar_rate: f64,
    /// Manual item count; `None` uses the exercise type's default.
    pub quantity: Option<u32>,
}

impl Default for ExerciseParams {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            tone: Tone::default(),
            theme: String::new(),
            focus_vocabulary: Vec::new(),
            vocab_rate: 0.5,
            focus_grammar: Vec::new(),
            grammar_rate: 0.5,
            quantity: None,
        }
    }
}

impl ExerciseParams {
    /// Return a copy with rates clamped to `[0, 1]`.
    pub fn normalized(mut self) -> Self {
        self.vocab_rate = clamp_rate(self.vocab_rate);
        self.grammar_rate = clamp_rate(self.grammar_rate);
        self
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 }
}

/// A placed exercise instance.
///
/// Generated content is not stored here. It is owned by the block's view
/// state (see [`crate::content::ContentStore`]) and can always be regenerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub z_index: i64,
    #[serde(rename = "type")]
    pub exercise: ExerciseType,
    #[serde(flatten)]
    pub params: ExerciseParams,
    #[serde(default)]
    pub is_generated: bool,
}

impl Block {
    /// Create a block with default parameters; size is clamped to the minimum.
    pub fn new(id: BlockId, exercise: ExerciseType, origin: Point, size: Size) -> Self {
        let size = clamp_size(size.width, size.height);
        Self {
            id,
            x: origin.x,
            y: origin.y,
            width: size.width,
            height: size.height,
            z_index: 0,
            exercise,
            params: ExerciseParams::default(),
            is_generated: false,
        }
    }

    /// Top-left corner in world coordinates.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// World-space bounds.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.origin(), self.size())
    }

    /// Apply new geometry, enforcing the minimum size.
    pub fn set_geometry(&mut self, rect: Rect) {
        let size = clamp_size(rect.width(), rect.height());
        self.x = rect.x0;
        self.y = rect.y0;
        self.width = size.width;
        self.height = size.height;
    }

    /// Check if a world point lies inside the block (inclusive).
    pub fn contains(&self, point: Point) -> bool {
        let b = self.bounds();
        point.x >= b.x0 && point.x <= b.x1 && point.y >= b.y0 && point.y <= b.y1
    }

    /// Repair geometry that violates the block invariants (e.g. after loading).
    pub(crate) fn sanitize(&mut self) {
        if !self.x.is_finite() {
            self.x = 0.0;
        }
        if !self.y.is_finite() {
            self.y = 0.0;
        }
        let size = clamp_size(self.width, self.height);
        self.width = size.width;
        self.height = size.height;
        self.params = std::mem::take(&mut self.params).normalized();
    }
}
