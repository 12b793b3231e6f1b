//! Board document: the persisted, flat list of exercise blocks.

use crate::block::{Block, BlockId, ExerciseParams, ExerciseType, clamp_size};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

fn new_document_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_name() -> String {
    "Untitled".to_string()
}

/// A page of the older page-based layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// Flatten a page-based layout into a single block list.
///
/// Pages are concatenated in order and block fields are kept as-is, except
/// that generated content is marked stale.
pub fn migrate_pages(pages: Vec<LegacyPage>) -> Vec<Block> {
    pages
        .into_iter()
        .flat_map(|page| page.blocks)
        .map(|mut block| {
            block.is_generated = false;
            block
        })
        .collect()
}

/// Shapes a persisted board may come in, newest first.
#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedBoard {
    Document(BoardDocument),
    Blocks(Vec<Block>),
    PagedDocument { pages: Vec<LegacyPage> },
    Pages(Vec<LegacyPage>),
}

/// A board containing all blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDocument {
    /// Unique document identifier.
    #[serde(default = "new_document_id")]
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
    /// Blocks in creation order. Stacking order is given by `z_index`.
    pub blocks: Vec<Block>,
    /// Next id to hand out.
    #[serde(default)]
    next_id: BlockId,
}

impl Default for BoardDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardDocument {
    /// Create a new empty board.
    pub fn new() -> Self {
        Self {
            id: new_document_id(),
            name: default_name(),
            blocks: Vec::new(),
            next_id: 1,
        }
    }

    /// Create a board from an existing block list, repairing ids and geometry.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut doc = Self::new();
        doc.blocks = blocks;
        doc.normalize();
        doc
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.get(id).is_some()
    }

    /// Highest z-index on the board (0 when empty).
    pub fn top_z(&self) -> i64 {
        self.blocks.iter().map(|b| b.z_index).max().unwrap_or(0)
    }

    fn allocate_id(&mut self) -> BlockId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    /// Add a block at `origin` on top of everything else.
    pub fn add_block(&mut self, exercise: ExerciseType, origin: Point, size: Size) -> BlockId {
        let id = self.allocate_id();
        let mut block = Block::new(id, exercise, origin, size);
        block.z_index = self.top_z() + 1;
        self.blocks.push(block);
        id
    }

    /// Insert an existing block, e.g. from an import. A colliding id is replaced.
    pub fn insert_block(&mut self, mut block: Block) -> BlockId {
        if block.id == 0 || self.contains(block.id) {
            block.id = self.allocate_id();
        } else {
            self.next_id = self.next_id.max(block.id + 1);
        }
        block.sanitize();
        let id = block.id;
        self.blocks.push(block);
        id
    }

    /// Commit new geometry for a block. Returns `false` for unknown ids.
    pub fn update_geometry(&mut self, id: BlockId, rect: Rect) -> bool {
        match self.get_mut(id) {
            Some(block) => {
                block.set_geometry(rect);
                true
            }
            None => {
                log::warn!("update_geometry: no block {}", id);
                false
            }
        }
    }

    /// Replace the generation parameters of a block.
    ///
    /// Existing content no longer matches the parameters, so the block is
    /// marked as not generated.
    pub fn update_params(&mut self, id: BlockId, params: ExerciseParams) -> bool {
        match self.get_mut(id) {
            Some(block) => {
                block.params = params.normalized();
                block.is_generated = false;
                true
            }
            None => {
                log::warn!("update_params: no block {}", id);
                false
            }
        }
    }

    pub fn set_generated(&mut self, id: BlockId, generated: bool) -> bool {
        match self.get_mut(id) {
            Some(block) => {
                block.is_generated = generated;
                true
            }
            None => false,
        }
    }

    /// Remove a block from the board.
    pub fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        let pos = self.blocks.iter().position(|b| b.id == id)?;
        Some(self.blocks.remove(pos))
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Bring a block above all others.
    ///
    /// Rescans every block for the current maximum. Returns `false` if the
    /// block is unknown or already the only block at the top.
    pub fn bring_to_front(&mut self, id: BlockId) -> bool {
        let Some(current) = self.get(id).map(|b| b.z_index) else {
            return false;
        };
        let top = self.top_z();
        let shared = self.blocks.iter().any(|b| b.id != id && b.z_index == top);
        if current == top && !shared {
            return false;
        }
        if let Some(block) = self.get_mut(id) {
            block.z_index = top + 1;
        }
        true
    }

    /// Blocks back to front.
    pub fn blocks_ordered(&self) -> Vec<&Block> {
        let mut ordered: Vec<&Block> = self.blocks.iter().collect();
        ordered.sort_by_key(|b| b.z_index);
        ordered
    }

    /// Find blocks at a world point, front to back.
    pub fn blocks_at_point(&self, point: Point) -> Vec<BlockId> {
        self.blocks_ordered()
            .into_iter()
            .rev()
            .filter(|b| b.contains(point))
            .map(|b| b.id)
            .collect()
    }

    /// Top-most block at a world point.
    pub fn top_block_at(&self, point: Point) -> Option<BlockId> {
        self.blocks_at_point(point).into_iter().next()
    }

    /// Get the bounding box of all blocks.
    pub fn bounds(&self) -> Option<Rect> {
        self.blocks
            .iter()
            .map(Block::bounds)
            .reduce(|acc, r| acc.union(r))
    }

    /// Fix up a freshly loaded board: geometry, duplicate ids and the id counter.
    fn normalize(&mut self) {
        let mut seen = HashSet::with_capacity(self.blocks.len());
        let max_id = self.blocks.iter().map(|b| b.id).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1).max(1);

        let mut reassigned = 0usize;
        for i in 0..self.blocks.len() {
            self.blocks[i].sanitize();
            let id = self.blocks[i].id;
            if id == 0 || !seen.insert(id) {
                let fresh = self.next_id;
                self.next_id += 1;
                self.blocks[i].id = fresh;
                seen.insert(fresh);
                reassigned += 1;
            }
        }
        if reassigned > 0 {
            log::warn!("Reassigned {} duplicate block ids", reassigned);
        }
    }

    /// Serialize the board to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a board from JSON.
    ///
    /// Accepts the current document format, a bare block array, and the
    /// older page-based layout (migrated with [`migrate_pages`]).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut doc = match serde_json::from_str::<PersistedBoard>(json)? {
            PersistedBoard::Document(doc) => doc,
            PersistedBoard::Blocks(blocks) => Self {
                blocks,
                ..Self::new()
            },
            PersistedBoard::PagedDocument { pages } | PersistedBoard::Pages(pages) => {
                log::info!("Migrating {} legacy pages", pages.len());
                Self {
                    blocks: migrate_pages(pages),
                    ..Self::new()
                }
            }
        };
        doc.normalize();
        Ok(doc)
    }

    /// Like [`from_json`](Self::from_json), but corrupt input yields an empty board.
    pub fn from_json_or_empty(json: &str) -> Self {
        Self::from_json(json).unwrap_or_else(|e| {
            log::warn!("Discarding unreadable board: {}", e);
            Self::new()
        })
    }
}

/// Clamp a requested size for a new block, falling back to the default size.
pub fn requested_size(size: Option<Size>) -> Size {
    let size = size.unwrap_or(crate::block::DEFAULT_BLOCK_SIZE);
    clamp_size(size.width, size.height)
}
