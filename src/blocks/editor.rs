use std::fmt;
use std::fmt::{Display, Formatter};

use chrono::Utc;

use crate::blocks::{BlockId, BlockType, ContentBlock};

pub type ChangeListener = Box<dyn FnMut(&[ContentBlock]) + Send>;
type Clock = Box<dyn Fn() -> i64 + Send>;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorError {
    IndexOutOfRange { index: usize, len: usize },
    DuplicateId(BlockId),
    UnknownBlockType(String),
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::IndexOutOfRange { index, len } => {
                write!(f, "Block index {} is out of range (sequence has {} blocks)", index, len)
            }
            EditorError::DuplicateId(id) => write!(f, "Another block already uses the id {}", id),
            EditorError::UnknownBlockType(type_name) => write!(f, "Unknown block type '{}'", type_name),
        }
    }
}

impl std::error::Error for EditorError {}

/// Owns the ordered block sequence of one post draft.
///
/// Every mutation builds the next sequence and swaps it in whole, then hands the
/// complete sequence to the change listener, if any.
pub struct BlockEditor {
    blocks: Vec<ContentBlock>,
    clock: Clock,
    on_change: Option<ChangeListener>,
}

impl BlockEditor {
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        BlockEditor {
            blocks,
            clock: Box::new(|| Utc::now().timestamp_millis()),
            on_change: None,
        }
    }

    #[cfg(test)]
    pub fn with_clock(blocks: Vec<ContentBlock>, clock: Clock) -> Self {
        BlockEditor {
            blocks,
            clock,
            on_change: None,
        }
    }

    pub fn set_listener(&mut self, listener: ChangeListener) {
        self.on_change = Some(listener);
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn get(&self, index: usize) -> Option<&ContentBlock> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Appends a block of `block_type` with its default payload and returns its id.
    pub fn add_block(&mut self, block_type: BlockType) -> BlockId {
        let id = self.next_id();
        let mut blocks = self.blocks.clone();
        blocks.push(ContentBlock::new(id.clone(), block_type.default_kind()));
        self.replace(blocks);
        id
    }

    pub fn add_block_named(&mut self, type_name: &str) -> Result<BlockId, EditorError> {
        let block_type = type_name
            .parse::<BlockType>()
            .map_err(|e| EditorError::UnknownBlockType(e.0))?;
        Ok(self.add_block(block_type))
    }

    pub fn update_block(&mut self, index: usize, block: ContentBlock) -> Result<(), EditorError> {
        self.check_index(index)?;
        let clash = self.blocks.iter()
            .enumerate()
            .any(|(i, other)| i != index && other.id == block.id);
        if clash {
            return Err(EditorError::DuplicateId(block.id));
        }

        let mut blocks = self.blocks.clone();
        blocks[index] = block;
        self.replace(blocks);
        Ok(())
    }

    pub fn remove_block(&mut self, index: usize) -> Result<ContentBlock, EditorError> {
        self.check_index(index)?;
        let mut blocks = self.blocks.clone();
        let removed = blocks.remove(index);
        self.replace(blocks);
        Ok(removed)
    }

    /// Takes the block at `from` out of the sequence and reinserts it at `to`.
    pub fn move_block(&mut self, from: usize, to: usize) -> Result<(), EditorError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let mut blocks = self.blocks.clone();
        let block = blocks.remove(from);
        blocks.insert(to, block);
        self.replace(blocks);
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), EditorError> {
        if index >= self.blocks.len() {
            return Err(EditorError::IndexOutOfRange { index, len: self.blocks.len() });
        }
        Ok(())
    }

    fn next_id(&self) -> BlockId {
        let mut candidate = (self.clock)();
        loop {
            let id = candidate.to_string();
            if !self.blocks.iter().any(|b| b.id.0 == id) {
                return BlockId(id);
            }
            candidate += 1;
        }
    }

    fn replace(&mut self, blocks: Vec<ContentBlock>) {
        self.blocks = blocks;
        if let Some(ref mut listener) = self.on_change {
            listener(&self.blocks);
        }
    }
}
