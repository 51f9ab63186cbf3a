//! Transposition table keyed by board contents, remaining depth and node kind.

use super::{NodeKind, SearchResult};
use std::collections::HashMap;
use tiles_core::model::board::Board;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    board: Board,
    remaining_depth: u32,
    kind: NodeKind,
}

impl NodeKey {
    pub fn new(board: Board, remaining_depth: u32, kind: NodeKind) -> Self {
        Self {
            board,
            remaining_depth,
            kind,
        }
    }
}

/// Memoised search results. Entries stay valid for as long as the owner keeps
/// the same weights, so the engine clears the table whenever a game starts.
#[derive(Debug, Default)]
pub struct TranspositionTable {
    entries: HashMap<NodeKey, SearchResult>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &NodeKey) -> Option<SearchResult> {
        self.entries.get(key).copied()
    }

    pub fn insert(&mut self, key: NodeKey, result: SearchResult) {
        self.entries.insert(key, result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}
