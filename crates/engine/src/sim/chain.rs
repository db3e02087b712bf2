//! Transient per-step list of entities carried by a mover.
//!
//! Nodes live in a [`ChainArena`] owned by the move-chain system. A
//! [`MoveChain`] borrows the arena for the duration of one mover step and hands
//! every node back when it is destroyed or dropped, so a chain can never be
//! read after release and a partially built chain releases exactly what it
//! allocated.

use std::collections::HashSet;

use thiserror::Error;

use super::entity::EntityId;

pub const DEFAULT_CHAIN_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain node pool exhausted at {capacity} nodes")]
    Exhausted { capacity: usize },
}

/// One node of the chain: the carried entity and a link to the next node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedElement {
    pub index: EntityId,
    next: Option<usize>,
}

impl LinkedElement {
    pub fn next(&self) -> Option<usize> {
        self.next
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    pub allocated: u64,
    pub released: u64,
}

impl ArenaStats {
    pub fn live_nodes(&self) -> u64 {
        self.allocated.saturating_sub(self.released)
    }
}

#[derive(Debug)]
pub struct ChainArena {
    nodes: Vec<LinkedElement>,
    visited: HashSet<EntityId>,
    capacity: usize,
    stats: ArenaStats,
}

impl Default for ChainArena {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHAIN_CAPACITY)
    }
}

impl ChainArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            visited: HashSet::new(),
            capacity,
            stats: ArenaStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn stats(&self) -> ArenaStats {
        self.stats
    }

    /// Starts a new empty chain. The arena is unusable until the chain is
    /// released.
    pub fn acquire(&mut self) -> MoveChain<'_> {
        debug_assert!(self.nodes.is_empty(), "previous chain was not released");
        MoveChain {
            arena: self,
            head: None,
            released: false,
        }
    }

    fn release_all(&mut self) -> usize {
        let count = self.nodes.len();
        self.stats.released = self.stats.released.saturating_add(count as u64);
        self.nodes.clear();
        self.visited.clear();
        count
    }
}

#[derive(Debug)]
pub struct MoveChain<'a> {
    arena: &'a mut ChainArena,
    head: Option<usize>,
    released: bool,
}

impl MoveChain<'_> {
    /// Prepends `index` unless it is already a member. Returns whether a node
    /// was created.
    pub fn prepend(&mut self, index: EntityId) -> Result<bool, ChainError> {
        if self.arena.visited.contains(&index) {
            return Ok(false);
        }
        if self.arena.nodes.len() >= self.arena.capacity {
            return Err(ChainError::Exhausted {
                capacity: self.arena.capacity,
            });
        }

        let slot = self.arena.nodes.len();
        self.arena.nodes.push(LinkedElement {
            index,
            next: self.head,
        });
        self.arena.visited.insert(index);
        self.arena.stats.allocated = self.arena.stats.allocated.saturating_add(1);
        self.head = Some(slot);
        Ok(true)
    }

    pub fn contains(&self, index: EntityId) -> bool {
        self.arena.visited.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.arena.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.nodes.is_empty()
    }

    pub fn head(&self) -> Option<&LinkedElement> {
        self.head.and_then(|slot| self.arena.nodes.get(slot))
    }

    /// Walks the links from the head, newest member first.
    pub fn iter(&self) -> LinkIter<'_> {
        LinkIter {
            nodes: &self.arena.nodes,
            cursor: self.head,
        }
    }

    /// Members in the order they were discovered.
    pub fn discovery_order(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.arena.nodes.iter().map(|node| node.index)
    }

    /// Releases every node and returns how many were freed. Dropping the chain
    /// has the same effect.
    pub fn destroy(mut self) -> usize {
        self.release()
    }

    fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        self.released = true;
        self.head = None;
        self.arena.release_all()
    }
}

impl Drop for MoveChain<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct LinkIter<'a> {
    nodes: &'a [LinkedElement],
    cursor: Option<usize>,
}

impl<'a> Iterator for LinkIter<'a> {
    type Item = &'a LinkedElement;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.get(self.cursor?)?;
        self.cursor = node.next;
        Some(node)
    }
}
