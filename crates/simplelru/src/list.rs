//! Ordering list for recency tracking
//!
//! Circular doubly-linked list threaded through an arena of nodes. Slot 0
//! is the root sentinel: `root.next` is the front (most recent) and
//! `root.prev` is the back (least recent). Links are arena indices, and
//! callers address nodes through generational [`Handle`]s so a handle to a
//! removed node is rejected instead of aliasing whatever reuses its slot.

use crate::error::{Error, Result};

/// Arena slot of the root sentinel
const ROOT: usize = 0;

/// Stable reference to a node in an [`OrderingList`]
///
/// Valid until the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u32,
}

/// Arena slot. `entry` is `None` for the sentinel and for free slots.
struct Node<T> {
    entry: Option<T>,
    prev: usize,
    next: usize,
    generation: u32,
}

impl<T> Node<T> {
    fn sentinel() -> Self {
        Self {
            entry: None,
            prev: ROOT,
            next: ROOT,
            generation: 0,
        }
    }
}

/// Doubly-linked recency ordering with O(1) push, move, remove and back
pub struct OrderingList<T> {
    nodes: Vec<Node<T>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> OrderingList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty list with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.saturating_add(1));
        nodes.push(Node::sentinel());

        Self {
            nodes,
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Insert `entry` right after the sentinel and return its handle
    pub fn push_front(&mut self, entry: T) -> Handle {
        let idx = self.alloc_node(entry);
        self.link_front(idx);
        self.len += 1;
        self.handle_at(idx)
    }

    /// Move a node to the front. No-op if it is already there.
    pub fn move_to_front(&mut self, handle: Handle) -> Result<()> {
        let idx = self.resolve(handle)?;
        if self.nodes[ROOT].next == idx {
            return Ok(());
        }

        self.unlink(idx);
        self.link_front(idx);
        Ok(())
    }

    /// Unlink a node and hand back its payload
    pub fn remove(&mut self, handle: Handle) -> Result<T> {
        let idx = self.resolve(handle)?;
        self.unlink(idx);
        self.len -= 1;

        let node = &mut self.nodes[idx];
        node.generation = node.generation.wrapping_add(1);
        node.prev = ROOT;
        node.next = ROOT;
        let entry = node.entry.take().ok_or(Error::InvalidHandle)?;
        self.free_list.push(idx);

        Ok(entry)
    }

    /// Remove the least recently used node, if any
    pub fn pop_back(&mut self) -> Result<Option<T>> {
        match self.back() {
            Some(handle) => self.remove(handle).map(Some),
            None => Ok(None),
        }
    }

    /// Handle of the least recently used node
    pub fn back(&self) -> Option<Handle> {
        self.boundary(self.nodes[ROOT].prev)
    }

    /// Handle of the most recently used node
    pub fn front(&self) -> Option<Handle> {
        self.boundary(self.nodes[ROOT].next)
    }

    /// Handle of the node one step closer to the front
    pub fn prev(&self, handle: Handle) -> Result<Option<Handle>> {
        let idx = self.resolve(handle)?;
        Ok(self.boundary(self.nodes[idx].prev))
    }

    /// Handle of the node one step closer to the back
    pub fn next(&self, handle: Handle) -> Result<Option<Handle>> {
        let idx = self.resolve(handle)?;
        Ok(self.boundary(self.nodes[idx].next))
    }

    /// Borrow the payload behind a handle
    pub fn get(&self, handle: Handle) -> Result<&T> {
        let idx = self.resolve(handle)?;
        self.nodes[idx].entry.as_ref().ok_or(Error::InvalidHandle)
    }

    /// Mutably borrow the payload behind a handle. Position is unchanged.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T> {
        let idx = self.resolve(handle)?;
        self.nodes[idx].entry.as_mut().ok_or(Error::InvalidHandle)
    }

    /// Number of linked nodes (sentinel excluded)
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every node. Outstanding handles become invalid.
    pub fn clear(&mut self) {
        self.free_list.clear();
        for (idx, node) in self.nodes.iter_mut().enumerate().skip(1) {
            if node.entry.take().is_some() {
                node.generation = node.generation.wrapping_add(1);
            }
            node.prev = ROOT;
            node.next = ROOT;
            self.free_list.push(idx);
        }

        self.nodes[ROOT] = Node::sentinel();
        self.len = 0;
    }

    /// Iterate payloads from front (most recent) to back (least recent).
    ///
    /// Use `.rev()` for back-to-front.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            front: self.nodes[ROOT].next,
            back: self.nodes[ROOT].prev,
            remaining: self.len,
        }
    }

    fn resolve(&self, handle: Handle) -> Result<usize> {
        match self.nodes.get(handle.index) {
            Some(node)
                if handle.index != ROOT
                    && node.generation == handle.generation
                    && node.entry.is_some() =>
            {
                Ok(handle.index)
            }
            _ => Err(Error::InvalidHandle),
        }
    }

    fn boundary(&self, idx: usize) -> Option<Handle> {
        if idx == ROOT {
            None
        } else {
            Some(self.handle_at(idx))
        }
    }

    fn handle_at(&self, idx: usize) -> Handle {
        Handle {
            index: idx,
            generation: self.nodes[idx].generation,
        }
    }

    fn link_front(&mut self, idx: usize) {
        let first = self.nodes[ROOT].next;

        let node = &mut self.nodes[idx];
        node.prev = ROOT;
        node.next = first;

        self.nodes[first].prev = idx;
        self.nodes[ROOT].next = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = &self.nodes[idx];
            (node.prev, node.next)
        };

        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }

    fn alloc_node(&mut self, entry: T) -> usize {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx].entry = Some(entry);
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(Node {
                entry: Some(entry),
                prev: ROOT,
                next: ROOT,
                generation: 0,
            });
            idx
        }
    }

    /// Walk both directions and check `n.prev.next == n` and `n.next.prev == n`
    #[cfg(test)]
    pub(crate) fn assert_links(&self) {
        let mut count = 0;
        let mut idx = self.nodes[ROOT].next;
        while idx != ROOT {
            let node = &self.nodes[idx];
            assert!(node.entry.is_some(), "linked node {idx} has no entry");
            assert_eq!(self.nodes[node.prev].next, idx);
            assert_eq!(self.nodes[node.next].prev, idx);
            count += 1;
            idx = node.next;
        }
        assert_eq!(count, self.len);
    }
}

impl<T> Default for OrderingList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowing iterator over an [`OrderingList`]
pub struct Iter<'a, T> {
    list: &'a OrderingList<T>,
    front: usize,
    back: usize,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let list = self.list;
        let node = &list.nodes[self.front];
        self.front = node.next;
        self.remaining -= 1;
        node.entry.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let list = self.list;
        let node = &list.nodes[self.back];
        self.back = node.prev;
        self.remaining -= 1;
        node.entry.as_ref()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
