//! Buffer layout.
//!
//! One byte region is split into two arenas: node records grow upward from
//! offset 0 and strings grow downward from the end. The gap between the two
//! watermarks is free space, and the regions colliding is the only
//! out-of-space condition.
//!
//! ```text
//! 0          node_top            str_top          len
//! | nodes ... |       free        | ... strings    |
//! ```

use crate::node::{NODE_ALIGN, NODE_SIZE};

/// Largest usable region; offsets and lengths are 16-bit.
pub const MAX_REGION_BYTES: usize = u16::MAX as usize;

/// Byte storage a tree can live in.
pub trait Storage: AsRef<[u8]> + AsMut<[u8]> {}

impl<T: AsRef<[u8]> + AsMut<[u8]> + ?Sized> Storage for T {}

pub(crate) struct Arena<S> {
    storage: S,
    base: usize,
    len: usize,
    node_top: usize,
    str_top: usize,
}

impl<S: Storage> Arena<S> {
    /// Lays out `storage`. Returns an inert arena (zero length) when the
    /// aligned region cannot hold a single node record.
    pub(crate) fn new(storage: S) -> Self {
        let bytes = storage.as_ref();
        let total = bytes.len();
        let adjust = bytes.as_ptr().align_offset(NODE_ALIGN);
        if adjust >= total || total - adjust < NODE_SIZE {
            return Self::inert(storage);
        }
        let len = (total - adjust).min(MAX_REGION_BYTES);
        Self {
            storage,
            base: adjust,
            len,
            node_top: 0,
            str_top: len,
        }
    }

    fn inert(storage: S) -> Self {
        Self {
            storage,
            base: 0,
            len: 0,
            node_top: 0,
            str_top: 0,
        }
    }

    #[inline]
    pub(crate) fn is_inert(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn node_top(&self) -> usize {
        self.node_top
    }

    #[inline]
    pub(crate) fn str_top(&self) -> usize {
        self.str_top
    }

    pub(crate) fn free_bytes(&self) -> usize {
        self.str_top.saturating_sub(self.node_top)
    }

    pub(crate) fn region(&self) -> &[u8] {
        &self.storage.as_ref()[self.base..self.base + self.len]
    }

    pub(crate) fn region_mut(&mut self) -> &mut [u8] {
        let (base, len) = (self.base, self.len);
        &mut self.storage.as_mut()[base..base + len]
    }

    /// Reserves one node record and returns its byte offset.
    pub(crate) fn bump_node(&mut self) -> Option<usize> {
        let top = self.node_top + NODE_SIZE;
        if top > self.str_top {
            tracing::trace!(
                node_top = self.node_top,
                str_top = self.str_top,
                "node table exhausted"
            );
            return None;
        }
        let offset = self.node_top;
        self.node_top = top;
        Some(offset)
    }

    /// Reserves `len` bytes plus a terminator and returns the start offset.
    pub(crate) fn bump_string(&mut self, len: usize) -> Option<usize> {
        let bytes = len + 1;
        if bytes > self.free_bytes() {
            tracing::trace!(
                requested = bytes,
                free = self.free_bytes(),
                "string pool exhausted"
            );
            return None;
        }
        self.str_top -= bytes;
        Some(self.str_top)
    }

    pub(crate) fn truncate_nodes(&mut self, count: usize) {
        self.node_top = (count * NODE_SIZE).min(self.node_top);
    }

    pub(crate) fn reset_str_top(&mut self, top: usize) {
        self.str_top = top.clamp(self.node_top, self.len);
    }
}
