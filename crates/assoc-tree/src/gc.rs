//! Mark-compact collection.
//!
//! Runs only when asked. Reachable live nodes are marked with a stackless
//! walk over the link fields, survivors slide down to fill reclaimed slots,
//! and the strings they still reference are packed against the end of the
//! region. The tree revision is bumped once per run.

use crate::arena::Storage;
use crate::node::{Link, NodeId, SlotField, StringSlot};
use crate::tree::Tree;

/// Counters describing one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub reclaimed_nodes: usize,
    pub live_nodes: usize,
    pub reclaimed_string_bytes: usize,
    pub string_bytes: usize,
    pub free_bytes: usize,
    pub revision: u32,
}

impl<S: Storage> Tree<S> {
    /// Reclaims tombstoned and unreachable nodes and defragments the string
    /// pool. Every cursor attached before the call becomes stale.
    pub fn gc(&mut self) -> GcReport {
        if !self.is_valid() {
            return GcReport::default();
        }
        let nodes_before = self.arena.node_count();
        let strings_before = self.arena.capacity() - self.arena.str_top();

        self.mark();
        let live_nodes = self.compact_nodes();
        let string_bytes = self.compact_strings();
        self.revision = self.revision.checked_add(1).unwrap_or(1);

        let report = GcReport {
            reclaimed_nodes: nodes_before - live_nodes,
            live_nodes,
            reclaimed_string_bytes: strings_before.saturating_sub(string_bytes),
            string_bytes,
            free_bytes: self.arena.free_bytes(),
            revision: self.revision,
        };
        tracing::debug!(
            reclaimed_nodes = report.reclaimed_nodes,
            live_nodes = report.live_nodes,
            string_bytes = report.string_bytes,
            free_bytes = report.free_bytes,
            revision = report.revision,
            "collection finished"
        );
        report
    }

    fn mark(&mut self) {
        let arena = &mut self.arena;
        for index in 0..arena.node_count() {
            arena.set_mark(index, false);
        }
        let root = NodeId::ROOT.index();
        if !arena.is_live(root) {
            return;
        }
        arena.set_mark(root, true);

        // Pre-order: descend through first children, then continue with the
        // next sibling, climbing through parents when a chain ends.
        let mut current = root;
        'walk: loop {
            if arena.is_live(current) {
                if let Some(child) = arena.link(current, Link::FirstChild) {
                    if arena.is_live(child) {
                        arena.set_mark(child, true);
                    }
                    current = child;
                    continue;
                }
            }
            loop {
                if current == root {
                    break 'walk;
                }
                if let Some(sibling) = arena.link(current, Link::NextSibling) {
                    if arena.is_live(sibling) {
                        arena.set_mark(sibling, true);
                    }
                    current = sibling;
                    break;
                }
                match arena.link(current, Link::Parent) {
                    Some(parent) => current = parent,
                    None => break 'walk,
                }
            }
        }
    }

    /// Slides marked live records down over reclaimed slots and returns the
    /// surviving count.
    fn compact_nodes(&mut self) -> usize {
        let arena = &mut self.arena;
        let count = arena.node_count();
        let mut write = 0;
        for read in 0..count {
            if !(arena.is_live(read) && arena.is_marked(read)) {
                continue;
            }
            arena.set_mark(read, false);
            if read != write {
                arena.move_record(read, write);
                let (from, to) = (read as u16, write as u16);
                for index in 0..count {
                    for link in Link::ALL {
                        if arena.raw_link(index, link) == from {
                            arena.set_raw_link(index, link, to);
                        }
                    }
                }
            }
            write += 1;
        }
        arena.truncate_nodes(write);
        write
    }

    /// Packs every referenced string against the end of the region and
    /// returns the bytes now in use.
    ///
    /// Strings are moved in descending offset order, so each destination
    /// lies at or above its source and no move overwrites an unmoved string.
    fn compact_strings(&mut self) -> usize {
        let arena = &mut self.arena;
        let count = arena.node_count();
        const FIELDS: [SlotField; 2] = [SlotField::Key, SlotField::Value];

        for index in 0..count {
            for field in FIELDS {
                if let Some(slot) = arena.string_slot(index, field) {
                    if !arena.is_readable(slot) {
                        arena.set_string_slot(index, field, None);
                    }
                }
            }
        }

        let capacity = arena.capacity();
        let mut top = capacity;
        let mut bound = capacity;
        loop {
            let mut next: Option<(usize, usize)> = None;
            for index in 0..count {
                for field in FIELDS {
                    let Some(slot) = arena.string_slot(index, field) else {
                        continue;
                    };
                    let offset = slot.offset();
                    if offset < bound && next.map_or(true, |(best, _)| offset > best) {
                        next = Some((offset, slot.len()));
                    }
                }
            }
            let Some((offset, len)) = next else {
                break;
            };
            let dest = top - (len + 1);
            arena
                .region_mut()
                .copy_within(offset..offset + len + 1, dest);
            for index in 0..count {
                for field in FIELDS {
                    match arena.string_slot(index, field) {
                        Some(slot) if slot.offset() == offset => {
                            let moved = StringSlot::new(dest as u16, slot.len() as u16);
                            arena.set_string_slot(index, field, Some(moved));
                        }
                        _ => {}
                    }
                }
            }
            top = dest;
            bound = offset;
        }
        arena.reset_str_top(top);
        capacity - top
    }
}
