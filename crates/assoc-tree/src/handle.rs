//! Borrowed chaining handle over a mutable tree.

use crate::arena::Storage;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::iter::Children;
use crate::node::NodeType;
use crate::path::Step;
use crate::tree::Tree;
use crate::value::{FromValue, Scalar, Value};

/// A cursor paired with the tree it addresses, so paths read left to right:
///
/// ```
/// # use assoc_tree::Tree;
/// let mut tree = Tree::with_capacity(256);
/// tree.at("a").at(2).set(5);
/// assert_eq!(tree.at("a").at(2).get(0), 5);
/// assert_eq!(tree.at("a").size(), 3);
/// ```
pub struct NodeMut<'t, S> {
    tree: &'t mut Tree<S>,
    cursor: Cursor,
}

impl<S: Storage> Tree<S> {
    /// Handle for `step` below the root.
    pub fn at<'s>(&mut self, step: impl Into<Step<'s>>) -> NodeMut<'_, S> {
        let cursor = self.cursor().at(step);
        NodeMut { tree: self, cursor }
    }

    pub fn root_mut(&mut self) -> NodeMut<'_, S> {
        let cursor = self.cursor();
        NodeMut { tree: self, cursor }
    }

    /// Handle for an existing cursor.
    pub fn handle(&mut self, cursor: Cursor) -> NodeMut<'_, S> {
        NodeMut { tree: self, cursor }
    }
}

impl<'t, S: Storage> NodeMut<'t, S> {
    pub fn at<'s>(self, step: impl Into<Step<'s>>) -> Self {
        Self {
            cursor: self.cursor.at(step),
            tree: self.tree,
        }
    }

    pub fn key(self, key: impl AsRef<[u8]>) -> Self {
        Self {
            cursor: self.cursor.key(key),
            tree: self.tree,
        }
    }

    pub fn index(self, index: usize) -> Self {
        Self {
            cursor: self.cursor.index(index),
            tree: self.tree,
        }
    }

    pub fn set<'v>(&mut self, value: impl Into<Scalar<'v>>) {
        self.tree.set(&mut self.cursor, value);
    }

    pub fn try_set<'v>(&mut self, value: impl Into<Scalar<'v>>) -> Result<()> {
        self.tree.try_set(&mut self.cursor, value)
    }

    pub fn append<'v>(&mut self, value: impl Into<Scalar<'v>>) {
        self.tree.append(&mut self.cursor, value);
    }

    pub fn try_append<'v>(&mut self, value: impl Into<Scalar<'v>>) -> Result<Cursor> {
        self.tree.try_append(&mut self.cursor, value)
    }

    pub fn clear(&mut self) {
        self.tree.clear(&self.cursor);
    }

    pub fn unset(&mut self) {
        self.tree.unset(&mut self.cursor);
    }

    pub fn try_unset(&mut self) -> Result<()> {
        self.tree.try_unset(&mut self.cursor)
    }

    pub fn get<T: FromValue>(&self, default: T) -> T {
        self.tree.get(&self.cursor, default)
    }

    pub fn value(&self) -> Option<Value<'_>> {
        self.tree.value(&self.cursor)
    }

    pub fn get_str(&self) -> Option<&str> {
        self.tree.get_str(&self.cursor)
    }

    pub fn exists(&self) -> bool {
        self.tree.exists(&self.cursor)
    }

    pub fn node_type(&self) -> Option<NodeType> {
        self.tree.node_type(&self.cursor)
    }

    pub fn size(&self) -> usize {
        self.tree.size(&self.cursor)
    }

    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.tree.contains(&self.cursor, key)
    }

    pub fn truthy(&self) -> bool {
        self.tree.truthy(&self.cursor)
    }

    pub fn is_attached(&self) -> bool {
        self.tree.is_attached(&self.cursor)
    }

    pub fn children(&self) -> Children<'_, S> {
        self.tree.children(&self.cursor)
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Releases the tree borrow, keeping the cursor.
    pub fn into_cursor(self) -> Cursor {
        self.cursor
    }
}
