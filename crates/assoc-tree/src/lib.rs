//! A JSON-like value tree that lives entirely inside one caller-supplied
//! byte buffer.
//!
//! Fixed-size node records grow up from the start of the buffer and string
//! bytes grow down from the end; the tree is out of space only when the two
//! regions meet. Nothing is allocated after construction.
//!
//! Paths are addressed with [`Cursor`]s, plain values that record a location
//! and resolve against the tree on each operation. Writes create missing
//! objects, members and array slots along the way; reads of missing paths
//! return the caller's default. Removed nodes stay in the buffer as
//! tombstones until [`Tree::gc`] compacts the buffer, which also invalidates
//! every previously attached cursor.
//!
//! ```
//! use assoc_tree::Tree;
//!
//! let mut buf = [0u8; 512];
//! let mut tree = Tree::new(&mut buf[..]);
//! tree.at("user").at("name").set("Ada");
//! tree.at("user").at("age").set(37);
//! tree.at("tags").append("x");
//! tree.at("tags").append("y");
//!
//! assert_eq!(tree.at("user").at("age").get(0), 37);
//! assert_eq!(
//!     tree.to_json_string().as_deref(),
//!     Some(r#"{"user":{"name":"Ada","age":37},"tags":["x","y"]}"#),
//! );
//! ```
//!
//! # Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | `arena` | buffer layout, bump allocation of nodes and strings |
//! | `node` | node ids, type tags, record encoding |
//! | `strings` | string pool |
//! | `path` | bounded pending segments, [`Step`] |
//! | `cursor` | [`Cursor`], read and write resolution |
//! | `tree` | [`Tree`], container ops, typed access |
//! | `value` | [`Scalar`] inputs, [`Value`] views, [`FromValue`] |
//! | `iter` | [`Children`], [`ChildRange`] |
//! | `gc` | mark-compact collection |
//! | `json` | JSON text and `serde_json::Value` output |
//! | `handle` | [`NodeMut`] chaining handle |

mod arena;
mod cursor;
mod error;
mod gc;
mod handle;
mod iter;
mod json;
mod node;
mod path;
mod strings;
mod tree;
mod value;

pub use arena::{Storage, MAX_REGION_BYTES};
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use gc::GcReport;
pub use handle::NodeMut;
pub use iter::{ChildRange, Children, Entry};
pub use json::format_double;
pub use node::{NodeId, NodeType, StringSlot, NODE_ALIGN, NODE_SIZE};
pub use path::{Step, LAZY_KEY_BYTES, MAX_LAZY_SEGMENTS};
pub use tree::{Tree, TreeStats};
pub use value::{FromValue, Scalar, Value};
