use assoc_tree::{Cursor, Scalar, Tree};
use proptest::prelude::*;
use serde_json::{Map, Number, Value as Json};

#[derive(Debug, Clone)]
enum Seg {
    Key(&'static str),
    Index(usize),
}

#[derive(Debug, Clone)]
enum Val {
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(&'static str),
}

#[derive(Debug, Clone)]
enum Op {
    Set(Vec<Seg>, Val),
    Append(Vec<Seg>, Val),
    Unset(Vec<Seg>),
    Clear(Vec<Seg>),
    Gc,
}

const KEYS: [&str; 5] = ["a", "b", "c", "long-key", "k\"q"];
const STRINGS: [&str; 6] = ["", "x", "hello", "tab\there", "quote\"back\\", "é"];

impl Val {
    fn scalar(&self) -> Scalar<'static> {
        match self {
            Val::Null => Scalar::Null,
            Val::Bool(b) => Scalar::Bool(*b),
            Val::Int(n) => Scalar::Int(*n),
            Val::Double(n) => Scalar::Double(*n),
            Val::Str(s) => Scalar::Str(s.as_bytes()),
        }
    }

    fn json(&self) -> Json {
        match self {
            Val::Null => Json::Null,
            Val::Bool(b) => Json::Bool(*b),
            Val::Int(n) => Json::from(*n),
            Val::Double(n) => Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Val::Str(s) => Json::String((*s).to_owned()),
        }
    }
}

fn seg_strategy() -> impl Strategy<Value = Seg> {
    prop_oneof![
        prop::sample::select(KEYS.to_vec()).prop_map(Seg::Key),
        (0usize..4).prop_map(Seg::Index),
    ]
}

fn path_strategy() -> impl Strategy<Value = Vec<Seg>> {
    prop::collection::vec(seg_strategy(), 1..=3)
}

fn val_strategy() -> impl Strategy<Value = Val> {
    // Quarters below 250 have at most six significant digits.
    prop_oneof![
        Just(Val::Null),
        any::<bool>().prop_map(Val::Bool),
        any::<i32>().prop_map(Val::Int),
        (-1000i32..1000).prop_map(|n| Val::Double(n as f64 / 4.0)),
        prop::sample::select(STRINGS.to_vec()).prop_map(Val::Str),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (path_strategy(), val_strategy()).prop_map(|(p, v)| Op::Set(p, v)),
        3 => (path_strategy(), val_strategy()).prop_map(|(p, v)| Op::Append(p, v)),
        2 => path_strategy().prop_map(Op::Unset),
        1 => path_strategy().prop_map(Op::Clear),
        1 => Just(Op::Gc),
    ]
}

fn cursor_for(tree: &Tree<Box<[u8]>>, path: &[Seg]) -> Cursor {
    path.iter().fold(tree.cursor(), |cursor, seg| match seg {
        Seg::Key(key) => cursor.key(key),
        Seg::Index(index) => cursor.index(*index),
    })
}

/// Walks `path` creating what is missing, the way a write does. Nodes created
/// before a conflict stay in place.
fn model_ensure<'m>(root: &'m mut Json, path: &[Seg]) -> Option<&'m mut Json> {
    let mut current = root;
    for seg in path {
        current = match seg {
            Seg::Key(key) => {
                if current.is_null() {
                    *current = Json::Object(Map::new());
                }
                let Json::Object(map) = current else {
                    return None;
                };
                map.entry(*key).or_insert(Json::Null)
            }
            Seg::Index(index) => {
                if current.is_null() {
                    *current = Json::Array(Vec::new());
                }
                let Json::Array(items) = current else {
                    return None;
                };
                while items.len() <= *index {
                    items.push(Json::Null);
                }
                &mut items[*index]
            }
        };
    }
    Some(current)
}

fn model_get<'m>(root: &'m Json, path: &[Seg]) -> Option<&'m Json> {
    path.iter().try_fold(root, |current, seg| match seg {
        Seg::Key(key) => current.as_object()?.get(*key),
        Seg::Index(index) => current.as_array()?.get(*index),
    })
}

fn model_apply(model: &mut Json, op: &Op) {
    match op {
        Op::Set(path, val) => {
            if let Some(node) = model_ensure(model, path) {
                *node = val.json();
            }
        }
        Op::Append(path, val) => {
            if let Some(node) = model_ensure(model, path) {
                if node.is_null() {
                    *node = Json::Array(Vec::new());
                }
                if let Json::Array(items) = node {
                    items.push(val.json());
                }
            }
        }
        Op::Unset(path) => {
            let (last, parent_path) = path.split_last().expect("paths are non-empty");
            if model_get(model, path).is_none() {
                return;
            }
            let Some(parent) = model_ensure(model, parent_path) else {
                return;
            };
            match (last, parent) {
                (Seg::Key(key), Json::Object(map)) => {
                    map.shift_remove(*key);
                }
                (Seg::Index(index), Json::Array(items)) => {
                    items.remove(*index);
                }
                _ => {}
            }
        }
        Op::Clear(path) => {
            if model_get(model, path).is_none() {
                return;
            }
            match model_ensure(model, path) {
                Some(Json::Object(map)) => map.clear(),
                Some(Json::Array(items)) => items.clear(),
                _ => {}
            }
        }
        Op::Gc => {}
    }
}

fn tree_apply(tree: &mut Tree<Box<[u8]>>, op: &Op) {
    match op {
        Op::Set(path, val) => {
            let mut cursor = cursor_for(tree, path);
            tree.set(&mut cursor, val.scalar());
        }
        Op::Append(path, val) => {
            let mut cursor = cursor_for(tree, path);
            tree.append(&mut cursor, val.scalar());
        }
        Op::Unset(path) => {
            let mut cursor = cursor_for(tree, path);
            tree.unset(&mut cursor);
        }
        Op::Clear(path) => {
            let cursor = cursor_for(tree, path);
            tree.clear(&cursor);
        }
        Op::Gc => {
            tree.gc();
        }
    }
}

/// Compares numbers by value so `1` and `1.0` are equal.
fn normalize(value: &Json) -> Json {
    match value {
        Json::Number(n) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map_or(Json::Null, Json::Number),
        Json::Array(items) => Json::Array(items.iter().map(normalize).collect()),
        Json::Object(map) => Json::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), normalize(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_tree_matches_model(ops in prop::collection::vec(op_strategy(), 0..48)) {
        let mut tree = Tree::with_capacity(64 * 1024);
        let mut model = Json::Object(Map::new());
        for op in &ops {
            tree_apply(&mut tree, op);
            model_apply(&mut model, op);
            prop_assert_eq!(tree.to_json_value(), Some(model.clone()), "after {:?}", op);
        }
        let text = tree.to_json_string().expect("tree must serialize");
        let parsed: Json = serde_json::from_str(&text).expect("output must be valid JSON");
        prop_assert_eq!(normalize(&parsed), normalize(&model));
    }

    #[test]
    fn prop_gc_preserves_json(ops in prop::collection::vec(op_strategy(), 0..48)) {
        let mut tree = Tree::with_capacity(64 * 1024);
        for op in &ops {
            tree_apply(&mut tree, op);
        }
        let before = tree.to_json_string();
        let stats = tree.stats();
        let report = tree.gc();
        prop_assert_eq!(tree.to_json_string(), before);
        prop_assert_eq!(report.live_nodes + report.reclaimed_nodes, stats.nodes);
        prop_assert!(report.string_bytes <= stats.string_bytes);
        prop_assert_eq!(report.revision, stats.revision + 1);
    }

    #[test]
    fn prop_array_auto_extend(indices in prop::collection::vec(0usize..32, 1..12)) {
        let mut tree = Tree::with_capacity(4096);
        let mut expected: Vec<Option<usize>> = Vec::new();
        for (step, index) in indices.iter().enumerate() {
            let mut cursor = tree.cursor().key("arr").index(*index);
            tree.set(&mut cursor, step);
            if expected.len() <= *index {
                expected.resize(*index + 1, None);
            }
            expected[*index] = Some(step);
            prop_assert_eq!(tree.size(&tree.cursor().key("arr")), expected.len());
        }
        let arr = tree.cursor().key("arr");
        for (index, value) in expected.iter().enumerate() {
            let element = arr.index(index);
            match value {
                Some(step) => prop_assert_eq!(tree.get(&element, -1i64), *step as i64),
                None => prop_assert!(tree.exists(&element) && !tree.truthy(&element)),
            }
        }
    }
}
