use assoc_tree::{Cursor, Error, NodeType, Tree, LAZY_KEY_BYTES, MAX_LAZY_SEGMENTS};

fn tree() -> Tree<Box<[u8]>> {
    Tree::with_capacity(4096)
}

fn json(tree: &Tree<Box<[u8]>>) -> String {
    tree.to_json_string().expect("tree must serialize")
}

#[test]
fn nested_write_creates_objects_and_array_slots() {
    let mut tree = tree();
    let mut target = tree.cursor().key("a").key("b").index(2);
    tree.set(&mut target, 5);

    let a = tree.cursor().key("a");
    let b = a.key("b");
    assert_eq!(tree.node_type(&a), Some(NodeType::Object));
    assert_eq!(tree.node_type(&b), Some(NodeType::Array));
    assert_eq!(tree.size(&b), 3);
    assert_eq!(tree.node_type(&b.index(0)), Some(NodeType::Null));
    assert_eq!(tree.node_type(&b.index(1)), Some(NodeType::Null));
    assert_eq!(tree.get(&b.index(2), 0), 5);
    assert_eq!(json(&tree), r#"{"a":{"b":[null,null,5]}}"#);
}

#[test]
fn lower_index_write_never_shrinks_an_array() {
    let mut tree = tree();
    let mut high = tree.cursor().key("arr").index(5);
    tree.set(&mut high, 1);
    let mut low = tree.cursor().key("arr").index(1);
    tree.set(&mut low, 2);
    let arr = tree.cursor().key("arr");
    assert_eq!(tree.size(&arr), 6);
    assert_eq!(json(&tree), r#"{"arr":[null,2,null,null,null,1]}"#);
}

#[test]
fn reads_never_create_nodes() {
    let tree = tree();
    let missing = tree.cursor().key("x").index(9).key("y");
    let before = tree.stats();
    assert!(!tree.exists(&missing));
    assert_eq!(tree.get(&missing, 42), 42);
    assert_eq!(tree.get_str(&missing), None);
    assert_eq!(tree.size(&missing), 0);
    assert!(!tree.contains(&missing, "k"));
    assert_eq!(tree.node_type(&missing), None);
    assert_eq!(tree.stats(), before);
}

#[test]
fn bool_coercion_matrix() {
    let mut tree = tree();
    let falsy: [(&str, assoc_tree::Scalar<'_>); 4] = [
        ("zero", 0.into()),
        ("zero_f", 0.0.into()),
        ("empty", "".into()),
        ("no", false.into()),
    ];
    let truthy: [(&str, assoc_tree::Scalar<'_>); 3] =
        [("one", 1.into()), ("x", "x".into()), ("yes", true.into())];

    for (key, value) in falsy.iter().chain(truthy.iter()) {
        let mut cursor = tree.cursor().key(key);
        tree.set(&mut cursor, *value);
    }
    for (key, _) in falsy {
        assert!(!tree.get(&tree.cursor().key(key), true), "{key}");
    }
    for (key, _) in truthy {
        assert!(tree.get(&tree.cursor().key(key), false), "{key}");
    }
    assert!(!tree.get(&tree.cursor().key("absent"), false));
}

#[test]
fn numeric_reads_convert_between_widths() {
    let mut tree = tree();
    let mut d = tree.cursor().key("d");
    tree.set(&mut d, 2.75);
    let mut n = tree.cursor().key("n");
    tree.set(&mut n, -7i64);
    let mut small = tree.cursor().key("small");
    tree.set(&mut small, 200u8);

    assert_eq!(tree.get(&d, 0i32), 2);
    assert_eq!(tree.get(&n, 0.0f64), -7.0);
    assert_eq!(tree.get(&small, 0u8), 200);
    assert_eq!(tree.get(&d, String::from("default")), "default");
}

#[test]
fn type_conflicts_leave_the_tree_unchanged() {
    let mut tree = tree();
    let mut list = tree.cursor().key("list");
    tree.append(&mut list, 1);
    let before = json(&tree);

    let mut by_key = tree.cursor().key("list").key("k");
    assert!(matches!(
        tree.try_set(&mut by_key, 1),
        Err(Error::TypeConflict { expected: NodeType::Object, found: NodeType::Array })
    ));
    let mut scalar = tree.cursor().key("list").index(0).index(0);
    assert!(matches!(
        tree.try_set(&mut scalar, 1),
        Err(Error::TypeConflict { expected: NodeType::Array, found: NodeType::Int })
    ));
    let mut root_index = tree.cursor().index(0);
    assert!(matches!(tree.try_set(&mut root_index, 1), Err(Error::TypeConflict { .. })));
    assert_eq!(json(&tree), before);
}

#[test]
fn conflict_below_an_existing_scalar_is_a_no_op() {
    let mut tree = tree();
    let mut n = tree.cursor().key("a").key("n");
    tree.set(&mut n, 1);
    let mut fresh = tree.cursor().key("a").key("fresh").key("x");
    tree.set(&mut fresh, 1);
    let mut blocked = tree.cursor().key("a").key("n").key("x");
    assert!(tree.try_set(&mut blocked, 2).is_err());
    assert_eq!(json(&tree), r#"{"a":{"n":1,"fresh":{"x":1}}}"#);
}

#[test]
fn overflowed_and_detached_cursors_are_inert() {
    let mut tree = tree();
    let mut deep = tree.cursor();
    for depth in 0..=MAX_LAZY_SEGMENTS {
        deep = deep.key(format!("k{depth}"));
    }
    assert!(deep.is_overflowed());
    tree.set(&mut deep, 1);
    assert_eq!(tree.try_set(&mut deep, 1), Err(Error::Overflow));

    let mut wide = tree.cursor().key(vec![b'w'; LAZY_KEY_BYTES + 1]);
    assert!(wide.is_overflowed());
    assert_eq!(tree.try_append(&mut wide, 1).unwrap_err(), Error::Overflow);

    let mut negative = tree.cursor().key("list").at(-1i64);
    assert!(negative.is_detached());
    assert_eq!(tree.try_set(&mut negative, 1), Err(Error::Detached));

    let mut default = Cursor::default();
    assert_eq!(tree.try_set(&mut default, 1), Err(Error::Detached));

    assert_eq!(json(&tree), "{}");
}

#[test]
fn exactly_the_segment_budget_resolves() {
    let mut tree = tree();
    let mut cursor = tree.cursor();
    for depth in 0..MAX_LAZY_SEGMENTS {
        cursor = cursor.key(format!("{depth}"));
    }
    assert!(!cursor.is_overflowed());
    tree.set(&mut cursor, "deep");
    assert!(tree.is_attached(&cursor));
    assert_eq!(tree.get_str(&cursor), Some("deep"));
}

#[test]
fn step_conversions() {
    let mut tree = tree();
    let mut a = tree.cursor().key("a").at(1u32);
    tree.set(&mut a, 1);
    let b = tree.cursor().at("a").at(1i64);
    let c = tree.cursor().at(&String::from("a")).at(1usize);
    let d = tree.cursor().at(b"a").at(1isize);
    assert_eq!(tree.get(&b, 0), 1);
    assert_eq!(tree.get(&c, 0), 1);
    assert_eq!(tree.get(&d, 0), 1);
}

#[test]
fn attached_cursor_is_stale_after_collection() {
    let mut tree = tree();
    let mut a = tree.cursor().key("a");
    tree.set(&mut a, 1);
    let mut b = tree.cursor().key("b");
    tree.set(&mut b, 2);
    tree.unset(&mut a);
    tree.gc();

    assert!(!tree.is_attached(&b));
    assert_eq!(tree.get(&b, -1), -1);
    assert_eq!(tree.resolve_existing(&b), Err(Error::Stale));
    assert_eq!(tree.get(&tree.cursor().key("b"), -1), 2);
}

#[test]
fn unset_and_contains() {
    let mut tree = tree();
    for key in ["a", "b", "c"] {
        let mut cursor = tree.cursor().key(key);
        tree.set(&mut cursor, key);
    }
    let root = tree.cursor();
    let mut b = root.key("b");
    tree.unset(&mut b);
    assert!(!tree.contains(&root, "b"));
    assert!(tree.contains(&root, "a"));
    assert_eq!(tree.size(&root), 2);
    assert_eq!(json(&tree), r#"{"a":"a","c":"c"}"#);
    assert_eq!(tree.try_unset(&mut root.key("b")), Err(Error::NotFound));
}

#[test]
fn clear_keeps_the_container() {
    let mut tree = tree();
    let mut list = tree.cursor().key("list");
    for n in 0..3 {
        tree.append(&mut list, n);
    }
    tree.clear(&list);
    assert_eq!(tree.size(&list), 0);
    assert_eq!(tree.node_type(&list), Some(NodeType::Array));
    tree.append(&mut list, 9);
    assert_eq!(json(&tree), r#"{"list":[9]}"#);
}

#[test]
fn append_returns_the_new_element() {
    let mut tree = tree();
    let mut list = tree.cursor().key("list");
    let first = tree.try_append(&mut list, "a").unwrap();
    let second = tree.try_append(&mut list, "b").unwrap();
    assert_eq!(tree.get_str(&first), Some("a"));
    assert_eq!(tree.get_str(&second), Some("b"));

    let mut obj = tree.cursor().key("obj").key("k");
    tree.set(&mut obj, 1);
    let mut obj = tree.cursor().key("obj");
    assert!(matches!(tree.try_append(&mut obj, 1), Err(Error::TypeConflict { .. })));
}

#[test]
fn cursor_inside_an_unset_subtree_reports_not_found() {
    let mut tree = tree();
    let mut inner = tree.cursor().key("a").key("b");
    tree.set(&mut inner, 1);
    let mut below = inner.key("c");
    let mut a = tree.cursor().key("a");
    tree.unset(&mut a);
    let before = tree.stats();

    assert_eq!(tree.try_set(&mut inner, 2), Err(Error::NotFound));
    assert_eq!(tree.try_set(&mut below, 2), Err(Error::NotFound));
    assert!(!tree.exists(&inner));
    assert_eq!(tree.get(&inner, -1), -1);
    assert_eq!(tree.stats(), before);
    assert_eq!(json(&tree), "{}");
}
