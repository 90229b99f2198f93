use super::*;

#[test]
fn test_default_selector_accepts_everything() {
    let selector = DefaultTreeCacheSelector;
    assert!(selector.traverse_children("/"));
    assert!(selector.traverse_children("/root/deep/path"));
    assert!(selector.accept_child("/root/n1-c"));
}

#[test]
fn test_fn_selector_delegates_to_closures() {
    let selector = FnSelector::new(
        |p: &str| p != "/root/n1-b/n2-b",
        |p: &str| p != "/root/n1-c",
    );

    assert!(selector.traverse_children("/root/n1-b"));
    assert!(!selector.traverse_children("/root/n1-b/n2-b"));
    assert!(selector.accept_child("/root/n1-d"));
    assert!(!selector.accept_child("/root/n1-c"));
}
