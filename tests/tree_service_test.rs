//! Integration tests for TreeService against both store implementations.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rstest::rstest;

use notetree::application::services::{TreeService, COPY_SUFFIX};
use notetree::application::ApplicationError;
use notetree::domain::{DomainError, NewNode, Node, NodeId};
use notetree::infrastructure::error::{StoreError, StoreResult};
use notetree::infrastructure::store::{MemoryNodeStore, SqliteNodeStore};
use notetree::infrastructure::traits::NodeStore;
use notetree::util::testing;

#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    Sqlite,
}

fn service(backend: Backend) -> (TreeService, Arc<dyn NodeStore>) {
    testing::init_test_setup();
    let store: Arc<dyn NodeStore> = match backend {
        Backend::Memory => Arc::new(MemoryNodeStore::new()),
        Backend::Sqlite => Arc::new(SqliteNodeStore::open_in_memory().expect("open sqlite")),
    };
    (TreeService::new(Arc::clone(&store)), store)
}

fn domain_err(err: ApplicationError) -> DomainError {
    err.domain().cloned().expect("domain error")
}

/// Ids of the subtree rooted at `id`, excluding `id`.
fn descendants(store: &dyn NodeStore, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        for child in store.list_children(current).unwrap() {
            out.push(child.id);
            stack.push(child.id);
        }
    }
    out
}

/// Every node's parent chain reaches the root within `len` steps.
fn assert_rooted(store: &dyn NodeStore) {
    let all = store.list_all().unwrap();
    for node in &all {
        let mut current = node.parent_id;
        let mut steps = 0;
        while !current.is_root() {
            assert!(steps < all.len(), "{} does not reach the root", node.id);
            current = store
                .read(current)
                .unwrap_or_else(|_| panic!("{} has a missing ancestor {}", node.id, current))
                .parent_id;
            steps += 1;
        }
    }
}

/// Store whose `create` and `delete` start failing after a fixed number of calls.
struct FailingStore {
    inner: MemoryNodeStore,
    creates_left: AtomicUsize,
    deletes_left: AtomicUsize,
}

impl FailingStore {
    fn new(creates: usize, deletes: usize) -> Self {
        Self {
            inner: MemoryNodeStore::new(),
            creates_left: AtomicUsize::new(creates),
            deletes_left: AtomicUsize::new(deletes),
        }
    }

    fn spend(budget: &AtomicUsize) -> StoreResult<()> {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| StoreError::Unavailable("disk went away".to_string()))
    }
}

impl NodeStore for FailingStore {
    fn create(&self, node: NewNode) -> StoreResult<NodeId> {
        Self::spend(&self.creates_left)?;
        self.inner.create(node)
    }

    fn read(&self, id: NodeId) -> StoreResult<Node> {
        self.inner.read(id)
    }

    fn write_all(&self, node: &mut Node) -> StoreResult<()> {
        self.inner.write_all(node)
    }

    fn delete(&self, id: NodeId) -> StoreResult<()> {
        Self::spend(&self.deletes_left)?;
        self.inner.delete(id)
    }

    fn list_all(&self) -> StoreResult<Vec<Node>> {
        self.inner.list_all()
    }

    fn list_children(&self, parent_id: NodeId) -> StoreResult<Vec<Node>> {
        self.inner.list_children(parent_id)
    }

    fn clear(&self) -> StoreResult<()> {
        self.inner.clear()
    }
}

// ============================================================
// create / list
// ============================================================

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_mixed_children_when_listing_then_folders_first_then_locale_order(#[case] backend: Backend) {
    // Arrange
    let (tree, _) = service(backend);
    tree.create(NodeId::ROOT, "cherry", false).unwrap();
    tree.create(NodeId::ROOT, "Banana", false).unwrap();
    tree.create(NodeId::ROOT, "zeta", true).unwrap();
    tree.create(NodeId::ROOT, "apple", false).unwrap();
    tree.create(NodeId::ROOT, "Alpha", true).unwrap();
    tree.create(NodeId::ROOT, "banana", false).unwrap();

    // Act
    let names: Vec<String> = tree
        .list_children(NodeId::ROOT)
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();

    // Assert
    assert_eq!(names, vec!["Alpha", "zeta", "apple", "banana", "Banana", "cherry"]);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_file_as_parent_when_creating_then_invalid_parent(#[case] backend: Backend) {
    let (tree, store) = service(backend);
    let file = tree.create(NodeId::ROOT, "note", false).unwrap();

    let err = tree.create(file, "child", false).unwrap_err();

    assert_eq!(domain_err(err), DomainError::InvalidParent(file));
    assert_eq!(store.list_all().unwrap().len(), 1);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_missing_parent_when_creating_then_invalid_parent(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    let err = tree.create(NodeId(404), "child", true).unwrap_err();
    assert_eq!(domain_err(err), DomainError::InvalidParent(NodeId(404)));
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
fn given_blank_name_when_creating_then_invalid_name(#[case] name: &str) {
    let (tree, _) = service(Backend::Memory);
    let err = tree.create(NodeId::ROOT, name, false).unwrap_err();
    assert!(matches!(domain_err(err), DomainError::InvalidName(_)));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_duplicate_sibling_names_when_creating_then_both_exist(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    let a = tree.create(NodeId::ROOT, "same", false).unwrap();
    let b = tree.create(NodeId::ROOT, "same", false).unwrap();
    assert_ne!(a, b);
    assert_eq!(tree.list_children(NodeId::ROOT).unwrap().len(), 2);
}

// ============================================================
// rename
// ============================================================

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_unchanged_name_when_renaming_then_last_modified_kept(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    let id = tree.create(NodeId::ROOT, "note", false).unwrap();
    let before = tree.get(id).unwrap();

    tree.rename(id, "note").unwrap();

    assert_eq!(tree.get(id).unwrap().last_modified, before.last_modified);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_unknown_id_when_renaming_then_not_found(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    let err = tree.rename(NodeId(77), "x").unwrap_err();
    assert_eq!(domain_err(err), DomainError::NotFound(NodeId(77)));
}

// ============================================================
// move
// ============================================================

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_folder_when_moving_into_own_descendant_then_cycle_and_tree_unchanged(#[case] backend: Backend) {
    // Arrange: A/B/C
    let (tree, _) = service(backend);
    let a = tree.create(NodeId::ROOT, "A", true).unwrap();
    let b = tree.create(a, "B", true).unwrap();
    let c = tree.create(b, "C", true).unwrap();

    // Act / Assert
    for target in [a, b, c] {
        let err = tree.move_node(a, target).unwrap_err();
        assert_eq!(domain_err(err), DomainError::CycleDetected { id: a, target });
    }
    assert_eq!(tree.get(a).unwrap().parent_id, NodeId::ROOT);
    assert_eq!(tree.get(b).unwrap().parent_id, a);
    assert_eq!(tree.get(c).unwrap().parent_id, b);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_folder_when_moving_to_sibling_then_subtree_follows(#[case] backend: Backend) {
    let (tree, store) = service(backend);
    let a = tree.create(NodeId::ROOT, "A", true).unwrap();
    let b = tree.create(a, "B", true).unwrap();
    let f = tree.create(b, "f", false).unwrap();
    let x = tree.create(NodeId::ROOT, "X", true).unwrap();

    tree.move_node(b, x).unwrap();

    assert_eq!(tree.get(b).unwrap().parent_id, x);
    assert_eq!(tree.get(f).unwrap().parent_id, b);
    assert_eq!(descendants(store.as_ref(), x), vec![b, f]);
    assert!(descendants(store.as_ref(), a).is_empty());
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_file_target_when_moving_then_invalid_parent(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    let file = tree.create(NodeId::ROOT, "f", false).unwrap();
    let other = tree.create(NodeId::ROOT, "g", false).unwrap();

    let err = tree.move_node(other, file).unwrap_err();

    assert_eq!(domain_err(err), DomainError::InvalidParent(file));
    assert_eq!(tree.get(other).unwrap().parent_id, NodeId::ROOT);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_nested_folder_when_moving_to_root_then_allowed(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    let a = tree.create(NodeId::ROOT, "A", true).unwrap();
    let b = tree.create(a, "B", true).unwrap();

    tree.move_node(b, NodeId::ROOT).unwrap();

    assert_eq!(tree.get(b).unwrap().parent_id, NodeId::ROOT);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_sequence_of_moves_with_rejected_cycles_when_walking_up_then_every_node_reaches_root(
    #[case] backend: Backend,
) {
    // Arrange: A/B/C, D/E, f under C
    let (tree, store) = service(backend);
    let a = tree.create(NodeId::ROOT, "A", true).unwrap();
    let b = tree.create(a, "B", true).unwrap();
    let c = tree.create(b, "C", true).unwrap();
    let d = tree.create(NodeId::ROOT, "D", true).unwrap();
    let e = tree.create(d, "E", true).unwrap();
    let f = tree.create(c, "f", false).unwrap();

    // Act
    tree.move_node(d, c).unwrap();
    assert!(tree.move_node(a, e).is_err());
    tree.move_node(b, NodeId::ROOT).unwrap();
    assert!(tree.move_node(b, d).is_err());
    tree.move_node(a, e).unwrap();
    assert!(tree.move_node(c, a).is_err());
    tree.move_node(f, a).unwrap();
    tree.move_node(e, b).unwrap();

    // Assert
    assert_rooted(store.as_ref());
    assert_eq!(store.list_all().unwrap().len(), 6);
    assert_eq!(tree.ancestors(f).unwrap(), vec![a, e, b]);
}

// ============================================================
// copy
// ============================================================

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_folder_when_copying_to_same_parent_then_root_suffixed_and_structure_preserved(
    #[case] backend: Backend,
) {
    // Arrange: A/{f1, B/f2}
    let (tree, store) = service(backend);
    let a = tree.create(NodeId::ROOT, "A", true).unwrap();
    let f1 = tree.import_file(a, "f1", "one").unwrap();
    let b = tree.create(a, "B", true).unwrap();
    let f2 = tree.import_file(b, "f2", "two").unwrap();
    let originals: HashSet<NodeId> = [a, f1, b, f2].into_iter().collect();

    // Act
    let copy = tree.copy(a, NodeId::ROOT).unwrap();

    // Assert
    let root = tree.get(copy).unwrap();
    assert_eq!(root.name, format!("A{}", COPY_SUFFIX));
    let copied = descendants(store.as_ref(), copy);
    assert_eq!(copied.len(), 3);
    assert!(copied.iter().all(|id| !originals.contains(id)));

    let children = tree.list_children(copy).unwrap();
    let names: Vec<&str> = children.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["B", "f1"]);
    assert_eq!(children[1].content(), Some("one"));
    let nested = tree.list_children(children[0].id).unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].name, "f2");
    assert_eq!(nested[0].content(), Some("two"));

    // originals untouched
    assert_eq!(descendants(store.as_ref(), a).len(), 3);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_file_when_copying_to_other_folder_then_name_kept(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    let f = tree.import_file(NodeId::ROOT, "note", "body").unwrap();
    let dest = tree.create(NodeId::ROOT, "dest", true).unwrap();

    let copy = tree.copy(f, dest).unwrap();

    let node = tree.get(copy).unwrap();
    assert_eq!(node.name, "note");
    assert_eq!(node.parent_id, dest);
    assert_eq!(node.content(), Some("body"));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_folder_when_copying_into_own_descendant_then_cycle_and_nothing_written(
    #[case] backend: Backend,
) {
    let (tree, store) = service(backend);
    let a = tree.create(NodeId::ROOT, "A", true).unwrap();
    let b = tree.create(a, "B", true).unwrap();

    let err = tree.copy(a, b).unwrap_err();

    assert_eq!(domain_err(err), DomainError::CycleDetected { id: a, target: b });
    assert_eq!(store.list_all().unwrap().len(), 2);
}

// ============================================================
// delete
// ============================================================

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_subtree_when_deleting_then_no_orphans_and_children_first(#[case] backend: Backend) {
    // Arrange: A/{B/{f2}, f1}, keep
    let (tree, store) = service(backend);
    let a = tree.create(NodeId::ROOT, "A", true).unwrap();
    let b = tree.create(a, "B", true).unwrap();
    let f2 = tree.create(b, "f2", false).unwrap();
    let f1 = tree.create(a, "f1", false).unwrap();
    let keep = tree.create(NodeId::ROOT, "keep", false).unwrap();

    // Act
    let removed = tree.delete_recursive(a).unwrap();

    // Assert
    assert_eq!(removed.len(), 4);
    let pos = |id| removed.iter().position(|r| *r == id).unwrap();
    assert!(pos(f2) < pos(b));
    assert!(pos(b) < pos(a));
    assert!(pos(f1) < pos(a));
    let remaining: Vec<NodeId> = store.list_all().unwrap().into_iter().map(|n| n.id).collect();
    assert_eq!(remaining, vec![keep]);
    for node in store.list_all().unwrap() {
        assert!(node.parent_id.is_root() || store.read(node.parent_id).is_ok());
    }
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_unknown_id_when_deleting_then_noop(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    assert!(tree.delete_recursive(NodeId(12345)).unwrap().is_empty());
}

#[rstest]
#[case::first(0)]
#[case::midway(2)]
fn given_store_failing_midway_when_deleting_then_store_unavailable_and_no_orphans(
    #[case] deletes_allowed: usize,
) {
    // Arrange: A/{B/{f2, f3}, f1}
    testing::init_test_setup();
    let store = Arc::new(FailingStore::new(usize::MAX, deletes_allowed));
    let tree = TreeService::new(store.clone());
    let a = tree.create(NodeId::ROOT, "A", true).unwrap();
    let b = tree.create(a, "B", true).unwrap();
    tree.create(b, "f2", false).unwrap();
    tree.create(b, "f3", false).unwrap();
    tree.create(a, "f1", false).unwrap();

    // Act
    let err = tree.delete_recursive(a).unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::StoreUnavailable { .. }));
    assert_eq!(store.list_all().unwrap().len(), 5 - deletes_allowed);
    assert!(store.read(a).is_ok());
    assert_rooted(store.as_ref());
}

#[rstest]
#[case::first(0)]
#[case::midway(2)]
fn given_store_failing_midway_when_copying_then_store_unavailable_and_no_orphans(
    #[case] creates_allowed: usize,
) {
    // Arrange: A/{B/{f2}, f1}, created before the budget is set
    testing::init_test_setup();
    let store = Arc::new(FailingStore::new(4, usize::MAX));
    let tree = TreeService::new(store.clone());
    let a = tree.create(NodeId::ROOT, "A", true).unwrap();
    let b = tree.create(a, "B", true).unwrap();
    tree.create(b, "f2", false).unwrap();
    tree.create(a, "f1", false).unwrap();
    store.creates_left.store(creates_allowed, Ordering::SeqCst);

    // Act
    let err = tree.copy(a, NodeId::ROOT).unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::StoreUnavailable { .. }));
    assert_eq!(store.list_all().unwrap().len(), 4 + creates_allowed);
    assert_rooted(store.as_ref());
}

// ============================================================
// content, search, walk
// ============================================================

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_folder_when_writing_content_then_not_a_file(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    let dir = tree.create(NodeId::ROOT, "dir", true).unwrap();
    let err = tree.write_content(dir, "x").unwrap_err();
    assert_eq!(domain_err(err), DomainError::NotAFile(dir));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_names_when_searching_then_case_insensitive_substring(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    let dir = tree.create(NodeId::ROOT, "Projects", true).unwrap();
    tree.create(dir, "project plan", false).unwrap();
    tree.create(NodeId::ROOT, "shopping", false).unwrap();

    let hits: Vec<String> = tree.search("PROJ").unwrap().into_iter().map(|n| n.name).collect();

    assert_eq!(hits, vec!["Projects", "project plan"]);
    assert!(tree.search("  ").unwrap().is_empty());
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
fn given_hierarchy_when_walking_then_preorder_with_depths(#[case] backend: Backend) {
    let (tree, _) = service(backend);
    let a = tree.create(NodeId::ROOT, "A", true).unwrap();
    tree.create(a, "inner", false).unwrap();
    tree.create(NodeId::ROOT, "top", false).unwrap();

    let walked: Vec<(usize, String)> = tree
        .walk()
        .unwrap()
        .into_iter()
        .map(|(d, n)| (d, n.name))
        .collect();

    assert_eq!(
        walked,
        vec![(0, "A".to_string()), (1, "inner".to_string()), (0, "top".to_string())]
    );
}

#[test]
fn given_closed_store_when_listing_then_store_unavailable() {
    let store = Arc::new(MemoryNodeStore::new());
    let tree = TreeService::new(store.clone());
    store.close();

    let err = tree.list_children(NodeId::ROOT).unwrap_err();

    assert!(matches!(err, ApplicationError::StoreUnavailable { .. }));
}
