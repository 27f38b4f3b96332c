//! Tree engine
//!
//! Enforces the hierarchy rules on top of a flat [`NodeStore`]: folders
//! contain nodes, the parent graph stays acyclic and rooted at
//! [`NodeId::ROOT`], and recursive operations never leave orphans behind.

use std::collections::HashSet;
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::application::{ApplicationResult, StoreResultExt};
use crate::domain::{
    display_order, validate_name, DomainError, NewNode, Node, NodeId, NodeKind,
};
use crate::infrastructure::error::StoreError;
use crate::infrastructure::traits::NodeStore;

/// Suffix appended to a copy placed next to its original.
pub const COPY_SUFFIX: &str = " (Copy)";

/// Service for structural operations on the node hierarchy.
pub struct TreeService {
    store: Arc<dyn NodeStore>,
}

impl TreeService {
    /// Create a new tree service.
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    /// Fetch one node.
    pub fn get(&self, id: NodeId) -> ApplicationResult<Node> {
        self.store.read(id).with_store_context("read node")
    }

    /// Children of `parent_id`: folders first, then by name.
    #[instrument(level = "debug", skip(self))]
    pub fn list_children(&self, parent_id: NodeId) -> ApplicationResult<Vec<Node>> {
        let mut children = self
            .store
            .list_children(parent_id)
            .with_store_context("list children")?;
        children.sort_by(display_order);
        Ok(children)
    }

    /// Create a file or folder under `parent_id` (root or an existing folder).
    #[instrument(level = "debug", skip(self))]
    pub fn create(&self, parent_id: NodeId, name: &str, is_folder: bool) -> ApplicationResult<NodeId> {
        let kind = if is_folder {
            NodeKind::Folder
        } else {
            NodeKind::empty_file()
        };
        self.insert(parent_id, name, kind)
    }

    /// Create a file that already has content (upload/import).
    #[instrument(level = "debug", skip(self, content))]
    pub fn import_file(&self, parent_id: NodeId, name: &str, content: &str) -> ApplicationResult<NodeId> {
        self.insert(
            parent_id,
            name,
            NodeKind::File {
                content: content.to_string(),
                encrypted: false,
            },
        )
    }

    fn insert(&self, parent_id: NodeId, name: &str, kind: NodeKind) -> ApplicationResult<NodeId> {
        validate_name(name)?;
        self.resolve_folder(parent_id)?;
        let id = self
            .store
            .create(NewNode {
                parent_id,
                name: name.to_string(),
                kind,
            })
            .with_store_context("create node")?;
        debug!("insert: created {} under {}", id, parent_id);
        Ok(id)
    }

    /// Rename a node. Unchanged names are a no-op.
    #[instrument(level = "debug", skip(self))]
    pub fn rename(&self, id: NodeId, new_name: &str) -> ApplicationResult<()> {
        let mut node = self.get(id)?;
        if node.name == new_name {
            debug!("rename: name unchanged");
            return Ok(());
        }
        validate_name(new_name)?;
        node.name = new_name.to_string();
        self.store.write_all(&mut node).with_store_context("rename node")
    }

    /// Reassign the parent of `id`.
    ///
    /// Folders cannot be moved into themselves or into their own
    /// descendants; files skip that check because they have no children.
    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&self, id: NodeId, new_parent_id: NodeId) -> ApplicationResult<()> {
        let mut node = self.get(id)?;
        if node.is_folder() {
            self.ensure_no_cycle(id, new_parent_id)?;
        }
        self.resolve_folder(new_parent_id)?;
        if node.parent_id == new_parent_id {
            debug!("move_node: {} already under {}", id, new_parent_id);
            return Ok(());
        }
        node.parent_id = new_parent_id;
        self.store.write_all(&mut node).with_store_context("move node")
    }

    /// Deep-duplicate `id` (and its subtree) under `new_parent_id`.
    ///
    /// Only the copied root is renamed, and only when it lands next to its
    /// original. The source subtree is collected pre-order before anything is
    /// written, so every copied parent exists before its children.
    #[instrument(level = "debug", skip(self))]
    pub fn copy(&self, id: NodeId, new_parent_id: NodeId) -> ApplicationResult<NodeId> {
        let source = self.get(id)?;
        if source.is_folder() {
            self.ensure_no_cycle(id, new_parent_id)?;
        }
        self.resolve_folder(new_parent_id)?;

        let root_name = if new_parent_id == source.parent_id {
            format!("{}{}", source.name, COPY_SUFFIX)
        } else {
            source.name.clone()
        };

        // the whole source subtree is read before the first write
        let mut plan: Vec<(Node, Option<usize>)> = Vec::new();
        let mut stack = vec![(source, None)];
        while let Some((node, parent)) = stack.pop() {
            let index = plan.len();
            if node.is_folder() {
                let children = self.list_children(node.id)?;
                // reversed so the first child is popped first
                stack.extend(children.into_iter().rev().map(|c| (c, Some(index))));
            }
            plan.push((node, parent));
        }

        let mut copies: Vec<NodeId> = Vec::with_capacity(plan.len());
        for (node, parent) in plan {
            let (target_parent, name) = match parent {
                None => (new_parent_id, root_name.clone()),
                Some(p) => (copies[p], node.name),
            };
            let copy_id = self
                .store
                .create(NewNode {
                    parent_id: target_parent,
                    name,
                    kind: node.kind,
                })
                .with_store_context("copy node")?;
            copies.push(copy_id);
        }

        let created = copies.len();
        let root_copy = copies.first().copied().ok_or(DomainError::NotFound(id))?;
        debug!("copy: {} -> {} ({} nodes)", id, root_copy, created);
        Ok(root_copy)
    }

    /// Remove `id` and everything beneath it, children before parents.
    ///
    /// Unknown ids are treated as already deleted. Returns the removed ids in
    /// removal order.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_recursive(&self, id: NodeId) -> ApplicationResult<Vec<NodeId>> {
        match self.store.read(id) {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                debug!("delete_recursive: {} already gone", id);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).with_store_context("delete node"),
        }

        let mut removed = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((current, children_done)) = stack.pop() {
            if children_done {
                match self.store.delete(current) {
                    Ok(()) => removed.push(current),
                    Err(StoreError::NotFound(_)) => warn!("delete_recursive: {} vanished", current),
                    Err(e) => return Err(e).with_store_context("delete node"),
                }
                continue;
            }
            stack.push((current, true));
            let children = self
                .store
                .list_children(current)
                .with_store_context("list children")?;
            stack.extend(children.into_iter().map(|c| (c.id, false)));
        }

        debug!("delete_recursive: removed {} nodes", removed.len());
        Ok(removed)
    }

    /// Content of a file; encrypted files yield their envelope text.
    pub fn read_content(&self, id: NodeId) -> ApplicationResult<String> {
        let node = self.get(id)?;
        node.content()
            .map(str::to_string)
            .ok_or_else(|| DomainError::NotAFile(id).into())
    }

    /// Replace the content of an unencrypted file.
    #[instrument(level = "debug", skip(self, content))]
    pub fn write_content(&self, id: NodeId, content: &str) -> ApplicationResult<()> {
        let mut node = self.get(id)?;
        match &mut node.kind {
            NodeKind::Folder => return Err(DomainError::NotAFile(id).into()),
            NodeKind::File {
                encrypted: true, ..
            } => return Err(DomainError::ContentLocked(id).into()),
            NodeKind::File { content: current, .. } => {
                *current = content.to_string();
            }
        }
        self.store.write_all(&mut node).with_store_context("write content")
    }

    /// Name and content of a file for download; refuses encrypted files.
    pub fn export_file(&self, id: NodeId) -> ApplicationResult<(String, String)> {
        let node = self.get(id)?;
        match node.kind {
            NodeKind::Folder => Err(DomainError::NotAFile(id).into()),
            NodeKind::File {
                encrypted: true, ..
            } => Err(DomainError::ContentLocked(id).into()),
            NodeKind::File { content, .. } => Ok((node.name, content)),
        }
    }

    /// Case-insensitive substring match on names across the whole store.
    #[instrument(level = "debug", skip(self))]
    pub fn search(&self, query: &str) -> ApplicationResult<Vec<Node>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let nodes = self.store.list_all().with_store_context("search")?;
        Ok(nodes
            .into_iter()
            .filter(|n| n.name.to_lowercase().contains(&needle))
            .sorted_by(display_order)
            .collect())
    }

    /// Every reachable node with its depth, in display order.
    pub fn walk(&self) -> ApplicationResult<Vec<(usize, Node)>> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, Node)> = self
            .list_children(NodeId::ROOT)?
            .into_iter()
            .rev()
            .map(|n| (0, n))
            .collect();
        while let Some((depth, node)) = stack.pop() {
            if node.is_folder() {
                for child in self.list_children(node.id)?.into_iter().rev() {
                    stack.push((depth + 1, child));
                }
            }
            out.push((depth, node));
        }
        Ok(out)
    }

    /// Remove every node.
    #[instrument(level = "debug", skip(self))]
    pub fn clear(&self) -> ApplicationResult<()> {
        self.store.clear().with_store_context("clear nodes")
    }

    /// Ids from `id`'s parent up to (excluding) the root.
    pub fn ancestors(&self, id: NodeId) -> ApplicationResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.get(id)?.parent_id;
        while !cursor.is_root() {
            if !seen.insert(cursor) {
                warn!("ancestors: parent loop at {}", cursor);
                return Err(DomainError::CycleDetected { id, target: cursor }.into());
            }
            out.push(cursor);
            cursor = match self.store.read(cursor) {
                Ok(parent) => parent.parent_id,
                Err(StoreError::NotFound(_)) => break,
                Err(e) => return Err(e).with_store_context("walk ancestors"),
            };
        }
        Ok(out)
    }

    /// Fail with `InvalidParent` unless `id` is root or an existing folder.
    fn resolve_folder(&self, id: NodeId) -> ApplicationResult<()> {
        if id.is_root() {
            return Ok(());
        }
        match self.store.read(id) {
            Ok(node) if node.is_folder() => Ok(()),
            Ok(_) | Err(StoreError::NotFound(_)) => Err(DomainError::InvalidParent(id).into()),
            Err(e) => Err(e).with_store_context("resolve parent"),
        }
    }

    /// Walk the ancestors of `target`; placing `id` there must not close a loop.
    fn ensure_no_cycle(&self, id: NodeId, target: NodeId) -> ApplicationResult<()> {
        let cycle = || DomainError::CycleDetected { id, target };
        if target == id {
            return Err(cycle().into());
        }
        let mut seen = HashSet::new();
        let mut cursor = target;
        while !cursor.is_root() {
            if !seen.insert(cursor) {
                return Err(cycle().into());
            }
            let node = match self.store.read(cursor) {
                Ok(node) => node,
                // missing targets are reported by resolve_folder
                Err(StoreError::NotFound(_)) => return Ok(()),
                Err(e) => return Err(e).with_store_context("walk ancestors"),
            };
            if node.parent_id == id {
                return Err(cycle().into());
            }
            cursor = node.parent_id;
        }
        Ok(())
    }
}
