//! Node tree: the runtime state of instantiated panels
//!
//! Nodes live in an arena keyed by [`NodeId`]. A parent owns its children
//! through `children_stacks`; the child's `parent` is a plain id used only for
//! traversal. Exactly one node is active at any time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PanelFlowError;
use crate::panel::{FormData, PanelTemplate};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id (ids built this way are not guaranteed to exist)
    pub fn from_raw(raw: u64) -> Self {
        NodeId(raw)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Children spawned by one widget; the last element is the top of the stack
#[derive(Debug, Clone)]
pub struct ChildStack {
    pub widget_id: String,
    pub nodes: Vec<NodeId>,
}

impl ChildStack {
    pub fn top(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}

/// One instantiated panel
#[derive(Debug)]
pub struct TreeNode {
    id: NodeId,
    template: Arc<PanelTemplate>,
    context: FormData,
    pub(crate) form_data: FormData,
    parent: Option<NodeId>,
    /// Insertion-ordered mapping widget id -> stack
    pub(crate) children_stacks: Vec<ChildStack>,
    /// Widget id of the child stack that last held focus
    pub(crate) focus_trail: Option<String>,
    pub(crate) is_active: bool,
}

impl TreeNode {
    fn new(template: Arc<PanelTemplate>, context: FormData, parent: Option<NodeId>) -> Self {
        Self {
            id: NodeId::next(),
            template,
            context,
            form_data: FormData::new(),
            parent,
            children_stacks: Vec::new(),
            focus_trail: None,
            is_active: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn template(&self) -> &Arc<PanelTemplate> {
        &self.template
    }

    /// Shorthand for `template().id`
    pub fn panel_id(&self) -> &str {
        &self.template.id
    }

    /// Parent form data captured when this node was created
    pub fn context(&self) -> &FormData {
        &self.context
    }

    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn children_stacks(&self) -> &[ChildStack] {
        &self.children_stacks
    }

    /// Stack spawned by `widget_id`, if any
    pub fn stack(&self, widget_id: &str) -> Option<&[NodeId]> {
        self.stack_index(widget_id)
            .map(|i| self.children_stacks[i].nodes.as_slice())
    }

    pub(crate) fn stack_index(&self, widget_id: &str) -> Option<usize> {
        self.children_stacks
            .iter()
            .position(|s| s.widget_id == widget_id)
    }

    /// Locate `child` as (stack index, position within stack)
    pub(crate) fn locate_child(&self, child: NodeId) -> Option<(usize, usize)> {
        self.children_stacks
            .iter()
            .enumerate()
            .find_map(|(si, stack)| stack.nodes.iter().position(|n| *n == child).map(|pos| (si, pos)))
    }

    /// Drop the stack at `index`, clearing the focus trail if it pointed there
    pub(crate) fn remove_stack_at(&mut self, index: usize) -> ChildStack {
        let stack = self.children_stacks.remove(index);
        if self.focus_trail.as_deref() == Some(stack.widget_id.as_str()) {
            self.focus_trail = None;
        }
        stack
    }
}

/// The mutable tree of panel instances
#[derive(Debug)]
pub struct NodeTree {
    nodes: HashMap<NodeId, TreeNode>,
    root: NodeId,
    active: NodeId,
}

impl NodeTree {
    /// Build a tree holding only an active root instantiated from `template`
    pub fn with_root(template: Arc<PanelTemplate>) -> Self {
        let mut root = TreeNode::new(template, FormData::new(), None);
        root.is_active = true;
        let id = root.id;
        debug!(node = %id, panel = %root.panel_id(), "created root node");

        let mut nodes = HashMap::new();
        nodes.insert(id, root);
        Self {
            nodes,
            root: id,
            active: id,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &TreeNode {
        // root is never removed
        &self.nodes[&self.root]
    }

    pub fn active(&self) -> NodeId {
        self.active
    }

    pub fn active_node(&self) -> &TreeNode {
        // active always points at a live node
        &self.nodes[&self.active]
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&TreeNode, PanelFlowError> {
        self.nodes
            .get(&id)
            .ok_or(PanelFlowError::NodeNotFound { node_id: id })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut TreeNode, PanelFlowError> {
        self.nodes
            .get_mut(&id)
            .ok_or(PanelFlowError::NodeNotFound { node_id: id })
    }

    /// Create a child of `parent` whose context is a copy of the parent's form data.
    /// The child is stored but not yet attached to any stack.
    pub(crate) fn spawn_child(
        &mut self,
        parent: NodeId,
        template: Arc<PanelTemplate>,
    ) -> Result<NodeId, PanelFlowError> {
        let context = self.node(parent)?.form_data.clone();
        let child = TreeNode::new(template, context, Some(parent));
        let id = child.id;
        self.nodes.insert(id, child);
        Ok(id)
    }

    /// Move the active flag to `id`
    pub fn set_active(&mut self, id: NodeId) -> Result<(), PanelFlowError> {
        if !self.nodes.contains_key(&id) {
            return Err(PanelFlowError::NodeNotFound { node_id: id });
        }
        if let Some(old) = self.nodes.get_mut(&self.active) {
            old.is_active = false;
        }
        if let Some(new) = self.nodes.get_mut(&id) {
            new.is_active = true;
        }
        self.active = id;
        self.record_focus_trail(id);
        Ok(())
    }

    /// Remember, on every ancestor, which stack leads to `id`
    fn record_focus_trail(&mut self, id: NodeId) {
        let mut current = id;
        while let Some(parent_id) = self.nodes.get(&current).and_then(|n| n.parent) {
            let Some(parent) = self.nodes.get_mut(&parent_id) else {
                break;
            };
            if let Some((si, _)) = parent.locate_child(current) {
                parent.focus_trail = Some(parent.children_stacks[si].widget_id.clone());
            }
            current = parent_id;
        }
    }

    /// Depth-first search for the node whose template declares `widget_id`.
    ///
    /// Each node checks its own widgets first, then its stacks in mapping
    /// order, each stack bottom-to-top.
    pub fn find_node_owning_widget(&self, widget_id: &str) -> Option<NodeId> {
        self.find_from(self.root, widget_id)
    }

    fn find_from(&self, id: NodeId, widget_id: &str) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        if node.template.has_widget(widget_id) {
            return Some(id);
        }
        node.children_stacks
            .iter()
            .flat_map(|stack| stack.nodes.iter())
            .find_map(|child| self.find_from(*child, widget_id))
    }

    /// Release `id` and all its descendants, detaching it from its parent.
    ///
    /// Must not be called on the root or on a subtree holding the active node
    /// unless the caller moves the active flag afterwards.
    pub fn destroy_subtree(&mut self, id: NodeId) -> Result<(), PanelFlowError> {
        if id == self.root {
            return Err(PanelFlowError::invariant("the root node cannot be destroyed"));
        }
        let parent_id = self.node(id)?.parent;
        if let Some(parent_id) = parent_id {
            let parent = self.node_mut(parent_id)?;
            if let Some((si, pos)) = parent.locate_child(id) {
                parent.children_stacks[si].nodes.remove(pos);
                if parent.children_stacks[si].nodes.is_empty() {
                    parent.remove_stack_at(si);
                }
            }
        }
        self.release(id);
        Ok(())
    }

    /// Drop `id` and every descendant from the arena without touching the parent
    pub(crate) fn release(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                debug!(node = %current, panel = %node.panel_id(), "released node");
                pending.extend(
                    node.children_stacks
                        .into_iter()
                        .flat_map(|stack| stack.nodes.into_iter()),
                );
            }
        }
    }

    /// Nodes from the root to the active node
    pub fn path_to_active(&self) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(self.active);
        while let Some(id) = current {
            path.push(id);
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        path.reverse();
        path
    }

    /// `path_to_active` extended downward along each node's focus trail
    pub fn column_path(&self) -> Vec<NodeId> {
        let mut path = self.path_to_active();
        let mut current = self.active;
        while let Some(next) = self.trail_child(current) {
            path.push(next);
            current = next;
        }
        path
    }

    fn trail_child(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        let widget_id = node.focus_trail.as_deref()?;
        node.stack(widget_id)?.last().copied()
    }

    /// Verify the structural invariants of the tree
    pub fn check_invariants(&self) -> Result<(), PanelFlowError> {
        let active: Vec<_> = self.nodes.values().filter(|n| n.is_active).collect();
        if active.len() != 1 {
            return Err(PanelFlowError::invariant(format!(
                "expected exactly one active node, found {}",
                active.len()
            )));
        }
        if active[0].id != self.active {
            return Err(PanelFlowError::invariant(format!(
                "active flag is on {} but the tree tracks {}",
                active[0].id, self.active
            )));
        }

        let mut owners: HashMap<NodeId, NodeId> = HashMap::with_capacity(self.nodes.len());
        for node in self.nodes.values() {
            match node.parent {
                None if node.id != self.root => {
                    return Err(PanelFlowError::invariant(format!(
                        "node {} has no parent but is not the root",
                        node.id
                    )));
                }
                Some(_) if node.id == self.root => {
                    return Err(PanelFlowError::invariant("the root node has a parent"));
                }
                _ => {}
            }
            for stack in &node.children_stacks {
                if stack.nodes.is_empty() {
                    return Err(PanelFlowError::invariant(format!(
                        "node {} keeps an empty stack for widget '{}'",
                        node.id, stack.widget_id
                    )));
                }
                for child in &stack.nodes {
                    if owners.insert(*child, node.id).is_some() {
                        return Err(PanelFlowError::invariant(format!(
                            "node {} appears in more than one stack",
                            child
                        )));
                    }
                    let child_node = self.node(*child)?;
                    if child_node.parent != Some(node.id) {
                        return Err(PanelFlowError::invariant(format!(
                            "node {} is stacked under {} but points at another parent",
                            child, node.id
                        )));
                    }
                }
            }
        }

        if owners.len() + 1 != self.nodes.len() {
            return Err(PanelFlowError::invariant(format!(
                "{} nodes are stored but only {} are reachable",
                self.nodes.len(),
                owners.len() + 1
            )));
        }
        Ok(())
    }
}

/// Owned, serializable view of the tree handed to renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub node_id: NodeId,
    pub panel_id: String,
    pub title: String,
    pub is_active: bool,
    pub context: FormData,
    pub form_data: FormData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stacks: Vec<StackSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSnapshot {
    pub widget_id: String,
    pub nodes: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    /// Capture the whole tree starting at the root
    pub fn capture(tree: &NodeTree) -> Self {
        Self::capture_node(tree, tree.root_node())
    }

    fn capture_node(tree: &NodeTree, node: &TreeNode) -> Self {
        Self {
            node_id: node.id,
            panel_id: node.template.id.clone(),
            title: node.template.title.clone(),
            is_active: node.is_active,
            context: node.context.clone(),
            form_data: node.form_data.clone(),
            stacks: node
                .children_stacks
                .iter()
                .map(|stack| StackSnapshot {
                    widget_id: stack.widget_id.clone(),
                    nodes: stack
                        .nodes
                        .iter()
                        .filter_map(|id| tree.get(*id))
                        .map(|child| Self::capture_node(tree, child))
                        .collect(),
                })
                .collect(),
        }
    }

    /// The active node within this snapshot
    pub fn active(&self) -> Option<&TreeSnapshot> {
        if self.is_active {
            return Some(self);
        }
        self.stacks
            .iter()
            .flat_map(|s| s.nodes.iter())
            .find_map(|n| n.active())
    }

    /// Total number of nodes in the snapshot
    pub fn node_count(&self) -> usize {
        1 + self
            .stacks
            .iter()
            .flat_map(|s| s.nodes.iter())
            .map(|n| n.node_count())
            .sum::<usize>()
    }
}
