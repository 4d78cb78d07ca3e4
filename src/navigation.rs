//! Navigation engine
//!
//! The navigation state is the tree itself: its shape plus which node is
//! active. Each algorithm either mutates the tree and reports
//! [`Outcome::Changed`], or leaves it untouched and reports
//! [`Outcome::Unchanged`] (no notification is published for those).
//!
//! | Algorithm  | Moves focus                      | Changes shape            |
//! |------------|----------------------------------|--------------------------|
//! | down       | to the new child                 | replaces one stack       |
//! | vertical   | to the new stack top             | rotates one stack        |
//! | back       | to the sibling below, or parent  | removes the active node  |
//! | horizontal | one column left/right            | no                       |

use std::sync::Arc;

use tracing::debug;

use crate::error::PanelFlowError;
use crate::events::{HorizontalDirection, VerticalDirection};
use crate::handler::NavigationTarget;
use crate::panel::PanelTemplate;
use crate::registry::TemplateRegistry;
use crate::tree::{ChildStack, NodeId, NodeTree};

/// Whether an algorithm changed the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    Unchanged,
}

/// Runs the navigation algorithms over a tree
pub struct Navigator<'a> {
    tree: &'a mut NodeTree,
    templates: &'a TemplateRegistry,
}

impl<'a> Navigator<'a> {
    pub fn new(tree: &'a mut NodeTree, templates: &'a TemplateRegistry) -> Self {
        Self { tree, templates }
    }

    /// Open `target` as the only child spawned by `widget_id` on `source`.
    ///
    /// An existing branch for the same widget is destroyed first. The target
    /// is resolved before anything is touched, so an unknown panel id leaves
    /// the tree as it was.
    pub fn navigate_down(
        &mut self,
        source: NodeId,
        widget_id: &str,
        target: NavigationTarget,
    ) -> Result<NodeId, PanelFlowError> {
        let template = self.resolve(target)?;
        // source must be live before the old branch goes away
        self.tree.node(source)?;

        let replaced = {
            let node = self.tree.node_mut(source)?;
            match node.stack_index(widget_id) {
                Some(i) => std::mem::take(&mut node.children_stacks[i].nodes),
                None => Vec::new(),
            }
        };
        // the active node may sit inside the old branch; set_active below
        // tolerates a released predecessor
        for old in replaced {
            self.tree.release(old);
        }

        let child = self.tree.spawn_child(source, Arc::clone(&template))?;
        let node = self.tree.node_mut(source)?;
        match node.stack_index(widget_id) {
            Some(i) => node.children_stacks[i].nodes.push(child),
            None => node.children_stacks.push(ChildStack {
                widget_id: widget_id.to_string(),
                nodes: vec![child],
            }),
        }

        self.tree.set_active(child)?;

        debug!(
            source = %source,
            widget = widget_id,
            child = %child,
            panel = %template.id,
            "navigated down"
        );
        Ok(child)
    }

    fn resolve(&self, target: NavigationTarget) -> Result<Arc<PanelTemplate>, PanelFlowError> {
        match target {
            NavigationTarget::Panel(panel_id) => self
                .templates
                .get(&panel_id)
                .ok_or(PanelFlowError::UnknownPanel { panel_id }),
            NavigationTarget::Inline(template) => {
                let dupes = template.duplicate_widget_ids();
                if !dupes.is_empty() {
                    return Err(PanelFlowError::InvalidInlinePanel {
                        panel_id: template.id.clone(),
                        details: format!("duplicate widget ids: {}", dupes.join(", ")),
                    });
                }
                Ok(Arc::new(template))
            }
        }
    }

    /// Rotate the active node's stack so a neighbour becomes the top.
    ///
    /// `Up` picks index + 1, `Down` picks index - 1; the picked node is moved
    /// to the end of the stack and becomes active. Out of range is a no-op.
    pub fn navigate_vertical(
        &mut self,
        direction: VerticalDirection,
    ) -> Result<Outcome, PanelFlowError> {
        let active = self.tree.active();
        let Some(parent_id) = self.tree.node(active)?.parent() else {
            debug!("vertical navigation on root ignored");
            return Ok(Outcome::Unchanged);
        };

        let parent = self.tree.node_mut(parent_id)?;
        let (si, index) = parent.locate_child(active).ok_or_else(|| {
            PanelFlowError::invariant(format!("node {} is missing from its parent's stacks", active))
        })?;
        let stack = &mut parent.children_stacks[si].nodes;

        let new_index = match direction {
            VerticalDirection::Up => index.checked_add(1),
            VerticalDirection::Down => index.checked_sub(1),
        };
        let Some(new_index) = new_index.filter(|i| *i < stack.len()) else {
            debug!(?direction, index, len = stack.len(), "vertical navigation out of range");
            return Ok(Outcome::Unchanged);
        };

        let picked = stack.remove(new_index);
        stack.push(picked);
        self.tree.set_active(picked)?;

        debug!(?direction, from = %active, to = %picked, "rotated stack");
        Ok(Outcome::Changed)
    }

    /// Close the active node and everything under it.
    ///
    /// Focus moves to the new top of its stack, or to the parent when the
    /// stack is gone. The root cannot be closed.
    pub fn navigate_back(&mut self) -> Result<Outcome, PanelFlowError> {
        let active = self.tree.active();
        let Some(parent_id) = self.tree.node(active)?.parent() else {
            debug!("back navigation on root ignored");
            return Ok(Outcome::Unchanged);
        };

        // locate before releasing anything so a broken tree is left as found
        let (si, pos) = self
            .tree
            .node(parent_id)?
            .locate_child(active)
            .ok_or_else(|| {
                PanelFlowError::invariant(format!(
                    "node {} is missing from its parent's stacks",
                    active
                ))
            })?;

        let children: Vec<NodeId> = {
            let node = self.tree.node_mut(active)?;
            std::mem::take(&mut node.children_stacks)
                .into_iter()
                .flat_map(|stack| stack.nodes)
                .collect()
        };
        for child in children {
            self.tree.release(child);
        }

        let parent = self.tree.node_mut(parent_id)?;
        parent.children_stacks[si].nodes.remove(pos);
        let next = match parent.children_stacks[si].top() {
            Some(top) => top,
            None => {
                parent.remove_stack_at(si);
                parent_id
            }
        };

        // move the flag before the old node disappears so exactly one stays set
        self.tree.set_active(next)?;
        self.tree.release(active);

        debug!(closed = %active, focus = %next, "navigated back");
        Ok(Outcome::Changed)
    }

    /// Move focus one column along the current column path
    pub fn navigate_horizontal(
        &mut self,
        direction: HorizontalDirection,
    ) -> Result<Outcome, PanelFlowError> {
        let path = self.tree.column_path();
        let active = self.tree.active();
        let index = path
            .iter()
            .position(|id| *id == active)
            .ok_or_else(|| PanelFlowError::invariant("active node is not on its own path"))?;

        let new_index = match direction {
            HorizontalDirection::Next => index.checked_add(1),
            HorizontalDirection::Previous => index.checked_sub(1),
        };
        let Some(target) = new_index.and_then(|i| path.get(i).copied()) else {
            debug!(?direction, index, len = path.len(), "horizontal navigation out of range");
            return Ok(Outcome::Unchanged);
        };

        self.tree.set_active(target)?;
        debug!(?direction, from = %active, to = %target, "moved column");
        Ok(Outcome::Changed)
    }
}
