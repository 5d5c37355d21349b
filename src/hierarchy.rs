//! State registry and parent/child tree.
//!
//! [`StateHierarchy`] is the only writer of the tree topology. States are
//! stored in a comparer-keyed arena; parent, children and initial-child
//! links are id references into that arena, never owning pointers.
//!
//! Invariants maintained by every operation:
//! - ids are unique
//! - `parent` links and parents' `children` sets agree
//! - no state is its own ancestor
//! - an `initial_child`, when set, is a member of `children`

use crate::core::{IdMap, SharedBehavior, SharedComparer};
use crate::error::{render, MachineError, Result};
use std::fmt::Debug;

struct StateNode<S> {
    behavior: SharedBehavior,
    parent: Option<S>,
    children: Vec<S>,
    initial_child: Option<S>,
}

/// Registry of states and their tree relations.
pub struct StateHierarchy<S> {
    nodes: IdMap<S, StateNode<S>>,
    initial_state: Option<S>,
}

impl<S: Clone + Debug> StateHierarchy<S> {
    pub fn new(comparer: SharedComparer<S>) -> Self {
        Self {
            nodes: IdMap::new(comparer),
            initial_state: None,
        }
    }

    pub fn equals(&self, a: &S, b: &S) -> bool {
        self.nodes.comparer().equals(a, b)
    }

    fn node(&self, id: &S) -> Result<&StateNode<S>> {
        self.nodes.get(id).ok_or_else(|| MachineError::unknown(id))
    }

    fn node_mut(&mut self, id: &S) -> Result<&mut StateNode<S>> {
        self.nodes.get_mut(id).ok_or_else(|| MachineError::unknown(id))
    }

    pub fn state_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_state(&self, id: &S) -> bool {
        self.nodes.contains_key(id)
    }

    /// Ids of every registered state, in registration order.
    pub fn states(&self) -> Vec<S> {
        self.nodes.keys().cloned().collect()
    }

    /// Registers a state. The first state registered while no global
    /// initial state is set becomes the global initial state.
    pub fn add_state(&mut self, id: S, behavior: SharedBehavior) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(MachineError::DuplicateId { id: render(&id) });
        }
        if self.initial_state.is_none() {
            self.initial_state = Some(id.clone());
        }
        self.nodes.insert(
            id,
            StateNode {
                behavior,
                parent: None,
                children: Vec::new(),
                initial_child: None,
            },
        );
        Ok(())
    }

    /// Removes a state and every link to or from it. Its children become
    /// roots. Returns `false` if the id was not registered.
    pub fn remove_state(&mut self, id: &S) -> bool {
        let Some((removed_id, node)) = self.nodes.remove(id) else {
            return false;
        };

        if let Some(parent) = node.parent.as_ref() {
            self.detach_from(parent, &removed_id);
        }
        for child in &node.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = None;
            }
        }
        if self
            .initial_state
            .as_ref()
            .is_some_and(|initial| self.equals(initial, &removed_id))
        {
            self.initial_state = None;
        }
        true
    }

    fn detach_from(&mut self, parent: &S, child: &S) {
        let comparer = self.nodes.comparer().clone();
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node
                .children
                .retain(|existing| !comparer.equals(existing, child));
            if parent_node
                .initial_child
                .as_ref()
                .is_some_and(|initial| comparer.equals(initial, child))
            {
                parent_node.initial_child = None;
            }
        }
    }

    /// Fails if `parent -> child` cannot be added as a relation: either id
    /// is unknown, they are the same state, `child` already has another
    /// parent, or `parent` descends from `child`. An identical existing
    /// relation passes.
    pub fn check_relation(&self, parent: &S, child: &S) -> Result<()> {
        self.node(parent)?;
        let child_parent = self.node(child)?.parent.as_ref();

        if self.equals(parent, child) {
            return Err(MachineError::SelfChild { id: render(child) });
        }
        if let Some(existing) = child_parent {
            if self.equals(existing, parent) {
                return Ok(());
            }
            return Err(MachineError::ChildAlreadyHasParent {
                child: render(child),
                parent: render(existing),
            });
        }
        if self.is_ancestor_of(child, parent) {
            return Err(MachineError::CyclicRelation {
                parent: render(parent),
                child: render(child),
            });
        }
        Ok(())
    }

    /// Makes `child` an immediate child of `parent`.
    ///
    /// Re-adding an identical relation is a no-op. The first child a parent
    /// receives while childless becomes its initial child.
    pub fn add_child_to(&mut self, parent: &S, child: &S) -> Result<()> {
        self.check_relation(parent, child)?;
        if self.are_immediate_parent_and_child(parent, child) {
            return Ok(());
        }

        let parent_node = self.node_mut(parent)?;
        if parent_node.children.is_empty() {
            parent_node.initial_child = Some(child.clone());
        }
        parent_node.children.push(child.clone());
        self.node_mut(child)?.parent = Some(parent.clone());
        Ok(())
    }

    /// Detaches `child` from its parent, making it a root. Returns `false`
    /// if it had no parent.
    pub fn remove_child_from_parent(&mut self, child: &S) -> Result<bool> {
        let Some(parent) = self.node(child)?.parent.clone() else {
            return Ok(false);
        };
        self.detach_from(&parent, child);
        self.node_mut(child)?.parent = None;
        Ok(true)
    }

    pub fn set_initial_state_to(&mut self, parent: &S, child: &S) -> Result<()> {
        self.node(child)?;
        if !self.are_immediate_parent_and_child(parent, child) {
            self.node(parent)?;
            return Err(MachineError::NotAChild {
                parent: render(parent),
                child: render(child),
            });
        }
        self.node_mut(parent)?.initial_child = Some(child.clone());
        Ok(())
    }

    pub fn initial_state_of(&self, parent: &S) -> Result<Option<S>> {
        Ok(self.node(parent)?.initial_child.clone())
    }

    /// Global initial state: where a start descent begins.
    pub fn initial_state(&self) -> Option<&S> {
        self.initial_state.as_ref()
    }

    pub fn set_initial_state(&mut self, id: &S) -> Result<()> {
        self.node(id)?;
        self.initial_state = Some(id.clone());
        Ok(())
    }

    pub fn behavior_of(&self, id: &S) -> Result<SharedBehavior> {
        Ok(self.node(id)?.behavior.clone())
    }

    /// States without a parent, in registration order. Empty when there are
    /// no states at all.
    pub fn roots(&self) -> Vec<S> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn immediate_children_of(&self, id: &S) -> Result<Vec<S>> {
        Ok(self.node(id)?.children.clone())
    }

    pub fn child_count_of(&self, id: &S) -> Result<usize> {
        Ok(self.node(id)?.children.len())
    }

    /// Parent of `id`, or `id` itself when it is a root.
    pub fn parent_of(&self, id: &S) -> Result<S> {
        let node = self.node(id)?;
        Ok(node.parent.clone().unwrap_or_else(|| id.clone()))
    }

    pub fn are_immediate_parent_and_child(&self, parent: &S, child: &S) -> bool {
        self.nodes
            .get(child)
            .and_then(|node| node.parent.as_ref())
            .is_some_and(|existing| self.equals(existing, parent))
    }

    /// Whether following initial-child links down from `ancestor` reaches
    /// `id`. A state is not its own initial descendant.
    pub fn are_parent_and_initial_descendant_at_any_level(&self, ancestor: &S, id: &S) -> bool {
        let mut cursor = self
            .nodes
            .get(ancestor)
            .and_then(|node| node.initial_child.as_ref());
        while let Some(current) = cursor {
            if self.equals(current, id) {
                return true;
            }
            cursor = self
                .nodes
                .get(current)
                .and_then(|node| node.initial_child.as_ref());
        }
        false
    }

    /// Strict ancestry: whether `ancestor` lies above `id`.
    pub fn is_ancestor_of(&self, ancestor: &S, id: &S) -> bool {
        let mut cursor = self.nodes.get(id).and_then(|node| node.parent.as_ref());
        while let Some(current) = cursor {
            if self.equals(current, ancestor) {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|node| node.parent.as_ref());
        }
        false
    }

    /// Strict ancestors of `id`, root first.
    pub fn ancestors_of(&self, id: &S) -> Result<Vec<S>> {
        let mut chain = Vec::new();
        let mut cursor = self.node(id)?.parent.clone();
        while let Some(current) = cursor {
            cursor = self.node(&current)?.parent.clone();
            chain.push(current);
        }
        chain.reverse();
        Ok(chain)
    }
}
