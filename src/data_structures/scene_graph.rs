//! Scene graph and hierarchical scene organization.
//!
//! Nodes and drawables live in two arenas owned by [`SceneGraph`] and refer
//! to each other by id. A node knows its parent only as an id, so there is no
//! ownership cycle. Nodes can only be created below an existing node, which
//! keeps the graph acyclic; the root is the only node without a parent.

use crate::{
    data_structures::instance::InstancedDrawable,
    error::{ResourceError, ResourceKind},
    render::Backend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableId(usize);

impl DrawableId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    drawables: Vec<DrawableId>,
}

impl SceneNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn drawables(&self) -> &[DrawableId] {
        &self.drawables
    }
}

pub struct SceneGraph<B: Backend> {
    nodes: Vec<SceneNode>,
    drawables: Vec<InstancedDrawable<B>>,
    placements: Vec<Option<NodeId>>,
}

impl<B: Backend> Default for SceneGraph<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> SceneGraph<B> {
    pub fn new() -> Self {
        Self {
            nodes: vec![SceneNode::default()],
            drawables: Vec::new(),
            placements: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Creates an empty node below `parent`.
    pub fn add_node(&mut self, parent: NodeId) -> Result<NodeId, ResourceError> {
        let id = NodeId(self.nodes.len());
        let parent_node = self
            .nodes
            .get_mut(parent.0)
            .ok_or_else(|| missing(ResourceKind::SceneNode, parent.0))?;
        parent_node.children.push(id);
        self.nodes.push(SceneNode {
            parent: Some(parent),
            ..Default::default()
        });
        Ok(id)
    }

    /// Takes ownership of `drawable` without placing it in the tree.
    pub fn insert_drawable(&mut self, drawable: InstancedDrawable<B>) -> DrawableId {
        self.drawables.push(drawable);
        self.placements.push(None);
        DrawableId(self.drawables.len() - 1)
    }

    /// Attaches a drawable to `node`. A drawable can only be placed once.
    pub fn place(&mut self, node: NodeId, drawable: DrawableId) -> Result<(), ResourceError> {
        let placement = self
            .placements
            .get_mut(drawable.0)
            .ok_or_else(|| missing(ResourceKind::Drawable, drawable.0))?;
        if placement.is_some() {
            return Err(ResourceError::Duplicate {
                kind: ResourceKind::Drawable,
                name: format!("#{}", drawable.0),
            });
        }
        let target = self
            .nodes
            .get_mut(node.0)
            .ok_or_else(|| missing(ResourceKind::SceneNode, node.0))?;
        target.drawables.push(drawable);
        *placement = Some(node);
        Ok(())
    }

    pub fn placement(&self, drawable: DrawableId) -> Option<NodeId> {
        self.placements.get(drawable.0).copied().flatten()
    }

    pub fn drawable(&self, id: DrawableId) -> Option<&InstancedDrawable<B>> {
        self.drawables.get(id.0)
    }

    pub fn drawable_mut(&mut self, id: DrawableId) -> Option<&mut InstancedDrawable<B>> {
        self.drawables.get_mut(id.0)
    }

    pub(crate) fn drawable_or_err(
        &mut self,
        id: DrawableId,
    ) -> Result<&mut InstancedDrawable<B>, ResourceError> {
        self.drawables
            .get_mut(id.0)
            .ok_or_else(|| missing(ResourceKind::Drawable, id.0))
    }

    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    /// Placed drawables in draw order: level by level, children in insertion order.
    pub fn breadth_first(&self) -> Vec<DrawableId> {
        let mut order = Vec::new();
        let mut frontier = std::collections::VecDeque::from([self.root()]);
        while let Some(id) = frontier.pop_front() {
            if let Some(node) = self.node(id) {
                order.extend_from_slice(&node.drawables);
                frontier.extend(node.children.iter().copied());
            }
        }
        order
    }
}

fn missing(kind: ResourceKind, index: usize) -> ResourceError {
    ResourceError::Lookup {
        kind,
        name: format!("#{}", index),
    }
}
