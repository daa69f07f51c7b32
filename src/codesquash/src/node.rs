// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashSet;
use std::rc::Rc;

use crate::common::{CollectionId, NodeId, Result};
use crate::context::SquashContext;
use crate::graph_err;

/// How the driver binds a node before lowering starts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A free scalar the generated function receives as a parameter.
    Parameter,
    /// A data column; vectors are iterated over, scalars read directly.
    Observable,
    /// Anything computed from other nodes.
    Derived,
}

/// A node of the computation graph, as seen by the code generator.
///
/// The mathematical meaning of a node lives entirely in its `translate`
/// hook: it asks the context for the results of its dependencies and
/// registers its own result, exactly once per pass.
pub trait Node {
    fn id(&self) -> NodeId;

    fn name(&self) -> &str;

    fn kind(&self) -> NodeKind {
        NodeKind::Derived
    }

    /// Direct dependencies, including members of any collections the
    /// node reads.
    fn dependencies(&self) -> Vec<&dyn Node> {
        vec![]
    }

    /// Reducer nodes collapse a vector input into a scalar.
    fn is_reducer(&self) -> bool {
        false
    }

    /// Emit the code computing this node.  Must end with a result for
    /// `self.id()` registered in `ctx`.
    fn translate(&self, ctx: &mut SquashContext) -> Result<()> {
        let _ = ctx;
        graph_err!(
            NotTranslatable,
            format!("'{}' has no code generation support", self.name())
        )
    }
}

pub type NodeRef = Rc<dyn Node>;

/// Whether `node` is `target` or (transitively) depends on it.
pub fn depends_on(node: &dyn Node, target: NodeId) -> bool {
    depends_on_through(node, target, &|_| true)
}

/// Like `depends_on`, but only looks at the dependencies of nodes for
/// which `descend` holds.
pub(crate) fn depends_on_through(
    node: &dyn Node,
    target: NodeId,
    descend: &dyn Fn(&dyn Node) -> bool,
) -> bool {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.id() == target {
            return true;
        }
        if seen.insert(n.id()) && descend(n) {
            stack.extend(n.dependencies());
        }
    }
    false
}

/// An ordered collection of nodes with its own identity, lowered to a
/// single array declaration however often it is referenced.
pub struct NodeList {
    id: CollectionId,
    members: Vec<NodeRef>,
}

impl NodeList {
    pub fn new(id: CollectionId, members: Vec<NodeRef>) -> Self {
        NodeList { id, members }
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    pub fn members(&self) -> &[NodeRef] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Node> {
        self.members.iter().map(|m| m.as_ref())
    }
}
