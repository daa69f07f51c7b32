// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;
use std::fmt;

/// Opaque identity of a graph node.
///
/// Two nodes are the same node iff their ids are equal; nothing about
/// the node's name or emitted text takes part in the comparison.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Opaque identity of a node collection (an ordered list of nodes that
/// gets materialized as a single array).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(u32);

impl NodeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl CollectionId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Mints node and collection identities at graph-construction time.
///
/// Every call hands out a fresh id, even when the same name is passed
/// twice.  Ids start at 1 so that 0 never shows up in a well-formed
/// graph.  The name is only kept around for diagnostics.
pub struct IdAllocator {
    names: HashMap<u32, String>,
    next_node: u32,
    next_collection: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
            next_node: 1,
            next_collection: 1,
        }
    }

    pub fn node(&mut self, name: &str) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        self.names.insert(id, name.to_string());
        NodeId(id)
    }

    pub fn collection(&mut self) -> CollectionId {
        let id = self.next_collection;
        self.next_collection += 1;
        CollectionId(id)
    }

    /// Look up the name a node id was minted for.
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.names.get(&id.0).map(|s| s.as_str())
    }

    pub fn node_count(&self) -> usize {
        (self.next_node - 1) as usize
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
