// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;

use crate::common::NodeId;

/// Cardinality of every node's output, as computed by a size-inference
/// pass before code generation starts.
///
/// The table is frozen once built.  Nodes missing from it are scalars.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputSizes {
    sizes: HashMap<NodeId, usize>,
}

impl OutputSizes {
    pub fn new(sizes: HashMap<NodeId, usize>) -> Self {
        OutputSizes { sizes }
    }

    /// The output size of a node: the length of the vector observable it
    /// depends on, or 1 if it doesn't depend on any or is a reducer.
    pub fn get(&self, id: NodeId) -> usize {
        self.sizes.get(&id).copied().unwrap_or(1)
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl FromIterator<(NodeId, usize)> for OutputSizes {
    fn from_iter<I: IntoIterator<Item = (NodeId, usize)>>(iter: I) -> Self {
        OutputSizes {
            sizes: iter.into_iter().collect(),
        }
    }
}

#[test]
fn test_output_size_defaults_to_scalar() {
    use crate::common::IdAllocator;

    let mut ids = IdAllocator::new();
    let x = ids.node("x");
    let y = ids.node("y");
    let sizes: OutputSizes = [(x, 5)].into_iter().collect();

    assert_eq!(5, sizes.get(x));
    assert_eq!(1, sizes.get(y));
    assert_eq!(1, sizes.len());
    assert!(OutputSizes::default().is_empty());
}
