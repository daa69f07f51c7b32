// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Flattens a DAG of computation nodes into one sequential function body.

#![forbid(unsafe_code)]

pub mod common {
    // Re-export all common types from codesquash-core
    pub use codesquash_core::common::*;
    pub use codesquash_core::ids::*;
}
pub use codesquash_core::{codegen_err, graph_err};

mod config;
mod context;
mod node;
pub mod nodes;
mod sizes;
mod squash;

pub use self::common::{CollectionId, Error, ErrorCode, ErrorKind, IdAllocator, NodeId, Result};
pub use self::config::SquashConfig;
pub use self::context::{CallArg, LoopScope, SquashContext, format_float};
pub use self::node::{Node, NodeKind, NodeList, NodeRef, depends_on};
pub use self::sizes::OutputSizes;
pub use self::squash::{ObservableSlot, SquashedCode, squash};
