// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use tracing::{debug, trace};

use crate::codegen_err;
use crate::common::Result;
use crate::node::NodeList;

use super::{Cached, SquashContext};

impl SquashContext {
    /// Declare an array holding the results of every member of `list` and
    /// return its name.  Asking again for the same collection returns the
    /// same name without emitting anything.
    pub fn save_list_as_array(&mut self, list: &NodeList, name: Option<&str>) -> Result<String> {
        if let Some(found) = self.list_names.get(&list.id()) {
            trace!(list = %list.id(), name = found.expr.as_str(), "array cache hit");
            return Ok(found.expr.clone());
        }

        let saved_name = match name {
            Some(name) => name.to_owned(),
            None => self.get_tmp_var_name(),
        };

        let mut elems = Vec::with_capacity(list.len());
        for member in list.iter() {
            elems.push(self.get_result(member)?);
        }

        // lowering a member may have led right back here
        if self.list_names.contains_key(&list.id()) {
            return codegen_err!(
                DuplicateArray,
                format!("{} was materialized while computing its members", list.id())
            );
        }

        let decl = if elems.is_empty() {
            // zero-length arrays are ill-formed
            format!("{} {saved_name}[1] = {{}};\n", self.config.float_type)
        } else {
            format!(
                "{} {saved_name}[] = {{{}}};\n",
                self.config.float_type,
                elems.join(", ")
            )
        };
        let depth = self.dependency_depth(&decl);
        let depth = self.place(&decl, depth);
        self.bind(&saved_name, depth);

        debug!(list = %list.id(), name = saved_name.as_str(), len = list.len(), "save list as array");
        let scope = self.scope_at(depth);
        self.list_names.insert(
            list.id(),
            Cached {
                expr: saved_name.clone(),
                scope,
            },
        );
        Ok(saved_name)
    }
}
