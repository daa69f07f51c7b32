// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::common::{Error, ErrorCode, ErrorKind, NodeId, Result};
use crate::config::SquashConfig;
use crate::context::SquashContext;
use crate::node::{Node, NodeKind};
use crate::sizes::OutputSizes;

/// Where an observable's data lives in the observable buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObservableSlot {
    pub name: String,
    pub offset: usize,
    pub size: usize,
}

/// The outcome of squashing one model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SquashedCode {
    pub function_name: String,
    /// Global declarations, body and return statement.
    pub code: String,
    /// `code` wrapped into a complete function definition.
    pub function: String,
    /// Parameter names, in the order of the parameter buffer.
    pub params: Vec<String>,
    pub observables: Vec<ObservableSlot>,
}

impl SquashedCode {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| Error::new(ErrorKind::Codegen, ErrorCode::Generic, Some(err.to_string())))
    }
}

/// Every node reachable from `head`, each once, in depth first pre-order.
fn collect_nodes(head: &dyn Node) -> Vec<&dyn Node> {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut order = vec![];
    let mut stack = vec![head];
    while let Some(node) = stack.pop() {
        if !seen.insert(node.id()) {
            continue;
        }
        order.push(node);
        // reversed so that the first dependency is visited first
        stack.extend(node.dependencies().into_iter().rev());
    }
    order
}

/// Lower the graph below `head` into a function
/// `double func(double *params, double const *obs)`.
///
/// Parameters are bound to the parameter buffer and observables to the
/// observable buffer in the order they are first reached from `head`.
pub fn squash(head: &dyn Node, sizes: OutputSizes, config: SquashConfig) -> Result<SquashedCode> {
    let nodes = collect_nodes(head);
    let mut ctx = SquashContext::with_config(sizes, config.clone());

    let mut params = vec![];
    let mut observables = vec![];
    let mut offset = 0;
    for node in nodes.iter().copied() {
        match node.kind() {
            NodeKind::Parameter => {
                let expr = format!("{}[{}]", config.params_array, params.len());
                ctx.add_result(node, &expr)?;
                params.push(node.name().to_owned());
            }
            NodeKind::Observable => {
                let size = ctx.output_size(node.id());
                if size == 1 {
                    ctx.add_result(node, &format!("{}[{offset}]", config.obs_array))?;
                } else {
                    ctx.add_vec_obs(node.id(), offset)?;
                }
                observables.push(ObservableSlot {
                    name: node.name().to_owned(),
                    offset,
                    size,
                });
                offset += size;
            }
            NodeKind::Derived => {}
        }
    }

    let return_expr = ctx.get_result(head)?;
    let code = ctx.assemble_code(&return_expr)?;

    let ty = &config.float_type;
    let mut function = format!(
        "{ty} {}({ty} *{}, {ty} const *{})\n{{\n",
        config.function_name, config.params_array, config.obs_array
    );
    for line in code.lines() {
        if !line.is_empty() {
            function.push_str(&config.indent);
        }
        function.push_str(line);
        function.push('\n');
    }
    function.push_str("}\n");

    debug!(
        head = head.name(),
        n_nodes = nodes.len(),
        n_params = params.len(),
        n_observables = observables.len(),
        "squashed model"
    );

    Ok(SquashedCode {
        function_name: config.function_name.clone(),
        code,
        function,
        params,
        observables,
    })
}
