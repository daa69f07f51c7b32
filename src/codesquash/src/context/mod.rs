// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The code squashing context.
//!
//! A `SquashContext` lives for exactly one code generation pass.  Nodes
//! call back into it from their `translate` hooks: they look up the
//! results of their dependencies with `get_result` (which lowers a
//! dependency on first use), and register their own result with one of
//! the `add_*result` methods.  When the head node has been lowered,
//! `assemble_code` consumes the context and produces the function body.

use std::collections::{BTreeMap, HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::common::{CollectionId, NodeId, Result, make_valid_var_name};
use crate::config::SquashConfig;
use crate::node::Node;
use crate::sizes::OutputSizes;
use crate::{codegen_err, graph_err};

mod array;
mod call;
mod scope;

pub use self::call::{CallArg, format_float};
pub use self::scope::LoopScope;
use self::scope::LoopFrame;

lazy_static! {
    static ref IDENT: Regex = Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*").unwrap();
}

/// A registered result, together with the serial of the innermost loop
/// whose body it is confined to (`None` for the function scope).
struct Cached {
    expr: String,
    scope: Option<usize>,
}

pub struct SquashContext {
    config: SquashConfig,
    output_sizes: OutputSizes,
    /// Map of node ids to their result strings.
    node_names: HashMap<NodeId, Cached>,
    /// Nodes whose translate hook is on the call stack.
    translating: HashSet<NodeId>,
    /// Offsets of the vector observables into the observable buffer.
    vec_obs_indices: BTreeMap<NodeId, usize>,
    /// Array names handed out by `save_list_as_array`.
    list_names: HashMap<CollectionId, Cached>,
    /// Block of code that is placed before the rest of the function body.
    global_scope: String,
    /// The squashed code body.
    code: String,
    /// Open loops, innermost last.
    loops: Vec<LoopFrame>,
    next_loop_serial: usize,
    /// Index to get unique names for temporary variables.
    tmp_var_idx: usize,
    /// For identifiers declared inside loops (loop indices included), the
    /// number of enclosing loops they need.
    binding_depths: HashMap<String, usize>,
}

impl SquashContext {
    pub fn new(output_sizes: OutputSizes) -> Self {
        Self::with_config(output_sizes, SquashConfig::default())
    }

    pub fn with_config(output_sizes: OutputSizes, config: SquashConfig) -> Self {
        SquashContext {
            config,
            output_sizes,
            node_names: HashMap::new(),
            translating: HashSet::new(),
            vec_obs_indices: BTreeMap::new(),
            list_names: HashMap::new(),
            global_scope: String::new(),
            code: String::new(),
            loops: Vec::new(),
            next_loop_serial: 0,
            tmp_var_idx: 0,
            binding_depths: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SquashConfig {
        &self.config
    }

    /// Figure out the output size of a node: the size of the vector
    /// observable it depends on, or 1 if it doesn't depend on any or is a
    /// reducer node.
    pub fn output_size(&self, id: NodeId) -> usize {
        self.output_sizes.get(id)
    }

    /// Number of currently open loops.
    pub fn loop_depth(&self) -> usize {
        self.loops.len()
    }

    /// Register `expr` as the result of `node`, verbatim.
    pub fn add_result(&mut self, node: &dyn Node, expr: &str) -> Result<()> {
        self.add_result_for_id(node.id(), expr)
    }

    /// Register `expr` for an identity directly, e.g. to bind an entry
    /// parameter before lowering starts.
    pub fn add_result_for_id(&mut self, id: NodeId, expr: &str) -> Result<()> {
        if let Some(existing) = self.node_names.get(&id) {
            return codegen_err!(
                DuplicateResult,
                format!(
                    "{id} already has result '{}', refusing '{expr}'",
                    existing.expr
                )
            );
        }
        let scope = self.scope_at(self.dependency_depth(expr));
        trace!(%id, expr, "add result");
        self.node_names.insert(
            id,
            Cached {
                expr: expr.to_owned(),
                scope,
            },
        );
        Ok(())
    }

    /// Register the result of `node`, declaring a temporary named after
    /// the node unless the expression is trivial enough to inline.
    pub fn add_temp_result(&mut self, node: &dyn Node, expr: &str) -> Result<()> {
        if self.config.inline_trivial_results && is_trivial(expr) {
            return self.add_result(node, expr);
        }
        let name = format!("{}_{}", make_valid_var_name(node.name()), self.next_tmp_idx());
        let name = self.save_as_temp(node, expr, Some(&name));
        self.add_result(node, &name)
    }

    /// Get the result of `node`, lowering it first if this is the first
    /// time anyone asked.
    pub fn get_result(&mut self, node: &dyn Node) -> Result<String> {
        let id = node.id();
        if let Some(found) = self.node_names.get(&id) {
            trace!(%id, node = node.name(), "result cache hit");
            return Ok(found.expr.clone());
        }

        if !self.translating.insert(id) {
            return graph_err!(
                CircularDependency,
                format!("'{}' ({id}) depends on itself", node.name())
            );
        }
        let translated = node.translate(self);
        self.translating.remove(&id);
        translated?;

        match self.node_names.get(&id) {
            Some(found) => Ok(found.expr.clone()),
            None => graph_err!(
                UnresolvableNode,
                format!("translating '{}' ({id}) registered no result", node.name())
            ),
        }
    }

    /// Look up a result without any way to produce it.
    pub fn get_result_by_id(&self, id: NodeId) -> Result<String> {
        match self.node_names.get(&id) {
            Some(found) => Ok(found.expr.clone()),
            None => graph_err!(UnresolvableNode, format!("no result for {id}")),
        }
    }

    pub fn has_result(&self, id: NodeId) -> bool {
        self.node_names.contains_key(&id)
    }

    /// Register `id` as a vector observable starting at offset `idx` of
    /// the observable buffer.  Its result only exists inside loops.
    pub fn add_vec_obs(&mut self, id: NodeId, idx: usize) -> Result<()> {
        if self.vec_obs_indices.contains_key(&id) {
            return codegen_err!(DuplicateVectorObservable, format!("{id}"));
        }
        self.vec_obs_indices.insert(id, idx);
        Ok(())
    }

    pub fn get_tmp_var_name(&mut self) -> String {
        let idx = self.next_tmp_idx();
        format!("{}{idx}", self.config.temp_prefix)
    }

    fn next_tmp_idx(&mut self) -> usize {
        let idx = self.tmp_var_idx;
        self.tmp_var_idx += 1;
        idx
    }

    /// Declare a variable holding `value` and return its name.
    ///
    /// The declaration goes to the current loop body, or in front of the
    /// outermost enclosing loop it does not depend on.
    pub fn save_as_temp(&mut self, node: &dyn Node, value: &str, name: Option<&str>) -> String {
        let name = match name {
            Some(name) => name.to_owned(),
            None => self.get_tmp_var_name(),
        };

        let mut depth = self.dependency_depth(value);
        if depth == 0 && self.output_size(node.id()) > 1 {
            // vector valued but nothing loop bound in the text: keep it
            // where it was asked for
            depth = self.loops.len();
        }

        let decl = format!("const {} {name} = {value};\n", self.config.float_type);
        let depth = self.place(&decl, depth);
        self.bind(&name, depth);
        name
    }

    /// Declare a mutable variable initialized to `init` at the current
    /// position.  Never hoisted, since it is about to be written to.
    pub fn declare_accumulator(&mut self, init: &str) -> String {
        let name = self.get_tmp_var_name();
        let depth = self.loops.len();
        let decl = format!("{} {name} = {init};\n", self.config.float_type);
        self.place(&decl, depth);
        self.bind(&name, depth);
        name
    }

    /// Append raw statements to the body.  Scope independent statements
    /// are hoisted like loop-invariant temporaries.
    pub fn add_to_code_body(&mut self, text: &str, scope_independent: bool) {
        let depth = if scope_independent {
            self.dependency_depth(text)
        } else {
            self.loops.len()
        };
        self.place(text, depth);
    }

    /// Append verbatim text in front of the function body.  No
    /// deduplication happens here.
    pub fn add_to_global_scope(&mut self, text: &str) {
        self.global_scope.push_str(text);
    }

    /// Glue the global scope, the body and a return statement together.
    pub fn assemble_code(self, return_expr: &str) -> Result<String> {
        if !self.loops.is_empty() {
            return codegen_err!(
                UnclosedLoop,
                format!("{} loop(s) still open", self.loops.len())
            );
        }
        let mut out =
            String::with_capacity(self.global_scope.len() + self.code.len() + return_expr.len() + 10);
        out.push_str(&self.global_scope);
        out.push_str(&self.code);
        out.push_str("return ");
        out.push_str(return_expr);
        out.push_str(";\n");
        Ok(out)
    }

    /// The number of innermost open loops `text` cannot be moved out of.
    fn dependency_depth(&self, text: &str) -> usize {
        IDENT
            .find_iter(text)
            .filter_map(|m| self.binding_depths.get(m.as_str()).copied())
            .max()
            .unwrap_or(0)
            .min(self.loops.len())
    }

    fn bind(&mut self, ident: &str, depth: usize) {
        if depth == 0 {
            self.binding_depths.remove(ident);
            return;
        }
        self.binding_depths.insert(ident.to_owned(), depth);
        self.loops[depth - 1].bound.push(ident.to_owned());
    }

    fn scope_at(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            None
        } else {
            Some(self.loops[depth - 1].serial)
        }
    }
}

/// Whether an expression is a bare name, literal or indexed access, with
/// no operators outside of index brackets.
pub(crate) fn is_trivial(expr: &str) -> bool {
    let expr = expr.trim();
    let numeric = expr.starts_with(|c: char| c.is_ascii_digit() || c == '.');
    let mut bracket_depth = 0usize;
    let mut prev = ' ';
    for c in expr.chars() {
        match c {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            _ if bracket_depth > 0 => {}
            // exponent sign of a literal like 1e-07
            '-' | '+' if numeric && (prev == 'e' || prev == 'E') => {}
            '(' | ')' | '+' | '-' | '*' | '/' | '%' | ':' | '?' | '<' | '>' | '=' | '!' | '&'
            | '|' | ',' | ' ' => return false,
            _ => {}
        }
        prev = c;
    }
    !expr.is_empty()
}
