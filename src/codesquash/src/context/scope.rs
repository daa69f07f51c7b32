// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::ops::{Deref, DerefMut};

use smallvec::SmallVec;
use tracing::{debug, error, warn};

use crate::codegen_err;
use crate::common::{NodeId, Result};
use crate::node::{Node, depends_on, depends_on_through};

use super::{Cached, SquashContext};

pub(super) struct LoopFrame {
    pub(super) serial: usize,
    index: String,
    vars: SmallVec<[NodeId; 4]>,
    /// Position in the body right in front of the loop's opening line.
    bookmark: usize,
    /// Declarations that go to `bookmark` once the loop is closed.
    staged: String,
    /// Identifiers declared in this loop's body.
    pub(super) bound: Vec<String>,
}

/// An open loop over one or more vector observables.
///
/// To wrap code in a loop, lower it through the scope returned by
/// `SquashContext::begin_loop`:
///
/// ```ignore
/// let mut scope = ctx.begin_loop(self)?;
/// let x = scope.get_result(&*self.input)?;
/// scope.add_to_code_body(&format!("{acc} += {x};\n"), false);
/// scope.end()?;
/// ```
///
/// The loop is closed (and loop-invariant code hoisted out of it) when
/// the scope is ended or dropped, whichever comes first, so early returns
/// through `?` leave the context consistent.
pub struct LoopScope<'a> {
    ctx: &'a mut SquashContext,
    serial: usize,
    closed: bool,
}

impl LoopScope<'_> {
    /// Name of this loop's index variable.
    pub fn index(&self) -> &str {
        self.frame().map(|f| f.index.as_str()).unwrap_or_default()
    }

    /// The vector observables iterated together by this loop.
    pub fn vars(&self) -> &[NodeId] {
        self.frame().map(|f| f.vars.as_slice()).unwrap_or_default()
    }

    /// Close the loop, reporting problems instead of just logging them.
    pub fn end(mut self) -> Result<()> {
        self.closed = true;
        self.ctx.end_loop(self.serial)
    }

    fn frame(&self) -> Option<&LoopFrame> {
        self.ctx.loops.iter().find(|f| f.serial == self.serial)
    }
}

impl Deref for LoopScope<'_> {
    type Target = SquashContext;

    fn deref(&self) -> &SquashContext {
        &*self.ctx
    }
}

impl DerefMut for LoopScope<'_> {
    fn deref_mut(&mut self) -> &mut SquashContext {
        &mut *self.ctx
    }
}

impl Drop for LoopScope<'_> {
    fn drop(&mut self) {
        if !self.closed
            && let Err(err) = self.ctx.end_loop(self.serial)
        {
            error!(%err, serial = self.serial, "failed to close loop scope");
        }
    }
}

impl SquashContext {
    /// Open a loop over every registered vector observable `node` depends
    /// on that isn't already being iterated by an enclosing loop.
    ///
    /// Dependencies are not followed through reducers whose output is a
    /// scalar: whatever they iterate over happens in their own loop.
    pub fn begin_loop(&mut self, node: &dyn Node) -> Result<LoopScope<'_>> {
        let root = node.id();
        let vars: SmallVec<[NodeId; 4]> = self
            .vec_obs_indices
            .keys()
            .copied()
            .filter(|id| !self.is_iterated(*id))
            .filter(|id| {
                depends_on_through(node, *id, &|n| {
                    n.id() == root || !n.is_reducer() || self.output_size(n.id()) > 1
                })
            })
            .collect();

        if vars.is_empty() {
            return codegen_err!(
                NoVectorObservables,
                format!("'{}' doesn't depend on a vector observable", node.name())
            );
        }
        self.open_loop(node.name(), vars)
    }

    /// Open a loop over an explicit set of vector observables, e.g. the
    /// inner loop of a node that iterates two datasets against each other.
    pub fn begin_loop_over(&mut self, label: &str, vars: &[NodeId]) -> Result<LoopScope<'_>> {
        if vars.is_empty() {
            return codegen_err!(NoVectorObservables, format!("empty loop '{label}'"));
        }
        if let Some(id) = vars.iter().find(|id| !self.vec_obs_indices.contains_key(*id)) {
            return codegen_err!(
                NoVectorObservables,
                format!("{id} in loop '{label}' is not a vector observable")
            );
        }
        if let Some(id) = vars.iter().find(|id| self.is_iterated(**id)) {
            return codegen_err!(
                DuplicateResult,
                format!("{id} in loop '{label}' is already iterated by an enclosing loop")
            );
        }
        self.open_loop(label, vars.iter().copied().collect())
    }

    fn is_iterated(&self, id: NodeId) -> bool {
        self.loops.iter().any(|l| l.vars.contains(&id))
    }

    fn open_loop(&mut self, label: &str, vars: SmallVec<[NodeId; 4]>) -> Result<LoopScope<'_>> {
        let depth = self.loops.len();
        let index = format!("{}{}", self.config.loop_index_prefix, depth);

        // the first observable decides the trip count, the rest must agree
        let first = vars[0];
        let num_entries = self.output_size(first);
        if let Some(&other) = vars.iter().find(|id| self.output_size(**id) != num_entries) {
            return codegen_err!(
                MismatchedLoopSizes,
                format!(
                    "{first} has {num_entries} entries but {other} has {}",
                    self.output_size(other)
                )
            );
        }
        if num_entries == 0 {
            warn!(label, "loop over an empty vector observable");
        }
        if let Some(id) = vars.iter().find(|id| self.node_names.contains_key(*id)) {
            return codegen_err!(
                DuplicateResult,
                format!("vector observable {id} already has a result outside of a loop")
            );
        }

        let serial = self.next_loop_serial;
        self.next_loop_serial += 1;

        let bookmark = self.code.len();
        let opening = format!("for (int {index} = 0; {index} < {num_entries}; ++{index}) {{\n");
        self.code.push_str(&indent(&opening, &self.config.indent, depth));

        for id in &vars {
            let expr = format!(
                "{}[{} + {index}]",
                self.config.obs_array, self.vec_obs_indices[id]
            );
            self.node_names.insert(
                *id,
                Cached {
                    expr,
                    scope: Some(serial),
                },
            );
        }
        self.binding_depths.insert(index.clone(), depth + 1);

        debug!(label, %index, num_entries, n_vars = vars.len(), "begin loop");
        self.loops.push(LoopFrame {
            serial,
            index,
            vars,
            bookmark,
            staged: String::new(),
            bound: Vec::new(),
        });

        Ok(LoopScope {
            ctx: self,
            serial,
            closed: false,
        })
    }

    /// Run `f` inside a loop over `node`'s vector observables.  The loop
    /// is closed on every path out of `f`.
    pub fn with_loop<T>(
        &mut self,
        node: &dyn Node,
        f: impl FnOnce(&mut SquashContext) -> Result<T>,
    ) -> Result<T> {
        let mut scope = self.begin_loop(node)?;
        let body = f(&mut scope);
        let closed = scope.end();
        let value = body?;
        closed?;
        Ok(value)
    }

    /// Number of enclosing loops whose observables `node` depends on.
    /// Its value can be computed in front of every loop further in.
    pub fn loop_dependence(&self, node: &dyn Node) -> usize {
        self.loops
            .iter()
            .rposition(|f| f.vars.iter().any(|id| depends_on(node, *id)))
            .map_or(0, |k| k + 1)
    }

    /// Run `f` with only the outermost `depth` loops open.  Whatever `f`
    /// emits at that depth, loops included, lands in front of the loop
    /// that was open at `depth`.
    ///
    /// Reducers use this to compute loop-invariant sums once instead of
    /// once per iteration of the loops they are requested from.
    pub fn at_depth<T>(
        &mut self,
        depth: usize,
        f: impl FnOnce(&mut SquashContext) -> Result<T>,
    ) -> Result<T> {
        if !self.config.hoist_invariants || depth >= self.loops.len() {
            return f(self);
        }

        let detached = self.loops.split_off(depth);
        let index_depths: Vec<(String, Option<usize>)> = detached
            .iter()
            .map(|l| (l.index.clone(), self.binding_depths.get(&l.index).copied()))
            .collect();
        let body = std::mem::take(&mut self.code);

        let result = f(self);

        let hoisted = std::mem::replace(&mut self.code, body);
        let unclosed = self.loops.len().saturating_sub(depth);
        self.loops.truncate(depth);
        // loops opened by `f` reuse the index names of the detached ones
        for (index, bound) in index_depths {
            match bound {
                Some(d) => self.binding_depths.insert(index, d),
                None => self.binding_depths.remove(&index),
            };
        }
        self.loops.extend(detached);
        if unclosed > 0 {
            return codegen_err!(
                UnclosedLoop,
                format!("{unclosed} loop(s) left open while hoisted to depth {depth}")
            );
        }

        debug!(
            depth,
            n_hoisted = hoisted.lines().count(),
            "hoisting loop invariant code"
        );
        self.loops[depth].staged.push_str(&hoisted);
        result
    }

    /// Index variable of the innermost open loop.
    pub fn current_loop_index(&self) -> Option<&str> {
        self.loops.last().map(|f| f.index.as_str())
    }

    pub(super) fn end_loop(&mut self, serial: usize) -> Result<()> {
        let frame = match self.loops.pop() {
            Some(frame) if frame.serial == serial => frame,
            Some(innermost) => {
                let innermost_serial = innermost.serial;
                self.loops.push(innermost);
                return codegen_err!(
                    ScopeOrderViolation,
                    format!("closing loop #{serial} while loop #{innermost_serial} is innermost")
                );
            }
            None => {
                return codegen_err!(
                    ScopeOrderViolation,
                    format!("closing loop #{serial} with no loop open")
                );
            }
        };

        let closing = indent("}\n", &self.config.indent, self.loops.len());
        self.code.push_str(&closing);
        if !frame.staged.is_empty() {
            debug!(
                index = %frame.index,
                n_hoisted = frame.staged.lines().count(),
                "hoisting loop invariant code"
            );
            self.code.insert_str(frame.bookmark, &frame.staged);
        }

        // whatever was declared inside the loop body is gone now, including
        // the indexed accesses to the vector observables.
        self.node_names.retain(|_, r| r.scope != Some(serial));
        self.list_names.retain(|_, r| r.scope != Some(serial));
        let depth = self.loops.len() + 1;
        for ident in &frame.bound {
            if self.binding_depths.get(ident) == Some(&depth) {
                self.binding_depths.remove(ident);
            }
        }
        self.binding_depths.remove(&frame.index);

        debug!(index = %frame.index, "end loop");
        Ok(())
    }

    /// Put `stmt` into the body of the loop at `depth` (0 is the function
    /// scope), or where it was asked for if hoisting is off.  Returns the
    /// depth the statement ended up at.
    pub(super) fn place(&mut self, stmt: &str, depth: usize) -> usize {
        let current = self.loops.len();
        let depth = if self.config.hoist_invariants {
            depth.min(current)
        } else {
            current
        };
        let stmt = indent(stmt, &self.config.indent, depth);
        if depth == current {
            self.code.push_str(&stmt);
        } else {
            self.loops[depth].staged.push_str(&stmt);
        }
        depth
    }
}

fn indent(text: &str, unit: &str, depth: usize) -> String {
    if depth == 0 || unit.is_empty() {
        return text.to_owned();
    }
    let prefix = unit.repeat(depth);
    let mut out = String::with_capacity(text.len() + prefix.len());
    for line in text.split_inclusive('\n') {
        if !line.trim().is_empty() {
            out.push_str(&prefix);
        }
        out.push_str(line);
    }
    out
}

#[test]
fn test_indent() {
    assert_eq!("a;\n", indent("a;\n", "  ", 0));
    assert_eq!("    a;\n    b;\n", indent("a;\nb;\n", "  ", 2));
    assert_eq!("  a;\n\n  b;", indent("a;\n\nb;", "  ", 1));
    assert_eq!("a;\n", indent("a;\n", "", 3));
}
