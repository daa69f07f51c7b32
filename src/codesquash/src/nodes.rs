// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! A small library of graph nodes that know how to lower themselves,
//! plus a builder to wire them together.

use std::fmt;
use std::rc::Rc;

use crate::common::{IdAllocator, NodeId, Result};
use crate::context::{CallArg, SquashContext, format_float, is_trivial};
use crate::graph_err;
use crate::node::{Node, NodeKind, NodeList, NodeRef};

pub struct Constant {
    id: NodeId,
    name: String,
    value: f64,
}

impl Node for Constant {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn translate(&self, ctx: &mut SquashContext) -> Result<()> {
        ctx.add_result(self, &format_float(self.value))
    }
}

/// A free parameter.  The driver binds it to an entry of the parameter
/// buffer; it cannot lower itself.
pub struct Parameter {
    id: NodeId,
    name: String,
}

impl Node for Parameter {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Parameter
    }

    fn translate(&self, _ctx: &mut SquashContext) -> Result<()> {
        graph_err!(
            UnresolvableNode,
            format!("parameter '{}' was never bound", self.name)
        )
    }
}

/// A data column, bound by the driver.  Vector observables only have a
/// result inside a loop iterating over them.
pub struct Observable {
    id: NodeId,
    name: String,
}

impl Node for Observable {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Observable
    }

    fn translate(&self, _ctx: &mut SquashContext) -> Result<()> {
        graph_err!(
            UnresolvableNode,
            format!(
                "observable '{}' is unbound or used outside of a loop",
                self.name
            )
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BinaryOperator::Add => "add",
            BinaryOperator::Sub => "sub",
            BinaryOperator::Mul => "mul",
            BinaryOperator::Div => "div",
        };
        write!(f, "{name}")
    }
}

pub struct BinaryOp {
    id: NodeId,
    name: String,
    op: BinaryOperator,
    lhs: NodeRef,
    rhs: NodeRef,
}

fn paren_if_necessary(expr: String) -> String {
    if is_trivial(&expr) {
        expr
    } else {
        format!("({expr})")
    }
}

impl Node for BinaryOp {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<&dyn Node> {
        vec![self.lhs.as_ref(), self.rhs.as_ref()]
    }

    fn translate(&self, ctx: &mut SquashContext) -> Result<()> {
        let lhs = paren_if_necessary(ctx.get_result(self.lhs.as_ref())?);
        let rhs = paren_if_necessary(ctx.get_result(self.rhs.as_ref())?);
        let expr = format!("{lhs} {} {rhs}", self.op.symbol());
        ctx.add_temp_result(self, &expr)
    }
}

/// An input of a [`FunctionCall`].
pub enum Input {
    Float(f64),
    Int(i64),
    Raw(String),
    Node(NodeRef),
    List(Rc<NodeList>),
}

impl Input {
    fn as_call_arg(&self) -> CallArg<'_> {
        match self {
            Input::Float(x) => CallArg::Float(*x),
            Input::Int(x) => CallArg::Int(*x),
            Input::Raw(s) => CallArg::from(s.as_str()),
            Input::Node(node) => CallArg::Node(node.as_ref()),
            Input::List(list) => CallArg::Collection(list.as_ref()),
        }
    }
}

/// A call to an externally provided function, e.g. a pdf evaluated per
/// event.
pub struct FunctionCall {
    id: NodeId,
    name: String,
    func: String,
    inputs: Vec<Input>,
}

impl Node for FunctionCall {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<&dyn Node> {
        let mut deps = vec![];
        for input in &self.inputs {
            match input {
                Input::Node(node) => deps.push(node.as_ref()),
                Input::List(list) => deps.extend(list.iter()),
                Input::Float(_) | Input::Int(_) | Input::Raw(_) => {}
            }
        }
        deps
    }

    fn translate(&self, ctx: &mut SquashContext) -> Result<()> {
        let args: Vec<CallArg> = self.inputs.iter().map(Input::as_call_arg).collect();
        let call = ctx.build_call(&self.func, &args)?;
        ctx.add_temp_result(self, &call)
    }
}

/// Sum over a collection of nodes, lowered as one array and a call to an
/// external `sum(array, n)` helper.
pub struct Addition {
    id: NodeId,
    name: String,
    list: Rc<NodeList>,
}

impl Node for Addition {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<&dyn Node> {
        self.list.iter().collect()
    }

    fn translate(&self, ctx: &mut SquashContext) -> Result<()> {
        if self.list.is_empty() {
            return ctx.add_result(self, &format_float(0.0));
        }
        let call = ctx.build_call(
            "sum",
            &[CallArg::Collection(self.list.as_ref()), self.list.len().into()],
        )?;
        ctx.add_temp_result(self, &call)
    }
}

/// Sum of a vector valued input over all of its entries.
pub struct ReduceSum {
    id: NodeId,
    name: String,
    input: NodeRef,
}

impl Node for ReduceSum {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<&dyn Node> {
        vec![self.input.as_ref()]
    }

    fn is_reducer(&self) -> bool {
        true
    }

    fn translate(&self, ctx: &mut SquashContext) -> Result<()> {
        if ctx.output_size(self.input.id()) <= 1 {
            let input = ctx.get_result(self.input.as_ref())?;
            return ctx.add_result(self, &input);
        }

        // the sum only has to be recomputed per iteration of the loops
        // its input actually depends on
        let depth = ctx.loop_dependence(self.input.as_ref());
        let acc = ctx.at_depth(depth, |ctx| {
            let acc = ctx.declare_accumulator(&format_float(0.0));
            let mut scope = ctx.begin_loop(self)?;
            let input = scope.get_result(self.input.as_ref())?;
            scope.add_to_code_body(&format!("{acc} += {input};\n"), false);
            scope.end()?;
            Ok(acc)
        })?;

        ctx.add_result(self, &acc)
    }
}

/// Wires nodes together, minting a fresh identity for each one.
pub struct GraphBuilder {
    ids: IdAllocator,
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder {
            ids: IdAllocator::new(),
        }
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// For minting ids of custom nodes living in the same graph.
    pub fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    pub fn constant(&mut self, value: f64) -> NodeRef {
        let name = format_float(value);
        Rc::new(Constant {
            id: self.ids.node(&name),
            name,
            value,
        })
    }

    pub fn parameter(&mut self, name: &str) -> NodeRef {
        Rc::new(Parameter {
            id: self.ids.node(name),
            name: name.to_owned(),
        })
    }

    pub fn observable(&mut self, name: &str) -> NodeRef {
        Rc::new(Observable {
            id: self.ids.node(name),
            name: name.to_owned(),
        })
    }

    pub fn binary(&mut self, op: BinaryOperator, lhs: &NodeRef, rhs: &NodeRef) -> NodeRef {
        let name = op.to_string();
        Rc::new(BinaryOp {
            id: self.ids.node(&name),
            name,
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        })
    }

    pub fn add(&mut self, lhs: &NodeRef, rhs: &NodeRef) -> NodeRef {
        self.binary(BinaryOperator::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: &NodeRef, rhs: &NodeRef) -> NodeRef {
        self.binary(BinaryOperator::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: &NodeRef, rhs: &NodeRef) -> NodeRef {
        self.binary(BinaryOperator::Mul, lhs, rhs)
    }

    pub fn div(&mut self, lhs: &NodeRef, rhs: &NodeRef) -> NodeRef {
        self.binary(BinaryOperator::Div, lhs, rhs)
    }

    pub fn call(&mut self, name: &str, func: &str, inputs: Vec<Input>) -> NodeRef {
        Rc::new(FunctionCall {
            id: self.ids.node(name),
            name: name.to_owned(),
            func: func.to_owned(),
            inputs,
        })
    }

    pub fn list(&mut self, members: &[NodeRef]) -> Rc<NodeList> {
        Rc::new(NodeList::new(self.ids.collection(), members.to_vec()))
    }

    pub fn addition(&mut self, name: &str, list: &Rc<NodeList>) -> NodeRef {
        Rc::new(Addition {
            id: self.ids.node(name),
            name: name.to_owned(),
            list: list.clone(),
        })
    }

    pub fn reduce_sum(&mut self, name: &str, input: &NodeRef) -> NodeRef {
        Rc::new(ReduceSum {
            id: self.ids.node(name),
            name: name.to_owned(),
            input: input.clone(),
        })
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
