// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::borrow::Cow;

use crate::common::Result;
use crate::node::{Node, NodeList};

use super::SquashContext;

/// One argument of a generated function call.
pub enum CallArg<'a> {
    Float(f64),
    Int(i64),
    /// Passed through verbatim.
    Raw(Cow<'a, str>),
    /// Replaced by the node's result, lowering the node if needed.
    Node(&'a dyn Node),
    /// Replaced by the name of the array holding the collection.
    Collection(&'a NodeList),
}

impl From<f64> for CallArg<'_> {
    fn from(x: f64) -> Self {
        CallArg::Float(x)
    }
}

impl From<i64> for CallArg<'_> {
    fn from(x: i64) -> Self {
        CallArg::Int(x)
    }
}

impl From<i32> for CallArg<'_> {
    fn from(x: i32) -> Self {
        CallArg::Int(x as i64)
    }
}

impl From<usize> for CallArg<'_> {
    fn from(x: usize) -> Self {
        CallArg::Int(x as i64)
    }
}

impl<'a> From<&'a str> for CallArg<'a> {
    fn from(s: &'a str) -> Self {
        CallArg::Raw(Cow::Borrowed(s))
    }
}

impl From<String> for CallArg<'_> {
    fn from(s: String) -> Self {
        CallArg::Raw(Cow::Owned(s))
    }
}

impl<'a> From<&'a dyn Node> for CallArg<'a> {
    fn from(node: &'a dyn Node) -> Self {
        CallArg::Node(node)
    }
}

impl<'a> From<&'a NodeList> for CallArg<'a> {
    fn from(list: &'a NodeList) -> Self {
        CallArg::Collection(list)
    }
}

/// Spell a double so that parsing the text gives back the same value,
/// independent of any locale.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        "std::numeric_limits<double>::quiet_NaN()".to_owned()
    } else if x.is_infinite() {
        let sign = if x < 0.0 { "-" } else { "" };
        format!("{sign}std::numeric_limits<double>::infinity()")
    } else {
        // Debug formatting is the shortest representation that round
        // trips, and always carries a '.' or an exponent.
        format!("{x:?}")
    }
}

impl SquashContext {
    /// Build the code to call `funcname` with `args`, e.g.
    /// `gauss(x_3, 1.0, t2)`.
    ///
    /// Nodes and collections among the arguments are lowered on demand.
    /// Arity and argument types are not checked against anything.
    pub fn build_call(&mut self, funcname: &str, args: &[CallArg]) -> Result<String> {
        let mut call = String::with_capacity(funcname.len() + 2 + 8 * args.len());
        call.push_str(funcname);
        call.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                call.push_str(", ");
            }
            let arg = self.build_arg(arg)?;
            call.push_str(&arg);
        }
        call.push(')');
        Ok(call)
    }

    fn build_arg(&mut self, arg: &CallArg) -> Result<String> {
        match arg {
            CallArg::Float(x) => Ok(format_float(*x)),
            CallArg::Int(x) => Ok(x.to_string()),
            CallArg::Raw(s) => Ok(s.to_string()),
            CallArg::Node(node) => self.get_result(*node),
            CallArg::Collection(list) => self.save_list_as_array(list, None),
        }
    }
}
