// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

use lazy_static::lazy_static;
use regex::Regex;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    Generic,
    UnresolvableNode,
    CircularDependency,
    NotTranslatable,
    DuplicateResult,
    DuplicateArray,
    DuplicateVectorObservable,
    ScopeOrderViolation,
    NoVectorObservables,
    MismatchedLoopSizes,
    UnclosedLoop,
    BadConfig,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            Generic => "generic",
            UnresolvableNode => "unresolvable_node",
            CircularDependency => "circular_dependency",
            NotTranslatable => "not_translatable",
            DuplicateResult => "duplicate_result",
            DuplicateArray => "duplicate_array",
            DuplicateVectorObservable => "duplicate_vector_observable",
            ScopeOrderViolation => "scope_order_violation",
            NoVectorObservables => "no_vector_observables",
            MismatchedLoopSizes => "mismatched_loop_sizes",
            UnclosedLoop => "unclosed_loop",
            BadConfig => "bad_config",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The node graph handed to the context is inconsistent.
    Graph,
    /// The context was driven in an order it cannot lower.
    Codegen,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Graph => "GraphError",
            ErrorKind::Codegen => "CodegenError",
            ErrorKind::Config => "ConfigError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

#[macro_export]
macro_rules! graph_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Graph, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Graph, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! codegen_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Codegen, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Codegen, ErrorCode::$code, None))
    }};
}

lazy_static! {
    static ref INVALID_VAR_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_]").unwrap();
}

/// Turn an arbitrary node name into something usable as a variable
/// name in generated code.
///
/// Every character outside `[A-Za-z0-9_]` becomes an underscore, and
/// names that would start with a digit (or are empty) get a leading
/// underscore.
pub fn make_valid_var_name(name: &str) -> String {
    let name = name.trim();
    let mut valid = INVALID_VAR_CHARS.replace_all(name, "_").into_owned();
    if valid.is_empty() || valid.starts_with(|c: char| c.is_ascii_digit()) {
        valid.insert(0, '_');
    }
    valid
}

#[test]
fn test_make_valid_var_name() {
    assert_eq!("mu", make_valid_var_name("mu"));
    assert_eq!("sigma_x_", make_valid_var_name("sigma[x]"));
    assert_eq!("a_b_c", make_valid_var_name("a.b c"));
    assert_eq!("_2pi", make_valid_var_name("2pi"));
    assert_eq!("_", make_valid_var_name(""));
    assert_eq!("x", make_valid_var_name("  x  "));
    // one underscore per char, not per byte
    assert_eq!("_b", make_valid_var_name("åb"));
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Codegen,
        ErrorCode::DuplicateResult,
        Some("mean".to_owned()),
    );
    assert_eq!("CodegenError{duplicate_result: mean}", format!("{err}"));

    let err = Error::new(ErrorKind::Graph, ErrorCode::CircularDependency, None);
    assert_eq!("GraphError{circular_dependency}", format!("{err}"));
    assert_eq!(None, err.get_details());
}

#[test]
fn test_error_macros() {
    fn fails() -> Result<()> {
        graph_err!(UnresolvableNode, "x".to_owned())
    }
    let err = fails().unwrap_err();
    assert_eq!(ErrorKind::Graph, err.kind);
    assert_eq!(ErrorCode::UnresolvableNode, err.code);
    assert_eq!(Some("x".to_owned()), err.details);

    fn fails_codegen() -> Result<()> {
        codegen_err!(UnclosedLoop)
    }
    let err = fails_codegen().unwrap_err();
    assert_eq!(ErrorKind::Codegen, err.kind);
    assert_eq!(None, err.details);
}
