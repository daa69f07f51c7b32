// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};

use crate::common::{Error, ErrorCode, ErrorKind, Result};

/// Knobs controlling the shape of the generated code.
///
/// None of these change what is computed, only how the emitted text is
/// spelled and where statements end up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquashConfig {
    /// Type used for every scalar declaration.
    pub float_type: String,
    /// Prefix for counter-generated temporaries (`t0`, `t1`, ...).
    pub temp_prefix: String,
    /// Prefix for loop indices; nesting depth d uses `{prefix}{d}`.
    pub loop_index_prefix: String,
    /// Flat observable buffer indexed as `obs[<column> + <loop index>]`.
    pub obs_array: String,
    /// Entry parameter buffer the driver binds free parameters to.
    pub params_array: String,
    /// Name of the function the driver wraps the body in.
    pub function_name: String,
    /// One level of indentation in the emitted code.
    pub indent: String,

    /// Register operator-free results inline instead of declaring a
    /// temporary for them.
    pub inline_trivial_results: bool,
    /// Move loop-invariant declarations in front of the loop they were
    /// emitted in.
    pub hoist_invariants: bool,
}

impl Default for SquashConfig {
    fn default() -> Self {
        Self {
            float_type: "double".to_owned(),
            temp_prefix: "t".to_owned(),
            loop_index_prefix: "loopIdx".to_owned(),
            obs_array: "obs".to_owned(),
            params_array: "params".to_owned(),
            function_name: "func".to_owned(),
            indent: "  ".to_owned(),
            inline_trivial_results: true,
            hoist_invariants: true,
        }
    }
}

impl SquashConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| {
            Error::new(ErrorKind::Config, ErrorCode::BadConfig, Some(err.to_string()))
        })
    }
}

#[test]
fn test_config_from_json() {
    let config = SquashConfig::from_json(r#"{"float_type": "float", "hoist_invariants": false}"#)
        .unwrap();
    assert_eq!("float", config.float_type);
    assert!(!config.hoist_invariants);
    // unspecified fields keep their defaults
    assert_eq!("loopIdx", config.loop_index_prefix);
    assert!(config.inline_trivial_results);

    let config = SquashConfig::from_json("{}").unwrap();
    assert_eq!(SquashConfig::default(), config);

    let err = SquashConfig::from_json("{\"temp_prefix\": 3}").unwrap_err();
    assert_eq!(ErrorCode::BadConfig, err.code);
    assert_eq!(ErrorKind::Config, err.kind);
}
