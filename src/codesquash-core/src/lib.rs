// Copyright 2026 The Codesquash Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;
pub mod ids;

pub use self::common::{Error, ErrorCode, ErrorKind, Result, make_valid_var_name};
pub use self::ids::{CollectionId, IdAllocator, NodeId};
