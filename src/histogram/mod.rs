// Copyright Elasticsearch B.V. and/or licensed to Elasticsearch B.V. under one
// or more contributor license agreements. See the NOTICE file distributed with
// this work for additional information regarding copyright
// ownership. Elasticsearch B.V. licenses this file to you under
// the Apache License, Version 2.0 (the "License"); you may
// not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The H-Tree core: typed scalars, interval geometry, bulk construction,
//! range search, and the wire codec.
//!
//! An H-Tree node holds a vector of elements. An element carries a key,
//! which is an interval over one attribute. Leaf elements carry the entire
//! bucket, whose dimensions are the keys of every ancestor along the path
//! (plus the leaf element's own key).

mod datum;
pub use datum::*;

mod interval;
pub use interval::*;

mod tree;
pub use tree::*;

mod build;
pub use build::*;

pub mod codec; // intentionally no wildcard import
