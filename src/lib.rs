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

//! Multidimensional equi-depth histograms ("H-Trees") for estimating the
//! selectivity of multi-attribute range predicates.
//!
//! A planner samples a relation and calls [`build`] with a per-attribute
//! bucket-count vector; the resulting [`HTree`] is installed in the
//! relation's catalog slot. During planning, a query hyperrectangle is
//! answered by [`HTree::search`] (the overlapping leaf buckets) and
//! [`HTree::estimate_selectivity`] (the effective number of buckets
//! touched, which the planner scales by the tuples per bucket). Trees are
//! read-only after construction and persist through the byte codec in
//! [`histogram::codec`].

pub mod catalog;
mod error;
pub mod histogram;

pub use error::{HTreeError, Result};
pub use histogram::{build, Bucket, Datum, HTree, Interval, TypeTag};
