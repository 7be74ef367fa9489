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

//! Errors surfaced by histogram construction, search, and the codec.

use crate::histogram::TypeTag;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HTreeError>;

/// Errors reported to the planner. None are swallowed or retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HTreeError {
    /// A query bucket, tuple, or bucket-count vector disagrees with the
    /// attribute count of its counterpart.
    #[error("arity mismatch: expected {expected} attributes, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// Scalars of different type tags were compared or combined.
    #[error("type tag mismatch: {left:?} vs {right:?}")]
    TypeTagMismatch { left: TypeTag, right: TypeTag },

    /// A per-attribute bucket count of zero was requested.
    #[error("attribute {attr_index} requests zero buckets")]
    InvalidBucketCount { attr_index: usize },

    /// A serialized histogram failed wire decoding or structural validation.
    #[error("malformed histogram blob: {reason}")]
    MalformedBlob { reason: String },

    /// A serialized scalar carries a payload this build cannot rehydrate.
    #[error("unsupported scalar tag in histogram blob")]
    UnsupportedScalarTag,
}

impl HTreeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        HTreeError::MalformedBlob {
            reason: reason.into(),
        }
    }
}
