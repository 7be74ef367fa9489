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

//! The H-Tree itself: level-tagged nodes, range search, and the selectivity
//! estimator.

use crate::error::{HTreeError, Result};
use crate::histogram::{Bucket, Interval};
use std::cmp::Ordering;

/// A multidimensional histogram over a fixed number of attributes.
///
/// Immutable once built: search and estimation take `&self` and may run from
/// any number of threads concurrently.
#[derive(Debug, Clone, PartialEq)]
pub struct HTree {
    pub(crate) root: Option<Box<HTreeNode>>,
    pub(crate) arity: usize,
    pub(crate) num_buckets: u64,
}

impl HTree {
    /// A histogram with no buckets.
    pub fn empty(arity: usize) -> Self {
        HTree {
            root: None,
            arity,
            num_buckets: 0,
        }
    }

    pub(crate) fn with_root(root: HTreeNode, arity: usize) -> Self {
        let num_buckets = root.count_leaves();
        HTree {
            root: Some(Box::new(root)),
            arity,
            num_buckets,
        }
    }

    /// Number of indexed attributes.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Number of leaf buckets.
    pub fn num_buckets(&self) -> u64 {
        self.num_buckets
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// All leaf buckets overlapping the query hyperrectangle, in tree order.
    ///
    /// Any dimension of `query` may be unbounded on either side.
    pub fn search(&self, query: &Bucket) -> Result<Vec<&Bucket>> {
        if query.arity() != self.arity {
            return Err(HTreeError::ArityMismatch {
                expected: self.arity,
                actual: query.arity(),
            });
        }
        let mut hits = Vec::new();
        if let Some(root) = &self.root {
            debug_assert_eq!(root.level + 1, self.arity);
            root.collect_overlapping(query, 0, &mut hits)?;
        }
        Ok(hits)
    }

    /// Expected number of buckets the query touches, fractions of partially
    /// covered buckets included, assuming uniform density per bucket.
    ///
    /// Callers multiply by the per-bucket tuple count to turn this into a
    /// cardinality.
    pub fn estimate_selectivity(&self, query: &Bucket) -> Result<f64> {
        let mut sum = 0.0;
        for bucket in self.search(query)? {
            sum += bucket.overlap_ratio(query)?;
        }
        Ok(sum)
    }
}

/// One node: an ordered run of elements over a single attribute.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HTreeNode {
    /// Distance from the leaves: leaves are 0, the root is arity - 1.
    pub(crate) level: usize,
    pub(crate) elements: Vec<HTreeElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HTreeElement {
    /// The interval this element occupies along its node's attribute.
    pub(crate) key: Interval,
    pub(crate) body: ElementBody,
}

/// Internal elements own a child subtree; leaf elements own the full bucket.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ElementBody {
    Child(Box<HTreeNode>),
    Leaf(Bucket),
}

impl HTreeNode {
    pub(crate) fn new(level: usize) -> Self {
        HTreeNode {
            level,
            elements: Vec::new(),
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.level == 0
    }

    pub(crate) fn count_leaves(&self) -> u64 {
        self.elements
            .iter()
            .map(|e| match &e.body {
                ElementBody::Leaf(_) => 1,
                ElementBody::Child(child) => child.count_leaves(),
            })
            .sum()
    }

    fn collect_overlapping<'t>(
        &'t self,
        query: &Bucket,
        attr_index: usize,
        hits: &mut Vec<&'t Bucket>,
    ) -> Result<()> {
        debug_assert_eq!(attr_index + self.level + 1, query.arity());
        let bounds = &query.dims()[attr_index];
        let (lower, upper) = self.overlap_slice(bounds)?;
        for element in &self.elements[lower..upper] {
            match &element.body {
                ElementBody::Leaf(bucket) => hits.push(bucket),
                ElementBody::Child(child) => {
                    child.collect_overlapping(query, attr_index + 1, hits)?
                }
            }
        }
        Ok(())
    }

    /// Endpoints of the run of elements whose keys overlap `bounds`.
    ///
    /// Construction leaves both key endpoints non-decreasing across a node,
    /// so each endpoint is a binary search. An unbounded query side widens
    /// the run to the node's extremum. Sibling keys may tie (width-1 keys
    /// repeat when a column is constant); the run includes all of them.
    fn overlap_slice(&self, bounds: &Interval) -> Result<(usize, usize)> {
        debug_assert!(!self.elements.is_empty());
        self.check_query_tags(bounds)?;

        let lower = match &bounds.lo {
            None => 0,
            Some(qlo) => self.elements.partition_point(|e| match &e.key.hi {
                Some(hi) => hi.cmp_unchecked(qlo) == Ordering::Less,
                None => false,
            }),
        };
        let upper = match &bounds.hi {
            None => self.elements.len(),
            Some(qhi) => self.elements.partition_point(|e| match &e.key.lo {
                Some(lo) => lo.cmp_unchecked(qhi) != Ordering::Greater,
                None => true,
            }),
        };
        // An inverted query interval can cross the endpoints over.
        Ok((lower, upper.max(lower)))
    }

    fn check_query_tags(&self, bounds: &Interval) -> Result<()> {
        // Keys in a built tree are bounded; the first element's tag stands
        // in for the whole node.
        let Some(key_lo) = self.elements.first().and_then(|e| e.key.lo.as_ref()) else {
            return Ok(());
        };
        for side in [&bounds.lo, &bounds.hi].into_iter().flatten() {
            if side.tag() != key_lo.tag() {
                return Err(HTreeError::TypeTagMismatch {
                    left: key_lo.tag(),
                    right: side.tag(),
                });
            }
        }
        Ok(())
    }
}
