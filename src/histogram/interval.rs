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

//! Intervals and buckets: the geometry of the histogram.

use crate::error::{HTreeError, Result};
use crate::histogram::datum::{width, Datum};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// A possibly-unbounded closed range over one attribute.
///
/// `None` on either side means unbounded in that direction. Every interval
/// stored inside a built histogram is bounded on both sides; query intervals
/// may leave either side open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lo: Option<Datum>,
    pub hi: Option<Datum>,
}

impl Interval {
    /// The closed range `[lo, hi]`.
    pub fn bounded(lo: Datum, hi: Datum) -> Self {
        Interval {
            lo: Some(lo),
            hi: Some(hi),
        }
    }

    /// The degenerate range `[value, value]`.
    pub fn point(value: Datum) -> Self {
        Interval::bounded(value, value)
    }

    /// The range open on both sides.
    pub fn unbounded() -> Self {
        Interval { lo: None, hi: None }
    }

    /// The range `[lo, +inf)`.
    pub fn at_least(lo: Datum) -> Self {
        Interval {
            lo: Some(lo),
            hi: None,
        }
    }

    /// The range `(-inf, hi]`.
    pub fn at_most(hi: Datum) -> Self {
        Interval {
            lo: None,
            hi: Some(hi),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.lo.is_some() && self.hi.is_some()
    }

    /// Whether `value` falls inside this interval.
    pub fn contains(&self, value: &Datum) -> Result<bool> {
        if let Some(lo) = &self.lo {
            if lo.compare(value)? == Ordering::Greater {
                return Ok(false);
            }
        }
        if let Some(hi) = &self.hi {
            if hi.compare(value)? == Ordering::Less {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Fraction of this histogram cell covered by `query`, assuming uniform
    /// density inside the cell.
    ///
    /// `self` is a cell from a built histogram and is therefore bounded on
    /// both sides; `query` may be open on either side.
    pub fn overlap_ratio(&self, query: &Interval) -> Result<f64> {
        let (Some(lo), Some(hi)) = (&self.lo, &self.hi) else {
            debug_assert!(false, "histogram cells are bounded");
            return Ok(0.0);
        };

        let mut left = lo;
        if let Some(q) = &query.lo {
            if q.compare(lo)? == Ordering::Greater {
                left = q;
            }
        }
        let mut right = hi;
        if let Some(q) = &query.hi {
            if q.compare(hi)? == Ordering::Less {
                right = q;
            }
        }

        if left.compare(right)? == Ordering::Greater {
            return Ok(0.0);
        }
        // A degenerate cell is covered outright; the width quotient below
        // would be 0/0 for continuous tags.
        if lo.compare(hi)? == Ordering::Equal {
            return Ok(1.0);
        }
        Ok(width(left, right)? / width(lo, hi)?)
    }
}

/// An axis-aligned hyperrectangle: one interval per indexed attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    dims: SmallVec<[Interval; 4]>,
}

impl Bucket {
    pub fn new(dims: impl IntoIterator<Item = Interval>) -> Self {
        Bucket {
            dims: dims.into_iter().collect(),
        }
    }

    /// Number of dimensions.
    pub fn arity(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[Interval] {
        &self.dims
    }

    /// Fraction of this histogram bucket covered by `query`.
    ///
    /// The uniform-density assumption factorizes the ratio across
    /// dimensions.
    pub fn overlap_ratio(&self, query: &Bucket) -> Result<f64> {
        if query.arity() != self.arity() {
            return Err(HTreeError::ArityMismatch {
                expected: self.arity(),
                actual: query.arity(),
            });
        }
        let mut ratio = 1.0;
        for (cell, q) in self.dims.iter().zip(query.dims()) {
            ratio *= cell.overlap_ratio(q)?;
        }
        Ok(ratio)
    }
}
