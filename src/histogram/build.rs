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

//! Bulk construction of an H-Tree from a sampled tuple set.

use crate::error::{HTreeError, Result};
use crate::histogram::tree::{ElementBody, HTree, HTreeElement, HTreeNode};
use crate::histogram::{Bucket, Datum, Interval};
use smallvec::SmallVec;
use tracing::debug;

/// Build a histogram over `tuples` with at most `bucket_counts[i]` buckets
/// along attribute `i`.
///
/// Construction sorts the sample in place, one attribute per tree level, so
/// the input may arrive in any order. An empty sample produces an empty
/// histogram, not an error.
pub fn build(mut tuples: Vec<Vec<Datum>>, bucket_counts: &[usize]) -> Result<HTree> {
    let arity = bucket_counts.len();
    for (attr_index, &count) in bucket_counts.iter().enumerate() {
        if count == 0 {
            return Err(HTreeError::InvalidBucketCount { attr_index });
        }
    }
    for tuple in &tuples {
        if tuple.len() != arity {
            return Err(HTreeError::ArityMismatch {
                expected: arity,
                actual: tuple.len(),
            });
        }
    }
    check_column_tags(&tuples)?;

    if tuples.is_empty() || arity == 0 {
        return Ok(HTree::empty(arity));
    }

    let mut root = HTreeNode::new(arity - 1);
    let mut path = SmallVec::new();
    build_subtree(&mut root, &mut path, &mut tuples, bucket_counts, 0);

    let tree = HTree::with_root(root, arity);
    debug!(
        arity,
        buckets = tree.num_buckets(),
        sample = tuples.len(),
        "built histogram"
    );
    Ok(tree)
}

/// Every column must carry a single type tag; the first tuple fixes them.
fn check_column_tags(tuples: &[Vec<Datum>]) -> Result<()> {
    let Some(first) = tuples.first() else {
        return Ok(());
    };
    for tuple in &tuples[1..] {
        for (expected, value) in first.iter().zip(tuple) {
            if value.tag() != expected.tag() {
                return Err(HTreeError::TypeTagMismatch {
                    left: expected.tag(),
                    right: value.tag(),
                });
            }
        }
    }
    Ok(())
}

/// Sort the tuple range along `attr_index`, slice it into partitions of
/// ceil(len / bucket_counts[attr_index]) tuples, and attach one element per
/// partition, recursing into the next attribute for internal nodes.
///
/// `path` holds the keys placed by every ancestor on the way down; leaf
/// elements copy it into their bucket before it unwinds.
fn build_subtree(
    node: &mut HTreeNode,
    path: &mut SmallVec<[Interval; 4]>,
    tuples: &mut [Vec<Datum>],
    bucket_counts: &[usize],
    attr_index: usize,
) {
    tuples.sort_by(|a, b| a[attr_index].cmp_unchecked(&b[attr_index]));

    let capacity = tuples.len().div_ceil(bucket_counts[attr_index]);
    for partition in tuples.chunks_mut(capacity) {
        let key = attr_interval(partition, attr_index);
        path.push(key);
        if node.is_leaf() {
            node.elements.push(HTreeElement {
                key,
                body: ElementBody::Leaf(Bucket::new(path.iter().copied())),
            });
        } else {
            let mut child = HTreeNode::new(node.level - 1);
            build_subtree(&mut child, path, partition, bucket_counts, attr_index + 1);
            node.elements.push(HTreeElement {
                key,
                body: ElementBody::Child(Box::new(child)),
            });
        }
        path.pop();
    }
}

/// Key interval `[min, max]` of the partition along `attr_index`.
///
/// The partition was just sorted along that attribute, so the extrema sit at
/// its ends.
fn attr_interval(partition: &[Vec<Datum>], attr_index: usize) -> Interval {
    debug_assert!(!partition.is_empty());
    let lo = partition[0][attr_index];
    let hi = partition[partition.len() - 1][attr_index];
    Interval::bounded(lo, hi)
}
