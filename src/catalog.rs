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

//! Catalog integration: the per-relation histogram slot and the relation
//! metadata it persists alongside.

use crate::error::{HTreeError, Result};
use crate::histogram::{codec, Bucket, HTree};
use arc_swap::ArcSwapOption;
use prost::Message as _;
use std::sync::Arc;
use tracing::debug;

pub(crate) mod wire {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Relation {
        #[prost(string, tag = "1")]
        pub name: ::prost::alloc::string::String,
        #[prost(uint64, tag = "2")]
        pub num_tuples: u64,
        /// Histogram blob in the format of [`crate::histogram::codec`].
        #[prost(bytes = "vec", optional, tag = "3")]
        pub histogram: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    }
}

/// Atomically replaceable per-relation histogram.
///
/// Readers take an `Arc` snapshot and keep using it for the duration of a
/// query; `install` and `drop_histogram` publish a whole new pointer. A
/// retired tree is freed once the last in-flight snapshot drops.
#[derive(Debug, Default)]
pub struct RelationHistogram {
    slot: ArcSwapOption<HTree>,
}

impl RelationHistogram {
    /// A slot with no histogram installed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Install a freshly built histogram, replacing any previous one.
    pub fn install(&self, tree: HTree) {
        debug!(
            arity = tree.arity(),
            buckets = tree.num_buckets(),
            "installing histogram"
        );
        self.slot.store(Some(Arc::new(tree)));
    }

    /// Remove the histogram; estimates return to the planner fallthrough.
    pub fn drop_histogram(&self) {
        debug!("dropping histogram");
        self.slot.store(None);
    }

    /// The current histogram, if any.
    pub fn snapshot(&self) -> Option<Arc<HTree>> {
        self.slot.load_full()
    }

    /// Leaf bucket count of the installed histogram, 0 when none.
    pub fn num_buckets(&self) -> u64 {
        self.snapshot().map_or(0, |tree| tree.num_buckets())
    }

    /// Effective-bucket selectivity estimate for the query hyperrectangle.
    ///
    /// Returns 0 when no histogram is installed so the planner can fall
    /// through to its default heuristic instead of failing the plan.
    pub fn estimate(&self, query: &Bucket) -> Result<f64> {
        match self.snapshot() {
            Some(tree) => tree.estimate_selectivity(query),
            None => Ok(0.0),
        }
    }
}

/// Relation metadata the histogram is persisted alongside.
#[derive(Debug)]
pub struct CatalogRelation {
    name: String,
    num_tuples: u64,
    histogram: RelationHistogram,
}

impl CatalogRelation {
    pub fn new(name: impl Into<String>, num_tuples: u64) -> Self {
        CatalogRelation {
            name: name.into(),
            num_tuples,
            histogram: RelationHistogram::empty(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_tuples(&self) -> u64 {
        self.num_tuples
    }

    pub fn set_num_tuples(&mut self, num_tuples: u64) {
        self.num_tuples = num_tuples;
    }

    pub fn histogram(&self) -> &RelationHistogram {
        &self.histogram
    }

    /// Expected number of tuples matching the query.
    ///
    /// The histogram estimates effective buckets; scaling by the tuples per
    /// bucket turns that into a cardinality.
    pub fn estimate_cardinality(&self, query: &Bucket) -> Result<f64> {
        let Some(tree) = self.histogram.snapshot() else {
            return Ok(0.0);
        };
        if tree.num_buckets() == 0 {
            return Ok(0.0);
        }
        let per_bucket = self.num_tuples as f64 / tree.num_buckets() as f64;
        Ok(tree.estimate_selectivity(query)? * per_bucket)
    }

    /// Serialize the relation; the histogram is emitted iff one is
    /// installed.
    pub fn encode(&self) -> Vec<u8> {
        let proto = wire::Relation {
            name: self.name.clone(),
            num_tuples: self.num_tuples,
            histogram: self.histogram.snapshot().map(|tree| codec::encode(&tree)),
        };
        proto.encode_to_vec()
    }

    /// Restore a relation, rehydrating the stored histogram or initializing
    /// an empty slot.
    pub fn decode(blob: &[u8]) -> Result<Self> {
        let proto = wire::Relation::decode(blob).map_err(|e| HTreeError::malformed(e.to_string()))?;
        let histogram = RelationHistogram::empty();
        if let Some(blob) = &proto.histogram {
            histogram.install(codec::decode(blob)?);
        }
        Ok(CatalogRelation {
            name: proto.name,
            num_tuples: proto.num_tuples,
            histogram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::{build, Datum, Interval};
    use itertools::Itertools;

    fn int_grid(dims: &[i32]) -> Vec<Vec<Datum>> {
        dims.iter()
            .map(|&d| 0..d)
            .multi_cartesian_product()
            .map(|tuple| tuple.into_iter().map(Datum::Int).collect())
            .collect()
    }

    fn point_query(values: &[i32]) -> Bucket {
        Bucket::new(values.iter().map(|&v| Interval::point(Datum::Int(v))))
    }

    #[test]
    fn empty_slot_estimates_zero() {
        let slot = RelationHistogram::empty();
        assert_eq!(slot.num_buckets(), 0);
        assert_eq!(slot.estimate(&point_query(&[1, 1, 1])).unwrap(), 0.0);
    }

    #[test]
    fn install_and_drop() {
        let slot = RelationHistogram::empty();
        slot.install(build(int_grid(&[3, 3, 3]), &[3, 3, 3]).unwrap());
        assert_eq!(slot.num_buckets(), 27);
        assert_eq!(slot.estimate(&point_query(&[1, 1, 1])).unwrap(), 1.0);

        slot.drop_histogram();
        assert_eq!(slot.num_buckets(), 0);
        assert_eq!(slot.estimate(&point_query(&[1, 1, 1])).unwrap(), 0.0);
    }

    #[test]
    fn snapshot_outlives_replacement() {
        let slot = RelationHistogram::empty();
        slot.install(build(int_grid(&[3, 3, 3]), &[3, 3, 3]).unwrap());

        let before = slot.snapshot().unwrap();
        slot.install(build(int_grid(&[2, 2, 2]), &[2, 2, 2]).unwrap());

        // In-flight queries keep reading the retired tree.
        assert_eq!(before.num_buckets(), 27);
        assert_eq!(slot.num_buckets(), 8);
    }

    #[test]
    fn cardinality_scales_by_tuples_per_bucket() {
        let mut relation = CatalogRelation::new("events", 0);
        relation.set_num_tuples(27);
        relation
            .histogram()
            .install(build(int_grid(&[3, 3, 3]), &[3, 3, 3]).unwrap());

        // 27 buckets over 27 tuples: one tuple per point bucket.
        assert_eq!(
            relation.estimate_cardinality(&point_query(&[1, 1, 1])).unwrap(),
            1.0
        );
    }

    #[test]
    fn relation_round_trip_with_histogram() {
        let relation = CatalogRelation::new("events", 27);
        relation
            .histogram()
            .install(build(int_grid(&[3, 3, 3]), &[3, 3, 3]).unwrap());

        let restored = CatalogRelation::decode(&relation.encode()).unwrap();
        assert_eq!(restored.name(), "events");
        assert_eq!(restored.num_tuples(), 27);
        assert_eq!(
            restored.histogram().snapshot().as_deref(),
            relation.histogram().snapshot().as_deref()
        );
    }

    #[test]
    fn relation_round_trip_without_histogram() {
        let relation = CatalogRelation::new("empty", 5);
        let restored = CatalogRelation::decode(&relation.encode()).unwrap();
        assert_eq!(restored.name(), "empty");
        assert!(restored.histogram().snapshot().is_none());
    }
}
