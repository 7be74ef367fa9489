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

//! Symmetric protobuf encoding of histograms.
//!
//! The wire messages are hand-derived [`prost::Message`] structs, which buys
//! explicit field presence, a versioned schema, and forward-compatible
//! skipping of unknown fields. Node levels are not stored; decode rederives
//! them from depth.

use crate::error::{HTreeError, Result};
use crate::histogram::tree::{ElementBody, HTree, HTreeElement, HTreeNode};
use crate::histogram::{Bucket, Datum, Interval};
use chrono::Datelike;
use prost::Message as _;
use tracing::{debug, warn};

/// Bump on any change an older reader must reject.
const SCHEMA_VERSION: u32 = 1;

/// Wire messages. Field numbers are part of the on-disk format; never reuse
/// a retired number.
pub(crate) mod wire {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Histogram {
        #[prost(uint32, tag = "1")]
        pub schema_version: u32,
        #[prost(uint32, tag = "2")]
        pub arity: u32,
        #[prost(message, optional, tag = "3")]
        pub root: ::core::option::Option<Node>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Node {
        #[prost(message, repeated, tag = "1")]
        pub elements: ::prost::alloc::vec::Vec<Element>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Element {
        #[prost(message, optional, tag = "1")]
        pub key: ::core::option::Option<Interval>,
        /// Set for internal elements.
        #[prost(message, optional, boxed, tag = "2")]
        pub child: ::core::option::Option<::prost::alloc::boxed::Box<Node>>,
        /// Set for leaf elements: one interval per attribute.
        #[prost(message, repeated, tag = "3")]
        pub bucket: ::prost::alloc::vec::Vec<Interval>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Interval {
        #[prost(message, optional, tag = "1")]
        pub lo: ::core::option::Option<Scalar>,
        #[prost(message, optional, tag = "2")]
        pub hi: ::core::option::Option<Scalar>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Scalar {
        #[prost(oneof = "scalar::Value", tags = "1, 2, 3, 4, 5, 6, 7, 8")]
        pub value: ::core::option::Option<scalar::Value>,
    }

    pub mod scalar {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Value {
            #[prost(int32, tag = "1")]
            Int(i32),
            #[prost(int64, tag = "2")]
            Long(i64),
            #[prost(float, tag = "3")]
            Float(f32),
            #[prost(double, tag = "4")]
            Double(f64),
            /// Days from the common era.
            #[prost(int32, tag = "5")]
            DateDays(i32),
            /// Microseconds since the Unix epoch, UTC.
            #[prost(int64, tag = "6")]
            DatetimeMicros(i64),
            #[prost(int64, tag = "7")]
            IntervalMicros(i64),
            #[prost(int32, tag = "8")]
            IntervalMonths(i32),
        }
    }
}

/// Serialize a histogram into its stable byte form.
pub fn encode(tree: &HTree) -> Vec<u8> {
    let proto = wire::Histogram {
        schema_version: SCHEMA_VERSION,
        arity: tree.arity() as u32,
        root: tree.root.as_deref().map(encode_node),
    };
    proto.encode_to_vec()
}

/// Rehydrate a histogram from bytes produced by [`encode`].
pub fn decode(blob: &[u8]) -> Result<HTree> {
    let proto = wire::Histogram::decode(blob).map_err(|e| HTreeError::malformed(e.to_string()))?;
    if proto.schema_version != SCHEMA_VERSION {
        return Err(HTreeError::malformed(format!(
            "unknown schema version {}",
            proto.schema_version
        )));
    }

    let arity = proto.arity as usize;
    let Some(root) = &proto.root else {
        return Ok(HTree::empty(arity));
    };
    if arity == 0 {
        return Err(HTreeError::malformed("non-empty histogram with zero arity"));
    }

    let root = decode_node(root, arity - 1, arity)?;
    let tree = HTree::with_root(root, arity);
    debug!(arity, buckets = tree.num_buckets(), "decoded histogram");
    Ok(tree)
}

fn encode_node(node: &HTreeNode) -> wire::Node {
    wire::Node {
        elements: node.elements.iter().map(encode_element).collect(),
    }
}

fn encode_element(element: &HTreeElement) -> wire::Element {
    let (child, bucket) = match &element.body {
        ElementBody::Child(node) => (Some(Box::new(encode_node(node))), Vec::new()),
        ElementBody::Leaf(b) => (None, b.dims().iter().map(encode_interval).collect()),
    };
    wire::Element {
        key: Some(encode_interval(&element.key)),
        child,
        bucket,
    }
}

fn encode_interval(interval: &Interval) -> wire::Interval {
    wire::Interval {
        lo: interval.lo.as_ref().map(encode_scalar),
        hi: interval.hi.as_ref().map(encode_scalar),
    }
}

fn encode_scalar(datum: &Datum) -> wire::Scalar {
    use wire::scalar::Value;
    let value = match datum {
        Datum::Int(v) => Value::Int(*v),
        Datum::Long(v) => Value::Long(*v),
        Datum::Float(v) => Value::Float(*v),
        Datum::Double(v) => Value::Double(*v),
        Datum::Date(v) => Value::DateDays(v.num_days_from_ce()),
        Datum::Datetime(v) => Value::DatetimeMicros(v.and_utc().timestamp_micros()),
        Datum::DatetimeInterval(v) => {
            // Deltas beyond roughly +/-292k years clamp and do not
            // round-trip.
            let micros = v.num_microseconds().unwrap_or_else(|| {
                warn!("datetime interval exceeds encodable range, clamping");
                i64::MAX
            });
            Value::IntervalMicros(micros)
        }
        Datum::YearMonthInterval(v) => Value::IntervalMonths(*v),
    };
    wire::Scalar { value: Some(value) }
}

fn decode_node(proto: &wire::Node, level: usize, arity: usize) -> Result<HTreeNode> {
    if proto.elements.is_empty() {
        return Err(HTreeError::malformed("empty node"));
    }
    let mut node = HTreeNode::new(level);
    for element in &proto.elements {
        node.elements.push(decode_element(element, level, arity)?);
    }
    Ok(node)
}

fn decode_element(proto: &wire::Element, level: usize, arity: usize) -> Result<HTreeElement> {
    let Some(key) = &proto.key else {
        return Err(HTreeError::malformed("element without a key"));
    };
    let key = decode_interval(key)?;
    check_histogram_interval(&key)?;

    let body = match (&proto.child, proto.bucket.is_empty()) {
        (Some(child), true) => {
            if level == 0 {
                return Err(HTreeError::malformed("child subtree below leaf level"));
            }
            ElementBody::Child(Box::new(decode_node(child, level - 1, arity)?))
        }
        (None, false) => {
            if level != 0 {
                return Err(HTreeError::malformed("leaf bucket on an internal node"));
            }
            if proto.bucket.len() != arity {
                return Err(HTreeError::malformed(format!(
                    "bucket arity {} disagrees with tree depth {}",
                    proto.bucket.len(),
                    arity
                )));
            }
            let mut dims = Vec::with_capacity(arity);
            for dim in &proto.bucket {
                let dim = decode_interval(dim)?;
                check_histogram_interval(&dim)?;
                dims.push(dim);
            }
            ElementBody::Leaf(Bucket::new(dims))
        }
        (Some(_), false) => {
            return Err(HTreeError::malformed("element with both child and bucket"));
        }
        (None, true) => {
            return Err(HTreeError::malformed(
                "element with neither child nor bucket",
            ));
        }
    };

    Ok(HTreeElement { key, body })
}

/// Intervals inside a built histogram are bounded with like-tagged ends.
fn check_histogram_interval(interval: &Interval) -> Result<()> {
    let (Some(lo), Some(hi)) = (&interval.lo, &interval.hi) else {
        return Err(HTreeError::malformed("half-open histogram interval"));
    };
    if lo.tag() != hi.tag() {
        return Err(HTreeError::malformed("interval ends of unlike tags"));
    }
    Ok(())
}

fn decode_interval(proto: &wire::Interval) -> Result<Interval> {
    Ok(Interval {
        lo: proto.lo.as_ref().map(decode_scalar).transpose()?,
        hi: proto.hi.as_ref().map(decode_scalar).transpose()?,
    })
}

fn decode_scalar(proto: &wire::Scalar) -> Result<Datum> {
    use wire::scalar::Value;
    // An empty oneof means the writer used a payload field this build does
    // not know about.
    let Some(value) = &proto.value else {
        return Err(HTreeError::UnsupportedScalarTag);
    };
    Ok(match value {
        Value::Int(v) => Datum::Int(*v),
        Value::Long(v) => Datum::Long(*v),
        Value::Float(v) => Datum::Float(*v),
        Value::Double(v) => Datum::Double(*v),
        Value::DateDays(v) => Datum::Date(
            chrono::NaiveDate::from_num_days_from_ce_opt(*v)
                .ok_or_else(|| HTreeError::malformed("date out of range"))?,
        ),
        Value::DatetimeMicros(v) => Datum::Datetime(
            chrono::DateTime::from_timestamp_micros(*v)
                .ok_or_else(|| HTreeError::malformed("datetime out of range"))?
                .naive_utc(),
        ),
        Value::IntervalMicros(v) => Datum::DatetimeInterval(chrono::TimeDelta::microseconds(*v)),
        Value::IntervalMonths(v) => Datum::YearMonthInterval(*v),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::build;
    use chrono::NaiveDate;
    use itertools::Itertools;

    fn int_grid(dims: &[i32]) -> Vec<Vec<Datum>> {
        dims.iter()
            .map(|&d| 0..d)
            .multi_cartesian_product()
            .map(|tuple| tuple.into_iter().map(Datum::Int).collect())
            .collect()
    }

    fn leaf_interval(value: i32) -> wire::Interval {
        wire::Interval {
            lo: Some(wire::Scalar {
                value: Some(wire::scalar::Value::Int(value)),
            }),
            hi: Some(wire::Scalar {
                value: Some(wire::scalar::Value::Int(value)),
            }),
        }
    }

    /// A syntactically valid single-leaf histogram to corrupt in tests.
    fn one_leaf_histogram() -> wire::Histogram {
        wire::Histogram {
            schema_version: SCHEMA_VERSION,
            arity: 1,
            root: Some(wire::Node {
                elements: vec![wire::Element {
                    key: Some(leaf_interval(0)),
                    child: None,
                    bucket: vec![leaf_interval(0)],
                }],
            }),
        }
    }

    #[test]
    fn round_trip_integer_tree() {
        let tree = build(int_grid(&[3, 2, 19]), &[3, 2, 3]).unwrap();
        let restored = decode(&encode(&tree)).unwrap();
        assert_eq!(restored, tree);
        assert_eq!(restored.num_buckets(), tree.num_buckets());
    }

    #[test]
    fn round_trip_double_tree() {
        let tuples = int_grid(&[4, 4])
            .into_iter()
            .map(|t| {
                t.into_iter()
                    .map(|d| match d {
                        Datum::Int(v) => Datum::Double(v.into()),
                        _ => unreachable!(),
                    })
                    .collect()
            })
            .collect();
        let tree = build(tuples, &[4, 2]).unwrap();
        assert_eq!(decode(&encode(&tree)).unwrap(), tree);
    }

    #[test]
    fn round_trip_calendar_tree() {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let tuples: Vec<Vec<Datum>> = (0..10)
            .map(|i| {
                vec![
                    Datum::Date(base + chrono::TimeDelta::days(i)),
                    Datum::Datetime(base.and_hms_opt(0, 0, 0).unwrap() + chrono::TimeDelta::hours(i)),
                ]
            })
            .collect();
        let tree = build(tuples, &[2, 5]).unwrap();
        assert_eq!(decode(&encode(&tree)).unwrap(), tree);
    }

    #[test]
    fn round_trip_empty_tree() {
        let tree = build(Vec::new(), &[2, 2, 2]).unwrap();
        let restored = decode(&encode(&tree)).unwrap();
        assert_eq!(restored, tree);
        assert_eq!(restored.arity(), 3);
    }

    #[test]
    fn unknown_trailing_fields_are_skipped() {
        let tree = build(int_grid(&[2, 2]), &[2, 2]).unwrap();
        let mut blob = encode(&tree);
        // Field 15, varint wire type, value 42: an extension this build
        // does not know about.
        blob.extend_from_slice(&[0x78, 0x2a]);
        assert_eq!(decode(&blob).unwrap(), tree);
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let mut proto = one_leaf_histogram();
        proto.schema_version = SCHEMA_VERSION + 1;
        assert!(matches!(
            decode(&proto.encode_to_vec()).unwrap_err(),
            HTreeError::MalformedBlob { .. }
        ));
    }

    #[test]
    fn empty_node_is_rejected() {
        let mut proto = one_leaf_histogram();
        proto.root = Some(wire::Node {
            elements: Vec::new(),
        });
        assert!(matches!(
            decode(&proto.encode_to_vec()).unwrap_err(),
            HTreeError::MalformedBlob { .. }
        ));
    }

    #[test]
    fn keyless_element_is_rejected() {
        let mut proto = one_leaf_histogram();
        proto.root.as_mut().unwrap().elements[0].key = None;
        assert!(matches!(
            decode(&proto.encode_to_vec()).unwrap_err(),
            HTreeError::MalformedBlob { .. }
        ));
    }

    #[test]
    fn half_open_key_is_rejected() {
        let mut proto = one_leaf_histogram();
        proto.root.as_mut().unwrap().elements[0]
            .key
            .as_mut()
            .unwrap()
            .hi = None;
        assert!(matches!(
            decode(&proto.encode_to_vec()).unwrap_err(),
            HTreeError::MalformedBlob { .. }
        ));
    }

    #[test]
    fn bucket_arity_disagreement_is_rejected() {
        let mut proto = one_leaf_histogram();
        proto.root.as_mut().unwrap().elements[0]
            .bucket
            .push(leaf_interval(1));
        assert!(matches!(
            decode(&proto.encode_to_vec()).unwrap_err(),
            HTreeError::MalformedBlob { .. }
        ));
    }

    #[test]
    fn bodiless_element_is_rejected() {
        let mut proto = one_leaf_histogram();
        proto.root.as_mut().unwrap().elements[0].bucket.clear();
        assert!(matches!(
            decode(&proto.encode_to_vec()).unwrap_err(),
            HTreeError::MalformedBlob { .. }
        ));
    }

    #[test]
    fn unknown_scalar_payload_is_rejected() {
        let mut proto = one_leaf_histogram();
        proto.root.as_mut().unwrap().elements[0]
            .key
            .as_mut()
            .unwrap()
            .lo = Some(wire::Scalar { value: None });
        assert_eq!(
            decode(&proto.encode_to_vec()).unwrap_err(),
            HTreeError::UnsupportedScalarTag
        );
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(matches!(
            decode(&[0xff, 0xff, 0xff, 0xff]).unwrap_err(),
            HTreeError::MalformedBlob { .. }
        ));
    }
}
