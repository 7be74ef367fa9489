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

//! The typed scalar values histograms are built over.

use crate::error::{HTreeError, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::cmp::Ordering;

/// Closed set of scalar types the histogram understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    Long,
    Float,
    Double,
    Date,
    Datetime,
    DatetimeInterval,
    YearMonthInterval,
}

/// A single attribute value: a type tag plus payload.
///
/// Values of like tags are totally ordered. Ordering across tags is
/// undefined; the fallible operations reject it and the infallible internal
/// order is only meaningful after tag uniformity has been validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Datum {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Date(NaiveDate),
    Datetime(NaiveDateTime),
    /// Elapsed-time interval.
    DatetimeInterval(TimeDelta),
    /// Calendar interval counted in whole months.
    YearMonthInterval(i32),
}

impl Datum {
    /// The type tag of this value.
    pub fn tag(&self) -> TypeTag {
        match self {
            Datum::Int(_) => TypeTag::Int,
            Datum::Long(_) => TypeTag::Long,
            Datum::Float(_) => TypeTag::Float,
            Datum::Double(_) => TypeTag::Double,
            Datum::Date(_) => TypeTag::Date,
            Datum::Datetime(_) => TypeTag::Datetime,
            Datum::DatetimeInterval(_) => TypeTag::DatetimeInterval,
            Datum::YearMonthInterval(_) => TypeTag::YearMonthInterval,
        }
    }

    /// Compare two like-tagged values.
    pub fn compare(&self, other: &Datum) -> Result<Ordering> {
        if self.tag() != other.tag() {
            return Err(HTreeError::TypeTagMismatch {
                left: self.tag(),
                right: other.tag(),
            });
        }
        Ok(self.cmp_unchecked(other))
    }

    /// Total order used by construction sorts and slice scans.
    ///
    /// Unlike tags order by tag so the comparison stays total; callers must
    /// have validated tag uniformity for the result to be meaningful.
    pub(crate) fn cmp_unchecked(&self, other: &Datum) -> Ordering {
        use Datum::*;
        match (self, other) {
            (Int(a), Int(b)) => a.cmp(b),
            (Long(a), Long(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Double(a), Double(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Datetime(a), Datetime(b)) => a.cmp(b),
            (DatetimeInterval(a), DatetimeInterval(b)) => a.cmp(b),
            (YearMonthInterval(a), YearMonthInterval(b)) => a.cmp(b),
            _ => (self.tag() as u8).cmp(&(other.tag() as u8)),
        }
    }
}

/// Measure of the closed interval `[lo, hi]`.
///
/// Discrete tags (int, long, date, year-month interval) count points
/// inclusively; continuous tags (float, double, datetime, datetime interval)
/// measure length. An inverted pair measures zero.
pub fn width(lo: &Datum, hi: &Datum) -> Result<f64> {
    if lo.tag() != hi.tag() {
        return Err(HTreeError::TypeTagMismatch {
            left: lo.tag(),
            right: hi.tag(),
        });
    }
    if lo.cmp_unchecked(hi) == Ordering::Greater {
        return Ok(0.0);
    }

    use Datum::*;
    Ok(match (lo, hi) {
        (Int(a), Int(b)) => (i64::from(*b) - i64::from(*a) + 1) as f64,
        (Long(a), Long(b)) => (*b as f64) - (*a as f64) + 1.0,
        (Float(a), Float(b)) => f64::from(*b) - f64::from(*a),
        (Double(a), Double(b)) => *b - *a,
        (Date(a), Date(b)) => (*b - *a).num_days() as f64 + 1.0,
        (Datetime(a), Datetime(b)) => delta_seconds(*b - *a),
        (DatetimeInterval(a), DatetimeInterval(b)) => delta_seconds(*b - *a),
        (YearMonthInterval(a), YearMonthInterval(b)) => {
            (i64::from(*b) - i64::from(*a) + 1) as f64
        }
        _ => unreachable!("tags checked above"),
    })
}

/// Length of a time delta in seconds, fractional part included.
fn delta_seconds(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) * 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_within_tags() {
        assert_eq!(
            Datum::Int(1).compare(&Datum::Int(2)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Datum::Long(7).compare(&Datum::Long(7)).unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            Datum::Double(2.5).compare(&Datum::Double(-1.0)).unwrap(),
            Ordering::Greater
        );

        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            Datum::Date(d1).compare(&Datum::Date(d2)).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn compare_rejects_unlike_tags() {
        let err = Datum::Int(1).compare(&Datum::Long(1)).unwrap_err();
        assert_eq!(
            err,
            HTreeError::TypeTagMismatch {
                left: TypeTag::Int,
                right: TypeTag::Long,
            }
        );
    }

    #[test]
    fn integer_width_counts_points() {
        assert_eq!(width(&Datum::Int(0), &Datum::Int(2)).unwrap(), 3.0);
        assert_eq!(width(&Datum::Int(5), &Datum::Int(5)).unwrap(), 1.0);
        assert_eq!(width(&Datum::Int(5), &Datum::Int(4)).unwrap(), 0.0);
        assert_eq!(width(&Datum::Long(-3), &Datum::Long(3)).unwrap(), 7.0);
        assert_eq!(
            width(&Datum::YearMonthInterval(0), &Datum::YearMonthInterval(11)).unwrap(),
            12.0
        );
    }

    #[test]
    fn float_width_measures_length() {
        assert_eq!(width(&Datum::Float(0.5), &Datum::Float(2.0)).unwrap(), 1.5);
        assert_eq!(width(&Datum::Float(1.0), &Datum::Float(1.0)).unwrap(), 0.0);
        assert_eq!(width(&Datum::Double(-1.0), &Datum::Double(1.0)).unwrap(), 2.0);
        assert_eq!(width(&Datum::Double(1.0), &Datum::Double(0.0)).unwrap(), 0.0);
    }

    #[test]
    fn calendar_width() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(width(&Datum::Date(d1), &Datum::Date(d2)).unwrap(), 31.0);

        let t1 = d1.and_hms_opt(0, 0, 0).unwrap();
        let t2 = d1.and_hms_milli_opt(0, 0, 1, 500).unwrap();
        assert_eq!(width(&Datum::Datetime(t1), &Datum::Datetime(t2)).unwrap(), 1.5);
    }

    #[test]
    fn width_rejects_unlike_tags() {
        assert!(width(&Datum::Int(0), &Datum::Double(1.0)).is_err());
    }
}
