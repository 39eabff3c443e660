//! Ordering verification over rendered sequences

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

use crate::collect::Record;
use crate::compare::compare;
use crate::error::{Error, Result};
use crate::value::{normalize_as, FieldKind, NormalizedValue};

/// Default minimum fraction of non-empty entries
pub const DEFAULT_MIN_NON_EMPTY_FRACTION: f64 = 0.5;

/// Default number of non-empty entries that passes regardless of fraction
pub const DEFAULT_MIN_NON_EMPTY_COUNT: usize = 1;

/// Expected sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// Whether `ord = compare(previous, current)` satisfies this direction
    fn allows(&self, ord: Ordering) -> bool {
        match self {
            Direction::Ascending => ord != Ordering::Greater,
            Direction::Descending => ord != Ordering::Less,
        }
    }

    /// Value of the `aria-sort` attribute for this direction
    pub fn aria_sort(&self) -> &'static str {
        match self {
            Direction::Ascending => "ascending",
            Direction::Descending => "descending",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.aria_sort())
    }
}

/// First adjacent pair breaking the expected order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingViolation {
    /// Position of `current` in the original sequence
    pub index: usize,
    pub previous: String,
    pub current: String,
}

/// Verify that `sequence` is ordered in `direction`
///
/// Blank entries are skipped, so each non-blank value is compared with the
/// nearest non-blank value before it.
pub fn verify_order<S: AsRef<str>>(
    sequence: &[S],
    direction: Direction,
) -> Option<OrderingViolation> {
    find_violation(sequence, direction, FieldKind::Auto)
}

fn find_violation<S: AsRef<str>>(
    sequence: &[S],
    direction: Direction,
    kind: FieldKind,
) -> Option<OrderingViolation> {
    let normalized: Vec<NormalizedValue> = sequence
        .iter()
        .map(|raw| normalize_as(raw.as_ref(), kind))
        .collect();

    let mut previous: Option<usize> = None;
    for (index, current) in normalized.iter().enumerate() {
        if current.is_blank() {
            continue;
        }
        if let Some(prev) = previous {
            if !direction.allows(compare(&normalized[prev], current)) {
                return Some(OrderingViolation {
                    index,
                    previous: sequence[prev].as_ref().trim().to_string(),
                    current: sequence[index].as_ref().trim().to_string(),
                });
            }
        }
        previous = Some(index);
    }

    None
}

/// Summary of a successful ordering check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    pub total: usize,
    pub non_empty: usize,
    pub direction: Direction,
}

/// Configurable ordering check with a content policy for sparse columns
#[derive(Debug, Clone)]
pub struct OrderingVerifier {
    direction: Direction,
    kind: FieldKind,
    min_non_empty_fraction: f64,
    /// `None` once a fraction is set explicitly
    min_non_empty_count: Option<usize>,
}

impl OrderingVerifier {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            kind: FieldKind::Auto,
            min_non_empty_fraction: DEFAULT_MIN_NON_EMPTY_FRACTION,
            min_non_empty_count: Some(DEFAULT_MIN_NON_EMPTY_COUNT),
        }
    }

    /// Set the type hint used when normalizing values
    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Require a minimum non-empty fraction, clamped to `0.0..=1.0`
    ///
    /// Replaces the default policy: the fraction alone decides, unless a
    /// count is set again with [`with_min_non_empty_count`](Self::with_min_non_empty_count).
    pub fn with_min_non_empty(mut self, fraction: f64) -> Self {
        self.min_non_empty_fraction = fraction.clamp(0.0, 1.0);
        self.min_non_empty_count = None;
        self
    }

    /// Also pass the content policy once `count` values are non-empty
    pub fn with_min_non_empty_count(mut self, count: usize) -> Self {
        self.min_non_empty_count = Some(count);
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Check a sequence of raw values for `field`
    ///
    /// Passes the content policy when the non-empty fraction reaches the
    /// threshold, or when the non-empty count reaches the configured count.
    /// By default that is half the values or at least one of them.
    pub fn check<S: AsRef<str>>(&self, field: &str, values: &[S]) -> Result<OrderReport> {
        let total = values.len();
        let non_empty = values
            .iter()
            .filter(|v| !v.as_ref().trim().is_empty())
            .count();
        let fraction = if total == 0 {
            0.0
        } else {
            non_empty as f64 / total as f64
        };

        let enough_values = self
            .min_non_empty_count
            .is_some_and(|count| non_empty >= count);
        if !enough_values && fraction < self.min_non_empty_fraction {
            return Err(Error::InsufficientData {
                field: field.to_string(),
                non_empty,
                total,
                required_fraction: self.min_non_empty_fraction,
            });
        }

        if let Some(v) = find_violation(values, self.direction, self.kind) {
            return Err(Error::OrderingViolation {
                field: field.to_string(),
                index: v.index,
                previous: v.previous,
                current: v.current,
            });
        }

        debug!(
            "'{}' is {} ({} of {} values non-empty)",
            field, self.direction, non_empty, total
        );

        Ok(OrderReport {
            total,
            non_empty,
            direction: self.direction,
        })
    }

    /// Check one field projected out of a record sequence
    ///
    /// Records without the field count as blank.
    pub fn check_field(&self, records: &[Record], field: &str) -> Result<OrderReport> {
        let values: Vec<&str> = records
            .iter()
            .map(|r| r.get(field).unwrap_or(""))
            .collect();
        self.check(field, &values)
    }
}
