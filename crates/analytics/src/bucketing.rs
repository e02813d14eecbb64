//! Classification of a numeric distance (usually days) into named buckets.
//!
//! Buckets are right-open intervals `[b[i], b[i+1])` with a right-unbounded
//! final interval. Values below the first boundary never fail: they land in
//! the first bucket.

use crate::error::AnalyticsError;
use serde::{Deserialize, Serialize};

/// One interval of a [`BucketScheme`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    /// `None` for a leading bucket that extends to negative infinity.
    pub lower_bound: Option<i64>,
    /// Exclusive. `None` for the final, unbounded bucket.
    pub upper_bound: Option<i64>,
}

/// A validated partition of the integer axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketScheme {
    boundaries: Vec<i64>,
    buckets: Vec<Bucket>,
    /// Whether an explicit `(-inf, b[0])` bucket precedes the boundaries.
    leading_open: bool,
}

impl BucketScheme {
    /// Builds a scheme from strictly increasing boundaries.
    ///
    /// `labels` must have either one entry per boundary, in which case the
    /// first bucket also absorbs everything below `boundaries[0]`, or one extra
    /// entry naming an explicit leading bucket below `boundaries[0]`.
    pub fn new(boundaries: Vec<i64>, labels: Vec<String>) -> Result<Self, AnalyticsError> {
        validate_boundaries(&boundaries)?;

        let leading_open = if labels.len() == boundaries.len() {
            false
        } else if labels.len() == boundaries.len() + 1 {
            true
        } else {
            return Err(AnalyticsError::Configuration(format!(
                "{} bucket labels do not fit {} boundaries (expected {} or {})",
                labels.len(),
                boundaries.len(),
                boundaries.len(),
                boundaries.len() + 1
            )));
        };

        let mut lowers: Vec<Option<i64>> = Vec::with_capacity(labels.len());
        if leading_open {
            lowers.push(None);
        }
        lowers.extend(boundaries.iter().copied().map(Some));

        let buckets = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                let upper_bound = if leading_open {
                    boundaries.get(i).copied()
                } else {
                    boundaries.get(i + 1).copied()
                };
                Bucket {
                    label,
                    lower_bound: lowers[i],
                    upper_bound,
                }
            })
            .collect();

        Ok(Self {
            boundaries,
            buckets,
            leading_open,
        })
    }

    /// Builds a scheme whose labels follow the `"0-30", "31-60", "90+"` convention.
    pub fn with_default_labels(boundaries: Vec<i64>) -> Result<Self, AnalyticsError> {
        validate_boundaries(&boundaries)?;
        let labels = default_labels(&boundaries);
        Self::new(boundaries, labels)
    }

    /// The receivables layout `[0, 30, 60, 90]`.
    pub fn standard_aging() -> Self {
        let boundaries = vec![0, 30, 60, 90];
        let labels = default_labels(&boundaries);
        Self {
            buckets: boundaries
                .iter()
                .enumerate()
                .map(|(i, &lower)| Bucket {
                    label: labels[i].clone(),
                    lower_bound: Some(lower),
                    upper_bound: boundaries.get(i + 1).copied(),
                })
                .collect(),
            boundaries,
            leading_open: false,
        }
    }

    pub fn boundaries(&self) -> &[i64] {
        &self.boundaries
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Index of the bucket containing `value`.
    pub fn index_of(&self, value: i64) -> usize {
        // Number of boundaries at or below the value.
        let passed = self.boundaries.partition_point(|&b| b <= value);
        if self.leading_open {
            passed
        } else {
            passed.saturating_sub(1)
        }
    }

    pub fn bucket_of(&self, value: i64) -> &Bucket {
        &self.buckets[self.index_of(value)]
    }
}

/// One-shot classification without keeping a scheme around.
pub fn bucket_of(
    value: i64,
    boundaries: &[i64],
    labels: &[String],
) -> Result<String, AnalyticsError> {
    let scheme = BucketScheme::new(boundaries.to_vec(), labels.to_vec())?;
    Ok(scheme.bucket_of(value).label.clone())
}

fn validate_boundaries(boundaries: &[i64]) -> Result<(), AnalyticsError> {
    if boundaries.is_empty() {
        return Err(AnalyticsError::Configuration(
            "bucket boundaries must not be empty".to_string(),
        ));
    }
    if let Some(pair) = boundaries.windows(2).find(|w| w[0] >= w[1]) {
        return Err(AnalyticsError::Configuration(format!(
            "bucket boundaries must be strictly increasing, found {} followed by {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

fn default_labels(boundaries: &[i64]) -> Vec<String> {
    boundaries
        .iter()
        .enumerate()
        .map(|(i, &lower)| match boundaries.get(i + 1) {
            Some(&upper) if i == 0 => format!("{lower}-{upper}"),
            Some(&upper) => format!("{}-{upper}", lower + 1),
            None => format!("{lower}+"),
        })
        .collect()
}
