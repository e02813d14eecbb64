use crate::bucketing::BucketScheme;
use crate::numeric::{percentage, round_money, Magnitude};
use crate::report::{Exclusion, ExclusionReason};
use chrono::NaiveDate;
use core_types::{Record, RecordStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of an aging report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingBucket {
    pub label: String,
    pub lower_bound_days: Option<i64>,
    pub upper_bound_days: Option<i64>,
    pub count: usize,
    pub amount: Decimal,
}

/// Outstanding balances grouped by days overdue.
///
/// `buckets` always sum to `total_amount` and `total_records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingSummary {
    pub reference_date: NaiveDate,
    pub total_amount: Decimal,
    pub total_records: usize,
    /// Order of magnitude of `total_amount`, shared by every bucket row.
    pub amount_magnitude: Magnitude,
    /// Portion of `total_amount` that is past its due date.
    pub overdue_amount: Decimal,
    /// Mean days overdue weighted by outstanding amount, to two decimal places.
    pub weighted_average_days_overdue: Option<Decimal>,
    pub buckets: Vec<AgingBucket>,
    pub count_excluded: usize,
    pub excluded_amount: Decimal,
    pub exclusions: Vec<Exclusion>,
}

impl AgingSummary {
    /// Share of the outstanding balance that is overdue, as a percentage.
    pub fn overdue_ratio_pct(&self) -> Option<Decimal> {
        percentage(self.overdue_amount, self.total_amount)
    }

    pub fn bucket(&self, label: &str) -> Option<&AgingBucket> {
        self.buckets.iter().find(|b| b.label == label)
    }
}

/// Buckets every outstanding record by how many days it is past due.
///
/// Malformed rows never fail the call. Records without a due date, records
/// dated after `reference_date` and records failing validation are skipped
/// and reported through `count_excluded`. Settled records (`paid`,
/// `cancelled` or fully paid) are not part of the receivable and are ignored.
pub fn aggregate_aging(
    records: &[Record],
    reference_date: NaiveDate,
    scheme: &BucketScheme,
) -> AgingSummary {
    let mut buckets: Vec<AgingBucket> = scheme
        .buckets()
        .iter()
        .map(|b| AgingBucket {
            label: b.label.clone(),
            lower_bound_days: b.lower_bound,
            upper_bound_days: b.upper_bound,
            count: 0,
            amount: Decimal::ZERO,
        })
        .collect();

    let mut total_amount = Decimal::ZERO;
    let mut total_records = 0usize;
    let mut overdue_amount = Decimal::ZERO;
    let mut day_weighted_amount = Decimal::ZERO;
    let mut excluded_amount = Decimal::ZERO;
    let mut exclusions = Vec::new();

    for record in records {
        if let Err(e) = record.validate() {
            tracing::warn!(record_id = %record.id, error = %e, "Skipping invalid record in aging");
            excluded_amount = excluded_amount.saturating_add(record.amount.max(Decimal::ZERO));
            exclusions.push(Exclusion::new(&record.id, ExclusionReason::Invalid));
            continue;
        }

        let outstanding = outstanding_amount(record);
        if outstanding <= Decimal::ZERO {
            continue;
        }

        let Some(due_at) = record.due_at else {
            tracing::debug!(record_id = %record.id, "Record has no due date, excluded from aging");
            excluded_amount = excluded_amount.saturating_add(outstanding);
            exclusions.push(Exclusion::new(&record.id, ExclusionReason::MissingDueDate));
            continue;
        };

        if record.occurred_at > reference_date {
            tracing::warn!(
                record_id = %record.id,
                occurred_at = %record.occurred_at,
                %reference_date,
                "Record is dated after the reference date, excluded from aging"
            );
            excluded_amount = excluded_amount.saturating_add(outstanding);
            exclusions.push(Exclusion::new(&record.id, ExclusionReason::AfterReferenceDate));
            continue;
        }

        let days_overdue = (reference_date - due_at).num_days().max(0);
        let index = scheme.index_of(days_overdue);

        // Every running total is checked before any of them moves.
        let overdue_share = if days_overdue > 0 {
            outstanding
        } else {
            Decimal::ZERO
        };
        let totals = outstanding
            .checked_mul(Decimal::from(days_overdue))
            .and_then(|weighted| day_weighted_amount.checked_add(weighted))
            .zip(total_amount.checked_add(outstanding))
            .zip(overdue_amount.checked_add(overdue_share))
            .zip(buckets[index].amount.checked_add(outstanding));
        let Some((((weighted, total), overdue), bucket_amount)) = totals else {
            tracing::warn!(record_id = %record.id, %outstanding, "Amount would overflow aging totals, excluded");
            excluded_amount = excluded_amount.saturating_add(outstanding);
            exclusions.push(Exclusion::new(&record.id, ExclusionReason::Overflow));
            continue;
        };

        let bucket = &mut buckets[index];
        bucket.count += 1;
        bucket.amount = bucket_amount;

        day_weighted_amount = weighted;
        total_amount = total;
        overdue_amount = overdue;
        total_records += 1;
    }

    let weighted_average_days_overdue = if total_amount.is_zero() {
        None
    } else {
        Some(round_money(day_weighted_amount / total_amount))
    };

    tracing::debug!(
        %reference_date,
        total_records,
        %total_amount,
        excluded = exclusions.len(),
        "Aging aggregation complete"
    );

    AgingSummary {
        reference_date,
        total_amount,
        total_records,
        amount_magnitude: Magnitude::of(total_amount),
        overdue_amount,
        weighted_average_days_overdue,
        buckets,
        count_excluded: exclusions.len(),
        excluded_amount,
        exclusions,
    }
}

/// Aging with the standard `[0, 30, 60, 90]` layout.
pub fn aggregate_aging_default(records: &[Record], reference_date: NaiveDate) -> AgingSummary {
    aggregate_aging(records, reference_date, &BucketScheme::standard_aging())
}

fn outstanding_amount(record: &Record) -> Decimal {
    match record.status {
        RecordStatus::Paid | RecordStatus::Cancelled => Decimal::ZERO,
        _ => record.unpaid_amount(),
    }
}
