use analytics::numeric::approx_eq;
use analytics::{
    aggregate_aging, aggregate_aging_default, BucketScheme, ExclusionReason, Magnitude,
};
use chrono::{Duration, NaiveDate};
use core_types::{Record, RecordStatus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn reference() -> NaiveDate {
    date(2024, 6, 30)
}

/// An invoice issued 60 days before it falls due, `days_overdue` days ago.
fn invoice(id: &str, amount: Decimal, days_overdue: i64) -> Record {
    let due = reference() - Duration::days(days_overdue);
    Record::new(id, amount, due - Duration::days(60)).with_due(due)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn single_invoice_45_days_overdue_lands_in_31_60() {
    let records = vec![invoice("inv-1", dec!(1000), 45)];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.total_amount, dec!(1000));
    assert_eq!(summary.total_records, 1);
    let expected = [
        ("0-30", 0, Decimal::ZERO),
        ("31-60", 1, dec!(1000)),
        ("61-90", 0, Decimal::ZERO),
        ("90+", 0, Decimal::ZERO),
    ];
    assert_eq!(summary.buckets.len(), expected.len());
    for (bucket, (label, count, amount)) in summary.buckets.iter().zip(expected) {
        assert_eq!(bucket.label, label);
        assert_eq!(bucket.count, count, "count for {label}");
        assert_eq!(bucket.amount, amount, "amount for {label}");
    }
}

#[test]
fn buckets_partition_the_total() {
    let records: Vec<Record> = (0..200)
        .map(|i| {
            let amount = Decimal::new(12_345 + i * 977, 2);
            invoice(&format!("inv-{i}"), amount, i * 3 - 40)
        })
        .collect();

    let summary = aggregate_aging_default(&records, reference());

    let bucket_amount: Decimal = summary.buckets.iter().map(|b| b.amount).sum();
    let bucket_count: usize = summary.buckets.iter().map(|b| b.count).sum();
    assert!(approx_eq(bucket_amount, summary.total_amount, dec!(0.01)));
    assert_eq!(bucket_count, summary.total_records);
    assert_eq!(summary.total_records, 200);
}

#[test]
fn boundary_day_belongs_to_the_bucket_it_starts() {
    let records = vec![
        invoice("on-30", dec!(10), 30),
        invoice("on-60", dec!(20), 60),
        invoice("on-90", dec!(30), 90),
        invoice("day-29", dec!(40), 29),
    ];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.bucket("0-30").unwrap().amount, dec!(40));
    assert_eq!(summary.bucket("31-60").unwrap().amount, dec!(10));
    assert_eq!(summary.bucket("61-90").unwrap().amount, dec!(20));
    assert_eq!(summary.bucket("90+").unwrap().amount, dec!(30));
}

#[test]
fn not_yet_due_counts_as_current() {
    let records = vec![invoice("future-due", dec!(500), -20)];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.bucket("0-30").unwrap().count, 1);
    assert_eq!(summary.overdue_amount, Decimal::ZERO);
    assert_eq!(summary.overdue_ratio_pct(), Some(Decimal::ZERO));
}

#[test]
fn missing_due_dates_are_excluded_and_reported() {
    let mut no_due = invoice("no-due", dec!(250), 10);
    no_due.due_at = None;
    let records = vec![invoice("ok", dec!(100), 10), no_due];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.total_amount, dec!(100));
    assert_eq!(summary.count_excluded, 1);
    assert_eq!(summary.excluded_amount, dec!(250));
    assert_eq!(summary.exclusions[0].record_id, "no-due");
    assert_eq!(summary.exclusions[0].reason, ExclusionReason::MissingDueDate);
}

#[test]
fn records_dated_after_reference_are_excluded_not_fatal() {
    let future = Record::new("future", dec!(75), reference() + Duration::days(5))
        .with_due(reference() + Duration::days(35));
    let records = vec![future, invoice("ok", dec!(100), 5)];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.count_excluded, 1);
    assert_eq!(summary.exclusions[0].reason, ExclusionReason::AfterReferenceDate);
}

#[test]
fn settled_records_are_ignored_and_partials_use_unpaid_balance() {
    let records = vec![
        invoice("paid", dec!(100), 40).with_status(RecordStatus::Paid),
        invoice("cancelled", dec!(100), 40).with_status(RecordStatus::Cancelled),
        invoice("fully-paid", dec!(100), 40).with_paid(dec!(100)),
        invoice("partial", dec!(100), 40).with_paid(dec!(35.25)),
    ];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.total_amount, dec!(64.75));
    assert_eq!(summary.count_excluded, 0);
}

#[test]
fn invalid_records_are_excluded() {
    let records = vec![invoice("negative", dec!(-10), 40), invoice("ok", dec!(10), 40)];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.exclusions[0].reason, ExclusionReason::Invalid);
}

#[test]
fn invalid_records_count_towards_excluded_amount() {
    let records = vec![
        invoice("bad-payment", dec!(80), 40).with_paid(dec!(-5)),
        invoice("ok", dec!(10), 40),
    ];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.count_excluded, 1);
    assert_eq!(summary.exclusions[0].reason, ExclusionReason::Invalid);
    assert_eq!(summary.excluded_amount, dec!(80));
    assert_eq!(summary.total_amount, dec!(10));
}

#[test]
fn weighted_average_days_overdue_is_amount_weighted() {
    let records = vec![invoice("a", dec!(300), 10), invoice("b", dec!(100), 50)];

    let summary = aggregate_aging_default(&records, reference());

    // (300 * 10 + 100 * 50) / 400 = 20
    assert_eq!(summary.weighted_average_days_overdue, Some(dec!(20)));
    assert_eq!(summary.overdue_ratio_pct(), Some(dec!(100)));
}

#[test]
fn custom_scheme_with_leading_current_bucket() {
    let labels = ["current", "1-30", "31+"].map(String::from).to_vec();
    let scheme = BucketScheme::new(vec![1, 31], labels).unwrap();
    let records = vec![
        invoice("not-due", dec!(1), -3),
        invoice("due-today", dec!(2), 0),
        invoice("late", dec!(4), 1),
        invoice("very-late", dec!(8), 31),
    ];

    let summary = aggregate_aging(&records, reference(), &scheme);

    let amounts: Vec<Decimal> = summary.buckets.iter().map(|b| b.amount).collect();
    assert_eq!(amounts, vec![dec!(3), dec!(4), dec!(8)]);
    assert_eq!(summary.buckets[0].lower_bound_days, None);
    assert_eq!(summary.buckets[2].upper_bound_days, None);
}

#[test]
fn aging_is_idempotent() {
    let records: Vec<Record> = (0..50)
        .map(|i| invoice(&format!("inv-{i}"), Decimal::new(1000 + i, 1), i * 4))
        .collect();

    let first = aggregate_aging_default(&records, reference());
    let second = aggregate_aging_default(&records, reference());

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn amounts_overflowing_the_totals_are_excluded() {
    let records = vec![
        invoice("huge-1", Decimal::MAX, -5),
        invoice("huge-2", Decimal::MAX, -5),
    ];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.total_amount, Decimal::MAX);
    assert_eq!(summary.count_excluded, 1);
    assert_eq!(summary.exclusions[0].record_id, "huge-2");
    assert_eq!(summary.exclusions[0].reason, ExclusionReason::Overflow);
    assert_eq!(summary.excluded_amount, Decimal::MAX);
}

#[test]
fn overdue_day_weighting_that_overflows_is_excluded() {
    let records = vec![invoice("huge", Decimal::MAX, 45), invoice("ok", dec!(100), 45)];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.total_amount, dec!(100));
    assert_eq!(summary.exclusions[0].reason, ExclusionReason::Overflow);
    assert_eq!(summary.weighted_average_days_overdue, Some(dec!(45)));
}

#[test]
fn summary_reports_the_magnitude_of_its_total() {
    let records = vec![invoice("a", dec!(4500), 10), invoice("b", dec!(700), 70)];

    let summary = aggregate_aging_default(&records, reference());

    assert_eq!(summary.amount_magnitude, Magnitude::Thousands);
    assert_eq!(aggregate_aging_default(&[], reference()).amount_magnitude, Magnitude::Units);
}
