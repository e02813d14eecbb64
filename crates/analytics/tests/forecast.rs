use analytics::{forecast, AnalyticsError, Magnitude, StageWeights};
use chrono::NaiveDate;
use core_types::{Record, RecordStatus, Stage};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn opened() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
}

fn weights() -> StageWeights {
    StageWeights::new(vec![
        (Stage::from("lead"), dec!(0.10)),
        (Stage::from("proposal"), dec!(0.50)),
        (Stage::from("negotiation"), dec!(0.75)),
    ])
    .unwrap()
}

fn deal(id: &str, stage: &str, amount: Decimal) -> Record {
    Record::new(id, amount, opened()).with_stage(stage)
}

fn pipeline() -> Vec<Record> {
    vec![
        deal("d1", "lead", dec!(10000)),
        deal("d2", "lead", dec!(5000)),
        deal("d3", "proposal", dec!(8000)),
        deal("d4", "negotiation", dec!(20000)),
    ]
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn predicted_total_is_probability_weighted() {
    let summary = forecast(&pipeline(), &weights()).unwrap();

    // 15000 * 0.10 + 8000 * 0.50 + 20000 * 0.75
    assert_eq!(summary.predicted_total, dec!(20500));
    assert_eq!(summary.pipeline_total, dec!(43000));
    assert_eq!(summary.amount_magnitude, Magnitude::Thousands);
    assert_eq!(summary.open_records, 4);
    assert_eq!(summary.confidence_level, dec!(0.80));

    let lead = &summary.per_stage[0];
    assert_eq!(lead.stage.as_str(), "lead");
    assert_eq!(lead.record_count, 2);
    assert_eq!(lead.raw_amount, dec!(15000));
    assert_eq!(lead.weighted_amount, dec!(1500));
}

#[test]
fn per_stage_follows_weight_order_and_sums_to_total() {
    let records = vec![deal("d1", "negotiation", dec!(100))];

    let summary = forecast(&records, &weights()).unwrap();

    let order: Vec<&str> = summary.per_stage.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(order, vec!["lead", "proposal", "negotiation"]);
    let stage_total: Decimal = summary.per_stage.iter().map(|s| s.weighted_amount).sum();
    assert_eq!(stage_total, summary.predicted_total);
    assert_eq!(summary.per_stage[0].record_count, 0);
}

#[test]
fn doubling_amounts_doubles_the_forecast() {
    let doubled: Vec<Record> = pipeline()
        .into_iter()
        .map(|mut r| {
            r.amount *= dec!(2);
            r
        })
        .collect();

    let base = forecast(&pipeline(), &weights()).unwrap();
    let scaled = forecast(&doubled, &weights()).unwrap();

    assert_eq!(scaled.predicted_total, base.predicted_total * dec!(2));
}

#[test]
fn closed_deals_do_not_contribute() {
    let mut records = pipeline();
    records.push(deal("won", "negotiation", dec!(99999)).with_status(RecordStatus::Won));
    records.push(deal("lost", "unknown", dec!(99999)).with_status(RecordStatus::Lost));

    let summary = forecast(&records, &weights()).unwrap();

    assert_eq!(summary.predicted_total, dec!(20500));
    assert_eq!(summary.open_records, 4);
}

#[test]
fn unweighted_stage_fails_loudly() {
    let mut records = pipeline();
    records.push(deal("d9", "discovery", dec!(1)));

    let err = forecast(&records, &weights()).unwrap_err();

    assert_eq!(
        err,
        AnalyticsError::UnweightedStage {
            stage: "discovery".to_string(),
            record_id: "d9".to_string(),
        }
    );
    assert!(err.is_configuration());
}

#[test]
fn open_record_without_stage_is_unweighted() {
    let records = vec![Record::new("bare", dec!(10), opened())];

    let err = forecast(&records, &weights()).unwrap_err();

    assert!(matches!(err, AnalyticsError::UnweightedStage { ref record_id, .. } if record_id == "bare"));
}

#[test]
fn empty_pipeline_forecasts_zero() {
    let summary = forecast(&[], &weights()).unwrap();

    assert_eq!(summary.predicted_total, Decimal::ZERO);
    assert_eq!(summary.open_records, 0);
    assert_eq!(summary.per_stage.len(), 3);
}

#[test]
fn stage_total_overflow_is_a_validation_error() {
    let records = vec![deal("d1", "lead", Decimal::MAX), deal("d2", "lead", Decimal::MAX)];

    let err = forecast(&records, &weights()).unwrap_err();

    assert!(matches!(err, AnalyticsError::Validation(ref message) if message.contains("d2")));
    assert!(!err.is_configuration());
}

#[test]
fn pipeline_total_overflow_is_a_validation_error() {
    let records = vec![deal("d1", "lead", Decimal::MAX), deal("d2", "proposal", Decimal::MAX)];

    let err = forecast(&records, &weights()).unwrap_err();

    assert!(matches!(err, AnalyticsError::Validation(ref message) if message.contains("pipeline")));
}
