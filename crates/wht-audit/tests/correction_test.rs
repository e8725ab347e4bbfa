//! # Monetary Correction, Rate Series and Overdue Assessment

mod common;

use chrono::Duration;
use common::*;
use wht_audit::RateSeriesUpdate;
use wht_core::{BenchmarkRateSample, Payment};
use wht_store::AuditStore;

fn sample(y: i32, m: u32, d: u32, rate: f64) -> BenchmarkRateSample {
    BenchmarkRateSample::new(date(y, m, d), rate).expect("valid sample")
}

fn flat_january(h: &Harness) {
    h.rates.set_samples(
        date(2024, 1, 2)
            .iter_days()
            .take_while(|d| *d <= date(2024, 1, 31))
            .map(|d| BenchmarkRateSample::new(d, 12.0).expect("valid sample"))
            .collect(),
    );
}

// =========================================================================
// Correction
// =========================================================================

#[tokio::test]
async fn flat_rate_over_january_matches_reference() {
    let h = Harness::new();
    flat_january(&h);
    let engine = h.engine();

    let added = engine
        .backfill_rates(date(2024, 1, 1), date(2024, 1, 31))
        .await
        .expect("backfill");
    assert_eq!(added, 30);

    let corrected = engine
        .correct_amount(money("1000.00"), date(2024, 1, 1), Some(date(2024, 1, 31)))
        .await
        .expect("correct");
    assert_eq!(corrected, money("1009.36"));
}

#[tokio::test]
async fn end_date_defaults_to_today() {
    let h = Harness::new();
    flat_january(&h);
    let engine = h.engine();
    engine
        .backfill_rates(date(2024, 1, 1), date(2024, 1, 31))
        .await
        .expect("backfill");

    // Clock is at 2024-02-01; no samples after January 31.
    let explicit = engine
        .correct_amount(money("1000.00"), date(2024, 1, 1), Some(date(2024, 2, 1)))
        .await
        .expect("correct");
    let implicit = engine
        .correct_amount(money("1000.00"), date(2024, 1, 1), None)
        .await
        .expect("correct");
    assert_eq!(explicit, implicit);
}

#[tokio::test]
async fn missing_data_returns_amount_unchanged() {
    let h = Harness::new();
    let engine = h.engine();
    let amount = money("1000.00");
    assert_eq!(
        engine
            .correct_amount(amount, date(2024, 1, 1), Some(date(2024, 1, 31)))
            .await
            .expect("no samples"),
        amount
    );
    assert_eq!(
        engine
            .correct_amount(amount, date(2024, 1, 31), Some(date(2024, 1, 1)))
            .await
            .expect("inverted range"),
        amount
    );
}

#[tokio::test]
async fn backfill_skips_stored_dates() {
    let h = Harness::new();
    flat_january(&h);
    h.store
        .insert_rate_sample(sample(2024, 1, 10, 11.0))
        .await
        .expect("seed");
    let engine = h.engine();

    let added = engine
        .backfill_rates(date(2024, 1, 1), date(2024, 1, 31))
        .await
        .expect("backfill");
    assert_eq!(added, 29);
    let kept = h
        .store
        .rate_samples(date(2024, 1, 10), date(2024, 1, 10))
        .await
        .expect("read");
    assert_eq!(kept, vec![sample(2024, 1, 10, 11.0)]);

    let again = engine
        .backfill_rates(date(2024, 1, 1), date(2024, 1, 31))
        .await
        .expect("second backfill");
    assert_eq!(again, 0);
}

// =========================================================================
// Current rate cache
// =========================================================================

#[tokio::test]
async fn current_rate_is_cached_for_the_ttl() {
    let h = Harness::new();
    h.rates.push(sample(2024, 1, 31, 11.25));
    let engine = h.engine();

    let first = engine.current_rate().await.expect("fetch");
    assert_eq!(first.rate_percent, 11.25);
    assert_eq!(h.rates.calls(), 1);

    h.clock.advance(Duration::hours(23));
    engine.current_rate().await.expect("cached");
    assert_eq!(h.rates.calls(), 1);

    h.clock.advance(Duration::hours(1));
    engine.current_rate().await.expect("expired");
    assert_eq!(h.rates.calls(), 2);
}

#[tokio::test]
async fn cache_survives_engine_restart_and_can_be_invalidated() {
    let h = Harness::new();
    h.rates.push(sample(2024, 1, 31, 11.25));
    h.engine().current_rate().await.expect("fetch");

    let restarted = h.engine();
    restarted.current_rate().await.expect("cached");
    assert_eq!(h.rates.calls(), 1);

    restarted
        .correction()
        .invalidate_rate_cache()
        .await
        .expect("invalidate");
    restarted.current_rate().await.expect("refetch");
    assert_eq!(h.rates.calls(), 2);
}

#[tokio::test]
async fn unavailable_rate_source_is_a_resolution_error() {
    let h = Harness::new();
    h.rates.set_failing(true);
    let err = h.engine().current_rate().await.unwrap_err();
    assert!(err.is_resolution());
}

// =========================================================================
// Series update
// =========================================================================

#[tokio::test]
async fn series_update_appends_and_keeps_recorded_samples() {
    let h = Harness::new();
    let engine = h.engine();

    h.rates.push(sample(2024, 1, 30, 11.0));
    assert!(matches!(
        engine.update_rate_series().await.expect("update"),
        RateSeriesUpdate::Appended { .. }
    ));
    assert!(matches!(
        engine.update_rate_series().await.expect("update"),
        RateSeriesUpdate::Unchanged { .. }
    ));

    h.rates.push(sample(2024, 1, 30, 11.5));
    match engine.update_rate_series().await.expect("update") {
        RateSeriesUpdate::Conflict { stored, published } => {
            assert_eq!(stored.rate_percent, 11.0);
            assert_eq!(published.rate_percent, 11.5);
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    h.rates.push(sample(2024, 1, 31, 11.5));
    assert!(matches!(
        engine.update_rate_series().await.expect("update"),
        RateSeriesUpdate::Appended { .. }
    ));

    let stored = h
        .store
        .rate_samples(date(2024, 1, 1), date(2024, 12, 31))
        .await
        .expect("read");
    assert_eq!(
        stored,
        vec![sample(2024, 1, 30, 11.0), sample(2024, 1, 31, 11.5)]
    );
}

#[tokio::test]
async fn stale_publication_leaves_series_unchanged() {
    let h = Harness::new();
    h.store
        .insert_rate_sample(sample(2024, 1, 31, 11.0))
        .await
        .expect("seed");
    h.rates.push(sample(2024, 1, 29, 10.0));

    let outcome = h.engine().update_rate_series().await.expect("update");
    assert_eq!(
        outcome,
        RateSeriesUpdate::Unchanged {
            latest: sample(2024, 1, 31, 11.0)
        }
    );
}

// =========================================================================
// Overdue assessment
// =========================================================================

#[tokio::test]
async fn overdue_assessment_covers_unpaid_past_grace() {
    let h = Harness::new();
    let engine = h.engine();

    let overdue = h.add_payment(SUPPLIER, "1000.00", date(2024, 1, 1)).await;
    // Within the grace period on 2024-01-11 (10 days vs 5).
    h.add_payment(SUPPLIER, "500.00", date(2024, 1, 8)).await;
    // Paid.
    let paid_id = h.add_payment(SUPPLIER, "700.00", date(2023, 12, 1)).await;
    let paid = Payment {
        paid_date: Some(date(2023, 12, 20)),
        ..h.payment(paid_id).await
    };
    h.store.upsert_payment(&paid).await.expect("upsert");

    let assessments = engine
        .assess_overdue(h.client, date(2024, 1, 11))
        .await
        .expect("assess");
    assert_eq!(assessments.len(), 1);
    let a = &assessments[0];
    assert_eq!(a.payment_id, overdue);
    assert_eq!(a.days_late, 10);
    assert_eq!(a.fees.interest, money("1.10"));
    assert_eq!(a.fees.penalty, money("20.00"));
    assert_eq!(a.fees.total, money("1021.10"));
    // No stored samples, so no correction.
    assert_eq!(a.corrected_net, money("1000.00"));
}

#[tokio::test]
async fn overdue_fees_apply_to_net_after_retentions() {
    let h = Harness::new();
    flat_january(&h);
    let engine = h.engine();
    engine
        .backfill_rates(date(2024, 1, 1), date(2024, 1, 31))
        .await
        .expect("backfill");

    let id = h.add_payment(SUPPLIER, "1052.63", date(2024, 1, 1)).await;
    engine.audit_payment(id).await.expect("audit");

    let assessments = engine
        .assess_overdue(h.client, date(2024, 1, 31))
        .await
        .expect("assess");
    let a = &assessments[0];
    // 1052.63 - 5% ISS (52.63) = 1000.00
    assert_eq!(a.net, money("1000.00"));
    assert_eq!(a.days_late, 30);
    assert_eq!(a.corrected_net, money("1009.36"));
}
