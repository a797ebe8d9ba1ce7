mod common;

use common::{day, harness};
use kennel_billing::domain::money::{Amount, Money};
use kennel_billing::domain::outcome::OutcomeKind;
use kennel_billing::domain::payment::PaymentStatus;
use kennel_billing::domain::ports::{PaymentStore, TransferStore};
use kennel_billing::domain::stay::{NewStay, StayUpdate};
use kennel_billing::domain::transfer::IncomingTransfer;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn transfer(account: &str, title: &str, amount: rust_decimal::Decimal) -> IncomingTransfer {
    IncomingTransfer::new(account, "Sender", title, Amount::new(amount).unwrap())
}

#[tokio::test]
async fn test_partial_then_remaining_payment() {
    let h = harness(day(6, 1), 1).await;
    let (stay, _) = h
        .engine
        .booking()
        .create_stay(NewStay::new(1, 1, day(6, 1), day(6, 3)))
        .await
        .unwrap();

    // first instalment, a week after checkout
    h.clock.set(day(6, 10).and_hms_opt(12, 0, 0).unwrap().and_utc());
    h.engine
        .ingest_transfer(transfer("ACC-1", &format!("stay {}", stay.id), dec!(100)))
        .await
        .unwrap();
    let report = h.engine.reconciliation().trigger().await.unwrap();
    assert_eq!(report.count(OutcomeKind::PartiallyMatched), 1);

    let payment = h.ledger.payment_for_stay(stay.id).await.unwrap().unwrap();
    assert_eq!(payment.status(), PaymentStatus::PartiallyPaidOverdue);
    assert_eq!(payment.overdue_days, 7);
    assert_eq!(payment.outstanding(), Money::new(dec!(50)));

    // later passes keep counting
    h.clock.advance_days(3);
    let report = h.engine.reconciliation().trigger().await.unwrap();
    assert_eq!(report.examined, 0);
    assert_eq!(report.overdue_refreshed, 1);
    let payment = h.ledger.payment_for_stay(stay.id).await.unwrap().unwrap();
    assert_eq!(payment.overdue_days, 10);

    // remainder settles
    h.engine
        .ingest_transfer(transfer("ACC-1", &stay.id.to_string(), dec!(50)))
        .await
        .unwrap();
    h.engine.reconciliation().trigger().await.unwrap();
    let payment = h.ledger.payment_for_stay(stay.id).await.unwrap().unwrap();
    assert_eq!(payment.status(), PaymentStatus::Paid);
    assert_eq!(payment.overdue_days, 0);
    assert_eq!(payment.amount_received, Money::new(dec!(150)));

    assert_eq!(
        h.events.kinds(),
        vec![OutcomeKind::PartiallyMatched, OutcomeKind::Matched]
    );
}

#[tokio::test]
async fn test_unmatchable_transfers_stay_pending_and_retry() {
    let h = harness(day(6, 20), 2).await;
    let (stay, _) = h
        .engine
        .booking()
        .create_stay(NewStay::new(1, 1, day(6, 1), day(6, 1)))
        .await
        .unwrap();

    h.engine
        .ingest_transfer(transfer("ACC-1", "thanks for the stay", dec!(50)))
        .await
        .unwrap();
    h.engine
        .ingest_transfer(transfer("ACC-1", "Stay 999", dec!(50)))
        .await
        .unwrap();
    h.engine
        .ingest_transfer(transfer("ACC-2", &format!("Stay {}", stay.id), dec!(50)))
        .await
        .unwrap();

    let report = h.engine.reconciliation().trigger().await.unwrap();
    assert_eq!(report.examined, 3);
    assert_eq!(report.count(OutcomeKind::Unparseable), 1);
    assert_eq!(report.count(OutcomeKind::StayNotFound), 1);
    assert_eq!(report.count(OutcomeKind::AccountMismatch), 1);
    assert!(!report.changed_ledger());

    let payment = h.ledger.payment_for_stay(stay.id).await.unwrap().unwrap();
    assert_eq!(payment.status(), PaymentStatus::Unpaid);
    assert_eq!(h.ledger.unmatched_transfers().await.unwrap().len(), 3);

    // they are looked at again on the next pass
    let report = h.engine.reconciliation().trigger().await.unwrap();
    assert_eq!(report.examined, 3);
}

#[tokio::test]
async fn test_rate_change_after_partial_payment() {
    let h = harness(day(6, 1), 1).await;
    let (stay, _) = h
        .engine
        .booking()
        .create_stay(NewStay::new(1, 1, day(6, 1), day(6, 2)))
        .await
        .unwrap();

    // the stay is extended before the transfer is reconciled
    h.engine
        .booking()
        .update_stay(
            stay.id,
            StayUpdate {
                end_date: Some(day(6, 4)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    h.engine
        .ingest_transfer(transfer("ACC-1", &format!("Stay {}", stay.id), dec!(100)))
        .await
        .unwrap();
    h.engine.reconciliation().trigger().await.unwrap();

    let payment = h.ledger.payment_for_stay(stay.id).await.unwrap().unwrap();
    assert_eq!(payment.amount, Money::new(dec!(200)));
    assert_eq!(payment.status(), PaymentStatus::PartiallyPaidOverdue);
}

#[tokio::test]
async fn test_bookings_and_passes_run_side_by_side() {
    let h = Arc::new(harness(day(8, 1), 8).await);
    for dog in 1..=8 {
        let (stay, _) = h
            .engine
            .booking()
            .create_stay(NewStay::new(dog, dog, day(7, 1), day(7, 2)))
            .await
            .unwrap();
        h.engine
            .ingest_transfer(transfer(&format!("ACC-{dog}"), &format!("Stay {}", stay.id), dec!(100)))
            .await
            .unwrap();
    }

    let passes: Vec<_> = (0..4)
        .map(|_| {
            let h = h.clone();
            tokio::spawn(async move { h.engine.reconciliation().trigger().await.unwrap() })
        })
        .collect();
    let bookings: Vec<_> = (1..=8)
        .map(|dog| {
            let h = h.clone();
            tokio::spawn(async move {
                h.engine
                    .booking()
                    .create_stay(NewStay::new(dog, dog, day(9, 1), day(9, 1)))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut matched = 0;
    for pass in passes {
        matched += pass.await.unwrap().matched();
    }
    for booking in bookings {
        booking.await.unwrap();
    }

    // each transfer credited exactly once across all passes
    assert_eq!(matched, 8);
    let payments = h.ledger.all_payments().await.unwrap();
    assert_eq!(payments.len(), 16);
    assert_eq!(payments.iter().filter(|p| p.is_paid).count(), 8);
    assert!(payments.iter().all(|p| p.amount_received <= p.amount));
}
