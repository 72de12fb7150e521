mod common;

use common::{application, date, engine, seed};
use leave_tracker::error::LeaveError;
use leave_tracker::model::balance::{AdjustmentKind, BalancePool};
use leave_tracker::model::leave_request::{Decision, LeaveType};
use leave_tracker::model::role::Role;
use leave_tracker::store::RecordStore;

#[actix_web::test]
async fn history_records_openings_overrides_and_approvals() {
    let engine = engine();
    let alice = seed(&engine, "alice", Role::Employee, None).await;
    let hr = seed(&engine, "hr", Role::Hr, None).await;

    let adjustment = engine
        .set_balance(&hr, "alice", BalancePool::Annual, 30.0)
        .await
        .unwrap();
    assert_eq!(adjustment.kind, AdjustmentKind::AdminOverride);
    assert_eq!(adjustment.delta, 5.0);
    assert_eq!(adjustment.balance_after, 30.0);
    assert_eq!(adjustment.actor_id.as_deref(), Some("hr"));

    let request = engine
        .submit(&alice, application(LeaveType::Annual, date(2024, 6, 3), date(2024, 6, 7)))
        .await
        .unwrap();
    engine
        .decide(&hr, &request.id, Decision::Approved, None)
        .await
        .unwrap();

    let history = engine.history(&alice, "alice").await.unwrap();
    let kinds: Vec<_> = history.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AdjustmentKind::Opening,
            AdjustmentKind::Opening,
            AdjustmentKind::AdminOverride,
            AdjustmentKind::LeaveApproved,
        ]
    );

    let approval = &history[3];
    assert_eq!(approval.delta, -5.0);
    assert_eq!(approval.balance_after, 25.0);
    assert_eq!(approval.request_id.as_deref(), Some(request.id.as_str()));
}

#[actix_web::test]
async fn reconcile_matches_recorded_balances() {
    let engine = engine();
    let alice = seed(&engine, "alice", Role::Employee, None).await;
    let hr = seed(&engine, "hr", Role::Admin, None).await;

    for (leave_type, day) in [(LeaveType::Annual, 1), (LeaveType::Sick, 8), (LeaveType::Emergency, 15)] {
        let request = engine
            .submit(&alice, application(leave_type, date(2024, 7, day), date(2024, 7, day + 1)))
            .await
            .unwrap();
        engine
            .decide(&hr, &request.id, Decision::Approved, None)
            .await
            .unwrap();
    }
    engine
        .set_balance(&hr, "alice", BalancePool::Sick, 12.5)
        .await
        .unwrap();

    let reconciliation = engine.reconcile(&hr, "alice").await.unwrap();
    assert!(reconciliation.is_consistent());

    let annual = reconciliation
        .pools
        .iter()
        .find(|p| p.pool == BalancePool::Annual)
        .unwrap();
    assert_eq!(annual.recorded, 21.0);
    assert_eq!(annual.ledger_total, 21.0);

    let sick = reconciliation
        .pools
        .iter()
        .find(|p| p.pool == BalancePool::Sick)
        .unwrap();
    assert_eq!(sick.recorded, 12.5);
}

#[actix_web::test]
async fn only_hr_and_admins_override_balances() {
    let engine = engine();
    let alice = seed(&engine, "alice", Role::Employee, None).await;
    let boss = seed(&engine, "boss", Role::Manager, None).await;
    let hr = seed(&engine, "hr", Role::Hr, None).await;

    for actor in [&alice, &boss] {
        let err = engine
            .set_balance(actor, "alice", BalancePool::Annual, 99.0)
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Authorization { .. }));
    }

    let err = engine
        .set_balance(&hr, "alice", BalancePool::Annual, -1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Validation { .. }));

    let err = engine
        .set_balance(&hr, "nobody", BalancePool::Annual, 5.0)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::NotFound { .. }));

    let profile = engine.store().fetch_profile("alice").await.unwrap().unwrap();
    assert_eq!(profile.annual_leave_balance, 25.0);
}

#[actix_web::test]
async fn direct_debit_refuses_to_go_negative() {
    let engine = engine();
    seed(&engine, "alice", Role::Employee, None).await;

    let remaining = engine.debit("alice", LeaveType::Sick, 4.0).await.unwrap();
    assert_eq!(remaining, 6.0);

    let err = engine.debit("alice", LeaveType::Sick, 6.5).await.unwrap_err();
    assert!(matches!(err, LeaveError::InsufficientBalance { .. }));

    let err = engine.debit("alice", LeaveType::Annual, -1.0).await.unwrap_err();
    assert!(matches!(err, LeaveError::Validation { .. }));

    let profile = engine.store().fetch_profile("alice").await.unwrap().unwrap();
    assert_eq!(profile.sick_leave_balance, 6.0);
    assert_eq!(profile.annual_leave_balance, 25.0);
}

#[actix_web::test]
async fn history_is_visible_to_owner_and_user_managers_only() {
    let engine = engine();
    let alice = seed(&engine, "alice", Role::Employee, None).await;
    let bob = seed(&engine, "bob", Role::Employee, None).await;
    let boss = seed(&engine, "boss", Role::Manager, None).await;
    let hr = seed(&engine, "hr", Role::Hr, None).await;

    assert_eq!(engine.history(&alice, "alice").await.unwrap().len(), 2);
    assert!(engine.history(&hr, "alice").await.is_ok());

    for actor in [&bob, &boss] {
        let err = engine.history(actor, "alice").await.unwrap_err();
        assert!(matches!(err, LeaveError::Authorization { .. }));
    }
}
