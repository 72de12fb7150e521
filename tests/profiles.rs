mod common;

use common::{application, date, engine, seed, session};
use leave_tracker::error::LeaveError;
use leave_tracker::leave::{DashboardStats, NewUser, PageRequest};
use leave_tracker::model::leave_request::{Decision, LeaveType};
use leave_tracker::model::profile::{ProfileFilter, ProfilePatch};
use leave_tracker::model::role::Role;
use leave_tracker::store::RecordStore;

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        full_name: "Carol Jones".to_string(),
        department: Some("Finance".to_string()),
        role: None,
        annual_leave_balance: None,
        sick_leave_balance: Some(12.0),
    }
}

#[actix_web::test]
async fn first_sign_in_creates_a_default_profile_once() {
    let engine = engine();
    let carol = session("carol");

    let created = engine.ensure_profile(&carol).await.unwrap();
    assert_eq!(created.role, Role::Employee);
    assert!(created.is_active);
    assert_eq!(created.annual_leave_balance, 25.0);
    assert_eq!(created.sick_leave_balance, 10.0);
    assert_eq!(created.department.as_deref(), Some("General"));

    let again = engine.ensure_profile(&carol).await.unwrap();
    assert_eq!(again, created);
    assert_eq!(engine.history(&carol, "carol").await.unwrap().len(), 2);
}

#[actix_web::test]
async fn hr_creates_profiles_for_new_accounts() {
    let engine = engine();
    let hr = seed(&engine, "hr", Role::Hr, None).await;
    let alice = seed(&engine, "alice", Role::Employee, None).await;

    let err = engine
        .create_profile(&alice, "carol", new_user("carol@company.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Authorization { .. }));

    let profile = engine
        .create_profile(&hr, "carol", new_user("  Carol@Company.com "))
        .await
        .unwrap();
    assert_eq!(profile.id, "carol");
    assert_eq!(profile.email, "carol@company.com");
    assert_eq!(profile.role, Role::Employee);
    assert_eq!(profile.annual_leave_balance, 25.0);
    assert_eq!(profile.sick_leave_balance, 12.0);

    let err = engine
        .create_profile(&hr, "dave", NewUser {
            annual_leave_balance: Some(-3.0),
            ..new_user("dave@company.com")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Validation { .. }));
}

#[actix_web::test]
async fn admin_profiles_are_out_of_reach_of_user_management() {
    let engine = engine();
    let hr = seed(&engine, "hr", Role::Hr, None).await;
    seed(&engine, "root", Role::Admin, None).await;
    seed(&engine, "alice", Role::Employee, None).await;

    let err = engine.deactivate(&hr, "root").await.unwrap_err();
    assert!(matches!(err, LeaveError::Authorization { .. }));

    let err = engine
        .update_profile(&hr, "alice", ProfilePatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Validation { .. }));

    let promoted = engine
        .update_profile(&hr, "alice", ProfilePatch {
            role: Some(Role::Manager),
            department: Some("Ops".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Manager);
    assert_eq!(promoted.department.as_deref(), Some("Ops"));
    assert_eq!(promoted.annual_leave_balance, 25.0);

    let err = engine
        .update_profile(&hr, "nobody", ProfilePatch {
            is_active: Some(false),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::NotFound { .. }));
}

#[actix_web::test]
async fn user_management_never_grants_admin() {
    let engine = engine();
    let hr = seed(&engine, "hr", Role::Hr, None).await;
    seed(&engine, "alice", Role::Employee, None).await;

    let err = engine
        .update_profile(&hr, "hr", ProfilePatch {
            role: Some(Role::Admin),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Authorization { .. }));

    let err = engine
        .update_profile(&hr, "alice", ProfilePatch {
            role: Some(Role::Admin),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Authorization { .. }));
    assert_eq!(engine.store().fetch_profile("hr").await.unwrap().unwrap().role, Role::Hr);
    assert_eq!(engine.store().fetch_profile("alice").await.unwrap().unwrap().role, Role::Employee);

    let err = engine
        .create_profile(&hr, "carol", NewUser {
            role: Some(Role::Admin),
            ..new_user("carol@company.com")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Authorization { .. }));
    assert!(engine.store().fetch_profile("carol").await.unwrap().is_none());
}

#[actix_web::test]
async fn new_user_input_is_checked_before_any_account_exists() {
    let engine = engine();
    let hr = seed(&engine, "hr", Role::Hr, None).await;
    let alice = seed(&engine, "alice", Role::Employee, None).await;

    let blank_name = NewUser {
        full_name: "   ".to_string(),
        ..new_user("carol@company.com")
    };
    let negative = NewUser {
        annual_leave_balance: Some(-1.0),
        ..new_user("carol@company.com")
    };
    let not_a_number = NewUser {
        sick_leave_balance: Some(f64::NAN),
        ..new_user("carol@company.com")
    };

    for bad in [&blank_name, &negative, &not_a_number] {
        let err = engine.check_new_user(&hr, bad).await.unwrap_err();
        assert!(matches!(err, LeaveError::Validation { .. }));
    }

    let err = engine
        .check_new_user(&alice, &new_user("carol@company.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Authorization { .. }));

    engine.check_new_user(&hr, &new_user("carol@company.com")).await.unwrap();
    assert!(engine.store().fetch_profile("carol").await.unwrap().is_none());
}

#[actix_web::test]
async fn deactivated_users_lose_access() {
    let engine = engine();
    let hr = seed(&engine, "hr", Role::Hr, None).await;
    let boss = seed(&engine, "boss", Role::Manager, None).await;
    let alice = seed(&engine, "alice", Role::Employee, None).await;

    let request = engine
        .submit(&alice, application(LeaveType::Annual, date(2024, 3, 1), date(2024, 3, 1)))
        .await
        .unwrap();

    let deactivated = engine.deactivate(&hr, "boss").await.unwrap();
    assert!(!deactivated.is_active);

    let err = engine
        .decide(&boss, &request.id, Decision::Approved, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Authorization { .. }));
}

#[actix_web::test]
async fn profiles_list_with_filters_and_paging() {
    let engine = engine();
    let hr = seed(&engine, "hr", Role::Hr, Some("People")).await;
    seed(&engine, "alice", Role::Employee, Some("Sales")).await;
    seed(&engine, "bob", Role::Employee, Some("Sales")).await;
    let boss = seed(&engine, "boss", Role::Manager, Some("Sales")).await;

    let err = engine
        .list_profiles(&boss, ProfileFilter::default(), PageRequest::new(None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, LeaveError::Authorization { .. }));

    let everyone = engine
        .list_profiles(&hr, ProfileFilter::default(), PageRequest::new(None, None))
        .await
        .unwrap();
    assert_eq!(everyone.total, 4);
    assert_eq!(everyone.per_page, 10);

    let sales_employees = engine
        .list_profiles(
            &hr,
            ProfileFilter {
                role: Some(Role::Employee),
                department: Some("Sales".into()),
                ..Default::default()
            },
            PageRequest::new(Some(1), Some(1)),
        )
        .await
        .unwrap();
    assert_eq!(sales_employees.total, 2);
    assert_eq!(sales_employees.data.len(), 1);

    let search = engine
        .list_profiles(
            &hr,
            ProfileFilter {
                search: Some("ALICE".into()),
                ..Default::default()
            },
            PageRequest::new(None, None),
        )
        .await
        .unwrap();
    assert_eq!(search.total, 1);
    assert_eq!(search.data[0].id, "alice");
}

#[actix_web::test]
async fn dashboard_counts_active_users_and_pending_requests() {
    let engine = engine();
    let hr = seed(&engine, "hr", Role::Hr, None).await;
    let alice = seed(&engine, "alice", Role::Employee, None).await;
    seed(&engine, "bob", Role::Employee, None).await;

    for day in 1..=2 {
        engine
            .submit(&alice, application(LeaveType::Annual, date(2024, 3, day), date(2024, 3, day)))
            .await
            .unwrap();
    }
    engine.deactivate(&hr, "bob").await.unwrap();

    let stats = engine.dashboard_stats(&hr).await.unwrap();
    assert_eq!(
        stats,
        DashboardStats {
            active_users: 2,
            pending_requests: 2,
        }
    );

    let err = engine.dashboard_stats(&alice).await.unwrap_err();
    assert!(matches!(err, LeaveError::Authorization { .. }));
}

#[test]
fn page_request_clamps_bounds() {
    let page = PageRequest::new(Some(0), Some(1000));
    assert_eq!(page.page, 1);
    assert_eq!(page.per_page, 100);
}
