#![allow(dead_code)]

use chrono::{NaiveDate, Utc};

use leave_tracker::leave::lifecycle::LeaveApplication;
use leave_tracker::leave::{LeaveEngine, ProfileDefaults};
use leave_tracker::model::leave_request::{LeaveDuration, LeaveType};
use leave_tracker::model::profile::Profile;
use leave_tracker::model::role::Role;
use leave_tracker::model::session::Session;
use leave_tracker::store::RecordStore;
use leave_tracker::store::memory::MemoryStore;

pub type TestEngine = LeaveEngine<MemoryStore>;

pub fn engine() -> TestEngine {
    LeaveEngine::new(MemoryStore::new(), ProfileDefaults::default())
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn session(id: &str) -> Session {
    Session::new(id, format!("{id}@company.com"))
}

/// Inserts a profile straight into the store and returns its session.
pub async fn seed(engine: &TestEngine, id: &str, role: Role, department: Option<&str>) -> Session {
    let profile = Profile {
        id: id.to_string(),
        email: format!("{id}@company.com"),
        full_name: format!("{id} name"),
        department: department.map(str::to_string),
        role,
        is_active: true,
        annual_leave_balance: 25.0,
        sick_leave_balance: 10.0,
        created_at: Utc::now(),
    };
    engine.store().insert_profile(&profile).await.unwrap();
    session(id)
}

pub fn application(leave_type: LeaveType, start: NaiveDate, end: NaiveDate) -> LeaveApplication {
    LeaveApplication {
        leave_type,
        start_date: start,
        end_date: end,
        duration: LeaveDuration::FullDay,
        reason: Some("Family trip".to_string()),
    }
}
