//! Report aggregations over a window of leave requests.
//!
//! Every function here is pure and deterministic: the same records in the same
//! order always give the same output.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::leave_request::{LeaveRecord, LeaveStatus, LeaveType};

pub const UNKNOWN: &str = "Unknown";
pub const DEFAULT_TOP_REQUESTERS: usize = 5;
pub const DEFAULT_RECENT: usize = 10;

/// Rolling window a report covers, always ending today.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    /// Last 7 days.
    #[serde(alias = "thisWeek")]
    ThisWeek,
    /// Last month.
    #[default]
    #[serde(alias = "thisMonth")]
    ThisMonth,
    /// Last 3 months.
    #[serde(alias = "thisQuarter")]
    ThisQuarter,
    /// Last year.
    #[serde(alias = "thisYear")]
    ThisYear,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportPeriod {
    pub fn window(self, today: NaiveDate) -> DateWindow {
        let start = match self {
            ReportPeriod::ThisWeek => today.checked_sub_days(Days::new(7)),
            ReportPeriod::ThisMonth => today.checked_sub_months(Months::new(1)),
            ReportPeriod::ThisQuarter => today.checked_sub_months(Months::new(3)),
            ReportPeriod::ThisYear => today.checked_sub_months(Months::new(12)),
        };
        DateWindow {
            start: start.unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RequesterCount {
    pub name: String,
    pub requests: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveReport {
    pub total: usize,
    pub by_type: BTreeMap<LeaveType, usize>,
    pub by_department: BTreeMap<String, usize>,
    pub by_status: BTreeMap<LeaveStatus, usize>,
    pub top_requesters: Vec<RequesterCount>,
    pub recent: Vec<LeaveRecord>,
}

fn label_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

pub fn by_type(records: &[LeaveRecord]) -> BTreeMap<LeaveType, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.request.leave_type).or_insert(0) += 1;
    }
    counts
}

/// Requests per submitter department; missing departments count as `Unknown`.
pub fn by_department(records: &[LeaveRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts
            .entry(label_or_unknown(record.department.as_deref()))
            .or_insert(0) += 1;
    }
    counts
}

pub fn by_status(records: &[LeaveRecord]) -> BTreeMap<LeaveStatus, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.request.status).or_insert(0) += 1;
    }
    counts
}

/// The `n` submitters with the most requests, highest first.
///
/// Ties keep the order in which each name first appears in `records`.
pub fn top_requesters(records: &[LeaveRecord], n: usize) -> Vec<RequesterCount> {
    let mut order: Vec<RequesterCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let name = label_or_unknown(record.employee_name.as_deref());
        match index.get(&name) {
            Some(&i) => order[i].requests += 1,
            None => {
                index.insert(name.clone(), order.len());
                order.push(RequesterCount { name, requests: 1 });
            }
        }
    }

    // sort_by is stable
    order.sort_by(|a, b| b.requests.cmp(&a.requests));
    order.truncate(n);
    order
}

/// The `n` most recently created records, newest first.
pub fn most_recent(records: &[LeaveRecord], n: usize) -> Vec<LeaveRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.request.created_at.cmp(&a.request.created_at));
    sorted.truncate(n);
    sorted
}

pub fn summarize(records: &[LeaveRecord]) -> LeaveReport {
    LeaveReport {
        total: records.len(),
        by_type: by_type(records),
        by_department: by_department(records),
        by_status: by_status(records),
        top_requesters: top_requesters(records, DEFAULT_TOP_REQUESTERS),
        recent: most_recent(records, DEFAULT_RECENT),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::model::leave_request::{LeaveDuration, LeaveRequest};

    fn record(i: usize, name: Option<&str>, status: LeaveStatus, leave_type: LeaveType) -> LeaveRecord {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let created = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap() + Duration::hours(i as i64);
        let decided = status.is_terminal();
        LeaveRecord {
            request: LeaveRequest {
                id: format!("r{i}"),
                employee_id: name.unwrap_or("anon").to_lowercase(),
                leave_type,
                start_date: day,
                end_date: day,
                duration: LeaveDuration::FullDay,
                reason: None,
                status,
                manager_comments: None,
                approved_by: decided.then(|| "m1".to_string()),
                approved_at: decided.then_some(created),
                created_at: created,
            },
            employee_name: name.map(str::to_string),
            department: name.map(|_| "Engineering".to_string()),
        }
    }

    #[test]
    fn status_counts_cover_every_record() {
        let statuses = [
            LeaveStatus::Pending,
            LeaveStatus::Approved,
            LeaveStatus::Pending,
            LeaveStatus::Rejected,
            LeaveStatus::Pending,
            LeaveStatus::Approved,
            LeaveStatus::Pending,
            LeaveStatus::Rejected,
            LeaveStatus::Approved,
            LeaveStatus::Pending,
        ];
        let records: Vec<_> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| record(i, Some("A"), *s, LeaveType::Annual))
            .collect();

        let counts = by_status(&records);
        assert_eq!(counts[&LeaveStatus::Pending], 5);
        assert_eq!(counts[&LeaveStatus::Approved], 3);
        assert_eq!(counts[&LeaveStatus::Rejected], 2);
        assert_eq!(counts.values().sum::<usize>(), records.len());
    }

    #[test]
    fn top_requesters_orders_by_count() {
        let names = ["C", "A", "B", "A", "B", "A"];
        let records: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, n)| record(i, Some(n), LeaveStatus::Pending, LeaveType::Annual))
            .collect();

        let top = top_requesters(&records, 2);
        assert_eq!(
            top,
            vec![
                RequesterCount { name: "A".into(), requests: 3 },
                RequesterCount { name: "B".into(), requests: 2 },
            ]
        );
    }

    #[test]
    fn top_requesters_ties_keep_first_seen_order() {
        let names = ["B", "A", "A", "B", "C"];
        let records: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, n)| record(i, Some(n), LeaveStatus::Pending, LeaveType::Sick))
            .collect();

        let top: Vec<_> = top_requesters(&records, 5).into_iter().map(|r| r.name).collect();
        assert_eq!(top, vec!["B", "A", "C"]);
    }

    #[test]
    fn missing_department_and_name_fall_back_to_unknown() {
        let records = vec![
            record(0, None, LeaveStatus::Pending, LeaveType::Personal),
            record(1, Some("A"), LeaveStatus::Pending, LeaveType::Personal),
        ];
        let departments = by_department(&records);
        assert_eq!(departments[UNKNOWN], 1);
        assert_eq!(departments["Engineering"], 1);
        assert_eq!(top_requesters(&records, 5)[0].name, UNKNOWN);
    }

    #[test]
    fn most_recent_is_newest_first() {
        let records: Vec<_> = (0..12)
            .map(|i| record(i, Some("A"), LeaveStatus::Pending, LeaveType::Emergency))
            .collect();
        let recent = most_recent(&records, DEFAULT_RECENT);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].request.id, "r11");
        assert_eq!(recent[9].request.id, "r2");
    }

    #[test]
    fn summary_is_order_independent_for_counts() {
        let mut records: Vec<_> = (0..4)
            .map(|i| record(i, Some("A"), LeaveStatus::Approved, LeaveType::Annual))
            .collect();
        records.push(record(4, Some("B"), LeaveStatus::Pending, LeaveType::Sick));

        let forward = summarize(&records);
        records.reverse();
        let backward = summarize(&records);
        assert_eq!(forward.by_type, backward.by_type);
        assert_eq!(forward.by_status, backward.by_status);
        assert_eq!(forward.recent, backward.recent);
        assert_eq!(forward.total, 5);
        assert_eq!(forward.by_type[&LeaveType::Annual], 4);
    }

    #[test]
    fn period_windows_end_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(
            ReportPeriod::ThisWeek.window(today).start,
            NaiveDate::from_ymd_opt(2024, 3, 24).unwrap()
        );
        assert_eq!(
            ReportPeriod::ThisMonth.window(today).start,
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            ReportPeriod::ThisYear.window(today).start,
            NaiveDate::from_ymd_opt(2023, 3, 31).unwrap()
        );
        assert_eq!(ReportPeriod::default(), ReportPeriod::ThisMonth);
        assert_eq!(
            serde_json::from_str::<ReportPeriod>("\"thisQuarter\"").unwrap(),
            ReportPeriod::ThisQuarter
        );
    }
}
