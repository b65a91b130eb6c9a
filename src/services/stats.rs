//! Grouped aggregates behind the dashboard. All functions work on an
//! already filtered record set.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::db::EmployeeFilter;
use crate::models::employee::Employee;

pub const TOP_ROLES: usize = 8;
pub const RECENT_LIMIT: usize = 5;
pub const TREND_WINDOW_DAYS: i64 = 180;

const GENDER_CATEGORIES: [&str; 3] = ["Male", "Female", "Other"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Department,
    Role,
    State,
}

impl GroupField {
    fn value(self, employee: &Employee) -> &str {
        match self {
            GroupField::Department => &employee.department,
            GroupField::Role => &employee.role,
            GroupField::State => &employee.state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderShare {
    pub gender: &'static str,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    /// First day of the month.
    pub month: NaiveDate,
    pub count: u64,
}

/// Counts records per distinct non-empty value of `field`, largest group
/// first. Equal counts are ordered by value.
pub fn group_count(records: &[Employee], field: GroupField) -> Vec<GroupCount> {
    let mut groups: BTreeMap<&str, u64> = BTreeMap::new();
    for value in records.iter().map(|employee| field.value(employee)) {
        if !value.is_empty() {
            *groups.entry(value).or_default() += 1;
        }
    }

    let mut counts: Vec<GroupCount> = groups
        .into_iter()
        .map(|(value, count)| GroupCount {
            value: value.to_string(),
            count,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

pub fn gender_breakdown(records: &[Employee]) -> Vec<GenderShare> {
    let total = records.len() as u64;
    GENDER_CATEGORIES
        .iter()
        .filter_map(|&gender| {
            let count = records
                .iter()
                .filter(|employee| employee.gender.as_str() == gender)
                .count() as u64;
            (count > 0).then(|| GenderShare {
                gender,
                count,
                percentage: percentage(count, total),
            })
        })
        .collect()
}

/// Creations per calendar month over the trailing `window`, oldest month
/// first. Months without creations are left out.
pub fn monthly_trend(records: &[Employee], now: DateTime<Utc>, window: Duration) -> Vec<MonthlyCount> {
    let since = now - window;
    let mut months: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for employee in records.iter().filter(|employee| employee.created_at >= since) {
        if let Some(month) = employee.created_at.date_naive().with_day(1) {
            *months.entry(month).or_default() += 1;
        }
    }
    months
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_employees: u64,
    pub departments: Vec<GroupCount>,
    pub genders: Vec<GenderShare>,
    pub roles: Vec<GroupCount>,
    pub states: Vec<GroupCount>,
    pub recent_employees: Vec<Employee>,
    pub monthly_hires: Vec<MonthlyCount>,
    pub department_choices: Vec<String>,
    pub applied_filters: EmployeeFilter,
}

impl DashboardStats {
    /// `records` must be the filtered set ordered newest first.
    pub fn build(
        records: Vec<Employee>,
        department_choices: Vec<String>,
        applied_filters: EmployeeFilter,
        now: DateTime<Utc>,
    ) -> Self {
        let mut roles = group_count(&records, GroupField::Role);
        roles.truncate(TOP_ROLES);

        Self {
            total_employees: records.len() as u64,
            departments: group_count(&records, GroupField::Department),
            genders: gender_breakdown(&records),
            roles,
            states: group_count(&records, GroupField::State),
            monthly_hires: monthly_trend(&records, now, Duration::days(TREND_WINDOW_DAYS)),
            recent_employees: records.iter().take(RECENT_LIMIT).cloned().collect(),
            department_choices,
            applied_filters,
        }
    }
}
