#![allow(async_fn_in_trait)]

pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::errors::StoreError;
use crate::models::employee::{Employee, EmployeeDraft, Gender};
use crate::models::user::Account;

pub use memory::{MemoryAccountStore, MemoryEmployeeStore};
pub use postgres::{PgAccountStore, PgEmployeeStore};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Conjunctive record criteria. Absent criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmployeeFilter {
    pub department: Option<String>,
    pub role: Option<String>,
    pub gender: Option<Gender>,
    pub state: Option<String>,
    /// Case-insensitive substring over employee id, names, email and department.
    pub search: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub created_to: Option<DateTime<Utc>>,
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        fn eq(want: &Option<String>, have: &str) -> bool {
            want.as_deref().map_or(true, |want| want == have)
        }

        eq(&self.department, &employee.department)
            && eq(&self.role, &employee.role)
            && eq(&self.state, &employee.state)
            && self.gender.map_or(true, |gender| gender == employee.gender)
            && self
                .created_from
                .map_or(true, |from| employee.created_at >= from)
            && self.created_to.map_or(true, |to| employee.created_at <= to)
            && self.search.as_deref().map_or(true, |needle| {
                let needle = needle.to_lowercase();
                [
                    &employee.employee_id,
                    &employee.first_name,
                    &employee.surname,
                    &employee.email,
                    &employee.department,
                ]
                .iter()
                .any(|value| value.to_lowercase().contains(&needle))
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// `created_at` descending. Equal timestamps have no guaranteed order.
    #[default]
    NewestFirst,
    OldestFirst,
    ById,
}

/// A LIMIT/OFFSET window over a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

/// Durable employee storage with unique `employee_id` and `email`.
pub trait EmployeeStore: Send + Sync + 'static {
    async fn insert(
        &self,
        draft: &EmployeeDraft,
        profile_picture: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Employee, StoreError>;

    /// Full overwrite of the editable fields of record `id`.
    async fn update(
        &self,
        id: i64,
        draft: &EmployeeDraft,
        updated_at: DateTime<Utc>,
    ) -> Result<Employee, StoreError>;

    async fn get(&self, id: i64) -> Result<Employee, StoreError>;

    /// Removes record `id` and returns it.
    async fn delete(&self, id: i64) -> Result<Employee, StoreError>;

    /// Removes every record whose id is in `ids` and returns the removed
    /// records. Unknown ids are skipped.
    async fn delete_many(&self, ids: &[i64]) -> Result<Vec<Employee>, StoreError>;

    async fn exists_employee_id(&self, employee_id: &str) -> Result<bool, StoreError>;

    async fn exists_email(&self, email: &str) -> Result<bool, StoreError>;

    async fn scan(
        &self,
        filter: &EmployeeFilter,
        order: SortOrder,
        window: Option<Window>,
    ) -> Result<Vec<Employee>, StoreError>;

    async fn count(&self, filter: &EmployeeFilter) -> Result<u64, StoreError>;

    /// Distinct non-empty departments, ascending.
    async fn departments(&self) -> Result<Vec<String>, StoreError>;
}

/// Login accounts.
pub trait AccountStore: Send + Sync + 'static {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    /// Creates the account as a superuser, or resets an existing one's
    /// password and grants it superuser.
    async fn upsert_superuser(&self, username: &str, password_hash: &str)
        -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::employee::fixtures::employee;
    use chrono::{Duration, TimeZone};

    #[test]
    fn empty_filter_matches_everything() {
        let record = employee(1, Utc::now());
        assert!(EmployeeFilter::default().matches(&record));
    }

    #[test]
    fn criteria_combine_conjunctively() {
        let created = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let record = employee(1, created);

        let filter = EmployeeFilter {
            department: Some("Eng".into()),
            created_from: Some(created),
            created_to: Some(created),
            ..Default::default()
        };
        assert!(filter.matches(&record));

        let filter = EmployeeFilter {
            department: Some("Eng".into()),
            created_from: Some(created + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!filter.matches(&record));

        let filter = EmployeeFilter {
            department: Some("Ops".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&record));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let record = employee(7, Utc::now());
        let hit = |needle: &str| {
            EmployeeFilter {
                search: Some(needle.into()),
                ..Default::default()
            }
            .matches(&record)
        };
        assert!(hit("e7"));
        assert!(hit("EXAMPLE.COM"));
        assert!(hit("ada"));
        assert!(!hit("zzz"));
    }
}
