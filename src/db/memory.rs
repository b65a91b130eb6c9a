//! In-process stores for local development and tests. They enforce the
//! same unique indexes as the PostgreSQL schema.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::db::{AccountStore, EmployeeFilter, EmployeeStore, SortOrder, Window};
use crate::errors::{StoreError, UniqueIndex};
use crate::models::employee::{Employee, EmployeeDraft};
use crate::models::user::Account;

#[derive(Default)]
struct EmployeeTable {
    last_id: i64,
    rows: BTreeMap<i64, Employee>,
}

impl EmployeeTable {
    /// Unique-index check against every row except `skip`.
    fn check_unique(&self, draft: &EmployeeDraft, skip: Option<i64>) -> Result<(), StoreError> {
        for row in self.rows.values().filter(|row| Some(row.id) != skip) {
            if row.employee_id == draft.employee_id {
                return Err(StoreError::UniqueViolation {
                    index: UniqueIndex::EmployeeId,
                    value: draft.employee_id.clone(),
                });
            }
            if row.email == draft.email {
                return Err(StoreError::UniqueViolation {
                    index: UniqueIndex::Email,
                    value: draft.email.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEmployeeStore {
    table: RwLock<EmployeeTable>,
}

impl MemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EmployeeStore for MemoryEmployeeStore {
    async fn insert(
        &self,
        draft: &EmployeeDraft,
        profile_picture: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Employee, StoreError> {
        let mut table = self.table.write().await;
        table.check_unique(draft, None)?;

        table.last_id += 1;
        let id = table.last_id;
        let employee = draft
            .clone()
            .into_employee(id, profile_picture.map(str::to_string), now);
        table.rows.insert(id, employee.clone());
        Ok(employee)
    }

    async fn update(
        &self,
        id: i64,
        draft: &EmployeeDraft,
        updated_at: DateTime<Utc>,
    ) -> Result<Employee, StoreError> {
        let mut table = self.table.write().await;
        if !table.rows.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        table.check_unique(draft, Some(id))?;

        let employee = table.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let updated_at = updated_at.max(employee.created_at);
        employee.apply(draft.clone(), updated_at);
        Ok(employee.clone())
    }

    async fn get(&self, id: i64) -> Result<Employee, StoreError> {
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<Employee, StoreError> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<Vec<Employee>, StoreError> {
        let mut table = self.table.write().await;
        Ok(ids.iter().filter_map(|id| table.rows.remove(id)).collect())
    }

    async fn exists_employee_id(&self, employee_id: &str) -> Result<bool, StoreError> {
        let table = self.table.read().await;
        Ok(table.rows.values().any(|row| row.employee_id == employee_id))
    }

    async fn exists_email(&self, email: &str) -> Result<bool, StoreError> {
        let table = self.table.read().await;
        Ok(table.rows.values().any(|row| row.email == email))
    }

    async fn scan(
        &self,
        filter: &EmployeeFilter,
        order: SortOrder,
        window: Option<Window>,
    ) -> Result<Vec<Employee>, StoreError> {
        let table = self.table.read().await;
        let mut rows: Vec<Employee> = table
            .rows
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();

        // Rows come out of the map in id order; the sorts below are stable.
        match order {
            SortOrder::NewestFirst => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::OldestFirst => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::ById => {}
        }

        Ok(match window {
            Some(window) => rows
                .into_iter()
                .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
                .collect(),
            None => rows,
        })
    }

    async fn count(&self, filter: &EmployeeFilter) -> Result<u64, StoreError> {
        let table = self.table.read().await;
        Ok(table.rows.values().filter(|row| filter.matches(row)).count() as u64)
    }

    async fn departments(&self) -> Result<Vec<String>, StoreError> {
        let table = self.table.read().await;
        let mut departments: Vec<String> = table
            .rows
            .values()
            .filter(|row| !row.department.is_empty())
            .map(|row| row.department.clone())
            .collect();
        departments.sort();
        departments.dedup();
        Ok(departments)
    }
}

#[derive(Default)]
struct AccountTable {
    last_id: i64,
    rows: HashMap<String, Account>,
}

#[derive(Default)]
pub struct MemoryAccountStore {
    table: RwLock<AccountTable>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account without superuser rights.
    pub async fn insert_staff(&self, username: &str, password_hash: &str) {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let account = Account {
            id: table.last_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_superuser: false,
            created_at: Utc::now(),
        };
        table.rows.insert(username.to_string(), account);
    }
}

impl AccountStore for MemoryAccountStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.table.read().await.rows.get(username).cloned())
    }

    async fn upsert_superuser(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        if let Some(account) = table.rows.get_mut(username) {
            account.password_hash = password_hash.to_string();
            account.is_superuser = true;
            return Ok(());
        }

        table.last_id += 1;
        let account = Account {
            id: table.last_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_superuser: true,
            created_at: Utc::now(),
        };
        table.rows.insert(username.to_string(), account);
        Ok(())
    }
}
