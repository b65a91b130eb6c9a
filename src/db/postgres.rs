use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::{AccountStore, EmployeeFilter, EmployeeStore, SortOrder, Window};
use crate::errors::{StoreError, UniqueIndex};
use crate::models::employee::{Employee, EmployeeDraft};
use crate::models::user::Account;

const COLUMNS: &str = "id, employee_id, first_name, surname, other_name, email, contact_number, \
     date_of_birth, gender, address, state, lga, ward, department, role, profile_picture, \
     created_at, updated_at";

/// Maps a write failure onto the unique index it collided with, if any.
fn write_error(err: sqlx::Error, draft: &EmployeeDraft) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let index = if db_err.constraint() == Some(UniqueIndex::Email.constraint_name()) {
                UniqueIndex::Email
            } else {
                UniqueIndex::EmployeeId
            };
            let value = match index {
                UniqueIndex::EmployeeId => draft.employee_id.clone(),
                UniqueIndex::Email => draft.email.clone(),
            };
            return StoreError::UniqueViolation { index, value };
        }
    }
    StoreError::Backend(err)
}

/// Escapes LIKE metacharacters so user input only ever matches literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &EmployeeFilter) {
    query.push(" WHERE TRUE");

    if let Some(department) = &filter.department {
        query.push(" AND department = ").push_bind(department.clone());
    }
    if let Some(role) = &filter.role {
        query.push(" AND role = ").push_bind(role.clone());
    }
    if let Some(gender) = filter.gender {
        query.push(" AND gender = ").push_bind(gender.as_str());
    }
    if let Some(state) = &filter.state {
        query.push(" AND state = ").push_bind(state.clone());
    }
    if let Some(from) = filter.created_from {
        query.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        query.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        query.push(" AND (");
        let mut columns = query.separated(" OR ");
        for column in ["employee_id", "first_name", "surname", "email", "department"] {
            columns.push(format!("{} ILIKE ", column));
            columns.push_bind_unseparated(pattern.clone());
        }
        query.push(")");
    }
}

#[derive(Clone)]
pub struct PgEmployeeStore {
    pool: PgPool,
}

impl PgEmployeeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EmployeeStore for PgEmployeeStore {
    async fn insert(
        &self,
        draft: &EmployeeDraft,
        profile_picture: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Employee, StoreError> {
        let sql = format!(
            "INSERT INTO employees (employee_id, first_name, surname, other_name, email, \
             contact_number, date_of_birth, gender, address, state, lga, ward, department, role, \
             profile_picture, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16) \
             RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, Employee>(&sql)
            .bind(&draft.employee_id)
            .bind(&draft.first_name)
            .bind(&draft.surname)
            .bind(&draft.other_name)
            .bind(&draft.email)
            .bind(&draft.contact_number)
            .bind(draft.date_of_birth)
            .bind(draft.gender.as_str())
            .bind(&draft.address)
            .bind(&draft.state)
            .bind(&draft.lga)
            .bind(&draft.ward)
            .bind(&draft.department)
            .bind(&draft.role)
            .bind(profile_picture)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| write_error(err, draft))
    }

    async fn update(
        &self,
        id: i64,
        draft: &EmployeeDraft,
        updated_at: DateTime<Utc>,
    ) -> Result<Employee, StoreError> {
        let sql = format!(
            "UPDATE employees SET employee_id = $1, first_name = $2, surname = $3, \
             other_name = $4, email = $5, contact_number = $6, date_of_birth = $7, gender = $8, \
             address = $9, state = $10, lga = $11, ward = $12, department = $13, role = $14, \
             updated_at = GREATEST($15, created_at) \
             WHERE id = $16 RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, Employee>(&sql)
            .bind(&draft.employee_id)
            .bind(&draft.first_name)
            .bind(&draft.surname)
            .bind(&draft.other_name)
            .bind(&draft.email)
            .bind(&draft.contact_number)
            .bind(draft.date_of_birth)
            .bind(draft.gender.as_str())
            .bind(&draft.address)
            .bind(&draft.state)
            .bind(&draft.lga)
            .bind(&draft.ward)
            .bind(&draft.department)
            .bind(&draft.role)
            .bind(updated_at)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| write_error(err, draft))?
            .ok_or(StoreError::NotFound(id))
    }

    async fn get(&self, id: i64) -> Result<Employee, StoreError> {
        sqlx::query_as::<_, Employee>(&format!("SELECT {} FROM employees WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<Employee, StoreError> {
        sqlx::query_as::<_, Employee>(&format!(
            "DELETE FROM employees WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<Vec<Employee>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let removed = sqlx::query_as::<_, Employee>(&format!(
            "DELETE FROM employees WHERE id = ANY($1) RETURNING {}",
            COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(removed)
    }

    async fn exists_employee_id(&self, employee_id: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE employee_id = $1)",
        )
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn exists_email(&self, email: &str) -> Result<bool, StoreError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM employees WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn scan(
        &self,
        filter: &EmployeeFilter,
        order: SortOrder,
        window: Option<Window>,
    ) -> Result<Vec<Employee>, StoreError> {
        let mut query: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM employees", COLUMNS));
        push_filter(&mut query, filter);

        query.push(match order {
            SortOrder::NewestFirst => " ORDER BY created_at DESC",
            SortOrder::OldestFirst => " ORDER BY created_at ASC",
            SortOrder::ById => " ORDER BY id ASC",
        });

        if let Some(window) = window {
            query
                .push(" LIMIT ")
                .push_bind(i64::try_from(window.limit).unwrap_or(i64::MAX))
                .push(" OFFSET ")
                .push_bind(i64::try_from(window.offset).unwrap_or(i64::MAX));
        }

        let employees = query
            .build_query_as::<Employee>()
            .fetch_all(&self.pool)
            .await?;
        Ok(employees)
    }

    async fn count(&self, filter: &EmployeeFilter) -> Result<u64, StoreError> {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM employees");
        push_filter(&mut query, filter);

        let count = query.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn departments(&self) -> Result<Vec<String>, StoreError> {
        let departments = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT department FROM employees WHERE department <> '' ORDER BY department",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(departments)
    }
}

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AccountStore for PgAccountStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, username, password_hash, is_superuser, created_at FROM accounts WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn upsert_superuser(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO accounts (username, password_hash, is_superuser, created_at) \
             VALUES ($1, $2, TRUE, NOW()) \
             ON CONFLICT (username) DO UPDATE \
             SET password_hash = EXCLUDED.password_hash, is_superuser = TRUE",
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
