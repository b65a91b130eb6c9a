use chrono::{DateTime, Utc};

use crate::db::{EmployeeFilter, EmployeeStore, SortOrder, Window};
use crate::errors::AppError;
use crate::models::employee::{Employee, EmployeeForm};
use crate::models::page::{Page, PageRequest};
use crate::services::stats::DashboardStats;
use crate::utils::media::MediaStore;

/// Record lifecycle and queries on top of an [`EmployeeStore`].
pub struct EmployeeService<S> {
    store: S,
    media: MediaStore,
}

impl<S: EmployeeStore> EmployeeService<S> {
    pub fn new(store: S, media: MediaStore) -> Self {
        Self { store, media }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Registers a new employee. The duplicate pre-checks are not atomic
    /// with the insert; a collision at insert time surfaces as the same
    /// duplicate error through the store's unique indexes.
    pub async fn create(
        &self,
        form: &EmployeeForm,
        profile_picture: Option<&[u8]>,
    ) -> Result<Employee, AppError> {
        let draft = form.to_draft()?;
        if let Some(bytes) = profile_picture {
            self.media.check(bytes)?;
        }

        if self.store.exists_employee_id(&draft.employee_id).await? {
            return Err(AppError::DuplicateEmployeeId(draft.employee_id));
        }
        if self.store.exists_email(&draft.email).await? {
            return Err(AppError::DuplicateEmail(draft.email));
        }

        let picture_path = match profile_picture {
            Some(bytes) => Some(self.media.save_profile_picture(bytes).await?),
            None => None,
        };

        match self
            .store
            .insert(&draft, picture_path.as_deref(), Utc::now())
            .await
        {
            Ok(employee) => {
                log::info!(
                    "Employee {} ({}) added",
                    employee.full_name(),
                    employee.employee_id
                );
                Ok(employee)
            }
            Err(err) => {
                if let Some(path) = &picture_path {
                    self.media.remove(path).await;
                }
                Err(err.into())
            }
        }
    }

    /// Overwrites every editable field of record `id` with `form`.
    pub async fn update(&self, id: i64, form: &EmployeeForm) -> Result<Employee, AppError> {
        let existing = self.store.get(id).await?;
        let draft = form.to_draft()?;

        let updated_at = Utc::now().max(existing.created_at);
        let employee = self.store.update(id, &draft, updated_at).await?;
        log::info!("Employee {} ({}) updated", employee.full_name(), employee.id);
        Ok(employee)
    }

    pub async fn delete(&self, id: i64) -> Result<Employee, AppError> {
        let employee = self.store.delete(id).await?;
        if let Some(path) = &employee.profile_picture {
            self.media.remove(path).await;
        }
        log::info!("Employee \"{}\" deleted", employee.full_name());
        Ok(employee)
    }

    /// Deletes every existing id in `ids` along with their stored pictures.
    /// Unknown ids are skipped and only lower the returned count.
    pub async fn bulk_delete(&self, ids: &[i64]) -> Result<u64, AppError> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(0);
        }

        let removed = self.store.delete_many(&ids).await?;
        for path in removed.iter().filter_map(|employee| employee.profile_picture.as_deref()) {
            self.media.remove(path).await;
        }
        log::info!("Bulk delete removed {} of {} employees", removed.len(), ids.len());
        Ok(removed.len() as u64)
    }

    pub async fn get(&self, id: i64) -> Result<Employee, AppError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn list(
        &self,
        request: PageRequest,
        filter: &EmployeeFilter,
        order: SortOrder,
    ) -> Result<Page<Employee>, AppError> {
        let total = self.store.count(filter).await?;
        let resolved = request.resolve(total);
        let items = self
            .store
            .scan(
                filter,
                order,
                Some(Window {
                    limit: resolved.page_size,
                    offset: resolved.offset,
                }),
            )
            .await?;

        Ok(Page {
            items,
            page: resolved.page,
            page_size: resolved.page_size,
            total,
            num_pages: resolved.num_pages,
        })
    }

    pub async fn filter(
        &self,
        filter: &EmployeeFilter,
        order: SortOrder,
    ) -> Result<Vec<Employee>, AppError> {
        Ok(self.store.scan(filter, order, None).await?)
    }

    pub async fn dashboard(
        &self,
        filter: EmployeeFilter,
        now: DateTime<Utc>,
    ) -> Result<DashboardStats, AppError> {
        let records = self.filter(&filter, SortOrder::NewestFirst).await?;
        let department_choices = self.store.departments().await?;
        Ok(DashboardStats::build(records, department_choices, filter, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryEmployeeStore;
    use crate::errors::StoreError;
    use crate::models::employee::fixtures::{draft, form};
    use crate::models::employee::EmployeeDraft;
    use crate::utils::media::fixtures::PNG;
    use chrono::Duration;

    fn service() -> EmployeeService<MemoryEmployeeStore> {
        EmployeeService::new(
            MemoryEmployeeStore::new(),
            MediaStore::new(std::env::temp_dir().join("employee-registry-unused"), 1024),
        )
    }

    #[tokio::test]
    async fn duplicate_employee_id_is_rejected_regardless_of_other_fields() {
        let service = service();
        service.create(&form("E100", "a@x.com"), None).await.unwrap();

        let mut second = form("E100", "b@y.com");
        second.first_name = "Bola".into();
        let err = service.create(&second, None).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmployeeId(ref id) if id == "E100"));

        let err = service.create(&second, None).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmployeeId(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let service = service();
        service.create(&form("E1", "a@x.com"), None).await.unwrap();
        let err = service.create(&form("E2", "a@x.com"), None).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail(ref email) if email == "a@x.com"));
    }

    #[tokio::test]
    async fn create_stamps_both_timestamps() {
        let before = Utc::now();
        let employee = service().create(&form("E1", "a@x.com"), None).await.unwrap();
        assert!(employee.created_at >= before);
        assert_eq!(employee.created_at, employee.updated_at);
    }

    #[tokio::test]
    async fn create_stores_profile_picture() {
        let dir = tempfile::tempdir().unwrap();
        let service = EmployeeService::new(MemoryEmployeeStore::new(), MediaStore::new(dir.path(), 1024));

        let employee = service.create(&form("E1", "a@x.com"), Some(PNG)).await.unwrap();
        let path = employee.profile_picture.unwrap();
        assert!(dir.path().join(path).exists());

        let err = service
            .create(&form("E2", "b@x.com"), Some(b"%PDF-1.4".as_slice()))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("profile_picture"));
    }

    /// Passes every pre-check so only the unique indexes stand in the way,
    /// as when two creators race.
    struct RacingStore(MemoryEmployeeStore);

    impl EmployeeStore for RacingStore {
        async fn insert(
            &self,
            draft: &EmployeeDraft,
            profile_picture: Option<&str>,
            now: DateTime<Utc>,
        ) -> Result<Employee, StoreError> {
            self.0.insert(draft, profile_picture, now).await
        }
        async fn update(
            &self,
            id: i64,
            draft: &EmployeeDraft,
            updated_at: DateTime<Utc>,
        ) -> Result<Employee, StoreError> {
            self.0.update(id, draft, updated_at).await
        }
        async fn get(&self, id: i64) -> Result<Employee, StoreError> {
            self.0.get(id).await
        }
        async fn delete(&self, id: i64) -> Result<Employee, StoreError> {
            self.0.delete(id).await
        }
        async fn delete_many(&self, ids: &[i64]) -> Result<Vec<Employee>, StoreError> {
            self.0.delete_many(ids).await
        }
        async fn exists_employee_id(&self, _employee_id: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn exists_email(&self, _email: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn scan(
            &self,
            filter: &EmployeeFilter,
            order: SortOrder,
            window: Option<Window>,
        ) -> Result<Vec<Employee>, StoreError> {
            self.0.scan(filter, order, window).await
        }
        async fn count(&self, filter: &EmployeeFilter) -> Result<u64, StoreError> {
            self.0.count(filter).await
        }
        async fn departments(&self) -> Result<Vec<String>, StoreError> {
            self.0.departments().await
        }
    }

    #[tokio::test]
    async fn lost_race_reports_the_same_duplicate_errors() {
        let service = EmployeeService::new(
            RacingStore(MemoryEmployeeStore::new()),
            MediaStore::new(std::env::temp_dir(), 1024),
        );
        service.create(&form("E100", "a@x.com"), None).await.unwrap();

        let err = service.create(&form("E100", "b@y.com"), None).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmployeeId(ref id) if id == "E100"));

        let err = service.create(&form("E200", "a@x.com"), None).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn update_overwrites_every_editable_field() {
        let service = service();
        let created = service.create(&form("E1", "a@x.com"), None).await.unwrap();

        let mut input = form("E9", "z@x.com");
        input.first_name = "Chidi".into();
        input.other_name = Some("Kay".into());
        input.gender = "Male".into();
        input.date_of_birth = "1985-01-31".into();
        input.department = "Ops".into();
        let updated = service.update(created.id, &input).await.unwrap();

        let fetched = service.get(created.id).await.unwrap();
        assert_eq!(fetched, updated);
        assert_eq!(EmployeeForm::from(&fetched), input);
        assert_eq!(fetched.created_at, created.created_at);
        assert!(fetched.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn update_drops_omitted_optional_fields() {
        let service = service();
        let mut input = form("E1", "a@x.com");
        input.other_name = Some("Kay".into());
        let created = service.create(&input, None).await.unwrap();
        assert_eq!(created.other_name.as_deref(), Some("Kay"));

        let updated = service.update(created.id, &form("E1", "a@x.com")).await.unwrap();
        assert_eq!(updated.other_name, None);
    }

    #[tokio::test]
    async fn update_collision_is_a_duplicate_error() {
        let service = service();
        let first = service.create(&form("E1", "a@x.com"), None).await.unwrap();
        service.create(&form("E2", "b@x.com"), None).await.unwrap();

        let err = service.update(first.id, &form("E1", "b@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail(_)));
        let err = service.update(first.id, &form("E2", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmployeeId(_)));
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let service = service();
        assert!(matches!(service.get(42).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            service.update(42, &form("E1", "a@x.com")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(service.delete(42).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_record_wins_over_an_invalid_form() {
        let service = service();
        let err = service.update(42, &EmployeeForm::default()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let created = service.create(&form("E1", "a@x.com"), None).await.unwrap();
        let err = service
            .update(created.id, &EmployeeForm::default())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("first_name"));
    }

    #[tokio::test]
    async fn delete_is_permanent() {
        let service = service();
        let created = service.create(&form("E1", "a@x.com"), None).await.unwrap();
        service.delete(created.id).await.unwrap();
        assert!(matches!(service.get(created.id).await, Err(AppError::NotFound(_))));
        // The freed keys can be registered again.
        service.create(&form("E1", "a@x.com"), None).await.unwrap();
    }

    #[tokio::test]
    async fn bulk_delete_counts_only_existing_ids() {
        let service = service();
        let mut ids = Vec::new();
        for i in 0..4 {
            let employee = service
                .create(&form(&format!("E{i}"), &format!("e{i}@x.com")), None)
                .await
                .unwrap();
            ids.push(employee.id);
        }

        let targets = [ids[0], ids[2], 999, ids[2]];
        assert_eq!(service.bulk_delete(&targets).await.unwrap(), 2);
        assert_eq!(service.bulk_delete(&targets).await.unwrap(), 0);
        assert_eq!(service.bulk_delete(&[]).await.unwrap(), 0);
        assert_eq!(
            service.store().count(&EmployeeFilter::default()).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn bulk_delete_removes_stored_pictures() {
        let dir = tempfile::tempdir().unwrap();
        let service = EmployeeService::new(MemoryEmployeeStore::new(), MediaStore::new(dir.path(), 1024));

        let first = service.create(&form("E1", "a@x.com"), Some(PNG)).await.unwrap();
        let second = service.create(&form("E2", "b@x.com"), Some(PNG)).await.unwrap();
        let first_path = dir.path().join(first.profile_picture.unwrap());
        let second_path = dir.path().join(second.profile_picture.unwrap());

        assert_eq!(service.bulk_delete(&[first.id, 999]).await.unwrap(), 1);
        assert!(!first_path.exists());
        assert!(second_path.exists());
    }

    #[tokio::test]
    async fn list_pages_newest_first() {
        let service = service();
        let base = Utc::now() - Duration::days(1);
        for i in 0..25 {
            service
                .store()
                .insert(
                    &draft(&format!("E{i}"), &format!("e{i}@x.com")),
                    None,
                    base + Duration::minutes(i),
                )
                .await
                .unwrap();
        }

        let first = service
            .list(PageRequest::new(1, 10), &EmployeeFilter::default(), SortOrder::NewestFirst)
            .await
            .unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total, 25);
        assert_eq!(first.num_pages, 3);
        assert_eq!(first.items[0].employee_id, "E24");
        assert!(first
            .items
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at));

        let third = service
            .list(PageRequest::new(3, 10), &EmployeeFilter::default(), SortOrder::NewestFirst)
            .await
            .unwrap();
        assert_eq!(third.items.len(), 5);
        assert_eq!(third.items[4].employee_id, "E0");
    }

    #[tokio::test]
    async fn dashboard_applies_filter_but_offers_all_departments() {
        let service = service();
        let mut ops = form("E2", "b@x.com");
        ops.department = "Ops".into();
        service.create(&form("E1", "a@x.com"), None).await.unwrap();
        service.create(&ops, None).await.unwrap();

        let filter = EmployeeFilter {
            department: Some("Eng".into()),
            ..Default::default()
        };
        let stats = service.dashboard(filter, Utc::now()).await.unwrap();
        assert_eq!(stats.total_employees, 1);
        assert_eq!(stats.department_choices, ["Eng", "Ops"]);
        assert_eq!(stats.monthly_hires.iter().map(|m| m.count).sum::<u64>(), 1);
        assert_eq!(stats.applied_filters.department.as_deref(), Some("Eng"));
    }
}
