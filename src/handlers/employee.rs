use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::db::{EmployeeFilter, EmployeeStore, SortOrder};
use crate::errors::{AppError, FormRejection};
use crate::models::employee::{EmployeeForm, Gender, DATE_FORMAT};
use crate::models::page::PageRequest;
use crate::services::employee::EmployeeService;
use crate::utils::guard::Principal;

const PROFILE_PICTURE_FIELD: &str = "profile_picture";
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Optional record criteria shared by the list, export and dashboard
/// endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub q: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub gender: Option<String>,
    pub state: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Parses an RFC 3339 timestamp or a bare date. A bare upper-bound date
/// covers the whole day.
fn parse_bound(
    field: &'static str,
    value: &str,
    end_of_day: bool,
) -> Result<DateTime<Utc>, AppError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| AppError::validation(field, "Enter a valid date (YYYY-MM-DD)."))?;
    let time = if end_of_day {
        date.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|time| time.and_utc())
        .ok_or_else(|| AppError::validation(field, "Enter a valid date (YYYY-MM-DD)."))
}

impl FilterQuery {
    pub fn to_filter(&self) -> Result<EmployeeFilter, AppError> {
        let gender = non_blank(&self.gender)
            .map(|gender| {
                gender
                    .parse::<Gender>()
                    .map_err(|err| AppError::validation("gender", err.to_string()))
            })
            .transpose()?;
        let created_from = non_blank(&self.date_from)
            .map(|value| parse_bound("date_from", &value, false))
            .transpose()?;
        let created_to = non_blank(&self.date_to)
            .map(|value| parse_bound("date_to", &value, true))
            .transpose()?;

        Ok(EmployeeFilter {
            department: non_blank(&self.department),
            role: non_blank(&self.role),
            gender,
            state: non_blank(&self.state),
            search: non_blank(&self.q),
            created_from,
            created_to,
        })
    }
}

/// `order` query parameter of the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    pub order: Option<String>,
}

impl SortQuery {
    pub fn to_order(&self) -> Result<SortOrder, AppError> {
        match non_blank(&self.order).as_deref() {
            None | Some("newest") | Some("-created_at") => Ok(SortOrder::NewestFirst),
            Some("oldest") | Some("created_at") => Ok(SortOrder::OldestFirst),
            Some("id") => Ok(SortOrder::ById),
            Some(other) => Err(AppError::validation(
                "order",
                format!("Unknown order '{}'; use newest, oldest or id.", other),
            )),
        }
    }
}

fn multipart_error(err: actix_multipart::MultipartError) -> AppError {
    AppError::validation("form", format!("Malformed form submission: {}", err))
}

/// Collects the text fields of a multipart submission into an
/// [`EmployeeForm`] and keeps the profile picture bytes aside.
async fn read_multipart(
    mut payload: Multipart,
    max_upload_bytes: usize,
) -> Result<(EmployeeForm, Option<Vec<u8>>), AppError> {
    let mut fields = Map::new();
    let mut picture = None;

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();
        let is_picture = name == PROFILE_PICTURE_FIELD;
        let limit = if is_picture {
            max_upload_bytes
        } else {
            MAX_TEXT_FIELD_BYTES
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > limit {
                return Err(if is_picture {
                    AppError::validation(
                        "profile_picture",
                        format!("File size exceeds {} byte limit", max_upload_bytes),
                    )
                } else {
                    AppError::validation("form", format!("Field '{}' is too large", name))
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        if is_picture {
            // Browsers send an empty part when no file was chosen.
            if !bytes.is_empty() {
                picture = Some(bytes);
            }
        } else if !name.is_empty() {
            let value = String::from_utf8(bytes)
                .map_err(|_| AppError::validation("form", format!("Field '{}' is not valid text", name)))?;
            fields.insert(name, Value::String(value));
        }
    }

    Ok((EmployeeForm::from_fields(fields)?, picture))
}

/// Onboarding form. Open to unauthenticated use.
pub async fn create_employee<S: EmployeeStore>(
    service: web::Data<EmployeeService<S>>,
    payload: Multipart,
) -> Result<HttpResponse, actix_web::Error> {
    let (form, picture) = read_multipart(payload, service.media().max_upload_bytes()).await?;

    let employee = service
        .create(&form, picture.as_deref())
        .await
        .map_err(|err| FormRejection::new(err, form.clone()))?;

    Ok(HttpResponse::Created().json(json!({
        "message": format!("Employee {} added successfully!", employee.full_name()),
        "employee": employee,
    })))
}

pub async fn list_employees<S: EmployeeStore>(
    service: web::Data<EmployeeService<S>>,
    page: web::Query<PageRequest>,
    query: web::Query<FilterQuery>,
    sort: web::Query<SortQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let filter = query.to_filter()?;
    let order = sort.to_order()?;
    let page = service.list(page.into_inner(), &filter, order).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_employee<S: EmployeeStore>(
    service: web::Data<EmployeeService<S>>,
    id: web::Path<i64>,
) -> Result<HttpResponse, actix_web::Error> {
    let employee = service.get(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn update_employee<S: EmployeeStore>(
    service: web::Data<EmployeeService<S>>,
    principal: web::ReqData<Principal>,
    id: web::Path<i64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, actix_web::Error> {
    let Value::Object(fields) = body.into_inner() else {
        return Err(AppError::validation("form", "Expected a JSON object of form fields.").into());
    };
    let form = EmployeeForm::from_fields(fields)?;
    let employee = service
        .update(id.into_inner(), &form)
        .await
        .map_err(|err| FormRejection::new(err, form.clone()))?;

    log::info!("{} updated employee {}", principal.username, employee.id);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully!",
        "employee": employee,
    })))
}

pub async fn delete_employee<S: EmployeeStore>(
    service: web::Data<EmployeeService<S>>,
    principal: web::ReqData<Principal>,
    id: web::Path<i64>,
) -> Result<HttpResponse, actix_web::Error> {
    let employee = service.delete(id.into_inner()).await?;

    log::info!("{} deleted employee {}", principal.username, employee.id);
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Employee \"{}\" has been deleted successfully!", employee.full_name()),
        "deleted": 1,
    })))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Value,
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

impl BulkDeleteRequest {
    /// Selected ids that parse as integers; the rest are dropped.
    pub fn ids(&self) -> Vec<i64> {
        match &self.ids {
            Value::Array(values) => values.iter().filter_map(parse_id).collect(),
            single => parse_id(single).into_iter().collect(),
        }
    }
}

pub async fn bulk_delete_employees<S: EmployeeStore>(
    service: web::Data<EmployeeService<S>>,
    principal: web::ReqData<Principal>,
    body: web::Json<BulkDeleteRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let ids = body.ids();
    let deleted = service.bulk_delete(&ids).await?;

    log::info!("{} bulk-deleted {} employees", principal.username, deleted);
    let message = if ids.is_empty() {
        "No employees selected for deletion.".to_string()
    } else {
        format!("Successfully deleted {} employees.", deleted)
    };
    Ok(HttpResponse::Ok().json(json!({
        "message": message,
        "deleted": deleted,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn blank_query_values_are_ignored() {
        let query = FilterQuery {
            department: Some("  ".into()),
            q: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(query.to_filter().unwrap(), EmployeeFilter::default());
    }

    #[test]
    fn date_bounds_cover_whole_days() {
        let query = FilterQuery {
            date_from: Some("2026-01-01".into()),
            date_to: Some("2026-01-31".into()),
            gender: Some("female".into()),
            ..Default::default()
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(
            filter.created_from,
            Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
        );
        let to = filter.created_to.unwrap();
        assert_eq!((to.hour(), to.minute(), to.second()), (23, 59, 59));
        assert_eq!(filter.gender, Some(Gender::Female));
    }

    #[test]
    fn rfc3339_bounds_are_taken_as_is() {
        let query = FilterQuery {
            date_to: Some("2026-01-31T10:00:00+01:00".into()),
            ..Default::default()
        };
        assert_eq!(
            query.to_filter().unwrap().created_to,
            Some(Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn bulk_delete_keeps_only_integer_ids() {
        let request: BulkDeleteRequest =
            serde_json::from_value(json!({ "ids": [1, "2", " 3 ", "abc", null, 4.5] })).unwrap();
        assert_eq!(request.ids(), vec![1, 2, 3]);

        let request: BulkDeleteRequest = serde_json::from_value(json!({ "ids": "7" })).unwrap();
        assert_eq!(request.ids(), vec![7]);

        let request: BulkDeleteRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.ids().is_empty());
    }

    #[test]
    fn sort_order_names() {
        let order = |value: &str| SortQuery { order: Some(value.into()) }.to_order();
        assert_eq!(SortQuery::default().to_order().unwrap(), SortOrder::NewestFirst);
        assert_eq!(order("oldest").unwrap(), SortOrder::OldestFirst);
        assert_eq!(order("id").unwrap(), SortOrder::ById);
        assert_eq!(order("sideways").unwrap_err().field(), Some("order"));
    }

    #[test]
    fn malformed_criteria_are_validation_errors() {
        let query = FilterQuery {
            date_from: Some("yesterday".into()),
            ..Default::default()
        };
        assert_eq!(query.to_filter().unwrap_err().field(), Some("date_from"));

        let query = FilterQuery {
            gender: Some("x".into()),
            ..Default::default()
        };
        assert_eq!(query.to_filter().unwrap_err().field(), Some("gender"));
    }
}
