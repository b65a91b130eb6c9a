use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::db::{EmployeeStore, SortOrder};
use crate::handlers::employee::FilterQuery;
use crate::services::employee::EmployeeService;
use crate::services::export::{export_csv, export_filename};
use crate::utils::guard::Principal;

/// Streams the (optionally filtered) register as a CSV attachment.
pub async fn export_employees<S: EmployeeStore>(
    service: web::Data<EmployeeService<S>>,
    principal: web::ReqData<Principal>,
    query: web::Query<FilterQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let filter = query.to_filter()?;
    let records = service.filter(&filter, SortOrder::ById).await?;
    let body = export_csv(&records)?;

    log::info!("{} exported {} employees", principal.username, records.len());
    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(export_filename(Utc::now()))],
        })
        .body(body))
}
