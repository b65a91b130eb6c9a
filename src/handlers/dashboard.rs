use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::db::EmployeeStore;
use crate::handlers::employee::FilterQuery;
use crate::services::employee::EmployeeService;

pub async fn dashboard<S: EmployeeStore>(
    service: web::Data<EmployeeService<S>>,
    query: web::Query<FilterQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let filter = query.to_filter()?;
    let stats = service.dashboard(filter, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(stats))
}
