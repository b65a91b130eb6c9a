use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::middleware::from_fn;
use actix_web::{web, HttpRequest};

use crate::db::{AccountStore, EmployeeStore};
use crate::errors::AppError;
use crate::handlers::{auth, dashboard, employee, export};
use crate::utils::guard::require_superuser;

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation("body", format!("Malformed JSON body: {}", err)).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation("query", format!("Malformed query string: {}", err)).into()
}

// Ids in paths are integers; anything else names no record.
fn path_error(_err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::NotFound("Employee not found".to_string()).into()
}

/// Registers every endpoint. Expects `web::Data` for the employee
/// service, the account store and the JWT keys to be installed on the app.
pub fn configure<S: EmployeeStore, A: AccountStore>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error));

    cfg.service(
        web::resource("/v1/auth/login").route(web::post().to(auth::login::<A>)),
    )
    .service(
        web::resource("/v1/employees").route(web::post().to(employee::create_employee::<S>)),
    )
    .service(
        web::scope("/v1/admin")
            .wrap(from_fn(require_superuser))
            // Fixed paths before `{id}` so they are not taken as ids.
            .service(
                web::resource("/employees/export")
                    .route(web::get().to(export::export_employees::<S>)),
            )
            .service(
                web::resource("/employees/bulk-delete")
                    .route(web::post().to(employee::bulk_delete_employees::<S>)),
            )
            .service(
                web::resource("/employees")
                    .route(web::get().to(employee::list_employees::<S>)),
            )
            .service(
                web::resource("/employees/{id}")
                    .route(web::get().to(employee::get_employee::<S>))
                    .route(web::put().to(employee::update_employee::<S>))
                    .route(web::delete().to(employee::delete_employee::<S>)),
            )
            .service(
                web::resource("/dashboard").route(web::get().to(dashboard::dashboard::<S>)),
            ),
    );
}
