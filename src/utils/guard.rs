//! Authorization guard for the administrative scope.
//!
//! The guard runs as middleware in front of every protected route: it
//! authenticates the bearer token, requires the superuser capability and
//! leaves the resulting [`Principal`] in the request extensions.

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, HttpMessage, HttpRequest, ResponseError};

use crate::errors::AppError;
use crate::utils::jwt::JwtKeys;

/// The authenticated superuser a request runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn authorize(req: &HttpRequest) -> Result<Principal, AppError> {
    let keys = req.app_data::<web::Data<JwtKeys>>().ok_or_else(|| {
        log::error!("JwtKeys missing from app data");
        AppError::InternalServerError("Authentication is not configured".to_string())
    })?;

    let token =
        bearer_token(req).ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    let claims = keys
        .validate_token(token)
        .map_err(|err| AppError::Unauthorized(format!("Invalid token: {}", err)))?;

    if !claims.superuser {
        log::warn!("Access denied for non-superuser '{}'", claims.sub);
        return Err(AppError::AccessDenied(
            "Only admin users can access this system.".to_string(),
        ));
    }

    Ok(Principal { username: claims.sub })
}

/// Middleware applied to the whole protected scope. Rejections are
/// answered directly so handlers never run without a [`Principal`].
pub async fn require_superuser(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    match authorize(req.request()) {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.call(req).await.map(ServiceResponse::map_into_left_body)
        }
        Err(err) => Ok(req.into_response(err.error_response()).map_into_right_body()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::middleware::from_fn;
    use actix_web::{test, App, HttpResponse};
    use chrono::Duration;

    async fn whoami(principal: web::ReqData<Principal>) -> HttpResponse {
        HttpResponse::Ok().body(principal.username.clone())
    }

    #[actix_web::test]
    async fn guard_rejects_and_admits() {
        let keys = JwtKeys::new("secret", Duration::hours(1));
        let admin = keys.generate_token("root", true).unwrap();
        let staff = keys.generate_token("clerk", false).unwrap();

        let app = test::init_service(
            App::new().app_data(web::Data::new(keys)).service(
                web::scope("/admin")
                    .wrap(from_fn(require_superuser))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/admin/whoami").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/admin/whoami")
                .insert_header(("Authorization", "Bearer not-a-token"))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/admin/whoami")
                .insert_header(("Authorization", format!("Bearer {}", staff)))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/admin/whoami")
                .insert_header(("Authorization", format!("Bearer {}", admin)))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "root");
    }
}
