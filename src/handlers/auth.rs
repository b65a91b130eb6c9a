use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::AccountStore;
use crate::errors::AppError;
use crate::utils::jwt::JwtKeys;
use crate::utils::password::verify_password;
use crate::utils::validation::first_invalid_field;

#[derive(Deserialize, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    pub token: String,
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid username or password.".to_string())
}

/// Issues a bearer token to superusers only.
pub async fn login<A: AccountStore>(
    accounts: web::Data<A>,
    keys: web::Data<JwtKeys>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    first_invalid_field(&req.0, &["username", "password"])
        .map_err(|(field, _)| AppError::validation(field, "Invalid username or password."))?;

    let account = accounts
        .find_by_username(&req.username)
        .await
        .map_err(AppError::from)?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&req.password, &account.password_hash) {
        log::warn!("Failed login for '{}'", req.username);
        return Err(invalid_credentials().into());
    }

    if !account.is_superuser {
        log::warn!("Login refused for non-superuser '{}'", account.username);
        return Err(AppError::AccessDenied("Only admin users can access this system.".to_string()).into());
    }

    let token = keys
        .generate_token(&account.username, account.is_superuser)
        .map_err(|_| AppError::InternalServerError("Token generation error".to_string()))?;

    log::info!("Superuser '{}' logged in", account.username);
    Ok(HttpResponse::Ok().json(LoginResponse {
        username: account.username,
        token,
    }))
}
