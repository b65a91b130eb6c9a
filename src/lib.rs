pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use actix_web::{middleware, web, App, HttpServer};

use crate::config::Config;
use crate::db::{AccountStore, EmployeeStore};
use crate::errors::AppError;
use crate::services::employee::EmployeeService;
use crate::utils::jwt::JwtKeys;
use crate::utils::media::MediaStore;
use crate::utils::password::hash_password;

/// Creates the configured superuser, or resets its password, when both
/// `ADMIN_USERNAME` and `ADMIN_PASSWORD` are set.
pub async fn bootstrap_superuser<A: AccountStore>(
    config: &Config,
    accounts: &A,
) -> Result<(), AppError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
    else {
        return Ok(());
    };

    let password_hash = hash_password(password)?;
    accounts.upsert_superuser(username, &password_hash).await?;
    log::info!("Superuser '{}' is ready", username);
    Ok(())
}

pub async fn run<S: EmployeeStore, A: AccountStore>(
    config: Config,
    employees: S,
    accounts: A,
) -> std::io::Result<()> {
    bootstrap_superuser(&config, &accounts)
        .await
        .map_err(|err| std::io::Error::other(err.to_string()))?;

    let media = MediaStore::new(config.media_root.clone(), config.max_upload_bytes);
    log::info!("Storing media under {}", media.root().display());

    let service = web::Data::new(EmployeeService::new(employees, media));
    let accounts = web::Data::new(accounts);
    let keys = web::Data::new(JwtKeys::new(&config.jwt_secret, config.jwt_ttl));

    log::info!("Starting server at {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(service.clone())
            .app_data(accounts.clone())
            .app_data(keys.clone())
            .configure(routes::configure::<S, A>)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
