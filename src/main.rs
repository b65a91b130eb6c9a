use dotenv::dotenv;
use log::info;

use employee_registry::config::{Config, StoreBackend};
use employee_registry::db::{
    self, MemoryAccountStore, MemoryEmployeeStore, PgAccountStore, PgEmployeeStore,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|err| std::io::Error::other(err.to_string()))?;

    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config.database_url.clone().unwrap_or_default();
            let pool = db::create_pool(&database_url)
                .await
                .map_err(|err| std::io::Error::other(format!("Failed to connect to the database: {}", err)))?;
            db::run_migrations(&pool)
                .await
                .map_err(|err| std::io::Error::other(format!("Failed to run migrations: {}", err)))?;
            info!("Connected to PostgreSQL");

            employee_registry::run(
                config,
                PgEmployeeStore::new(pool.clone()),
                PgAccountStore::new(pool),
            )
            .await
        }
        StoreBackend::Memory => {
            info!("Using the in-memory store; records are lost on shutdown");
            employee_registry::run(config, MemoryEmployeeStore::new(), MemoryAccountStore::new()).await
        }
    }
}
