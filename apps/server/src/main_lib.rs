use std::sync::Arc;

use crate::{auth::AuthManager, config::Config};
use curator_core::{
    users::{UserService, UserServiceTrait},
    variables::{VariableStoreTrait, VariablesService, VariablesServiceTrait},
};
use curator_storage_sqlite::{
    db::{self, write_actor},
    UserRepository, VariableRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub variables_service: Arc<dyn VariablesServiceTrait>,
    pub variable_store: Arc<dyn VariableStoreTrait>,
    pub user_service: Arc<dyn UserServiceTrait>,
    pub auth: Option<Arc<AuthManager>>,
}

pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    let variable_store: Arc<dyn VariableStoreTrait> =
        Arc::new(VariableRepository::new(pool.clone(), writer));
    let variables_service: Arc<dyn VariablesServiceTrait> =
        Arc::new(VariablesService::new(variable_store.clone()));
    let user_service: Arc<dyn UserServiceTrait> =
        Arc::new(UserService::new(Arc::new(UserRepository::new(pool.clone()))));

    let auth_manager = config
        .auth
        .as_ref()
        .map(AuthManager::new)
        .transpose()?
        .map(Arc::new);
    if auth_manager.is_none() {
        tracing::warn!("CURATOR_AUTH_PASSWORD_HASH is not set; admin routes are open");
    }

    Ok(Arc::new(AppState {
        variables_service,
        variable_store,
        user_service,
        auth: auth_manager,
    }))
}
