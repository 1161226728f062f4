use std::sync::Arc;

use sqlx::PgPool;

use crate::config::auth::AuthConfig;
use crate::config::database::init_db_pool;
use crate::config::jwt::JwtConfig;
use crate::config::mfa::MfaConfig;
use crate::config::tenancy::TenancyConfig;
use crate::context::PipelineMetrics;
use crate::middleware::requirement::RouteTable;
use crate::providers::Providers;
use crate::providers::postgres::{PgTenantProvider, PgTokenProvider, PgUserProvider};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub auth_config: AuthConfig,
    pub tenancy_config: TenancyConfig,
    pub mfa_config: MfaConfig,
    pub providers: Providers,
    pub routes: Arc<RouteTable>,
    pub metrics: Arc<PipelineMetrics>,
}

impl AppState {
    /// Installs the startup-built route declarations. Called once by the
    /// router initializer; the table is read-only afterwards.
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = Arc::new(routes);
        self
    }
}

pub async fn init_app_state() -> AppState {
    AppState {
        db: init_db_pool().await,
        jwt_config: JwtConfig::from_env(),
        auth_config: AuthConfig::from_env(),
        tenancy_config: TenancyConfig::from_env(),
        mfa_config: MfaConfig::from_env(),
        providers: Providers {
            users: Arc::new(PgUserProvider),
            tokens: Arc::new(PgTokenProvider),
            tenants: Arc::new(PgTenantProvider),
        },
        routes: Arc::new(RouteTable::default()),
        metrics: PipelineMetrics::new(),
    }
}
