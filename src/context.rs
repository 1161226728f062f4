//! Per-request security context and the scoped database session.
//!
//! The context is created fresh for every request by the security pipeline
//! and handed to the handler through request extensions — an explicit struct
//! rather than closures hung off the request object. Its database session is
//! owned exclusively by the one in-flight request and returns to the pool
//! when the last clone of the context drops, which happens on every exit
//! path: normal response, pipeline rejection, handler panic, or client
//! disconnect. Release is tied to drop, not to response delivery.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, Postgres};
use tokio::sync::{Mutex, MutexGuard};

use crate::config::roles::codes;
use crate::config::tenancy::TenancyConfig;
use crate::providers::{MachineToken, Tenant, User};
use crate::utils::errors::AppError;
use crate::utils::jwt::CredentialClaims;

/// Counters for pipeline events. `sessions_acquired` must equal
/// `sessions_released` once all in-flight requests have completed; the
/// pair is the observable form of the scoped-session guarantee.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    sessions_acquired: AtomicU64,
    sessions_released: AtomicU64,
    rbac_evaluations: AtomicU64,
    rejections: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn session_opened(&self) {
        self.sessions_acquired.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("palisade_db_sessions_acquired_total").increment(1);
    }

    pub(crate) fn session_closed(&self) {
        self.sessions_released.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("palisade_db_sessions_released_total").increment(1);
    }

    pub fn rbac_evaluated(&self) {
        self.rbac_evaluations.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("palisade_rbac_evaluations_total").increment(1);
    }

    pub fn rejected(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("palisade_rejections_total").increment(1);
    }

    pub fn sessions_acquired(&self) -> u64 {
        self.sessions_acquired.load(Ordering::Relaxed)
    }

    pub fn sessions_released(&self) -> u64 {
        self.sessions_released.load(Ordering::Relaxed)
    }

    pub fn rbac_evaluations(&self) -> u64 {
        self.rbac_evaluations.load(Ordering::Relaxed)
    }

    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Relaxed)
    }
}

/// Accounting guard for one scoped session. Acquisition increments the
/// counter; the matching release increment runs in `Drop`, so it cannot be
/// skipped by an early return or a panic.
#[derive(Debug)]
pub struct SessionGuard {
    metrics: Arc<PipelineMetrics>,
}

impl SessionGuard {
    pub fn acquire(metrics: &Arc<PipelineMetrics>) -> Self {
        metrics.session_opened();
        Self {
            metrics: Arc::clone(metrics),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.metrics.session_closed();
    }
}

#[derive(Clone)]
enum DbHandle {
    /// Shared pool: queries check a connection out per call. Used when
    /// multi-tenancy is disabled or the route opted out of tenant context.
    Global(PgPool),
    /// Dedicated connection with the tenant's schema applied. Never shared
    /// across requests; the mutex only serializes the sequential stages of
    /// this one request.
    Scoped(Arc<Mutex<PoolConnection<Postgres>>>),
}

/// The request's database binding.
#[derive(Clone)]
pub struct TenantDb {
    handle: DbHandle,
    _guard: Option<Arc<SessionGuard>>,
}

impl std::fmt::Debug for TenantDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.handle {
            DbHandle::Global(_) => f.write_str("TenantDb::Global"),
            DbHandle::Scoped(_) => f.write_str("TenantDb::Scoped"),
        }
    }
}

impl TenantDb {
    pub fn global(pool: PgPool) -> Self {
        Self {
            handle: DbHandle::Global(pool),
            _guard: None,
        }
    }

    pub fn scoped(conn: PoolConnection<Postgres>, guard: SessionGuard) -> Self {
        Self {
            handle: DbHandle::Scoped(Arc::new(Mutex::new(conn))),
            _guard: Some(Arc::new(guard)),
        }
    }

    /// Attaches a release guard to a pool-backed binding. Used by provider
    /// implementations that track session lifetimes without holding a
    /// dedicated connection (test doubles, external poolers).
    pub fn with_guard(mut self, guard: SessionGuard) -> Self {
        self._guard = Some(Arc::new(guard));
        self
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self.handle, DbHandle::Scoped(_))
    }

    /// Borrows a connection to run queries on. For a scoped binding this is
    /// the request's dedicated session; for a global binding a connection is
    /// checked out of the pool for the duration of the borrow.
    pub async fn conn(&self) -> Result<TenantConn<'_>, AppError> {
        match &self.handle {
            DbHandle::Scoped(conn) => Ok(TenantConn::Scoped(conn.lock().await)),
            DbHandle::Global(pool) => Ok(TenantConn::Fresh(
                pool.acquire().await.map_err(AppError::internal)?,
            )),
        }
    }
}

pub enum TenantConn<'a> {
    Scoped(MutexGuard<'a, PoolConnection<Postgres>>),
    Fresh(PoolConnection<Postgres>),
}

impl Deref for TenantConn<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        match self {
            TenantConn::Scoped(guard) => guard,
            TenantConn::Fresh(conn) => conn,
        }
    }
}

impl DerefMut for TenantConn<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            TenantConn::Scoped(guard) => guard,
            TenantConn::Fresh(conn) => conn,
        }
    }
}

/// The authenticated principal behind a request.
#[derive(Clone, Debug)]
pub enum Subject {
    Anonymous,
    User(User),
    Token(MachineToken),
}

impl Subject {
    pub fn kind(&self) -> &'static str {
        match self {
            Subject::Anonymous => "anonymous",
            Subject::User(_) => "user",
            Subject::Token(_) => "token",
        }
    }

    /// Identity string for audit logs.
    pub fn label(&self) -> String {
        match self {
            Subject::Anonymous => "anonymous".to_string(),
            Subject::User(user) => user.email.clone(),
            Subject::Token(token) => format!("token:{}", token.name),
        }
    }
}

/// Per-request security context, built by the pipeline and exposed to
/// handlers via `Extension<SecurityContext>`.
#[derive(Clone)]
pub struct SecurityContext {
    pub tenant: Option<Tenant>,
    pub db: TenantDb,
    pub subject: Subject,
    pub credential: Option<Arc<CredentialClaims>>,
    role_codes: Arc<Vec<String>>,
}

impl SecurityContext {
    /// Fresh context before any credential has been examined: anonymous
    /// subject, `public` role only.
    pub fn anonymous(tenant: Option<Tenant>, db: TenantDb) -> Self {
        Self {
            tenant,
            db,
            subject: Subject::Anonymous,
            credential: None,
            role_codes: Arc::new(vec![codes::PUBLIC.to_string()]),
        }
    }

    /// Binds the resolved subject and its normalized role codes. Called at
    /// most once per request, after subject resolution succeeds.
    pub fn bind_subject(&mut self, subject: Subject, role_codes: Vec<String>) {
        self.subject = subject;
        self.role_codes = Arc::new(role_codes);
    }

    pub fn set_credential(&mut self, claims: CredentialClaims) {
        self.credential = Some(Arc::new(claims));
    }

    pub fn role_codes(&self) -> &[String] {
        &self.role_codes
    }

    pub fn has_role(&self, code: &str) -> bool {
        self.role_codes.iter().any(|c| c == code)
    }

    pub fn user(&self) -> Option<&User> {
        match &self.subject {
            Subject::User(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_system_tenant(&self, config: &TenancyConfig) -> bool {
        if !config.enabled {
            return true;
        }
        self.tenant
            .as_ref()
            .is_some_and(|t| t.slug == config.system_tenant_slug)
    }
}
