//! Carbonserver HTTP API
//!
//! Exposes:
//! - Agent ingestion for experiments, runs and emissions
//! - Organization, project, membership and token management
//! - Time-window emission reports
//! - Health and readiness probes

pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    error_handling::HandleErrorLayer,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    BoxError, Router,
};
use carbonserver_common::{
    auth::{
        AccessControl, Argon2Hasher, Authenticator, IdentityProvider, NoAuthProvider, OidcProvider,
        RandomTokenGenerator, TokenGenerator, TokenHasher, TokenService,
    },
    clock::{Clock, SystemClock},
    config::{AppConfig, AuthProviderKind},
    db::{DbPool, Repository},
    errors::{AppError, Result},
    ingest::Ingestor,
};
use std::sync::Arc;
use std::time::Duration;
use tower::{
    limit::GlobalConcurrencyLimitLayer,
    timeout::{error::Elapsed, TimeoutLayer},
    ServiceBuilder,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub repo: Repository,
    pub auth: Authenticator,
    pub access: AccessControl,
    pub tokens: TokenService,
    pub ingestor: Ingestor,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the production components described by `config`
    pub fn from_config(config: AppConfig, db: DbPool) -> Result<Self> {
        let provider: Arc<dyn IdentityProvider> = match config.auth.provider {
            AuthProviderKind::Oidc => Arc::new(OidcProvider::new(&config.auth)?),
            AuthProviderKind::None => {
                warn!("Authentication is disabled; every caller acts as the development user");
                Arc::new(NoAuthProvider)
            }
        };
        let hasher = Arc::new(Argon2Hasher::new(
            config.auth.token_hash_memory_kib,
            config.auth.token_hash_iterations,
        )?);

        Self::new(
            config,
            db,
            provider,
            hasher,
            Arc::new(RandomTokenGenerator),
            Arc::new(SystemClock),
        )
    }

    /// Wire the state from explicit components
    pub fn new(
        config: AppConfig,
        db: DbPool,
        provider: Arc<dyn IdentityProvider>,
        hasher: Arc<dyn TokenHasher>,
        generator: Arc<dyn TokenGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let repo = Repository::new(db.clone()).with_clock(clock.clone());
        let tokens = TokenService::new(repo.clone(), hasher, generator, clock.clone());
        let access = AccessControl::new(repo.clone(), tokens.clone());
        let auth = Authenticator::new(repo.clone(), provider, &config.auth.project_token_header)?;
        let ingestor = Ingestor::new(repo.clone(), access.clone());

        Ok(Self {
            config: Arc::new(config),
            db,
            repo,
            auth,
            access,
            tokens,
            ingestor,
            clock,
        })
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    use handlers::{emissions, experiments, health, organizations, projects, reports, runs, tokens, users};

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Users
        .route("/users/me", get(users::get_current_user))
        .route("/users/{id}", get(users::get_user))

        // Organizations
        .route(
            "/organizations",
            post(organizations::create_organization).get(organizations::list_organizations),
        )
        .route(
            "/organizations/{id}",
            get(organizations::get_organization)
                .patch(organizations::update_organization)
                .delete(organizations::delete_organization),
        )
        .route(
            "/organizations/{id}/members",
            get(organizations::list_members).post(organizations::add_member),
        )
        .route(
            "/organizations/{id}/projects",
            post(projects::create_project).get(projects::list_projects),
        )
        .route("/organizations/{id}/sums", get(reports::organization_sums))

        // Projects
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/{id}/experiments", get(experiments::list_experiments))
        .route("/projects/{id}/experiments/sums", get(reports::project_sums_by_experiment))
        .route("/projects/{id}/sums", get(reports::project_sums))
        .route("/projects/{id}/last-run", get(reports::project_last_run))

        // Project tokens
        .route(
            "/projects/{id}/api-tokens",
            post(tokens::create_token).get(tokens::list_tokens),
        )
        .route(
            "/projects/{id}/api-tokens/{token_id}",
            axum::routing::delete(tokens::delete_token),
        )
        .route("/projects/{id}/api-tokens/{token_id}/revoke", post(tokens::revoke_token))

        // Experiments
        .route("/experiments", post(experiments::create_experiment))
        .route("/experiments/{id}", get(experiments::get_experiment))
        .route("/experiments/{id}/runs", get(runs::list_runs))
        .route("/experiments/{id}/runs/sums", get(reports::experiment_sums_by_run))

        // Runs
        .route("/runs", post(runs::create_run))
        .route("/runs/{id}", get(runs::get_run))
        .route("/runs/{id}/emissions", get(emissions::list_emissions))
        .route("/runs/{id}/emissions/sums", get(reports::run_sums))

        // Emissions
        .route("/emissions", post(emissions::create_emission))
        .route("/emissions/{id}", get(emissions::get_emission))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth::authenticate));

    // Health endpoints (no auth)
    let probe_routes = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready));

    let timeout = state.config.request_timeout();

    Router::new()
        .merge(probe_routes)
        .merge(api_routes)
        .fallback(handlers::route_not_found)
        .layer(from_fn(middleware::metrics::track_requests))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    request_failed(err, timeout)
                }))
                .layer(TimeoutLayer::new(timeout)),
        )
        .layer(GlobalConcurrencyLimitLayer::new(state.config.server.max_concurrent_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Error body for requests cut off by the timeout layer
fn request_failed(err: BoxError, timeout: Duration) -> AppError {
    if err.is::<Elapsed>() {
        AppError::RequestTimeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        AppError::Internal {
            message: format!("Unhandled middleware error: {}", err),
        }
    }
}
