use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use axum::body::Body;
use axum::response::IntoResponse;
use axum::{routing::get, Router};
use http::{HeaderValue, StatusCode};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::{GovernorError, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod middleware;
mod routes;
mod services;

use config::Config;
use error::AppError;
use services::{init, AccountShareService};

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub shares: AccountShareService,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stock_backend=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Rate limiter rejections, rendered with the regular error body.
fn rate_limit_response(error: GovernorError) -> http::Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let mut resp = AppError::RateLimited.into_response();

            // Include any headers provided by the governor (e.g., X-RateLimit-* if enabled)
            if let Some(hmap) = headers {
                for (name, value) in hmap.iter() {
                    resp.headers_mut().append(name.clone(), value.clone());
                }
            }

            // Retry-After (seconds)
            resp.headers_mut()
                .insert(http::header::RETRY_AFTER, HeaderValue::from(wait_time));
            resp
        }
        GovernorError::UnableToExtractKey => AppError::BadRequest(
            "Unable to determine client IP for rate limiting".to_string(),
        )
        .into_response(),
        GovernorError::Other { code, msg, headers } => {
            let body = msg.unwrap_or_else(|| "Rate limiting error".to_string());
            let mut resp = http::Response::new(Body::from(body));
            *resp.status_mut() =
                StatusCode::from_u16(code.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if let Some(hmap) = headers {
                for (name, value) in hmap.iter() {
                    resp.headers_mut().append(name.clone(), value.clone());
                }
            }
            resp
        }
    }
}

/// Application routes. `account_share` is passed in so the caller decides
/// which layers (rate limiting) wrap it.
pub fn build_router(state: Arc<AppState>, account_share: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth info (no stock user needed)
        .nest("/api/auth", routes::auth::router())
        // Stock routes, all keyed on the effective owner id
        .nest("/api/account-share", account_share)
        .nest("/api/items", routes::items::router())
        .with_state(state)
        .layer(axum::middleware::from_fn(
            middleware::security_headers::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!(
        "Starting stock backend ({} environment)",
        config.server.environment
    );

    // Initialize database
    let pool = init::init_db(&config).await?;

    let app_state = Arc::new(AppState {
        shares: AccountShareService::new(Arc::new(pool.clone())),
        db: pool,
        config: config.clone(),
    });

    let thread_shutdown = Arc::new(AtomicBool::new(false));

    // Per-IP limiter for the account-share endpoints
    let share_gov_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit.share_per_second.into())
            .burst_size(config.rate_limit.share_burst)
            .key_extractor(SmartIpKeyExtractor)
            .error_handler(rate_limit_response)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Failed to build account-share governor config"))?,
    );

    // Background cleanup for limiter storage
    let share_cleaner = {
        let limiter = share_gov_conf.limiter().clone();
        let interval = Duration::from_secs(60);
        let flag = thread_shutdown.clone();
        std::thread::spawn(move || {
            // Use smaller sleep granularity to allow quick shutdown.
            let tick = Duration::from_secs(1);
            loop {
                for _ in 0..interval.as_secs() {
                    if flag.load(Ordering::SeqCst) {
                        tracing::info!("Share rate limiter cleanup thread exiting");
                        return;
                    }
                    std::thread::sleep(tick);
                }
                tracing::debug!("share rate limiter size: {}", limiter.len());
                limiter.retain_recent();
            }
        })
    };

    let share_rate_layer = GovernorLayer {
        config: share_gov_conf.clone(),
    };

    let frontend_origin = config
        .server
        .frontend_url
        .parse::<HeaderValue>()
        .map_err(|e| anyhow::anyhow!("Invalid FRONTEND_URL for CORS: {}", e))?;

    let app = build_router(
        app_state.clone(),
        routes::account_share::router().layer(share_rate_layer),
    )
    .layer(
        CorsLayer::new()
            .allow_origin(frontend_origin)
            .allow_methods([
                http::Method::GET,
                http::Method::POST,
                http::Method::PUT,
                http::Method::DELETE,
                http::Method::OPTIONS,
            ])
            .allow_headers([
                http::header::CONTENT_TYPE,
                http::header::AUTHORIZATION,
                http::header::ACCEPT,
            ])
            .allow_credentials(true),
    );

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_fut = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    let thread_shutdown_clone = thread_shutdown.clone();
    let signal_fut = async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = ctrl_c => {},
                        _ = term.recv() => {},
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to bind SIGTERM, waiting for Ctrl+C only: {}", e);
                    let _ = ctrl_c.await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        tracing::info!("Shutdown signal received");
        thread_shutdown_clone.store(true, Ordering::SeqCst);
    };

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = signal_fut => {
            tracing::info!("Server future dropped; no longer accepting connections");
        }
    }

    thread_shutdown.store(true, Ordering::SeqCst);
    if let Err(e) = share_cleaner.join() {
        tracing::warn!("Share limiter cleanup thread join failed: {:?}", e);
    }

    app_state.db.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn rate_limited_response_carries_retry_after() {
        let resp = rate_limit_response(GovernorError::TooManyRequests {
            wait_time: 3,
            headers: None,
        });
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers().get(http::header::RETRY_AFTER).unwrap(), "3");
    }

    #[tokio::test]
    async fn health_is_public_and_has_security_headers() {
        let (app, _state) = routes::test_support::test_app().await;

        let res = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get("x-frame-options").unwrap(), "DENY");
    }
}
