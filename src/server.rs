//! HTTP endpoint serving resolved driver binaries.
//!
//! `GET /chromedriver?chromeDriverVersion=2.21` resolves the driver with the query parameters
//! applied as configuration overrides and answers with the binary as an attachment.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tracing::{error, info};

use crate::config::Config;
use crate::error::WebDriverError;
use crate::manager::{DriverRequest, Resolver};
use crate::platform::BrowserType;

/// Shared state for HTTP handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// Routes of the driver server; every request starts from `config`.
pub fn router(config: Config) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };
    Router::new()
        .route("/{driver}", get(driver_handler))
        .with_state(state)
}

/// Serves drivers on `port` until the process is stopped.
pub async fn serve(config: Config, port: u16) -> Result<(), WebDriverError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| WebDriverError::io(addr.to_string(), e))?;
    info!("WebDriverManager server listening on port {}", port);

    axum::serve(listener, router(config))
        .await
        .map_err(|e| WebDriverError::io(addr.to_string(), e))
}

async fn driver_handler(
    State(state): State<AppState>,
    Path(driver): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(browser) = BrowserType::from_server_path(&driver) else {
        return (StatusCode::NOT_FOUND, format!("Unknown driver '{driver}'")).into_response();
    };
    info!("Server request for {} with {:?}", browser, params);

    let mut config = (*state.config).clone();
    for (key, value) in &params {
        if let Err(e) = config.set(key, value) {
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    }

    let resolved = match Resolver::new(config) {
        Ok(mut resolver) => resolver.setup(&DriverRequest::new(browser)).await,
        Err(e) => Err(e),
    };
    let driver = match resolved {
        Ok(driver) => driver,
        Err(e) => {
            error!("Could not serve {}: {}", browser, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let body = match tokio::fs::read(&driver.path).await {
        Ok(body) => body,
        Err(e) => {
            let e = WebDriverError::io(&driver.path, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };
    let file_name = driver
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| driver.browser.to_string());
    info!("Serving {} {} ({} bytes)", file_name, driver.version, body.len());

    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}
