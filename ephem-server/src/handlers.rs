use crate::{
    error::AppError,
    html, metrics,
    models::{CreatePasteRequest, CreatePasteResponse, HealthResponse},
    request::{base_url, request_now},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use ephem_api::{Consumed, PasteView};
use tracing::{debug, error, info};

/// Run a blocking store call off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, ephem_api::Error> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("task join error: {}", e)))?
        .map_err(AppError::from)
}

/// POST /api/pastes
pub async fn create_paste(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreatePasteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePasteResponse>), AppError> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let new = body.into_new_paste()?;

    let now = request_now(&headers, &state.settings, &state.pastes);
    let pastes = state.pastes.clone();
    let record = run_blocking(move || pastes.create_at(new, now)).await?;

    metrics::PASTES_CREATED_TOTAL.inc();
    info!(id = %record.id, ttl = ?record.ttl_seconds, max_views = ?record.max_views, "paste created");

    let id = record.id.to_string();
    let url = format!("{}/p/{}", base_url(&headers, &state.settings), id);
    Ok((StatusCode::CREATED, Json(CreatePasteResponse { id, url })))
}

async fn consume(state: &AppState, headers: &HeaderMap, id: String) -> Result<Consumed, AppError> {
    let now = request_now(headers, &state.settings, &state.pastes);
    let pastes = state.pastes.clone();
    let result = run_blocking(move || pastes.consume_at(&id, now)).await;

    let outcome = match &result {
        Ok(Consumed::Granted(_)) => "granted",
        Ok(Consumed::NotAvailable) => "not_available",
        Err(_) => "error",
    };
    metrics::CONSUMPTIONS_TOTAL.with_label_values(&[outcome]).inc();
    result
}

/// GET /api/pastes/:id
pub async fn fetch_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<PasteView>, AppError> {
    match consume(&state, &headers, id).await? {
        Consumed::Granted(consumption) => {
            debug!(
                id = %consumption.record.id,
                granted_at = %consumption.at,
                remaining = ?consumption.remaining_views(),
                "paste view granted"
            );
            Ok(Json(consumption.view()))
        }
        Consumed::NotAvailable => Err(AppError::NotFound),
    }
}

/// GET /p/:id
pub async fn view_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    match consume(&state, &headers, id.clone()).await {
        Ok(Consumed::Granted(consumption)) => {
            debug!(
                id = %consumption.record.id,
                granted_at = %consumption.at,
                remaining = ?consumption.remaining_views(),
                "paste page view granted"
            );
            Html(html::paste_page(&id, consumption.content())).into_response()
        }
        Ok(Consumed::NotAvailable) => {
            debug!("paste page not available");
            (StatusCode::NOT_FOUND, Html(html::not_found_page())).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to load paste page");
            metrics::ERRORS_TOTAL.with_label_values(&["internal"]).inc();
            (StatusCode::INTERNAL_SERVER_ERROR, Html(html::error_page())).into_response()
        }
    }
}

/// GET /api/healthz
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let pastes = state.pastes.clone();
    let ok = match tokio::task::spawn_blocking(move || pastes.health()).await {
        Ok(health) => {
            if let Some(e) = &health.error {
                error!(error = %e, "store health check failed");
            }
            health.ok
        }
        Err(e) => {
            error!(error = %e, "health check task failed");
            false
        }
    };
    Json(HealthResponse { ok })
}

/// GET /metrics
pub async fn export_metrics() -> Response {
    match metrics::encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => AppError::Internal(format!("failed to encode metrics: {}", e)).into_response(),
    }
}
