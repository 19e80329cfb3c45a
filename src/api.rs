use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use utoipa::{OpenApi, ToSchema};

use crate::register::{
    AlignmentReport, Month, MonthEntry, MonthlyTable, RawMonthEntry, RawMonthlyDocument,
    RawTotalsDocument, RawYearBlock, Rainfall, StationMetadata, Token, TotalEntry, TotalsTable,
    YearBlock,
};
use crate::services::{CleanedRegister, RawRegisterDocument, RegisterCleaningService};

#[derive(Clone)]
pub struct AppState {
    pub cleaning_service: RegisterCleaningService,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NormalizeRequest {
    pub tokens: Vec<Token>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NormalizeResponse {
    /// One entry per token: a number, or "-" when missing
    #[schema(value_type = Vec<Object>)]
    pub values: Vec<Rainfall>,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, clean_register, normalize_values),
    components(schemas(
        HealthResponse,
        NormalizeRequest,
        NormalizeResponse,
        RawRegisterDocument,
        RawMonthlyDocument,
        RawYearBlock,
        RawMonthEntry,
        RawTotalsDocument,
        Token,
        CleanedRegister,
        StationMetadata,
        MonthlyTable,
        YearBlock,
        MonthEntry,
        Month,
        TotalsTable,
        TotalEntry,
        AlignmentReport
    )),
    tags((name = "registers", description = "Rainfall register cleaning"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/registers/clean", post(clean_register))
        .route("/values/normalize", post(normalize_values))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "registers",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/registers/clean",
    tag = "registers",
    request_body = RawRegisterDocument,
    responses(
        (status = 200, description = "Cleaned and aligned register", body = CleanedRegister),
        (status = 422, description = "Document does not have the expected shape")
    )
)]
#[instrument(skip(state, document), fields(years = document.monthly.years.len()))]
async fn clean_register(
    State(state): State<AppState>,
    Json(document): Json<RawRegisterDocument>,
) -> Result<Json<CleanedRegister>, StatusCode> {
    debug!("Cleaning register with {} raw totals", document.totals.totals.len());
    let service = state.cleaning_service.clone();
    let cleaned = tokio::task::spawn_blocking(move || service.clean(&document))
        .await
        .map_err(|e| {
            error!("Register cleaning task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    info!(
        "Cleaned register: {} years, {} warnings",
        cleaned.monthly.len(),
        cleaned.warnings.len()
    );

    Ok(Json(cleaned))
}

#[utoipa::path(
    post,
    path = "/api/v1/values/normalize",
    tag = "registers",
    request_body = NormalizeRequest,
    responses((status = 200, description = "Normalized values", body = NormalizeResponse))
)]
#[instrument(skip(state, request), fields(tokens = request.tokens.len()))]
async fn normalize_values(
    State(state): State<AppState>,
    Json(request): Json<NormalizeRequest>,
) -> Json<NormalizeResponse> {
    let normalizer = state.cleaning_service.normalizer();
    let values = request
        .tokens
        .iter()
        .map(|token| normalizer.normalize_token(token))
        .collect();
    Json(NormalizeResponse { values })
}
