use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::db::schema::TableSchema;
use crate::engine::pipeline::Answer;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, Clone)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub tables: Vec<TableSchema>,
    /// The same block the model sees
    pub prompt_text: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub database: String,
    pub llm_backend: String,
    pub llm_model: String,
}

// Question answering. Classified failures are still a 200 with `error` set.
pub async fn process_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<Answer>, (StatusCode, String)> {
    if payload.question.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Please enter a question.".to_string()));
    }

    let start_time = Instant::now();
    info!("Question: {}", payload.question);

    let answer = state.pipeline.answer(&payload.question).await.map_err(|e| {
        error!("Failed to answer question: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(
        "Answered in {}ms (error: {:?})",
        start_time.elapsed().as_millis(),
        answer.envelope.error
    );
    Ok(Json(answer))
}

pub async fn get_schema(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SchemaResponse>, (StatusCode, String)> {
    let snapshot = state.pipeline.store().schema().await.map_err(|e| {
        error!("Failed to read schema: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(SchemaResponse {
        prompt_text: snapshot.render(),
        tables: snapshot.tables,
    }))
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let uptime = chrono::Utc::now() - state.startup_time;

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds(),
        database: state.pipeline.store().path().display().to_string(),
        llm_backend: state.config.llm.backend.clone(),
        llm_model: state.config.llm.model.clone(),
    })
}
