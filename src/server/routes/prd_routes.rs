//! PRD board routes
//!
//! The listing endpoint returns the filtered board plus the tag index and
//! workflow stats in one response, so a kanban refresh is a single round
//! trip. Tags and stats always describe the whole collection; only the
//! `prds` array is narrowed by the query parameters.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ListParams;
use crate::content::{self, PrdContent};
use crate::models::{NewPrd, PrdRecord, PrdUpdate};
use crate::search::filter;
use crate::server::error::ApiResult;
use crate::server::state::AppState;
use crate::tags::all_tags;
use crate::workflow::{WorkflowEngine, WorkflowStats, WorkflowUpdate};

/// Board listing response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrdListResponse {
    pub prds: Vec<PrdRecord>,
    pub tags: Vec<String>,
    pub stats: WorkflowStats,
}

/// Body for replacing a PRD markdown body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContentUpdate {
    pub content: String,
}

/// GET /instances/:id/prds
pub async fn list_prds(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PrdListResponse>> {
    let instance = state.instance_path(&id)?;
    let store = state.stores.prd_store(&instance);

    let mut records = store.list()?;
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let tags = all_tags(&records);
    let stats = WorkflowStats::from_records(&records);
    let prds = filter(&records, &params.to_filter());

    Ok(Json(PrdListResponse { prds, tags, stats }))
}

/// POST /instances/:id/prds
pub async fn create_prd(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<NewPrd>,
) -> ApiResult<(StatusCode, Json<PrdRecord>)> {
    let instance = state.instance_path(&id)?;
    let store = state.stores.prd_store(&instance);

    let update = WorkflowEngine::new(&store).create(payload).await?;
    Ok((StatusCode::CREATED, Json(update.prd)))
}

/// PATCH /instances/:id/prds
pub async fn update_prd(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PrdUpdate>,
) -> ApiResult<Json<WorkflowUpdate>> {
    let instance = state.instance_path(&id)?;
    let store = state.stores.prd_store(&instance);

    let result = WorkflowEngine::new(&store).apply(update).await?;
    Ok(Json(result))
}

/// GET /instances/:id/prds/:filename/content
pub async fn get_prd_content(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
) -> ApiResult<Json<PrdContent>> {
    let instance = state.instance_path(&id)?;
    let store = state.stores.prd_store(&instance);

    let body = content::load_prd_content(&store, &instance, &filename)?;
    Ok(Json(body))
}

/// PUT /instances/:id/prds/:filename/content
pub async fn put_prd_content(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
    Json(body): Json<ContentUpdate>,
) -> ApiResult<Json<PrdRecord>> {
    let instance = state.instance_path(&id)?;
    let store = state.stores.prd_store(&instance);

    let update = content::save_prd_content(&store, &instance, &filename, &body.content).await?;
    Ok(Json(update.prd))
}
