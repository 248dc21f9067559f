//! Instance registry routes

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::file_storage;
use crate::file_storage::instances::InstanceEntry;
use crate::server::error::ApiResult;
use crate::server::state::AppState;

/// Registry listing response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceListResponse {
    pub instances: Vec<InstanceEntry>,
}

/// Body for POST /instances
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInstanceRequest {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// GET /instances
pub async fn list_instances(
    State(state): State<AppState>,
) -> ApiResult<Json<InstanceListResponse>> {
    let instances = state.registry.list()?;
    Ok(Json(InstanceListResponse { instances }))
}

/// POST /instances
///
/// Upserts by workspace path, so registering the same path twice returns
/// the existing entry with a refreshed `lastUsedAt`. The workspace's
/// `.forgeboard/` skeleton is created on the way.
pub async fn register_instance(
    State(state): State<AppState>,
    Json(req): Json<RegisterInstanceRequest>,
) -> ApiResult<Json<InstanceEntry>> {
    let entry = state.registry.register(&req.path, req.name.as_deref()).await?;
    file_storage::init_instance_dir(std::path::Path::new(&entry.path))?;
    Ok(Json(entry))
}

/// DELETE /instances/:id
///
/// Removes the registry entry only; the workspace's files stay untouched.
pub async fn remove_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.registry.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
