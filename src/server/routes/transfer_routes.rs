//! Cross-instance skill transfer routes

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::server::error::ApiResult;
use crate::server::state::AppState;
use crate::transfer::{self, ImportReport, SkillExport};

/// Body for POST /skills/import
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub instance_id: String,
    /// Raw skill payloads; each is validated independently
    #[serde(default)]
    pub skills: Vec<serde_json::Value>,
}

/// Body for POST /skills/export
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub instance_id: String,
    #[serde(default)]
    pub skill_files: Vec<String>,
}

/// POST /skills/import
pub async fn import_skills(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> ApiResult<Json<ImportReport>> {
    let instance = state.instance_path(&req.instance_id)?;
    let store = state.stores.skill_store(&instance);

    let report = transfer::import_skills(&store, req.skills).await?;
    Ok(Json(report))
}

/// POST /skills/export
pub async fn export_skills(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> ApiResult<Json<SkillExport>> {
    let instance = state.instance_path(&req.instance_id)?;
    let store = state.stores.skill_store(&instance);

    let export = transfer::export_skills(&store, &req.skill_files)?;
    Ok(Json(export))
}
