//! Skill collection routes

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use super::ListParams;
use crate::models::{NewSkill, SkillRecord, SkillUpdate};
use crate::search::filter;
use crate::server::error::ApiResult;
use crate::server::state::AppState;
use crate::tags::all_tags;

/// Skill listing response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillListResponse {
    pub skills: Vec<SkillRecord>,
    pub tags: Vec<String>,
}

/// GET /instances/:id/skills
pub async fn list_skills(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<SkillListResponse>> {
    let instance = state.instance_path(&id)?;
    let store = state.stores.skill_store(&instance);

    let mut records = store.list()?;
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let tags = all_tags(&records);
    let skills = filter(&records, &params.to_filter());

    Ok(Json(SkillListResponse { skills, tags }))
}

/// POST /instances/:id/skills
pub async fn create_skill(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<NewSkill>,
) -> ApiResult<(StatusCode, Json<SkillRecord>)> {
    let instance = state.instance_path(&id)?;
    let store = state.stores.skill_store(&instance);

    let record = payload.into_record(Utc::now())?;
    let created = store.create(record).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /instances/:id/skills/:filename
pub async fn update_skill(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
    Json(update): Json<SkillUpdate>,
) -> ApiResult<Json<SkillRecord>> {
    let instance = state.instance_path(&id)?;
    let store = state.stores.skill_store(&instance);

    let updated = store
        .update_with(&filename, |record| {
            update.apply_to(record)?;
            record.updated_at = Utc::now();
            Ok(record.clone())
        })
        .await?;
    Ok(Json(updated))
}

/// DELETE /instances/:id/skills/:filename
pub async fn delete_skill(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let instance = state.instance_path(&id)?;
    let store = state.stores.skill_store(&instance);

    store.delete(&filename).await?;
    Ok(StatusCode::NO_CONTENT)
}
