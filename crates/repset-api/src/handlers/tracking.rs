//! Handlers for `/tracking` endpoints.
//!
//! All operations act on the caller's own profile; profile creation is the
//! one exception, taking an explicit user id.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use repset_core::{
  concepts::tracking::{Difficulty, ProgressEntry, WorkoutTask},
  store::DocStore,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, error::ApiError, session::Session};

#[derive(Debug, Deserialize)]
pub struct CreateProfileBody {
  pub user_id: Uuid,
}

/// `POST /tracking/profile`
pub async fn create_profile<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateProfileBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocStore + 'static,
{
  let profile = state.app.tracking.create_profile(body.user_id).await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({ "msg": "tracking profile created", "profile": profile })),
  ))
}

/// `GET /tracking/percentage`
pub async fn get_completed_percentage<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let percentage = state.app.tracking.get_completed_percentage(user).await?;
  Ok(Json(json!({ "percentage": percentage })))
}

/// `GET /tracking/tasks`
pub async fn get_tasks<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<Vec<WorkoutTask>>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  Ok(Json(state.app.tracking.get_tasks(user).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskBody {
  pub task_name:        String,
  pub task_description: String,
  pub reps:             u32,
  pub sets:             Option<u32>,
  pub starting_weight:  Option<f64>,
}

/// `POST /tracking/tasks`
pub async fn create_task<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<CreateTaskBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state
    .app
    .tracking
    .create_task(
      user,
      body.task_name,
      body.task_description,
      body.reps,
      body.sets,
      body.starting_weight,
    )
    .await?;
  Ok((StatusCode::CREATED, Json(json!({ "msg": "task created" }))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskBody {
  pub reps:       Option<u32>,
  pub sets:       Option<u32>,
  pub weight:     Option<f64>,
  pub difficulty: Option<Difficulty>,
}

/// `PATCH /tracking/tasks/:name`
pub async fn update_task<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(name): Path<String>,
  Json(body): Json<UpdateTaskBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let task = state
    .app
    .tracking
    .update_task(
      user,
      &name,
      body.reps,
      body.sets,
      body.weight,
      body.difficulty,
    )
    .await?;
  Ok(Json(json!({ "msg": "task updated", "task": task })))
}

/// `DELETE /tracking/tasks/:name`
pub async fn delete_task<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state.app.tracking.delete_task(user, &name).await?;
  Ok(Json(json!({ "msg": "task deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct SetGoalBody {
  pub goal: String,
}

/// `POST /tracking/goal`
pub async fn set_goal<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<SetGoalBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state.app.tracking.set_goal(user, body.goal.clone()).await?;
  Ok(Json(json!({ "msg": "goal set", "goal": body.goal })))
}

/// `POST /tracking/tasks/:name/completed` — toggles the flag.
pub async fn toggle_completed<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let completed = state.app.tracking.set_completed(user, &name).await?;
  Ok(Json(json!({ "task_name": name, "completed": completed })))
}

/// `GET /tracking/tasks/:name/completed`
pub async fn is_completed<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let completed = state.app.tracking.is_completed(user, &name).await?;
  Ok(Json(json!({ "task_name": name, "completed": completed })))
}

/// `POST /tracking/tasks/reset` — the caller decides when a week ends.
pub async fn reset_weekly_tasks<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state.app.tracking.reset_weekly_tasks(user).await?;
  Ok(Json(json!({ "msg": "weekly tasks reset" })))
}

/// `GET /tracking/history`
pub async fn get_progress_history<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<Vec<ProgressEntry>>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  Ok(Json(state.app.tracking.get_progress_history(user).await?))
}

#[derive(Debug, Deserialize)]
pub struct PromptChangeBody {
  pub current_difficulty: Difficulty,
}

/// `POST /tracking/tasks/:name/prompt`
pub async fn prompt_change<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(name): Path<String>,
  Json(body): Json<PromptChangeBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let suggestion = state
    .app
    .tracking
    .prompt_change(user, &name, body.current_difficulty)
    .await?;
  Ok(Json(json!({ "suggestion": suggestion })))
}
