//! Handlers for accounts and sessions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/session` | The logged-in caller's user |
//! | `GET`    | `/users` | All users, redacted |
//! | `GET`    | `/users/:username` | 404 if not found |
//! | `POST`   | `/users` | Register; requires a logged-out session |
//! | `PATCH`  | `/users/username` | |
//! | `PATCH`  | `/users/password` | Requires the current password |
//! | `DELETE` | `/users` | Deregister the caller |
//! | `POST`   | `/login` | Returns the session handle |
//! | `POST`   | `/logout` | |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use repset_core::{concepts::authenticating::UserView, store::DocStore};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, error::ApiError, session::Session, sync};

/// `GET /session`
pub async fn get_session_user<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<UserView>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  Ok(Json(state.app.authing.get_by_id(user).await?))
}

/// `GET /users`
pub async fn get_users<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<UserView>>, ApiError>
where
  S: DocStore + 'static,
{
  Ok(Json(state.app.authing.get_users().await?))
}

/// `GET /users/:username`
pub async fn get_user<S>(
  State(state): State<AppState<S>>,
  Path(username): Path<String>,
) -> Result<Json<UserView>, ApiError>
where
  S: DocStore + 'static,
{
  Ok(Json(state.app.authing.get_by_username(&username).await?))
}

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
  pub username: String,
  pub password: String,
}

/// `POST /users` — body: `{"username":…, "password":…}`
pub async fn create_user<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<CredentialsBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocStore + 'static,
{
  state.app.sessioning.is_logged_out(session)?;
  let user =
    sync::register_user(&state.app, &body.username, &body.password).await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({ "msg": "user created", "user": user })),
  ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUsernameBody {
  pub username: String,
}

/// `PATCH /users/username`
pub async fn update_username<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<UpdateUsernameBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state.app.authing.update_username(user, &body.username).await?;
  Ok(Json(json!({ "msg": "username updated" })))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordBody {
  pub current_password: String,
  pub new_password:     String,
}

/// `PATCH /users/password`
pub async fn update_password<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<UpdatePasswordBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state
    .app
    .authing
    .update_password(user, &body.current_password, &body.new_password)
    .await?;
  Ok(Json(json!({ "msg": "password updated" })))
}

/// `DELETE /users` — deregisters the caller and cascades to their ledger.
pub async fn delete_user<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  sync::deregister_user(&state.app, session).await?;
  Ok(Json(json!({ "msg": "user deleted" })))
}

/// `POST /login` — returns the session handle for subsequent requests.
pub async fn log_in<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<CredentialsBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user =
    state.app.authing.authenticate(&body.username, &body.password).await?;
  state.app.sessioning.start(session, user.id)?;
  Ok(Json(json!({ "msg": "logged in", "session": session })))
}

/// `POST /logout`
pub async fn log_out<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  state.app.sessioning.end(session)?;
  Ok(Json(json!({ "msg": "logged out" })))
}
