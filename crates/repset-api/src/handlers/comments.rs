//! Handlers for `/comments` endpoints.
//!
//! Creation goes through the synchronization layer so the referenced post is
//! resolved first; mutations run the authorship assertion strictly before
//! the mutating call.

use std::collections::HashMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use repset_core::{
  concepts::commenting::{CommentDoc, CommentOptions},
  store::{Doc, DocStore},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, error::ApiError, responses, session::Session, sync};

async fn author_map<S: DocStore>(
  state: &AppState<S>,
  docs: &[Doc<CommentDoc>],
) -> Result<HashMap<Uuid, String>, ApiError> {
  let ids: Vec<Uuid> = docs.iter().map(|d| d.data.author).collect();
  Ok(state.app.authing.username_map(&ids).await?)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub post: Uuid,
}

/// `GET /comments?post=<id>`
pub async fn get_comments<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<responses::CommentResponse>>, ApiError>
where
  S: DocStore + 'static,
{
  let docs = state.app.commenting.get_for_post(params.post).await?;
  let usernames = author_map(&state, &docs).await?;
  Ok(Json(responses::comments(docs, &usernames)))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentBody {
  pub post:    Uuid,
  pub content: String,
  pub options: Option<CommentOptions>,
}

/// `POST /comments`
pub async fn create_comment<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<CreateCommentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocStore + 'static,
{
  let created = sync::create_comment(
    &state.app,
    session,
    body.post,
    body.content,
    body.options,
  )
  .await?;
  let usernames = author_map(&state, std::slice::from_ref(&created)).await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({
      "msg": "comment created",
      "comment": responses::comment(created, &usernames),
    })),
  ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentBody {
  pub content: Option<String>,
  pub options: Option<CommentOptions>,
}

/// `PATCH /comments/:id`
pub async fn update_comment<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateCommentBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state.app.commenting.assert_author_is_user(id, user).await?;
  state.app.commenting.update(id, body.content, body.options).await?;
  Ok(Json(json!({ "msg": "comment updated" })))
}

/// `DELETE /comments/:id`
pub async fn delete_comment<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state.app.commenting.assert_author_is_user(id, user).await?;
  state.app.commenting.delete(id).await?;
  Ok(Json(json!({ "msg": "comment deleted" })))
}
