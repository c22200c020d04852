//! Handlers for `/posts` endpoints.
//!
//! The authorship assertion runs strictly before every mutating call — it is
//! the only authorization boundary for posts.

use std::collections::HashMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use repset_core::{
  concepts::posting::{PostDoc, PostOptions},
  store::{Doc, DocStore},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, error::ApiError, responses, session::Session};

/// Resolve the usernames a batch of posts refers to.
async fn author_map<S: DocStore>(
  state: &AppState<S>,
  docs: &[Doc<PostDoc>],
) -> Result<HashMap<Uuid, String>, ApiError> {
  let ids: Vec<Uuid> = docs.iter().map(|d| d.data.author).collect();
  Ok(state.app.authing.username_map(&ids).await?)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Restrict to posts by this username.
  pub author: Option<String>,
}

/// `GET /posts[?author=<username>]`
pub async fn get_posts<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<responses::PostResponse>>, ApiError>
where
  S: DocStore + 'static,
{
  let docs = match params.author {
    Some(author) => {
      let user = state.app.authing.get_by_username(&author).await?;
      state.app.posting.get_by_author(user.id).await?
    }
    None => state.app.posting.get_posts().await?,
  };
  let usernames = author_map(&state, &docs).await?;
  Ok(Json(responses::posts(docs, &usernames)))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostBody {
  pub content: String,
  pub subject: String,
  pub picture: Option<String>,
  pub options: Option<PostOptions>,
}

/// `POST /posts`
pub async fn create_post<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<CreatePostBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let created = state
    .app
    .posting
    .create(user, body.content, body.subject, body.picture, body.options)
    .await?;
  let usernames = state.app.authing.username_map(&[user]).await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({
      "msg": "post created",
      "post": responses::post(created, &usernames),
    })),
  ))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostBody {
  pub subject: Option<String>,
  pub content: Option<String>,
  pub picture: Option<String>,
  pub options: Option<PostOptions>,
}

/// `PATCH /posts/:id`
pub async fn update_post<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdatePostBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state.app.posting.assert_author_is_user(id, user).await?;
  state
    .app
    .posting
    .update(id, body.subject, body.content, body.picture, body.options)
    .await?;
  Ok(Json(json!({ "msg": "post updated" })))
}

/// `DELETE /posts/:id`
pub async fn delete_post<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state.app.posting.assert_author_is_user(id, user).await?;
  state.app.posting.delete(id).await?;
  Ok(Json(json!({ "msg": "post deleted" })))
}
