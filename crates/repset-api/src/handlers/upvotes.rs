//! Handlers for `/upvotes` endpoints.
//!
//! Upvoting goes through the synchronization layer because crossing the vote
//! thresholds awards points; removal runs the upvoter assertion strictly
//! before the delete.

use axum::{
  Json,
  extract::{Query, State},
};
use repset_core::store::DocStore;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, error::ApiError, session::Session, sync};

#[derive(Debug, Deserialize)]
pub struct PostParams {
  pub post: Uuid,
}

/// `GET /upvotes/count?post=<id>`
pub async fn get_num_upvotes<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<PostParams>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let upvotes = state.app.upvoting.get_num_upvotes(params.post).await?;
  Ok(Json(json!({ "post": params.post, "upvotes": upvotes })))
}

/// `GET /upvotes/mine?post=<id>` — whether the caller upvoted the post.
pub async fn user_upvoted_post<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Query(params): Query<PostParams>,
) -> Result<Json<bool>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  Ok(Json(state.app.upvoting.user_upvoted_post(params.post, user).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpvoteBody {
  pub post: Uuid,
}

/// `POST /upvotes`
pub async fn upvote<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<UpvoteBody>,
) -> Result<Json<sync::UpvoteReceipt>, ApiError>
where
  S: DocStore + 'static,
{
  Ok(Json(sync::upvote_post(&state.app, session, body.post).await?))
}

/// `DELETE /upvotes?post=<id>`
pub async fn remove_upvote<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Query(params): Query<PostParams>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state.app.upvoting.assert_upvoter_is_user(params.post, user).await?;
  state.app.upvoting.remove_upvote(params.post, user).await?;
  Ok(Json(json!({ "msg": "upvote removed" })))
}
