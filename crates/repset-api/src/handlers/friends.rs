//! Handlers for `/friends` and `/friend` endpoints.
//!
//! Friends are addressed by username at the HTTP boundary and resolved to
//! ids before touching the Friending concept.

use axum::{
  Json,
  extract::{Path, State},
};
use repset_core::store::DocStore;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, error::ApiError, responses, session::Session};

/// `GET /friends` — usernames of the caller's friends.
pub async fn get_friends<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let friends = state.app.friending.get_friends(user).await?;
  Ok(Json(state.app.authing.ids_to_usernames(&friends).await?))
}

/// `DELETE /friends/:friend`
pub async fn remove_friend<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(friend): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let friend = state.app.authing.get_by_username(&friend).await?;
  state.app.friending.remove_friend(user, friend.id).await?;
  Ok(Json(json!({ "msg": "friend removed" })))
}

/// `GET /friend/requests` — all requests involving the caller.
pub async fn get_requests<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<Vec<responses::FriendRequestResponse>>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let requests = state.app.friending.get_requests(user).await?;
  let ids: Vec<Uuid> = requests
    .iter()
    .flat_map(|r| [r.data.from, r.data.to])
    .collect();
  let usernames = state.app.authing.username_map(&ids).await?;
  Ok(Json(responses::friend_requests(requests, &usernames)))
}

/// `POST /friend/requests/:to`
pub async fn send_request<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(to): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let to = state.app.authing.get_by_username(&to).await?;
  state.app.friending.send_request(user, to.id).await?;
  Ok(Json(json!({ "msg": "friend request sent" })))
}

/// `DELETE /friend/requests/:to` — withdraw a pending request.
pub async fn remove_request<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(to): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let to = state.app.authing.get_by_username(&to).await?;
  state.app.friending.remove_request(user, to.id).await?;
  Ok(Json(json!({ "msg": "friend request removed" })))
}

/// `PUT /friend/accept/:from`
pub async fn accept_request<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(from): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let from = state.app.authing.get_by_username(&from).await?;
  state.app.friending.accept_request(from.id, user).await?;
  Ok(Json(json!({ "msg": "friend request accepted" })))
}

/// `PUT /friend/reject/:from`
pub async fn reject_request<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(from): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let from = state.app.authing.get_by_username(&from).await?;
  state.app.friending.reject_request(from.id, user).await?;
  Ok(Json(json!({ "msg": "friend request rejected" })))
}
