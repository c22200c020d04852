//! Handlers for `/conversations` endpoints.
//!
//! Conversation documents embed their message sequence, so reads return it
//! in place; participant checks happen inside the Messaging concept.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use repset_core::{
  concepts::messaging::{ConversationDoc, ConversationOutcome, Message, TaskPayload},
  store::{Doc, DocStore},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, error::ApiError, session::Session};

#[derive(Debug, Deserialize)]
pub struct CreateConversationBody {
  pub recipient: Uuid,
}

/// `POST /conversations` — idempotent lookup-or-create for the caller and
/// one recipient.
pub async fn create_conversation<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<CreateConversationBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  let outcome = state
    .app
    .messaging
    .create_conversation(vec![user, body.recipient])
    .await?;
  let status = match outcome {
    ConversationOutcome::Created(_) => StatusCode::CREATED,
    ConversationOutcome::Existing(_) => StatusCode::OK,
  };
  Ok((status, Json(outcome)))
}

/// `GET /conversations` — every conversation the caller participates in.
pub async fn get_conversations<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<Vec<Doc<ConversationDoc>>>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  Ok(Json(state.app.messaging.get_conversations_for_user(user).await?))
}

/// `GET /conversations/:id`
pub async fn get_conversation<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Doc<ConversationDoc>>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  Ok(Json(state.app.messaging.get_conversation(id, user).await?))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
  pub content:   String,
  pub recipient: Uuid,
}

/// `POST /conversations/:id/messages`
pub async fn send_message<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(id): Path<Uuid>,
  Json(body): Json<SendMessageBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocStore + 'static,
{
  let sender = state.app.sessioning.get_user(session)?;
  let message = state
    .app
    .messaging
    .send_message(id, body.content, sender, body.recipient)
    .await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({ "msg": "message sent", "message": message })),
  ))
}

#[derive(Debug, Deserialize)]
pub struct SendTaskMessageBody {
  pub content:   String,
  pub recipient: Uuid,
  pub task:      TaskPayload,
}

/// `POST /conversations/:id/tasks` — a message with an embedded workout
/// task.
pub async fn send_task_message<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(id): Path<Uuid>,
  Json(body): Json<SendTaskMessageBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocStore + 'static,
{
  let sender = state.app.sessioning.get_user(session)?;
  let message = state
    .app
    .messaging
    .send_task_message(id, body.content, sender, body.recipient, body.task)
    .await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({ "msg": "task message sent", "message": message })),
  ))
}

/// `GET /conversations/:id/messages`
pub async fn get_messages<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  Ok(Json(state.app.messaging.get_messages(id, user).await?))
}

/// `DELETE /conversations/:id/messages/:message_id`
pub async fn delete_message<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Path((id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  state.app.messaging.delete_message(id, message_id, user).await?;
  Ok(Json(json!({ "msg": "message deleted" })))
}
