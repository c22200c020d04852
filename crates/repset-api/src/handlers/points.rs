//! Handlers for `/pointing` endpoints.

use axum::{Json, extract::State};
use repset_core::{concepts::pointing::PointsDoc, store::Doc, store::DocStore};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, error::ApiError, responses, session::Session, sync};

/// `GET /pointing` — the caller's ledger entry.
pub async fn get_user_points<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
) -> Result<Json<Doc<PointsDoc>>, ApiError>
where
  S: DocStore + 'static,
{
  let user = state.app.sessioning.get_user(session)?;
  Ok(Json(state.app.pointing.get_user_points(user).await?))
}

/// `GET /pointing/top` — the leaderboard, highest totals first.
pub async fn get_top_points<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<responses::LeaderboardEntry>>, ApiError>
where
  S: DocStore + 'static,
{
  let ledgers = state.app.pointing.get_points().await?;
  let ids: Vec<Uuid> = ledgers.iter().map(|l| l.data.user).collect();
  let usernames = state.app.authing.username_map(&ids).await?;
  Ok(Json(responses::leaderboard(ledgers, &usernames)))
}

#[derive(Debug, Deserialize)]
pub struct AwardPointsBody {
  pub amount:        i64,
  pub verified_post: Option<Uuid>,
}

/// `PATCH /pointing` — administrative award to the caller, optionally
/// verified against a post.
pub async fn award_points<S>(
  State(state): State<AppState<S>>,
  Session(session): Session,
  Json(body): Json<AwardPointsBody>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: DocStore + 'static,
{
  let total =
    sync::claim_points(&state.app, session, body.amount, body.verified_post)
      .await?;
  Ok(Json(json!({ "msg": "points awarded", "points": total })))
}
