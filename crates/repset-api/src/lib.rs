//! JSON REST API for repset.
//!
//! Exposes an axum [`Router`] over any [`DocStore`] backend. Handlers stay
//! thin: they resolve identity, run authorization assertions in order, and
//! delegate every multi-concept sequence to [`sync`].

pub mod error;
pub mod handlers;
pub mod responses;
pub mod session;
pub mod sync;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, patch, post, put},
};
use repset_core::{
  Result,
  concepts::{
    Authenticating, Commenting, Friending, Messaging, Pointing, Posting,
    Sessioning, Tracking, Upvoting,
  },
  store::DocStore,
};
use tower_http::trace::TraceLayer;

use handlers::{
  comments, conversations, friends, points, posts, tracking, upvotes, users,
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `REPSET_`-prefixed environment variables.
#[derive(Clone, serde::Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       default_host(),
      port:       default_port(),
      store_path: default_store_path(),
    }
  }
}

fn default_host() -> String {
  "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
  8080
}

fn default_store_path() -> PathBuf {
  PathBuf::from("repset.db")
}

// ─── Application state ────────────────────────────────────────────────────────

/// The composition of concepts. Instantiated once at startup and
/// synchronized in [`sync`] and the handlers — concepts themselves never
/// call each other.
pub struct App<S: DocStore> {
  pub authing:    Authenticating<S>,
  pub sessioning: Sessioning,
  pub posting:    Posting<S>,
  pub commenting: Commenting<S>,
  pub upvoting:   Upvoting<S>,
  pub friending:  Friending<S>,
  pub messaging:  Messaging<S>,
  pub tracking:   Tracking<S>,
  pub pointing:   Pointing<S>,
}

impl<S: DocStore> App<S> {
  pub async fn new(store: &S) -> Result<Self, S::Error> {
    Ok(Self {
      authing:    Authenticating::new(store).await?,
      sessioning: Sessioning::new(),
      posting:    Posting::new(store).await?,
      commenting: Commenting::new(store).await?,
      upvoting:   Upvoting::new(store).await?,
      friending:  Friending::new(store).await?,
      messaging:  Messaging::new(store).await?,
      tracking:   Tracking::new(store).await?,
      pointing:   Pointing::new(store).await?,
    })
  }
}

/// Shared state threaded through all axum handlers.
pub struct AppState<S: DocStore> {
  pub app:    Arc<App<S>>,
  pub config: Arc<ServerConfig>,
}

impl<S: DocStore> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { app: Arc::clone(&self.app), config: Arc::clone(&self.config) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised router for the application.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: DocStore + 'static,
{
  Router::new()
    // Sessioning / Authenticating
    .route("/session", get(users::get_session_user::<S>))
    .route("/users", get(users::get_users::<S>).post(users::create_user::<S>).delete(users::delete_user::<S>))
    .route("/users/{username}", get(users::get_user::<S>))
    .route("/users/username", patch(users::update_username::<S>))
    .route("/users/password", patch(users::update_password::<S>))
    .route("/login", post(users::log_in::<S>))
    .route("/logout", post(users::log_out::<S>))
    // Posting
    .route("/posts", get(posts::get_posts::<S>).post(posts::create_post::<S>))
    .route("/posts/{id}", patch(posts::update_post::<S>).delete(posts::delete_post::<S>))
    // Commenting
    .route("/comments", get(comments::get_comments::<S>).post(comments::create_comment::<S>))
    .route("/comments/{id}", patch(comments::update_comment::<S>).delete(comments::delete_comment::<S>))
    // Upvoting
    .route("/upvotes", post(upvotes::upvote::<S>).delete(upvotes::remove_upvote::<S>))
    .route("/upvotes/count", get(upvotes::get_num_upvotes::<S>))
    .route("/upvotes/mine", get(upvotes::user_upvoted_post::<S>))
    // Friending
    .route("/friends", get(friends::get_friends::<S>))
    .route("/friends/{friend}", delete(friends::remove_friend::<S>))
    .route("/friend/requests", get(friends::get_requests::<S>))
    .route("/friend/requests/{to}", post(friends::send_request::<S>).delete(friends::remove_request::<S>))
    .route("/friend/accept/{from}", put(friends::accept_request::<S>))
    .route("/friend/reject/{from}", put(friends::reject_request::<S>))
    // Messaging
    .route("/conversations", get(conversations::get_conversations::<S>).post(conversations::create_conversation::<S>))
    .route("/conversations/{id}", get(conversations::get_conversation::<S>))
    .route("/conversations/{id}/messages", get(conversations::get_messages::<S>).post(conversations::send_message::<S>))
    .route("/conversations/{id}/tasks", post(conversations::send_task_message::<S>))
    .route("/conversations/{id}/messages/{message_id}", delete(conversations::delete_message::<S>))
    // Tracking
    .route("/tracking/profile", post(tracking::create_profile::<S>))
    .route("/tracking/percentage", get(tracking::get_completed_percentage::<S>))
    .route("/tracking/tasks", get(tracking::get_tasks::<S>).post(tracking::create_task::<S>))
    .route("/tracking/tasks/reset", post(tracking::reset_weekly_tasks::<S>))
    .route("/tracking/tasks/{name}", patch(tracking::update_task::<S>).delete(tracking::delete_task::<S>))
    .route("/tracking/tasks/{name}/completed", get(tracking::is_completed::<S>).post(tracking::toggle_completed::<S>))
    .route("/tracking/tasks/{name}/prompt", post(tracking::prompt_change::<S>))
    .route("/tracking/goal", post(tracking::set_goal::<S>))
    .route("/tracking/history", get(tracking::get_progress_history::<S>))
    // Pointing
    .route("/pointing", get(points::get_user_points::<S>).patch(points::award_points::<S>))
    .route("/pointing/top", get(points::get_top_points::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
