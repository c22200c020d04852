//! Response shaping — pure translation of internal ids into user-facing
//! fields for read paths.
//!
//! These functions take the id → username map as an argument and perform no
//! reads of their own; missing users render as [`DELETED_USER`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use repset_core::{
  concepts::{
    authenticating::DELETED_USER,
    commenting::CommentDoc,
    friending::{FriendRequestDoc, RequestStatus},
    pointing::PointsDoc,
    posting::{PostDoc, PostOptions},
  },
  store::Doc,
};
use serde::Serialize;
use uuid::Uuid;

fn username(usernames: &HashMap<Uuid, String>, id: Uuid) -> String {
  usernames.get(&id).cloned().unwrap_or_else(|| DELETED_USER.to_owned())
}

// ─── Posts ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PostResponse {
  pub id:         Uuid,
  pub author:     String,
  pub content:    String,
  pub subject:    String,
  pub picture:    Option<String>,
  pub options:    Option<PostOptions>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

pub fn post(
  doc: Doc<PostDoc>,
  usernames: &HashMap<Uuid, String>,
) -> PostResponse {
  PostResponse {
    id:         doc.id,
    author:     username(usernames, doc.data.author),
    content:    doc.data.content,
    subject:    doc.data.subject,
    picture:    doc.data.picture,
    options:    doc.data.options,
    created_at: doc.created_at,
    updated_at: doc.updated_at,
  }
}

pub fn posts(
  docs: Vec<Doc<PostDoc>>,
  usernames: &HashMap<Uuid, String>,
) -> Vec<PostResponse> {
  docs.into_iter().map(|doc| post(doc, usernames)).collect()
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CommentResponse {
  pub id:         Uuid,
  pub post:       Uuid,
  pub author:     String,
  pub content:    String,
  pub is_pinned:  bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

pub fn comment(
  doc: Doc<CommentDoc>,
  usernames: &HashMap<Uuid, String>,
) -> CommentResponse {
  CommentResponse {
    id:         doc.id,
    post:       doc.data.post,
    author:     username(usernames, doc.data.author),
    content:    doc.data.content,
    is_pinned:  doc.data.options.is_some_and(|o| o.is_pinned),
    created_at: doc.created_at,
    updated_at: doc.updated_at,
  }
}

pub fn comments(
  docs: Vec<Doc<CommentDoc>>,
  usernames: &HashMap<Uuid, String>,
) -> Vec<CommentResponse> {
  docs.into_iter().map(|doc| comment(doc, usernames)).collect()
}

// ─── Friend requests ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FriendRequestResponse {
  pub from:   String,
  pub to:     String,
  pub status: RequestStatus,
}

pub fn friend_requests(
  docs: Vec<Doc<FriendRequestDoc>>,
  usernames: &HashMap<Uuid, String>,
) -> Vec<FriendRequestResponse> {
  docs
    .into_iter()
    .map(|doc| FriendRequestResponse {
      from:   username(usernames, doc.data.from),
      to:     username(usernames, doc.data.to),
      status: doc.data.status,
    })
    .collect()
}

// ─── Leaderboard ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
  pub username: String,
  pub points:   i64,
}

pub fn leaderboard(
  docs: Vec<Doc<PointsDoc>>,
  usernames: &HashMap<Uuid, String>,
) -> Vec<LeaderboardEntry> {
  docs
    .into_iter()
    .map(|doc| LeaderboardEntry {
      username: username(usernames, doc.data.user),
      points:   doc.data.points,
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn doc<T>(data: T) -> Doc<T> {
    let now = Utc::now();
    Doc { id: Uuid::new_v4(), created_at: now, updated_at: now, data }
  }

  #[test]
  fn post_author_resolves_to_username() {
    let author = Uuid::new_v4();
    let usernames = HashMap::from([(author, "alice".to_owned())]);
    let shaped = post(
      doc(PostDoc {
        author,
        content: "c".into(),
        subject: "s".into(),
        picture: None,
        options: None,
      }),
      &usernames,
    );
    assert_eq!(shaped.author, "alice");
  }

  #[test]
  fn missing_author_renders_as_deleted_user() {
    let shaped = post(
      doc(PostDoc {
        author:  Uuid::new_v4(),
        content: "c".into(),
        subject: "s".into(),
        picture: None,
        options: None,
      }),
      &HashMap::new(),
    );
    assert_eq!(shaped.author, DELETED_USER);
  }
}
