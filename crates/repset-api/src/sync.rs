//! The synchronization layer — every sequence that crosses a concept
//! boundary lives here, as a named function with explicit steps and
//! compensating actions.
//!
//! Concepts share no transaction, so a failure between steps would otherwise
//! leave partially-applied state (a user with no ledger, a vote with no
//! award). Each sequence therefore compensates: it undoes the steps already
//! applied before surfacing the failure. Compensation itself is best-effort;
//! when it fails too, the inconsistency is logged rather than hidden.

use repset_core::{
  Error, Result,
  concepts::{
    authenticating::UserView,
    commenting::{CommentDoc, CommentOptions},
    upvoting::UpvoteOutcome,
  },
  store::{Doc, DocStore},
};
use serde::Serialize;
use uuid::Uuid;

use crate::App;

/// Points awarded to a post's author when its first upvote lands.
const FIRST_UPVOTE_AUTHOR_AWARD: i64 = 5;
/// Points awarded to an upvoter for the first upvote, and again for every
/// upvote event past [`REPEAT_AWARD_THRESHOLD`].
const UPVOTER_AWARD: i64 = 1;
/// Past this vote count, every further upvote pays the upvoter again. There
/// is intentionally no upper bound or per-post cap.
const REPEAT_AWARD_THRESHOLD: u64 = 5;

// ─── User lifecycle ──────────────────────────────────────────────────────────

/// Registering a user also opens their zero-point ledger.
///
/// Steps: (1) create the account; (2) create the ledger entry.
/// Compensation: a failed step 2 deletes the account from step 1.
pub async fn register_user<S: DocStore>(
  app: &App<S>,
  username: &str,
  password: &str,
) -> Result<UserView> {
  let user = app.authing.create(username, password).await?;
  if let Err(e) = app.pointing.create(user.id).await {
    if let Err(rollback) = app.authing.delete(user.id).await {
      tracing::error!(
        user = %user.id,
        error = %rollback,
        "failed to roll back user creation; account left without a ledger"
      );
    }
    return Err(e);
  }
  Ok(user)
}

/// Deleting a user also closes their ledger and ends their session.
///
/// Steps: (1) end the session, so no further requests act as this user;
/// (2) snapshot and delete the ledger entry; (3) delete the account.
/// Compensation: a failed step 3 restores the ledger snapshot from step 2.
pub async fn deregister_user<S: DocStore>(
  app: &App<S>,
  session: Uuid,
) -> Result<()> {
  let user = app.sessioning.get_user(session)?;
  app.sessioning.end(session)?;

  let snapshot = match app.pointing.get_user_points(user).await {
    Ok(ledger) => {
      app.pointing.delete(user).await?;
      Some(ledger.data)
    }
    // Nothing to cascade; proceed with the account alone.
    Err(Error::NotFound(_)) => None,
    Err(e) => return Err(e),
  };

  if let Err(e) = app.authing.delete(user).await {
    if let Some(snapshot) = snapshot {
      if let Err(restore) = app.pointing.restore(snapshot).await {
        tracing::error!(
          user = %user,
          error = %restore,
          "failed to restore ledger after failed user deletion"
        );
      }
    }
    return Err(e);
  }
  Ok(())
}

// ─── Upvoting ────────────────────────────────────────────────────────────────

/// What an upvote request did, award detail included.
#[derive(Debug, Serialize)]
pub struct UpvoteReceipt {
  #[serde(flatten)]
  pub outcome:       UpvoteOutcome,
  pub author_award:  i64,
  pub upvoter_award: i64,
}

/// An upvote conditionally awards points to two different users.
///
/// Steps: (1) resolve the post, so a vote is never recorded against a
/// missing target; (2) record the vote — a duplicate stops here with the
/// explicit `AlreadyUpvoted` outcome and no awards; (3) award by threshold:
/// the first upvote pays the author 5 and the upvoter 1 (both recording the
/// post), and every upvote past a count of 5 pays the upvoter 1 more.
/// Compensation: a failed award undoes the awards already applied and
/// removes the vote.
pub async fn upvote_post<S: DocStore>(
  app: &App<S>,
  session: Uuid,
  post: Uuid,
) -> Result<UpvoteReceipt> {
  let user = app.sessioning.get_user(session)?;
  let post_doc = app.posting.get_by_id(post).await?;

  let outcome = app.upvoting.upvote(post, user).await?;
  let UpvoteOutcome::Added { count } = outcome else {
    return Ok(UpvoteReceipt { outcome, author_award: 0, upvoter_award: 0 });
  };

  let mut author_award = 0;
  let mut upvoter_award = 0;
  let failure = 'awards: {
    if count == 1 {
      if let Err(e) = app
        .pointing
        .award_points(post_doc.data.author, FIRST_UPVOTE_AUTHOR_AWARD, Some(post))
        .await
      {
        break 'awards Some(e);
      }
      author_award = FIRST_UPVOTE_AUTHOR_AWARD;
      if let Err(e) =
        app.pointing.award_points(user, UPVOTER_AWARD, Some(post)).await
      {
        break 'awards Some(e);
      }
      upvoter_award = UPVOTER_AWARD;
    } else if count > REPEAT_AWARD_THRESHOLD {
      if let Err(e) = app.pointing.award_points(user, UPVOTER_AWARD, None).await
      {
        break 'awards Some(e);
      }
      upvoter_award = UPVOTER_AWARD;
    }
    None
  };

  if let Some(e) = failure {
    undo_award(app, post_doc.data.author, author_award).await;
    undo_award(app, user, upvoter_award).await;
    if let Err(undo) = app.upvoting.remove_upvote(post, user).await {
      tracing::error!(
        post = %post,
        upvoter = %user,
        error = %undo,
        "failed to remove vote after failed award"
      );
    }
    return Err(e);
  }

  Ok(UpvoteReceipt { outcome, author_award, upvoter_award })
}

async fn undo_award<S: DocStore>(app: &App<S>, user: Uuid, amount: i64) {
  if amount == 0 {
    return;
  }
  if let Err(e) = app.pointing.award_points(user, -amount, None).await {
    tracing::error!(
      user = %user,
      amount,
      error = %e,
      "failed to undo a partially-applied award"
    );
  }
}

// ─── Commenting ──────────────────────────────────────────────────────────────

/// A comment must reference an existing post at creation time (the reference
/// is not re-validated afterwards).
///
/// Steps: (1) resolve the post; (2) create the comment.
pub async fn create_comment<S: DocStore>(
  app: &App<S>,
  session: Uuid,
  post: Uuid,
  content: String,
  options: Option<CommentOptions>,
) -> Result<Doc<CommentDoc>> {
  let user = app.sessioning.get_user(session)?;
  app.posting.get_by_id(post).await?;
  app.commenting.create(post, user, content, options).await
}

// ─── Pointing ────────────────────────────────────────────────────────────────

/// Administrative award to the caller, optionally verified against a post.
///
/// Steps: (1) when a post reference is supplied, resolve it; (2) award.
/// Resolves to the new total.
pub async fn claim_points<S: DocStore>(
  app: &App<S>,
  session: Uuid,
  amount: i64,
  verified_post: Option<Uuid>,
) -> Result<i64> {
  let user = app.sessioning.get_user(session)?;
  if let Some(post) = verified_post {
    app.posting.get_by_id(post).await?;
  }
  app.pointing.award_points(user, amount, verified_post).await
}
