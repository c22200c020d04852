//! Authenticating — username/password accounts.
//!
//! Passwords are stored as argon2 PHC strings and never leave this module;
//! every public read path returns a redacted [`UserView`].

use std::collections::HashMap;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use chrono::{DateTime, Utc};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::{Collection, Doc, DocStore, Filter, FindOptions, Patch},
};

/// Rendered in place of the username of a user that no longer exists.
pub const DELETED_USER: &str = "DELETED_USER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDoc {
  pub username:      String,
  /// Argon2 PHC string, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// A user with the credential redacted — the only shape callers ever see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
  pub id:         Uuid,
  pub username:   String,
  pub created_at: DateTime<Utc>,
}

impl From<Doc<UserDoc>> for UserView {
  fn from(doc: Doc<UserDoc>) -> Self {
    Self {
      id:         doc.id,
      username:   doc.data.username,
      created_at: doc.created_at,
    }
  }
}

pub struct Authenticating<S: DocStore> {
  users: S::Coll<UserDoc>,
}

impl<S: DocStore> Authenticating<S> {
  pub async fn new(store: &S) -> Result<Self, S::Error> {
    Ok(Self { users: store.collection::<UserDoc>("users").await? })
  }

  /// Register a new account. The username must be unused and both fields
  /// non-empty.
  pub async fn create(
    &self,
    username: &str,
    password: &str,
  ) -> Result<UserView> {
    if username.is_empty() || password.is_empty() {
      return Err(Error::Validation(
        "username and password must be non-empty".into(),
      ));
    }
    self.assert_username_unique(username).await?;

    let doc = UserDoc {
      username:      username.to_owned(),
      password_hash: hash_password(password)?,
    };
    let id = self.users.create_one(doc).await.map_err(Error::store)?;
    Ok(self.read_by_id(id).await?.into())
  }

  /// Check credentials; the error does not reveal which half was wrong.
  pub async fn authenticate(
    &self,
    username: &str,
    password: &str,
  ) -> Result<UserView> {
    let user = self
      .users
      .read_one(Filter::new().eq("username", username))
      .await
      .map_err(Error::store)?
      .ok_or_else(bad_credentials)?;
    if !verify_password(&user.data.password_hash, password) {
      return Err(bad_credentials());
    }
    Ok(user.into())
  }

  pub async fn get_users(&self) -> Result<Vec<UserView>> {
    let users = self
      .users
      .read_many(Filter::new(), FindOptions::newest_first())
      .await
      .map_err(Error::store)?;
    Ok(users.into_iter().map(UserView::from).collect())
  }

  pub async fn get_by_username(&self, username: &str) -> Result<UserView> {
    self
      .users
      .read_one(Filter::new().eq("username", username))
      .await
      .map_err(Error::store)?
      .map(UserView::from)
      .ok_or_else(|| Error::NotFound(format!("user {username:?} not found")))
  }

  pub async fn get_by_id(&self, user: Uuid) -> Result<UserView> {
    Ok(self.read_by_id(user).await?.into())
  }

  pub async fn update_username(
    &self,
    user: Uuid,
    username: &str,
  ) -> Result<()> {
    if username.is_empty() {
      return Err(Error::Validation("username must be non-empty".into()));
    }
    self.assert_username_unique(username).await?;
    let updated = self
      .users
      .partial_update_one(
        Filter::by_id(user),
        Patch::new().set("username", username),
      )
      .await
      .map_err(Error::store)?;
    if !updated {
      return Err(Error::NotFound(format!("user {user} not found")));
    }
    Ok(())
  }

  /// Replace the password; the current one must verify first.
  pub async fn update_password(
    &self,
    user: Uuid,
    current: &str,
    new: &str,
  ) -> Result<()> {
    let doc = self.read_by_id(user).await?;
    if !verify_password(&doc.data.password_hash, current) {
      return Err(Error::NotAllowed(
        "the given current password is incorrect".into(),
      ));
    }
    self
      .users
      .partial_update_one(
        Filter::by_id(user),
        Patch::new().set("password_hash", hash_password(new)?),
      )
      .await
      .map_err(Error::store)?;
    Ok(())
  }

  pub async fn delete(&self, user: Uuid) -> Result<()> {
    let deleted = self
      .users
      .delete_one(Filter::by_id(user))
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::NotFound(format!("user {user} not found")));
    }
    Ok(())
  }

  /// Usernames for the given ids, in order; ids of users that no longer
  /// exist render as [`DELETED_USER`].
  pub async fn ids_to_usernames(&self, ids: &[Uuid]) -> Result<Vec<String>> {
    let map = self.username_map(ids).await?;
    Ok(
      ids
        .iter()
        .map(|id| map.get(id).cloned().unwrap_or_else(|| DELETED_USER.into()))
        .collect(),
    )
  }

  /// Id → username for the ids that still exist. Used by response shaping.
  pub async fn username_map(
    &self,
    ids: &[Uuid],
  ) -> Result<HashMap<Uuid, String>> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let users = self
      .users
      .read_many(
        Filter::any(ids.iter().map(|id| Filter::by_id(*id))),
        FindOptions::newest_first(),
      )
      .await
      .map_err(Error::store)?;
    Ok(users.into_iter().map(|u| (u.id, u.data.username)).collect())
  }

  async fn read_by_id(&self, user: Uuid) -> Result<Doc<UserDoc>> {
    self
      .users
      .read_one(Filter::by_id(user))
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("user {user} not found")))
  }

  async fn assert_username_unique(&self, username: &str) -> Result<()> {
    let taken = self
      .users
      .read_one(Filter::new().eq("username", username))
      .await
      .map_err(Error::store)?
      .is_some();
    if taken {
      return Err(Error::Conflict(format!(
        "username {username:?} is already taken"
      )));
    }
    Ok(())
  }
}

fn bad_credentials() -> Error {
  Error::Authentication("invalid username or password".into())
}

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Validation(format!("unusable password: {e}")))
}

fn verify_password(hash: &str, password: &str) -> bool {
  PasswordHash::new(hash)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::MemStore;

  async fn authing() -> Authenticating<MemStore> {
    let store = MemStore::new();
    Authenticating::new(&store).await.unwrap()
  }

  #[tokio::test]
  async fn create_and_authenticate() {
    let a = authing().await;
    let user = a.create("alice", "hunter2").await.unwrap();
    assert_eq!(user.username, "alice");

    let authed = a.authenticate("alice", "hunter2").await.unwrap();
    assert_eq!(authed.id, user.id);
  }

  #[tokio::test]
  async fn duplicate_username_conflicts() {
    let a = authing().await;
    a.create("alice", "pw").await.unwrap();
    let err = a.create("alice", "pw2").await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
  }

  #[tokio::test]
  async fn wrong_password_fails_authentication() {
    let a = authing().await;
    a.create("alice", "pw").await.unwrap();
    let err = a.authenticate("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));

    let err = a.authenticate("nobody", "pw").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));
  }

  #[tokio::test]
  async fn update_username_rechecks_uniqueness() {
    let a = authing().await;
    let alice = a.create("alice", "pw").await.unwrap();
    a.create("bob", "pw").await.unwrap();

    let err = a.update_username(alice.id, "bob").await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    a.update_username(alice.id, "alice2").await.unwrap();
    assert_eq!(a.get_by_id(alice.id).await.unwrap().username, "alice2");
  }

  #[tokio::test]
  async fn update_password_requires_current() {
    let a = authing().await;
    let alice = a.create("alice", "old").await.unwrap();

    let err = a.update_password(alice.id, "wrong", "new").await.unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)));

    a.update_password(alice.id, "old", "new").await.unwrap();
    a.authenticate("alice", "new").await.unwrap();
    assert!(a.authenticate("alice", "old").await.is_err());
  }

  #[tokio::test]
  async fn deleted_users_render_as_placeholder() {
    let a = authing().await;
    let alice = a.create("alice", "pw").await.unwrap();
    let bob = a.create("bob", "pw").await.unwrap();
    a.delete(bob.id).await.unwrap();

    let names = a.ids_to_usernames(&[alice.id, bob.id]).await.unwrap();
    assert_eq!(names, vec!["alice".to_string(), DELETED_USER.to_string()]);

    let err = a.get_by_id(bob.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
  }
}
