//! Sessioning — a keyed store from opaque session handles to login state.
//!
//! A session has exactly two states, LoggedOut (initial) and LoggedIn, with
//! [`start`](Sessioning::start) and [`end`](Sessioning::end) as the only
//! transitions. Entries are created on first contact and destroyed on
//! explicit logout; nothing here is persisted.

use std::{
  collections::HashMap,
  sync::{Arc, RwLock},
};

use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  LoggedOut,
  LoggedIn(Uuid),
}

/// Cloning is cheap — the session table is shared.
#[derive(Clone, Default)]
pub struct Sessioning {
  sessions: Arc<RwLock<HashMap<Uuid, SessionState>>>,
}

impl Sessioning {
  pub fn new() -> Self {
    Self::default()
  }

  /// Mint a fresh handle in the LoggedOut state.
  pub fn create(&self) -> Uuid {
    let id = Uuid::new_v4();
    self.write().insert(id, SessionState::LoggedOut);
    id
  }

  /// Register a caller-supplied handle on first contact.
  pub fn ensure(&self, session: Uuid) {
    self.write().entry(session).or_insert(SessionState::LoggedOut);
  }

  /// Transition LoggedOut → LoggedIn. An unknown handle counts as
  /// LoggedOut.
  pub fn start(&self, session: Uuid, user: Uuid) -> Result<()> {
    let mut sessions = self.write();
    if let Some(SessionState::LoggedIn(_)) = sessions.get(&session) {
      return Err(Error::NotAllowed("you must be logged out".into()));
    }
    sessions.insert(session, SessionState::LoggedIn(user));
    Ok(())
  }

  /// Transition LoggedIn → destroyed.
  pub fn end(&self, session: Uuid) -> Result<()> {
    let mut sessions = self.write();
    match sessions.get(&session) {
      Some(SessionState::LoggedIn(_)) => {
        sessions.remove(&session);
        Ok(())
      }
      _ => Err(must_be_logged_in()),
    }
  }

  pub fn get_user(&self, session: Uuid) -> Result<Uuid> {
    match self.read().get(&session) {
      Some(SessionState::LoggedIn(user)) => Ok(*user),
      _ => Err(must_be_logged_in()),
    }
  }

  /// Assertion guard used as a precondition by the orchestration layer.
  pub fn is_logged_in(&self, session: Uuid) -> Result<()> {
    self.get_user(session).map(|_| ())
  }

  /// Assertion guard used as a precondition by the orchestration layer.
  pub fn is_logged_out(&self, session: Uuid) -> Result<()> {
    match self.read().get(&session) {
      Some(SessionState::LoggedIn(_)) => {
        Err(Error::NotAllowed("you must be logged out".into()))
      }
      _ => Ok(()),
    }
  }

  fn read(
    &self,
  ) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, SessionState>> {
    self.sessions.read().unwrap_or_else(|e| e.into_inner())
  }

  fn write(
    &self,
  ) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, SessionState>> {
    self.sessions.write().unwrap_or_else(|e| e.into_inner())
  }
}

fn must_be_logged_in() -> Error {
  Error::Authentication("you must be logged in".into())
}
