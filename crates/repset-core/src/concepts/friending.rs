//! Friending — friend requests and symmetric friendships.
//!
//! A request for an ordered pair moves NoRelation → Pending → Accepted or
//! Rejected; terminal outcomes are kept as records, the pending document is
//! removed. A friendship is one document per unordered pair, so removing it
//! drops both directions in a single logical operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::{Collection, Doc, DocStore, Filter, FindOptions},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
  Pending,
  Accepted,
  Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequestDoc {
  pub from:   Uuid,
  pub to:     Uuid,
  pub status: RequestStatus,
}

/// Stored once per pair; `user_a`/`user_b` keep creation order but carry no
/// meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendshipDoc {
  pub user_a: Uuid,
  pub user_b: Uuid,
}

pub struct Friending<S: DocStore> {
  requests:    S::Coll<FriendRequestDoc>,
  friendships: S::Coll<FriendshipDoc>,
}

impl<S: DocStore> Friending<S> {
  pub async fn new(store: &S) -> Result<Self, S::Error> {
    Ok(Self {
      requests:    store.collection::<FriendRequestDoc>("friend_requests").await?,
      friendships: store.collection::<FriendshipDoc>("friendships").await?,
    })
  }

  /// All requests involving the user, in either direction and any status.
  pub async fn get_requests(
    &self,
    user: Uuid,
  ) -> Result<Vec<Doc<FriendRequestDoc>>> {
    self
      .requests
      .read_many(
        Filter::any([
          Filter::new().eq("from", user),
          Filter::new().eq("to", user),
        ]),
        FindOptions::newest_first(),
      )
      .await
      .map_err(Error::store)
  }

  pub async fn send_request(&self, from: Uuid, to: Uuid) -> Result<()> {
    if from == to {
      return Err(Error::NotAllowed("cannot befriend yourself".into()));
    }
    self.assert_not_friends(from, to).await?;
    if self.has_pending(from, to).await? || self.has_pending(to, from).await? {
      return Err(Error::NotAllowed(format!(
        "a friend request between {from} and {to} is already pending"
      )));
    }
    self
      .requests
      .create_one(FriendRequestDoc {
        from,
        to,
        status: RequestStatus::Pending,
      })
      .await
      .map_err(Error::store)?;
    Ok(())
  }

  /// Requires a pending request in exactly this direction. Records the
  /// accepted outcome and creates the friendship.
  pub async fn accept_request(&self, from: Uuid, to: Uuid) -> Result<()> {
    self.remove_pending(from, to).await?;
    self
      .requests
      .create_one(FriendRequestDoc {
        from,
        to,
        status: RequestStatus::Accepted,
      })
      .await
      .map_err(Error::store)?;
    self
      .friendships
      .create_one(FriendshipDoc { user_a: from, user_b: to })
      .await
      .map_err(Error::store)?;
    Ok(())
  }

  /// Records the rejected outcome; no friendship is created.
  pub async fn reject_request(&self, from: Uuid, to: Uuid) -> Result<()> {
    self.remove_pending(from, to).await?;
    self
      .requests
      .create_one(FriendRequestDoc {
        from,
        to,
        status: RequestStatus::Rejected,
      })
      .await
      .map_err(Error::store)?;
    Ok(())
  }

  /// Withdraw a pending request without recording an outcome.
  pub async fn remove_request(&self, from: Uuid, to: Uuid) -> Result<()> {
    self.remove_pending(from, to).await
  }

  /// Delete the pair's friendship regardless of stored order.
  pub async fn remove_friend(&self, user: Uuid, friend: Uuid) -> Result<()> {
    let deleted = self
      .friendships
      .delete_one(pair_filter(user, friend))
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::NotFound(format!(
        "{user} and {friend} are not friends"
      )));
    }
    Ok(())
  }

  /// Ids of everyone the user is friends with.
  pub async fn get_friends(&self, user: Uuid) -> Result<Vec<Uuid>> {
    let friendships = self
      .friendships
      .read_many(
        Filter::any([
          Filter::new().eq("user_a", user),
          Filter::new().eq("user_b", user),
        ]),
        FindOptions::newest_first(),
      )
      .await
      .map_err(Error::store)?;
    Ok(
      friendships
        .into_iter()
        .map(|f| {
          if f.data.user_a == user { f.data.user_b } else { f.data.user_a }
        })
        .collect(),
    )
  }

  async fn assert_not_friends(&self, a: Uuid, b: Uuid) -> Result<()> {
    let friends = self
      .friendships
      .read_one(pair_filter(a, b))
      .await
      .map_err(Error::store)?
      .is_some();
    if friends {
      return Err(Error::NotAllowed(format!(
        "{a} and {b} are already friends"
      )));
    }
    Ok(())
  }

  async fn has_pending(&self, from: Uuid, to: Uuid) -> Result<bool> {
    Ok(
      self
        .requests
        .read_one(pending_filter(from, to))
        .await
        .map_err(Error::store)?
        .is_some(),
    )
  }

  async fn remove_pending(&self, from: Uuid, to: Uuid) -> Result<()> {
    let deleted = self
      .requests
      .delete_one(pending_filter(from, to))
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::NotFound(format!(
        "no pending friend request from {from} to {to}"
      )));
    }
    Ok(())
  }
}

fn pending_filter(from: Uuid, to: Uuid) -> Filter {
  Filter::new()
    .eq("from", from)
    .eq("to", to)
    .eq("status", RequestStatus::Pending)
}

fn pair_filter(a: Uuid, b: Uuid) -> Filter {
  Filter::any([
    Filter::new().eq("user_a", a).eq("user_b", b),
    Filter::new().eq("user_a", b).eq("user_b", a),
  ])
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::MemStore;

  async fn friending() -> Friending<MemStore> {
    let store = MemStore::new();
    Friending::new(&store).await.unwrap()
  }

  #[tokio::test]
  async fn request_then_accept_makes_mutual_friends() {
    let f = friending().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    f.send_request(a, b).await.unwrap();
    f.accept_request(a, b).await.unwrap();

    assert_eq!(f.get_friends(a).await.unwrap(), vec![b]);
    assert_eq!(f.get_friends(b).await.unwrap(), vec![a]);

    // No pending request survives for the pair.
    let pending: Vec<_> = f
      .get_requests(a)
      .await
      .unwrap()
      .into_iter()
      .filter(|r| r.data.status == RequestStatus::Pending)
      .collect();
    assert!(pending.is_empty());
  }

  #[tokio::test]
  async fn resending_after_acceptance_is_not_allowed() {
    let f = friending().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    f.send_request(a, b).await.unwrap();
    f.accept_request(a, b).await.unwrap();

    assert!(matches!(
      f.send_request(a, b).await.unwrap_err(),
      Error::NotAllowed(_)
    ));
    assert!(matches!(
      f.send_request(b, a).await.unwrap_err(),
      Error::NotAllowed(_)
    ));
  }

  #[tokio::test]
  async fn duplicate_pending_request_is_not_allowed_in_either_direction() {
    let f = friending().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    f.send_request(a, b).await.unwrap();
    assert!(matches!(
      f.send_request(a, b).await.unwrap_err(),
      Error::NotAllowed(_)
    ));
    assert!(matches!(
      f.send_request(b, a).await.unwrap_err(),
      Error::NotAllowed(_)
    ));
  }

  #[tokio::test]
  async fn accept_requires_the_exact_direction() {
    let f = friending().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    f.send_request(a, b).await.unwrap();
    // b sent nothing to a, so accepting (b → a) finds no request.
    assert!(matches!(
      f.accept_request(b, a).await.unwrap_err(),
      Error::NotFound(_)
    ));
  }

  #[tokio::test]
  async fn reject_creates_no_friendship() {
    let f = friending().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    f.send_request(a, b).await.unwrap();
    f.reject_request(a, b).await.unwrap();

    assert!(f.get_friends(a).await.unwrap().is_empty());
    assert!(f.get_friends(b).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn remove_friend_drops_both_directions() {
    let f = friending().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    f.send_request(a, b).await.unwrap();
    f.accept_request(a, b).await.unwrap();
    // Removal from the side that did not create the document.
    f.remove_friend(b, a).await.unwrap();

    assert!(f.get_friends(a).await.unwrap().is_empty());
    assert!(f.get_friends(b).await.unwrap().is_empty());
    assert!(matches!(
      f.remove_friend(a, b).await.unwrap_err(),
      Error::NotFound(_)
    ));
  }
}
