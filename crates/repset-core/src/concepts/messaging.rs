//! Messaging — conversations with an embedded message sequence.
//!
//! Conversation creation is an idempotent lookup-or-create keyed by the
//! participant *set*. Message append and removal go through the store's
//! atomic array primitives, so concurrent senders to the same conversation
//! cannot lose each other's writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::{Collection, Doc, DocStore, Filter, FindOptions},
};

/// A workout task embedded in a structured message. Mirrors the shape
/// Tracking uses, but Messaging owns its own copy — concepts share no types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
  pub name:        String,
  pub description: String,
  pub reps:        u32,
  pub sets:        Option<u32>,
  pub weight:      Option<f64>,
  #[serde(default)]
  pub completed:   bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
  pub id:         Uuid,
  pub sender:     Uuid,
  pub recipient:  Uuid,
  pub content:    String,
  pub task:       Option<TaskPayload>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDoc {
  /// Fixed at creation; kept sorted so set equality is plain equality.
  pub participants: Vec<Uuid>,
  pub messages:     Vec<Message>,
}

/// The distinguishable results of [`Messaging::create_conversation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "conversation", rename_all = "snake_case")]
pub enum ConversationOutcome {
  Created(Uuid),
  Existing(Uuid),
}

impl ConversationOutcome {
  pub fn id(self) -> Uuid {
    match self {
      Self::Created(id) | Self::Existing(id) => id,
    }
  }
}

pub struct Messaging<S: DocStore> {
  conversations: S::Coll<ConversationDoc>,
}

impl<S: DocStore> Messaging<S> {
  pub async fn new(store: &S) -> Result<Self, S::Error> {
    Ok(Self { conversations: store.collection::<ConversationDoc>("conversations").await? })
  }

  /// Look up a conversation for this participant set, creating it if none
  /// exists. Supplying the participants in a different order finds the same
  /// conversation.
  pub async fn create_conversation(
    &self,
    participants: Vec<Uuid>,
  ) -> Result<ConversationOutcome> {
    let participants = canonical(participants)?;
    if let Some(existing) = self.find_by_participants(&participants).await? {
      return Ok(ConversationOutcome::Existing(existing.id));
    }
    let id = self
      .conversations
      .create_one(ConversationDoc { participants, messages: Vec::new() })
      .await
      .map_err(Error::store)?;
    Ok(ConversationOutcome::Created(id))
  }

  pub async fn get_conversation(
    &self,
    id: Uuid,
    user: Uuid,
  ) -> Result<Doc<ConversationDoc>> {
    let conversation = self.read_by_id(id).await?;
    assert_participant(&conversation, user)?;
    Ok(conversation)
  }

  pub async fn get_conversations_for_user(
    &self,
    user: Uuid,
  ) -> Result<Vec<Doc<ConversationDoc>>> {
    self
      .conversations
      .read_many(
        Filter::new().contains("participants", user),
        FindOptions::newest_first(),
      )
      .await
      .map_err(Error::store)
  }

  pub async fn send_message(
    &self,
    conversation: Uuid,
    content: String,
    sender: Uuid,
    recipient: Uuid,
  ) -> Result<Uuid> {
    self.append_message(conversation, content, sender, recipient, None).await
  }

  pub async fn send_task_message(
    &self,
    conversation: Uuid,
    content: String,
    sender: Uuid,
    recipient: Uuid,
    task: TaskPayload,
  ) -> Result<Uuid> {
    self
      .append_message(conversation, content, sender, recipient, Some(task))
      .await
  }

  /// The embedded sequence, in send order.
  pub async fn get_messages(
    &self,
    conversation: Uuid,
    user: Uuid,
  ) -> Result<Vec<Message>> {
    Ok(self.get_conversation(conversation, user).await?.data.messages)
  }

  /// Only the sender may delete their own message.
  pub async fn delete_message(
    &self,
    conversation: Uuid,
    message: Uuid,
    user: Uuid,
  ) -> Result<()> {
    let doc = self.read_by_id(conversation).await?;
    assert_participant(&doc, user)?;
    let found = doc
      .data
      .messages
      .iter()
      .find(|m| m.id == message)
      .ok_or_else(|| Error::NotFound(format!("message {message} not found")))?;
    if found.sender != user {
      return Err(Error::NotAllowed(
        "only the sender can delete this message".into(),
      ));
    }
    let matched = self
      .conversations
      .pull_one(
        Filter::by_id(conversation),
        "messages",
        "id",
        serde_json::to_value(message).map_err(Error::store)?,
      )
      .await
      .map_err(Error::store)?;
    if !matched {
      return Err(Error::NotFound(format!(
        "conversation {conversation} not found"
      )));
    }
    Ok(())
  }

  async fn append_message(
    &self,
    conversation: Uuid,
    content: String,
    sender: Uuid,
    recipient: Uuid,
    task: Option<TaskPayload>,
  ) -> Result<Uuid> {
    let doc = self.read_by_id(conversation).await?;
    for role in [sender, recipient] {
      assert_participant(&doc, role)?;
    }

    let now = Utc::now();
    let message = Message {
      id: Uuid::new_v4(),
      sender,
      recipient,
      content,
      task,
      created_at: now,
      updated_at: now,
    };
    let matched = self
      .conversations
      .push_one(
        Filter::by_id(conversation),
        "messages",
        serde_json::to_value(&message).map_err(Error::store)?,
      )
      .await
      .map_err(Error::store)?;
    if !matched {
      return Err(Error::NotFound(format!(
        "conversation {conversation} not found"
      )));
    }
    Ok(message.id)
  }

  async fn read_by_id(&self, id: Uuid) -> Result<Doc<ConversationDoc>> {
    self
      .conversations
      .read_one(Filter::by_id(id))
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("conversation {id} not found")))
  }

  async fn find_by_participants(
    &self,
    participants: &[Uuid],
  ) -> Result<Option<Doc<ConversationDoc>>> {
    let candidates = self
      .conversations
      .read_many(
        Filter::new().contains("participants", participants[0]),
        FindOptions::oldest_first(),
      )
      .await
      .map_err(Error::store)?;
    Ok(candidates.into_iter().find(|c| c.data.participants == participants))
  }
}

/// Sorted, deduplicated participant set.
fn canonical(mut participants: Vec<Uuid>) -> Result<Vec<Uuid>> {
  participants.sort_unstable();
  participants.dedup();
  if participants.len() < 2 {
    return Err(Error::Validation(
      "a conversation needs at least two distinct participants".into(),
    ));
  }
  Ok(participants)
}

fn assert_participant(doc: &Doc<ConversationDoc>, user: Uuid) -> Result<()> {
  if !doc.data.participants.contains(&user) {
    return Err(Error::NotAllowed(format!(
      "{user} is not a participant in conversation {}",
      doc.id
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::MemStore;

  async fn messaging() -> Messaging<MemStore> {
    let store = MemStore::new();
    Messaging::new(&store).await.unwrap()
  }

  fn task() -> TaskPayload {
    TaskPayload {
      name:        "deadlift".into(),
      description: "5x5".into(),
      reps:        5,
      sets:        Some(5),
      weight:      Some(100.0),
      completed:   false,
    }
  }

  #[tokio::test]
  async fn conversation_creation_is_idempotent_and_order_insensitive() {
    let m = messaging().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let first = m.create_conversation(vec![a, b]).await.unwrap();
    let second = m.create_conversation(vec![b, a]).await.unwrap();

    assert!(matches!(first, ConversationOutcome::Created(_)));
    assert!(matches!(second, ConversationOutcome::Existing(_)));
    assert_eq!(first.id(), second.id());
  }

  #[tokio::test]
  async fn conversation_needs_two_distinct_participants() {
    let m = messaging().await;
    let a = Uuid::new_v4();
    let err = m.create_conversation(vec![a, a]).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn messages_append_in_order() {
    let m = messaging().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let conv = m.create_conversation(vec![a, b]).await.unwrap().id();

    m.send_message(conv, "hi".into(), a, b).await.unwrap();
    m.send_message(conv, "hey".into(), b, a).await.unwrap();
    m.send_task_message(conv, "try this".into(), a, b, task())
      .await
      .unwrap();

    let messages = m.get_messages(conv, a).await.unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].content, "hey");
    assert_eq!(messages[2].task, Some(task()));
  }

  #[tokio::test]
  async fn non_participants_cannot_send_or_read() {
    let m = messaging().await;
    let (a, b, outsider) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let conv = m.create_conversation(vec![a, b]).await.unwrap().id();

    let err =
      m.send_message(conv, "psst".into(), outsider, a).await.unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)));

    let err = m.send_message(conv, "hi".into(), a, outsider).await.unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)));

    let err = m.get_messages(conv, outsider).await.unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)));
  }

  #[tokio::test]
  async fn only_the_sender_deletes_their_message() {
    let m = messaging().await;
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let conv = m.create_conversation(vec![a, b]).await.unwrap().id();
    let msg = m.send_message(conv, "oops".into(), a, b).await.unwrap();

    let err = m.delete_message(conv, msg, b).await.unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)));

    m.delete_message(conv, msg, a).await.unwrap();
    assert!(m.get_messages(conv, a).await.unwrap().is_empty());

    let err = m.delete_message(conv, msg, a).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
  }

  #[tokio::test]
  async fn conversations_listed_per_user() {
    let m = messaging().await;
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    m.create_conversation(vec![a, b]).await.unwrap();
    m.create_conversation(vec![a, c]).await.unwrap();

    assert_eq!(m.get_conversations_for_user(a).await.unwrap().len(), 2);
    assert_eq!(m.get_conversations_for_user(b).await.unwrap().len(), 1);
  }
}
