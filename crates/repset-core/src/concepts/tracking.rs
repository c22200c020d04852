//! Tracking — per-user workout profiles.
//!
//! One profile per user holds named tasks (names are the lookup key within
//! the profile, not global ids), a goal string, and a progress history. The
//! weekly boundary is caller-driven: nothing here runs on a timer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  store::{Collection, Doc, DocStore, Filter, Patch},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Moderate,
  Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTask {
  pub name:        String,
  pub description: String,
  pub reps:        u32,
  pub sets:        Option<u32>,
  pub weight:      Option<f64>,
  #[serde(default)]
  pub completed:   bool,
  /// The user's most recent difficulty assessment, if any.
  pub difficulty:  Option<Difficulty>,
}

/// Snapshot taken whenever the weekly flags are reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
  pub recorded_at: DateTime<Utc>,
  pub completed:   u32,
  pub total:       u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingDoc {
  pub user:    Uuid,
  pub tasks:   Vec<WorkoutTask>,
  pub goal:    Option<String>,
  pub history: Vec<ProgressEntry>,
}

pub struct Tracking<S: DocStore> {
  profiles: S::Coll<TrackingDoc>,
}

impl<S: DocStore> Tracking<S> {
  pub async fn new(store: &S) -> Result<Self, S::Error> {
    Ok(Self { profiles: store.collection::<TrackingDoc>("tracking").await? })
  }

  /// One profile per user.
  pub async fn create_profile(&self, user: Uuid) -> Result<Doc<TrackingDoc>> {
    let existing = self
      .profiles
      .read_one(user_filter(user))
      .await
      .map_err(Error::store)?;
    if existing.is_some() {
      return Err(Error::Conflict(format!(
        "user {user} already has a tracking profile"
      )));
    }
    self
      .profiles
      .create_one(TrackingDoc {
        user,
        tasks: Vec::new(),
        goal: None,
        history: Vec::new(),
      })
      .await
      .map_err(Error::store)?;
    self.profile(user).await
  }

  pub async fn get_tasks(&self, user: Uuid) -> Result<Vec<WorkoutTask>> {
    Ok(self.profile(user).await?.data.tasks)
  }

  /// Task names are unique within the profile.
  pub async fn create_task(
    &self,
    user: Uuid,
    name: String,
    description: String,
    reps: u32,
    sets: Option<u32>,
    weight: Option<f64>,
  ) -> Result<()> {
    if name.is_empty() {
      return Err(Error::Validation("task name must be non-empty".into()));
    }
    let profile = self.profile(user).await?;
    if profile.data.tasks.iter().any(|t| t.name == name) {
      return Err(Error::Conflict(format!("task {name:?} already exists")));
    }
    let task = WorkoutTask {
      name,
      description,
      reps,
      sets,
      weight,
      completed: false,
      difficulty: None,
    };
    self
      .profiles
      .push_one(
        user_filter(user),
        "tasks",
        serde_json::to_value(&task).map_err(Error::store)?,
      )
      .await
      .map_err(Error::store)?;
    Ok(())
  }

  /// Apply only the provided fields to the named task.
  pub async fn update_task(
    &self,
    user: Uuid,
    name: &str,
    reps: Option<u32>,
    sets: Option<u32>,
    weight: Option<f64>,
    difficulty: Option<Difficulty>,
  ) -> Result<WorkoutTask> {
    let mut profile = self.profile(user).await?;
    let task = find_task_mut(&mut profile.data.tasks, name)?;
    if let Some(reps) = reps {
      task.reps = reps;
    }
    if let Some(sets) = sets {
      task.sets = Some(sets);
    }
    if let Some(weight) = weight {
      task.weight = Some(weight);
    }
    if let Some(difficulty) = difficulty {
      task.difficulty = Some(difficulty);
    }
    let updated = task.clone();
    self.write_tasks(user, &profile.data.tasks).await?;
    Ok(updated)
  }

  pub async fn delete_task(&self, user: Uuid, name: &str) -> Result<()> {
    let profile = self.profile(user).await?;
    find_task(&profile.data.tasks, name)?;
    self
      .profiles
      .pull_one(
        user_filter(user),
        "tasks",
        "name",
        serde_json::Value::String(name.to_owned()),
      )
      .await
      .map_err(Error::store)?;
    Ok(())
  }

  /// Toggle the completion flag; resolves to the new state.
  pub async fn set_completed(&self, user: Uuid, name: &str) -> Result<bool> {
    let mut profile = self.profile(user).await?;
    let task = find_task_mut(&mut profile.data.tasks, name)?;
    task.completed = !task.completed;
    let completed = task.completed;
    self.write_tasks(user, &profile.data.tasks).await?;
    Ok(completed)
  }

  pub async fn is_completed(&self, user: Uuid, name: &str) -> Result<bool> {
    let profile = self.profile(user).await?;
    Ok(find_task(&profile.data.tasks, name)?.completed)
  }

  /// Clear every completion flag and append a history snapshot of the week
  /// that just ended.
  pub async fn reset_weekly_tasks(&self, user: Uuid) -> Result<()> {
    let mut profile = self.profile(user).await?;
    let total = profile.data.tasks.len() as u32;
    let completed =
      profile.data.tasks.iter().filter(|t| t.completed).count() as u32;
    for task in &mut profile.data.tasks {
      task.completed = false;
    }
    let mut history = profile.data.history;
    history.push(ProgressEntry { recorded_at: Utc::now(), completed, total });
    self
      .profiles
      .partial_update_one(
        user_filter(user),
        Patch::new()
          .set("tasks", &profile.data.tasks)
          .set("history", &history),
      )
      .await
      .map_err(Error::store)?;
    Ok(())
  }

  /// Percentage of current tasks completed; 0.0 when the profile has no
  /// tasks.
  pub async fn get_completed_percentage(&self, user: Uuid) -> Result<f64> {
    let tasks = self.profile(user).await?.data.tasks;
    if tasks.is_empty() {
      return Ok(0.0);
    }
    let completed = tasks.iter().filter(|t| t.completed).count();
    Ok(completed as f64 / tasks.len() as f64 * 100.0)
  }

  pub async fn set_goal(&self, user: Uuid, goal: String) -> Result<()> {
    let matched = self
      .profiles
      .partial_update_one(user_filter(user), Patch::new().set("goal", goal))
      .await
      .map_err(Error::store)?;
    if !matched {
      return Err(no_profile(user));
    }
    Ok(())
  }

  pub async fn get_goal(&self, user: Uuid) -> Result<Option<String>> {
    Ok(self.profile(user).await?.data.goal)
  }

  pub async fn get_progress_history(
    &self,
    user: Uuid,
  ) -> Result<Vec<ProgressEntry>> {
    Ok(self.profile(user).await?.data.history)
  }

  /// Compare a caller-supplied difficulty assessment with the stored one and
  /// suggest an adjusted task, or nothing.
  ///
  /// An unchanged assessment suggests nothing. Otherwise the new assessment
  /// is recorded, and `Easy` yields a harder variant, `Hard` an easier one,
  /// `Moderate` no change. The suggestion itself is not persisted — the
  /// caller applies it via `update_task` if the user accepts.
  pub async fn prompt_change(
    &self,
    user: Uuid,
    name: &str,
    current: Difficulty,
  ) -> Result<Option<WorkoutTask>> {
    let mut profile = self.profile(user).await?;
    let task = find_task_mut(&mut profile.data.tasks, name)?;
    if task.difficulty == Some(current) {
      return Ok(None);
    }
    task.difficulty = Some(current);
    let assessed = task.clone();
    self.write_tasks(user, &profile.data.tasks).await?;

    Ok(match current {
      Difficulty::Easy => Some(harder(assessed)),
      Difficulty::Hard => Some(easier(assessed)),
      Difficulty::Moderate => None,
    })
  }

  async fn profile(&self, user: Uuid) -> Result<Doc<TrackingDoc>> {
    self
      .profiles
      .read_one(user_filter(user))
      .await
      .map_err(Error::store)?
      .ok_or_else(|| no_profile(user))
  }

  async fn write_tasks(&self, user: Uuid, tasks: &[WorkoutTask]) -> Result<()> {
    let matched = self
      .profiles
      .partial_update_one(user_filter(user), Patch::new().set("tasks", tasks))
      .await
      .map_err(Error::store)?;
    if !matched {
      return Err(no_profile(user));
    }
    Ok(())
  }
}

fn user_filter(user: Uuid) -> Filter {
  Filter::new().eq("user", user)
}

fn no_profile(user: Uuid) -> Error {
  Error::NotFound(format!("no tracking profile for user {user}"))
}

fn find_task<'a>(tasks: &'a [WorkoutTask], name: &str) -> Result<&'a WorkoutTask> {
  tasks
    .iter()
    .find(|t| t.name == name)
    .ok_or_else(|| Error::NotFound(format!("task {name:?} not found")))
}

fn find_task_mut<'a>(
  tasks: &'a mut [WorkoutTask],
  name: &str,
) -> Result<&'a mut WorkoutTask> {
  tasks
    .iter_mut()
    .find(|t| t.name == name)
    .ok_or_else(|| Error::NotFound(format!("task {name:?} not found")))
}

fn harder(mut task: WorkoutTask) -> WorkoutTask {
  task.reps += 2;
  task.weight = task.weight.map(|w| w + 5.0);
  task
}

fn easier(mut task: WorkoutTask) -> WorkoutTask {
  task.reps = task.reps.saturating_sub(2).max(1);
  task.weight = task.weight.map(|w| (w - 5.0).max(0.0));
  task
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::MemStore;

  async fn tracking() -> (Tracking<MemStore>, Uuid) {
    let store = MemStore::new();
    let t = Tracking::new(&store).await.unwrap();
    let user = Uuid::new_v4();
    t.create_profile(user).await.unwrap();
    (t, user)
  }

  #[tokio::test]
  async fn one_profile_per_user() {
    let (t, user) = tracking().await;
    let err = t.create_profile(user).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
  }

  #[tokio::test]
  async fn task_names_are_unique_within_a_profile() {
    let (t, user) = tracking().await;
    t.create_task(user, "squat".into(), "barbell".into(), 5, Some(5), None)
      .await
      .unwrap();
    let err = t
      .create_task(user, "squat".into(), "again".into(), 3, None, None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
  }

  #[tokio::test]
  async fn percentage_is_zero_without_tasks() {
    let (t, user) = tracking().await;
    assert_eq!(t.get_completed_percentage(user).await.unwrap(), 0.0);
  }

  #[tokio::test]
  async fn completion_toggles_and_feeds_the_percentage() {
    let (t, user) = tracking().await;
    t.create_task(user, "squat".into(), String::new(), 5, None, None)
      .await
      .unwrap();
    t.create_task(user, "bench".into(), String::new(), 5, None, None)
      .await
      .unwrap();

    assert!(t.set_completed(user, "squat").await.unwrap());
    assert!(t.is_completed(user, "squat").await.unwrap());
    assert_eq!(t.get_completed_percentage(user).await.unwrap(), 50.0);

    // Toggling again clears the flag.
    assert!(!t.set_completed(user, "squat").await.unwrap());
    assert_eq!(t.get_completed_percentage(user).await.unwrap(), 0.0);
  }

  #[tokio::test]
  async fn weekly_reset_clears_flags_and_records_history() {
    let (t, user) = tracking().await;
    t.create_task(user, "squat".into(), String::new(), 5, None, None)
      .await
      .unwrap();
    t.create_task(user, "bench".into(), String::new(), 5, None, None)
      .await
      .unwrap();
    t.set_completed(user, "squat").await.unwrap();

    t.reset_weekly_tasks(user).await.unwrap();

    assert_eq!(t.get_completed_percentage(user).await.unwrap(), 0.0);
    let history = t.get_progress_history(user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].completed, 1);
    assert_eq!(history[0].total, 2);
  }

  #[tokio::test]
  async fn update_task_applies_only_provided_fields() {
    let (t, user) = tracking().await;
    t.create_task(user, "squat".into(), "desc".into(), 5, Some(3), Some(60.0))
      .await
      .unwrap();

    let updated = t
      .update_task(user, "squat", Some(8), None, None, None)
      .await
      .unwrap();
    assert_eq!(updated.reps, 8);
    assert_eq!(updated.sets, Some(3));
    assert_eq!(updated.weight, Some(60.0));
  }

  #[tokio::test]
  async fn prompt_change_suggests_by_assessment() {
    let (t, user) = tracking().await;
    t.create_task(user, "squat".into(), String::new(), 5, None, Some(60.0))
      .await
      .unwrap();

    // Easy: suggest a harder variant.
    let suggestion =
      t.prompt_change(user, "squat", Difficulty::Easy).await.unwrap().unwrap();
    assert_eq!(suggestion.reps, 7);
    assert_eq!(suggestion.weight, Some(65.0));

    // Same assessment again: nothing new to suggest.
    assert!(
      t.prompt_change(user, "squat", Difficulty::Easy).await.unwrap().is_none()
    );

    // Hard: suggest an easier variant.
    let suggestion =
      t.prompt_change(user, "squat", Difficulty::Hard).await.unwrap().unwrap();
    assert_eq!(suggestion.reps, 3);
    assert_eq!(suggestion.weight, Some(55.0));

    // Moderate: recorded, but no suggestion.
    assert!(
      t.prompt_change(user, "squat", Difficulty::Moderate)
        .await
        .unwrap()
        .is_none()
    );
  }

  #[tokio::test]
  async fn delete_task_requires_existence() {
    let (t, user) = tracking().await;
    let err = t.delete_task(user, "ghost").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    t.create_task(user, "squat".into(), String::new(), 5, None, None)
      .await
      .unwrap();
    t.delete_task(user, "squat").await.unwrap();
    assert!(t.get_tasks(user).await.unwrap().is_empty());
  }
}
