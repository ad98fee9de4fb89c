use chrono::Utc;
use tokio::sync::Mutex;

use crate::models::{ChatSummary, MemberResult, SavedChat, StoredResult};
use crate::registry::MemberRegistry;

const MAX_CHATS: usize = 100;

/// Volatile, most-recent-first list of saved conversations. Contents are lost
/// on restart; that is an accepted limitation, not a defect.
pub struct ChatStore {
  inner: Mutex<Inner>,
}

struct Inner {
  chats: Vec<SavedChat>,
  next_id: u64,
}

impl ChatStore {
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(Inner {
        chats: Vec::new(),
        next_id: 1,
      }),
    }
  }

  /// Assigns the next sequential id (never reused), denormalizes job titles
  /// from the registry, prepends, and truncates to the newest 100 entries.
  pub async fn save(
    &self,
    registry: &MemberRegistry,
    prompt: String,
    selected_gems: Vec<u16>,
    results: Vec<MemberResult>,
  ) -> (String, String) {
    let results = results
      .into_iter()
      .map(|r| StoredResult {
        gem_id: r.gem_id,
        job_title: registry.job_title_for(&r.name),
        name: r.name,
        response: r.response,
        error: r.error,
      })
      .collect();

    let mut inner = self.inner.lock().await;
    let id = inner.next_id.to_string();
    inner.next_id += 1;
    let created_at = Utc::now().to_rfc3339();
    inner.chats.insert(
      0,
      SavedChat {
        id: id.clone(),
        created_at: created_at.clone(),
        prompt,
        selected_gems,
        results,
      },
    );
    inner.chats.truncate(MAX_CHATS);
    (id, created_at)
  }

  /// Summary fields only; full per-member responses are withheld until `get`.
  pub async fn list(&self) -> Vec<ChatSummary> {
    self
      .inner
      .lock()
      .await
      .chats
      .iter()
      .map(|c| ChatSummary {
        id: c.id.clone(),
        created_at: c.created_at.clone(),
        prompt: c.prompt.clone(),
        result_count: c.results.len(),
      })
      .collect()
  }

  pub async fn get(&self, id: &str) -> Option<SavedChat> {
    self
      .inner
      .lock()
      .await
      .chats
      .iter()
      .find(|c| c.id == id)
      .cloned()
  }
}

impl Default for ChatStore {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result_for(gem_id: u16, name: &str) -> MemberResult {
    MemberResult {
      gem_id,
      name: name.to_string(),
      response: Some("text".to_string()),
      error: None,
    }
  }

  #[tokio::test]
  async fn save_assigns_sequential_ids_and_denormalizes_titles() {
    let registry = MemberRegistry::default();
    let store = ChatStore::new();

    let (first_id, _) = store
      .save(&registry, "q1".into(), vec![5], vec![result_for(5, "Carl")])
      .await;
    let (second_id, _) = store
      .save(&registry, "q2".into(), vec![1], vec![result_for(7, "Stranger")])
      .await;
    assert_eq!(first_id, "1");
    assert_eq!(second_id, "2");

    let carl = store.get("1").await.unwrap();
    assert_eq!(carl.results[0].job_title, "Interstellar Linguist");
    let stranger = store.get("2").await.unwrap();
    assert_eq!(stranger.results[0].job_title, "Stranger");
  }

  #[tokio::test]
  async fn list_is_most_recent_first_with_summaries_only() {
    let registry = MemberRegistry::default();
    let store = ChatStore::new();
    store.save(&registry, "older".into(), vec![], vec![]).await;
    store
      .save(&registry, "newer".into(), vec![2], vec![result_for(2, "Jane")])
      .await;

    let summaries = store.list().await;
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].prompt, "newer");
    assert_eq!(summaries[0].result_count, 1);
    assert_eq!(summaries[1].prompt, "older");
  }

  #[tokio::test]
  async fn store_caps_at_one_hundred_evicting_oldest() {
    let registry = MemberRegistry::default();
    let store = ChatStore::new();
    for i in 1..=101 {
      store.save(&registry, format!("chat {i}"), vec![], vec![]).await;
    }

    let summaries = store.list().await;
    assert_eq!(summaries.len(), 100);
    assert!(store.get("1").await.is_none());
    assert_eq!(store.get("101").await.unwrap().prompt, "chat 101");
  }

  #[tokio::test]
  async fn get_unknown_id_is_none() {
    let store = ChatStore::new();
    assert!(store.get("12").await.is_none());
  }
}
