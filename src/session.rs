//! Client-side session controller: member selection, phase gating, prompt and
//! attachment composition, request lifecycle, send-to / follow-up sub-flows,
//! and saved-chat restore. Pure state logic; rendering lives in `animate`.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;

use crate::models::{
  Attachment, ChatRequest, ChatSummary, MemberCard, MemberResult, SaveChatRequest, SavedChat,
  StoredResult,
};
use crate::registry::allowed_member_ids;

pub const THINKING_PHRASES: [&str; 6] = [
  "Council members are thinking…",
  "Consulting the documents…",
  "Organizing their thoughts…",
  "Discussing your question…",
  "Preparing their responses…",
  "Considering different perspectives…",
];

pub const THINKING_INTERVAL_MS: u64 = 2200;

pub fn thinking_phrase(index: usize) -> &'static str {
  THINKING_PHRASES[index % THINKING_PHRASES.len()]
}

/// Rotates the thinking phrases into `sink` until cancelled. The caller
/// cancels the token when the request settles, so no ticker leaks across
/// requests.
pub async fn run_thinking_ticker<F>(cancel: CancellationToken, mut sink: F)
where
  F: FnMut(&'static str),
{
  let mut index = 0usize;
  loop {
    sink(thinking_phrase(index));
    index += 1;
    tokio::select! {
      _ = cancel.cancelled() => return,
      _ = tokio::time::sleep(Duration::from_millis(THINKING_INTERVAL_MS)) => {}
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
  Idle,
  Info(String),
  Success(String),
  Error(String),
}

pub struct SessionController {
  members: Vec<MemberCard>,
  phase: u8,
  selected: BTreeSet<u16>,
  prompt: String,
  attachments: Vec<Attachment>,
  last_prompt: String,
  last_selected: Vec<u16>,
  last_results: Vec<StoredResult>,
  thoughts: HashMap<u16, Vec<StoredResult>>,
  follow_ups: HashMap<u16, Vec<StoredResult>>,
  in_flight: bool,
  results_visible: bool,
  status: Status,
}

impl SessionController {
  pub fn new(members: Vec<MemberCard>) -> Self {
    Self {
      members,
      phase: 4,
      selected: BTreeSet::new(),
      prompt: String::new(),
      attachments: Vec::new(),
      last_prompt: String::new(),
      last_selected: Vec::new(),
      last_results: Vec::new(),
      thoughts: HashMap::new(),
      follow_ups: HashMap::new(),
      in_flight: false,
      results_visible: false,
      status: Status::Idle,
    }
  }

  pub fn phase(&self) -> u8 {
    self.phase
  }

  /// Changing phase immediately deselects members the new phase disallows.
  pub fn set_phase(&mut self, phase: u8) {
    self.phase = phase;
    let allowed = allowed_member_ids(phase);
    self.selected.retain(|id| allowed.contains(id));
  }

  /// Disallowed members render as non-interactive, unfocusable cards.
  pub fn member_enabled(&self, id: u16) -> bool {
    allowed_member_ids(self.phase).contains(&id) && self.members.iter().any(|m| m.id == id)
  }

  /// Returns whether the member is selected afterwards. Clicks on disabled
  /// cards are ignored.
  pub fn toggle_member(&mut self, id: u16) -> bool {
    if !self.member_enabled(id) {
      return false;
    }
    if !self.selected.remove(&id) {
      self.selected.insert(id);
    }
    self.selected.contains(&id)
  }

  pub fn selected_ids(&self) -> Vec<u16> {
    self.selected.iter().copied().collect()
  }

  pub fn set_prompt(&mut self, prompt: &str) {
    self.prompt = prompt.to_string();
  }

  pub fn status(&self) -> &Status {
    &self.status
  }

  pub fn results_visible(&self) -> bool {
    self.results_visible
  }

  pub fn last_results(&self) -> &[StoredResult] {
    &self.last_results
  }

  pub fn thoughts_for(&self, gem_id: u16) -> &[StoredResult] {
    self.thoughts.get(&gem_id).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn follow_ups_for(&self, gem_id: u16) -> &[StoredResult] {
    self.follow_ups.get(&gem_id).map(Vec::as_slice).unwrap_or(&[])
  }

  /// A picked file is accepted by declared media type (image/*, text/*,
  /// application/pdf) or by filename extension (.pdf, .txt, .md); anything
  /// failing both checks is silently excluded.
  pub fn accepts_file(name: &str, mime_type: &str) -> bool {
    if mime_type.starts_with("image/")
      || mime_type.starts_with("text/")
      || mime_type == "application/pdf"
    {
      return true;
    }
    let lower = name.to_lowercase();
    lower.ends_with(".pdf") || lower.ends_with(".txt") || lower.ends_with(".md")
  }

  pub fn add_attachment(&mut self, name: &str, mime_type: &str, bytes: &[u8]) -> bool {
    if !Self::accepts_file(name, mime_type) {
      return false;
    }
    self.attachments.push(Attachment {
      name: name.to_string(),
      mime_type: mime_type.to_string(),
      data: BASE64.encode(bytes),
    });
    true
  }

  pub fn remove_attachment(&mut self, index: usize) {
    if index < self.attachments.len() {
      self.attachments.remove(index);
    }
  }

  pub fn attachments(&self) -> &[Attachment] {
    &self.attachments
  }

  /// Submit is enabled only with at least one member selected and either a
  /// non-blank prompt or a pending attachment.
  pub fn can_submit(&self) -> bool {
    !self.in_flight
      && !self.selected.is_empty()
      && (!self.prompt.trim().is_empty() || !self.attachments.is_empty())
  }

  /// Starts the council-wide request: clears status, hides prior results and
  /// hands back the request to send. Returns None when gating fails.
  pub fn begin_submit(&mut self) -> Option<ChatRequest> {
    if !self.can_submit() {
      return None;
    }
    self.in_flight = true;
    self.status = Status::Idle;
    self.results_visible = false;
    Some(ChatRequest {
      selected_gems: self.selected_ids(),
      prompt: self.prompt.trim().to_string(),
      attachments: self.attachments.clone(),
      ..Default::default()
    })
  }

  pub fn complete_submit(&mut self, results: Vec<MemberResult>) {
    self.last_prompt = self.prompt.trim().to_string();
    self.last_selected = self.selected_ids();
    self.last_results = self.with_job_titles(results);
    self.thoughts.clear();
    self.follow_ups.clear();
    // Pending attachments are consumed by a successful submission.
    self.attachments.clear();
    self.results_visible = true;
    self.status = Status::Success(format!("Done. {} response(s).", self.last_results.len()));
    self.in_flight = false;
  }

  /// Failure leaves the prior results state untouched.
  pub fn fail_request(&mut self, message: Option<&str>) {
    self.status = Status::Error(message.unwrap_or("Request failed").to_string());
    self.in_flight = false;
  }

  /// Builds a request forwarding `source`'s response to one or more *other*
  /// members for comment.
  pub fn build_send_to(&mut self, source_gem_id: u16, targets: &[u16]) -> Option<ChatRequest> {
    let response = self
      .last_results
      .iter()
      .find(|r| r.gem_id == source_gem_id)
      .and_then(|r| r.response.clone())?;
    let targets: Vec<u16> = targets
      .iter()
      .copied()
      .filter(|id| *id != source_gem_id && self.members.iter().any(|m| m.id == *id))
      .collect();
    if targets.is_empty() {
      return None;
    }
    self.in_flight = true;
    self.status = Status::Idle;
    Some(ChatRequest {
      selected_gems: targets,
      prompt: response,
      opinion_on_response: true,
      ..Default::default()
    })
  }

  /// Merges send-to results into the source member's card as a "thoughts from
  /// others" sub-list; the original result set stays intact.
  pub fn complete_send_to(&mut self, source_gem_id: u16, results: Vec<MemberResult>) {
    let count = results.len();
    self.thoughts.insert(source_gem_id, self.with_job_titles(results));
    self.status = Status::Success(format!("Got {count} response(s) from others."));
    self.in_flight = false;
  }

  /// Builds a single-member follow-up carrying that member's most recent
  /// response as context.
  pub fn build_follow_up(&mut self, gem_id: u16, question: &str) -> Option<ChatRequest> {
    let question = question.trim();
    if question.is_empty() {
      return None;
    }
    let previous = self
      .follow_ups
      .get(&gem_id)
      .and_then(|list| list.last())
      .and_then(|r| r.response.clone())
      .or_else(|| {
        self
          .last_results
          .iter()
          .find(|r| r.gem_id == gem_id)
          .and_then(|r| r.response.clone())
      })?;
    self.in_flight = true;
    self.status = Status::Idle;
    Some(ChatRequest {
      selected_gems: vec![gem_id],
      prompt: question.to_string(),
      follow_up_previous_response: Some(previous),
      ..Default::default()
    })
  }

  /// Appends the follow-up response to that member's card without altering
  /// anyone else's.
  pub fn complete_follow_up(&mut self, gem_id: u16, results: Vec<MemberResult>) {
    let mut results = self.with_job_titles(results);
    if let Some(result) = results.pop() {
      self.follow_ups.entry(gem_id).or_default().push(result);
    }
    self.status = Status::Success("Follow-up received.".to_string());
    self.in_flight = false;
  }

  /// Restores a saved chat as the active session state.
  pub fn restore(&mut self, chat: &SavedChat) {
    self.prompt = chat.prompt.clone();
    self.selected = chat
      .selected_gems
      .iter()
      .copied()
      .filter(|id| self.members.iter().any(|m| m.id == *id))
      .collect();
    self.last_prompt = chat.prompt.clone();
    self.last_selected = chat.selected_gems.clone();
    self.last_results = chat.results.clone();
    self.thoughts.clear();
    self.follow_ups.clear();
    self.results_visible = true;
    self.status = Status::Info("Loaded saved chat.".to_string());
  }

  pub fn save_payload(&self) -> Option<SaveChatRequest> {
    if self.last_results.is_empty() {
      return None;
    }
    Some(SaveChatRequest {
      prompt: Some(self.last_prompt.clone()),
      selected_gems: self.last_selected.clone(),
      results: Some(
        self
          .last_results
          .iter()
          .map(|r| MemberResult {
            gem_id: r.gem_id,
            name: r.name.clone(),
            response: r.response.clone(),
            error: r.error.clone(),
          })
          .collect(),
      ),
    })
  }

  fn with_job_titles(&self, results: Vec<MemberResult>) -> Vec<StoredResult> {
    results
      .into_iter()
      .map(|r| StoredResult {
        gem_id: r.gem_id,
        job_title: self
          .members
          .iter()
          .find(|m| m.name == r.name)
          .map(|m| m.job_title.clone())
          .unwrap_or_else(|| r.name.clone()),
        name: r.name,
        response: r.response,
        error: r.error,
      })
      .collect()
  }
}

/// Display line for a saved-chat entry: local date/time plus result count.
pub fn summary_label(summary: &ChatSummary) -> String {
  let when = DateTime::parse_from_rfc3339(&summary.created_at)
    .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_else(|_| summary.created_at.clone());
  format!("{when} · {} response(s)", summary.result_count)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{Arc, Mutex};

  fn cards() -> Vec<MemberCard> {
    [
      (1, "Henrietta", "Scientific Historian"),
      (2, "Jane", "Cultural Ethnographer"),
      (3, "Laika", "Launch Visionary"),
      (4, "Wolfgang", "Logistics Architect"),
      (5, "Carl", "Interstellar Linguist"),
    ]
    .into_iter()
    .map(|(id, name, title)| MemberCard {
      id,
      name: name.to_string(),
      job_title: title.to_string(),
      image: None,
    })
    .collect()
  }

  fn result_for(gem_id: u16, name: &str, response: &str) -> MemberResult {
    MemberResult {
      gem_id,
      name: name.to_string(),
      response: Some(response.to_string()),
      error: None,
    }
  }

  fn session_with_results() -> SessionController {
    let mut session = SessionController::new(cards());
    session.toggle_member(1);
    session.toggle_member(2);
    session.set_prompt("what belongs on the record?");
    session.begin_submit().unwrap();
    session.complete_submit(vec![
      result_for(1, "Henrietta", "Formats matter."),
      result_for(2, "Jane", "Whose story is told?"),
    ]);
    session
  }

  #[test]
  fn phase_change_deselects_disallowed_members() {
    let mut session = SessionController::new(cards());
    session.toggle_member(1);
    session.toggle_member(2);
    session.toggle_member(4);
    assert_eq!(session.selected_ids(), vec![1, 2, 4]);

    session.set_phase(1);
    assert_eq!(session.selected_ids(), vec![2]);
    assert!(session.member_enabled(2));
    assert!(!session.member_enabled(1));
    assert!(!session.member_enabled(4));
  }

  #[test]
  fn disabled_cards_ignore_toggles() {
    let mut session = SessionController::new(cards());
    session.set_phase(1);
    assert!(!session.toggle_member(3));
    assert!(session.selected_ids().is_empty());
  }

  #[test]
  fn submit_needs_selection_and_prompt_or_attachment() {
    let mut session = SessionController::new(cards());
    assert!(!session.can_submit());

    session.toggle_member(2);
    assert!(!session.can_submit());

    session.set_prompt("   ");
    assert!(!session.can_submit());

    session.set_prompt("hello council");
    assert!(session.can_submit());

    session.set_prompt("");
    assert!(session.add_attachment("notes.txt", "text/plain", b"hi"));
    assert!(session.can_submit());
  }

  #[test]
  fn attachment_intake_filters_by_mime_or_extension() {
    assert!(SessionController::accepts_file("photo.jpeg", "image/jpeg"));
    assert!(SessionController::accepts_file("notes", "text/plain"));
    assert!(SessionController::accepts_file("brief.pdf", "application/pdf"));
    assert!(SessionController::accepts_file("README.MD", "application/octet-stream"));
    assert!(!SessionController::accepts_file("archive.zip", "application/zip"));
    assert!(!SessionController::accepts_file("data.bin", "application/octet-stream"));
  }

  #[test]
  fn attachment_removal_preserves_order() {
    let mut session = SessionController::new(cards());
    session.add_attachment("a.txt", "text/plain", b"a");
    session.add_attachment("b.txt", "text/plain", b"b");
    session.add_attachment("c.txt", "text/plain", b"c");
    session.remove_attachment(1);

    let names: Vec<&str> = session.attachments().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "c.txt"]);
    // out-of-range removal is a no-op
    session.remove_attachment(9);
    assert_eq!(session.attachments().len(), 2);
  }

  #[test]
  fn attachments_are_base64_encoded() {
    let mut session = SessionController::new(cards());
    session.add_attachment("a.txt", "text/plain", b"ABC");
    assert_eq!(session.attachments()[0].data, "QUJD");
  }

  #[test]
  fn submit_lifecycle_replaces_results_and_consumes_attachments() {
    let mut session = SessionController::new(cards());
    session.toggle_member(2);
    session.set_prompt("question");
    session.add_attachment("a.txt", "text/plain", b"a");

    let req = session.begin_submit().unwrap();
    assert_eq!(req.selected_gems, vec![2]);
    assert_eq!(req.attachments.len(), 1);
    assert!(!session.results_visible());
    assert!(!session.can_submit(), "gated while in flight");

    session.complete_submit(vec![result_for(2, "Jane", "An answer.")]);
    assert!(session.results_visible());
    assert!(session.attachments().is_empty());
    assert_eq!(session.last_results()[0].job_title, "Cultural Ethnographer");
    assert_eq!(session.status(), &Status::Success("Done. 1 response(s).".into()));
  }

  #[test]
  fn failure_keeps_prior_results() {
    let mut session = session_with_results();
    session.set_prompt("second question");
    session.begin_submit().unwrap();
    session.fail_request(Some("Server missing GEMINI_API_KEY."));

    assert_eq!(session.last_results().len(), 2);
    assert_eq!(
      session.status(),
      &Status::Error("Server missing GEMINI_API_KEY.".into())
    );
    assert!(session.can_submit(), "submit re-enabled after failure");
  }

  #[test]
  fn send_to_targets_other_members_with_the_response_as_prompt() {
    let mut session = session_with_results();
    let req = session.build_send_to(2, &[2, 3, 99]).unwrap();
    assert_eq!(req.selected_gems, vec![3]);
    assert_eq!(req.prompt, "Whose story is told?");
    assert!(req.opinion_on_response);
  }

  #[test]
  fn send_to_merge_keeps_original_results() {
    let mut session = session_with_results();
    session.build_send_to(2, &[3]).unwrap();
    session.complete_send_to(2, vec![result_for(3, "Laika", "A reflection.")]);

    assert_eq!(session.last_results().len(), 2);
    let thoughts = session.thoughts_for(2);
    assert_eq!(thoughts.len(), 1);
    assert_eq!(thoughts[0].job_title, "Launch Visionary");
    assert!(session.thoughts_for(1).is_empty());
  }

  #[test]
  fn send_to_requires_a_source_response() {
    let mut session = SessionController::new(cards());
    assert!(session.build_send_to(2, &[3]).is_none());
  }

  #[test]
  fn follow_up_is_single_member_and_carries_context() {
    let mut session = session_with_results();
    let req = session.build_follow_up(1, "what about audio?").unwrap();
    assert_eq!(req.selected_gems, vec![1]);
    assert_eq!(req.follow_up_previous_response.as_deref(), Some("Formats matter."));

    session.complete_follow_up(1, vec![result_for(1, "Henrietta", "Audio ages well.")]);
    assert_eq!(session.follow_ups_for(1).len(), 1);
    assert!(session.follow_ups_for(2).is_empty());

    // a second follow-up chains off the newest response
    let req = session.build_follow_up(1, "and video?").unwrap();
    assert_eq!(req.follow_up_previous_response.as_deref(), Some("Audio ages well."));
  }

  #[test]
  fn restore_makes_the_saved_chat_the_active_state() {
    let mut session = SessionController::new(cards());
    let chat = SavedChat {
      id: "7".into(),
      created_at: "2026-08-29T12:00:00+00:00".into(),
      prompt: "old question".into(),
      selected_gems: vec![2, 5, 99],
      results: vec![StoredResult {
        gem_id: 2,
        name: "Jane".into(),
        job_title: "Cultural Ethnographer".into(),
        response: Some("old answer".into()),
        error: None,
      }],
    };
    session.restore(&chat);

    assert_eq!(session.selected_ids(), vec![2, 5]);
    assert!(session.results_visible());
    assert_eq!(session.last_results().len(), 1);

    let payload = session.save_payload().unwrap();
    assert_eq!(payload.prompt.as_deref(), Some("old question"));
    assert_eq!(payload.results.unwrap().len(), 1);
  }

  #[test]
  fn summary_label_shows_count() {
    let label = summary_label(&ChatSummary {
      id: "1".into(),
      created_at: "2026-08-29T12:00:00+00:00".into(),
      prompt: "q".into(),
      result_count: 3,
    });
    assert!(label.ends_with("3 response(s)"));
  }

  #[test]
  fn thinking_phrases_cycle() {
    assert_eq!(thinking_phrase(0), THINKING_PHRASES[0]);
    assert_eq!(thinking_phrase(6), THINKING_PHRASES[0]);
    assert_eq!(thinking_phrase(7), THINKING_PHRASES[1]);
  }

  #[tokio::test(start_paused = true)]
  async fn ticker_rotates_until_cancelled() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_thinking_ticker(cancel.clone(), {
      let seen = seen.clone();
      move |phrase| seen.lock().unwrap().push(phrase)
    }));

    tokio::time::sleep(Duration::from_millis(THINKING_INTERVAL_MS * 3 + 100)).await;
    cancel.cancel();
    task.await.unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen.len() >= 4);
    assert_eq!(seen[0], THINKING_PHRASES[0]);
    assert_eq!(seen[1], THINKING_PHRASES[1]);
  }
}
