use serde::{Deserialize, Serialize};

/// File picked by the user and sent along with a prompt. `data` is base64.
#[derive(Serialize, Deserialize, Clone)]
pub struct Attachment {
  pub name: String,
  #[serde(rename = "mimeType")]
  pub mime_type: String,
  pub data: String,
}

/// Body of POST /api/chat. `opinion_on_response` marks a send-to request and
/// `follow_up_previous_response` carries the context for a follow-up; both
/// flows share this one endpoint.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ChatRequest {
  #[serde(rename = "selectedGems", default)]
  pub selected_gems: Vec<u16>,
  #[serde(default)]
  pub prompt: String,
  #[serde(default)]
  pub attachments: Vec<Attachment>,
  #[serde(rename = "opinionOnResponse", default)]
  pub opinion_on_response: bool,
  #[serde(rename = "followUpPreviousResponse", default)]
  pub follow_up_previous_response: Option<String>,
}

/// One member's outcome within a fan-out. Exactly one of response/error is set.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MemberResult {
  #[serde(rename = "gemId")]
  pub gem_id: u16,
  pub name: String,
  pub response: Option<String>,
  pub error: Option<String>,
}

/// Entry of GET /api/gems, in display order.
#[derive(Serialize, Deserialize, Clone)]
pub struct MemberCard {
  pub id: u16,
  pub name: String,
  #[serde(rename = "jobTitle")]
  pub job_title: String,
  pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SaveChatRequest {
  pub prompt: Option<String>,
  #[serde(rename = "selectedGems", default)]
  pub selected_gems: Vec<u16>,
  pub results: Option<Vec<MemberResult>>,
}

/// MemberResult with the job title denormalized at save time.
#[derive(Serialize, Deserialize, Clone)]
pub struct StoredResult {
  #[serde(rename = "gemId")]
  pub gem_id: u16,
  pub name: String,
  #[serde(rename = "jobTitle")]
  pub job_title: String,
  pub response: Option<String>,
  pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SavedChat {
  pub id: String,
  #[serde(rename = "createdAt")]
  pub created_at: String,
  pub prompt: String,
  #[serde(rename = "selectedGems")]
  pub selected_gems: Vec<u16>,
  pub results: Vec<StoredResult>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct ChatSummary {
  pub id: String,
  #[serde(rename = "createdAt")]
  pub created_at: String,
  pub prompt: String,
  #[serde(rename = "resultCount")]
  pub result_count: usize,
}
