use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

const BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Durable remote reference to an uploaded document, usable as a content part
/// in later generation calls.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadedDocumentRef {
  pub uri: String,
  pub mime_type: String,
}

/// One element of a generation content payload. Order matters for model
/// context framing: attachments, then document references, then prompt text.
#[derive(Clone, Debug)]
pub enum Part {
  Text(String),
  InlineData { mime_type: String, data: String },
  FileRef { uri: String, mime_type: String },
}

impl Part {
  fn to_json(&self) -> Value {
    match self {
      Part::Text(text) => json!({ "text": text }),
      Part::InlineData { mime_type, data } => json!({
        "inlineData": { "mimeType": mime_type, "data": data }
      }),
      Part::FileRef { uri, mime_type } => json!({
        "fileData": { "fileUri": uri, "mimeType": mime_type }
      }),
    }
  }
}

/// The external generative API, as seen by this crate. Substituted with a
/// scripted implementation in tests.
#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn upload_file(&self, path: &Path, mime_type: &str) -> anyhow::Result<UploadedDocumentRef>;

  async fn generate(
    &self,
    model: &str,
    system_instruction: Option<&str>,
    parts: &[Part],
  ) -> anyhow::Result<String>;
}

pub struct GeminiClient {
  api_key: String,
  base_url: String,
  client: reqwest::Client,
}

impl GeminiClient {
  pub fn new(api_key: String) -> Self {
    Self {
      api_key,
      base_url: BASE_URL.to_string(),
      client: reqwest::Client::new(),
    }
  }

  fn auth_headers(&self) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert("x-goog-api-key", HeaderValue::from_str(&self.api_key)?);
    Ok(headers)
  }
}

#[async_trait]
impl TextGenerator for GeminiClient {
  async fn upload_file(&self, path: &Path, mime_type: &str) -> anyhow::Result<UploadedDocumentRef> {
    let bytes = tokio::fs::read(path).await?;
    let url = format!("{}/upload/v1beta/files", self.base_url);

    let resp = self
      .client
      .post(&url)
      .headers(self.auth_headers()?)
      .header("X-Goog-Upload-Protocol", "raw")
      .header("Content-Type", mime_type)
      .body(bytes)
      .send()
      .await?;

    if !resp.status().is_success() {
      let status = resp.status();
      let body = resp.text().await.unwrap_or_default();
      anyhow::bail!("Gemini file upload failed ({status}): {body}");
    }

    let body = resp.json::<Value>().await?;
    let file = &body["file"];
    let uri = file["uri"]
      .as_str()
      .or_else(|| file["name"].as_str())
      .ok_or_else(|| anyhow::anyhow!("Gemini file upload returned no uri"))?
      .to_string();
    let mime_type = file["mimeType"].as_str().unwrap_or(mime_type).to_string();
    Ok(UploadedDocumentRef { uri, mime_type })
  }

  async fn generate(
    &self,
    model: &str,
    system_instruction: Option<&str>,
    parts: &[Part],
  ) -> anyhow::Result<String> {
    let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

    let mut body = json!({
      "contents": [{
        "role": "user",
        "parts": parts.iter().map(Part::to_json).collect::<Vec<_>>()
      }]
    });
    if let Some(instruction) = system_instruction {
      body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }

    let resp = self
      .client
      .post(&url)
      .headers(self.auth_headers()?)
      .json(&body)
      .send()
      .await?;

    if !resp.status().is_success() {
      let status = resp.status();
      let body = resp.text().await.unwrap_or_default();
      anyhow::bail!("Gemini API error ({status}): {body}");
    }

    let body = resp.json::<Value>().await?;
    let parts = body["candidates"][0]["content"]["parts"]
      .as_array()
      .cloned()
      .unwrap_or_default();
    let text = parts
      .iter()
      .filter_map(|p| p["text"].as_str())
      .collect::<Vec<_>>()
      .join("");
    Ok(text)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parts_serialize_to_gemini_shapes() {
    let text = Part::Text("hello".into()).to_json();
    assert_eq!(text["text"], "hello");

    let inline = Part::InlineData {
      mime_type: "application/pdf".into(),
      data: "QUJD".into(),
    }
    .to_json();
    assert_eq!(inline["inlineData"]["mimeType"], "application/pdf");
    assert_eq!(inline["inlineData"]["data"], "QUJD");

    let file = Part::FileRef {
      uri: "files/abc".into(),
      mime_type: "text/plain".into(),
    }
    .to_json();
    assert_eq!(file["fileData"]["fileUri"], "files/abc");
    assert_eq!(file["fileData"]["mimeType"], "text/plain");
  }
}
