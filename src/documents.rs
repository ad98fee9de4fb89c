use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use tokio::sync::Mutex;

use crate::gemini::{TextGenerator, UploadedDocumentRef};
use crate::logger::Logger;

/// The generation API accepts PDF, plain text, markdown, CSV and HTML only.
fn mime_for_extension(ext: &str) -> Option<&'static str> {
  match ext {
    "pdf" => Some("application/pdf"),
    "txt" => Some("text/plain"),
    "md" => Some("text/markdown"),
    "csv" => Some("text/csv"),
    "html" => Some("text/html"),
    _ => None,
  }
}

/// Strips parent-directory traversal so a document path can never escape the
/// documents root.
fn sanitize(relative: &str) -> PathBuf {
  Path::new(relative)
    .components()
    .filter(|c| matches!(c, Component::Normal(_)))
    .collect()
}

/// Deduplicates uploads of reference files, keyed by resolved absolute path.
/// Cached refs live for the process lifetime; the reference document set is
/// fixed and small, so there is no eviction.
pub struct DocumentCache {
  root: PathBuf,
  entries: Mutex<HashMap<PathBuf, UploadedDocumentRef>>,
}

impl DocumentCache {
  pub fn new(root: PathBuf) -> Self {
    Self {
      root,
      entries: Mutex::new(HashMap::new()),
    }
  }

  /// Ok(Some(ref)) on success, Ok(None) when the file type is unsupported
  /// (logged, never fatal), Err when the file is missing. Concurrent first
  /// uses of the same path may upload twice; the second insert wins and
  /// nothing is corrupted.
  pub async fn resolve(
    &self,
    generator: &dyn TextGenerator,
    logger: &Logger,
    relative: &str,
  ) -> anyhow::Result<Option<UploadedDocumentRef>> {
    let abs = self.root.join(sanitize(relative));

    let ext = abs
      .extension()
      .and_then(|e| e.to_str())
      .map(|e| e.to_ascii_lowercase())
      .unwrap_or_default();
    let Some(mime_type) = mime_for_extension(&ext) else {
      logger.warn(&format!(
        "Skipping unsupported file type: {relative} (.{ext} is not supported)"
      ));
      return Ok(None);
    };

    if let Some(cached) = self.entries.lock().await.get(&abs) {
      return Ok(Some(cached.clone()));
    }

    if !abs.is_file() {
      anyhow::bail!("Document not found: {relative} (resolved: {})", abs.display());
    }

    let uploaded = generator.upload_file(&abs, mime_type).await?;
    self.entries.lock().await.insert(abs, uploaded.clone());
    Ok(Some(uploaded))
  }
}
