use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::documents::DocumentCache;
use crate::error::ApiError;
use crate::gemini::{Part, TextGenerator, UploadedDocumentRef};
use crate::logger::Logger;
use crate::models::{ChatRequest, MemberResult};
use crate::registry::MemberRegistry;

const EMPTY_PROMPT_PLACEHOLDER: &str =
  "(The user sent the following files with no additional text.)";

/// Issues one independent generation request per selected member and collects
/// every outcome; one member's failure never cancels or fails the others.
pub struct Dispatcher {
  registry: Arc<MemberRegistry>,
  documents: Arc<DocumentCache>,
  generator: Option<Arc<dyn TextGenerator>>,
  logger: Arc<Logger>,
}

impl Dispatcher {
  pub fn new(
    registry: Arc<MemberRegistry>,
    documents: Arc<DocumentCache>,
    generator: Option<Arc<dyn TextGenerator>>,
    logger: Arc<Logger>,
  ) -> Self {
    Self {
      registry,
      documents,
      generator,
      logger,
    }
  }

  pub async fn dispatch(&self, req: &ChatRequest) -> Result<Vec<MemberResult>, ApiError> {
    if req.selected_gems.is_empty() {
      return Err(ApiError::Validation("Select at least one council member.".to_string()));
    }
    let prompt = req.prompt.trim();
    if prompt.is_empty() && req.attachments.is_empty() {
      return Err(ApiError::Validation(
        "Prompt or at least one attachment is required.".to_string(),
      ));
    }
    let Some(generator) = self.generator.clone() else {
      return Err(ApiError::Configuration(
        "Server missing GEMINI_API_KEY. Set it and restart.".to_string(),
      ));
    };

    let user_prompt = if prompt.is_empty() {
      EMPTY_PROMPT_PLACEHOLDER.to_string()
    } else {
      prompt.to_string()
    };
    let framed_prompt = frame_prompt(&user_prompt, req);

    let members = self.registry.resolve(&req.selected_gems);

    // Upload each distinct document once, before the fan-out, so parallel
    // members share one upload per path. A path that fails to resolve is
    // treated as absent for every member that listed it.
    let distinct_paths: BTreeSet<&str> = members
      .iter()
      .flat_map(|m| m.documents.iter().map(String::as_str))
      .collect();
    let mut uploaded: HashMap<&str, UploadedDocumentRef> = HashMap::new();
    for rel in distinct_paths {
      match self.documents.resolve(generator.as_ref(), &self.logger, rel).await {
        Ok(Some(doc)) => {
          uploaded.insert(rel, doc);
        }
        Ok(None) => {}
        Err(err) => self.logger.warn(&format!("Document upload skipped: {rel}: {err}")),
      }
    }

    let attachment_parts: Vec<Part> = req
      .attachments
      .iter()
      .filter(|a| !a.data.is_empty() && !a.mime_type.is_empty())
      .map(|a| Part::InlineData {
        mime_type: a.mime_type.clone(),
        data: a.data.clone(),
      })
      .collect();

    let mut tasks = JoinSet::new();
    for member in members {
      let mut parts = attachment_parts.clone();
      for rel in &member.documents {
        if let Some(doc) = uploaded.get(rel.as_str()) {
          parts.push(Part::FileRef {
            uri: doc.uri.clone(),
            mime_type: doc.mime_type.clone(),
          });
        }
      }
      parts.push(Part::Text(framed_prompt.clone()));

      let gem_id = member.id;
      let name = member.name.clone();
      let model = member.model.clone();
      let instructions = member.instructions.clone();
      let generator = generator.clone();

      tasks.spawn(async move {
        let instruction = (!instructions.is_empty()).then_some(instructions.as_str());
        match generator.generate(&model, instruction, &parts).await {
          Ok(text) => MemberResult {
            gem_id,
            name,
            response: Some(text),
            error: None,
          },
          Err(err) => MemberResult {
            gem_id,
            name,
            response: None,
            error: Some(err.to_string()),
          },
        }
      });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
      match joined {
        Ok(result) => results.push(result),
        Err(err) => self.logger.warn(&format!("Generation task aborted: {err}")),
      }
    }
    results.sort_by_key(|r| r.gem_id);
    Ok(results)
  }
}

fn frame_prompt(user_prompt: &str, req: &ChatRequest) -> String {
  if let Some(previous) = req
    .follow_up_previous_response
    .as_deref()
    .filter(|p| !p.trim().is_empty())
  {
    return format!(
      "You previously gave this response:\n\n{previous}\n\n\
       The team member has a follow-up question:\n{user_prompt}"
    );
  }
  if req.opinion_on_response {
    return format!(
      "Another council member shared this response with the team:\n\n{user_prompt}\n\n\
       Give the team your own thoughts on it."
    );
  }
  user_prompt.to_string()
}
