use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::MemberCard;

/// One persona-configured advisor. Immutable after startup; the registry is
/// configuration data, not logic.
#[derive(Serialize, Deserialize, Clone)]
pub struct Member {
  pub id: u16,
  pub name: String,
  #[serde(rename = "jobTitle")]
  pub job_title: String,
  pub model: String,
  #[serde(default)]
  pub instructions: String,
  #[serde(default)]
  pub documents: Vec<String>,
  #[serde(default)]
  pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct MemberRegistry {
  pub members: Vec<Member>,
}

/// Cards are listed in this fixed order, independent of registry order.
const DISPLAY_ORDER: [u16; 5] = [2, 5, 1, 4, 3];

/// Project phase -> members the user may select. Each phase is a superset of
/// the one before it.
pub fn allowed_member_ids(phase: u8) -> &'static [u16] {
  match phase {
    1 => &[2],
    2 => &[2, 5, 1],
    3 => &[2, 5, 1, 4],
    _ => &[2, 5, 1, 4, 3],
  }
}

impl MemberRegistry {
  pub fn get(&self, id: u16) -> Option<&Member> {
    self.members.iter().find(|m| m.id == id)
  }

  /// Registered members matching the requested ids, in registry order.
  /// Unknown ids are dropped, not errored.
  pub fn resolve(&self, ids: &[u16]) -> Vec<&Member> {
    self.members.iter().filter(|m| ids.contains(&m.id)).collect()
  }

  /// Job title by member name, falling back to the name itself.
  pub fn job_title_for(&self, name: &str) -> String {
    self
      .members
      .iter()
      .find(|m| m.name == name)
      .map(|m| m.job_title.clone())
      .unwrap_or_else(|| name.to_string())
  }

  pub fn cards(&self) -> Vec<MemberCard> {
    DISPLAY_ORDER
      .iter()
      .filter_map(|id| self.get(*id))
      .map(|m| MemberCard {
        id: m.id,
        name: m.name.clone(),
        job_title: m.job_title.clone(),
        image: m.image.clone(),
      })
      .collect()
  }
}

const COUNCIL_BRIEF: &str = "You are a member of the AI Council for Project: Our Golden Record. \
The mission is to represent a 21st-century community to extraterrestrial life. Advise the project \
team as they work through the phases of this PBL project, using the assessment criteria: Research, \
Argumentation, Technical Design, and Collaboration. The 80/20 rule: 80% of your responses must be \
questions or prompts for deeper thought; only 20% may provide technical definitions or project \
context. The team members are middle-school students; use age and grade-level appropriate language.";

const DEFAULT_DOCUMENTS: [&str; 7] = [
  "ADA-Compliant-Math-Standards.pdf",
  "AllDCI.pdf",
  "Dorchester Coastal Resilience Project Brief 2025.docx",
  "ELA_Standards1.pdf",
  "Project Brief_Our Golden Record Draft 1.pdf",
  "saavedra-rapaport-2024-key-lessons-from-research-about-project-based-teaching-and-learning.pdf",
  "ss-framework-k-12-intro.pdf",
];

fn member(id: u16, name: &str, job_title: &str, persona: &str, image: &str) -> Member {
  Member {
    id,
    name: name.to_string(),
    job_title: job_title.to_string(),
    model: "gemini-2.5-flash".to_string(),
    instructions: format!("{COUNCIL_BRIEF} {persona}"),
    documents: DEFAULT_DOCUMENTS.iter().map(|d| d.to_string()).collect(),
    image: Some(image.to_string()),
  }
}

impl Default for MemberRegistry {
  fn default() -> Self {
    Self {
      members: vec![
        member(
          1,
          "Henrietta",
          "Scientific Historian",
          "Job Title: Scientific Historian. Provide nonfiction insight into how digital media \
           survives the cosmic environment and the history of interstellar spacecraft. Challenge \
           students to think about which digital file formats remain readable for 40,000 years \
           and how that shapes their media choices.",
          "henrietta.jpg",
        ),
        member(
          2,
          "Jane",
          "Cultural Ethnographer",
          "Job Title: Cultural Ethnographer. Help students define the boundaries of their \
           community, move beyond stereotypes, and ask whose story is not being told in their \
           artifact selection. Center community voice and design for equity.",
          "jane.jpg",
        ),
        member(
          3,
          "Laika",
          "Launch Visionary",
          "Job Title: Launch Visionary. Facilitate the reflecting phase: help students \
           synthesize their research into a persuasive final presentation for the Launch \
           Committee, using higher-order questions about their own learning process.",
          "Laika.jpg",
        ),
        member(
          4,
          "Wolfgang",
          "Logistics Architect",
          "Job Title: Data Budget Architect. Support mathematical modeling for the Data Budget \
           Audit milestone: ratios and proportional reasoning against the 512 GB storage limit, \
           such as how much space a 4K video occupies compared to a high-fidelity audio track.",
          "wolfgang.jpg",
        ),
        member(
          5,
          "Carl",
          "Interstellar Linguist",
          "Job Title: Interstellar Linguist. Critique how students use digital media to convey \
           complex human concepts to a non-human audience: with no shared language, how do these \
           data communicate the concept of friendship? You are wise, empathetic toward all life, \
           and devoted to peace.",
          "carl.jpg",
        ),
      ],
    }
  }
}

pub fn load_or_init(path: &Path) -> anyhow::Result<MemberRegistry> {
  if path.exists() {
    let data = std::fs::read_to_string(path)?;
    let registry: MemberRegistry = serde_json::from_str(&data)?;
    Ok(registry)
  } else {
    let registry = MemberRegistry::default();
    let json = serde_json::to_string_pretty(&registry)?;
    std::fs::write(path, json)?;
    Ok(registry)
  }
}
