use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
pub struct AppConfig {
  pub port: u16,
  pub public_dir: String,
  pub documents_dir: String,
  pub registry_path: String,
  pub log_path: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      port: 3000,
      public_dir: "public".to_string(),
      documents_dir: "documents".to_string(),
      registry_path: "gems.json".to_string(),
      log_path: "council.log".to_string(),
    }
  }
}

pub fn load_or_init(path: &Path) -> anyhow::Result<AppConfig> {
  if path.exists() {
    let data = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&data)?;
    Ok(config)
  } else {
    let config = AppConfig::default();
    save_config(path, &config)?;
    Ok(config)
  }
}

pub fn save_config(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(config)?;
  std::fs::write(path, json)?;
  Ok(())
}

/// The generation-API credential lives in the environment, never in the
/// config file.
pub fn api_key() -> Option<String> {
  std::env::var("GEMINI_API_KEY")
    .or_else(|_| std::env::var("GOOGLE_API_KEY"))
    .ok()
    .filter(|k| !k.trim().is_empty())
}
