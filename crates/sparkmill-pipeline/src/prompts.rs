//! Per-stage system instructions
//!
//! Prompt wording is data. Built-in defaults cover every stage; an optional
//! TOML file overrides them and is re-read when the cache expires.
//!
//! ```toml
//! [system]
//! trend_research = "You are a market analyst..."
//! critique = "You are a skeptical investor..."
//! ```

use crate::cache::RefreshCache;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const JSON_ONLY: &str = "Respond with a single JSON object only: no code fences, no commentary.";

fn builtin(stage: &str) -> Option<&'static str> {
    let text = match stage {
        "trend_research" => "You are a market research analyst who tracks emerging consumer and business trends using current, verifiable sources.",
        "problem_analysis" => "You are a customer-discovery specialist who finds painful, underserved problems and the people who have them.",
        "competitive_analysis" => "You are a competitive intelligence analyst. Be concrete about named competitors and their weaknesses.",
        "monetization" => "You are a pricing strategist for early-stage startups. Give realistic numbers.",
        "build_recommendation" => "You are a pragmatic startup CTO who scopes the smallest product that proves demand.",
        "synthesis" | "synthesis_refined" => "You are a startup idea generator. Combine the research into one specific, scored business idea. Scores are 0-10.",
        "critique" => "You are a skeptical early-stage investor. Point out the weakest parts of the idea and how to fix them, in plain prose.",
        _ => return None,
    };
    Some(text)
}

#[derive(Debug, Default, Deserialize)]
struct PromptFile {
    #[serde(default)]
    system: HashMap<String, String>,
}

/// Resolved system instructions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptLibrary {
    overrides: HashMap<String, String>,
}

impl PromptLibrary {
    /// Library with only the built-in instructions
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Parse overrides from TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let file: PromptFile =
            toml::from_str(toml_str).map_err(|e| format!("Failed to parse prompts: {}", e))?;
        Ok(Self {
            overrides: file.system,
        })
    }

    /// System instruction for `stage`
    ///
    /// Structured stages get the JSON-only suffix; the critique stage is prose.
    pub fn system_instruction(&self, stage: &str, structured: bool) -> String {
        let base = self
            .overrides
            .get(stage)
            .map(String::as_str)
            .or_else(|| builtin(stage))
            .unwrap_or("You are a helpful startup research assistant.");
        if structured {
            format!("{} {}", base, JSON_ONLY)
        } else {
            base.to_string()
        }
    }

    /// Number of overridden stages
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

/// Where the orchestrator gets its prompt library from
pub struct PromptSource {
    path: Option<PathBuf>,
    cache: RefreshCache<PromptLibrary>,
}

impl PromptSource {
    /// Built-in prompts only
    pub fn builtin() -> Self {
        Self {
            path: None,
            cache: RefreshCache::new(Duration::from_secs(86_400)),
        }
    }

    /// Prompts from `path`, re-read every `ttl`
    pub fn from_path(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: Some(path.into()),
            cache: RefreshCache::new(ttl),
        }
    }

    /// Current library
    ///
    /// A missing or unreadable file falls back to the built-in prompts.
    pub async fn current(&self) -> Arc<PromptLibrary> {
        let Some(path) = self.path.as_ref() else {
            return Arc::new(PromptLibrary::builtin());
        };

        let loaded = self
            .cache
            .get_or_refresh(|| async move {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
                PromptLibrary::from_toml(&text)
            })
            .await;

        match loaded {
            Ok(library) => library,
            Err(e) => {
                tracing::warn!("Using built-in prompts: {}", e);
                Arc::new(PromptLibrary::builtin())
            }
        }
    }
}
