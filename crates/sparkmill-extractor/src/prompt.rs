//! Prompts for escalated repair

use crate::config::RepairConfig;
use crate::types::SchemaHint;
use sparkmill_domain::{GenerationRequest, SamplingConfig};

/// System instruction for both repair modes
pub const REPAIR_SYSTEM_INSTRUCTION: &str = "You convert text into strictly valid JSON. \
Respond with the JSON value only: no code fences, no commentary.";

const SYNTAX_INSTRUCTIONS: &str = "Task: repair_syntax
The text below is almost-valid JSON. Fix punctuation, quoting, brackets and
escaping only. Keep every key and value exactly as given; do not add, drop
or rename anything.";

const SCHEMA_INSTRUCTIONS: &str = "Task: repair_schema
The text below describes the content we need but is not in the right shape.
Re-express its content as a single JSON object of the target shape. Keep the
information it contains; use \"unknown\" for anything it does not mention.";

/// Which repair prompt to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairMode {
    /// Fix punctuation of almost-valid JSON
    Syntax,
    /// Re-derive prose into the target shape
    Schema,
}

impl RepairMode {
    /// Schema repair whenever a shape hint is available
    pub fn select(hint: Option<&SchemaHint>) -> Self {
        match hint {
            Some(_) => RepairMode::Schema,
            None => RepairMode::Syntax,
        }
    }
}

/// Build the repair prompt text
pub fn build_repair_prompt(
    mode: RepairMode,
    malformed: &str,
    context: Option<&str>,
    hint: Option<&SchemaHint>,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(match mode {
        RepairMode::Syntax => SYNTAX_INSTRUCTIONS,
        RepairMode::Schema => SCHEMA_INSTRUCTIONS,
    });
    prompt.push_str("\n\n");

    if let Some(context) = context {
        prompt.push_str(&format!("The text is meant to contain: {}\n\n", context));
    }

    match hint {
        Some(SchemaHint::Keys(keys)) if mode == RepairMode::Schema => {
            prompt.push_str(&format!(
                "Target shape: a JSON object with exactly these top-level keys: {}\n\n",
                keys.join(", ")
            ));
        }
        Some(SchemaHint::Example(example)) if mode == RepairMode::Schema => {
            let rendered =
                serde_json::to_string_pretty(example).unwrap_or_else(|_| example.to_string());
            prompt.push_str("Target shape, by example:\n");
            prompt.push_str(&rendered);
            prompt.push_str("\n\n");
        }
        _ => {}
    }

    prompt.push_str("Text:\n---\n");
    prompt.push_str(malformed);
    prompt.push_str("\n---\n");
    prompt
}

/// Full generation request for a repair call
pub fn repair_request(
    mode: RepairMode,
    malformed: &str,
    context: Option<&str>,
    hint: Option<&SchemaHint>,
    config: &RepairConfig,
) -> GenerationRequest {
    GenerationRequest::new(build_repair_prompt(mode, malformed, context, hint))
        .with_system_instruction(REPAIR_SYSTEM_INSTRUCTION)
        .with_sampling(SamplingConfig::fast(config.temperature, config.max_output_tokens))
}
