//! Sparkmill Extractor
//!
//! Coerces raw generated text into validated JSON.
//!
//! # Cascade
//!
//! ```text
//! raw text → direct → cleanup → mixed content → heuristic → escalated → fallback | failure
//! ```
//!
//! Every strategy but escalated repair is pure and synchronous. Escalated
//! repair goes through the [`Repairer`] seam; [`RepairEscalator`] implements
//! it over any [`GenerationClient`](sparkmill_domain::traits::GenerationClient).
//!
//! A result with `success == true` has always passed required-field
//! validation; `used_fallback` marks degraded successes.
//!
//! # Example Usage
//!
//! ```
//! use sparkmill_extractor::{ExtractionSpec, Strategy, StructuredExtractor};
//!
//! let extractor = StructuredExtractor::default();
//! let spec = ExtractionSpec::new(["keyMetrics.ltv"]);
//! let result = extractor.extract_offline(
//!     "Sure! Here's the JSON:\n```json\n{\"keyMetrics\": {\"ltv\": 10}}\n```",
//!     &spec,
//! );
//!
//! assert!(result.success);
//! assert_eq!(result.strategy, Some(Strategy::Cleanup));
//! ```

#![warn(missing_docs)]

pub mod cleanup;
mod config;
mod error;
mod extractor;
mod prompt;
mod repair;
mod types;
pub mod validate;


pub use config::{ExtractorConfig, RepairConfig};
pub use error::{ExtractorError, RepairError};
pub use extractor::StructuredExtractor;
pub use prompt::{RepairMode, REPAIR_SYSTEM_INSTRUCTION};
pub use repair::{RepairEscalator, Repaired, Repairer};
pub use types::{ExtractionSpec, ParseAttempt, ParseResult, SchemaHint, Strategy};
pub use validate::missing_fields;
