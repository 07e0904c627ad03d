//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use sparkmill_extractor::{ExtractionSpec, RepairEscalator, StructuredExtractor};
use std::fs;
use std::sync::Arc;

/// Execute the extract command.
///
/// Runs the offline cascade unless `--escalate` is given, in which case the
/// configured provider may be asked to repair the text.
pub async fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let raw = fs::read_to_string(&args.file)?;
    let required: Vec<String> = args
        .require
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    let spec = ExtractionSpec::new(required);

    let extractor = StructuredExtractor::new(config.pipeline.extractor.clone())?;
    let result = if args.escalate {
        let provider = config.llm.build()?;
        let escalator = RepairEscalator::new(provider, config.pipeline.repair.clone());
        extractor
            .with_repairer(Arc::new(escalator))
            .extract(&raw, &spec)
            .await
    } else {
        extractor.extract_offline(&raw, &spec)
    };

    println!("{}", formatter.format_parse_result(&result)?);
    if result.success {
        Ok(())
    } else {
        Err(CliError::InvalidInput(format!(
            "No valid JSON with the required fields in {}",
            args.file.display()
        )))
    }
}
