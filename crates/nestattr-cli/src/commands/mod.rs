//! Subcommands and the input files they share

pub mod apply;
pub mod reconcile;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use nestattr_core::logging_facility::{self, Profile};
use nestattr_core::{ChildHandle, PredicateSet, ReconcileError, ReconciliationOptions};

/// Flags common to every subcommand
#[derive(Debug, Args)]
pub struct InputArgs {
    /// JSON array of the current children
    #[arg(long)]
    pub existing: PathBuf,

    /// JSON nested payload (array, keyed object, or single object with --singular)
    #[arg(long)]
    pub payload: PathBuf,

    /// JSON object of reconciliation options
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Association name used in errors and logs
    #[arg(long, default_value = "items")]
    pub association: String,

    /// Treat the association as one-to-one
    #[arg(long)]
    pub singular: bool,

    /// Emit logs on stderr (dev or json)
    #[arg(long)]
    pub log: Option<String>,
}

/// Everything a subcommand needs, read and validated
pub struct Inputs {
    pub association: String,
    pub singular: bool,
    pub existing: Vec<ChildHandle>,
    pub payload: Value,
    pub options: ReconciliationOptions,
}

impl InputArgs {
    pub fn load(self) -> Result<Inputs> {
        if let Some(name) = &self.log {
            let profile = Profile::parse(name)
                .with_context(|| format!("unknown log profile `{}` (expected dev or json)", name))?;
            logging_facility::init(profile);
        }

        let existing: Vec<ChildHandle> = serde_json::from_value(read_json(&self.existing)?)
            .map_err(ReconcileError::from)
            .with_context(|| format!("invalid existing children in {}", self.existing.display()))?;

        let payload = read_json(&self.payload)?;

        // Only the built-in all_blank predicate can be named from a file.
        let options = match &self.options {
            Some(path) => {
                ReconciliationOptions::from_json(&read_json(path)?, &PredicateSet::new())?
            }
            None => ReconciliationOptions::default(),
        };

        Ok(Inputs {
            association: self.association,
            singular: self.singular,
            existing,
            payload,
            options,
        })
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .map_err(ReconcileError::from)
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Pretty JSON on stdout
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(ReconcileError::from)?;
    println!("{}", text);
    Ok(())
}
