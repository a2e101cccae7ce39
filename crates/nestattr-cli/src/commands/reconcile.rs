//! Reconcile command
//!
//! Usage: nestattr reconcile --existing <FILE> --payload <FILE> [--options <FILE>]

use anyhow::Result;
use clap::Args;

use nestattr_core::AssociationReconciler;

use super::{print_json, InputArgs};

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

/// Print the directives as a JSON array
///
/// For a one-to-one association the live child is the first entry of the
/// existing file, and the array holds exactly one directive.
pub fn execute(args: ReconcileArgs) -> Result<()> {
    let inputs = args.input.load()?;
    let reconciler = AssociationReconciler::new(&inputs.association, &inputs.options);

    let directives = if inputs.singular {
        vec![reconciler.reconcile_singular(inputs.existing.first(), &inputs.payload)?]
    } else {
        reconciler.reconcile_collection(&inputs.existing, &inputs.payload)?
    };

    print_json(&directives)
}
