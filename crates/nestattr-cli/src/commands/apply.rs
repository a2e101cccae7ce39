//! Apply command
//!
//! Usage: nestattr apply --existing <FILE> --payload <FILE> [--options <FILE>]
//!
//! Seeds an in-memory association from the existing file, applies the
//! payload, commits, and prints the surviving children.

use anyhow::Result;
use clap::Args;

use nestattr_core::{
    apply_directives, apply_singular_directive, association::singular_child, Association,
    AssociationReconciler, InMemoryAssociation,
};

use super::{print_json, InputArgs};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print the commit summary on stderr
    #[arg(long)]
    pub summary: bool,
}

pub fn execute(args: ApplyArgs) -> Result<()> {
    let inputs = args.input.load()?;
    let reconciler = AssociationReconciler::new(&inputs.association, &inputs.options);
    let mut association = InMemoryAssociation::from_handles(inputs.existing);

    if inputs.singular {
        let live = singular_child(&association).map(|(_, handle)| handle);
        let directive = reconciler.reconcile_singular(live.as_ref(), &inputs.payload)?;
        apply_singular_directive(&mut association, &directive)?;
    } else {
        let directives = reconciler.reconcile_collection(&association.handles(), &inputs.payload)?;
        apply_directives(&mut association, &directives)?;
    }

    let summary = association.commit();
    tracing::info!(
        association = inputs.association.as_str(),
        built = summary.built as u64,
        updated = summary.updated as u64,
        destroyed = summary.destroyed as u64,
        "committed"
    );
    if args.summary {
        eprintln!(
            "built: {}, updated: {}, destroyed: {}",
            summary.built, summary.updated, summary.destroyed
        );
    }

    print_json(&association.live_handles())
}
