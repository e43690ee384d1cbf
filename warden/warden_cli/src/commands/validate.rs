//! The `validate` command

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the validate command
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the policy document
    #[clap(long)]
    pub policy: PathBuf,
}

/// Implementation of the validate command
pub fn execute(args: &ValidateArgs) -> Result<()> {
    let loaded = super::load_policy(&args.policy)?;

    for document in &loaded.document.contexts {
        let state = loaded
            .registry
            .get(&document.id)
            .map(|context| context.state().to_string())
            .unwrap_or_else(|| "missing".to_string());

        println!(
            "{}: {} ({} excluded, {} unchecked, {} roles)",
            document.id,
            state,
            document.excluded.len(),
            document.unchecked.len(),
            document.roles.len()
        );
    }

    println!(
        "{} context(s) loaded from {}",
        loaded.registry.len(),
        args.policy.display()
    );
    Ok(())
}
