//! The `permissions` command

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the permissions command
#[derive(Args)]
pub struct PermissionsArgs {
    /// Path to the policy document
    #[clap(long)]
    pub policy: PathBuf,

    /// Policy context to resolve in
    #[clap(long)]
    pub context: String,

    /// Principal name of the requester (repeatable)
    #[clap(long = "identity")]
    pub identities: Vec<String>,

    /// Permission the requester's domain already holds (repeatable)
    #[clap(long = "grant")]
    pub grants: Vec<String>,

    /// Print the permissions as a JSON array
    #[clap(long)]
    pub json: bool,
}

/// Implementation of the permissions command
pub fn execute(args: &PermissionsArgs) -> Result<()> {
    let subject = super::subject(&args.identities, &args.grants)?;

    let loaded = super::load_policy(&args.policy)?;
    let arbiter = loaded.arbiter(&args.context)?;

    let permissions = arbiter
        .try_permissions(&subject)
        .with_context(|| format!("Failed to resolve permissions in '{}'", args.context))?;

    if args.json {
        let list: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        for permission in &permissions {
            println!("{}", permission);
        }
    }

    Ok(())
}
