//! The `check` command

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use warden_core::Permission;

/// Arguments for the check command
#[derive(Args)]
pub struct CheckArgs {
    /// Path to the policy document
    #[clap(long)]
    pub policy: PathBuf,

    /// Policy context to decide in
    #[clap(long)]
    pub context: String,

    /// Requested permission, as kind:actions:target or actions:target
    #[clap(long)]
    pub permission: String,

    /// Principal name of the requester (repeatable)
    #[clap(long = "identity")]
    pub identities: Vec<String>,

    /// Permission the requester's domain already holds (repeatable)
    #[clap(long = "grant")]
    pub grants: Vec<String>,

    /// Print the decision as JSON
    #[clap(long)]
    pub json: bool,
}

/// Implementation of the check command; returns whether the request is allowed
pub fn execute(args: &CheckArgs) -> Result<bool> {
    let permission = Permission::parse(&args.permission)
        .with_context(|| format!("Invalid --permission '{}'", args.permission))?;
    let subject = super::subject(&args.identities, &args.grants)?;

    let loaded = super::load_policy(&args.policy)?;
    let arbiter = loaded.arbiter(&args.context)?;

    let decision = arbiter
        .decide(&subject, &permission)
        .context("Policy decision failed")?;

    if args.json {
        let output = json!({
            "context": args.context,
            "permission": permission.to_string(),
            "allowed": decision.allowed,
            "outcome": decision.outcome.map(|o| o.to_string()),
            "source": format!("{:?}", decision.source),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", decision);
    }

    Ok(decision.allowed)
}
