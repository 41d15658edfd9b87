//! `generate-sql`: render the seed script from existing backups.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::context::ServiceContext;
use crate::RunStatus;

#[derive(Debug, Args)]
pub struct GenerateSqlArgs {
    /// Write here instead of the configured `scriptPath`; `-` prints to stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

pub async fn execute(config_path: &Path, args: &GenerateSqlArgs) -> Result<RunStatus> {
    let ctx = ServiceContext::load(config_path)?;
    let generator = ctx.sql_generator();

    if args.output.as_deref() == Some(Path::new("-")) {
        print!("{}", generator.generate(&ctx.catalog).await);
        return Ok(RunStatus::Success);
    }

    let path = args.output.clone().unwrap_or_else(|| ctx.config.script_path());
    let bytes = generator
        .write_to(&ctx.catalog, &path)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {} bytes to {}", bytes, path.display());
    Ok(RunStatus::Success)
}
