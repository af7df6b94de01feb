//! `retryreq config` – show where the config lives and what is in effect.

use anyhow::Result;
use retryreq_core::config::RetryreqConfig;
use std::path::Path;

pub async fn run_config(cfg: &RetryreqConfig, path: &Path) -> Result<()> {
    let policy = cfg.retry_policy()?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    println!(
        "# effective: max_attempts={} base_delay={:?} growth_factor={} retry_pass_markers={:?}",
        policy.max_attempts, policy.base_delay, policy.growth_factor, policy.retry_pass_markers
    );
    Ok(())
}
