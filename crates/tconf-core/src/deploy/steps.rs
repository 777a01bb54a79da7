//! Built-in deployment steps. These run on the target host itself.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::context::RunContext;
use crate::params;

use super::{DeploymentStep, FINAL_STEP_WEIGHT};

/// Directories created under the home directory.
pub const HOME_LAYOUT: [&str; 4] = ["configs", "releases", "service_logs", "share"];
pub const DEPLOYED_MARKER: &str = ".deployed";

fn home_directory(ctx: &RunContext) -> anyhow::Result<PathBuf> {
    match ctx.store().get(params::HOME_DIRECTORY) {
        Some(home) if !home.is_empty() => Ok(PathBuf::from(home)),
        _ => anyhow::bail!("No home directory is configured"),
    }
}

/// Where the host configuration is written under `home`.
pub fn host_config_path(home: &Path) -> PathBuf {
    home.join("configs").join(params::HOST_CONFIG)
}

fn create_layout(ctx: &mut RunContext) -> anyhow::Result<()> {
    let home = home_directory(ctx)?;
    for dir in HOME_LAYOUT {
        let path = home.join(dir);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    ctx.info(&format!("Created directory layout in {}", home.display()));
    Ok(())
}

fn write_host_config(ctx: &mut RunContext) -> anyhow::Result<()> {
    let path = host_config_path(&home_directory(ctx)?);
    ctx.store().store(&path)?;
    ctx.info(&format!("Wrote {}", path.display()));
    Ok(())
}

fn mark_deployed(ctx: &mut RunContext) -> anyhow::Result<()> {
    let path = home_directory(ctx)?.join(DEPLOYED_MARKER);
    let stamp = chrono::Local::now().to_rfc2822();
    std::fs::write(&path, format!("{stamp}\n"))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn builtin_steps() -> Vec<DeploymentStep> {
    vec![
        DeploymentStep::new("Create directory layout", create_layout),
        DeploymentStep::new("Write host configuration", write_host_config).with_weight(10),
        DeploymentStep::new("Record deployment", mark_deployed).with_weight(FINAL_STEP_WEIGHT),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::context::test_context;
    use crate::properties::PropertyStore;

    #[test]
    fn steps_lay_out_home_and_write_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let home = temp.path().join("tungsten");
        let mut ctx = test_context(&[]);
        ctx.store_mut()
            .set(params::HOME_DIRECTORY, home.to_str());
        ctx.store_mut().set("replication.role", Some("master"));

        for step in builtin_steps() {
            step.run(&mut ctx).unwrap();
        }

        for dir in HOME_LAYOUT {
            assert!(home.join(dir).is_dir(), "{dir} missing");
        }
        let written = PropertyStore::load(&host_config_path(&home)).unwrap();
        assert_eq!(written.get("replication.role"), Some("master"));
        assert!(home.join(DEPLOYED_MARKER).is_file());
    }

    #[test]
    fn missing_home_fails() {
        let mut ctx = test_context(&[]);
        let err = create_layout(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("No home directory"));
    }
}
