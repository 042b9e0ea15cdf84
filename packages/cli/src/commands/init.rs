use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = Config::default();
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    for (name, timings) in &config.profiles {
        println!(
            "    {} debounce {} ms, min interval {} ms",
            format!("{:<13}", name).cyan(),
            timings.debounce_ms,
            timings.min_interval_ms
        );
    }
    println!();
    println!("Next steps:");
    println!("  1. Run: classdraft serve");
    println!("  2. Try: classdraft simulate <script.json>");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();

        init(InitArgs { force: false }, cwd).unwrap();
        assert_eq!(Config::load(cwd).unwrap(), Config::default());
    }

    #[test]
    fn test_init_keeps_existing_config_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_NAME);
        fs::write(&path, r#"{ "keyframeEvery": 5 }"#).unwrap();

        init(InitArgs { force: false }, cwd).unwrap();
        assert_eq!(Config::load(cwd).unwrap().keyframe_every, 5);

        init(InitArgs { force: true }, cwd).unwrap();
        assert_eq!(Config::load(cwd).unwrap().keyframe_every, 20);
    }
}
