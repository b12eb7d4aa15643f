//! Config command - configuration management.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use vigil_config::{EngineSection, HarnessSection, VigilConfig};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Show the user configuration file path
    Path,

    /// Write a config file with defaults
    Init {
        /// Create project-local config (./vigil.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::Init { local } => cmd_init(ctx, local),
    }
}

/// Every section filled in, so the output shows effective values.
fn resolved(config: &VigilConfig) -> VigilConfig {
    VigilConfig {
        client: Some(config.client()),
        harness: Some(config.harness()),
        engine: Some(config.engine()),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let config = resolved(&loaded.config);

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("# Vigil Configuration\n");
    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)");
    } else {
        for path in sources {
            println!("# Loaded: {}", path.display());
        }
    }
    for key in &loaded.env_overrides {
        println!("# Overridden by {key}");
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;

    println!("Config file search order (later overrides earlier):\n");
    for source in &loaded.sources {
        let status = if source.loaded { "loaded   " } else { "not found" };
        println!("  {status} {}", source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'vigil config init' to create one.");
    } else {
        println!("{loaded_count} config file(s) loaded.");
    }
    if !loaded.env_overrides.is_empty() {
        println!("Environment overrides: {}", loaded.env_overrides.join(", "));
    }
    for warning in &loaded.warnings {
        println!("Warning: {warning}");
    }
    Ok(())
}

fn cmd_path() -> Result<()> {
    match vigil_config::user_config_path() {
        Some(path) => println!("{}", path.display()),
        None => eprintln!("Could not determine config directory"),
    }
    Ok(())
}

fn cmd_init(ctx: &Context, local: bool) -> Result<()> {
    let path = if local {
        ctx.project_dir
            .clone()
            .unwrap_or_default()
            .join("vigil.toml")
    } else {
        vigil_config::user_config_path().context("Could not determine config directory")?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    let config = VigilConfig {
        client: Some(Default::default()),
        harness: Some(HarnessSection::default()),
        engine: Some(EngineSection::default()),
    };
    vigil_config::save_config(&config, &path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}
