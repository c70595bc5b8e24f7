use crate::config::ConfigLoader;
use anyhow::Result;
use clap::{Args, Subcommand};

use super::{Context, print_json};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration file paths
    Path,
}

pub fn run(ctx: &Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(ctx),
        ConfigCommands::Path => show_paths(),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.is_json() {
        return print_json(&ctx.config);
    }
    let toml_str = toml::to_string_pretty(&ctx.config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths() -> Result<()> {
    println!("User config:    {:?}", ConfigLoader::user_config_path());
    println!("Project config: {:?}", ConfigLoader::project_config_path());
    Ok(())
}
