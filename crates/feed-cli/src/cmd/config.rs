use crate::context::Context;
use crate::output::print_json;
use anyhow::Context as _;
use clap::Subcommand;
use feed_core::config::{Config, WarnLevel};
use feed_core::io::write_if_missing;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration and any warnings
    Show,
    /// Write a default config file if none exists
    Init,
    /// Validate the config for common mistakes
    Validate,
}

pub fn run(ctx: &Context, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx, json),
        ConfigSubcommand::Init => init(ctx, json),
        ConfigSubcommand::Validate => validate(ctx, json),
    }
}

fn show(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let warnings = ctx.config.validate();
    if json {
        return print_json(&serde_json::json!({
            "path": ctx.config_path,
            "config": ctx.config,
            "warnings": warnings,
        }));
    }
    println!("# {}", ctx.config_path.display());
    print!("{}", serde_yaml::to_string(&ctx.config)?);
    for w in &warnings {
        println!("# [{}] {}", level(&w.level), w.message);
    }
    Ok(())
}

fn init(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let data = serde_yaml::to_string(&Config::default())?;
    let written = write_if_missing(&ctx.config_path, data.as_bytes())
        .with_context(|| format!("failed to write {}", ctx.config_path.display()))?;
    if json {
        print_json(&serde_json::json!({ "path": ctx.config_path, "written": written }))
    } else {
        if written {
            println!("Wrote {}", ctx.config_path.display());
        } else {
            println!("{} already exists", ctx.config_path.display());
        }
        Ok(())
    }
}

fn level(level: &WarnLevel) -> &'static str {
    match level {
        WarnLevel::Warning => "warning",
        WarnLevel::Error => "error",
    }
}

fn validate(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let warnings = ctx.config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            println!("[{}] {}", level(&w.level), w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
