//! toolguard - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use toolguard::{
    cli::{Args, Commands},
    engine::RetryPolicy,
    logging,
    tools::{EchoTool, ToolParams, ToolRuntime},
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if args.mock {
        config.engine.mock_mode = true;
    }
    if let Some(level) = args.verbosity().log_level() {
        config.logging.level = level.to_string();
    }
    config.validate()?;
    logging::init(&config.logging);

    match &args.command {
        Commands::Run {
            tool,
            params,
            user,
            repeat,
        } => {
            let runtime = build_runtime(config).await?;
            run_tool(&runtime, tool, params, user.as_deref(), *repeat).await?;
        }
        Commands::Tools => {
            let runtime = build_runtime(config).await?;
            list_tools(&runtime);
        }
        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}

async fn build_runtime(config: Config) -> Result<ToolRuntime> {
    let mut runtime = ToolRuntime::from_config(config).await;
    runtime.register(Arc::new(EchoTool::new()))?;
    Ok(runtime)
}

async fn run_tool(
    runtime: &ToolRuntime,
    tool: &str,
    raw_params: &str,
    user: Option<&str>,
    repeat: u32,
) -> Result<()> {
    let params: ToolParams =
        serde_json::from_str(raw_params).context("--params must be a JSON object")?;

    for _ in 0..repeat.max(1) {
        let response = runtime.execute(tool, &params, user).await;
        let rendered = serde_json::to_string_pretty(&response)?;
        if response.success {
            let tag = if response.metadata.cache_hit {
                "cached".cyan()
            } else {
                "ok".green()
            };
            println!("{} {}", tag.bold(), rendered);
        } else {
            println!("{} {}", "error".red().bold(), rendered);
        }
    }

    let stats = runtime.engine().cache().stats();
    eprintln!(
        "{} backend={} hits={} misses={} writes={}",
        "cache".dimmed(),
        runtime.engine().cache().backend_name(),
        stats.hits,
        stats.misses,
        stats.writes
    );

    Ok(())
}

fn list_tools(runtime: &ToolRuntime) {
    println!("{}", "Registered tools:".bold());
    for meta in runtime.registry().metadata() {
        let cache = if meta.cache_enabled {
            "cache".green()
        } else {
            "no-cache".yellow()
        };
        println!(
            "  • {} [{}] {} limit={} cost={} retries={} max_backoff={:?}",
            meta.name.bold(),
            meta.category,
            cache,
            meta.rate_limit_type,
            meta.rate_limit_cost,
            meta.max_retries,
            RetryPolicy::from_metadata(meta).max_total_wait()
        );
        if !meta.description.is_empty() {
            println!("      {}", meta.description.dimmed());
        }
    }
}

fn show_config(config: &Config) -> Result<()> {
    println!("{}", "toolguard configuration".bold());
    if let Some(path) = Config::default_path() {
        println!("{}", format!("# default path: {}", path.display()).dimmed());
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
