//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "oxbanner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(long, global = true, default_value = crate::telemetry::DEFAULT_FILTER, help = "Log filter (overridden by RUST_LOG)")]
    pub log: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "check-config", about = "Validate a cache configuration file")]
    CheckConfig(CheckConfigArgs),

    #[command(name = "simulate", about = "Drive concurrent lookups against an in-memory repository")]
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    #[arg(short, long, help = "Path to the TOML configuration file")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    #[arg(short, long, help = "Path to the TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "JSON file with banner fixtures")]
    pub fixtures: PathBuf,

    #[arg(short, long, default_value_t = 1000, help = "Total number of lookups")]
    pub requests: usize,

    #[arg(long, default_value_t = 32, help = "Maximum concurrent lookups")]
    pub concurrency: usize,

    #[arg(long, help = "Look banners up as an admin (inactive banners visible)")]
    pub admin: bool,
}

mod check_config;
mod simulate;

/// 加载配置：文件（可选）→ 环境变量覆盖 → 校验
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid cache configuration")?;
    Ok(config)
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init_tracing("oxbanner", &cli.log);

    match &cli.command {
        Commands::CheckConfig(args) => check_config::execute(args).await,
        Commands::Simulate(args) => simulate::execute(args).await,
    }
}
