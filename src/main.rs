use std::fs;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mapf_solver::config::{Cli, Config};
use mapf_solver::facade::{self, SolveRequest};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::new(&cli);
    config.validate()?;

    let request_json = fs::read_to_string(&cli.request_path)
        .with_context(|| format!("reading solve request from {}", cli.request_path))?;
    let mut request: SolveRequest =
        serde_json::from_str(&request_json).context("parsing solve request JSON")?;

    request.algorithm = config.algorithm;
    request.max_time = cli.max_time;
    request.max_expansions = Some(config.max_expansions);
    request.max_wall_ms = Some(config.max_wall_ms);
    if cli.priority_policy.is_some() {
        request.priority_policy = Some(config.priority_policy);
    }

    let response = facade::solve(&request)?;
    let output_json = serde_json::to_string_pretty(&response).context("serializing solve response")?;

    match &cli.output_path {
        Some(path) => fs::write(path, output_json).with_context(|| format!("writing response to {path}"))?,
        None => println!("{output_json}"),
    }

    Ok(())
}
