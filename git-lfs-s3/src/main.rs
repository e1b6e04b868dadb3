use anyhow::{Context, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use log::info;
use std::sync::Arc;
use structopt::StructOpt;

mod config;
mod credentials;
mod error;
mod handler;
mod oracle;
mod server;
mod signer;

use config::Config;
use handler::BatchHandler;
use oracle::GithubOracle;
use signer::S3Signer;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Arc::new(Config::from_args());

    let region = RegionProviderChain::default_provider().or_else("us-east-1");
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .load()
        .await;
    let signer = S3Signer::new(&sdk_config, config.bucket.clone());
    let oracle =
        GithubOracle::new(config.github_api.clone()).context("invalid GitHub API URL")?;

    info!(
        "serving {} from bucket {}, URLs expire after {}s",
        config.repository, config.bucket, config.expires_in
    );
    let handler = Arc::new(BatchHandler::new(
        config.clone(),
        Arc::new(oracle),
        Arc::new(signer),
    ));
    server::serve(config.listen, handler, |_| {}, server::ctrl_c()).await
}
