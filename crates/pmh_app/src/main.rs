mod cli;
mod config_file;
mod serve;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use pmh_engine::{
    system_clock, DataProvider, FileTokenStore, RetryingIndex, SolrIndex, Sweeper, TokenStore,
};
use pmh_logging::pmh_info;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    pmh_logging::initialize(args.log.into(), args.log_level, &args.log_file);

    let config = Arc::new(config_file::load_config(&args.config)?);
    let index = RetryingIndex::new(
        SolrIndex::new(&config.index).context("failed to set up the index client")?,
        config.index.max_attempts,
    );
    let store = Arc::new(
        FileTokenStore::open(&config.token_dir, config.token_ttl())
            .context("failed to open the token directory")?,
    );
    let sweep_store = store.clone();
    let removed = tokio::task::spawn_blocking(move || sweep_store.sweep_expired(Utc::now())).await??;
    pmh_info!("Removed {} stale token(s) from {:?}", removed, store.dir());

    let provider = DataProvider::new(config.clone(), Arc::new(index), store.clone());

    let mut stdout = tokio::io::stdout();
    if !args.requests.is_empty() {
        for query in &args.requests {
            serve::answer(&provider, query, &mut stdout).await?;
        }
        return Ok(());
    }

    let sweeper = Sweeper::spawn(store, config.sweep_interval(), system_clock());
    let stdin = BufReader::new(tokio::io::stdin());
    let answered = serve::serve_lines(&provider, stdin, &mut stdout).await;
    sweeper.stop();
    pmh_info!("Answered {} request(s) from stdin", answered?);
    Ok(())
}
