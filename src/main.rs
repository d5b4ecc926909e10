use anyhow::Context;
use clap::Parser;
use histver::github::DEFAULT_API_URL;
use histver::{GitHubClient, Prober, Resolver, Table};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "histver")]
#[command(author, version, about = "Update the table of released versions and their build runtimes", long_about = None)]
struct Cli {
    /// Path to versions CSV file
    #[arg(long, default_value = "versions.csv")]
    file: PathBuf,

    /// GitHub repository to list releases from
    #[arg(long, default_value = "syncthing/syncthing")]
    repo: String,

    /// Name of the executable inside release archives
    #[arg(long, default_value = "syncthing")]
    binary: String,

    /// Tool used to read embedded build info (`<tool> version -m <binary>`)
    #[arg(long, default_value = "go")]
    build_info_tool: PathBuf,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let mut table = Table::load_path(&cli.file)
        .with_context(|| format!("Reading existing versions from {}", cli.file.display()))?;

    let client = GitHubClient::new(&cli.repo)?
        .with_base_url(&cli.api_url)
        .with_token(std::env::var("GITHUB_TOKEN").ok());
    let releases = client
        .list_releases()
        .await
        .with_context(|| format!("Listing GitHub releases for {}", cli.repo))?;
    info!("{} releases, {} already known", releases.len(), table.len());

    let prober = Prober::new(cli.binary.as_str()).with_build_info_tool(&cli.build_info_tool);
    let resolver = Resolver::new(client, &cli.binary).with_prober(prober);
    let summary = histver::sync::sync(&mut table, &releases, &resolver).await;
    info!(
        "{} added, {} failed, {} already known",
        summary.added, summary.failed, summary.known
    );

    table
        .save_path(&cli.file)
        .with_context(|| format!("Writing versions table {}", cli.file.display()))?;

    Ok(())
}
