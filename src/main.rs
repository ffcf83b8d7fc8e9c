use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use url::Url;

mod api;
mod config;
mod view;

use api::{LadderClient, MatchResult, PlayerId};
use config::{Command, Config};
use view::{render_players, LoadStatus, ResultsView};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout only carries rendered output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    // One client for the whole process, passed to whatever needs it.
    let client = LadderClient::new(&config.base_url).context("Failed to build ladder client")?;
    info!("Using ladder API at {}", client.base_url());

    match config.command {
        Command::Results { url } => show_results(client, url.as_deref()).await,
        Command::Standings => {
            let standings = client.standings().await?;
            println!("{}", standings);
            Ok(())
        }
        Command::Players { id: Some(id) } => {
            let player = client.get_player(&PlayerId::new(id)).await?;
            println!("{}", player);
            Ok(())
        }
        Command::Players { id: None } => {
            let players = client.list_players().await?;
            print!("{}", render_players(&players));
            Ok(())
        }
        Command::UpdatePlayer {
            id,
            name,
            rank,
            aga_id,
        } => {
            let mut player = client
                .get_player(&PlayerId::new(id))
                .await
                .context("Failed to fetch player before update")?;
            if let Some(name) = name {
                player.name = name;
            }
            if rank.is_some() {
                player.rank = rank;
            }
            if aga_id.is_some() {
                player.aga_id = aga_id;
            }
            let stored = client.update_player(&player).await?;
            println!("{}", stored);
            Ok(())
        }
        Command::AddResult {
            black,
            white,
            white_won,
        } => {
            let mut result = MatchResult::new(black, white);
            result.white_won = Some(white_won);
            let stored = client.create_result(&result).await?;
            println!("Recorded: black = {}, white = {}", stored.black, stored.white);
            Ok(())
        }
    }
}

async fn show_results(client: LadderClient, url: Option<&str>) -> Result<()> {
    let url = match url {
        Some(u) => Url::parse(u).context("Invalid results URL")?,
        None => client.results_url(),
    };

    let mut view = ResultsView::new(Arc::new(client), url);
    view.mount();
    view.settled().await;
    print!("{}", view.render());

    if let LoadStatus::Failed(failure) = view.snapshot().status {
        anyhow::bail!("Results unavailable from {}", failure.url);
    }
    Ok(())
}
