use clap::{Parser, Subcommand};
use url::Url;

/// Terminal client for the go ladder server
#[derive(Parser, Debug, Clone)]
#[command(name = "ladder-client", version, about)]
pub struct Config {
    /// Ladder API base URL
    #[arg(
        long,
        env = "LADDER_API_URL",
        default_value = "http://localhost:5000",
        global = true
    )]
    pub base_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show recorded game results
    Results {
        /// Fetch results from this URL instead of <base-url>/result
        #[arg(long, env = "LADDER_RESULTS_URL")]
        url: Option<String>,
    },

    /// Show the ladder standings
    Standings,

    /// List players, or show one player
    Players {
        #[arg(long)]
        id: Option<String>,
    },

    /// Change fields of an existing player and store the full record
    UpdatePlayer {
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: Option<String>,

        /// Go rank: negative for kyu, zero or above for dan
        #[arg(long, allow_hyphen_values = true)]
        rank: Option<f64>,

        #[arg(long)]
        aga_id: Option<i64>,
    },

    /// Record a game result
    AddResult {
        #[arg(long)]
        black: String,

        #[arg(long)]
        white: String,

        /// White won the game
        #[arg(long, default_value = "false")]
        white_won: bool,
    },
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        check_http_url("base_url", &self.base_url)?;
        if let Command::Results { url: Some(url) } = &self.command {
            check_http_url("results url", url)?;
        }
        if let Command::UpdatePlayer {
            name: None,
            rank: None,
            aga_id: None,
            ..
        } = &self.command
        {
            anyhow::bail!("update-player needs at least one of --name, --rank or --aga-id");
        }
        Ok(())
    }
}

fn check_http_url(what: &str, value: &str) -> anyhow::Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| anyhow::anyhow!("{} '{}' is not a URL: {}", what, value, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("{} must be http or https, got '{}'", what, url.scheme());
    }
    Ok(url)
}
