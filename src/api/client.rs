use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use super::error::ApiError;
use super::models::{MatchResult, Player, PlayerId, ResultsCollection, Standings};

/// Client for the ladder server's players, standings and results resources.
///
/// Build one per process and hand it to whatever needs it; it is cheap to
/// clone and shares the underlying connection pool.
#[derive(Clone)]
pub struct LadderClient {
    http: Client,
    base_url: Url,
}

impl LadderClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "URL cannot carry a path".into(),
            });
        }
        // No timeout on purpose: the transport default applies.
        let http = Client::builder()
            .user_agent(concat!("ladder-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport {
                url: base_url.to_string(),
                source: e,
            })?;
        Ok(LadderClient {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `/players`, or `/players/{id}` when an id is given.
    pub fn players_url(&self, id: Option<&PlayerId>) -> Url {
        match id {
            Some(id) => self.endpoint(&["players", id.as_str()]),
            None => self.endpoint(&["players"]),
        }
    }

    pub fn standings_url(&self) -> Url {
        self.endpoint(&["standings"])
    }

    /// The server exposes results under the singular `/result`.
    pub fn results_url(&self) -> Url {
        self.endpoint(&["result"])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new(), so path_segments_mut succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // ── Players ────────────────────────────────────────────────────────────

    pub async fn list_players(&self) -> Result<Vec<Player>, ApiError> {
        let players: Vec<Player> = self.get_json(self.players_url(None)).await?;
        info!("Fetched {} players", players.len());
        Ok(players)
    }

    pub async fn get_player(&self, id: &PlayerId) -> Result<Player, ApiError> {
        self.get_json(self.players_url(Some(id))).await
    }

    /// Store the full record at `/players/{id}`. The server takes updates
    /// as POST, not PUT or PATCH.
    pub async fn update_player(&self, player: &Player) -> Result<Player, ApiError> {
        let id = player.id.as_ref().ok_or(ApiError::MissingId)?;
        info!("Updating player {} ({})", id, player.name);
        self.send_json(Method::POST, self.players_url(Some(id)), player)
            .await
    }

    // ── Standings ──────────────────────────────────────────────────────────

    pub async fn standings(&self) -> Result<Standings, ApiError> {
        self.get_json(self.standings_url()).await
    }

    // ── Results ────────────────────────────────────────────────────────────

    pub async fn results(&self) -> Result<ResultsCollection, ApiError> {
        self.fetch_results_at(&self.results_url()).await
    }

    /// Fetch a results collection from an explicit URL, which need not live
    /// under this client's base.
    pub async fn fetch_results_at(&self, url: &Url) -> Result<ResultsCollection, ApiError> {
        self.get_json(url.clone()).await
    }

    pub async fn create_result(&self, result: &MatchResult) -> Result<MatchResult, ApiError> {
        info!("Recording result: black={}, white={}", result.black, result.white);
        self.send_json(Method::POST, self.results_url(), result)
            .await
    }

    // ── Transport helpers ──────────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!("GET {}", url);
        let req = self.http.get(url.clone());
        execute(req, url).await
    }

    async fn send_json<B, T>(&self, method: Method, url: Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("{} {}", method, url);
        let req = self.http.request(method, url.clone()).json(body);
        execute(req, url).await
    }
}

async fn execute<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
    url: Url,
) -> Result<T, ApiError> {
    let url = url.to_string();
    let resp = match req.send().await {
        Ok(r) => r,
        Err(source) => return Err(ApiError::Transport { url, source }),
    };

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status { url, status, body });
    }

    // Read the body first so a bad payload is reported as Parse, not Transport.
    let text = match resp.text().await {
        Ok(t) => t,
        Err(source) => return Err(ApiError::Transport { url, source }),
    };
    serde_json::from_str(&text).map_err(|source| ApiError::Parse { url, source })
}
