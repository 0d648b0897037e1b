//! RetroAchievements compatibility lookups.
//!
//! [`AchievementsClient`] fetches, per console, the list of games that have
//! achievements; [`is_compatible`] matches a catalog filename against that
//! list. Lookups never fail from the caller's point of view: a missing key,
//! an unmapped console or any request failure yields an empty list.

mod error;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use error::AchievementsError;

use crate::config::SettingsStore;
use crate::download::HttpClient;
use crate::download::constants::ACHIEVEMENTS_TIMEOUT_SECS;
use crate::filter::strip_extension;

/// Public RetroAchievements web API root.
pub const DEFAULT_BASE_URL: &str = "https://retroachievements.org/API";

/// Cache file name inside the data directory.
pub const CACHE_FILE: &str = "ra_cache.json";

/// Key validation uses a cheaper endpoint and a shorter timeout.
const VALIDATE_TIMEOUT_SECS: u64 = 5;

/// Cleaned names longer than this also match by containment.
const PARTIAL_MATCH_MIN_CHARS: usize = 10;

/// Collection key → RetroAchievements console id.
const CONSOLE_IDS: &[(&str, u32)] = &[
    ("NES", 7),
    ("SNES", 3),
    ("N64", 2),
    ("GameCube", 16),
    ("GB", 4),
    ("GBC", 6),
    ("GBA", 5),
    ("NDS", 18),
    ("MasterSystem", 11),
    ("MegaDrive", 1),
    ("Saturn", 39),
    ("Dreamcast", 40),
    ("GameGear", 15),
    ("PS1", 12),
    ("PSP", 41),
    ("PS2", 21),
    // Neo Geo Pocket Color
    ("NeoGeo", 29),
    ("PC_Engine", 8),
    ("Atari2600", 25),
    ("Wii", 19),
    ("3DS", 62),
];

#[allow(clippy::expect_used)]
static TAG_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[\(\[].*?[\)\]]").expect("tag group pattern is valid"));

/// One game with achievements, as returned by `API_GetGameList.php`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTitle {
    /// Game title as listed by RetroAchievements.
    #[serde(rename = "Title")]
    pub title: String,
    /// RetroAchievements game id.
    #[serde(rename = "ID")]
    pub id: u64,
}

/// RetroAchievements console id for a collection key.
#[must_use]
pub fn console_id(console_key: &str) -> Option<u32> {
    CONSOLE_IDS
        .iter()
        .find(|(key, _)| *key == console_key)
        .map(|(_, id)| *id)
}

fn clean_title(name: &str) -> String {
    TAG_GROUP.replace_all(name, "").trim().to_lowercase()
}

/// Returns true if `filename` likely names one of `games`.
///
/// Extension and bracketed/parenthesized groups are dropped from both sides
/// before comparing case-insensitively. Names longer than 10 characters also
/// match when contained in a title.
#[must_use]
pub fn is_compatible(filename: &str, games: &[GameTitle]) -> bool {
    let name = clean_title(strip_extension(filename));
    let partial = name.chars().count() > PARTIAL_MATCH_MIN_CHARS;
    games.iter().any(|game| {
        let title = clean_title(&game.title);
        title == name || (partial && title.contains(&name))
    })
}

/// Console id (as a string, the cache file's key) → game list.
type Cache = HashMap<String, Arc<[GameTitle]>>;

/// Cached client for the RetroAchievements game list.
///
/// The API key is read from the settings on every lookup, so a key change
/// takes effect without rebuilding the client.
#[derive(Debug)]
pub struct AchievementsClient {
    client: HttpClient,
    settings: Arc<SettingsStore>,
    base_url: String,
    timeout: Duration,
    cache: RwLock<Cache>,
    cache_file: Option<PathBuf>,
}

impl AchievementsClient {
    /// Creates a client against the public API with an in-memory cache.
    #[must_use]
    pub fn new(client: HttpClient, settings: Arc<SettingsStore>) -> Self {
        Self {
            client,
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(ACHIEVEMENTS_TIMEOUT_SECS),
            cache: RwLock::new(HashMap::new()),
            cache_file: None,
        }
    }

    /// Points the client at another API root (a mock server in tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Persists the cache to `path`, preloading whatever it already holds.
    ///
    /// An unreadable cache file is logged and ignored.
    #[must_use]
    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match load_cache(&path) {
            Ok(cache) => {
                debug!(path = %path.display(), consoles = cache.len(), "loaded achievements cache");
                self.cache = RwLock::new(cache);
            }
            Err(e) => warn!(error = %e, "ignoring achievements cache"),
        }
        self.cache_file = Some(path);
        self
    }

    /// Games with achievements for a collection key.
    ///
    /// Served from cache when present. Empty when no key is configured, the
    /// console is unmapped, or the request fails.
    #[instrument(skip(self))]
    pub async fn supported_games(&self, console_key: &str) -> Arc<[GameTitle]> {
        let Some(id) = console_id(console_key) else {
            debug!("console has no achievements mapping");
            return Arc::from(Vec::new());
        };
        let api_key = self.settings.settings().ra_api_key;
        if api_key.is_empty() {
            return Arc::from(Vec::new());
        }

        let cache_key = id.to_string();
        if let Some(games) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cache_key)
            .cloned()
        {
            debug!(console_id = id, "achievements list served from cache");
            return games;
        }

        match self.fetch_game_list(&api_key, id).await {
            Ok(games) => {
                info!(
                    console_id = id,
                    games = games.len(),
                    "fetched achievements list"
                );
                let games: Arc<[GameTitle]> = games.into();
                self.cache
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(cache_key, Arc::clone(&games));
                self.save_cache().await;
                games
            }
            Err(e) => {
                warn!(error = %e, "achievements lookup failed");
                Arc::from(Vec::new())
            }
        }
    }

    /// Returns true if `filename` in `console_key` has achievements.
    pub async fn check_compatibility(&self, console_key: &str, filename: &str) -> bool {
        is_compatible(filename, &self.supported_games(console_key).await)
    }

    /// Checks an API key against the console list endpoint.
    ///
    /// Any failure, or an empty list, means the key is not usable.
    #[instrument(skip_all)]
    pub async fn validate_key(&self, api_key: &str) -> bool {
        if api_key.is_empty() {
            return false;
        }
        let url = format!("{}/API_GetConsoleIDs.php", self.base_url);
        let result = self
            .get_json(
                &url,
                &[("y", api_key)],
                Duration::from_secs(VALIDATE_TIMEOUT_SECS),
            )
            .await;
        match result {
            Ok(serde_json::Value::Array(consoles)) => !consoles.is_empty(),
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "key validation failed");
                false
            }
        }
    }

    async fn fetch_game_list(
        &self,
        api_key: &str,
        console_id: u32,
    ) -> Result<Vec<GameTitle>, AchievementsError> {
        let url = format!("{}/API_GetGameList.php", self.base_url);
        let id = console_id.to_string();
        let body = self
            .get_json(
                &url,
                &[("y", api_key), ("i", &id), ("f", "1")],
                self.timeout,
            )
            .await?;
        serde_json::from_value(body).map_err(|source| AchievementsError::Decode { url, source })
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<serde_json::Value, AchievementsError> {
        let request_url =
            Url::parse_with_params(url, params).map_err(|_| AchievementsError::invalid_url(url))?;

        let response = self
            .client
            .inner()
            .get(request_url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AchievementsError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AchievementsError::http_status(url, status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| AchievementsError::network(url, e))
    }

    async fn save_cache(&self) {
        let Some(path) = &self.cache_file else {
            return;
        };
        let raw = {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            let on_disk: BTreeMap<&str, &[GameTitle]> = cache
                .iter()
                .map(|(id, games)| (id.as_str(), &**games))
                .collect();
            serde_json::to_string_pretty(&on_disk)
        };
        let result = match raw {
            Ok(raw) => write_file(path, raw).await,
            Err(source) => Err(AchievementsError::Encode { source }),
        };
        if let Err(e) = result {
            warn!(error = %e, "cannot save achievements cache");
        }
    }
}

fn load_cache(path: &Path) -> Result<Cache, AchievementsError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let on_disk: HashMap<String, Vec<GameTitle>> =
                serde_json::from_str(&raw).map_err(|source| AchievementsError::Decode {
                    url: path.display().to_string(),
                    source,
                })?;
            Ok(on_disk
                .into_iter()
                .map(|(id, games)| (id, Arc::from(games)))
                .collect())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(AchievementsError::io(path, e)),
    }
}

async fn write_file(path: &Path, raw: String) -> Result<(), AchievementsError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AchievementsError::io(parent, e))?;
    }
    tokio::fs::write(path, raw)
        .await
        .map_err(|e| AchievementsError::io(path, e))
}
