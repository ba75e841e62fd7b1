/// Deployment settings and secrets loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Market data
    pub twelvedata_api_key: String,

    // Telegram
    pub telegram_token: String,
    /// Chat that receives signal alerts, daily summaries and heartbeats.
    pub telegram_chat_id: i64,
    pub telegram_allowed_user_ids: Vec<i64>,

    // HTTP
    pub port: u16,
    /// Bearer token for `/api/*`. Unset means the reporting routes are open.
    pub dashboard_token: Option<String>,

    // Database
    pub database_url: String,

    // Scanner/schedule TOML file
    pub config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let telegram_chat_id = required_env("TELEGRAM_CHAT_ID")
            .trim()
            .parse::<i64>()
            .unwrap_or_else(|_| panic!("TELEGRAM_CHAT_ID must be a numeric chat id"));

        let telegram_allowed_user_ids =
            allowed_user_ids(optional_env("TELEGRAM_ALLOWED_USER_IDS"), telegram_chat_id);

        Config {
            twelvedata_api_key: required_env("TWELVEDATA_API_KEY"),
            telegram_token: required_env("TELEGRAM_TOKEN"),
            telegram_chat_id,
            telegram_allowed_user_ids,
            port: optional_env("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            dashboard_token: optional_env("DASHBOARD_TOKEN"),
            database_url: optional_env("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://fibobot.db?mode=rwc".to_string()),
            config_path: optional_env("FIBOBOT_CONFIG_PATH")
                .unwrap_or_else(|| "config/fibobot.toml".to_string()),
        }
    }
}

/// Operators allowed to use the bot. An unset, blank or empty list means
/// only the alert chat.
fn allowed_user_ids(raw: Option<String>, chat_id: i64) -> Vec<i64> {
    let ids = raw.map(|r| parse_id_list(&r)).unwrap_or_default();
    if ids.is_empty() {
        vec![chat_id]
    } else {
        ids
    }
}

fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().unwrap_or_else(|_| {
                panic!("TELEGRAM_ALLOWED_USER_IDS contains non-numeric ID: '{s}'")
            })
        })
        .collect()
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

/// Unset and blank variables are both `None`, so a copied `.env` template
/// with empty lines keeps the defaults.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
