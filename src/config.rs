use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para registro de comandos en desarrollo

    // yt-dlp
    pub ytdlp_bin: String,
    pub ytdlp_format: String,
    pub ytdlp_player_client: Option<String>,
    pub ytdlp_cookies: Option<String>,
    pub ytdlp_cookies_from_browser: Option<String>,
    pub ytdlp_extra_args: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // yt-dlp
            ytdlp_bin: std::env::var("YTDLP_BIN")
                .unwrap_or_else(|_| "yt-dlp".to_string()),
            ytdlp_format: std::env::var("YTDLP_FORMAT")
                .unwrap_or_else(|_| "bestaudio/best".to_string()),
            ytdlp_player_client: std::env::var("YTDLP_PLAYER_CLIENT").ok(),
            ytdlp_cookies: std::env::var("YTDLP_COOKIES").ok(),
            ytdlp_cookies_from_browser: std::env::var("YTDLP_COOKIES_FROM_BROWSER").ok(),
            ytdlp_extra_args: std::env::var("YTDLP_EXTRA_ARGS")
                .map(|raw| {
                    raw.split_whitespace()
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN no puede estar vacío");
        }
        if self.application_id == 0 {
            anyhow::bail!("APPLICATION_ID no puede ser 0");
        }
        if self.ytdlp_bin.trim().is_empty() {
            anyhow::bail!("YTDLP_BIN no puede estar vacío");
        }
        if self.ytdlp_format.trim().is_empty() {
            anyhow::bail!("YTDLP_FORMAT no puede estar vacío");
        }
        Ok(())
    }

    /// Resumen apto para logs: sin token.
    pub fn summary(&self) -> String {
        format!(
            "Config: app {} (comandos: {}), yt-dlp: {} formato {} cliente {}",
            self.application_id,
            self.guild_id
                .map_or("globales".to_string(), |id| format!("guild {id}")),
            self.ytdlp_bin,
            self.ytdlp_format,
            self.ytdlp_player_client.as_deref().unwrap_or("auto"),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,
            ytdlp_bin: "yt-dlp".to_string(),
            ytdlp_format: "bestaudio/best".to_string(),
            ytdlp_player_client: None,
            ytdlp_cookies: None,
            ytdlp_cookies_from_browser: None,
            ytdlp_extra_args: Vec::new(),
        }
    }
}
