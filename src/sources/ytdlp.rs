//! Backend de extracción basado en yt-dlp.
//!
//! Lanza el binario como proceso hijo y parsea su salida JSON. Los flags
//! por defecto son deliberadamente conservadores: sin expansión de
//! playlists, sin descarga, salida silenciosa, nombres de archivo
//! restringidos y sin credenciales almacenadas.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ExtractorOutput, MediaExtractor, ResolutionError};
use crate::config::Config;

/// Flags base que acompañan a toda invocación.
const BASE_ARGS: &[&str] = &[
    "--no-playlist",
    "--quiet",
    "--no-warnings",
    "--restrict-filenames",
    "--ignore-errors",
    "--no-check-certificates",
    "--force-ipv4",
];

/// Configuración del proceso yt-dlp.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    /// Ruta o nombre del binario.
    pub bin: String,
    /// Selector de formato (`bestaudio/best` por defecto).
    pub format: String,
    /// Override explícito de `youtube:player_client`.
    pub player_client: Option<String>,
    /// Archivo de cookies en formato Netscape.
    pub cookies: Option<String>,
    /// Navegador del que extraer cookies (`--cookies-from-browser`).
    pub cookies_from_browser: Option<String>,
    /// Argumentos adicionales crudos.
    pub extra_args: Vec<String>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            bin: "yt-dlp".to_string(),
            format: "bestaudio/best".to_string(),
            player_client: None,
            cookies: None,
            cookies_from_browser: None,
            extra_args: Vec::new(),
        }
    }
}

impl From<&Config> for YtDlpConfig {
    fn from(config: &Config) -> Self {
        Self {
            bin: config.ytdlp_bin.clone(),
            format: config.ytdlp_format.clone(),
            player_client: config.ytdlp_player_client.clone(),
            cookies: config.ytdlp_cookies.clone(),
            cookies_from_browser: config.ytdlp_cookies_from_browser.clone(),
            extra_args: config.ytdlp_extra_args.clone(),
        }
    }
}

impl YtDlpConfig {
    /// Cliente de reproducción a usar contra YouTube.
    ///
    /// Con cookies configuradas los clientes iOS/tv suelen esquivar los
    /// desafíos web; sin ellas, `android` es el más estable.
    fn player_client(&self) -> &str {
        if let Some(client) = &self.player_client {
            return client;
        }
        if self.cookies.is_some() || self.cookies_from_browser.is_some() {
            "ios"
        } else {
            "android"
        }
    }

    /// Construye la línea de argumentos completa. El target va siempre al
    /// final; `download` llega en `false` desde el resolver.
    pub fn build_args(&self, target: &str, download: bool) -> Vec<String> {
        let mut args: Vec<String> = BASE_ARGS.iter().map(|s| s.to_string()).collect();

        args.push("--extractor-args".to_string());
        args.push(format!("youtube:player_client={}", self.player_client()));
        args.push("--format".to_string());
        args.push(self.format.clone());

        if !download {
            args.push("--skip-download".to_string());
        }
        args.push("--dump-single-json".to_string());

        if let Some(cookies) = &self.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.clone());
        }
        if let Some(browser) = &self.cookies_from_browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.clone());
        }
        args.extend(self.extra_args.iter().cloned());

        args.push(target.to_string());
        args
    }
}

/// Extractor de producción: un proceso yt-dlp por resolución.
///
/// Cada llamada lanza su propio proceso, así las resoluciones concurrentes
/// no se serializan entre sí.
pub struct YtDlpExtractor {
    config: YtDlpConfig,
}

impl YtDlpExtractor {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    /// Verifica que el binario esté disponible.
    pub async fn verify(&self) -> anyhow::Result<()> {
        let output = tokio::process::Command::new(&self.config.bin)
            .arg("--version")
            .output()
            .await?;
        if !output.status.success() {
            anyhow::bail!("{} no disponible", self.config.bin);
        }
        let version = String::from_utf8_lossy(&output.stdout);
        debug!("✅ yt-dlp versión: {}", version.trim());
        Ok(())
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn extract(
        &self,
        target: &str,
        download: bool,
    ) -> Result<ExtractorOutput, ResolutionError> {
        let args = self.config.build_args(target, download);
        debug!("🎬 Ejecutando {} {:?}", self.config.bin, args);

        let output = tokio::process::Command::new(&self.config.bin)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr_tail(&stderr);
            warn!("⚠️ yt-dlp terminó con {}: {}", output.status, detail);
            return Err(ResolutionError::ExtractorFailed { detail });
        }

        parse_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parsea la salida de `--dump-single-json`.
fn parse_output(stdout: &str) -> Result<ExtractorOutput, ResolutionError> {
    let body = stdout.trim();
    if body.is_empty() {
        return Err(ResolutionError::MalformedResponse {
            reason: "salida vacía de yt-dlp".to_string(),
        });
    }
    serde_json::from_str(body).map_err(|e| ResolutionError::MalformedResponse {
        reason: format!("JSON inválido: {e}"),
    })
}

/// Últimas líneas de stderr, suficientes para diagnosticar sin volcar todo.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .trim()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return "sin detalle en stderr".to_string();
    }
    let start = lines.len().saturating_sub(3);
    lines[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_args_are_safe_for_no_login() {
        let config = YtDlpConfig::default();
        let args = config.build_args("ytsearch1:hello", false);

        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--quiet".to_string()));
        assert!(args.contains(&"--restrict-filenames".to_string()));
        assert!(args.contains(&"--no-check-certificates".to_string()));
        assert!(args.contains(&"--force-ipv4".to_string()));
        assert!(args.contains(&"--skip-download".to_string()));
        assert!(args.contains(&"youtube:player_client=android".to_string()));
        // Sin credenciales por defecto.
        assert!(!args.iter().any(|a| a == "--cookies"));
        assert!(!args.iter().any(|a| a == "--cookies-from-browser"));
    }

    #[test]
    fn target_goes_last_unmodified() {
        let config = YtDlpConfig::default();

        let search = config.build_args("ytsearch1:hello world", false);
        assert_eq!(search.last().unwrap(), "ytsearch1:hello world");

        let url = "https://youtube.com/watch?v=abc";
        let direct = config.build_args(url, false);
        assert_eq!(direct.last().unwrap(), url);
    }

    #[test]
    fn cookies_switch_player_client_to_ios() {
        let config = YtDlpConfig {
            cookies: Some("/tmp/cookies.txt".to_string()),
            ..Default::default()
        };
        let args = config.build_args("x", false);

        assert!(args.contains(&"youtube:player_client=ios".to_string()));
        let idx = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[idx + 1], "/tmp/cookies.txt");
    }

    #[test]
    fn explicit_player_client_wins_over_cookies() {
        let config = YtDlpConfig {
            player_client: Some("tv".to_string()),
            cookies: Some("/tmp/cookies.txt".to_string()),
            ..Default::default()
        };
        let args = config.build_args("x", false);
        assert!(args.contains(&"youtube:player_client=tv".to_string()));
    }

    #[test]
    fn extra_args_are_appended_before_the_target() {
        let config = YtDlpConfig {
            extra_args: vec!["--geo-bypass".to_string()],
            ..Default::default()
        };
        let args = config.build_args("objetivo", false);
        let extra = args.iter().position(|a| a == "--geo-bypass").unwrap();
        assert_eq!(extra, args.len() - 2);
    }

    #[test]
    fn parses_flat_record() {
        let out = parse_output(
            r#"{"title": "direct", "url": "stream2", "webpage_url": "page2"}"#,
        )
        .unwrap();
        match out {
            ExtractorOutput::Single(entry) => {
                assert_eq!(entry.title.as_deref(), Some("direct"));
                assert_eq!(entry.url.as_deref(), Some("stream2"));
                assert_eq!(entry.webpage_url.as_deref(), Some("page2"));
            }
            ExtractorOutput::Playlist { .. } => panic!("debería ser registro plano"),
        }
    }

    #[test]
    fn parses_entries_container() {
        let out = parse_output(
            r#"{"entries": [{"title": "song", "url": "stream", "webpage_url": "web"}]}"#,
        )
        .unwrap();
        match out {
            ExtractorOutput::Playlist { entries } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].title.as_deref(), Some("song"));
            }
            ExtractorOutput::Single(_) => panic!("debería ser contenedor con entries"),
        }
    }

    #[test]
    fn empty_or_invalid_output_is_malformed() {
        assert!(matches!(
            parse_output("  \n"),
            Err(ResolutionError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_output("no soy json"),
            Err(ResolutionError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn stderr_tail_keeps_last_three_lines() {
        let tail = stderr_tail("uno\ndos\ntres\ncuatro\n");
        assert_eq!(tail, "dos | tres | cuatro");
        assert_eq!(stderr_tail(""), "sin detalle en stderr");
    }
}
