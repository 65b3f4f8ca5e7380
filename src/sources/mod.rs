//! Resolución de consultas a tracks reproducibles.
//!
//! El usuario escribe una URL directa o texto libre; el [`TrackResolver`]
//! normaliza ambos casos contra un backend de extracción (yt-dlp en
//! producción, ver [`ytdlp`]) y produce un [`Track`] inmutable o un
//! [`ResolutionError`] que la capa de comandos muestra al usuario.

pub mod ytdlp;

use async_trait::async_trait;
use serde::Deserialize;
use serenity::model::id::UserId;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::session::Track;

pub use ytdlp::{YtDlpConfig, YtDlpExtractor};

/// Prefijo de búsqueda: exactamente un resultado, nunca más.
pub const SEARCH_PREFIX: &str = "ytsearch1:";

/// Errores de resolución, propagados tal cual a la capa de comandos.
///
/// Nunca se encola un track parcial: o la resolución entrega un [`Track`]
/// completo o falla con una de estas variantes.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// La búsqueda no devolvió ninguna entrada.
    #[error("sin resultados para '{query}'")]
    NotFound { query: String },

    /// El backend respondió, pero sin los campos requeridos.
    #[error("respuesta malformada del extractor: {reason}")]
    MalformedResponse { reason: String },

    /// El proceso extractor terminó con código de error.
    #[error("el extractor falló: {detail}")]
    ExtractorFailed { detail: String },

    /// No se pudo lanzar el proceso extractor.
    #[error("no se pudo ejecutar el extractor: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolutionError {
    /// Mensaje apto para mostrar en la respuesta del comando.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { query } => {
                format!("🔍 No encontré nada para **{query}**.")
            }
            Self::MalformedResponse { .. } | Self::ExtractorFailed { .. } | Self::Io(_) => {
                "❌ No pude obtener el audio, inténtalo de nuevo.".to_string()
            }
        }
    }
}

/// Registro crudo tal como lo imprime el backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntry {
    pub title: Option<String>,
    pub url: Option<String>,
    pub webpage_url: Option<String>,
    pub original_url: Option<String>,
}

/// Las dos formas de respuesta del backend.
///
/// Una URL directa produce un registro plano; una búsqueda produce un
/// contenedor con `entries` cuyo primer elemento es el resultado elegido.
/// `Playlist` va primero: es la única variante que exige el campo `entries`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ExtractorOutput {
    Playlist { entries: Vec<RawEntry> },
    Single(RawEntry),
}

/// Backend de extracción opaco.
///
/// `download` siempre llega en `false` desde este bot; el flag existe para
/// que los tests verifiquen que nunca se pide descarga.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn extract(
        &self,
        target: &str,
        download: bool,
    ) -> Result<ExtractorOutput, ResolutionError>;
}

/// Traduce consultas de usuario a tracks vía el backend configurado.
pub struct TrackResolver {
    extractor: Arc<dyn MediaExtractor>,
}

impl TrackResolver {
    pub fn new(extractor: Arc<dyn MediaExtractor>) -> Self {
        Self { extractor }
    }

    /// Una consulta es URL directa si trae esquema http/https.
    pub fn is_url(query: &str) -> bool {
        Url::parse(query)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    /// Resuelve `query` a un [`Track`].
    ///
    /// Las URLs pasan sin modificar; el texto libre se prefija con
    /// [`SEARCH_PREFIX`] para pedir exactamente el primer resultado. Cada
    /// resolución corre de forma independiente: no serializa otras
    /// resoluciones ni operaciones de cola.
    pub async fn resolve(&self, query: &str, requester: UserId) -> Result<Track, ResolutionError> {
        let target = if Self::is_url(query) {
            query.to_string()
        } else {
            format!("{SEARCH_PREFIX}{query}")
        };
        debug!("🔍 Resolviendo '{}' como '{}'", query, target);

        let entry = match self.extractor.extract(&target, false).await? {
            ExtractorOutput::Playlist { entries } => {
                entries
                    .into_iter()
                    .next()
                    .ok_or_else(|| ResolutionError::NotFound {
                        query: query.to_string(),
                    })?
            }
            ExtractorOutput::Single(entry) => entry,
        };

        normalize(entry, query, requester)
    }
}

/// Aplana ambas formas de respuesta con las mismas reglas de campos.
fn normalize(entry: RawEntry, query: &str, requester: UserId) -> Result<Track, ResolutionError> {
    let stream_url = match entry.url {
        Some(url) if !url.is_empty() => url,
        _ => {
            return Err(ResolutionError::MalformedResponse {
                reason: "falta el campo 'url' del stream".to_string(),
            })
        }
    };

    Ok(Track {
        title: entry.title.unwrap_or_else(|| "Untitled".to_string()),
        stream_url,
        webpage_url: entry
            .webpage_url
            .or(entry.original_url)
            .unwrap_or_else(|| query.to_string()),
        requester,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    fn entry(title: &str, url: &str, webpage: &str) -> RawEntry {
        RawEntry {
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            webpage_url: Some(webpage.to_string()),
            original_url: None,
        }
    }

    /// Backend falso que registra cada invocación.
    struct FakeExtractor {
        calls: Mutex<Vec<(String, bool)>>,
        output: Box<dyn Fn() -> Result<ExtractorOutput, ResolutionError> + Send + Sync>,
    }

    impl FakeExtractor {
        fn returning(
            output: impl Fn() -> Result<ExtractorOutput, ResolutionError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                output: Box::new(output),
            })
        }
    }

    #[async_trait]
    impl MediaExtractor for FakeExtractor {
        async fn extract(
            &self,
            target: &str,
            download: bool,
        ) -> Result<ExtractorOutput, ResolutionError> {
            self.calls.lock().push((target.to_string(), download));
            (self.output)()
        }
    }

    #[tokio::test]
    async fn free_text_gets_single_result_search_prefix() {
        let fake = FakeExtractor::returning(|| {
            Ok(ExtractorOutput::Playlist {
                entries: vec![entry("sample", "stream", "page")],
            })
        });
        let resolver = TrackResolver::new(fake.clone());

        let track = resolver
            .resolve("hello world", UserId::new(9))
            .await
            .unwrap();

        assert_eq!(
            fake.calls.lock().clone(),
            vec![("ytsearch1:hello world".to_string(), false)]
        );
        assert_eq!(track.title, "sample");
        assert_eq!(track.stream_url, "stream");
        assert_eq!(track.webpage_url, "page");
        assert_eq!(track.requester, UserId::new(9));
    }

    #[tokio::test]
    async fn direct_url_passes_through_unmodified() {
        let fake = FakeExtractor::returning(|| {
            Ok(ExtractorOutput::Single(entry(
                "url-title",
                "stream-url",
                "web-url",
            )))
        });
        let resolver = TrackResolver::new(fake.clone());

        let url = "https://youtube.com/watch?v=abc123";
        let track = resolver.resolve(url, UserId::new(1)).await.unwrap();

        assert_eq!(fake.calls.lock().clone(), vec![(url.to_string(), false)]);
        assert_eq!(track.title, "url-title");
        assert_eq!(track.stream_url, "stream-url");
        assert_eq!(track.webpage_url, "web-url");
    }

    #[tokio::test]
    async fn both_shapes_normalize_to_the_same_track() {
        let flat = FakeExtractor::returning(|| {
            Ok(ExtractorOutput::Single(entry("song", "stream", "web")))
        });
        let listed = FakeExtractor::returning(|| {
            Ok(ExtractorOutput::Playlist {
                entries: vec![entry("song", "stream", "web")],
            })
        });

        let from_flat = TrackResolver::new(flat)
            .resolve("https://youtube.com/watch?v=x", UserId::new(1))
            .await
            .unwrap();
        let from_list = TrackResolver::new(listed)
            .resolve("song", UserId::new(1))
            .await
            .unwrap();

        assert_eq!(from_flat.title, from_list.title);
        assert_eq!(from_flat.stream_url, from_list.stream_url);
        assert_eq!(from_flat.webpage_url, from_list.webpage_url);
    }

    #[tokio::test]
    async fn empty_entries_is_not_found() {
        let fake = FakeExtractor::returning(|| Ok(ExtractorOutput::Playlist { entries: vec![] }));
        let resolver = TrackResolver::new(fake);

        let err = resolver.resolve("nada", UserId::new(1)).await.unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound { ref query } if query == "nada"));
    }

    #[tokio::test]
    async fn missing_stream_url_is_malformed() {
        let fake = FakeExtractor::returning(|| {
            Ok(ExtractorOutput::Single(RawEntry {
                title: Some("sin-stream".to_string()),
                url: None,
                webpage_url: Some("web".to_string()),
                original_url: None,
            }))
        });
        let resolver = TrackResolver::new(fake);

        let err = resolver.resolve("algo", UserId::new(1)).await.unwrap_err();
        assert!(matches!(err, ResolutionError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn missing_title_and_webpage_use_fallbacks() {
        let fake = FakeExtractor::returning(|| {
            Ok(ExtractorOutput::Single(RawEntry {
                title: None,
                url: Some("stream".to_string()),
                webpage_url: None,
                original_url: Some("orig".to_string()),
            }))
        });
        let resolver = TrackResolver::new(fake);

        let track = resolver.resolve("consulta", UserId::new(1)).await.unwrap();
        assert_eq!(track.title, "Untitled");
        assert_eq!(track.webpage_url, "orig");
    }

    #[tokio::test]
    async fn webpage_url_falls_back_to_the_query() {
        let fake = FakeExtractor::returning(|| {
            Ok(ExtractorOutput::Single(RawEntry {
                title: Some("t".to_string()),
                url: Some("stream".to_string()),
                webpage_url: None,
                original_url: None,
            }))
        });
        let resolver = TrackResolver::new(fake);

        let url = "https://youtube.com/watch?v=zzz";
        let track = resolver.resolve(url, UserId::new(1)).await.unwrap();
        assert_eq!(track.webpage_url, url);
    }

    #[test]
    fn url_detection() {
        assert!(TrackResolver::is_url("https://youtube.com/watch?v=abc"));
        assert!(TrackResolver::is_url("http://example.com/a"));
        assert!(TrackResolver::is_url("HTTPS://YOUTU.BE/abc"));
        assert!(!TrackResolver::is_url("hello world"));
        assert!(!TrackResolver::is_url("youtube.com/watch?v=abc"));
        assert!(!TrackResolver::is_url("ftp://example.com/file"));
    }
}
