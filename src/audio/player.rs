//! Driver de reproducción: el consumidor único de cada sesión.
//!
//! Por cada guild con conexión de voz se lanza un worker que drena la cola
//! de la sesión en orden FIFO. Entre tracks el worker queda suspendido en
//! `Session::next_track`, que es a la vez la señal de "track disponible"
//! cuando la sesión está idle.

use dashmap::{mapref::entry::Entry, DashMap};
use serenity::model::id::GuildId;
use songbird::{
    input::{HttpRequest, Input},
    tracks::TrackHandle,
    Call, Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
};
use tracing::{debug, error, info};

use crate::session::SessionRegistry;

pub struct PlaybackDriver {
    registry: Arc<SessionRegistry>,
    http: reqwest::Client,
    current: DashMap<GuildId, TrackHandle>,
    workers: DashMap<GuildId, JoinHandle<()>>,
}

impl PlaybackDriver {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        let http = reqwest::Client::builder()
            .tcp_keepalive(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; Ritmo)")
            .build()
            .unwrap_or_default();

        Self {
            registry,
            http,
            current: DashMap::new(),
            workers: DashMap::new(),
        }
    }

    /// Garantiza que la guild tenga su worker corriendo.
    ///
    /// Idempotente: un solo consumidor lógico por sesión, aunque varios
    /// comandos `/play` lleguen a la vez.
    pub fn ensure_worker(self: &Arc<Self>, guild_id: GuildId, call: Arc<Mutex<Call>>) {
        match self.workers.entry(guild_id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_finished() {
                    occupied.insert(self.spawn_worker(guild_id, call));
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(self.spawn_worker(guild_id, call));
            }
        }
    }

    fn spawn_worker(self: &Arc<Self>, guild_id: GuildId, call: Arc<Mutex<Call>>) -> JoinHandle<()> {
        let driver = self.clone();
        tokio::spawn(async move {
            driver.run_worker(guild_id, call).await;
        })
    }

    async fn run_worker(self: Arc<Self>, guild_id: GuildId, call: Arc<Mutex<Call>>) {
        let session = self.registry.get_or_create(guild_id);
        info!("▶️ Worker de reproducción iniciado en guild {}", guild_id);

        loop {
            let track = session.next_track().await;
            session.set_playing(track.clone());
            info!("🎵 Reproduciendo en guild {}: {}", guild_id, track.title);

            let input: Input =
                HttpRequest::new(self.http.clone(), track.stream_url.clone()).into();
            let handle = call.lock().await.play_input(input);

            let done = Arc::new(Notify::new());
            let attached = handle
                .add_event(
                    Event::Track(TrackEvent::End),
                    TrackEndNotifier { done: done.clone() },
                )
                .and_then(|_| {
                    handle.add_event(
                        Event::Track(TrackEvent::Error),
                        TrackEndNotifier { done: done.clone() },
                    )
                });

            match attached {
                Ok(()) => {
                    self.current.insert(guild_id, handle);
                    done.notified().await;
                    self.current.remove(&guild_id);
                }
                Err(e) => {
                    error!("Error registrando eventos del track: {:?}", e);
                }
            }

            if session.queue_is_empty() {
                session.set_idle();
                debug!("📭 Cola drenada en guild {}, sesión idle", guild_id);
            }
        }
    }

    /// Detiene el track actual; el worker avanza solo al siguiente.
    pub fn skip(&self, guild_id: GuildId) -> bool {
        if let Some(handle) = self.current.get(&guild_id) {
            let _ = handle.stop();
            info!("⏭️ Track saltado en guild {}", guild_id);
            true
        } else {
            false
        }
    }

    /// Vacía la cola y corta el track actual. Devuelve cuántos pendientes
    /// se descartaron.
    pub fn stop(&self, guild_id: GuildId) -> usize {
        let dropped = self
            .registry
            .get(guild_id)
            .map(|session| session.clear())
            .unwrap_or(0);

        if let Some((_, handle)) = self.current.remove(&guild_id) {
            let _ = handle.stop();
        }
        info!("⏹️ Reproducción detenida en guild {}", guild_id);
        dropped
    }

    /// Mata el worker de la guild (al abandonar el canal de voz).
    pub fn detach(&self, guild_id: GuildId) {
        if let Some((_, worker)) = self.workers.remove(&guild_id) {
            worker.abort();
        }
        if let Some(session) = self.registry.get(guild_id) {
            session.set_idle();
        }
        debug!("🔌 Worker desmontado en guild {}", guild_id);
    }
}

/// Despierta al worker cuando el track termina o falla.
struct TrackEndNotifier {
    done: Arc<Notify>,
}

#[async_trait::async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        self.done.notify_one();
        None
    }
}
