//! Sesiones de reproducción por guild.
//!
//! Cada guild tiene exactamente una [`Session`]: una cola FIFO sin límite de
//! capacidad más el estado de reproducción actual. Las sesiones se crean de
//! forma perezosa a través del [`SessionRegistry`] y viven mientras viva el
//! proceso. Muchos productores pueden encolar a la vez; un único consumidor
//! (el driver de audio) drena la cola y se suspende cuando está vacía.

use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::{GuildId, UserId};
use std::{collections::VecDeque, sync::Arc};
use tokio::sync::Notify;
use tracing::{debug, info};

/// Track resuelto y listo para reproducir.
///
/// Valor inmutable: dos tracks con los mismos campos son intercambiables.
/// `stream_url` es la URI reproducible que entrega el backend de extracción
/// (no es estable a largo plazo); `webpage_url` es la página canónica para
/// mostrar al usuario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub stream_url: String,
    pub webpage_url: String,
    pub requester: UserId,
}

/// Estado informativo de la sesión, mantenido por el driver de audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing(Track),
}

/// Sesión de música de una guild: cola pendiente + estado de reproducción.
///
/// La cola es un `VecDeque` protegido por mutex con un [`Notify`] como señal
/// de "track disponible": los productores nunca se bloquean y el consumidor
/// único se suspende en [`Session::next_track`] sin hacer polling.
pub struct Session {
    guild_id: GuildId,
    pending: Mutex<VecDeque<Track>>,
    notify: Notify,
    state: Mutex<PlaybackState>,
}

impl Session {
    fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            pending: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            state: Mutex::new(PlaybackState::Idle),
        }
    }

    #[allow(dead_code)]
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Encola un track al final. Nunca bloquea al productor.
    pub fn add_track(&self, track: Track) {
        {
            let mut pending = self.pending.lock();
            pending.push_back(track.clone());
            debug!(
                "➕ Track encolado en guild {}: {} ({} pendientes)",
                self.guild_id,
                track.title,
                pending.len()
            );
        }
        self.notify.notify_one();
    }

    /// Saca el siguiente track en orden FIFO estricto.
    ///
    /// Si la cola está vacía, suspende al consumidor hasta que un productor
    /// encole algo. Pensado para un único consumidor lógico por sesión.
    pub async fn next_track(&self) -> Track {
        loop {
            // El futuro de notificación se crea antes de mirar la cola para
            // no perder un notify entre el pop fallido y el await.
            let notified = self.notify.notified();
            if let Some(track) = self.pending.lock().pop_front() {
                return track;
            }
            notified.await;
        }
    }

    /// Vacía la cola pendiente y devuelve cuántos tracks se descartaron.
    pub fn clear(&self) -> usize {
        let mut pending = self.pending.lock();
        let dropped = pending.len();
        pending.clear();
        if dropped > 0 {
            info!("🗑️ Cola limpiada en guild {}: {} tracks", self.guild_id, dropped);
        }
        dropped
    }

    /// Copia de los tracks pendientes, en orden de reproducción.
    pub fn queued(&self) -> Vec<Track> {
        self.pending.lock().iter().cloned().collect()
    }

    #[allow(dead_code)]
    pub fn queue_len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn set_playing(&self, track: Track) {
        *self.state.lock() = PlaybackState::Playing(track);
    }

    pub fn set_idle(&self) {
        *self.state.lock() = PlaybackState::Idle;
    }

    /// Track en reproducción, si lo hay.
    pub fn current(&self) -> Option<Track> {
        match &*self.state.lock() {
            PlaybackState::Playing(track) => Some(track.clone()),
            PlaybackState::Idle => None,
        }
    }

    #[allow(dead_code)]
    pub fn is_idle(&self) -> bool {
        matches!(*self.state.lock(), PlaybackState::Idle)
    }
}

/// Registro de sesiones por guild, único para todo el proceso.
///
/// `get_or_create` es atómico por clave: dos llamadas concurrentes para la
/// misma guild nunca crean sesiones duplicadas, y guilds distintas no
/// comparten camino de creación (los shards del `DashMap` se bloquean por
/// separado).
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Devuelve la sesión de la guild, creándola si es la primera vez.
    ///
    /// Toda llamada posterior con la misma guild devuelve el mismo `Arc`
    /// (identidad por referencia, no solo por valor).
    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<Session> {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                info!("🎧 Nueva sesión creada para guild {}", guild_id);
                Arc::new(Session::new(guild_id))
            })
            .clone()
    }

    /// Sesión existente, sin crearla.
    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.get(&guild_id).map(|s| s.clone())
    }

    /// Elimina la sesión de una guild (cuando el bot abandona el servidor).
    #[allow(dead_code)]
    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.remove(&guild_id).map(|(_, s)| s)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
