//! Integración con Discord.
//!
//! [`RitmoBot`] implementa el [`EventHandler`] de Serenity y conecta los
//! comandos slash con el registro de sesiones, el resolver y el driver de
//! reproducción. La conexión de voz la gestiona Songbird; aquí solo se pide
//! el `Call` por guild y se monta el worker sobre él.

use anyhow::Result;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Interaction, Ready},
    async_trait,
};
use songbird::Call;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

pub mod commands;
pub mod handlers;

use crate::{
    audio::PlaybackDriver, config::Config, session::SessionRegistry, sources::TrackResolver,
};

pub struct RitmoBot {
    config: Arc<Config>,
    /// Sesiones por guild, creadas de forma perezosa.
    pub registry: Arc<SessionRegistry>,
    /// Resolver de consultas a tracks.
    pub resolver: Arc<TrackResolver>,
    /// Consumidor único de cada sesión.
    pub driver: Arc<PlaybackDriver>,
}

impl RitmoBot {
    pub fn new(config: Config, resolver: Arc<TrackResolver>) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let driver = Arc::new(PlaybackDriver::new(registry.clone()));

        Self {
            config: Arc::new(config),
            registry,
            resolver,
            driver,
        }
    }

    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Comandos registrados en guild {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await?;
                info!("✅ Comandos globales registrados");
            }
        }
        Ok(())
    }

    /// Conecta al canal de voz y devuelve el `Call` de la guild.
    pub async fn join_voice_channel(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<Mutex<Call>>> {
        let manager = songbird::get(ctx)
            .await
            .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

        let call = manager.join(guild_id, channel_id).await?;
        info!("🔊 Conectado al canal de voz en guild {}", guild_id);
        Ok(call)
    }

    /// `Call` existente de la guild, si hay conexión de voz activa.
    pub async fn voice_handler(&self, ctx: &Context, guild_id: GuildId) -> Option<Arc<Mutex<Call>>> {
        songbird::get(ctx).await?.get(guild_id)
    }

    pub async fn leave_voice_channel(&self, ctx: &Context, guild_id: GuildId) -> Result<()> {
        let manager = songbird::get(ctx)
            .await
            .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

        manager.remove(guild_id).await?;
        self.driver.detach(guild_id);
        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok(())
    }
}

#[async_trait]
impl EventHandler for RitmoBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component) => {
                if let Err(e) = handlers::handle_component(&ctx, component, self).await {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }
}
