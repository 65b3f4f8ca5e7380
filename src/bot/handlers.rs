use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseFollowup,
        CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::{CommandInteraction, ComponentInteraction},
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    bot::RitmoBot,
    ui::{
        buttons::{self, button_ids},
        embeds,
    },
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &RitmoBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, command, bot).await?,
        "skip" => handle_skip(ctx, command, bot).await?,
        "stop" => handle_stop(ctx, command, bot).await?,
        "queue" => handle_queue(ctx, command, bot).await?,
        "panel" => handle_panel(ctx, command, bot).await?,
        "ping" => handle_ping(ctx, command).await?,
        _ => {
            respond_text(ctx, &command, "❌ Comando no reconocido", true).await?;
        }
    }

    Ok(())
}

/// Maneja los botones del panel
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &RitmoBot,
) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Componente usado fuera de un servidor"))?;

    match component.data.custom_id.as_str() {
        button_ids::PANEL_SKIP => {
            bot.driver.skip(guild_id);
        }
        button_ids::PANEL_STOP => {
            bot.driver.stop(guild_id);
            if let Err(e) = bot.leave_voice_channel(ctx, guild_id).await {
                warn!("No se pudo abandonar el canal de voz: {:?}", e);
            }
        }
        button_ids::PANEL_REFRESH => {
            // Solo refresca el estado del panel.
        }
        other => {
            warn!("Botón desconocido: {}", other);
        }
    }

    // Toda acción del panel termina actualizando el mismo mensaje.
    let session = bot.registry.get_or_create(guild_id);
    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .embed(embeds::create_panel_embed(&session))
                    .components(buttons::create_panel_buttons()),
            ),
        )
        .await?;

    Ok(())
}

// Handlers específicos para cada comando

async fn handle_play(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str())
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?
        .to_string();

    // Defer: la resolución hace red y puede tardar.
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let voice_channel_id = match get_user_voice_channel(ctx, guild_id, command.user.id) {
        Ok(channel_id) => channel_id,
        Err(_) => {
            command
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new().content("🔇 Entra a un canal de voz primero."),
                )
                .await?;
            return Ok(());
        }
    };

    let call = match bot.voice_handler(ctx, guild_id).await {
        Some(call) => call,
        None => {
            bot.join_voice_channel(ctx, guild_id, voice_channel_id)
                .await?
        }
    };

    let session = bot.registry.get_or_create(guild_id);
    bot.driver.ensure_worker(guild_id, call);

    match bot.resolver.resolve(&query, command.user.id).await {
        Ok(track) => {
            session.add_track(track.clone());

            command
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new().embed(embeds::create_track_added_embed(&track)),
                )
                .await?;
            command
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .embed(embeds::create_panel_embed(&session))
                        .components(buttons::create_panel_buttons()),
                )
                .await?;
        }
        Err(e) => {
            // La resolución fallida nunca toca la cola; solo se informa.
            warn!("Resolución fallida para '{}': {}", query, e);
            command
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new().content(e.user_message()),
                )
                .await?;
        }
    }

    Ok(())
}

async fn handle_skip(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();

    let message = if bot.driver.skip(guild_id) {
        "⏭️ Track saltado"
    } else {
        "❌ No hay nada reproduciéndose"
    };
    respond_text(ctx, &command, message, false).await
}

async fn handle_stop(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();

    bot.driver.stop(guild_id);
    if bot.voice_handler(ctx, guild_id).await.is_some() {
        bot.leave_voice_channel(ctx, guild_id).await?;
    }

    respond_text(ctx, &command, "⏹️ Reproducción detenida, cola limpiada", false).await
}

async fn handle_queue(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let session = bot.registry.get_or_create(guild_id);

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embeds::create_queue_embed(&session)),
            ),
        )
        .await?;

    Ok(())
}

async fn handle_panel(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let session = bot.registry.get_or_create(guild_id);

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embeds::create_panel_embed(&session))
                    .components(buttons::create_panel_buttons()),
            ),
        )
        .await?;

    Ok(())
}

async fn handle_ping(ctx: &Context, command: CommandInteraction) -> Result<()> {
    respond_text(ctx, &command, "🏓 Pong", false).await
}

// Funciones auxiliares

async fn respond_text(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;
    Ok(())
}

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Result<ChannelId> {
    let guild = guild_id
        .to_guild_cached(&ctx.cache)
        .ok_or_else(|| anyhow::anyhow!("Guild no encontrada en caché"))?;

    let channel_id = guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or_else(|| anyhow::anyhow!("El usuario no está en un canal de voz"))?;

    Ok(channel_id)
}
