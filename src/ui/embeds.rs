use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::session::{Session, Track};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Ritmo";

/// Tracks visibles en el panel de control
const PANEL_QUEUE_ITEMS: usize = 5;

/// Tracks visibles en /queue
const QUEUE_PAGE_ITEMS: usize = 10;

/// Embed de confirmación al encolar un track.
pub fn create_track_added_embed(track: &Track) -> CreateEmbed {
    CreateEmbed::default()
        .title("➕ Agregado a la cola")
        .description(format!("**{}**", track.title))
        .url(&track.webpage_url)
        .field("👤 Solicitado por", format!("<@{}>", track.requester), true)
        .color(colors::SUCCESS_GREEN)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Panel de control: track actual + primeros pendientes.
pub fn create_panel_embed(session: &Session) -> CreateEmbed {
    let now = match session.current() {
        Some(track) => format!("```{}```", track.title),
        None => "No hay nada reproduciéndose.".to_string(),
    };
    let queued = session.queued();

    CreateEmbed::default()
        .title("🎛️ Panel de control")
        .description(format!(
            "{now}\n{}",
            queue_lines(&queued, PANEL_QUEUE_ITEMS)
        ))
        .color(colors::MUSIC_PURPLE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Embed de /queue: track actual + cola numerada.
pub fn create_queue_embed(session: &Session) -> CreateEmbed {
    let now = match session.current() {
        Some(track) => format!("Ahora: **{}**", track.title),
        None => "No hay nada reproduciéndose.".to_string(),
    };
    let queued = session.queued();

    CreateEmbed::default()
        .title("📜 Cola de reproducción")
        .description(format!("{now}\n{}", queue_lines(&queued, QUEUE_PAGE_ITEMS)))
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn queue_lines(tracks: &[Track], limit: usize) -> String {
    if tracks.is_empty() {
        return "La cola está vacía.".to_string();
    }
    let mut lines: Vec<String> = tracks
        .iter()
        .take(limit)
        .enumerate()
        .map(|(idx, track)| format!("{}. {}", idx + 1, track.title))
        .collect();
    if tracks.len() > limit {
        lines.push(format!("… y {} más", tracks.len() - limit));
    }
    lines.join("\n")
}
