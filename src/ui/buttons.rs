use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

/// IDs personalizados de los botones del panel
pub mod button_ids {
    pub const PANEL_REFRESH: &str = "panel_refresh";
    pub const PANEL_SKIP: &str = "panel_skip";
    pub const PANEL_STOP: &str = "panel_stop";
}

/// Fila de controles del panel: actualizar, saltar, detener.
pub fn create_panel_buttons() -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(button_ids::PANEL_REFRESH)
            .label("Actualizar")
            .emoji('🔄')
            .style(ButtonStyle::Secondary),
        CreateButton::new(button_ids::PANEL_SKIP)
            .label("Saltar")
            .emoji('⏭')
            .style(ButtonStyle::Secondary),
        CreateButton::new(button_ids::PANEL_STOP)
            .label("Detener")
            .emoji('⏹')
            .style(ButtonStyle::Secondary),
    ])]
}
