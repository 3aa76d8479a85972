use egui::style::{Selection, WidgetVisuals};
use egui::{Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals};

// Dark navy panels with the scene's neon green as the accent.

pub const BG_PANEL: Color32 = Color32::from_rgb(8, 13, 24);
pub const BG_WIDGET: Color32 = Color32::from_rgb(16, 24, 38);
const BG_WIDGET_HOVER: Color32 = Color32::from_rgb(22, 34, 52);
const BG_WIDGET_ACTIVE: Color32 = Color32::from_rgb(28, 44, 64);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(176, 190, 205);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(104, 118, 138);
const TEXT_BRIGHT: Color32 = Color32::from_rgb(226, 236, 244);

/// Matches the scene's glyph and ground-glow green (#00ff88).
pub const ACCENT_NEON: Color32 = Color32::from_rgb(0, 255, 136);
pub const ACCENT_RED: Color32 = Color32::from_rgb(214, 58, 72);
pub const ACCENT_BLUE: Color32 = Color32::from_rgb(136, 192, 255);
pub const ACCENT_GOLD: Color32 = Color32::from_rgb(244, 201, 93);
pub const ACCENT_ORANGE: Color32 = Color32::from_rgb(230, 150, 60);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgba_premultiplied(30, 60, 70, 90);
const BORDER_ACCENT: Color32 = Color32::from_rgb(0, 200, 110);

const CORNER_RADIUS: f32 = 2.0;

fn widget(bg: Color32, border: Stroke, text: Color32, expansion: f32) -> WidgetVisuals {
    WidgetVisuals {
        bg_fill: bg,
        weak_bg_fill: bg,
        bg_stroke: border,
        rounding: Rounding::same(CORNER_RADIUS),
        fg_stroke: Stroke::new(1.0, text),
        expansion,
    }
}

fn neon_visuals() -> Visuals {
    let mut v = Visuals::dark();
    v.override_text_color = Some(TEXT_PRIMARY);

    let subtle = Stroke::new(1.0, BORDER_SUBTLE);
    let accent = Stroke::new(1.0, BORDER_ACCENT);
    v.widgets.noninteractive = WidgetVisuals {
        weak_bg_fill: BG_PANEL,
        ..widget(BG_WIDGET, subtle, TEXT_MUTED, 0.0)
    };
    v.widgets.inactive = widget(BG_WIDGET, subtle, TEXT_PRIMARY, 0.0);
    v.widgets.hovered = widget(BG_WIDGET_HOVER, accent, TEXT_BRIGHT, 1.0);
    v.widgets.active = widget(BG_WIDGET_ACTIVE, Stroke::new(2.0, ACCENT_NEON), TEXT_BRIGHT, 1.0);
    v.widgets.open = widget(BG_WIDGET_ACTIVE, accent, TEXT_BRIGHT, 0.0);

    v.selection = Selection {
        bg_fill: ACCENT_NEON.gamma_multiply(0.4),
        stroke: Stroke::new(1.0, ACCENT_NEON),
    };
    v.text_cursor.stroke = Stroke::new(2.0, ACCENT_NEON);

    v.hyperlink_color = ACCENT_BLUE;
    v.warn_fg_color = ACCENT_GOLD;
    v.error_fg_color = ACCENT_RED;

    v.panel_fill = BG_PANEL;
    v.window_fill = BG_PANEL;
    v.faint_bg_color = BG_PANEL;
    v.extreme_bg_color = Color32::BLACK;
    v.code_bg_color = Color32::BLACK;
    v.window_stroke = subtle;
    v.window_rounding = Rounding::same(CORNER_RADIUS);
    v.menu_rounding = Rounding::same(CORNER_RADIUS);
    v.collapsing_header_frame = false;
    v
}

pub fn apply_theme(ctx: &egui::Context) {
    ctx.style_mut(|style| {
        style.visuals = neon_visuals();

        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.window_margin = egui::Margin::same(14.0);
        style.spacing.button_padding = egui::vec2(8.0, 4.0);

        let sizes = [
            (TextStyle::Small, 11.0, FontFamily::Proportional),
            (TextStyle::Body, 14.0, FontFamily::Proportional),
            (TextStyle::Button, 14.0, FontFamily::Proportional),
            (TextStyle::Heading, 18.0, FontFamily::Proportional),
            (TextStyle::Monospace, 13.0, FontFamily::Monospace),
        ];
        style.text_styles = sizes
            .into_iter()
            .map(|(text_style, size, family)| (text_style, FontId::new(size, family)))
            .collect();
    });
}
