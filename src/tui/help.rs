use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

fn key(k: &'static str) -> Span<'static> {
    Span::styled(k, Style::default().fg(Color::Magenta))
}

/// Keybind lines shown under the prompt.
pub fn keybind_lines(slot: &str) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::raw("  "),
            key("i"),
            Span::raw(" / "),
            key("Enter"),
            Span::raw("   Restart now"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("s"),
            Span::raw(format!("           Schedule for {slot}")),
        ]),
        Line::from(vec![
            Span::raw("  "),
            key("c"),
            Span::raw(" / "),
            key("Esc"),
            Span::raw("     Cancel"),
        ]),
    ]
}
