use super::state::Button;
use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn key_line(key: &str, pad: usize, action: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key.to_string(), Style::default().fg(Color::Magenta)),
        Span::raw(format!("{:width$}{action}", "", width = pad)),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let mut lines = vec![Line::from("Keybinds:")];
    for b in Button::ALL {
        lines.push(key_line(&b.hotkey().to_string(), 12, b.label()));
    }
    lines.push(key_line("←/→", 10, "Select button"));
    lines.push(key_line("Enter", 8, "Press selected button"));
    lines.push(key_line("Esc", 10, "Exit"));
    lines.push(key_line("?", 12, "Toggle this help"));
    lines.push(Line::from(""));
    lines.push(Line::from(
        "Ticks are sent once per interval while the stopwatch runs.",
    ));

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
