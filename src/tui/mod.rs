mod help;
mod state;

use crate::model::{RunConfig, SessionEvent};
use crate::orchestrator::{self, SessionController, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use state::{big_text, Button, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(cfg: RunConfig) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let controller = SessionController::from_config(&cfg, event_tx)?;

    // TUI runs in a dedicated thread; it owns the terminal and all display state.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = match controller.initialize().await {
        Ok(_) => orchestrator::run_controller(controller, cfg.tick_interval, cmd_rx).await,
        Err(e) => Err(e),
    };

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut event_rx: UnboundedReceiver<SessionEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::default();
    let frame_rate = Duration::from_millis(100);
    terminal.draw(|f| draw(f.area(), f, &state)).ok();
    let mut last_frame = Instant::now();

    let res = loop {
        // Controller events are the only source of state changes; drain without blocking.
        let mut dirty = false;
        let mut controller_gone = false;
        loop {
            match event_rx.try_recv() {
                Ok(ev) => {
                    state.apply_event(ev);
                    dirty = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    controller_gone = true;
                    break;
                }
            }
        }
        if controller_gone {
            break Ok(());
        }

        if dirty || last_frame.elapsed() >= frame_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_frame = Instant::now();
        }

        if event::poll(Duration::from_millis(20)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(cmd) = state.handle_key(k) {
                    let _ = cmd_tx.send(cmd);
                    if cmd == UiCommand::Quit {
                        break Ok(());
                    }
                }
                terminal.draw(|f| draw(f.area(), f, &state)).ok();
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let outer = Block::default()
        .borders(Borders::ALL)
        .title("sim-stopwatch");
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(7),    // Clock
                Constraint::Length(3), // Buttons
                Constraint::Length(3), // Status
            ]
            .as_ref(),
        )
        .split(inner);

    draw_clock(rows[0], f, state);
    draw_buttons(rows[1], f, state);
    draw_status(rows[2], f, state);

    if state.show_help {
        let popup = centered(area, 50, 14);
        help::draw_help(popup, f);
    }
}

fn draw_clock(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let clock = state.session.clock();
    let color = if state.session.running {
        Color::Green
    } else {
        Color::Gray
    };
    let glyph_rows = big_text(&clock);
    let glyph_width = glyph_rows
        .first()
        .map(|r| r.chars().count() as u16)
        .unwrap_or(0);

    // Fall back to plain text when the big font does not fit.
    let lines: Vec<Line> = if area.height >= glyph_rows.len() as u16 && area.width >= glyph_width
    {
        let pad = area.height.saturating_sub(glyph_rows.len() as u16) / 2;
        std::iter::repeat(Line::from(""))
            .take(pad as usize)
            .chain(glyph_rows.into_iter().map(Line::from))
            .collect()
    } else {
        vec![Line::from(clock)]
    };

    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD));
    f.render_widget(p, area);
}

fn draw_buttons(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4].as_ref())
        .split(area);

    let selected = state.selected_button();
    for (button, col) in Button::ALL.iter().zip(cols.iter()) {
        let style = if *button == selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let label = Line::from(vec![
            Span::styled(button.label().to_string(), style),
            Span::styled(
                format!(" ({})", button.hotkey()),
                Style::default().fg(Color::Magenta),
            ),
        ]);
        let p = Paragraph::new(label)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(p, *col);
    }
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let (flag, flag_color) = if state.session.running {
        ("running", Color::Green)
    } else {
        ("stopped", Color::Yellow)
    };
    let line = Line::from(vec![
        Span::styled(flag, Style::default().fg(flag_color)),
        Span::raw("  "),
        Span::styled("Last sync:", Style::default().fg(Color::Gray)),
        Span::raw(format!(
            " {}  ",
            state.last_sync.as_deref().unwrap_or("-")
        )),
        Span::raw(state.info.clone()),
    ]);
    let p = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Status (? for help)"),
    );
    f.render_widget(p, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
