use crate::model::{SessionEvent, SessionState};
use crate::orchestrator::UiCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Start,
    Stop,
    Reset,
    Exit,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Start, Button::Stop, Button::Reset, Button::Exit];

    pub fn label(self) -> &'static str {
        match self {
            Button::Start => "Start",
            Button::Stop => "Stop",
            Button::Reset => "Reset",
            Button::Exit => "Exit",
        }
    }

    pub fn hotkey(self) -> char {
        match self {
            Button::Start => 's',
            Button::Stop => 't',
            Button::Reset => 'r',
            Button::Exit => 'q',
        }
    }

    pub fn command(self) -> UiCommand {
        match self {
            Button::Start => UiCommand::Start,
            Button::Stop => UiCommand::Stop,
            Button::Reset => UiCommand::Reset,
            Button::Exit => UiCommand::Quit,
        }
    }
}

pub struct UiState {
    pub session: SessionState,
    pub selected: usize,
    pub info: String,
    pub last_sync: Option<String>,
    pub show_help: bool,
    // False until the first read-back arrives.
    pub ready: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            session: SessionState::default(),
            selected: 0,
            info: "Preparing simulator…".into(),
            last_sync: None,
            show_help: false,
            ready: false,
        }
    }
}

impl UiState {
    pub fn selected_button(&self) -> Button {
        Button::ALL[self.selected % Button::ALL.len()]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % Button::ALL.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + Button::ALL.len() - 1) % Button::ALL.len();
    }

    /// Fold a controller event into the display state. Only the UI thread calls this.
    pub fn apply_event(&mut self, ev: SessionEvent) {
        match ev {
            SessionEvent::StateChanged {
                command,
                state,
                completed_at,
            } => {
                self.session = state;
                self.last_sync = Some(completed_at);
                if !self.ready {
                    self.ready = true;
                    self.info = "Ready".into();
                } else {
                    tracing::trace!(%command, "display refreshed");
                }
            }
            SessionEvent::Info(info) => {
                self.info = info.to_message();
            }
        }
    }

    /// Map a key press to a command for the controller. Navigation and help are handled
    /// locally and yield `None`.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<UiCommand> {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Esc) => {
                Some(UiCommand::Quit)
            }
            (_, KeyCode::Char('?')) => {
                self.show_help = !self.show_help;
                None
            }
            (_, KeyCode::Left) | (_, KeyCode::BackTab) | (_, KeyCode::Char('h')) => {
                self.select_prev();
                None
            }
            (_, KeyCode::Right) | (_, KeyCode::Tab) | (_, KeyCode::Char('l')) => {
                self.select_next();
                None
            }
            (_, KeyCode::Enter) | (_, KeyCode::Char(' ')) => {
                Some(self.selected_button().command())
            }
            (_, KeyCode::Char(c)) => {
                let button = Button::ALL.into_iter().find(|b| b.hotkey() == c)?;
                self.selected = Button::ALL
                    .iter()
                    .position(|b| *b == button)
                    .unwrap_or(self.selected);
                Some(button.command())
            }
            _ => None,
        }
    }
}

// 3x5 block glyphs for the large clock readout.
const GLYPH_ROWS: usize = 5;

fn glyph(c: char) -> [&'static str; GLYPH_ROWS] {
    match c {
        '0' => ["███", "█ █", "█ █", "█ █", "███"],
        '1' => ["  █", "  █", "  █", "  █", "  █"],
        '2' => ["███", "  █", "███", "█  ", "███"],
        '3' => ["███", "  █", "███", "  █", "███"],
        '4' => ["█ █", "█ █", "███", "  █", "  █"],
        '5' => ["███", "█  ", "███", "  █", "███"],
        '6' => ["███", "█  ", "███", "█ █", "███"],
        '7' => ["███", "  █", "  █", "  █", "  █"],
        '8' => ["███", "█ █", "███", "█ █", "███"],
        '9' => ["███", "█ █", "███", "  █", "███"],
        ':' => [" ", "█", " ", "█", " "],
        _ => ["   ", "   ", "   ", "   ", "   "],
    }
}

/// Render `text` (digits and `:`) as rows of block glyphs, one column of space between.
pub fn big_text(text: &str) -> Vec<String> {
    let mut rows = vec![String::new(); GLYPH_ROWS];
    for (i, c) in text.chars().enumerate() {
        let g = glyph(c);
        for (row, part) in rows.iter_mut().zip(g.iter()) {
            if i > 0 {
                row.push(' ');
            }
            row.push_str(part);
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InfoEvent;
    use crate::protocol::Command;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn hotkeys_issue_commands_and_move_selection() {
        let mut state = UiState::default();
        assert_eq!(state.handle_key(press(KeyCode::Char('r'))), Some(UiCommand::Reset));
        assert_eq!(state.selected_button(), Button::Reset);
        assert_eq!(state.handle_key(press(KeyCode::Char('s'))), Some(UiCommand::Start));
        assert_eq!(state.handle_key(press(KeyCode::Char('t'))), Some(UiCommand::Stop));
        assert_eq!(state.handle_key(press(KeyCode::Char('q'))), Some(UiCommand::Quit));
        assert_eq!(state.handle_key(press(KeyCode::Char('x'))), None);
        assert_eq!(
            state.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(UiCommand::Quit)
        );
    }

    #[test]
    fn arrows_wrap_and_enter_activates() {
        let mut state = UiState::default();
        assert_eq!(state.handle_key(press(KeyCode::Left)), None);
        assert_eq!(state.selected_button(), Button::Exit);
        assert_eq!(state.handle_key(press(KeyCode::Right)), None);
        assert_eq!(state.selected_button(), Button::Start);
        state.handle_key(press(KeyCode::Tab));
        assert_eq!(state.handle_key(press(KeyCode::Enter)), Some(UiCommand::Stop));
    }

    #[test]
    fn help_toggles_locally() {
        let mut state = UiState::default();
        assert_eq!(state.handle_key(press(KeyCode::Char('?'))), None);
        assert!(state.show_help);
        state.handle_key(press(KeyCode::Char('?')));
        assert!(!state.show_help);
    }

    #[test]
    fn events_replace_display_state() {
        let mut state = UiState::default();
        assert!(!state.ready);
        state.apply_event(SessionEvent::StateChanged {
            command: Command::Nop,
            state: SessionState {
                elapsed_seconds: 61,
                running: true,
            },
            completed_at: "10:00:01".into(),
        });
        assert!(state.ready);
        assert_eq!(state.session.clock(), "01:01");
        assert_eq!(state.last_sync.as_deref(), Some("10:00:01"));

        state.apply_event(SessionEvent::Info(InfoEvent::BuildFailed {
            reason: "iverilog: not found".into(),
        }));
        assert_eq!(state.info, "Build step failed: iverilog: not found");
        assert!(state.session.running);
    }

    #[test]
    fn big_text_rows_have_equal_width() {
        let rows = big_text("61:01");
        assert_eq!(rows.len(), GLYPH_ROWS);
        let width = rows[0].chars().count();
        // Four digits (3 wide), one colon (1 wide), four separators.
        assert_eq!(width, 4 * 3 + 1 + 4);
        assert!(rows.iter().all(|r| r.chars().count() == width));
    }
}
