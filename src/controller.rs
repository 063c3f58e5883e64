use std::time::Duration;
use tracing::trace;

use crate::domain::{AppConfig, AppError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits up to the poll time for a key press. `None` still lets the
    /// model advance its timers.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, AppError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            return Ok(self.handle_key(key, model));
        }
        Ok(None)
    }

    pub fn handle_key(&self, key: KeyEvent, model: &Model) -> Option<Message> {
        if model.raw_keyevents() {
            return Some(Message::RawKey(key));
        }

        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Tab, _) => Some(Message::NextTab),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left, _) => Some(Message::PrevPage),
            (KeyCode::Right, _) => Some(Message::NextPage),
            (KeyCode::Home, _) => Some(Message::FirstPage),
            (KeyCode::End, _) => Some(Message::LastPage),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('c'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('o'), _) => Some(Message::CycleSort),
            (KeyCode::Char('y'), _) => Some(Message::Copy),
            (KeyCode::Char('x'), _) => Some(Message::CancelWorkspace),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Char(c), _) => model.filter_for_key(c).map(Message::CycleFilter),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
