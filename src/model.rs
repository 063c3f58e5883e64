use std::sync::Arc;
use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace, warn};

use crate::api::{Backend, Profile};
use crate::domain::{AppConfig, AppError, ApiError, HELP_TEXT, Message, RecordKind, ViewError};
use crate::drawer::SelectionDrawer;
use crate::inputter::{InputResult, Inputter};
use crate::roster::{
    STUDENT_FILTER_KEYS, SUBMISSION_FILTER_KEYS, Student, Submission, pending_count,
    student_schema, submission_schema,
};
use crate::schema::Record;
use crate::table::TabularViewController;
use crate::workspace::{Workspace, WorkspaceState};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Students,
    Submissions,
    Workspace,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Students, Tab::Submissions, Tab::Workspace];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Students => "Students",
            Tab::Submissions => "Submissions",
            Tab::Workspace => "Workspace",
        }
    }

    fn next(&self) -> Tab {
        match self {
            Tab::Students => Tab::Submissions,
            Tab::Submissions => Tab::Workspace,
            Tab::Workspace => Tab::Students,
        }
    }
}

impl From<RecordKind> for Tab {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Students => Tab::Students,
            RecordKind::Submissions => Tab::Submissions,
        }
    }
}

/// Everything the ui needs to draw one table page.
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub selected_row: usize,
    pub page: usize,
    pub page_count: usize,
    pub total_matching: usize,
    pub total_records: usize,
    pub search_text: String,
    pub filters: Vec<(&'static str, &'static str)>,
    pub sort_key: &'static str,
    pub drawer: Option<Vec<(&'static str, String)>>,
}

pub struct UIData {
    pub tab: Tab,
    pub title: String,
    pub greeting: String,
    pub trainer: Option<String>,
    pub profile_error: Option<String>,
    pub table: Option<TableData>,
    pub workspace: WorkspaceState,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

enum PaneOutcome {
    Nothing,
    Status(String),
    Copy(String),
}

/// A table tab: query state, row cursor and details drawer.
trait Pane {
    fn handle(&mut self, message: &Message) -> Result<PaneOutcome, ViewError>;
    fn search_text(&self) -> &str;
    fn set_search_text(&mut self, text: &str);
    fn filter_for_key(&self, key: char) -> Option<&'static str>;
    fn table_data(&self) -> TableData;
}

struct TablePane<R> {
    ctrl: TabularViewController<R>,
    drawer: SelectionDrawer,
    curser_row: usize,
    filter_keys: &'static [(char, &'static str)],
}

impl<R: Record + Sync> TablePane<R> {
    fn new(
        ctrl: TabularViewController<R>,
        filter_keys: &'static [(char, &'static str)],
    ) -> Self {
        Self {
            ctrl,
            drawer: SelectionDrawer::default(),
            curser_row: 0,
            filter_keys,
        }
    }

    fn selected_id(&self) -> Option<String> {
        self.ctrl
            .view()
            .rows
            .get(self.curser_row)
            .map(|r| r.id().to_string())
    }

    fn clamp_cursor(&mut self) {
        let nrows = self.ctrl.view().rows.len();
        self.curser_row = std::cmp::min(self.curser_row, nrows.saturating_sub(1));
    }

    // Moving the cursor while the drawer is open shows the new row in place.
    fn follow_cursor(&mut self) {
        if self.drawer.is_open()
            && let Some(id) = self.selected_id()
        {
            self.drawer.select(&id);
        }
    }

    fn selected_row_csv(&self) -> Option<String> {
        let view = self.ctrl.view();
        let record = view.rows.get(self.curser_row)?;
        let content = record
            .cells()
            .iter()
            .map(wrap_cell_content)
            .collect::<Vec<String>>();
        Some(content.join(","))
    }
}

impl<R: Record + Sync> Pane for TablePane<R> {
    fn handle(&mut self, message: &Message) -> Result<PaneOutcome, ViewError> {
        let outcome = match message {
            Message::MoveUp => {
                self.curser_row = self.curser_row.saturating_sub(1);
                self.follow_cursor();
                PaneOutcome::Nothing
            }
            Message::MoveDown => {
                self.curser_row += 1;
                self.clamp_cursor();
                self.follow_cursor();
                PaneOutcome::Nothing
            }
            Message::PrevPage | Message::NextPage | Message::FirstPage | Message::LastPage => {
                match message {
                    Message::PrevPage => self.ctrl.prev_page(),
                    Message::NextPage => self.ctrl.next_page(),
                    Message::FirstPage => self.ctrl.go_to_page(1),
                    _ => self.ctrl.last_page(),
                }
                self.curser_row = 0;
                PaneOutcome::Nothing
            }
            Message::CycleFilter(name) => {
                let value = self.ctrl.cycle_filter(name)?;
                self.curser_row = 0;
                PaneOutcome::Status(format!("Filter {name}: {value}"))
            }
            Message::ClearFilters => {
                self.ctrl.clear_filters();
                self.curser_row = 0;
                PaneOutcome::Status("Filters cleared".to_string())
            }
            Message::CycleSort => {
                let key = self.ctrl.cycle_sort();
                self.clamp_cursor();
                PaneOutcome::Status(format!("Sorted by {key}"))
            }
            Message::Enter => match self.selected_id() {
                Some(id) => {
                    self.drawer.select(&id);
                    PaneOutcome::Nothing
                }
                None => PaneOutcome::Status("Nothing selected".to_string()),
            },
            Message::Exit => {
                self.drawer.close();
                PaneOutcome::Nothing
            }
            Message::Copy => match self.selected_row_csv() {
                Some(row) => PaneOutcome::Copy(row),
                None => PaneOutcome::Nothing,
            },
            _ => PaneOutcome::Nothing,
        };
        Ok(outcome)
    }

    fn search_text(&self) -> &str {
        self.ctrl.search_text()
    }

    fn set_search_text(&mut self, text: &str) {
        self.ctrl.set_search_text(text);
        self.curser_row = 0;
    }

    fn filter_for_key(&self, key: char) -> Option<&'static str> {
        self.filter_keys
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, name)| *name)
    }

    fn table_data(&self) -> TableData {
        let view = self.ctrl.view();
        let drawer = self
            .drawer
            .open_id()
            .and_then(|id| self.ctrl.find(id))
            .map(|r| r.details());
        TableData {
            headers: R::columns().to_vec(),
            rows: view.rows.iter().map(|r| r.cells()).collect(),
            selected_row: self.curser_row,
            page: view.page,
            page_count: view.page_count,
            total_matching: view.total_matching,
            total_records: self.ctrl.records().len(),
            search_text: self.ctrl.search_text().to_string(),
            filters: self.ctrl.filter_selections(),
            sort_key: self.ctrl.sort_key(),
            drawer,
        }
    }
}

fn wrap_cell_content(c: &String) -> String {
    let needs_escaping = c.chars().any(|c| c == '"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping || needs_escaping {
        out = format!("\"{out}\"");
    }
    out
}

pub struct Model {
    config: AppConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    tab: Tab,
    students: TablePane<Student>,
    submissions: TablePane<Submission>,
    pending_reviews: usize,
    workspace: Workspace,
    backend: Box<dyn Backend>,
    profile: Result<Profile, ApiError>,
    clipboard: Option<Clipboard>,
    input: Inputter,
    last_input: InputResult,
    search_before_input: String,
    popup_message: String,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &AppConfig,
        students: Vec<Student>,
        submissions: Vec<Submission>,
        backend: Box<dyn Backend>,
        start: Tab,
    ) -> Result<Self, AppError> {
        let pending_reviews = pending_count(&submissions);
        let students = TablePane::new(
            TabularViewController::new(
                Arc::from(students),
                Arc::new(student_schema()?),
                config.page_size,
            )?,
            STUDENT_FILTER_KEYS,
        );
        let submissions = TablePane::new(
            TabularViewController::new(
                Arc::from(submissions),
                Arc::new(submission_schema()?),
                config.page_size,
            )?,
            SUBMISSION_FILTER_KEYS,
        );

        // Fetched once, like the dashboard does on mount.
        let profile = backend.profile();
        match &profile {
            Ok(p) => info!("Signed in as {}", p.display_name()),
            Err(e) => error!("Failed to fetch user profile: {e}"),
        }

        Ok(Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            tab: start,
            students,
            submissions,
            pending_reviews,
            workspace: Workspace::default(),
            backend,
            profile,
            clipboard: None,
            input: Inputter::default(),
            last_input: InputResult::default(),
            search_before_input: String::new(),
            popup_message: String::new(),
            status_message: "Started rtv! Press ? for help".to_string(),
            last_status_message_update: Instant::now(),
        })
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    /// Filter bound to `key` on the current tab.
    pub fn filter_for_key(&self, key: char) -> Option<&'static str> {
        self.pane().and_then(|p| p.filter_for_key(key))
    }

    fn pane(&self) -> Option<&dyn Pane> {
        match self.tab {
            Tab::Students => Some(&self.students as &dyn Pane),
            Tab::Submissions => Some(&self.submissions as &dyn Pane),
            Tab::Workspace => None,
        }
    }

    fn pane_mut(&mut self) -> Option<&mut dyn Pane> {
        match self.tab {
            Tab::Students => Some(&mut self.students as &mut dyn Pane),
            Tab::Submissions => Some(&mut self.submissions as &mut dyn Pane),
            Tab::Workspace => None,
        }
    }

    pub fn uidata(&self) -> UIData {
        let title = match self.tab {
            Tab::Submissions => format!("Submissions ({} pending review)", self.pending_reviews),
            tab => tab.title().to_string(),
        };
        let (greeting, trainer, profile_error) = match &self.profile {
            Ok(p) => (
                format!("Welcome back, {}!", p.display_name()),
                p.assigned_trainer
                    .as_ref()
                    .map(|t| format!("{} <{}>", t.display_name(), t.email)),
                None,
            ),
            Err(e) => (
                "Welcome back, Student!".to_string(),
                None,
                Some(format!("Could not load profile: {}", e.user_message())),
            ),
        };
        UIData {
            tab: self.tab,
            title,
            greeting,
            trainer,
            profile_error,
            table: self.pane().map(|p| p.table_data()),
            workspace: self.workspace.state().clone(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.popup_message.clone(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.modus == Modus::CMDINPUT,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        }
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), AppError> {
        self.update_at(message, Instant::now())
    }

    /// Applies one message and advances the workspace timers to `now`.
    pub fn update_at(&mut self, message: Option<Message>, now: Instant) -> Result<(), AppError> {
        if self.workspace.tick(now) {
            trace!("Workspace: {:?}", self.workspace.state());
        }

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::Help => self.show_help(),
                    Message::NextTab => self.next_tab(),
                    Message::Search => self.enter_cmd_mode(),
                    other => match self.tab {
                        Tab::Workspace => self.workspace_message(other, now),
                        _ => self.table_message(other),
                    },
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter | Message::Help => self.close_popup(),
                    _ => (),
                },
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn quit(&mut self) {
        if let Some(token) = self.config.refresh_token.as_deref() {
            match self.backend.logout(token) {
                Ok(_) => info!("Session invalidated"),
                Err(e) => warn!("Logout failed: {e}"),
            }
        }
        self.status = Status::QUITTING;
    }

    fn next_tab(&mut self) {
        self.tab = self.tab.next();
        debug!("Switched to tab {:?}", self.tab);
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = HELP_TEXT.to_string();
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
    }

    fn enter_cmd_mode(&mut self) {
        let Some(current) = self.pane().map(|p| p.search_text().to_string()) else {
            return;
        };
        trace!("Entering search input ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.input.set(&current);
        self.last_input = self.input.get();
        self.search_before_input = current;
    }

    // Search is applied while typing, Esc restores the text from before.
    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        let text = if self.last_input.canceled {
            self.search_before_input.clone()
        } else {
            self.last_input.input.clone()
        };
        if let Some(pane) = self.pane_mut() {
            pane.set_search_text(&text);
        }

        if self.last_input.finished {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::CMDINPUT;
            let matching = self
                .pane()
                .map(|p| p.table_data().total_matching)
                .unwrap_or(0);
            self.set_status_message(format!("{matching} matching records"));
        }
    }

    fn table_message(&mut self, message: Message) {
        let Some(pane) = self.pane_mut() else {
            return;
        };
        match pane.handle(&message) {
            Ok(PaneOutcome::Nothing) => {}
            Ok(PaneOutcome::Status(s)) => self.set_status_message(s),
            Ok(PaneOutcome::Copy(text)) => self.copy_to_clipboard(text, "row"),
            Err(e) => {
                error!("Table error: {e}");
                self.set_status_message(e.to_string());
            }
        }
    }

    fn workspace_message(&mut self, message: Message, now: Instant) {
        match message {
            Message::Enter => {
                if *self.workspace.state() == WorkspaceState::Inactive {
                    self.workspace.launch(self.backend.as_ref(), now);
                } else {
                    self.workspace.retry(self.backend.as_ref(), now);
                }
            }
            Message::CancelWorkspace => self.workspace.cancel(),
            Message::Copy => {
                if let Some(url) = self.workspace.url().map(str::to_string) {
                    self.copy_to_clipboard(url, "workspace url");
                }
            }
            _ => (),
        }
    }

    fn copy_to_clipboard(&mut self, text: String, what: &str) {
        if self.clipboard.is_none() {
            self.clipboard = Clipboard::new()
                .map_err(|e| warn!("Clipboard unavailable: {e:?}"))
                .ok();
        }
        let message = match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(text) {
                Ok(_) => format!("Copied {what} to clipboard."),
                Err(e) => {
                    trace!("Error copying to clipboard: {:?}", e);
                    "Error copying to clipboard".to_string()
                }
            },
            None => "Clipboard unavailable".to_string(),
        };
        self.set_status_message(message);
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }
}
