use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerState {
    Closed,
    Open,
}

/// Tracks which record, if any, is shown in the details drawer.
/// Independent of the table's query state: a selection survives filter changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionDrawer {
    selected: Option<String>,
    state: DrawerState,
}

impl Default for SelectionDrawer {
    fn default() -> Self {
        Self {
            selected: None,
            state: DrawerState::Closed,
        }
    }
}

impl SelectionDrawer {
    /// Opens the drawer on `id`. Selecting while open only replaces the id.
    pub fn select(&mut self, id: &str) {
        trace!("Drawer {:?} -> Open({id})", self.state);
        self.selected = Some(id.to_string());
        self.state = DrawerState::Open;
    }

    /// The last selected id is kept after closing.
    pub fn close(&mut self) {
        self.state = DrawerState::Closed;
    }

    pub fn state(&self) -> DrawerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DrawerState::Open
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Id of the record to render, only while the drawer is open.
    pub fn open_id(&self) -> Option<&str> {
        match self.state {
            DrawerState::Open => self.selected(),
            DrawerState::Closed => None,
        }
    }
}
