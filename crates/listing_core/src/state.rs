use std::collections::BTreeSet;
use std::time::Duration;

use crate::auth::AuthState;
use crate::debounce::{Debouncer, DEFAULT_FILTER_DEBOUNCE};
use crate::favorites::FavoritesSet;
use crate::filter::FilterSession;
use crate::registry::TaskRegistry;
use crate::signals::ActualizationSignals;
use crate::view_model::AppViewModel;

/// Something observers may want to re-read after a message was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The task list was replaced or reordered.
    Tasks,
    /// One task changed in place or was prepended.
    Task(String),
    /// An object entered or left "processing".
    Processing(String),
    /// An object finished a refresh; views showing it should refetch.
    ObjectUpdated(String),
    Favorites,
    Filters,
    Live(bool),
    Notice,
    Auth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Dismissible inline message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSettings {
    pub tasks_per_page: u32,
    pub listings_per_page: u32,
    pub filter_debounce: Duration,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            tasks_per_page: 20,
            listings_per_page: 5,
            filter_debounce: DEFAULT_FILTER_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    settings: StateSettings,
    pub(crate) auth: AuthState,
    pub(crate) live: bool,
    pub(crate) tasks: TaskRegistry,
    pub(crate) signals: ActualizationSignals,
    pub(crate) favorites: FavoritesSet,
    pub(crate) filters: FilterSession,
    pub(crate) options_debounce: Debouncer,
    pub(crate) watched: BTreeSet<String>,
    pub(crate) notice: Option<Notice>,
    changes: Vec<Change>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_settings(StateSettings::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: StateSettings) -> Self {
        Self {
            settings,
            auth: AuthState::default(),
            live: false,
            tasks: TaskRegistry::new(),
            signals: ActualizationSignals::new(),
            favorites: FavoritesSet::new(),
            filters: FilterSession::new(),
            options_debounce: Debouncer::new(settings.filter_debounce),
            watched: BTreeSet::new(),
            notice: None,
            changes: Vec::new(),
        }
    }

    pub fn settings(&self) -> StateSettings {
        self.settings
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    pub fn signals(&self) -> &ActualizationSignals {
        &self.signals
    }

    pub fn favorites(&self) -> &FavoritesSet {
        &self.favorites
    }

    pub fn filters(&self) -> &FilterSession {
        &self.filters
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_watched(&self, object_id: &str) -> bool {
        self.watched.contains(object_id)
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel::build(self)
    }

    /// Drains the changes recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    pub(crate) fn record(&mut self, change: Change) {
        if !self.changes.contains(&change) {
            self.changes.push(change);
        }
    }

    pub(crate) fn set_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            text: text.into(),
        });
        self.record(Change::Notice);
    }

    pub(crate) fn set_live(&mut self, live: bool) {
        if self.live != live {
            self.live = live;
            self.record(Change::Live(live));
        }
    }
}
