use crate::effect::Effect;
use crate::msg::Msg;
use crate::state::{AppState, Change, StateSettings};
use crate::update::update;
use crate::view_model::AppViewModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&Change, &AppState) + Send>;

/// Client state for one application session, with explicit change listeners.
///
/// Construct one per session and pass it to whatever needs it.
pub struct Session {
    state: AppState,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(StateSettings::default())
    }
}

impl Session {
    pub fn new(settings: StateSettings) -> Self {
        Self {
            state: AppState::with_settings(settings),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    /// Registers a listener called after every message for each recorded change.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Change, &AppState) + Send + 'static,
    {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if the listener was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Applies a message, notifies listeners and returns the effects to run.
    pub fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (mut next, effects) = update(state, msg);
        let changes = next.take_changes();
        self.state = next;

        for change in &changes {
            for (_, listener) in self.listeners.iter_mut() {
                listener(change, &self.state);
            }
        }
        effects
    }
}
