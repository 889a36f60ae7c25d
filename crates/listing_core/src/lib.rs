//! Listing client core: task reconciliation, client-side stores and the pure update loop.
mod auth;
mod debounce;
mod effect;
mod favorites;
pub mod filter;
mod msg;
mod objects;
mod registry;
mod session;
mod signals;
mod state;
mod task;
mod update;
mod view_model;

pub use auth::{AuthState, AuthUser};
pub use debounce::{Debouncer, DEFAULT_FILTER_DEBOUNCE};
pub use effect::{Effect, JobRequest};
pub use favorites::FavoritesSet;
pub use filter::{FilterSession, FilterState, FilterValue};
pub use msg::{FailureClass, JobKind, Msg, RequestFailure};
pub use objects::{
    ApartmentDetails, CommercialDetails, DetailsError, Dictionaries, DictionaryItem,
    FavoritesPage, FilterOption, FilterOptions, HouseDetails, ObjectCard, ObjectDetails,
    ObjectGeneral, ObjectPage, ObjectView, ObjectViewError, RelatedOffer, TasksPage,
};
pub use registry::{FetchTicket, TaskRegistry};
pub use session::{ListenerId, Session};
pub use signals::{ActualizationSignals, SignalOutcome};
pub use state::{AppState, Change, Notice, NoticeLevel, StateSettings};
pub use task::{
    progress, ResultSummary, Task, TaskDecodeError, TaskId, TaskStatus, TaskType,
};
pub use update::update;
pub use view_model::{AppViewModel, StatusBadge, TaskRowView};
