//! Listing engine: REST client, task stream and the background runtime that executes effects.
mod api;
mod engine;
mod stream;
mod types;

pub use api::{ApiClient, Backend, ClientSettings, DEFAULT_API_URL};
pub use engine::EngineHandle;
pub use stream::{
    decode_event, subscribe, ChannelStreamHandler, StreamItem, Subscription, TaskStreamHandler,
    CONNECTED_EVENT,
};
pub use types::{ApiError, EngineEvent, FailureKind, Request};
