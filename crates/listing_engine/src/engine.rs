use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use client_logging::{client_debug, client_warn};

use crate::api::{ApiClient, Backend};
use crate::stream::{subscribe, ChannelStreamHandler, Subscription};
use crate::{ApiError, EngineEvent, Request};

/// Runs backend requests and the task stream on a background tokio runtime.
///
/// At most one task stream is open; opening another replaces it.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<Request>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(client: ApiClient) -> io::Result<Self> {
        let runtime = tokio::runtime::Runtime::new()?;
        let (cmd_tx, cmd_rx) = mpsc::channel::<Request>();
        let (event_tx, event_rx) = mpsc::channel();

        thread::Builder::new()
            .name("listing-engine".to_string())
            .spawn(move || {
                let backend: Arc<dyn Backend> = Arc::new(client.clone());
                let mut stream: Option<Subscription> = None;

                while let Ok(request) = cmd_rx.recv() {
                    match request {
                        Request::OpenTaskStream => {
                            if let Some(previous) = stream.take() {
                                previous.unsubscribe();
                            }
                            let handler = ChannelStreamHandler::new(event_tx.clone());
                            stream = Some(subscribe(runtime.handle(), &client, handler));
                        }
                        Request::CloseTaskStream => {
                            if let Some(current) = stream.take() {
                                current.unsubscribe();
                            }
                        }
                        other => {
                            let backend = backend.clone();
                            let event_tx = event_tx.clone();
                            runtime.spawn(async move {
                                handle_request(backend.as_ref(), other, &event_tx).await;
                            });
                        }
                    }
                }
                client_debug!("Engine command channel closed");
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn submit(&self, request: impl Into<Request>) {
        let _ = self.cmd_tx.send(request.into());
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_request(
    backend: &dyn Backend,
    request: Request,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    client_debug!("Running {request:?}");
    let event = match request {
        Request::OpenTaskStream | Request::CloseTaskStream => return,
        Request::FetchTasks {
            ticket,
            page,
            per_page,
        } => EngineEvent::TasksLoaded {
            ticket,
            result: logged("task list", backend.tasks(page, per_page).await),
        },
        Request::FetchFavoriteIds => {
            EngineEvent::FavoriteIdsLoaded(logged("favorite ids", backend.favorite_ids().await))
        }
        Request::FetchFavorites { page, limit } => {
            EngineEvent::FavoritesLoaded(logged("favorites", backend.favorites(page, limit).await))
        }
        Request::StartJob(job) => {
            let result = logged("job start", backend.start_job(&job).await);
            EngineEvent::JobStarted { job, result }
        }
        Request::SetFavorite { object_id, liked } => {
            let result = if liked {
                backend.add_favorite(&object_id).await
            } else {
                backend.remove_favorite(&object_id).await
            };
            EngineEvent::FavoriteChanged {
                object_id,
                liked,
                result: logged("favorite update", result),
            }
        }
        Request::FetchFilterOptions { query } => EngineEvent::FilterOptionsLoaded(logged(
            "filter options",
            backend.filter_options(&query).await,
        )),
        Request::FetchListings { query } => {
            EngineEvent::ListingsLoaded(logged("listings", backend.listings(&query).await))
        }
        Request::FetchObject { object_id } => {
            let result = logged("object", backend.object(&object_id).await);
            EngineEvent::ObjectLoaded { object_id, result }
        }
    };
    let _ = event_tx.send(event);
}

fn logged<T>(what: &str, result: Result<T, ApiError>) -> Result<T, ApiError> {
    if let Err(err) = &result {
        client_warn!("Request for {what} failed: {err}");
    }
    result
}
