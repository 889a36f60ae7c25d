use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use client_logging::{client_info, client_warn};
use listing_core::filter::{field_kind, PAGE_KEY};
use listing_core::{
    AuthUser, Change, Effect, FavoritesSet, FilterSession, Msg, ObjectPage, Session, TaskRowView,
};
use listing_engine::{ApiClient, ApiError, Backend, EngineEvent, FailureKind, Request};
use tokio::runtime::Runtime;

use crate::cli::{Cli, Command, FavoritesCommand};
use crate::config::ClientConfig;
use super::effects::{Driver, EffectRunner};
use super::persistence::{SessionStore, StoredSession};
use super::ui::render;

const POLL: Duration = Duration::from_millis(250);
const REPLY_TIMEOUT: Duration = Duration::from_secs(60);

pub fn run(cli: Cli, config: ClientConfig) -> Result<()> {
    let app = App::new(config, SessionStore::new(cli.state_dir()))?;
    app.run(cli.command)
}

pub struct App {
    config: ClientConfig,
    store: SessionStore,
    client: ApiClient,
    runtime: Runtime,
}

impl App {
    pub fn new(config: ClientConfig, store: SessionStore) -> Result<Self> {
        let token = store.load().map(|session| session.token);
        let client = ApiClient::new(&config.client_settings(), token)
            .with_context(|| format!("cannot use api_url {:?}", config.api_url))?;
        let runtime = Runtime::new().context("could not start async runtime")?;
        Ok(Self {
            config,
            store,
            client,
            runtime,
        })
    }

    pub fn run(&self, command: Command) -> Result<()> {
        client_info!("Running {}", command_name(&command));
        match command {
            Command::Login { email, password } => self.login(&email, &password),
            Command::Register { email, password } => self.register(&email, &password),
            Command::Logout => self.logout(),
            Command::Whoami => self.whoami(),
            Command::Tasks { page } => self.tasks(page),
            Command::Task { id } => self.task(&id),
            Command::Monitor { seconds } => self.monitor(seconds.map(Duration::from_secs)),
            Command::Actualize {
                object_id,
                wait,
                timeout_secs,
            } => self.actualize(&object_id, wait, Duration::from_secs(timeout_secs)),
            Command::FindNew {
                categories,
                regions,
            } => self.start_job(Msg::FindNewRequested {
                categories,
                regions,
            }),
            Command::ActualizeActive { category, limit } => {
                self.start_job(Msg::ActualizeActiveRequested { category, limit })
            }
            Command::ActualizeArchived { category, limit } => {
                self.start_job(Msg::ActualizeArchivedRequested { category, limit })
            }
            Command::Search {
                query,
                assignments,
                page,
            } => self.search(query.as_deref().unwrap_or(""), &assignments, page),
            Command::Object { id } => self.object(&id),
            Command::Favorites { action } => match action {
                FavoritesCommand::List { page } => self.list_favorites(page),
                FavoritesCommand::Add { object_id } => self.set_favorite(&object_id, true),
                FavoritesCommand::Remove { object_id } => self.set_favorite(&object_id, false),
            },
            Command::Dictionaries => self.dictionaries(),
        }
    }

    fn block<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn login(&self, email: &str, password: &str) -> Result<()> {
        let token = self
            .block(self.client.login(email, password))
            .context("sign-in failed")?;
        self.remember(token, email)
    }

    fn register(&self, email: &str, password: &str) -> Result<()> {
        let token = self
            .block(self.client.register(email, password))
            .context("registration failed")?;
        self.remember(token, email)
    }

    fn remember(&self, token: String, email: &str) -> Result<()> {
        let client = self.client.with_token(Some(token.clone()));
        let user = self.block(client.validate()).context("issued token was rejected")?;
        self.store.save(&StoredSession {
            token,
            email: Some(email.to_string()),
            saved_at: Utc::now(),
        })?;
        println!("Signed in as {} ({})", user.email, user.role);
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        if self.store.clear()? {
            println!("Signed out.");
        } else {
            println!("Not signed in.");
        }
        Ok(())
    }

    fn whoami(&self) -> Result<()> {
        if self.client.token().is_none() {
            println!("Not signed in.");
            return Ok(());
        }
        let user = self.current_user()?;
        println!("{} ({}) id {}", user.email, user.role, user.id);
        Ok(())
    }

    fn current_user(&self) -> Result<AuthUser> {
        if self.client.token().is_none() {
            bail!("not signed in; run `listing login` first");
        }
        self.block(self.client.validate())
            .map_err(|err| explain(err, "could not validate session"))
    }

    fn tasks(&self, page: u32) -> Result<()> {
        let listing = self
            .block(self.client.tasks(page.max(1), self.config.tasks_per_page))
            .map_err(|err| explain(err, "could not load tasks"))?;
        let rows: Vec<TaskRowView> = listing.data.iter().map(TaskRowView::from_task).collect();
        print!("{}", render::render_task_rows(&rows));
        println!("Page {} ({} tasks in total)", listing.page.max(1), listing.total);
        Ok(())
    }

    fn task(&self, id: &str) -> Result<()> {
        let task = self
            .block(self.client.task(id))
            .map_err(|err| explain(err, "could not load task"))?;
        print!("{}", render::render_task(&task));
        Ok(())
    }

    /// Validates the session and returns a driver plus the effects of signing in.
    fn signed_in_driver(&self) -> Result<(Driver, Vec<Effect>)> {
        let user = self.current_user()?;
        let mut session = Session::new(self.config.state_settings());
        let effects = session.dispatch(Msg::SessionStarted(user));
        let runner = EffectRunner::new(self.client.clone()).context("could not start engine")?;
        Ok((Driver::new(session, runner), effects))
    }

    fn monitor(&self, duration: Option<Duration>) -> Result<()> {
        let (mut driver, effects) = self.signed_in_driver()?;
        let dirty = Arc::new(AtomicBool::new(true));
        let flag = dirty.clone();
        driver.session_mut().subscribe(move |change, _state| {
            if !matches!(change, Change::Favorites | Change::Filters | Change::Auth) {
                flag.store(true, Ordering::Relaxed);
            }
        });
        driver.runner().run(effects);

        let deadline = duration.map(|duration| Instant::now() + duration);
        loop {
            if dirty.swap(false, Ordering::Relaxed) {
                print!("{}", render::render_monitor(&driver.session().view()));
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(());
            }
            if let Some(EngineEvent::StreamFailed(err)) = driver.step(POLL) {
                print!("{}", render::render_monitor(&driver.session().view()));
                return Err(explain(err, "task stream closed"));
            }
        }
    }

    fn actualize(&self, object_id: &str, wait: bool, timeout: Duration) -> Result<()> {
        let (mut driver, effects) = self.signed_in_driver()?;
        if wait {
            // Subscribe first so the completion event cannot slip past.
            driver.runner().run(effects);
            await_event(&mut driver, REPLY_TIMEOUT, |event| {
                matches!(
                    event,
                    EngineEvent::StreamConnected | EngineEvent::StreamFailed(_)
                )
            })?;
            if !driver.session().state().is_live() {
                bail!(notice_text(&driver));
            }
        }

        driver.dispatch(Msg::ActualizeRequested {
            object_id: object_id.to_string(),
        });
        if !driver.session().state().signals().is_processing(object_id) {
            bail!(notice_text(&driver));
        }

        let started = await_event(&mut driver, REPLY_TIMEOUT, |event| {
            matches!(event, EngineEvent::JobStarted { .. })
        })?;
        match started {
            EngineEvent::JobStarted {
                result: Ok(task_id),
                ..
            } => println!("Refresh of {object_id} queued as task {task_id}"),
            _ => bail!(notice_text(&driver)),
        }
        if !wait {
            return Ok(());
        }

        let deadline = Instant::now() + timeout;
        while driver.session().state().signals().is_processing(object_id) {
            if Instant::now() >= deadline {
                bail!("timed out waiting for the refresh of {object_id}");
            }
            if let Some(EngineEvent::StreamFailed(err)) = driver.step(POLL) {
                return Err(explain(err, "task stream closed"));
            }
        }

        match driver.session().state().signals().last_updated(object_id) {
            Some(at) => {
                println!("Object {object_id} updated at {}", at.to_rfc3339());
                Ok(())
            }
            None => bail!(notice_text(&driver)),
        }
    }

    fn start_job(&self, msg: Msg) -> Result<()> {
        let (mut driver, _) = self.signed_in_driver()?;
        if driver.dispatch(msg) == 0 {
            bail!(notice_text(&driver));
        }
        let started = await_event(&mut driver, REPLY_TIMEOUT, |event| {
            matches!(event, EngineEvent::JobStarted { .. })
        })?;
        match started {
            EngineEvent::JobStarted {
                job,
                result: Ok(task_id),
            } => {
                println!("Started {} as task {task_id}", job.kind().describe());
                Ok(())
            }
            _ => bail!(notice_text(&driver)),
        }
    }

    /// Favorite ids of the signed-in user; empty when signed out or unavailable.
    fn favorite_ids(&self) -> Vec<String> {
        if self.client.token().is_none() {
            return Vec::new();
        }
        self.block(self.client.favorite_ids()).unwrap_or_else(|err| {
            client_warn!("Could not load favorites: {err}");
            Vec::new()
        })
    }

    fn search(&self, query: &str, assignments: &[(String, String)], page: Option<u32>) -> Result<()> {
        let mut filters = FilterSession::from_url(query);
        for (key, value) in assignments {
            if key != PAGE_KEY && field_kind(key).is_none() {
                bail!("unknown filter field {key:?}");
            }
            filters.set_field(key, value);
        }
        if let Some(page) = page {
            filters.set_page(page);
        }

        let runner = EffectRunner::new(self.client.clone()).context("could not start engine")?;
        let mut driver = Driver::new(Session::new(self.config.state_settings()), runner);
        driver.dispatch(Msg::FavoritesLoaded(self.favorite_ids()));
        driver.dispatch(Msg::FiltersRestored(filters.url_query()));

        let mut listings = None;
        let mut options = None;
        let deadline = Instant::now() + REPLY_TIMEOUT;
        while listings.is_none() || options.is_none() {
            if Instant::now() >= deadline {
                bail!("timed out waiting for the backend");
            }
            match driver.step(POLL) {
                Some(EngineEvent::ListingsLoaded(result)) => listings = Some(result),
                Some(EngineEvent::FilterOptionsLoaded(result)) => options = Some(result),
                _ => {}
            }
        }

        let page: ObjectPage = listings
            .context("no listing reply")?
            .map_err(|err| explain(err, "search failed"))?;
        let ids: Vec<String> = page
            .objects
            .iter()
            .map(|card| card.master_object_id.clone())
            .collect();
        driver.dispatch(Msg::ObjectsWatched(ids));

        let state = driver.session().state();
        print!("{}", render::render_cards(&page.objects, state.favorites()));
        println!(
            "Page {} of {} results, {} per page",
            state.filters().page(),
            page.total,
            self.config.per_page
        );
        match options {
            Some(Ok(options)) => print!("{}", render::render_filter_options(&options)),
            Some(Err(err)) => client_warn!("Filter options unavailable: {err}"),
            None => {}
        }
        println!("Query: {}", state.filters().url_query());
        Ok(())
    }

    fn object(&self, id: &str) -> Result<()> {
        let view = self
            .block(self.client.object(id))
            .map_err(|err| explain(err, "could not load object"))?;
        let liked = self.favorite_ids().contains(&view.general.master_object_id);
        print!("{}", render::render_object(&view, liked));
        Ok(())
    }

    fn list_favorites(&self, page: u32) -> Result<()> {
        let listing = self
            .block(self.client.favorites(page.max(1), self.config.per_page))
            .map_err(|err| explain(err, "could not load favorites"))?;
        let mut liked = FavoritesSet::new();
        liked.load(
            listing
                .data
                .iter()
                .flat_map(|card| [card.id.clone(), card.master_object_id.clone()]),
        );
        print!("{}", render::render_cards(&listing.data, &liked));
        println!("{} favorites in total", listing.total);
        Ok(())
    }

    fn set_favorite(&self, object_id: &str, liked: bool) -> Result<()> {
        let (mut driver, _) = self.signed_in_driver()?;
        driver.runner().submit(Request::FetchFavoriteIds);
        let loaded = await_event(&mut driver, REPLY_TIMEOUT, |event| {
            matches!(event, EngineEvent::FavoriteIdsLoaded(_))
        })?;
        if let EngineEvent::FavoriteIdsLoaded(Err(err)) = loaded {
            return Err(explain(err, "could not load favorites"));
        }

        if driver.session().state().favorites().has(object_id) == liked {
            let state = if liked { "already" } else { "not" };
            println!("{object_id} is {state} a favorite.");
            return Ok(());
        }

        driver.dispatch(Msg::FavoriteToggled {
            object_id: object_id.to_string(),
        });
        let changed = await_event(&mut driver, REPLY_TIMEOUT, |event| {
            matches!(event, EngineEvent::FavoriteChanged { .. })
        })?;
        match changed {
            EngineEvent::FavoriteChanged { result: Ok(()), .. } => {
                let verb = if liked { "Added" } else { "Removed" };
                println!("{verb} {object_id}.");
                Ok(())
            }
            _ => bail!(notice_text(&driver)),
        }
    }

    fn dictionaries(&self) -> Result<()> {
        let dictionaries = self
            .block(self.client.dictionaries())
            .map_err(|err| explain(err, "could not load dictionaries"))?;
        print!("{}", render::render_dictionaries(&dictionaries));
        Ok(())
    }
}

/// Steps the driver until an event matches or `timeout` passes.
fn await_event<F>(driver: &mut Driver, timeout: Duration, mut wanted: F) -> Result<EngineEvent>
where
    F: FnMut(&EngineEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(event) = driver.step(POLL) {
            if wanted(&event) {
                return Ok(event);
            }
        }
    }
    bail!("timed out waiting for the backend")
}

fn notice_text(driver: &Driver) -> String {
    driver
        .session()
        .state()
        .notice()
        .map(|notice| notice.text.clone())
        .unwrap_or_else(|| "request was not accepted".to_string())
}

fn explain(err: ApiError, what: &str) -> anyhow::Error {
    match err.kind {
        FailureKind::Unauthorized => {
            anyhow!("{what}: {err} (sign in with `listing login`)")
        }
        _ => anyhow!(err).context(what.to_string()),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Login { .. } => "login",
        Command::Register { .. } => "register",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::Tasks { .. } => "tasks",
        Command::Task { .. } => "task",
        Command::Monitor { .. } => "monitor",
        Command::Actualize { .. } => "actualize",
        Command::FindNew { .. } => "find-new",
        Command::ActualizeActive { .. } => "actualize-active",
        Command::ActualizeArchived { .. } => "actualize-archived",
        Command::Search { .. } => "search",
        Command::Object { .. } => "object",
        Command::Favorites { .. } => "favorites",
        Command::Dictionaries => "dictionaries",
    }
}
