mod app;
mod cache;
mod cli;
mod config;
mod context;
mod input;
mod kafkactl;
mod logging;
mod model;
mod ui;
mod views;

use anyhow::{Context, Result};
use app::{App, AppCommand, AppEvent};
use cache::DiskCache;
use clap::Parser;
use cli::CliArgs;
use config::{Config, ConfigError, discover_config_path};
use context::{ContextManager, ContextSummary};
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use kafkactl::{ConnectorAction, ResourceClient, ToolCommand};
use logging::LogSession;
use model::{ResourceKind, ViewKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};
use views::FetchRequest;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let log_session = LogSession::init(args.debug, &args.log_filter)?;
    if let Some(path) = log_session.path() {
        info!("writing debug log to {}", path.display());
    }

    let result = launch(&args).await;
    if let Err(error) = &result {
        error!("{error:#}");
    }
    let shutdown = log_session.shutdown();
    result.and(shutdown)
}

async fn launch(args: &CliArgs) -> Result<()> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => discover_config_path().ok_or(ConfigError::NoPath)?,
    };
    let config = Config::load_from(&config_path)?;
    let mut contexts = ContextManager::new(config, config_path)?;
    if let Some(name) = &args.context {
        contexts
            .switch_context(name)
            .with_context(|| format!("failed to switch to context {name}"))?;
    }
    info!("starting in context {}", contexts.current_name());

    let tool = ToolCommand::parse(&args.kafkactl).context("--kafkactl must name a program")?;
    debug!("using {} for resource queries", tool.program());
    let cache = if args.no_cache {
        None
    } else {
        open_cache(args.cache_dir.clone())
    };
    let base_client = ResourceClient::new(
        tool,
        cache,
        Duration::from_secs(args.refresh_secs.max(1)),
    );

    let summary = contexts.summary();
    let client = base_client.with_scope(&cache_scope(&summary));
    let mut app = App::new(summary, contexts.list_contexts());
    let (events, events_rx) = mpsc::unbounded_channel();
    let mut session = Session {
        base_client,
        client,
        contexts,
        events,
        refresh: RefreshTimer::default(),
    };

    run(&mut app, &mut session, events_rx).await
}

fn open_cache(dir: Option<PathBuf>) -> Option<DiskCache> {
    let Some(dir) = dir.or_else(DiskCache::default_dir) else {
        warn!("HOME is not set, running without a disk cache");
        return None;
    };
    match DiskCache::open(dir) {
        Ok(cache) => {
            info!("caching kafkactl output in {}", cache.dir().display());
            Some(cache)
        }
        Err(error) => {
            warn!("running without a disk cache: {error}");
            None
        }
    }
}

fn cache_scope(context: &ContextSummary) -> String {
    format!("{}/{}", context.name, context.namespace)
}

async fn run(
    app: &mut App,
    session: &mut Session,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, session, events_rx).await;
    session.refresh.stop();
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    session: &mut Session,
    mut events_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    let size = terminal.size().context("failed to read terminal size")?;
    app.resize(size.width, size.height);
    let commands = app.start();
    session.execute(app, commands);

    let mut reader = EventStream::new();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let commands = app.apply_action(action);
                            session.execute(app, commands);
                        }
                    }
                    Some(Ok(Event::Resize(width, height))) => app.resize(width, height),
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_event = events_rx.recv() => {
                if let Some(event) = maybe_event {
                    let commands = app.handle_event(event);
                    session.execute(app, commands);
                }
            }
        }
    }

    Ok(())
}

/// Everything the loop needs to carry out controller commands.
struct Session {
    base_client: ResourceClient,
    client: ResourceClient,
    contexts: ContextManager,
    events: mpsc::UnboundedSender<AppEvent>,
    refresh: RefreshTimer,
}

impl Session {
    fn execute(&mut self, app: &mut App, commands: Vec<AppCommand>) {
        let mut queue = VecDeque::from(commands);
        while let Some(command) = queue.pop_front() {
            match command {
                AppCommand::Fetch { view, request } => self.spawn_fetch(view, request),
                AppCommand::DescribeLive {
                    view,
                    kind,
                    name,
                    seq,
                } => self.spawn_describe(view, kind, name, seq),
                AppCommand::Connector { view, action, name } => {
                    self.spawn_connector_action(view, action, name)
                }
                AppCommand::StartRefreshTimer(view) => {
                    self.refresh
                        .start(view, self.client.refresh_interval(), self.events.clone())
                }
                AppCommand::SwitchContext(name) => match self.contexts.switch_context(&name) {
                    Ok(()) => queue.extend(self.rescope(app)),
                    Err(error) => app.set_status(format!("Failed to switch context: {error}")),
                },
                AppCommand::SetNamespace(namespace) => {
                    match self.contexts.set_namespace(&namespace) {
                        Ok(()) => queue.extend(self.rescope(app)),
                        Err(error) => app.set_status(format!("Failed to set namespace: {error}")),
                    }
                }
                AppCommand::InvalidateCache => match self.client.invalidate_cache() {
                    Ok(()) => app.set_status("Cache invalidated"),
                    Err(error) => app.set_status(format!("Failed to invalidate cache: {error}")),
                },
            }
        }
    }

    fn rescope(&mut self, app: &mut App) -> Vec<AppCommand> {
        let summary = self.contexts.summary();
        self.client = self.base_client.with_scope(&cache_scope(&summary));
        app.context_changed(summary)
    }

    fn spawn_fetch(&self, view: ViewKind, request: FetchRequest) {
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client
                .fetch(request.kind, &request.args, request.force)
                .await
                .map_err(|error| {
                    warn!("fetching {} failed: {error}", request.kind.cli_name());
                    error.to_string()
                });
            let _ = events.send(AppEvent::Fetched {
                view,
                target: request.target,
                seq: request.seq,
                result,
            });
        });
    }

    fn spawn_describe(&self, view: ViewKind, kind: ResourceKind, name: String, seq: u64) {
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client
                .resource_yaml(kind, &name)
                .await
                .map_err(|error| error.to_string());
            let _ = events.send(AppEvent::Described {
                view,
                name,
                seq,
                result,
            });
        });
    }

    fn spawn_connector_action(&self, view: ViewKind, action: ConnectorAction, name: String) {
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client
                .connector_action(action, &name)
                .await
                .map_err(|error| error.to_string());
            info!("{} connector {name}: {}", action.verb(), if result.is_ok() { "ok" } else { "failed" });
            let _ = events.send(AppEvent::ConnectorDone {
                view,
                action,
                name,
                result,
            });
        });
    }
}

/// Periodic refresh for the active view. Starting a new timer aborts the previous one.
#[derive(Default)]
struct RefreshTimer {
    task: Option<JoinHandle<()>>,
}

impl RefreshTimer {
    fn start(&mut self, view: ViewKind, period: Duration, events: mpsc::UnboundedSender<AppEvent>) {
        self.stop();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if events.send(AppEvent::RefreshTick(view)).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
