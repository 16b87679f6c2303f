use crate::context::ContextSummary;
use crate::input::Action;
use crate::kafkactl::ConnectorAction;
use crate::model::{ResourceKind, ViewKind};
use crate::views::{FetchRequest, FetchResult, FetchTarget, View, ViewCommand, ViewEvent, ViewOutput};
use tracing::debug;

pub const HEADER_HEIGHT: u16 = 1;
pub const FOOTER_HEIGHT: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Command,
    Filter,
}

/// Side effects the event loop runs on behalf of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Fetch {
        view: ViewKind,
        request: FetchRequest,
    },
    DescribeLive {
        view: ViewKind,
        kind: ResourceKind,
        name: String,
        seq: u64,
    },
    Connector {
        view: ViewKind,
        action: ConnectorAction,
        name: String,
    },
    StartRefreshTimer(ViewKind),
    SwitchContext(String),
    SetNamespace(String),
    InvalidateCache,
}

/// Completions delivered back into the event loop.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Fetched {
        view: ViewKind,
        target: FetchTarget,
        seq: u64,
        result: FetchResult,
    },
    Described {
        view: ViewKind,
        name: String,
        seq: u64,
        result: Result<String, String>,
    },
    ConnectorDone {
        view: ViewKind,
        action: ConnectorAction,
        name: String,
        result: Result<String, String>,
    },
    RefreshTick(ViewKind),
}

#[derive(Debug, Default)]
pub struct CommandInput {
    buffer: String,
    submitted: bool,
}

impl CommandInput {
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn submitted(&self) -> bool {
        self.submitted
    }

    fn begin(&mut self, initial: &str) {
        self.buffer = initial.to_string();
        self.submitted = false;
    }

    fn push(&mut self, c: char) {
        self.buffer.push(c);
    }

    fn pop(&mut self) {
        self.buffer.pop();
    }

    fn submit(&mut self) -> String {
        self.submitted = true;
        std::mem::take(&mut self.buffer)
    }

    fn cancel(&mut self) {
        self.buffer.clear();
        self.submitted = false;
    }
}

pub struct App {
    running: bool,
    mode: InputMode,
    show_help: bool,
    active: ViewKind,
    views: Vec<View>,
    input: CommandInput,
    status: String,
    context: ContextSummary,
    contexts: Vec<String>,
}

impl App {
    pub fn new(context: ContextSummary, contexts: Vec<String>) -> Self {
        Self {
            running: true,
            mode: InputMode::Normal,
            show_help: false,
            active: ViewKind::Topics,
            views: ViewKind::ALL.into_iter().map(View::new).collect(),
            input: CommandInput::default(),
            status: "Loading topics…".to_string(),
            context,
            contexts,
        }
    }

    /// Loads the initial view and arms its refresh timer.
    pub fn start(&mut self) -> Vec<AppCommand> {
        self.activate(self.active)
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn active_kind(&self) -> ViewKind {
        self.active
    }

    pub fn active_view(&self) -> &View {
        self.view(self.active)
    }

    pub fn view(&self, kind: ViewKind) -> &View {
        &self.views[kind.index()]
    }

    fn view_mut(&mut self, kind: ViewKind) -> &mut View {
        &mut self.views[kind.index()]
    }

    pub fn input(&self) -> &CommandInput {
        &self.input
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn context(&self) -> &ContextSummary {
        &self.context
    }

    pub fn apply_action(&mut self, action: Action) -> Vec<AppCommand> {
        if action == Action::ForceQuit {
            self.quit();
            return Vec::new();
        }

        if self.mode != InputMode::Normal {
            return self.handle_input(action);
        }

        if self.show_help {
            match action {
                Action::ToggleHelp | Action::Back => self.show_help = false,
                Action::Quit => self.quit(),
                _ => {}
            }
            return Vec::new();
        }

        match action {
            Action::ToggleHelp => {
                self.show_help = true;
                Vec::new()
            }
            Action::StartCommand => {
                self.mode = InputMode::Command;
                self.input.begin("");
                Vec::new()
            }
            Action::StartFilter if !self.active_view().has_overlay() => {
                let current = self.active_view().table().filter().to_string();
                self.mode = InputMode::Filter;
                self.input.begin(&current);
                Vec::new()
            }
            Action::Quit if !self.active_view().has_overlay() => {
                self.quit();
                Vec::new()
            }
            _ => {
                let active = self.active;
                let output = self.view_mut(active).handle(ViewEvent::Key(action));
                self.route(active, output)
            }
        }
    }

    fn handle_input(&mut self, action: Action) -> Vec<AppCommand> {
        match action {
            Action::CancelInput => {
                self.input.cancel();
                self.mode = InputMode::Normal;
                Vec::new()
            }
            Action::Backspace => {
                self.input.pop();
                Vec::new()
            }
            Action::InputChar(c) => {
                self.input.push(c);
                Vec::new()
            }
            Action::SubmitInput => {
                let text = self.input.submit();
                let mode = std::mem::replace(&mut self.mode, InputMode::Normal);
                match mode {
                    InputMode::Command => self.execute_command_line(&text),
                    InputMode::Filter => {
                        let active = self.active;
                        self.view_mut(active).table_mut().set_filter(&text);
                        self.status = if text.trim().is_empty() {
                            "Filter cleared".to_string()
                        } else {
                            format!("Filter: {}", text.trim())
                        };
                        Vec::new()
                    }
                    InputMode::Normal => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn execute_command_line(&mut self, line: &str) -> Vec<AppCommand> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Vec::new();
        };
        let argument = parts.next();

        match head.to_ascii_lowercase().as_str() {
            "q" | "quit" => {
                self.quit();
                Vec::new()
            }
            "ctx" | "context" => match argument {
                Some(name) => vec![AppCommand::SwitchContext(name.to_string())],
                None => {
                    self.status = self.context_listing();
                    Vec::new()
                }
            },
            "ns" | "namespace" => match argument {
                Some(namespace) => vec![AppCommand::SetNamespace(namespace.to_string())],
                None => {
                    self.status = format!("Namespace: {}", self.context.namespace);
                    Vec::new()
                }
            },
            "invalidate" => vec![AppCommand::InvalidateCache],
            token => match ViewKind::from_token(token) {
                Some(kind) => self.switch_view(kind),
                None => {
                    debug!("ignoring unknown command {line:?}");
                    Vec::new()
                }
            },
        }
    }

    fn context_listing(&self) -> String {
        let names = self
            .contexts
            .iter()
            .map(|name| {
                if *name == self.context.name {
                    format!("*{name}")
                } else {
                    name.clone()
                }
            })
            .collect::<Vec<_>>();
        format!("Contexts: {}", names.join(", "))
    }

    pub fn switch_view(&mut self, kind: ViewKind) -> Vec<AppCommand> {
        if kind == self.active {
            return Vec::new();
        }
        self.active = kind;
        self.status = format!("Viewing {}", kind.title());
        self.activate(kind)
    }

    fn activate(&mut self, kind: ViewKind) -> Vec<AppCommand> {
        let output = self.view_mut(kind).init();
        let mut commands = self.route(kind, output);
        commands.push(AppCommand::StartRefreshTimer(kind));
        commands
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Vec<AppCommand> {
        let (view, view_event) = match event {
            AppEvent::Fetched {
                view,
                target,
                seq,
                result,
            } => (
                view,
                ViewEvent::Fetched {
                    target,
                    seq,
                    result,
                },
            ),
            AppEvent::Described {
                view,
                name,
                seq,
                result,
            } => (view, ViewEvent::Described { name, seq, result }),
            AppEvent::ConnectorDone {
                view,
                action,
                name,
                result,
            } => (
                view,
                ViewEvent::ConnectorDone {
                    action,
                    name,
                    result,
                },
            ),
            AppEvent::RefreshTick(view) => {
                if view != self.active {
                    debug!("ignoring refresh tick for inactive {}", view.short_token());
                    return Vec::new();
                }
                (view, ViewEvent::RefreshTick)
            }
        };

        let output = self.view_mut(view).handle(view_event);
        self.route(view, output)
    }

    fn route(&mut self, view: ViewKind, output: ViewOutput) -> Vec<AppCommand> {
        if let Some(status) = output.status {
            self.status = status;
        }
        output
            .commands
            .into_iter()
            .map(|command| match command {
                ViewCommand::Fetch(request) => AppCommand::Fetch { view, request },
                ViewCommand::DescribeLive { kind, name, seq } => AppCommand::DescribeLive {
                    view,
                    kind,
                    name,
                    seq,
                },
                ViewCommand::Connector { action, name } => {
                    AppCommand::Connector { view, action, name }
                }
            })
            .collect()
    }

    /// Every view is resized, not only the active one.
    pub fn resize(&mut self, width: u16, height: u16) {
        let body_height = height.saturating_sub(HEADER_HEIGHT + FOOTER_HEIGHT);
        for view in &mut self.views {
            view.resize(width, body_height);
        }
    }

    /// Called once the context manager has persisted a new context or namespace.
    pub fn context_changed(&mut self, context: ContextSummary) -> Vec<AppCommand> {
        self.status = if context.name != self.context.name {
            format!("Switched to context {}", context.name)
        } else {
            format!("Namespace set to {}", context.namespace)
        };
        self.context = context;
        for view in &mut self.views {
            view.reset();
        }
        self.activate(self.active)
    }

    fn quit(&mut self) {
        self.running = false;
        self.status = "Exit requested".to_string();
    }
}
