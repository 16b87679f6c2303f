mod connectors;
mod detail;
mod listing;
mod table;
mod topics;

pub use connectors::ConnectorsView;
pub use detail::{DetailPane, PaneOutcome};
pub use listing::ListingView;
pub use table::ResourceTable;
pub use topics::{ConsumerGroupsPane, GROUP_HEADERS, TopicsView};

use crate::input::Action;
use crate::kafkactl::ConnectorAction;
use crate::model::{ResourceKind, ResourceRecord, ViewKind};

pub type FetchResult = Result<Vec<ResourceRecord>, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    Table,
    ConsumerGroups { topic: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub target: FetchTarget,
    pub kind: ResourceKind,
    pub args: Vec<String>,
    pub force: bool,
    pub seq: u64,
}

/// Work a view asks the controller to run off the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Fetch(FetchRequest),
    DescribeLive {
        kind: ResourceKind,
        name: String,
        seq: u64,
    },
    Connector { action: ConnectorAction, name: String },
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    Key(Action),
    RefreshTick,
    Fetched {
        target: FetchTarget,
        seq: u64,
        result: FetchResult,
    },
    Described {
        name: String,
        seq: u64,
        result: Result<String, String>,
    },
    ConnectorDone {
        action: ConnectorAction,
        name: String,
        result: Result<String, String>,
    },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ViewOutput {
    pub commands: Vec<ViewCommand>,
    pub status: Option<String>,
}

impl ViewOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn command(command: ViewCommand) -> Self {
        Self {
            commands: vec![command],
            status: None,
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self {
            commands: Vec::new(),
            status: Some(status.into()),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Borrowed view of whichever overlay is open, for rendering.
pub enum Overlay<'a> {
    None,
    Detail(&'a DetailPane),
    ConsumerGroups(&'a ConsumerGroupsPane),
}

pub enum View {
    Topics(TopicsView),
    Schemas(ListingView),
    Connectors(ConnectorsView),
    Consumers(ListingView),
    Acls(ListingView),
}

impl View {
    pub fn new(kind: ViewKind) -> Self {
        match kind {
            ViewKind::Topics => Self::Topics(TopicsView::new()),
            ViewKind::Schemas => Self::Schemas(ListingView::schemas()),
            ViewKind::Connectors => Self::Connectors(ConnectorsView::new()),
            ViewKind::Consumers => Self::Consumers(ListingView::consumers()),
            ViewKind::Acls => Self::Acls(ListingView::acls()),
        }
    }

    pub fn kind(&self) -> ViewKind {
        match self {
            Self::Topics(_) => ViewKind::Topics,
            Self::Schemas(_) => ViewKind::Schemas,
            Self::Connectors(_) => ViewKind::Connectors,
            Self::Consumers(_) => ViewKind::Consumers,
            Self::Acls(_) => ViewKind::Acls,
        }
    }

    /// Non-forced fetch issued whenever the view becomes active.
    pub fn init(&mut self) -> ViewOutput {
        ViewOutput::command(ViewCommand::Fetch(self.table_mut().begin_fetch(false)))
    }

    pub fn handle(&mut self, event: ViewEvent) -> ViewOutput {
        match self {
            Self::Topics(view) => view.handle(event),
            Self::Connectors(view) => view.handle(event),
            Self::Schemas(view) | Self::Consumers(view) | Self::Acls(view) => view.handle(event),
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        match self {
            Self::Topics(view) => view.resize(width, height),
            Self::Connectors(view) => view.resize(width, height),
            Self::Schemas(view) | Self::Consumers(view) | Self::Acls(view) => {
                view.resize(width, height)
            }
        }
    }

    pub fn table(&self) -> &ResourceTable {
        match self {
            Self::Topics(view) => view.table(),
            Self::Connectors(view) => view.table(),
            Self::Schemas(view) | Self::Consumers(view) | Self::Acls(view) => view.table(),
        }
    }

    pub fn table_mut(&mut self) -> &mut ResourceTable {
        match self {
            Self::Topics(view) => view.table_mut(),
            Self::Connectors(view) => view.table_mut(),
            Self::Schemas(view) | Self::Consumers(view) | Self::Acls(view) => view.table_mut(),
        }
    }

    pub fn overlay(&self) -> Overlay<'_> {
        match self {
            Self::Topics(view) => view.overlay(),
            Self::Connectors(view) => view.detail().map_or(Overlay::None, Overlay::Detail),
            Self::Schemas(view) | Self::Consumers(view) | Self::Acls(view) => {
                view.detail().map_or(Overlay::None, Overlay::Detail)
            }
        }
    }

    pub fn has_overlay(&self) -> bool {
        !matches!(self.overlay(), Overlay::None)
    }

    /// Drops data and overlays, e.g. after a context switch.
    pub fn reset(&mut self) {
        match self {
            Self::Topics(view) => view.reset(),
            Self::Connectors(view) => view.reset(),
            Self::Schemas(view) | Self::Consumers(view) | Self::Acls(view) => view.reset(),
        }
    }

    pub fn key_hints(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Topics(_) => &[
                ("enter", "groups"),
                ("d", "describe"),
                ("r", "refresh"),
                ("R", "force"),
                ("/", "filter"),
                (":", "cmd"),
                ("?", "help"),
            ],
            Self::Connectors(_) => &[
                ("d", "describe"),
                ("p", "pause"),
                ("s", "resume"),
                ("t", "restart"),
                ("r", "refresh"),
                ("R", "force"),
                (":", "cmd"),
                ("?", "help"),
            ],
            Self::Schemas(_) | Self::Consumers(_) | Self::Acls(_) => &[
                ("d", "describe"),
                ("r", "refresh"),
                ("R", "force"),
                ("/", "filter"),
                (":", "cmd"),
                ("?", "help"),
            ],
        }
    }
}

/// Table navigation and refresh keys shared by every view.
fn handle_table_key(table: &mut ResourceTable, action: Action) -> Option<ViewOutput> {
    match action {
        Action::Down => table.move_selection(1),
        Action::Up => table.move_selection(-1),
        Action::PageDown => table.page(1),
        Action::PageUp => table.page(-1),
        Action::Top => table.select_first(),
        Action::Bottom => table.select_last(),
        Action::Refresh => {
            return Some(ViewOutput::command(ViewCommand::Fetch(table.begin_fetch(false))));
        }
        Action::ForceRefresh => {
            return Some(
                ViewOutput::command(ViewCommand::Fetch(table.begin_fetch(true)))
                    .with_status(format!("Force refreshing {}", table.kind().cli_name())),
            );
        }
        Action::DescribeLive => {
            let name = table.selected_row()?.name.clone();
            return Some(ViewOutput::command(ViewCommand::DescribeLive {
                kind: table.kind(),
                name,
                seq: table.begin_describe(),
            }));
        }
        _ => return None,
    }
    Some(ViewOutput::none())
}

fn describe_selected(table: &ResourceTable, size: (u16, u16)) -> Option<DetailPane> {
    let name = &table.selected_row()?.name;
    Some(DetailPane::describe(table.kind(), name, table.records(), size))
}

fn described_pane(kind: ResourceKind, name: &str, result: Result<String, String>, size: (u16, u16)) -> DetailPane {
    let content = result.unwrap_or_else(|error| format!("Error: {error}"));
    DetailPane::new(format!("{}: {name} (live)", kind.singular()), content, size)
}

/// Usable overlay area inside the body border.
fn pane_size(width: u16, height: u16) -> (u16, u16) {
    (width.saturating_sub(2).max(1), height.saturating_sub(2).max(1))
}

/// Table rows visible below the border and header.
fn table_page_size(height: u16) -> usize {
    height.saturating_sub(3).max(1) as usize
}

#[cfg(test)]
mod tests {
    use super::{Overlay, View, ViewCommand, ViewEvent, ViewOutput};
    use crate::input::Action;
    use crate::model::{ResourceRecord, ViewKind};

    pub(super) fn records(yaml_docs: &[&str]) -> Vec<ResourceRecord> {
        yaml_docs
            .iter()
            .map(|doc| ResourceRecord::from_value(serde_yaml::from_str(doc).unwrap()).unwrap())
            .collect()
    }

    fn load(view: &mut View, docs: &[&str]) {
        let output = view.init();
        let ViewCommand::Fetch(request) = &output.commands[0] else {
            panic!("expected fetch");
        };
        view.handle(ViewEvent::Fetched {
            target: request.target.clone(),
            seq: request.seq,
            result: Ok(records(docs)),
        });
    }

    #[test]
    fn every_view_kind_round_trips() {
        for kind in ViewKind::ALL {
            assert_eq!(View::new(kind).kind(), kind);
        }
    }

    #[test]
    fn init_issues_non_forced_table_fetch() {
        let mut view = View::new(ViewKind::Schemas);
        let output = view.init();
        let ViewCommand::Fetch(request) = &output.commands[0] else {
            panic!("expected fetch");
        };
        assert!(!request.force);
        assert_eq!(request.kind.cli_name(), "schemas");
        assert!(view.table().is_loading());
    }

    #[test]
    fn refresh_keys_choose_cache_policy() {
        let mut view = View::new(ViewKind::Acls);
        let refresh = view.handle(ViewEvent::Key(Action::Refresh));
        let force = view.handle(ViewEvent::Key(Action::ForceRefresh));

        assert!(matches!(&refresh.commands[0], ViewCommand::Fetch(r) if !r.force));
        assert!(matches!(&force.commands[0], ViewCommand::Fetch(r) if r.force));
    }

    #[test]
    fn tick_issues_non_forced_fetch() {
        let mut view = View::new(ViewKind::Connectors);
        let output = view.handle(ViewEvent::RefreshTick);
        assert!(matches!(&output.commands[0], ViewCommand::Fetch(r) if !r.force));
    }

    #[test]
    fn describe_opens_detail_from_memory() {
        let mut view = View::new(ViewKind::Schemas);
        load(&mut view, &["metadata:\n  name: orders-value\nspec:\n  id: 7\n"]);

        let output = view.handle(ViewEvent::Key(Action::Describe));

        assert_eq!(output, ViewOutput::none());
        let Overlay::Detail(pane) = view.overlay() else {
            panic!("expected detail overlay");
        };
        assert!(pane.content().contains("id: 7"));
    }

    #[test]
    fn overlay_captures_keys_until_back() {
        let mut view = View::new(ViewKind::Acls);
        load(&mut view, &["metadata:\n  name: acl-1\n", "metadata:\n  name: acl-2\n"]);
        view.handle(ViewEvent::Key(Action::Describe));

        view.handle(ViewEvent::Key(Action::Down));
        assert_eq!(view.table().selected_index(), Some(0));

        view.handle(ViewEvent::Key(Action::Back));
        assert!(!view.has_overlay());
        view.handle(ViewEvent::Key(Action::Down));
        assert_eq!(view.table().selected_index(), Some(1));
    }

    #[test]
    fn resize_reaches_open_overlay() {
        let mut view = View::new(ViewKind::Schemas);
        let body = (0..30).map(|i| format!("  k{i}: v")).collect::<Vec<_>>().join("\n");
        load(&mut view, &[&format!("metadata:\n  name: s\nspec:\n{body}\n")]);
        view.resize(80, 10);
        view.handle(ViewEvent::Key(Action::Describe));
        view.handle(ViewEvent::Key(Action::Bottom));

        view.resize(80, 200);

        let Overlay::Detail(pane) = view.overlay() else {
            panic!("expected detail overlay");
        };
        assert_eq!(pane.scroll(), 0);
    }

    #[test]
    fn live_describe_requests_raw_yaml_then_shows_it() {
        let mut view = View::new(ViewKind::Consumers);
        load(&mut view, &["metadata:\n  name: billing\n"]);

        let output = view.handle(ViewEvent::Key(Action::DescribeLive));
        let ViewCommand::DescribeLive { name, seq, .. } = &output.commands[0] else {
            panic!("expected live describe");
        };
        assert_eq!(name, "billing");

        view.handle(ViewEvent::Described {
            name: "billing".to_string(),
            seq: *seq,
            result: Ok("metadata:\n  name: billing\n".to_string()),
        });
        assert!(matches!(view.overlay(), Overlay::Detail(_)));
    }

    #[test]
    fn live_describe_from_before_reset_is_dropped() {
        for kind in ViewKind::ALL {
            let mut view = View::new(kind);
            load(&mut view, &["metadata:\n  name: old\n"]);
            let output = view.handle(ViewEvent::Key(Action::DescribeLive));
            let ViewCommand::DescribeLive { seq, .. } = &output.commands[0] else {
                panic!("expected live describe");
            };

            view.reset();
            view.handle(ViewEvent::Described {
                name: "old".to_string(),
                seq: *seq,
                result: Ok("metadata:\n  name: old\n".to_string()),
            });

            assert!(!view.has_overlay(), "{kind:?} reopened a stale describe");
        }
    }

    #[test]
    fn live_describe_does_not_replace_newer_overlay() {
        let mut view = View::new(ViewKind::Schemas);
        load(&mut view, &["metadata:\n  name: s\nspec:\n  id: 7\n"]);
        let output = view.handle(ViewEvent::Key(Action::DescribeLive));
        let ViewCommand::DescribeLive { seq, .. } = &output.commands[0] else {
            panic!("expected live describe");
        };
        view.handle(ViewEvent::Key(Action::Describe));

        view.handle(ViewEvent::Described {
            name: "s".to_string(),
            seq: *seq,
            result: Ok("live".to_string()),
        });

        let Overlay::Detail(pane) = view.overlay() else {
            panic!("expected detail overlay");
        };
        assert!(pane.content().contains("id: 7"));
    }

    #[test]
    fn reset_closes_overlay_and_clears_rows() {
        let mut view = View::new(ViewKind::Schemas);
        load(&mut view, &["metadata:\n  name: s\n"]);
        view.handle(ViewEvent::Key(Action::Describe));

        view.reset();

        assert!(!view.has_overlay());
        assert!(view.table().rows().is_empty());
    }
}
