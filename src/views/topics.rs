use super::listing::consumer_group_row;
use super::table::SeqGuard;
use super::{
    DetailPane, FetchRequest, FetchResult, FetchTarget, Overlay, PaneOutcome, ResourceTable,
    ViewCommand, ViewEvent, ViewOutput, describe_selected, described_pane, handle_table_key,
    pane_size, table_page_size,
};
use crate::input::Action;
use crate::model::{ResourceKind, ResourceRecord, RowData, format_duration_ms};
use tracing::debug;

const TOPIC_HEADERS: &[&str] = &["Name", "Partitions", "Replication", "Retention", "Description"];
pub const GROUP_HEADERS: &[&str] = &["Group ID", "State", "Members", "Lag"];

#[derive(Debug, Clone)]
enum TopicOverlay {
    None,
    Detail(DetailPane),
    ConsumerGroups(ConsumerGroupsPane),
}

/// Consumer groups reading one topic.
#[derive(Debug, Clone)]
pub struct ConsumerGroupsPane {
    topic: String,
    rows: Vec<RowData>,
    selected: usize,
    loading: bool,
    error: Option<String>,
}

impl ConsumerGroupsPane {
    fn new(topic: String) -> Self {
        Self {
            topic,
            rows: Vec::new(),
            selected: 0,
            loading: true,
            error: None,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn rows(&self) -> &[RowData] {
        &self.rows
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.rows.is_empty()).then_some(self.selected)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn apply(&mut self, result: FetchResult) {
        self.loading = false;
        match result {
            Ok(records) => {
                self.rows = records.iter().filter_map(consumer_group_row).collect();
                self.selected = self.selected.min(self.rows.len().saturating_sub(1));
                self.error = None;
            }
            Err(error) => self.error = Some(error),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let last = self.rows.len().saturating_sub(1);
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }
}

#[derive(Debug, Clone)]
pub struct TopicsView {
    table: ResourceTable,
    overlay: TopicOverlay,
    groups_guard: SeqGuard,
    size: (u16, u16),
}

impl TopicsView {
    pub fn new() -> Self {
        Self {
            table: ResourceTable::new(ResourceKind::Topics, TOPIC_HEADERS, topic_row),
            overlay: TopicOverlay::None,
            groups_guard: SeqGuard::default(),
            size: (0, 0),
        }
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut ResourceTable {
        &mut self.table
    }

    pub fn overlay(&self) -> Overlay<'_> {
        match &self.overlay {
            TopicOverlay::None => Overlay::None,
            TopicOverlay::Detail(pane) => Overlay::Detail(pane),
            TopicOverlay::ConsumerGroups(pane) => Overlay::ConsumerGroups(pane),
        }
    }

    pub fn reset(&mut self) {
        self.table.reset();
        self.overlay = TopicOverlay::None;
        self.groups_guard.supersede();
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.size = pane_size(width, height);
        self.table.set_page_size(table_page_size(height));
        if let TopicOverlay::Detail(pane) = &mut self.overlay {
            pane.set_size(self.size.0, self.size.1);
        }
    }

    pub fn handle(&mut self, event: ViewEvent) -> ViewOutput {
        match event {
            ViewEvent::Key(action) => self.handle_key(action),
            ViewEvent::RefreshTick => {
                ViewOutput::command(ViewCommand::Fetch(self.table.begin_fetch(false)))
            }
            ViewEvent::Fetched {
                target: FetchTarget::Table,
                seq,
                result,
            } => {
                self.table.apply(seq, result);
                ViewOutput::none()
            }
            ViewEvent::Fetched {
                target: FetchTarget::ConsumerGroups { topic },
                seq,
                result,
            } => {
                self.apply_groups(&topic, seq, result);
                ViewOutput::none()
            }
            ViewEvent::Described { name, seq, result } => {
                // An overlay opened since the request keeps the screen.
                if self.table.accept_described(seq) && matches!(self.overlay, TopicOverlay::None) {
                    self.overlay = TopicOverlay::Detail(described_pane(
                        ResourceKind::Topics,
                        &name,
                        result,
                        self.size,
                    ));
                }
                ViewOutput::none()
            }
            ViewEvent::ConnectorDone { .. } => ViewOutput::none(),
        }
    }

    fn handle_key(&mut self, action: Action) -> ViewOutput {
        match &mut self.overlay {
            TopicOverlay::Detail(pane) => {
                if pane.handle_key(action) == PaneOutcome::Close {
                    self.overlay = TopicOverlay::None;
                }
                return ViewOutput::none();
            }
            TopicOverlay::ConsumerGroups(pane) => {
                return match action {
                    Action::Back | Action::Quit => {
                        self.overlay = TopicOverlay::None;
                        ViewOutput::none()
                    }
                    Action::Down => {
                        pane.move_selection(1);
                        ViewOutput::none()
                    }
                    Action::Up => {
                        pane.move_selection(-1);
                        ViewOutput::none()
                    }
                    Action::Refresh | Action::ForceRefresh => {
                        pane.loading = true;
                        let topic = pane.topic.clone();
                        let force = action == Action::ForceRefresh;
                        ViewOutput::command(ViewCommand::Fetch(self.groups_request(topic, force)))
                    }
                    _ => ViewOutput::none(),
                };
            }
            TopicOverlay::None => {}
        }

        match action {
            Action::Select => {
                let Some(topic) = self.table.selected_row().map(|row| row.name.clone()) else {
                    return ViewOutput::none();
                };
                self.overlay = TopicOverlay::ConsumerGroups(ConsumerGroupsPane::new(topic.clone()));
                ViewOutput::command(ViewCommand::Fetch(self.groups_request(topic, false)))
            }
            Action::Describe => {
                if let Some(pane) = describe_selected(&self.table, self.size) {
                    self.overlay = TopicOverlay::Detail(pane);
                }
                ViewOutput::none()
            }
            _ => handle_table_key(&mut self.table, action).unwrap_or_default(),
        }
    }

    fn groups_request(&mut self, topic: String, force: bool) -> FetchRequest {
        FetchRequest {
            args: vec!["--topic".to_string(), topic.clone()],
            target: FetchTarget::ConsumerGroups { topic },
            kind: ResourceKind::ConsumerGroups,
            force,
            seq: self.groups_guard.issue(),
        }
    }

    fn apply_groups(&mut self, topic: &str, seq: u64, result: FetchResult) {
        if !self.groups_guard.accept(seq) {
            debug!("discarding stale consumer groups for {topic} (seq {seq})");
            return;
        }
        match &mut self.overlay {
            TopicOverlay::ConsumerGroups(pane) if pane.topic == topic => pane.apply(result),
            _ => debug!("consumer groups for {topic} arrived after overlay closed"),
        }
    }
}

fn topic_row(record: &ResourceRecord) -> Option<RowData> {
    let name = record.name()?.to_string();
    let retention = record
        .lookup_int(&["spec", "configs", "retention.ms"])
        .map(format_duration_ms)
        .unwrap_or_else(|| "-".to_string());
    Some(RowData {
        columns: vec![
            name.clone(),
            record.lookup_string(&["spec", "partitions"], "-"),
            record.lookup_string(&["spec", "replicationFactor"], "-"),
            retention,
            record.lookup_string(&["spec", "description"], ""),
        ],
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::{TopicsView, topic_row};
    use crate::input::Action;
    use crate::views::tests::records;
    use crate::views::{FetchRequest, FetchTarget, Overlay, ViewCommand, ViewEvent};

    const ORDERS: &str = "metadata:\n  name: orders\nspec:\n  partitions: 6\n  replicationFactor: 3\n  configs:\n    retention.ms: 604800000\n  description: Order events\n";
    const PAYMENTS: &str = "metadata:\n  name: payments\nspec:\n  partitions: 3\n";

    fn loaded() -> TopicsView {
        let mut view = TopicsView::new();
        let request = view.table.begin_fetch(false);
        view.handle(ViewEvent::Fetched {
            target: FetchTarget::Table,
            seq: request.seq,
            result: Ok(records(&[ORDERS, PAYMENTS])),
        });
        view
    }

    fn fetch_of(commands: &[ViewCommand]) -> FetchRequest {
        match &commands[0] {
            ViewCommand::Fetch(request) => request.clone(),
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn topic_row_formats_retention() {
        let row = topic_row(&records(&[ORDERS])[0]).unwrap();
        assert_eq!(
            row.columns,
            vec!["orders", "6", "3", "7.0d", "Order events"]
        );
    }

    #[test]
    fn enter_opens_consumer_groups_keyed_by_topic() {
        let mut view = loaded();

        let request = fetch_of(&view.handle(ViewEvent::Key(Action::Select)).commands);

        assert_eq!(request.args, vec!["--topic", "orders"]);
        assert_eq!(request.kind.cli_name(), "consumer-groups");
        assert!(!request.force);
        let Overlay::ConsumerGroups(pane) = view.overlay() else {
            panic!("expected consumer groups overlay");
        };
        assert!(pane.is_loading());
        assert_eq!(pane.topic(), "orders");
    }

    #[test]
    fn consumer_groups_result_fills_overlay() {
        let mut view = loaded();
        let request = fetch_of(&view.handle(ViewEvent::Key(Action::Select)).commands);

        view.handle(ViewEvent::Fetched {
            target: request.target,
            seq: request.seq,
            result: Ok(records(&[
                "metadata:\n  name: billing\nstatus:\n  state: Stable\n  members: 2\n  lag: 0\n",
            ])),
        });

        let Overlay::ConsumerGroups(pane) = view.overlay() else {
            panic!("expected consumer groups overlay");
        };
        assert_eq!(pane.rows()[0].columns, vec!["billing", "Stable", "2", "0"]);
        assert!(!pane.is_loading());
    }

    #[test]
    fn late_groups_for_previous_topic_are_ignored() {
        let mut view = loaded();
        let first = fetch_of(&view.handle(ViewEvent::Key(Action::Select)).commands);
        view.handle(ViewEvent::Key(Action::Back));
        view.handle(ViewEvent::Key(Action::Down));
        let second = fetch_of(&view.handle(ViewEvent::Key(Action::Select)).commands);

        view.handle(ViewEvent::Fetched {
            target: first.target,
            seq: first.seq,
            result: Ok(records(&["metadata:\n  name: stale\n"])),
        });

        let Overlay::ConsumerGroups(pane) = view.overlay() else {
            panic!("expected consumer groups overlay");
        };
        assert_eq!(pane.topic(), "payments");
        assert!(pane.rows().is_empty());
        assert!(second.seq > first.seq);
    }

    #[test]
    fn quit_key_closes_overlay_without_side_effects() {
        let mut view = loaded();
        view.handle(ViewEvent::Key(Action::Select));

        let output = view.handle(ViewEvent::Key(Action::Quit));

        assert!(output.commands.is_empty());
        assert!(matches!(view.overlay(), Overlay::None));
    }

    #[test]
    fn describe_shows_in_memory_yaml() {
        let mut view = loaded();
        view.handle(ViewEvent::Key(Action::Down));
        view.handle(ViewEvent::Key(Action::Describe));

        let Overlay::Detail(pane) = view.overlay() else {
            panic!("expected detail overlay");
        };
        assert_eq!(pane.title(), "Topic: payments");
        assert!(pane.content().contains("partitions: 3"));
    }

    #[test]
    fn live_describe_leaves_open_groups_overlay_alone() {
        let mut view = loaded();
        let output = view.handle(ViewEvent::Key(Action::DescribeLive));
        let ViewCommand::DescribeLive { name, seq, .. } = &output.commands[0] else {
            panic!("expected live describe");
        };
        view.handle(ViewEvent::Key(Action::Select));

        view.handle(ViewEvent::Described {
            name: name.clone(),
            seq: *seq,
            result: Ok("metadata:\n  name: orders\n".to_string()),
        });

        assert!(matches!(view.overlay(), Overlay::ConsumerGroups(_)));
    }

    #[test]
    fn groups_error_is_shown_in_overlay() {
        let mut view = loaded();
        let request = fetch_of(&view.handle(ViewEvent::Key(Action::Select)).commands);
        view.handle(ViewEvent::Fetched {
            target: request.target,
            seq: request.seq,
            result: Err("command failed: exit status: 1, stderr: denied".to_string()),
        });

        let Overlay::ConsumerGroups(pane) = view.overlay() else {
            panic!("expected consumer groups overlay");
        };
        assert!(pane.error().unwrap().contains("denied"));
    }
}
