use super::{
    DetailPane, FetchTarget, PaneOutcome, ResourceTable, ViewCommand, ViewEvent, ViewOutput,
    describe_selected, described_pane, handle_table_key, pane_size, table_page_size,
};
use crate::input::Action;
use crate::kafkactl::ConnectorAction;
use crate::model::{ResourceKind, ResourceRecord, RowData};

const CONNECTOR_HEADERS: &[&str] = &["Name", "Class", "Type", "State", "Tasks", "Connect Cluster"];

#[derive(Debug, Clone)]
pub struct ConnectorsView {
    table: ResourceTable,
    detail: Option<DetailPane>,
    size: (u16, u16),
}

impl ConnectorsView {
    pub fn new() -> Self {
        Self {
            table: ResourceTable::new(ResourceKind::Connectors, CONNECTOR_HEADERS, connector_row),
            detail: None,
            size: (0, 0),
        }
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut ResourceTable {
        &mut self.table
    }

    pub fn detail(&self) -> Option<&DetailPane> {
        self.detail.as_ref()
    }

    pub fn reset(&mut self) {
        self.table.reset();
        self.detail = None;
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.size = pane_size(width, height);
        self.table.set_page_size(table_page_size(height));
        if let Some(detail) = &mut self.detail {
            detail.set_size(self.size.0, self.size.1);
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
            ViewEvent::Fetched { .. } => ViewOutput::none(),
            ViewEvent::Described { name, seq, result } => {
                if self.table.accept_described(seq) && self.detail.is_none() {
                    self.detail = Some(described_pane(
                        ResourceKind::Connectors,
                        &name,
                        result,
                        self.size,
                    ));
                }
                ViewOutput::none()
            }
            // The outcome only goes to the status line; the table is reconciled by refetching.
            ViewEvent::ConnectorDone {
                action,
                name,
                result,
            } => {
                let status = match result {
                    Ok(_) => format!("{} connector {name}: ok", action.verb()),
                    Err(error) => format!("{} connector {name} failed: {error}", action.verb()),
                };
                ViewOutput::command(ViewCommand::Fetch(self.table.begin_fetch(false)))
                    .with_status(status)
            }
        }
    }

    fn handle_key(&mut self, action: Action) -> ViewOutput {
        if let Some(detail) = &mut self.detail {
            if detail.handle_key(action) == PaneOutcome::Close {
                self.detail = None;
            }
            return ViewOutput::none();
        }

        let connector_action = match action {
            Action::PauseConnector => ConnectorAction::Pause,
            Action::ResumeConnector => ConnectorAction::Resume,
            Action::RestartConnector => ConnectorAction::Restart,
            Action::Describe | Action::Select => {
                self.detail = describe_selected(&self.table, self.size);
                return ViewOutput::none();
            }
            _ => return handle_table_key(&mut self.table, action).unwrap_or_default(),
        };

        let Some(row) = self.table.selected_row() else {
            return ViewOutput::status("No connector selected");
        };
        let name = row.name.clone();
        ViewOutput::command(ViewCommand::Connector {
            action: connector_action,
            name: name.clone(),
        })
        .with_status(format!("{} connector {name}…", action_progress(connector_action)))
    }
}

fn action_progress(action: ConnectorAction) -> &'static str {
    match action {
        ConnectorAction::Pause => "Pausing",
        ConnectorAction::Resume => "Resuming",
        ConnectorAction::Restart => "Restarting",
    }
}

fn connector_row(record: &ResourceRecord) -> Option<RowData> {
    let name = record.name()?.to_string();
    let class = record.lookup_string(&["spec", "config", "connector.class"], "-");
    let kind = if class.to_lowercase().contains("sink") {
        "sink"
    } else {
        "source"
    };
    Some(RowData {
        columns: vec![
            name.clone(),
            class,
            kind.to_string(),
            record.lookup_string(&["status", "state"], "-"),
            record.lookup_string(&["spec", "config", "tasks.max"], "1"),
            record.lookup_string(&["spec", "connectCluster"], "-"),
        ],
        name,
    })
}
