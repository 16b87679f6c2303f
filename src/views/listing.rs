use super::{
    DetailPane, FetchTarget, PaneOutcome, ResourceTable, ViewCommand, ViewEvent, ViewOutput,
    describe_selected, described_pane, handle_table_key, pane_size, table_page_size,
};
use crate::input::Action;
use crate::model::{ResourceKind, ResourceRecord, RowData};

const SCHEMA_HEADERS: &[&str] = &["Subject", "Version", "ID", "Type", "Compatibility"];
const CONSUMER_HEADERS: &[&str] = &["Group", "State", "Members", "Lag"];
const ACL_HEADERS: &[&str] = &[
    "Name",
    "Resource Type",
    "Resource",
    "Pattern",
    "Permission",
    "Granted To",
];

/// Read-only list with a describe overlay.
#[derive(Debug, Clone)]
pub struct ListingView {
    table: ResourceTable,
    detail: Option<DetailPane>,
    size: (u16, u16),
}

impl ListingView {
    fn new(table: ResourceTable) -> Self {
        Self {
            table,
            detail: None,
            size: (0, 0),
        }
    }

    pub fn schemas() -> Self {
        Self::new(ResourceTable::new(
            ResourceKind::Schemas,
            SCHEMA_HEADERS,
            schema_row,
        ))
    }

    pub fn consumers() -> Self {
        Self::new(ResourceTable::new(
            ResourceKind::ConsumerGroups,
            CONSUMER_HEADERS,
            consumer_group_row,
        ))
    }

    pub fn acls() -> Self {
        Self::new(ResourceTable::new(ResourceKind::Acls, ACL_HEADERS, acl_row))
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
            ViewEvent::Described { name, seq, result } => {
                if self.table.accept_described(seq) && self.detail.is_none() {
                    self.detail = Some(described_pane(self.table.kind(), &name, result, self.size));
                }
                ViewOutput::none()
            }
            ViewEvent::Fetched { .. } | ViewEvent::ConnectorDone { .. } => ViewOutput::none(),
        }
    }

    fn handle_key(&mut self, action: Action) -> ViewOutput {
        if let Some(detail) = &mut self.detail {
            if detail.handle_key(action) == PaneOutcome::Close {
                self.detail = None;
            }
            return ViewOutput::none();
        }

        match action {
            Action::Describe | Action::Select => {
                self.detail = describe_selected(&self.table, self.size);
                ViewOutput::none()
            }
            _ => handle_table_key(&mut self.table, action).unwrap_or_default(),
        }
    }
}

fn schema_row(record: &ResourceRecord) -> Option<RowData> {
    let subject = record.name()?.to_string();
    Some(RowData {
        columns: vec![
            subject.clone(),
            record.lookup_string(&["spec", "version"], "latest"),
            record.lookup_string(&["spec", "id"], "-"),
            record.lookup_string(&["spec", "type"], "AVRO"),
            record.lookup_string(&["spec", "compatibility"], "BACKWARD"),
        ],
        name: subject,
    })
}

pub(super) fn consumer_group_row(record: &ResourceRecord) -> Option<RowData> {
    let group = record.name()?.to_string();
    Some(RowData {
        columns: vec![
            group.clone(),
            record.lookup_string(&["status", "state"], "-"),
            record.lookup_string(&["status", "members"], "-"),
            record.lookup_string(&["status", "lag"], "-"),
        ],
        name: group,
    })
}

fn acl_row(record: &ResourceRecord) -> Option<RowData> {
    let name = record.name()?.to_string();
    Some(RowData {
        columns: vec![
            name.clone(),
            record.lookup_string(&["spec", "resourceType"], "-"),
            record.lookup_string(&["spec", "resource"], "-"),
            record.lookup_string(&["spec", "resourcePatternType"], "-"),
            record.lookup_string(&["spec", "permission"], "-"),
            record.lookup_string(&["spec", "grantedTo"], "-"),
        ],
        name,
    })
}
