use super::{FetchRequest, FetchResult, FetchTarget};
use crate::model::{ResourceKind, ResourceRecord, RowData, filter_resources};
use chrono::{DateTime, Local};
use tracing::debug;

pub type RowProjection = fn(&ResourceRecord) -> Option<RowData>;

/// Orders results of concurrent fetches by issue order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeqGuard {
    issued: u64,
    applied: u64,
}

impl SeqGuard {
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Accepts `seq` only if nothing newer has been applied.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.applied || seq > self.issued {
            return false;
        }
        self.applied = seq;
        true
    }

    /// Marks every issued request as stale.
    pub fn supersede(&mut self) {
        self.applied = self.issued;
    }

    /// True while a request newer than the last applied one is outstanding.
    pub fn pending(&self) -> bool {
        self.applied < self.issued
    }
}

#[derive(Debug, Clone)]
pub struct ResourceTable {
    kind: ResourceKind,
    headers: &'static [&'static str],
    project: RowProjection,
    records: Vec<ResourceRecord>,
    rows: Vec<RowData>,
    filter: String,
    selected: usize,
    loading: bool,
    error: Option<String>,
    last_refreshed: Option<DateTime<Local>>,
    guard: SeqGuard,
    describe_guard: SeqGuard,
    page_size: usize,
}

impl ResourceTable {
    pub fn new(kind: ResourceKind, headers: &'static [&'static str], project: RowProjection) -> Self {
        Self {
            kind,
            headers,
            project,
            records: Vec::new(),
            rows: Vec::new(),
            filter: String::new(),
            selected: 0,
            loading: true,
            error: None,
            last_refreshed: None,
            guard: SeqGuard::default(),
            describe_guard: SeqGuard::default(),
            page_size: 10,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn headers(&self) -> &'static [&'static str] {
        self.headers
    }

    pub fn begin_fetch(&mut self, force: bool) -> FetchRequest {
        self.loading = true;
        FetchRequest {
            target: FetchTarget::Table,
            kind: self.kind,
            args: Vec::new(),
            force,
            seq: self.guard.issue(),
        }
    }

    /// Applies a fetch result unless a newer one already landed. Errors keep the
    /// previous records.
    pub fn apply(&mut self, seq: u64, result: FetchResult) -> bool {
        if !self.guard.accept(seq) {
            debug!("discarding stale {} result (seq {seq})", self.kind.cli_name());
            return false;
        }

        self.loading = self.guard.pending();
        match result {
            Ok(records) => {
                let keep = self.selected_row().map(|row| row.name.clone());
                self.records = records;
                self.error = None;
                self.last_refreshed = Some(Local::now());
                self.rebuild_rows(keep.as_deref());
            }
            Err(error) => {
                self.error = Some(error);
            }
        }
        true
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.rows.clear();
        self.selected = 0;
        self.loading = true;
        self.error = None;
        self.last_refreshed = None;
        self.guard.supersede();
        self.describe_guard.supersede();
    }

    /// Sequence number for a live describe of the selected row.
    pub fn begin_describe(&mut self) -> u64 {
        self.describe_guard.issue()
    }

    /// Accepts a live describe unless a newer one landed or the table was reset since.
    pub fn accept_described(&mut self, seq: u64) -> bool {
        if !self.describe_guard.accept(seq) {
            debug!("discarding stale {} describe (seq {seq})", self.kind.cli_name());
            return false;
        }
        true
    }

    fn rebuild_rows(&mut self, keep: Option<&str>) {
        self.rows = filter_resources(&self.records, &self.filter)
            .into_iter()
            .filter_map(self.project)
            .collect();

        if let Some(name) = keep
            && let Some(index) = self.rows.iter().position(|row| row.name == name)
        {
            self.selected = index;
            return;
        }
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    pub fn rows(&self) -> &[RowData] {
        &self.rows
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.rows.is_empty()).then_some(self.selected)
    }

    pub fn selected_row(&self) -> Option<&RowData> {
        self.rows.get(self.selected)
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: &str) {
        let keep = self.selected_row().map(|row| row.name.clone());
        self.filter = filter.trim().to_string();
        self.rebuild_rows(keep.as_deref());
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.last_refreshed
    }

    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.rows.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    pub fn page(&mut self, pages: isize) {
        self.move_selection(pages * self.page_size as isize);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }
}
