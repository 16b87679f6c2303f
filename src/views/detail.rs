use crate::input::Action;
use crate::model::{ResourceKind, ResourceRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneOutcome {
    Stay,
    Close,
}

/// Scrollable YAML overlay.
#[derive(Debug, Clone)]
pub struct DetailPane {
    title: String,
    content: String,
    scroll: u16,
    width: u16,
    height: u16,
    line_count: usize,
}

impl DetailPane {
    pub fn new(title: impl Into<String>, content: impl Into<String>, size: (u16, u16)) -> Self {
        let mut pane = Self {
            title: title.into(),
            content: content.into(),
            scroll: 0,
            width: 0,
            height: 0,
            line_count: 0,
        };
        pane.set_size(size.0, size.1);
        pane
    }

    pub fn describe(kind: ResourceKind, name: &str, records: &[ResourceRecord], size: (u16, u16)) -> Self {
        Self::new(
            format!("{}: {name}", kind.singular()),
            describe_record(kind, name, records),
            size,
        )
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    /// Re-applies the whole content for the new viewport.
    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.line_count = wrapped_line_count(&self.content, width);
        self.scroll = self.scroll.min(self.max_scroll());
    }

    pub fn handle_key(&mut self, action: Action) -> PaneOutcome {
        match action {
            Action::Back | Action::Quit => return PaneOutcome::Close,
            Action::Down => self.scroll_by(1),
            Action::Up => self.scroll_by(-1),
            Action::PageDown => self.scroll_by(self.height.max(1) as i32),
            Action::PageUp => self.scroll_by(-(self.height.max(1) as i32)),
            Action::Top => self.scroll = 0,
            Action::Bottom => self.scroll = self.max_scroll(),
            _ => {}
        }
        PaneOutcome::Stay
    }

    fn scroll_by(&mut self, delta: i32) {
        let next = (self.scroll as i32 + delta).clamp(0, self.max_scroll() as i32);
        self.scroll = next as u16;
    }

    fn max_scroll(&self) -> u16 {
        self.line_count
            .saturating_sub(self.height as usize)
            .min(u16::MAX as usize) as u16
    }
}

/// YAML of the in-memory record, or a not-found message when it is gone.
pub fn describe_record(kind: ResourceKind, name: &str, records: &[ResourceRecord]) -> String {
    match records.iter().find(|record| record.name() == Some(name)) {
        Some(record) => record.to_yaml().unwrap_or_else(|error| {
            format!(
                "Error serializing {} details: {error}",
                kind.singular().to_lowercase()
            )
        }),
        None => format!("{} '{name}' not found in cache", kind.singular()),
    }
}

fn wrapped_line_count(content: &str, width: u16) -> usize {
    if width == 0 {
        return content.lines().count();
    }
    let width = width as usize;
    content
        .lines()
        .map(|line| line.chars().count().div_ceil(width).max(1))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{DetailPane, PaneOutcome, describe_record};
    use crate::input::Action;
    use crate::model::{ResourceKind, ResourceRecord};

    fn topic(name: &str) -> ResourceRecord {
        let yaml = format!("metadata:\n  name: {name}\nspec:\n  partitions: 3\n");
        ResourceRecord::from_value(serde_yaml::from_str(&yaml).unwrap()).unwrap()
    }

    #[test]
    fn describe_serializes_matching_record() {
        let records = vec![topic("orders"), topic("payments")];
        let yaml = describe_record(ResourceKind::Topics, "payments", &records);
        assert!(yaml.contains("name: payments"));
        assert!(yaml.contains("partitions: 3"));
    }

    #[test]
    fn describe_of_vanished_record_reports_not_found() {
        let records = vec![topic("orders")];
        assert_eq!(
            describe_record(ResourceKind::Topics, "payments", &records),
            "Topic 'payments' not found in cache"
        );
        assert_eq!(
            describe_record(ResourceKind::Connectors, "sink", &[]),
            "Connector 'sink' not found in cache"
        );
    }

    #[test]
    fn scrolling_is_bounded_by_content() {
        let content = (0..20).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let mut pane = DetailPane::new("t", content, (40, 5));

        pane.handle_key(Action::Bottom);
        assert_eq!(pane.scroll(), 15);
        pane.handle_key(Action::PageDown);
        assert_eq!(pane.scroll(), 15);
        pane.handle_key(Action::Top);
        pane.handle_key(Action::Up);
        assert_eq!(pane.scroll(), 0);
    }

    #[test]
    fn resize_reapplies_content_and_clamps_scroll() {
        let content = (0..10).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let mut pane = DetailPane::new("t", content, (40, 4));
        pane.handle_key(Action::Bottom);
        assert_eq!(pane.scroll(), 6);

        pane.set_size(40, 20);
        assert_eq!(pane.scroll(), 0);
    }

    #[test]
    fn narrow_viewport_counts_wrapped_lines() {
        let mut pane = DetailPane::new("t", "a".repeat(30), (10, 1));
        pane.handle_key(Action::Bottom);
        assert_eq!(pane.scroll(), 2);
    }

    #[test]
    fn back_and_quit_close_the_pane() {
        let mut pane = DetailPane::new("t", "x", (10, 10));
        assert_eq!(pane.handle_key(Action::Back), PaneOutcome::Close);
        assert_eq!(pane.handle_key(Action::Quit), PaneOutcome::Close);
        assert_eq!(pane.handle_key(Action::Refresh), PaneOutcome::Stay);
    }
}
