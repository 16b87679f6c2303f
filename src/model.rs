use serde_yaml::{Mapping, Value};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Topics,
    Schemas,
    Connectors,
    ConsumerGroups,
    Acls,
}

impl ResourceKind {
    /// Name passed to `kafkactl get`.
    pub fn cli_name(self) -> &'static str {
        match self {
            Self::Topics => "topics",
            Self::Schemas => "schemas",
            Self::Connectors => "connectors",
            Self::ConsumerGroups => "consumer-groups",
            Self::Acls => "acls",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Self::Topics => "Topic",
            Self::Schemas => "Schema",
            Self::Connectors => "Connector",
            Self::ConsumerGroups => "Consumer group",
            Self::Acls => "ACL",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ViewKind {
    Topics,
    Schemas,
    Connectors,
    Consumers,
    Acls,
}

impl ViewKind {
    pub const ALL: [Self; 5] = [
        Self::Topics,
        Self::Schemas,
        Self::Connectors,
        Self::Consumers,
        Self::Acls,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Topics => "Topics",
            Self::Schemas => "Schemas",
            Self::Connectors => "Connectors",
            Self::Consumers => "Consumers",
            Self::Acls => "ACLs",
        }
    }

    pub fn short_token(self) -> &'static str {
        match self {
            Self::Topics => "topics",
            Self::Schemas => "schemas",
            Self::Connectors => "connectors",
            Self::Consumers => "consumers",
            Self::Acls => "acls",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "topic" | "topics" => Some(Self::Topics),
            "schema" | "schemas" => Some(Self::Schemas),
            "connector" | "connectors" => Some(Self::Connectors),
            "consumer" | "consumers" => Some(Self::Consumers),
            "acl" | "acls" => Some(Self::Acls),
            _ => None,
        }
    }

    pub fn resource_kind(self) -> ResourceKind {
        match self {
            Self::Topics => ResourceKind::Topics,
            Self::Schemas => ResourceKind::Schemas,
            Self::Connectors => ResourceKind::Connectors,
            Self::Consumers => ResourceKind::ConsumerGroups,
            Self::Acls => ResourceKind::Acls,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Topics => 0,
            Self::Schemas => 1,
            Self::Connectors => 2,
            Self::Consumers => 3,
            Self::Acls => 4,
        }
    }
}

/// One decoded YAML document returned by `kafkactl get`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    document: Mapping,
}

impl ResourceRecord {
    /// Only mappings are accepted; scalars and sequences are not resources.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Mapping(document) => Some(Self { document }),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.lookup(&["metadata", "name"])
            .or_else(|| self.lookup(&["name"]))
            .and_then(Value::as_str)
    }

    /// Walks nested mappings. Segments are keys, so `"retention.ms"` is one segment.
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &self.document;
        for key in parents {
            current = current.get(*key)?.as_mapping()?;
        }
        current.get(*last)
    }

    pub fn lookup_string(&self, path: &[&str], default: &str) -> String {
        self.lookup(path)
            .and_then(scalar_text)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn lookup_int(&self, path: &[&str]) -> Option<i64> {
        match self.lookup(path)? {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64)),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.document)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Sequence(items) => Some(items.len().to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Mapping(_) => None,
    }
}

/// Case-insensitive substring match on the resource name, keeping input order.
pub fn filter_resources<'a>(records: &'a [ResourceRecord], term: &str) -> Vec<&'a ResourceRecord> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return records.iter().collect();
    }

    records
        .iter()
        .filter(|record| {
            record
                .name()
                .is_some_and(|name| name.to_lowercase().contains(&term))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowData {
    pub name: String,
    pub columns: Vec<String>,
}

/// Kafka uses `-1` for unbounded retention.
pub fn format_duration_ms(ms: i64) -> String {
    if ms < 0 {
        return "infinite".to_string();
    }

    let seconds = ms as f64 / 1000.0;
    if ms < 1_000 {
        format!("{ms}ms")
    } else if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else if seconds < 3_600.0 {
        format!("{:.1}m", seconds / 60.0)
    } else if seconds < 86_400.0 {
        format!("{:.1}h", seconds / 3_600.0)
    } else {
        format!("{:.1}d", seconds / 86_400.0)
    }
}

pub fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::{ResourceRecord, ViewKind, filter_resources, format_duration_ms, truncate};

    fn record(yaml: &str) -> ResourceRecord {
        ResourceRecord::from_value(serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    fn named(name: &str) -> ResourceRecord {
        record(&format!("metadata:\n  name: {name}\n"))
    }

    #[test]
    fn view_tokens_accept_singular_and_plural() {
        assert_eq!(ViewKind::from_token("topic"), Some(ViewKind::Topics));
        assert_eq!(ViewKind::from_token("Schemas"), Some(ViewKind::Schemas));
        assert_eq!(ViewKind::from_token("connector"), Some(ViewKind::Connectors));
        assert_eq!(ViewKind::from_token("consumers"), Some(ViewKind::Consumers));
        assert_eq!(ViewKind::from_token("acl"), Some(ViewKind::Acls));
        assert_eq!(ViewKind::from_token("brokers"), None);
    }

    #[test]
    fn filter_matches_name_case_insensitively_in_order() {
        let records = vec![
            named("kafka-orders"),
            named("payments"),
            named("KAFKA-audit"),
            named("legacy-kafka"),
        ];

        let names = filter_resources(&records, "kafka")
            .into_iter()
            .filter_map(ResourceRecord::name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["kafka-orders", "KAFKA-audit", "legacy-kafka"]);
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let records = vec![named("a"), named("b")];
        assert_eq!(filter_resources(&records, "  ").len(), 2);
    }

    #[test]
    fn name_falls_back_to_top_level_key() {
        assert_eq!(record("name: topic-1\n").name(), Some("topic-1"));
        assert_eq!(record("kind: Topic\n").name(), None);
    }

    #[test]
    fn lookup_walks_nested_keys_with_dots_in_segments() {
        let topic = record(
            "metadata:\n  name: orders\nspec:\n  partitions: 6\n  configs:\n    retention.ms: '604800000'\n",
        );

        assert_eq!(topic.lookup_int(&["spec", "partitions"]), Some(6));
        assert_eq!(
            topic.lookup_int(&["spec", "configs", "retention.ms"]),
            Some(604_800_000)
        );
        assert_eq!(topic.lookup_string(&["spec", "missing"], "-"), "-");
        assert_eq!(topic.lookup_string(&["metadata", "name", "deeper"], "-"), "-");
    }

    #[test]
    fn durations_pick_the_largest_unit() {
        assert_eq!(format_duration_ms(250), "250ms");
        assert_eq!(format_duration_ms(1_500), "1.5s");
        assert_eq!(format_duration_ms(90_000), "1.5m");
        assert_eq!(format_duration_ms(7_200_000), "2.0h");
        assert_eq!(format_duration_ms(604_800_000), "7.0d");
        assert_eq!(format_duration_ms(-1), "infinite");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("orders", 10), "orders");
        assert_eq!(truncate("orders-v2", 5), "orde…");
    }
}
