use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TriggerTiming {
    #[serde(rename = "BEFORE")]
    Before,
    #[serde(rename = "AFTER")]
    After,
    #[serde(rename = "INSTEAD OF")]
    InsteadOf,
}

impl TriggerTiming {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BEFORE" => Some(TriggerTiming::Before),
            "AFTER" => Some(TriggerTiming::After),
            "INSTEAD OF" => Some(TriggerTiming::InsteadOf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
            TriggerTiming::InsteadOf => "INSTEAD OF",
        }
    }
}

impl fmt::Display for TriggerTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Some(TriggerEvent::Insert),
            "UPDATE" => Some(TriggerEvent::Update),
            "DELETE" => Some(TriggerEvent::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FOR EACH ROW vs FOR EACH STATEMENT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerGranularity {
    #[default]
    Row,
    Statement,
}

impl TriggerGranularity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ROW" => Some(TriggerGranularity::Row),
            "STATEMENT" => Some(TriggerGranularity::Statement),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerGranularity::Row => "ROW",
            TriggerGranularity::Statement => "STATEMENT",
        }
    }
}

impl fmt::Display for TriggerGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    name: String,
    definition: String,
    timing: TriggerTiming,
    /// Distinct events in the order the catalog reported them.
    events: Vec<TriggerEvent>,
    /// Name of the executed function in the same schema, when it was mapped.
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<String>,
    for_each: TriggerGranularity,
    #[serde(skip)]
    table: Option<String>,
}

impl Trigger {
    pub fn new(
        name: impl Into<String>,
        definition: impl Into<String>,
        timing: TriggerTiming,
    ) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            timing,
            events: Vec::new(),
            function: None,
            for_each: TriggerGranularity::Row,
            table: None,
        }
    }

    pub fn with_for_each(mut self, for_each: TriggerGranularity) -> Self {
        self.for_each = for_each;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn timing(&self) -> TriggerTiming {
        self.timing
    }

    pub fn events(&self) -> &[TriggerEvent] {
        &self.events
    }

    /// Record an event; repeated events are ignored so `events` behaves as a set.
    pub fn add_event(&mut self, event: TriggerEvent) {
        if !self.events.contains(&event) {
            self.events.push(event);
        }
    }

    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn set_function(&mut self, function: impl Into<String>) {
        self.function = Some(function.into());
    }

    pub fn for_each(&self) -> TriggerGranularity {
        self.for_each
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub(crate) fn set_table(&mut self, table: &str) {
        self.table = Some(table.to_string());
    }
}
