use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    name: String,
    start_value: i64,
    increment: i64,
    min_value: i64,
    max_value: i64,
    cache: i64,
    cycle: bool,
    #[serde(skip)]
    schema: Option<String>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, start_value: i64, increment: i64) -> Self {
        Self {
            name: name.into(),
            start_value,
            increment,
            min_value: 1,
            max_value: i64::MAX,
            cache: 1,
            cycle: false,
            schema: None,
        }
    }

    pub fn with_bounds(mut self, min_value: i64, max_value: i64) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    pub fn with_cache(mut self, cache: i64) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cycle(mut self, cycle: bool) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_value(&self) -> i64 {
        self.start_value
    }

    pub fn increment(&self) -> i64 {
        self.increment
    }

    pub fn min_value(&self) -> i64 {
        self.min_value
    }

    pub fn max_value(&self) -> i64 {
        self.max_value
    }

    pub fn cache(&self) -> i64 {
        self.cache
    }

    pub fn cycle(&self) -> bool {
        self.cycle
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub(crate) fn set_schema(&mut self, schema: &str) {
        self.schema = Some(schema.to_string());
    }

    pub fn fully_qualified_name(&self) -> String {
        super::qualify(self.schema.as_deref(), &self.name)
    }
}
