use serde_json::{Map, Value};

/// Equality filter over top-level document fields.
///
/// An empty filter matches every document of a kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Map<String, Value>,
}

impl Filter {
    /// Creates a filter matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a filter on a single field.
    pub fn by(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Adds an equality condition.
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    /// Returns true if the document satisfies every condition.
    pub fn matches(&self, document: &Map<String, Value>) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    /// Returns the conditions as a JSON object (usable as a containment pattern).
    pub fn to_json(&self) -> Value {
        Value::Object(self.conditions.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Options for listing documents.
///
/// Documents are returned in insertion order unless `newest_first` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub newest_first: bool,
    pub limit: Option<usize>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently created documents first, at most `limit` of them.
    pub fn latest(limit: usize) -> Self {
        Self {
            newest_first: true,
            limit: Some(limit),
        }
    }
}

/// A count/sum aggregation over the documents of one kind.
///
/// For every group this computes:
/// - `total`: number of documents
/// - `matching`: number of documents whose `count_where` field equals the value
/// - `sum`: saturating sum of the `sum_of` field as unsigned integers
///   (missing or non-integer fields count as 0)
///
/// Without `group_by` a single group is produced, even when no documents match.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub filter: Filter,
    pub group_by: Option<String>,
    pub count_where: Option<(String, Value)>,
    pub sum_of: Option<String>,
}

impl Aggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    pub fn count_where(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.count_where = Some((field.into(), value.into()));
        self
    }

    pub fn sum_of(mut self, field: impl Into<String>) -> Self {
        self.sum_of = Some(field.into());
        self
    }

    /// Folds one document into a row.
    pub(crate) fn accumulate(&self, row: &mut AggregateRow, document: &Map<String, Value>) {
        row.total += 1;
        if let Some((field, value)) = &self.count_where
            && document.get(field) == Some(value)
        {
            row.matching += 1;
        }
        if let Some(field) = &self.sum_of {
            let value = document.get(field).and_then(Value::as_u64).unwrap_or(0);
            row.sum = row.sum.saturating_add(value);
        }
    }
}

/// One group of an aggregation result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateRow {
    /// Value of the `group_by` field, `None` for the ungrouped row.
    pub key: Option<Value>,
    pub total: u64,
    pub matching: u64,
    pub sum: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::all().matches(&doc(json!({"a": 1}))));
    }

    #[test]
    fn filter_requires_every_condition() {
        let filter = Filter::by("location", "usa").and("status", "shipped");
        assert!(filter.matches(&doc(json!({"location": "usa", "status": "shipped", "x": 1}))));
        assert!(!filter.matches(&doc(json!({"location": "usa", "status": "complete"}))));
        assert!(!filter.matches(&doc(json!({"status": "shipped"}))));
    }

    #[test]
    fn filter_compares_numbers_exactly() {
        let filter = Filter::by("id", 3);
        assert!(filter.matches(&doc(json!({"id": 3}))));
        assert!(!filter.matches(&doc(json!({"id": "3"}))));
    }

    #[test]
    fn accumulate_counts_and_sums() {
        let aggregation = Aggregation::new()
            .count_where("status", "shipped")
            .sum_of("costsOfParts");
        let mut row = AggregateRow::default();
        aggregation.accumulate(&mut row, &doc(json!({"status": "shipped", "costsOfParts": 80})));
        aggregation.accumulate(&mut row, &doc(json!({"status": "production", "costsOfParts": 20})));
        aggregation.accumulate(&mut row, &doc(json!({"status": "waitingForParts"})));
        assert_eq!(row.total, 3);
        assert_eq!(row.matching, 1);
        assert_eq!(row.sum, 100);
    }
}
