// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const ID_FIELD: &str = "ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Device,
    Metric,
    Measurement,
    Filter,
    Group,
    Server,
}

impl EntityKind {
    pub const ALL: [Self; 6] = [
        Self::Device,
        Self::Metric,
        Self::Measurement,
        Self::Filter,
        Self::Group,
        Self::Server,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Metric => "metric",
            Self::Measurement => "measurement",
            Self::Filter => "filter",
            Self::Group => "group",
            Self::Server => "server",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "device" | "devices" => Some(Self::Device),
            "metric" | "metrics" => Some(Self::Metric),
            "measurement" | "measurements" => Some(Self::Measurement),
            "filter" | "filters" => Some(Self::Filter),
            "group" | "groups" => Some(Self::Group),
            "server" | "servers" => Some(Self::Server),
            _ => None,
        }
    }

    /// Path segment of the collector's config API for this kind.
    pub const fn resource(self) -> &'static str {
        match self {
            Self::Device => "snmpdevice",
            Self::Metric => "snmpmetric",
            Self::Measurement => "measurement",
            Self::Filter => "measfilters",
            Self::Group => "measgroup",
            Self::Server => "influxservers",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Device => "SNMP device",
            Self::Metric => "SNMP metric",
            Self::Measurement => "measurement",
            Self::Filter => "measurement filter",
            Self::Group => "measurement group",
            Self::Server => "output server",
        }
    }
}

/// One field value of an open record. Lists only ever hold scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(|value| Self::Text(value.into())).collect())
    }

    pub fn display(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Decimal(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::List(values) => values
                .iter()
                .map(Self::display)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(value) => value.is_empty(),
            Self::List(values) => values.is_empty(),
            Self::Bool(_) | Self::Integer(_) | Self::Decimal(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this value is `needle` or, for lists, holds it.
    pub fn mentions(&self, needle: &str) -> bool {
        match self {
            Self::Text(value) => value == needle,
            Self::List(values) => values.iter().any(|value| value.mentions(needle)),
            _ => false,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Integer(_) | Self::Decimal(_) => 1,
            Self::Bool(_) => 2,
            Self::Text(_) | Self::List(_) => 3,
        }
    }

    /// Natural ordering of the underlying type, total across kinds: nulls,
    /// then numbers, then booleans, then text. Lists order by their display
    /// string alongside text.
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::Bool(left), Self::Bool(right)) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => left.cmp(right),
            _ => self.rank().cmp(&other.rank()).then_with(|| {
                match (self.as_number(), other.as_number()) {
                    (Some(left), Some(right)) => left
                        .total_cmp(&right)
                        .then_with(|| self.number_tiebreak().cmp(&other.number_tiebreak())),
                    _ => self.display().cmp(&other.display()),
                }
            }),
        }
    }

    // Integers that round to the same float stay ordered; an integer sorts
    // before an equal decimal.
    fn number_tiebreak(&self) -> (u8, i64) {
        match self {
            Self::Integer(value) => (0, *value),
            _ => (1, 0),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A configuration entity as an open field map. The identity lives in the
/// [`ID_FIELD`] field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self::new().with(ID_FIELD, FieldValue::Text(id.into()))
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD)
            .and_then(FieldValue::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// One row of a pre-delete answer: `referencing_object_id` of type
/// `referencing_type` points at the candidate and `action` says what the
/// delete does to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReference {
    #[serde(rename = "Type")]
    pub referencing_type: String,
    #[serde(rename = "ObID", alias = "ID")]
    pub referencing_object_id: String,
    #[serde(rename = "Action")]
    pub action: String,
}

impl DeleteReference {
    pub fn new(
        referencing_type: impl Into<String>,
        referencing_object_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            referencing_type: referencing_type.into(),
            referencing_object_id: referencing_object_id.into(),
            action: action.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DeleteReference, EntityKind, FieldValue, Record};
    use anyhow::Result;
    use std::cmp::Ordering;

    #[test]
    fn entity_kind_round_trips_through_labels() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::parse("servers"), Some(EntityKind::Server));
        assert_eq!(EntityKind::parse("router"), None);
    }

    #[test]
    fn numbers_compare_numerically_across_widths() {
        assert_eq!(
            FieldValue::Integer(9).cmp_value(&FieldValue::Integer(10)),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Decimal(2.5).cmp_value(&FieldValue::Integer(2)),
            Ordering::Greater
        );
        assert_eq!(
            FieldValue::text("9").cmp_value(&FieldValue::text("10")),
            Ordering::Greater
        );
        assert_eq!(
            FieldValue::Null.cmp_value(&FieldValue::text("")),
            Ordering::Less
        );
    }

    #[test]
    fn mixed_kinds_order_by_kind_then_value() {
        let joined = FieldValue::list(["a,c"]);
        let text = FieldValue::text("a,d");
        let split = FieldValue::list(["a", "z"]);
        assert_eq!(joined.cmp_value(&text), Ordering::Less);
        assert_eq!(text.cmp_value(&split), Ordering::Less);
        assert_eq!(joined.cmp_value(&split), Ordering::Less);

        assert_eq!(
            FieldValue::Integer(10).cmp_value(&FieldValue::text("1")),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Bool(true).cmp_value(&FieldValue::Decimal(99.5)),
            Ordering::Greater
        );
        assert_eq!(
            FieldValue::Integer(2).cmp_value(&FieldValue::Decimal(2.0)),
            Ordering::Less
        );

        let big = FieldValue::Integer((1_i64 << 53) + 1);
        let smaller = FieldValue::Integer(1_i64 << 53);
        let float = FieldValue::Decimal((1_i64 << 53) as f64);
        assert_eq!(smaller.cmp_value(&big), Ordering::Less);
        assert_eq!(big.cmp_value(&float), Ordering::Less);
        assert_eq!(smaller.cmp_value(&float), Ordering::Less);
    }

    #[test]
    fn blank_values_cover_null_empty_text_and_empty_lists() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::text("").is_blank());
        assert!(FieldValue::List(Vec::new()).is_blank());
        assert!(!FieldValue::Integer(0).is_blank());
        assert!(!FieldValue::Bool(false).is_blank());
    }

    #[test]
    fn record_id_ignores_empty_identity() {
        assert_eq!(Record::with_id("dev1").id(), Some("dev1"));
        assert_eq!(Record::with_id("").id(), None);
        assert_eq!(Record::new().with("ID", 7_i64).id(), None);
    }

    #[test]
    fn list_values_mention_members() {
        let groups = FieldValue::list(["core", "edge"]);
        assert!(groups.mentions("edge"));
        assert!(!groups.mentions("ed"));
        assert_eq!(groups.display(), "core,edge");
    }

    #[test]
    fn delete_reference_decodes_collector_payload() -> Result<()> {
        let parsed: Vec<DeleteReference> = serde_json::from_str(
            r#"[{"Type":"metric","ObID":"m1","Action":"will be unlinked"},{"Type":"metric","ID":"m2","Action":"will be deleted"}]"#,
        )?;
        assert_eq!(
            parsed,
            vec![
                DeleteReference::new("metric", "m1", "will be unlinked"),
                DeleteReference::new("metric", "m2", "will be deleted"),
            ]
        );
        Ok(())
    }
}
