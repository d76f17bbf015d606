// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Field coercion between the wire/operator representations and records.
//! Every field is converted through its schema codec; fields a schema does
//! not declare pass through untouched on the wire.

use serde_json::{Map, Number, Value};
use std::fmt;

use crate::{EntitySchema, FieldCodec, FieldValue, ID_FIELD, Record};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    InvalidInteger { field: String, raw: String },
    InvalidDecimal { field: String, raw: String },
    InvalidBool { field: String, raw: String },
    InvalidList { field: String },
    UnknownField { field: String },
    NotAnObject,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInteger { field, raw } => {
                write!(f, "field {field} expects an integer, got {raw:?}")
            }
            Self::InvalidDecimal { field, raw } => {
                write!(f, "field {field} expects a decimal number, got {raw:?}")
            }
            Self::InvalidBool { field, raw } => {
                write!(f, "field {field} expects true or false, got {raw:?}")
            }
            Self::InvalidList { field } => {
                write!(f, "field {field} expects a list of strings")
            }
            Self::UnknownField { field } => write!(f, "unknown field {field}"),
            Self::NotAnObject => f.write_str("record payload is not a JSON object"),
        }
    }
}

impl std::error::Error for CodecError {}

pub type CodecResult<T> = std::result::Result<T, CodecError>;

impl EntitySchema {
    /// Decodes one wire object. Numbers and booleans sent as strings are
    /// accepted for fields that declare them.
    pub fn decode_json(&self, value: &Value) -> CodecResult<Record> {
        let Value::Object(object) = value else {
            return Err(CodecError::NotAnObject);
        };

        object
            .iter()
            .map(|(name, raw)| {
                let value = match self.field(name) {
                    Some(spec) => decode_field(name, spec.codec, raw)?,
                    None => passthrough(raw),
                };
                Ok((name.clone(), value))
            })
            .collect()
    }

    pub fn encode_json(&self, record: &Record) -> Value {
        let mut object = Map::new();
        for (name, value) in record.fields() {
            let encoded = match self.field(name) {
                Some(spec) => encode_field(spec.codec, value),
                None => encode_plain(value),
            };
            object.insert(name.to_owned(), encoded);
        }
        Value::Object(object)
    }

    /// Parses operator input for one declared field. Blank input clears it.
    pub fn parse_input(&self, name: &str, raw: &str) -> CodecResult<FieldValue> {
        let spec = self.field(name).ok_or_else(|| CodecError::UnknownField {
            field: name.to_owned(),
        })?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(match spec.codec {
                FieldCodec::List => FieldValue::List(Vec::new()),
                FieldCodec::Text => FieldValue::text(""),
                FieldCodec::Integer | FieldCodec::Decimal | FieldCodec::Bool => FieldValue::Null,
            });
        }
        parse_scalar(name, spec.codec, trimmed)
    }

    /// Builds a record from `Field=value` pairs.
    pub fn parse_assignments<'a, I>(&self, assignments: I) -> CodecResult<Record>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut record = Record::new();
        for (name, raw) in assignments {
            record.set(name, self.parse_input(name, raw)?);
        }
        Ok(record)
    }

    /// Copy of `record` with `ID` set, for collaborators that key records by
    /// path rather than by body.
    pub fn with_identity(&self, record: &Record, id: &str) -> Record {
        record.clone().with(ID_FIELD, FieldValue::text(id))
    }
}

fn decode_field(name: &str, codec: FieldCodec, raw: &Value) -> CodecResult<FieldValue> {
    match (codec, raw) {
        (_, Value::Null) => Ok(FieldValue::Null),
        (FieldCodec::List, Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(value) => Ok(FieldValue::text(value.clone())),
                Value::Number(number) => Ok(FieldValue::text(number.to_string())),
                _ => Err(CodecError::InvalidList {
                    field: name.to_owned(),
                }),
            })
            .collect::<CodecResult<Vec<_>>>()
            .map(FieldValue::List),
        (FieldCodec::List, Value::String(value)) => Ok(split_list(value)),
        (FieldCodec::List, _) => Err(CodecError::InvalidList {
            field: name.to_owned(),
        }),
        (FieldCodec::Integer, Value::Number(number)) => {
            number
                .as_i64()
                .map(FieldValue::Integer)
                .ok_or_else(|| CodecError::InvalidInteger {
                    field: name.to_owned(),
                    raw: number.to_string(),
                })
        }
        (FieldCodec::Decimal, Value::Number(number)) => {
            number
                .as_f64()
                .map(FieldValue::Decimal)
                .ok_or_else(|| CodecError::InvalidDecimal {
                    field: name.to_owned(),
                    raw: number.to_string(),
                })
        }
        (FieldCodec::Bool, Value::Bool(value)) => Ok(FieldValue::Bool(*value)),
        (FieldCodec::Text, Value::String(value)) => Ok(FieldValue::text(value.clone())),
        (FieldCodec::Text, Value::Number(number)) => Ok(FieldValue::text(number.to_string())),
        (FieldCodec::Text, Value::Bool(value)) => Ok(FieldValue::text(value.to_string())),
        (_, Value::String(value)) if value.trim().is_empty() => Ok(FieldValue::Null),
        (_, Value::String(value)) => parse_scalar(name, codec, value.trim()),
        (FieldCodec::Integer, other) => Err(CodecError::InvalidInteger {
            field: name.to_owned(),
            raw: other.to_string(),
        }),
        (FieldCodec::Decimal, other) => Err(CodecError::InvalidDecimal {
            field: name.to_owned(),
            raw: other.to_string(),
        }),
        (FieldCodec::Bool, other) => Err(CodecError::InvalidBool {
            field: name.to_owned(),
            raw: other.to_string(),
        }),
        (FieldCodec::Text, other) => Ok(passthrough(other)),
    }
}

fn parse_scalar(name: &str, codec: FieldCodec, raw: &str) -> CodecResult<FieldValue> {
    match codec {
        FieldCodec::Text => Ok(FieldValue::text(raw)),
        FieldCodec::List => Ok(split_list(raw)),
        FieldCodec::Integer => {
            raw.parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| CodecError::InvalidInteger {
                    field: name.to_owned(),
                    raw: raw.to_owned(),
                })
        }
        FieldCodec::Decimal => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(FieldValue::Decimal)
            .ok_or_else(|| CodecError::InvalidDecimal {
                field: name.to_owned(),
                raw: raw.to_owned(),
            }),
        FieldCodec::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(FieldValue::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(FieldValue::Bool(false)),
            _ => Err(CodecError::InvalidBool {
                field: name.to_owned(),
                raw: raw.to_owned(),
            }),
        },
    }
}

fn split_list(raw: &str) -> FieldValue {
    FieldValue::List(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(FieldValue::text)
            .collect(),
    )
}

fn passthrough(raw: &Value) -> FieldValue {
    match raw {
        Value::Null => FieldValue::Null,
        Value::Bool(value) => FieldValue::Bool(*value),
        Value::Number(number) => match number.as_i64() {
            Some(value) => FieldValue::Integer(value),
            None => number
                .as_f64()
                .map(FieldValue::Decimal)
                .unwrap_or(FieldValue::Null),
        },
        Value::String(value) => FieldValue::text(value.clone()),
        Value::Array(items) => FieldValue::List(items.iter().map(passthrough).collect()),
        Value::Object(_) => FieldValue::text(raw.to_string()),
    }
}

fn encode_field(codec: FieldCodec, value: &FieldValue) -> Value {
    match (codec, value) {
        (FieldCodec::List, FieldValue::Null) => Value::Array(Vec::new()),
        (FieldCodec::List, FieldValue::Text(raw)) => match split_list(raw) {
            FieldValue::List(items) => Value::Array(items.iter().map(encode_plain).collect()),
            other => encode_plain(&other),
        },
        (FieldCodec::Text, FieldValue::Null) => Value::String(String::new()),
        _ => encode_plain(value),
    }
}

fn encode_plain(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(value) => Value::Bool(*value),
        FieldValue::Integer(value) => Value::Number((*value).into()),
        FieldValue::Decimal(value) => Number::from_f64(*value)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Text(value) => Value::String(value.clone()),
        FieldValue::List(items) => Value::Array(items.iter().map(encode_plain).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::CodecError;
    use crate::{EntityKind, FieldValue, Record};
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn decode_coerces_string_encoded_scalars() -> Result<()> {
        let schema = EntityKind::Device.schema();
        let record = schema.decode_json(&json!({
            "ID": "dev1",
            "Port": "161",
            "Active": "true",
            "ExtraTags": "site=ams, rack=4",
            "MeasurementGroups": ["core"],
            "Location": {"rack": 4}
        }))?;

        assert_eq!(record.id(), Some("dev1"));
        assert_eq!(record.get("Port"), Some(&FieldValue::Integer(161)));
        assert_eq!(record.get("Active"), Some(&FieldValue::Bool(true)));
        assert_eq!(
            record.get("ExtraTags"),
            Some(&FieldValue::list(["site=ams", "rack=4"]))
        );
        assert_eq!(
            record.get("MeasurementGroups"),
            Some(&FieldValue::list(["core"]))
        );
        assert_eq!(
            record.get("Location"),
            Some(&FieldValue::text(r#"{"rack":4}"#))
        );
        Ok(())
    }

    #[test]
    fn decode_rejects_malformed_numbers() {
        let error = EntityKind::Server
            .schema()
            .decode_json(&json!({"ID": "influx", "Port": "eighty"}))
            .expect_err("port is not numeric");
        assert_eq!(
            error,
            CodecError::InvalidInteger {
                field: "Port".to_owned(),
                raw: "eighty".to_owned(),
            }
        );
        assert_eq!(
            EntityKind::Server.schema().decode_json(&json!([1, 2])),
            Err(CodecError::NotAnObject)
        );
    }

    #[test]
    fn encode_emits_lists_as_arrays_and_keeps_numbers_typed() {
        let schema = EntityKind::Device.schema();
        let record = Record::with_id("dev1")
            .with("Port", 161_i64)
            .with("MeasFilters", "f1,f2")
            .with("ExtraTags", FieldValue::Null);

        assert_eq!(
            schema.encode_json(&record),
            json!({
                "ID": "dev1",
                "Port": 161,
                "MeasFilters": ["f1", "f2"],
                "ExtraTags": []
            })
        );
    }

    #[test]
    fn operator_input_uses_field_codecs() -> Result<()> {
        let schema = EntityKind::Metric.schema();
        let record = schema.parse_assignments([
            ("ID", "ifHCInOctets"),
            ("Scale", "0.5"),
            ("GetRate", "yes"),
            ("Shift", ""),
        ])?;

        assert_eq!(record.get("Scale"), Some(&FieldValue::Decimal(0.5)));
        assert_eq!(record.get("GetRate"), Some(&FieldValue::Bool(true)));
        assert_eq!(record.get("Shift"), Some(&FieldValue::Null));

        let unknown = schema
            .parse_input("Colour", "red")
            .expect_err("undeclared fields are rejected");
        assert_eq!(unknown.to_string(), "unknown field Colour");
        assert!(schema.parse_input("IsTag", "maybe").is_err());
        Ok(())
    }
}
