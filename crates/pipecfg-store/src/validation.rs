// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use pipecfg_app::{EntityKind, FieldValue, Record};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingId,
    InvalidId(String),
    MissingField(&'static str),
    PortOutOfRange(i64),
    NotPositive { field: &'static str, value: i64 },
    Negative { field: &'static str, value: i64 },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => f.write_str("ID is required"),
            Self::InvalidId(id) => {
                write!(f, "ID {id:?} must not contain whitespace or '/'")
            }
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::PortOutOfRange(port) => {
                write!(f, "Port {port} is out of range (1-65535)")
            }
            Self::NotPositive { field, value } => {
                write!(f, "{field} must be positive, got {value}")
            }
            Self::Negative { field, value } => {
                write!(f, "{field} must not be negative, got {value}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Field-level checks applied before a record is written. Reference
/// integrity is checked separately against stored records.
pub fn validate_record(kind: EntityKind, record: &Record) -> ValidationResult<()> {
    let id = record.id().ok_or(ValidationError::MissingId)?;
    if id.contains('/') || id.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidId(id.to_owned()));
    }

    match kind {
        EntityKind::Device => {
            require(record, "Host")?;
            check_port(record)?;
            if let Some(FieldValue::Integer(freq)) = record.get("Freq")
                && *freq <= 0
            {
                return Err(ValidationError::NotPositive {
                    field: "Freq",
                    value: *freq,
                });
            }
        }
        EntityKind::Server => {
            require(record, "Host")?;
            check_port(record)?;
            if let Some(FieldValue::Integer(timeout)) = record.get("Timeout")
                && *timeout < 0
            {
                return Err(ValidationError::Negative {
                    field: "Timeout",
                    value: *timeout,
                });
            }
        }
        EntityKind::Filter => require(record, "IDMeasurementCfg")?,
        EntityKind::Metric | EntityKind::Measurement | EntityKind::Group => {}
    }
    Ok(())
}

fn require(record: &Record, field: &'static str) -> ValidationResult<()> {
    match record.get(field) {
        Some(value) if !value.is_blank() => Ok(()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn check_port(record: &Record) -> ValidationResult<()> {
    match record.get("Port") {
        Some(FieldValue::Integer(port)) if !(1..=65_535).contains(port) => {
            Err(ValidationError::PortOutOfRange(*port))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{ValidationError, validate_record};
    use pipecfg_app::{EntityKind, FieldValue, Record};

    fn server(id: &str) -> Record {
        Record::with_id(id)
            .with("Host", "influx.local")
            .with("Port", 8086_i64)
            .with("Timeout", 30_i64)
    }

    #[test]
    fn accepts_well_formed_server() {
        assert_eq!(validate_record(EntityKind::Server, &server("influx1")), Ok(()));
    }

    #[test]
    fn rejects_missing_and_malformed_ids() {
        assert_eq!(
            validate_record(EntityKind::Metric, &Record::new()),
            Err(ValidationError::MissingId)
        );
        assert_eq!(
            validate_record(EntityKind::Metric, &Record::with_id("a/b")),
            Err(ValidationError::InvalidId("a/b".to_owned()))
        );
        assert_eq!(
            validate_record(EntityKind::Metric, &Record::with_id("a b")),
            Err(ValidationError::InvalidId("a b".to_owned()))
        );
    }

    #[test]
    fn host_is_required_for_devices_and_servers() {
        let device = Record::with_id("dev1").with("Host", "");
        assert_eq!(
            validate_record(EntityKind::Device, &device),
            Err(ValidationError::MissingField("Host"))
        );
        let mut server = server("influx1");
        server.remove("Host");
        assert_eq!(
            validate_record(EntityKind::Server, &server),
            Err(ValidationError::MissingField("Host"))
        );
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        let server = server("influx1").with("Port", 70_000_i64);
        assert_eq!(
            validate_record(EntityKind::Server, &server),
            Err(ValidationError::PortOutOfRange(70_000))
        );

        let device = Record::with_id("dev1")
            .with("Host", "10.0.0.1")
            .with("Freq", 0_i64);
        assert_eq!(
            validate_record(EntityKind::Device, &device),
            Err(ValidationError::NotPositive {
                field: "Freq",
                value: 0
            })
        );

        let server = self::server("influx1").with("Timeout", -1_i64);
        assert!(matches!(
            validate_record(EntityKind::Server, &server),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn filter_needs_a_measurement() {
        let filter = Record::with_id("f1").with("IDMeasurementCfg", FieldValue::Null);
        assert_eq!(
            validate_record(EntityKind::Filter, &filter),
            Err(ValidationError::MissingField("IDMeasurementCfg"))
        );
    }
}
