// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use pipecfg_app::{EntityKind, FieldValue, Record};
use std::path::PathBuf;

const METRIC_NAMES: [&str; 10] = [
    "ifHCInOctets",
    "ifHCOutOctets",
    "ifInErrors",
    "ifOutErrors",
    "ifInDiscards",
    "ifOperStatus",
    "ifName",
    "ifAlias",
    "sysUpTime",
    "hrProcessorLoad",
];

const DATA_SOURCE_TYPES: [&str; 7] = [
    "INTEGER",
    "COUNTER32",
    "COUNTER64",
    "GAUGE32",
    "TIMETICKS",
    "OCTETSTRING",
    "STRING",
];

const SNMP_VERSIONS: [&str; 3] = ["1", "2c", "3"];
const SITES: [&str; 6] = ["lab", "dc1", "dc2", "branch", "edge", "core"];
const ROLES: [&str; 5] = ["switch", "router", "firewall", "server", "ups"];
const PRECISIONS: [&str; 4] = ["s", "ms", "us", "ns"];
const DOMAINS: [&str; 4] = ["lab.local", "net.example", "infra.internal", "corp.example"];

const WORDS: [&str; 16] = [
    "collect",
    "poll",
    "interface",
    "counters",
    "uplink",
    "core",
    "edge",
    "traffic",
    "errors",
    "rate",
    "system",
    "uptime",
    "site",
    "monitor",
    "device",
    "table",
];

/// Small xorshift generator; the same seed always yields the same records.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    pub fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Generates valid pipeline records. IDs carry a per-faker sequence number
/// so a single faker never repeats one.
#[derive(Debug, Clone)]
pub struct PipelineFaker {
    rng: DeterministicRng,
    sequence: usize,
}

impl PipelineFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            sequence: 0,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn metric(&mut self) -> Record {
        let name = self.pick(&METRIC_NAMES);
        let data_type = self.pick(&DATA_SOURCE_TYPES);
        let is_tag = matches!(data_type, "OCTETSTRING" | "STRING");
        Record::with_id(self.next_id(name))
            .with("FieldName", to_snake(name))
            .with("BaseOID", self.oid())
            .with("DataSrcType", data_type)
            .with("GetRate", !is_tag && self.rng.bool())
            .with("Scale", self.int_range(0, 100) as f64 / 100.0)
            .with("Shift", 0.0)
            .with("IsTag", is_tag)
            .with("Description", self.sentence(2, 5))
    }

    pub fn server(&mut self) -> Record {
        let domain = self.pick(&DOMAINS);
        let id = self.next_id("influx");
        Record::with_id(id.as_str())
            .with("Host", format!("{id}.{domain}"))
            .with("Port", 8086_i64)
            .with("DB", format!("snmp_{}", self.pick(&SITES)))
            .with("User", "collector")
            .with("Retention", "autogen")
            .with("Precision", self.pick(&PRECISIONS))
            .with("Timeout", self.int_range(5, 60))
            .with("Description", self.sentence(2, 4))
    }

    pub fn measurement(&mut self, fields: &[String]) -> Record {
        let indexed = self.rng.bool();
        let mut record = Record::with_id(self.next_id("meas"))
            .with("Name", self.sentence(1, 2).to_lowercase().replace(' ', "_"))
            .with("GetMode", if indexed { "indexed" } else { "value" })
            .with("Fields", FieldValue::list(fields.iter().map(String::as_str)));
        if indexed {
            record.set("IndexOID", self.oid());
            record.set("IndexTag", "portName");
        }
        record
    }

    pub fn filter(&mut self, measurement_id: &str) -> Record {
        Record::with_id(self.next_id("filter"))
            .with("IDMeasurementCfg", measurement_id)
            .with("FType", "file")
            .with("FileName", format!("{}.txt", self.pick(&SITES)))
            .with("EnableAlias", self.rng.bool())
    }

    pub fn group(&mut self, measurements: &[String]) -> Record {
        Record::with_id(self.next_id("group"))
            .with(
                "Measurements",
                FieldValue::list(measurements.iter().map(String::as_str)),
            )
            .with("Description", self.sentence(2, 4))
    }

    pub fn device(&mut self, server_id: Option<&str>, groups: &[String]) -> Record {
        let role = self.pick(&ROLES);
        let mut record = Record::with_id(self.next_id(role))
            .with(
                "Host",
                format!("10.{}.{}.{}", self.int_range(0, 255), self.int_range(0, 255), self.int_range(1, 254)),
            )
            .with("Port", 161_i64)
            .with("Active", self.rng.bool())
            .with("SnmpVersion", self.pick(&SNMP_VERSIONS))
            .with("Freq", self.int_range(1, 10) * 30)
            .with("MeasurementGroups", FieldValue::list(groups.iter().map(String::as_str)))
            .with("MeasFilters", FieldValue::List(Vec::new()))
            .with(
                "ExtraTags",
                FieldValue::list([format!("site={}", self.pick(&SITES)), format!("role={role}")]),
            );
        if let Some(server_id) = server_id {
            record.set("OutDB", server_id);
        }
        record
    }

    /// A referentially complete pipeline in insertion order: one server,
    /// metrics, measurements, one filter, groups, then `devices` devices.
    pub fn pipeline(&mut self, devices: usize) -> Vec<(EntityKind, Record)> {
        let mut records = Vec::new();

        let server = self.server();
        let server_id = record_id(&server);
        records.push((EntityKind::Server, server));

        let metrics: Vec<Record> = (0..4).map(|_| self.metric()).collect();
        let metric_ids = record_ids(&metrics);
        records.extend(metrics.into_iter().map(|metric| (EntityKind::Metric, metric)));

        let measurements = vec![
            self.measurement(&metric_ids[..2]),
            self.measurement(&metric_ids[2..]),
        ];
        let measurement_ids = record_ids(&measurements);
        records.extend(
            measurements
                .into_iter()
                .map(|measurement| (EntityKind::Measurement, measurement)),
        );

        let filter = self.filter(&measurement_ids[0]);
        let filter_id = record_id(&filter);
        records.push((EntityKind::Filter, filter));

        let group = self.group(&measurement_ids);
        let group_ids = vec![record_id(&group)];
        records.push((EntityKind::Group, group));

        for index in 0..devices {
            let mut device = self.device(Some(&server_id), &group_ids);
            if index == 0 {
                device.set("MeasFilters", FieldValue::list([filter_id.as_str()]));
            }
            records.push((EntityKind::Device, device));
        }
        records
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}_{:03}", self.sequence)
    }

    fn oid(&mut self) -> String {
        format!(
            ".1.3.6.1.2.1.{}.{}.{}",
            self.int_range(1, 99),
            self.int_range(1, 20),
            self.int_range(1, 30)
        )
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let count = self.int_range(min_words as i64, max_words as i64) as usize;
        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.pick(&WORDS).to_owned());
        }
        let mut sentence = parts.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence
    }
}

pub fn record_id(record: &Record) -> String {
    record.id().unwrap_or_default().to_owned()
}

pub fn record_ids<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().map(record_id).collect()
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("pipecfg.db");
    Ok((dir, db_path))
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

fn to_snake(name: &str) -> String {
    let mut snake = String::with_capacity(name.len() + 4);
    for (index, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 {
                snake.push('_');
            }
            snake.push(ch.to_ascii_lowercase());
        } else {
            snake.push(ch);
        }
    }
    snake
}

#[cfg(test)]
mod tests {
    use super::{PipelineFaker, record_id, record_ids, to_snake};
    use pipecfg_app::{EntityKind, FieldValue};
    use std::collections::BTreeSet;

    #[test]
    fn new_deterministic_seed() {
        let mut left = PipelineFaker::new(42);
        let mut right = PipelineFaker::new(42);
        assert_eq!(left.metric(), right.metric());
        assert_eq!(left.device(None, &[]), right.device(None, &[]));
    }

    #[test]
    fn ids_never_repeat_within_a_faker() {
        let mut faker = PipelineFaker::new(7);
        let metrics: Vec<_> = (0..50).map(|_| faker.metric()).collect();
        let unique: BTreeSet<String> = record_ids(&metrics).into_iter().collect();
        assert_eq!(unique.len(), 50);
    }

    #[test]
    fn tag_metrics_never_compute_rates() {
        let mut faker = PipelineFaker::new(3);
        for _ in 0..40 {
            let metric = faker.metric();
            if metric.get("IsTag") == Some(&FieldValue::Bool(true)) {
                assert_eq!(metric.get("GetRate"), Some(&FieldValue::Bool(false)));
            }
        }
    }

    #[test]
    fn pipeline_references_only_earlier_records() {
        let mut faker = PipelineFaker::new(11);
        let pipeline = faker.pipeline(3);

        let mut seen: BTreeSet<(EntityKind, String)> = BTreeSet::new();
        for (kind, record) in &pipeline {
            for reference in kind.schema().references() {
                let Some(value) = record.get(reference.field) else {
                    continue;
                };
                let targets: Vec<String> = match value {
                    FieldValue::Text(id) => vec![id.clone()],
                    FieldValue::List(values) => values.iter().map(FieldValue::display).collect(),
                    _ => Vec::new(),
                };
                for target in targets {
                    assert!(
                        seen.contains(&(reference.to, target.clone())),
                        "{} {} references unseen {target}",
                        kind.as_str(),
                        record_id(record)
                    );
                }
            }
            seen.insert((*kind, record_id(record)));
        }

        let devices = pipeline
            .iter()
            .filter(|(kind, _)| *kind == EntityKind::Device)
            .count();
        assert_eq!(devices, 3);
    }

    #[test]
    fn snake_cases_metric_names() {
        assert_eq!(to_snake("ifHCInOctets"), "if_h_c_in_octets");
        assert_eq!(to_snake("sysUpTime"), "sys_up_time");
    }
}
