// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pipecfg_app::{
    ApiError, ApiResult, DeleteReference, EntityApi, EntityKind, FieldValue, FilterPattern,
    ID_FIELD, Record, ReferenceEffect,
};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub mod validation;

pub use validation::{ValidationError, ValidationResult, validate_record};

pub const APP_NAME: &str = "pipecfg";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("entities", &["kind", "id", "body", "created_at", "updated_at"]),
    (
        "deletion_log",
        &["seq", "kind", "target_id", "cause", "deleted_at"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[RequiredIndex {
    name: "idx_deletion_log_target",
    create_sql: "CREATE INDEX IF NOT EXISTS idx_deletion_log_target ON deletion_log (kind, target_id)",
}];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRecord {
    pub kind: EntityKind,
    pub target_id: String,
    /// `<kind> <id>` of the delete that cascaded into this one.
    pub cause: Option<String>,
    pub deleted_at: String,
}

/// SQLite-backed configuration store. Records are kept as JSON documents
/// keyed by `(kind, id)`.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn bootstrap(&self) -> Result<()> {
        let conn = self.conn()?;
        if has_user_tables(&conn)? {
            validate_schema(&conn)?;
        } else {
            conn.execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }
        ensure_required_indexes(&conn)
    }

    pub fn list(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        load_records(&conn, kind)
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Record>> {
        let conn = self.conn()?;
        load_record(&conn, kind, id)
    }

    pub fn count(&self, kind: EntityKind) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM entities WHERE kind = ?",
                params![kind.as_str()],
                |row| row.get(0),
            )
            .with_context(|| format!("count {} records", kind.as_str()))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Inserts a new record. Fails with [`ApiError::Conflict`] when the ID is
    /// taken and [`ApiError::Validation`] when a field or reference is bad.
    pub fn insert(&self, kind: EntityKind, record: &Record) -> Result<Record> {
        validate_record(kind, record).map_err(|error| ApiError::Validation(error.to_string()))?;
        let id = record.id().unwrap_or_default().to_owned();

        let conn = self.conn()?;
        if load_record(&conn, kind, &id)?.is_some() {
            return Err(ApiError::Conflict(format!("{} {id} already exists", kind.as_str())).into());
        }
        ensure_references_exist(&conn, kind, &id, record)?;

        let now = now_rfc3339()?;
        conn.execute(
            "INSERT INTO entities (kind, id, body, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            params![kind.as_str(), id, encode_body(record)?, now, now],
        )
        .with_context(|| format!("insert {} {id}", kind.as_str()))?;
        debug!(kind = kind.as_str(), id = id.as_str(), "record inserted");
        Ok(record.clone())
    }

    /// Replaces the stored body of `id`. The record keeps its ID; a body
    /// carrying a different one is rejected.
    pub fn replace(&self, kind: EntityKind, id: &str, record: &Record) -> Result<Record> {
        if let Some(body_id) = record.id()
            && body_id != id
        {
            return Err(ApiError::Validation(format!(
                "cannot rename {} {id} to {body_id}; create a new record instead",
                kind.as_str()
            ))
            .into());
        }
        let mut record = record.clone();
        record.set(ID_FIELD, id);
        validate_record(kind, &record).map_err(|error| ApiError::Validation(error.to_string()))?;

        let conn = self.conn()?;
        if load_record(&conn, kind, id)?.is_none() {
            return Err(not_found(kind, id).into());
        }
        ensure_references_exist(&conn, kind, id, &record)?;
        write_record(&conn, kind, id, &record, &now_rfc3339()?)?;
        debug!(kind = kind.as_str(), id, "record replaced");
        Ok(record)
    }

    /// Records holding a reference to `id`, with the action a delete of `id`
    /// takes on each.
    pub fn references_to(&self, kind: EntityKind, id: &str) -> Result<Vec<DeleteReference>> {
        let conn = self.conn()?;
        if load_record(&conn, kind, id)?.is_none() {
            return Err(not_found(kind, id).into());
        }
        let references = find_referrers(&conn, kind, id)?
            .into_iter()
            .map(|referrer| {
                DeleteReference::new(
                    referrer.from.as_str(),
                    referrer.id,
                    referrer.action,
                )
            })
            .collect();
        Ok(references)
    }

    /// Deletes `id` and applies every reference action in one transaction:
    /// list entries are removed, single references cleared, and bound
    /// referrers deleted in turn.
    pub fn delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("begin delete transaction")?;
        if load_record(&tx, kind, id)?.is_none() {
            return Err(not_found(kind, id).into());
        }
        let now = now_rfc3339()?;
        delete_cascade(&tx, kind, id, None, &now)?;
        tx.commit()
            .with_context(|| format!("commit delete of {} {id}", kind.as_str()))?;
        info!(kind = kind.as_str(), id, "record deleted");
        Ok(())
    }

    pub fn list_deletions(&self) -> Result<Vec<DeletionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT kind, target_id, cause, deleted_at FROM deletion_log ORDER BY seq ASC")
            .context("prepare deletion log query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .context("query deletion log")?;

        let mut deletions = Vec::new();
        for row in rows {
            let (kind, target_id, cause, deleted_at) = row.context("read deletion log row")?;
            deletions.push(DeletionRecord {
                kind: parse_kind(&kind)?,
                target_id,
                cause,
                deleted_at,
            });
        }
        Ok(deletions)
    }

    /// Loads a small, referentially complete pipeline. Records that already
    /// exist are left alone.
    pub fn seed_demo_data(&self) -> Result<()> {
        for (kind, record) in demo_pipeline() {
            let id = record.id().unwrap_or_default().to_owned();
            if self.get(kind, &id)?.is_some() {
                continue;
            }
            self.insert(kind, &record)
                .with_context(|| format!("seed demo {} {id}", kind.as_str()))?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned; reopen the store"))
    }
}

/// [`EntityApi`] over one kind of a shared [`Store`].
#[derive(Clone)]
pub struct StoreApi {
    store: Arc<Store>,
    kind: EntityKind,
}

impl StoreApi {
    pub fn new(store: Arc<Store>, kind: EntityKind) -> Self {
        Self { store, kind }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

impl EntityApi for StoreApi {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn list(&self, filter: Option<&str>) -> ApiResult<Vec<Record>> {
        let records = self.store.list(self.kind).map_err(api_error)?;
        let Some(filter) = filter.filter(|raw| !raw.is_empty()) else {
            return Ok(records);
        };
        let pattern = FilterPattern::new(filter);
        Ok(records
            .into_iter()
            .filter(|record| record.id().is_some_and(|id| pattern.is_match(id)))
            .collect())
    }

    fn get_by_id(&self, id: &str) -> ApiResult<Record> {
        self.store
            .get(self.kind, id)
            .map_err(api_error)?
            .ok_or_else(|| not_found(self.kind, id))
    }

    fn create(&self, record: &Record) -> ApiResult<Record> {
        self.store.insert(self.kind, record).map_err(api_error)
    }

    fn update(&self, id: &str, record: &Record) -> ApiResult<Record> {
        self.store.replace(self.kind, id, record).map_err(api_error)
    }

    fn delete(&self, id: &str) -> ApiResult<()> {
        self.store.delete(self.kind, id).map_err(api_error)
    }

    fn check_delete(&self, id: &str) -> ApiResult<Vec<DeleteReference>> {
        self.store.references_to(self.kind, id).map_err(api_error)
    }
}

/// Fixed demo pipeline in dependency order: servers, metrics, measurements,
/// filters, groups, devices.
pub fn demo_pipeline() -> Vec<(EntityKind, Record)> {
    vec![
        (
            EntityKind::Server,
            Record::with_id("influx_main")
                .with("Host", "influxdb.lab.local")
                .with("Port", 8086_i64)
                .with("DB", "snmp")
                .with("User", "collector")
                .with("Retention", "autogen")
                .with("Precision", "s")
                .with("Timeout", 30_i64)
                .with("Description", "primary metrics database"),
        ),
        (
            EntityKind::Metric,
            counter_metric("ifHCInOctets", "in_octets", ".1.3.6.1.2.1.31.1.1.1.6"),
        ),
        (
            EntityKind::Metric,
            counter_metric("ifHCOutOctets", "out_octets", ".1.3.6.1.2.1.31.1.1.1.10"),
        ),
        (
            EntityKind::Metric,
            Record::with_id("sysUpTime")
                .with("FieldName", "uptime")
                .with("BaseOID", ".1.3.6.1.2.1.1.3.0")
                .with("DataSrcType", "TIMETICKS")
                .with("GetRate", false)
                .with("Scale", 0.01)
                .with("Shift", 0.0)
                .with("IsTag", false),
        ),
        (
            EntityKind::Measurement,
            Record::with_id("ifMIB")
                .with("Name", "interfaces")
                .with("GetMode", "indexed")
                .with("IndexOID", ".1.3.6.1.2.1.31.1.1.1.1")
                .with("IndexTag", "portName")
                .with("Fields", FieldValue::list(["ifHCInOctets", "ifHCOutOctets"])),
        ),
        (
            EntityKind::Measurement,
            Record::with_id("sysInfo")
                .with("Name", "system")
                .with("GetMode", "value")
                .with("Fields", FieldValue::list(["sysUpTime"])),
        ),
        (
            EntityKind::Filter,
            Record::with_id("ifMIB_uplinks")
                .with("IDMeasurementCfg", "ifMIB")
                .with("FType", "file")
                .with("FileName", "uplinks.txt")
                .with("EnableAlias", true),
        ),
        (
            EntityKind::Group,
            Record::with_id("core_switches")
                .with("Measurements", FieldValue::list(["ifMIB", "sysInfo"])),
        ),
        (
            EntityKind::Group,
            Record::with_id("linux_hosts").with("Measurements", FieldValue::list(["sysInfo"])),
        ),
        (
            EntityKind::Device,
            switch("core-sw1", "10.0.0.1").with("MeasFilters", FieldValue::list(["ifMIB_uplinks"])),
        ),
        (EntityKind::Device, switch("core-sw2", "10.0.0.2")),
        (
            EntityKind::Device,
            Record::with_id("linux-01")
                .with("Host", "10.0.1.10")
                .with("Port", 161_i64)
                .with("Active", false)
                .with("SnmpVersion", "2c")
                .with("Freq", 300_i64)
                .with("OutDB", "influx_main")
                .with("MeasurementGroups", FieldValue::list(["linux_hosts"]))
                .with("MeasFilters", FieldValue::List(Vec::new()))
                .with("ExtraTags", FieldValue::list(["role=server"])),
        ),
    ]
}

fn counter_metric(id: &str, field_name: &str, base_oid: &str) -> Record {
    Record::with_id(id)
        .with("FieldName", field_name)
        .with("BaseOID", base_oid)
        .with("DataSrcType", "COUNTER64")
        .with("GetRate", true)
        .with("Scale", 0.0)
        .with("Shift", 0.0)
        .with("IsTag", false)
}

fn switch(id: &str, host: &str) -> Record {
    Record::with_id(id)
        .with("Host", host)
        .with("Port", 161_i64)
        .with("Active", true)
        .with("SnmpVersion", "2c")
        .with("Freq", 60_i64)
        .with("OutDB", "influx_main")
        .with("MeasurementGroups", FieldValue::list(["core_switches"]))
        .with("MeasFilters", FieldValue::List(Vec::new()))
        .with("ExtraTags", FieldValue::list(["site=lab", "role=switch"]))
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("PIPECFG_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set PIPECFG_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("pipecfg.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

/// Collapses a store failure into the collaborator error vocabulary. Errors
/// raised as [`ApiError`] keep their kind; anything else is a backend fault.
fn api_error(error: anyhow::Error) -> ApiError {
    match error.downcast::<ApiError>() {
        Ok(api_error) => api_error,
        Err(other) => ApiError::Network(format!("{other:#}")),
    }
}

fn not_found(kind: EntityKind, id: &str) -> ApiError {
    ApiError::NotFound(format!("{} {id} not found", kind.as_str()))
}

struct Referrer {
    from: EntityKind,
    field: &'static str,
    effect: ReferenceEffect,
    action: &'static str,
    id: String,
}

fn find_referrers(conn: &Connection, kind: EntityKind, id: &str) -> Result<Vec<Referrer>> {
    let mut referrers = Vec::new();
    for reference in kind.schema().referenced_by() {
        for record in load_records(conn, reference.from)? {
            let holds = record
                .get(reference.field)
                .is_some_and(|value| value.mentions(id));
            if let Some(referrer_id) = record.id()
                && holds
            {
                referrers.push(Referrer {
                    from: reference.from,
                    field: reference.field,
                    effect: reference.effect,
                    action: reference.action,
                    id: referrer_id.to_owned(),
                });
            }
        }
    }
    Ok(referrers)
}

fn delete_cascade(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
    cause: Option<&str>,
    now: &str,
) -> Result<()> {
    for referrer in find_referrers(conn, kind, id)? {
        // Earlier steps of the same cascade may have changed or removed it.
        let Some(mut record) = load_record(conn, referrer.from, &referrer.id)? else {
            continue;
        };
        match referrer.effect {
            ReferenceEffect::RemoveFromList => {
                let kept = match record.get(referrer.field) {
                    Some(FieldValue::List(values)) => FieldValue::List(
                        values
                            .iter()
                            .filter(|value| !value.mentions(id))
                            .cloned()
                            .collect(),
                    ),
                    _ => FieldValue::List(Vec::new()),
                };
                record.set(referrer.field, kept);
                write_record(conn, referrer.from, &referrer.id, &record, now)?;
            }
            ReferenceEffect::ClearField => {
                record.set(referrer.field, FieldValue::Null);
                write_record(conn, referrer.from, &referrer.id, &record, now)?;
            }
            ReferenceEffect::DeleteReferrer => {
                let cause = format!("{} {id}", kind.as_str());
                delete_cascade(conn, referrer.from, &referrer.id, Some(&cause), now)?;
            }
        }
        debug!(
            kind = referrer.from.as_str(),
            id = referrer.id.as_str(),
            action = referrer.action,
            "applied delete action"
        );
    }

    conn.execute(
        "DELETE FROM entities WHERE kind = ? AND id = ?",
        params![kind.as_str(), id],
    )
    .with_context(|| format!("delete {} {id}", kind.as_str()))?;
    conn.execute(
        "INSERT INTO deletion_log (kind, target_id, cause, deleted_at) VALUES (?, ?, ?, ?)",
        params![kind.as_str(), id, cause, now],
    )
    .with_context(|| format!("record deletion of {} {id}", kind.as_str()))?;
    Ok(())
}

fn ensure_references_exist(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
    record: &Record,
) -> Result<()> {
    for reference in kind.schema().references() {
        let Some(value) = record.get(reference.field) else {
            continue;
        };
        for target in referenced_ids(value) {
            if load_record(conn, reference.to, target)?.is_none() {
                return Err(ApiError::Validation(format!(
                    "{} {id} field {} references unknown {} {target:?}",
                    kind.as_str(),
                    reference.field,
                    reference.to.as_str()
                ))
                .into());
            }
        }
    }
    Ok(())
}

fn referenced_ids(value: &FieldValue) -> Vec<&str> {
    match value {
        FieldValue::Text(id) if !id.is_empty() => vec![id.as_str()],
        FieldValue::List(values) => values.iter().flat_map(referenced_ids).collect(),
        _ => Vec::new(),
    }
}

fn load_records(conn: &Connection, kind: EntityKind) -> Result<Vec<Record>> {
    let mut stmt = conn
        .prepare("SELECT id, body FROM entities WHERE kind = ? ORDER BY id ASC")
        .with_context(|| format!("prepare {} list query", kind.as_str()))?;
    let rows = stmt
        .query_map(params![kind.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .with_context(|| format!("list {} records", kind.as_str()))?;

    let mut records = Vec::new();
    for row in rows {
        let (id, body) = row.with_context(|| format!("read {} row", kind.as_str()))?;
        records.push(decode_body(kind, &id, &body)?);
    }
    Ok(records)
}

fn load_record(conn: &Connection, kind: EntityKind, id: &str) -> Result<Option<Record>> {
    let body = conn
        .query_row(
            "SELECT body FROM entities WHERE kind = ? AND id = ?",
            params![kind.as_str(), id],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .with_context(|| format!("load {} {id}", kind.as_str()))?;
    body.map(|body| decode_body(kind, id, &body)).transpose()
}

fn write_record(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
    record: &Record,
    now: &str,
) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE entities SET body = ?, updated_at = ? WHERE kind = ? AND id = ?",
            params![encode_body(record)?, now, kind.as_str(), id],
        )
        .with_context(|| format!("update {} {id}", kind.as_str()))?;
    if rows_affected == 0 {
        return Err(not_found(kind, id).into());
    }
    Ok(())
}

fn encode_body(record: &Record) -> Result<String> {
    serde_json::to_string(record).context("encode record body")
}

fn decode_body(kind: EntityKind, id: &str, body: &str) -> Result<Record> {
    serde_json::from_str(body)
        .with_context(|| format!("decode stored {} {id}; the row body is not a JSON object", kind.as_str()))
}

fn parse_kind(raw: &str) -> Result<EntityKind> {
    EntityKind::parse(raw).ok_or_else(|| anyhow!("unknown entity kind {raw:?} in database"))
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point [storage].db_path at a pipecfg database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; recreate the database",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; recreate the database",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
