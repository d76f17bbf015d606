// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pipecfg_app::{
    DeleteImpactReport, EntityKind, EntityScreen, PageSize, Record, ScreenCommand, ScreenEvent,
    SortDirection, filter_text,
};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::time::Duration;

use crate::runtime::Backend;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Kinds,
    List {
        kind: EntityKind,
        filter: Option<String>,
        sort: Option<(String, SortDirection)>,
        page: usize,
        size: Option<PageSize>,
    },
    Show {
        kind: EntityKind,
        id: String,
    },
    Create {
        kind: EntityKind,
        assignments: Vec<(String, String)>,
    },
    Update {
        kind: EntityKind,
        id: String,
        assignments: Vec<(String, String)>,
    },
    Delete {
        kind: EntityKind,
        id: String,
        assume_yes: bool,
    },
}

pub fn parse_kind(raw: &str) -> Result<EntityKind> {
    EntityKind::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = EntityKind::ALL.iter().map(|kind| kind.as_str()).collect();
        anyhow!("unknown kind {raw:?}; expected one of: {}", known.join(", "))
    })
}

/// `Column[:asc|desc]`; a bare column sorts ascending.
pub fn parse_sort(raw: &str) -> Result<(String, SortDirection)> {
    let (column, direction) = match raw.split_once(':') {
        Some((column, direction)) => {
            let direction = SortDirection::parse(direction).ok_or_else(|| {
                anyhow!("invalid sort direction {direction:?}; use asc, desc or none")
            })?;
            (column, direction)
        }
        None => (raw, SortDirection::Asc),
    };
    if column.is_empty() {
        bail!("--sort needs a column name, for example --sort ID:desc");
    }
    Ok((column.to_owned(), direction))
}

pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected Field=value, got {raw:?}"))?;
    if name.is_empty() {
        bail!("expected Field=value, got {raw:?}");
    }
    Ok((name.to_owned(), value.to_owned()))
}

pub fn run<W, R>(
    command: &Command,
    backend: &Backend,
    default_page_size: PageSize,
    out: &mut W,
    input: &mut R,
) -> Result<()>
where
    W: Write,
    R: BufRead,
{
    match command {
        Command::Kinds => kinds(backend, out),
        Command::List {
            kind,
            filter,
            sort,
            page,
            size,
        } => {
            let mut session = Session::new(EntityScreen::new(backend.api(*kind)));
            if let Some(filter) = filter {
                session.send(ScreenCommand::SetFilter(filter.clone()))?;
            }
            if let Some((column, direction)) = sort {
                session.send(ScreenCommand::SetSort {
                    column: Some(column.clone()),
                    direction: *direction,
                })?;
            }
            session.send(ScreenCommand::SetPage {
                index: *page,
                size: size.unwrap_or(default_page_size),
            })?;
            list(&mut session, out)
        }
        Command::Show { kind, id } => {
            let record = backend.api(*kind).get_by_id(id)?;
            show(*kind, &record, out)
        }
        Command::Create { kind, assignments } => {
            let record = kind
                .schema()
                .parse_assignments(pairs(assignments))
                .with_context(|| format!("invalid {} fields", kind.as_str()))?;
            let created = backend.api(*kind).create(&record)?;
            writeln!(
                out,
                "created {} {}",
                kind.as_str(),
                created.id().unwrap_or_default()
            )?;
            Ok(())
        }
        Command::Update {
            kind,
            id,
            assignments,
        } => {
            let changes = kind
                .schema()
                .parse_assignments(pairs(assignments))
                .with_context(|| format!("invalid {} fields", kind.as_str()))?;
            let api = backend.api(*kind);
            let mut record = api.get_by_id(id)?;
            for (name, value) in changes.fields() {
                record.set(name, value.clone());
            }
            api.update(id, &record)?;
            writeln!(out, "updated {} {id}", kind.as_str())?;
            Ok(())
        }
        Command::Delete {
            kind,
            id,
            assume_yes,
        } => {
            let mut session = Session::new(EntityScreen::new(backend.api(*kind)));
            delete(&mut session, id, *assume_yes, out, input)
        }
    }
}

fn pairs(assignments: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    assignments
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
}

fn kinds<W: Write>(backend: &Backend, out: &mut W) -> Result<()> {
    writeln!(out, "using {}", backend.describe())?;
    for kind in EntityKind::ALL {
        let count = backend.api(kind).list(None)?.len();
        writeln!(
            out,
            "{:<12} {:<14} {:>5}  {}",
            kind.as_str(),
            kind.resource(),
            count,
            kind.label()
        )?;
    }
    Ok(())
}

fn list<W: Write>(session: &mut Session, out: &mut W) -> Result<()> {
    session.send(ScreenCommand::Reload)?;
    session.wait_for(|event| match event {
        ScreenEvent::Reloaded { .. } => Some(Ok(())),
        ScreenEvent::ReloadFailed(error) => Some(Err(error)),
        _ => None,
    })??;

    let screen = &session.screen;
    let view = screen.view();
    let rows = view.compute_view();
    let columns = view.columns();
    let cells: Vec<Vec<String>> = rows
        .rows
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| filter_text(record.get(&column.name)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            cells
                .iter()
                .map(|row| row[index].chars().count())
                .chain([column.title.chars().count()])
                .max()
                .unwrap_or_default()
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:<width$}", column.title))
        .collect();
    writeln!(out, "{}", header.join("  ").trim_end())?;
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }

    writeln!(
        out,
        "page {}/{} ({} of {} {} records)",
        view.config().page.index,
        view.page_count().max(1),
        rows.rows.len(),
        rows.total_length,
        screen.kind().as_str()
    )?;
    Ok(())
}

fn show<W: Write>(kind: EntityKind, record: &Record, out: &mut W) -> Result<()> {
    let schema = kind.schema();
    let width = schema
        .fields
        .iter()
        .map(|field| field.title.len())
        .max()
        .unwrap_or_default();
    for field in schema.fields {
        writeln!(
            out,
            "{:<width$}  {}",
            field.title,
            filter_text(record.get(field.name))
        )?;
    }
    for (name, value) in record.fields() {
        if schema.field(name).is_none() {
            writeln!(out, "{name:<width$}  {}", filter_text(Some(value)))?;
        }
    }
    Ok(())
}

fn delete<W, R>(
    session: &mut Session,
    id: &str,
    assume_yes: bool,
    out: &mut W,
    input: &mut R,
) -> Result<()>
where
    W: Write,
    R: BufRead,
{
    let kind = session.screen.kind();
    session.send(ScreenCommand::CheckDelete(id.to_owned()))?;
    let report = session.wait_for(|event| match event {
        ScreenEvent::ReportReady { report, .. } => Some(Ok(report)),
        ScreenEvent::CheckFailed { error, .. } => Some(Err(error)),
        _ => None,
    })??;
    write_report(kind, id, &report, out)?;

    if !assume_yes && !confirm(kind, id, out, input)? {
        session.send(ScreenCommand::CancelDelete)?;
        writeln!(out, "cancelled")?;
        return Ok(());
    }

    session.send(ScreenCommand::ConfirmDelete)?;
    session.wait_for(|event| match event {
        ScreenEvent::Deleted { .. } => Some(Ok(())),
        ScreenEvent::DeleteFailed { error, .. } => Some(Err(error)),
        _ => None,
    })??;
    let remaining = session.wait_for(|event| match event {
        ScreenEvent::Reloaded { records } => Some(Some(records)),
        ScreenEvent::ReloadFailed(_) => Some(None),
        _ => None,
    })?;
    match remaining {
        Some(records) => writeln!(
            out,
            "deleted {} {id}; {records} {} records remain",
            kind.as_str(),
            kind.as_str()
        )?,
        None => writeln!(out, "deleted {} {id}", kind.as_str())?,
    }
    Ok(())
}

fn write_report<W: Write>(
    kind: EntityKind,
    id: &str,
    report: &DeleteImpactReport,
    out: &mut W,
) -> Result<()> {
    if report.is_empty() {
        writeln!(out, "no other records reference {} {id}", kind.as_str())?;
        return Ok(());
    }
    writeln!(
        out,
        "deleting {} {id} affects {} records:",
        kind.as_str(),
        report.reference_count()
    )?;
    for (referencing_type, impact) in report.iter() {
        writeln!(
            out,
            "  {referencing_type}: {} ({})",
            impact.referencing_ids.join(", "),
            impact.description
        )?;
    }
    Ok(())
}

fn confirm<W, R>(kind: EntityKind, id: &str, out: &mut W, input: &mut R) -> Result<bool>
where
    W: Write,
    R: BufRead,
{
    write!(out, "delete {} {id}? [y/N] ", kind.as_str())?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer).context("read confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// One screen driven from the command line. Events that arrive ahead of
/// the one being waited for stay queued for the next wait.
struct Session {
    screen: EntityScreen,
    backlog: VecDeque<ScreenEvent>,
}

impl Session {
    fn new(screen: EntityScreen) -> Self {
        Self {
            screen,
            backlog: VecDeque::new(),
        }
    }

    fn send(&mut self, command: ScreenCommand) -> Result<()> {
        let events = self.screen.dispatch(command)?;
        self.backlog.extend(events);
        Ok(())
    }

    /// Takes events in arrival order until `pick` accepts one. Fails if
    /// nothing queued matches and the screen has no request in flight.
    fn wait_for<T>(&mut self, mut pick: impl FnMut(ScreenEvent) -> Option<T>) -> Result<T> {
        loop {
            while let Some(event) = self.backlog.pop_front() {
                if let Some(found) = pick(event) {
                    return Ok(found);
                }
            }
            if !self.screen.is_busy() {
                bail!(
                    "{} screen has no request in flight to wait for",
                    self.screen.kind().as_str()
                );
            }
            let events = self.screen.wait_events(POLL_INTERVAL);
            self.backlog.extend(events);
        }
    }
}
