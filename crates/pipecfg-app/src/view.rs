// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Table view engine: derives the visible rows of a cached snapshot by
//! filtering, then sorting, then paging.

use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::{ApiError, CoreError, CoreResult, FieldValue, Record, ReloadToken};

/// Display text for missing or empty values. Filtering matches against it too,
/// so a filter of `-` selects rows with blank columns.
pub const BLANK_PLACEHOLDER: &str = "--";

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A record the engine can read named fields from.
pub trait TableRecord {
    fn field(&self, name: &str) -> Option<&FieldValue>;
}

impl TableRecord for Record {
    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub title: String,
    pub filterable: bool,
    pub sortable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    None,
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" | "" => Some(Self::None),
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub column: Option<String>,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Rows(usize),
    All,
}

impl PageSize {
    pub fn parse(value: &str) -> CoreResult<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let rows = trimmed.parse::<usize>().map_err(|_| {
            CoreError::InvalidConfig(format!(
                "page size {value:?} is neither a positive integer nor \"all\""
            ))
        })?;
        Ok(Self::Rows(rows))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    /// 1-based.
    pub index: usize,
    pub size: PageSize,
}

impl PageSpec {
    pub fn page_count(&self, total_length: usize) -> usize {
        match self.size {
            PageSize::All => 1,
            PageSize::Rows(size) => total_length.div_ceil(size.max(1)).max(1),
        }
    }

    fn window(&self, total_length: usize) -> (usize, usize) {
        match self.size {
            PageSize::All => (0, total_length),
            PageSize::Rows(size) => {
                let start = self.index.saturating_sub(1).saturating_mul(size);
                let end = start.saturating_add(size);
                (start.min(total_length), end.min(total_length))
            }
        }
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            index: 1,
            size: PageSize::Rows(DEFAULT_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewConfig {
    pub filter: String,
    pub sort: SortSpec,
    pub page: PageSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRows<'a, R> {
    pub rows: Vec<&'a R>,
    /// Matching rows before paging.
    pub total_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Applied { records: usize },
    /// A newer reload was issued after this one; its result was dropped.
    Stale,
}

/// Case-insensitive expression matcher used for row filtering. Input that is
/// not a valid expression is matched literally.
#[derive(Debug, Clone)]
pub enum FilterPattern {
    Expression(Regex),
    Literal(String),
}

impl FilterPattern {
    pub fn new(raw: &str) -> Self {
        match RegexBuilder::new(raw).case_insensitive(true).build() {
            Ok(regex) => Self::Expression(regex),
            Err(_) => Self::Literal(raw.to_lowercase()),
        }
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            Self::Expression(regex) => regex.is_match(haystack),
            Self::Literal(needle) => haystack.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Display string a cell is matched against.
pub fn filter_text(value: Option<&FieldValue>) -> String {
    match value {
        Some(value) if !value.is_blank() => value.display(),
        _ => BLANK_PLACEHOLDER.to_owned(),
    }
}

#[derive(Debug, Clone)]
pub struct TableView<R> {
    columns: Vec<ColumnDescriptor>,
    snapshot: Vec<R>,
    config: ViewConfig,
    latest_reload: ReloadToken,
}

impl<R: TableRecord> TableView<R> {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            snapshot: Vec::new(),
            config: ViewConfig::default(),
            latest_reload: ReloadToken::default(),
        }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &[R] {
        &self.snapshot
    }

    /// Replaces the cached collection. Rows are derived again only on the
    /// next [`TableView::compute_view`].
    pub fn set_snapshot(&mut self, records: Vec<R>) {
        self.snapshot = records;
    }

    pub fn set_filter_string(&mut self, filter: impl Into<String>) {
        self.config.filter = filter.into();
    }

    /// Unknown or unsortable columns clear the sort instead of failing.
    pub fn set_sort(&mut self, column: Option<&str>, direction: SortDirection) {
        let column = column.and_then(|name| {
            let known = self
                .columns
                .iter()
                .any(|column| column.name == name && column.sortable);
            if !known {
                debug!(column = name, "ignoring sort on unknown or unsortable column");
            }
            known.then(|| name.to_owned())
        });
        self.config.sort = SortSpec { column, direction };
    }

    pub fn set_page(&mut self, index: usize, size: PageSize) -> CoreResult<()> {
        if index == 0 {
            return Err(CoreError::InvalidConfig(
                "page index is 1-based; got 0".to_owned(),
            ));
        }
        if size == PageSize::Rows(0) {
            return Err(CoreError::InvalidConfig(
                "page size must be at least 1 or \"all\"".to_owned(),
            ));
        }
        self.config.page = PageSpec { index, size };
        Ok(())
    }

    pub fn set_config(&mut self, config: ViewConfig) -> CoreResult<()> {
        self.set_page(config.page.index, config.page.size)?;
        self.set_filter_string(config.filter);
        self.set_sort(config.sort.column.as_deref(), config.sort.direction);
        Ok(())
    }

    pub fn compute_view(&self) -> TableRows<'_, R> {
        let matching = self.filtered_sorted();
        let total_length = matching.len();
        let (start, end) = self.config.page.window(total_length);
        let rows = matching
            .into_iter()
            .skip(start)
            .take(end - start)
            .collect();
        TableRows { rows, total_length }
    }

    pub fn page_count(&self) -> usize {
        self.config.page.page_count(self.filtered_sorted().len())
    }

    fn filtered_sorted(&self) -> Vec<&R> {
        let mut rows: Vec<&R> = if self.config.filter.is_empty() {
            self.snapshot.iter().collect()
        } else {
            let pattern = FilterPattern::new(&self.config.filter);
            self.snapshot
                .iter()
                .filter(|record| self.record_matches(record, &pattern))
                .collect()
        };

        if let Some(column) = self.active_sort_column() {
            let direction = self.config.sort.direction;
            rows.sort_by(|left, right| {
                let order = compare_cells(left.field(column), right.field(column));
                match direction {
                    SortDirection::Desc => order.reverse(),
                    SortDirection::Asc | SortDirection::None => order,
                }
            });
        }
        rows
    }

    fn record_matches(&self, record: &R, pattern: &FilterPattern) -> bool {
        self.columns
            .iter()
            .filter(|column| column.filterable)
            .any(|column| pattern.is_match(&filter_text(record.field(&column.name))))
    }

    fn active_sort_column(&self) -> Option<&str> {
        if self.config.sort.direction == SortDirection::None {
            return None;
        }
        self.config.sort.column.as_deref()
    }

    /// Starts a reload; only the most recently issued token is applied.
    pub fn begin_reload(&mut self) -> ReloadToken {
        self.latest_reload = self.latest_reload.next();
        self.latest_reload
    }

    /// Applies a reload result. Failures of the latest reload keep the last
    /// good snapshot and are returned; stale results are dropped either way.
    pub fn finish_reload(
        &mut self,
        token: ReloadToken,
        result: Result<Vec<R>, ApiError>,
    ) -> CoreResult<ReloadOutcome> {
        if token != self.latest_reload {
            warn!(
                token = token.get(),
                latest = self.latest_reload.get(),
                "discarding stale reload result"
            );
            return Ok(ReloadOutcome::Stale);
        }
        let records = result.map_err(CoreError::Api)?;
        let count = records.len();
        self.set_snapshot(records);
        debug!(token = token.get(), records = count, "snapshot replaced");
        Ok(ReloadOutcome::Applied { records: count })
    }
}

fn compare_cells(left: Option<&FieldValue>, right: Option<&FieldValue>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.cmp_value(right),
        (None, Some(right)) => FieldValue::Null.cmp_value(right),
        (Some(left), None) => left.cmp_value(&FieldValue::Null),
        (None, None) => Ordering::Equal,
    }
}
