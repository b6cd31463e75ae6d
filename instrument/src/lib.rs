//! Recording of solver traces into column tables.
//!
//! The solver emits one structured `tracing` event per accepted step and per
//! trial, with a `solver_*` target:
//!
//! ```ignore
//! tracing::info!(target: "solver_step", step, evaluations, badness, tolerance);
//! ```
//!
//! [`TraceSubscriber`] turns every such event into a row of the table named
//! after its target. Columns are created on first sight of a field and padded
//! so that all columns of a table stay the same length.
//!
//! ```ignore
//! let (solution, recorder) = instrument::record(|| equilibrium::solve(&ps, &prices, &config));
//! let badness = recorder.table("solver_step").and_then(|t| t.f64s("badness"));
//! ```

mod frames;

pub use frames::{ScopedRecorder, drain_to_dataframes, save_parquet};

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Level, Metadata, Subscriber};

/// Targets with this prefix are recorded by the default subscriber.
pub const SOLVER_PREFIX: &str = "solver_";

// ============================================================================
// Tables
// ============================================================================

/// Values of one field across the rows of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::U64(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::F64(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill with the type's zero value up to `rows`.
    fn pad_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        if missing == 0 {
            return;
        }
        match self {
            Column::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            Column::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            Column::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            Column::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            Column::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }
}

/// Rows of one event target.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: HashMap<String, Column>,
    pub rows: usize,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    fn pad(&mut self) {
        for column in self.columns.values_mut() {
            column.pad_to(self.rows);
        }
    }

    pub fn f64s(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            Column::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn u64s(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            Column::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn bools(&self, name: &str) -> Option<&[bool]> {
        match self.columns.get(name)? {
            Column::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn strs(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            Column::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Column names in sorted order.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Tables keyed by event target.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub tables: HashMap<String, Table>,
}

impl Recorder {
    pub fn table(&self, target: &str) -> Option<&Table> {
        self.tables.get(target)
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

// ============================================================================
// Subscriber
// ============================================================================

/// Appends the fields of one event to a table row.
struct RowVisitor<'a> {
    table: &'a mut Table,
}

impl RowVisitor<'_> {
    fn column(&mut self, field: &Field, empty: impl FnOnce(usize) -> Column) -> &mut Column {
        let rows = self.table.rows;
        self.table
            .columns
            .entry(field.name().to_string())
            .or_insert_with(|| empty(rows))
    }
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let Column::U64(v) = self.column(field, |n| Column::U64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let Column::I64(v) = self.column(field, |n| Column::I64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Column::F64(v) = self.column(field, |n| Column::F64(vec![0.0; n])) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let Column::Bool(v) = self.column(field, |n| Column::Bool(vec![false; n])) {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let Column::Str(v) = self.column(field, |n| Column::Str(vec![String::new(); n])) {
            v.push(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }
}

/// Tracing subscriber that records info-level events whose target starts
/// with a prefix into the current thread's [`Recorder`].
///
/// Spans are ignored. Events of other targets (the solver's human-readable
/// log lines among them) are not recorded.
#[derive(Debug, Clone)]
pub struct TraceSubscriber {
    prefix: &'static str,
}

impl Default for TraceSubscriber {
    fn default() -> Self {
        Self::with_prefix(SOLVER_PREFIX)
    }
}

impl TraceSubscriber {
    pub fn with_prefix(prefix: &'static str) -> Self {
        Self { prefix }
    }
}

impl Subscriber for TraceSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event()
            && *metadata.level() <= Level::INFO
            && metadata.target().starts_with(self.prefix)
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();
        RECORDER.with(|r| {
            let mut recorder = r.borrow_mut();
            let table = recorder.tables.entry(target).or_default();
            event.record(&mut RowVisitor { table: &mut *table });
            table.rows += 1;
            // fields this event did not carry
            table.pad();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install a [`TraceSubscriber`] as the global default. Does nothing if a
/// global subscriber is already set.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(TraceSubscriber::default());
}

/// Take everything recorded on this thread so far.
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}

/// Run `f` with a scoped [`TraceSubscriber`] and return its result together
/// with the events it produced.
pub fn record<R>(f: impl FnOnce() -> R) -> (R, Recorder) {
    clear();
    let result = tracing::subscriber::with_default(TraceSubscriber::default(), f);
    (result, drain())
}
