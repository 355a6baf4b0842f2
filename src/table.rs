use std::cmp::Ordering;
use std::sync::Arc;

use allocative::Allocative;
use bitvec::prelude::*;
use tracing::{debug, trace};

use crate::column::Column;
use crate::data_type::DataType;
use crate::error::{DataError, Result};
use crate::event::{CellChange, EventKind, ListenerId, Listeners, Notice, TableEvent};
use crate::expr::Predicate;
use crate::index::ColumnIndex;
use crate::tuple::{Tuple, TupleManager, TupleRef};
use crate::value::Value;

/// Column definition in the schema.
#[derive(Debug, Clone, PartialEq, Allocative)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

/// Ordered column definitions shared by a table and its consumers.
#[derive(Debug, Clone, Default, Allocative)]
pub struct Schema {
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    /// Position of the named column.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Declared type of the named column.
    pub fn data_type(&self, name: &str) -> Option<DataType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.data_type)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Multi-field sort specification used by sorted tuple iteration. Keys are
/// applied in order; later keys break ties left by earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Sort {
    keys: Vec<(String, SortDirection)>,
}

impl Sort {
    /// Single ascending key.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortDirection::Ascending)],
        }
    }

    /// Single descending key.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortDirection::Descending)],
        }
    }

    /// Appends an ascending tie-break key.
    pub fn then_ascending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortDirection::Ascending));
        self
    }

    /// Appends a descending tie-break key.
    pub fn then_descending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortDirection::Descending));
        self
    }

    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.keys
    }
}

/// An ordered collection of named typed columns sharing one row index space.
///
/// Rows live in slots: deleting a row frees its slot for reuse and
/// permanently invalidates outstanding tuple handles for it. The table owns
/// any indexes built over its columns and keeps them consistent with every
/// mutation; it is also the change-notification hub, delivering cell and
/// structural events synchronously after each write.
#[derive(Debug, Allocative)]
pub struct Table {
    schema: Schema,
    columns: Vec<Column>,
    #[allocative(skip)]
    valid: BitVec,
    free: Vec<usize>,
    row_count: usize,
    tuples: TupleManager,
    #[allocative(skip)]
    indexes: Vec<ColumnIndex>,
    #[allocative(skip)]
    listeners: Listeners,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Creates an empty table with no columns.
    pub fn new() -> Self {
        Self {
            schema: Schema::default(),
            columns: Vec::new(),
            valid: bitvec!(),
            free: Vec::new(),
            row_count: 0,
            tuples: TupleManager::default(),
            indexes: Vec::new(),
            listeners: Listeners::new(),
        }
    }

    /// The table's column definitions, in column order.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of live rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Number of row slots, free slots included. Row indices are always
    /// below this bound.
    pub fn slot_count(&self) -> usize {
        self.valid.len()
    }

    // --- Schema / column management ---

    fn insert_column(&mut self, name: &str, column: Column) -> Result<()> {
        if self.schema.position(name).is_some() {
            return Err(DataError::DuplicateColumn { name: name.into() });
        }
        let mut column = column;
        column.set_maximum_row(self.valid.len());
        self.schema.columns.push(ColumnDef {
            name: name.into(),
            data_type: column.data_type(),
        });
        self.columns.push(column);
        trace!(column = name, "added column");
        Ok(())
    }

    /// Adds a column of the given type, defaulting to the type's zero value.
    ///
    /// Existing rows (and free slots) are filled with the default.
    pub fn add_column(&mut self, name: &str, data_type: DataType) -> Result<()> {
        self.insert_column(name, Column::new(data_type))
    }

    /// Adds a column whose fresh cells take `default`.
    pub fn add_column_with_default(
        &mut self,
        name: &str,
        data_type: DataType,
        default: Value,
    ) -> Result<()> {
        self.insert_column(name, Column::with_default(data_type, default)?)
    }

    /// Adds a constant column: every row reads the same immutable value.
    pub fn add_constant_column(&mut self, name: &str, value: Value) -> Result<()> {
        self.insert_column(name, Column::constant(value))
    }

    /// Read access to a column by name.
    pub fn column(&self, field: &str) -> Result<&Column> {
        let pos = self.column_pos(field)?;
        Ok(&self.columns[pos])
    }

    /// Read access to a column by position.
    pub fn column_at(&self, pos: usize) -> Option<&Column> {
        self.columns.get(pos)
    }

    /// Marks a column as rejecting (or accepting) cell mutation.
    pub fn set_read_only(&mut self, field: &str, read_only: bool) -> Result<()> {
        let pos = self.column_pos(field)?;
        self.columns[pos].set_read_only(read_only);
        Ok(())
    }

    /// Configures whether a column accepts nulls.
    pub fn set_allows_null(&mut self, field: &str, allows_null: bool) -> Result<()> {
        let pos = self.column_pos(field)?;
        self.columns[pos].set_allows_null(allows_null);
        Ok(())
    }

    fn column_pos(&self, field: &str) -> Result<usize> {
        self.schema
            .position(field)
            .ok_or_else(|| DataError::UnknownColumn { name: field.into() })
    }

    // --- Row lifecycle ---

    /// Adds a row, reusing a free slot when one exists, and returns its
    /// tuple handle. Recycled slots are reset to column defaults.
    pub fn add_row(&mut self) -> Tuple {
        let row = match self.free.pop() {
            Some(row) => {
                self.valid.set(row, true);
                for column in &mut self.columns {
                    column.reset_slot(row);
                }
                row
            }
            None => {
                let row = self.valid.len();
                self.valid.push(true);
                for column in &mut self.columns {
                    column.push_default();
                }
                self.tuples.grow(row + 1);
                row
            }
        };
        self.row_count += 1;
        self.structural_change();
        self.listeners.emit(&Notice::Table(TableEvent {
            start_row: row,
            end_row: row,
            column: None,
            kind: EventKind::Insert,
        }));
        trace!(row, "added row");
        self.tuples.handle(row)
    }

    /// Adds `count` rows and returns their handles.
    pub fn add_rows(&mut self, count: usize) -> Vec<Tuple> {
        (0..count).map(|_| self.add_row()).collect()
    }

    /// Deletes the row behind the handle. The handle (and every copy of it)
    /// becomes permanently invalid; the slot may be reused by a later
    /// [Table::add_row].
    pub fn delete_row(&mut self, tuple: Tuple) -> Result<()> {
        let row = self.check(tuple)?;
        self.delete_row_raw(row);
        Ok(())
    }

    pub(crate) fn delete_row_raw(&mut self, row: usize) {
        self.valid.set(row, false);
        self.free.push(row);
        self.row_count -= 1;
        self.tuples.invalidate(row);
        self.structural_change();
        self.listeners.emit(&Notice::Table(TableEvent {
            start_row: row,
            end_row: row,
            column: None,
            kind: EventKind::Delete,
        }));
        trace!(row, "deleted row");
    }

    /// Deletes every row and invalidates every outstanding tuple handle.
    pub fn clear(&mut self) {
        let slots = self.valid.len();
        let rows = self.row_count;
        self.tuples.invalidate_all();
        for column in &mut self.columns {
            column.set_maximum_row(0);
        }
        self.valid.clear();
        self.free.clear();
        self.row_count = 0;
        self.structural_change();
        if slots > 0 {
            self.listeners.emit(&Notice::Table(TableEvent {
                start_row: 0,
                end_row: slots - 1,
                column: None,
                kind: EventKind::Delete,
            }));
        }
        debug!(rows, "cleared table");
    }

    // --- Tuple handles ---

    /// Handle for the live row at `row`.
    ///
    /// # Errors
    /// [DataError::RowOutOfBounds] beyond the slot space and
    /// [DataError::StaleTuple] for a freed slot: an invalid row is a
    /// reported error, never an empty tuple.
    pub fn tuple(&self, row: usize) -> Result<Tuple> {
        if row >= self.valid.len() {
            return Err(DataError::RowOutOfBounds {
                row,
                row_count: self.valid.len(),
            });
        }
        if !self.valid[row] {
            return Err(DataError::StaleTuple { row });
        }
        Ok(self.tuples.handle(row))
    }

    /// Whether the handle still denotes a live row.
    pub fn is_valid(&self, tuple: Tuple) -> bool {
        self.tuples.is_current(tuple)
            && self.valid.get(tuple.row()).map(|b| *b).unwrap_or(false)
    }

    /// Validates a handle, returning its row.
    fn check(&self, tuple: Tuple) -> Result<usize> {
        if !self.is_valid(tuple) {
            return Err(DataError::StaleTuple { row: tuple.row() });
        }
        Ok(tuple.row())
    }

    // --- Cell access ---

    /// Reads a cell as a [Value].
    pub fn get(&self, tuple: Tuple, field: &str) -> Result<Value> {
        let row = self.check(tuple)?;
        let pos = self.column_pos(field)?;
        self.columns[pos].get(row)
    }

    /// Reads a cell by column position.
    pub fn get_at(&self, tuple: Tuple, pos: usize) -> Result<Value> {
        let row = self.check(tuple)?;
        let column = self
            .columns
            .get(pos)
            .ok_or_else(|| DataError::UnknownColumn {
                name: format!("#{pos}"),
            })?;
        column.get(row)
    }

    /// Reads a boolean cell.
    pub fn get_bool(&self, tuple: Tuple, field: &str) -> Result<bool> {
        let row = self.check(tuple)?;
        let pos = self.column_pos(field)?;
        self.columns[pos].get_bool(row)
    }

    /// Reads an int cell, widening from byte storage.
    pub fn get_int(&self, tuple: Tuple, field: &str) -> Result<i32> {
        let row = self.check(tuple)?;
        let pos = self.column_pos(field)?;
        self.columns[pos].get_int(row)
    }

    /// Reads a long cell, widening from narrower storage.
    pub fn get_long(&self, tuple: Tuple, field: &str) -> Result<i64> {
        let row = self.check(tuple)?;
        let pos = self.column_pos(field)?;
        self.columns[pos].get_long(row)
    }

    /// Reads a float cell, widening from integer storage.
    pub fn get_float(&self, tuple: Tuple, field: &str) -> Result<f32> {
        let row = self.check(tuple)?;
        let pos = self.column_pos(field)?;
        self.columns[pos].get_float(row)
    }

    /// Reads a double cell, widening from any numeric storage.
    pub fn get_double(&self, tuple: Tuple, field: &str) -> Result<f64> {
        let row = self.check(tuple)?;
        let pos = self.column_pos(field)?;
        self.columns[pos].get_double(row)
    }

    /// Reads a text cell.
    pub fn get_str(&self, tuple: Tuple, field: &str) -> Result<Arc<str>> {
        let row = self.check(tuple)?;
        let pos = self.column_pos(field)?;
        self.columns[pos].get_str(row)
    }

    /// Writes a cell. When the stored value actually changes, dependent
    /// indexes are patched and listeners notified (cell notices carry the
    /// previous value); a write of the identical value is suppressed.
    pub fn set(&mut self, tuple: Tuple, field: &str, value: &Value) -> Result<()> {
        let row = self.check(tuple)?;
        let pos = self.column_pos(field)?;
        match self.columns[pos].set(row, value)? {
            Some(previous) => self.after_cell_change(pos, row, previous),
            None => Ok(()),
        }
    }

    /// Writes a cell by column position.
    pub fn set_at(&mut self, tuple: Tuple, pos: usize, value: &Value) -> Result<()> {
        let row = self.check(tuple)?;
        let column = self
            .columns
            .get_mut(pos)
            .ok_or_else(|| DataError::UnknownColumn {
                name: format!("#{pos}"),
            })?;
        match column.set(row, value)? {
            Some(previous) => self.after_cell_change(pos, row, previous),
            None => Ok(()),
        }
    }

    /// Writes a boolean cell. See [Table::set].
    pub fn set_bool(&mut self, tuple: Tuple, field: &str, value: bool) -> Result<()> {
        self.set(tuple, field, &Value::Bool(value))
    }

    /// Writes an int cell, widening into wider numeric storage.
    pub fn set_int(&mut self, tuple: Tuple, field: &str, value: i32) -> Result<()> {
        self.set(tuple, field, &Value::Int(value))
    }

    /// Writes a long cell, widening into wider numeric storage.
    pub fn set_long(&mut self, tuple: Tuple, field: &str, value: i64) -> Result<()> {
        self.set(tuple, field, &Value::Long(value))
    }

    /// Writes a float cell, widening into double storage.
    pub fn set_float(&mut self, tuple: Tuple, field: &str, value: f32) -> Result<()> {
        self.set(tuple, field, &Value::Float(value))
    }

    /// Writes a double cell.
    pub fn set_double(&mut self, tuple: Tuple, field: &str, value: f64) -> Result<()> {
        self.set(tuple, field, &Value::Double(value))
    }

    /// Writes a text cell.
    pub fn set_str(&mut self, tuple: Tuple, field: &str, value: &str) -> Result<()> {
        self.set(tuple, field, &Value::from(value))
    }

    fn after_cell_change(&mut self, pos: usize, row: usize, previous: Value) -> Result<()> {
        let current = self.columns[pos].get(row)?;
        for index in &mut self.indexes {
            if index.column() == pos {
                index.cell_changed(row, &previous, &current);
            }
        }
        self.listeners.emit(&Notice::Cell(CellChange {
            column: pos,
            row,
            previous,
        }));
        Ok(())
    }

    // --- Change notification ---

    /// Registers a listener; the returned token detaches it. Listeners run
    /// synchronously, in registration order, after each mutation.
    pub fn on_change(&mut self, callback: impl FnMut(&Notice) + 'static) -> ListenerId {
        self.listeners.subscribe(callback)
    }

    /// Detaches a listener. Returns whether the token was still attached.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // --- Iteration ---

    /// Live row numbers in slot order.
    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.valid.iter_ones()
    }

    /// Unfiltered tuple iteration in row order.
    pub fn tuples(&self) -> impl Iterator<Item = TupleRef<'_>> {
        self.valid
            .iter_ones()
            .map(move |row| TupleRef::new(self, self.tuples.handle(row)))
    }

    /// Predicate-filtered tuples, visiting rows in the same relative order
    /// as [Table::tuples].
    pub fn tuples_where(&self, predicate: &Predicate) -> Result<Vec<TupleRef<'_>>> {
        let mut out = Vec::new();
        for tuple in self.tuples() {
            if predicate.matches(self, tuple.handle())? {
                out.push(tuple);
            }
        }
        Ok(out)
    }

    /// Filtered and sorted tuples. The sort is stable, so rows comparing
    /// equal keep their row order.
    pub fn tuples_sorted(
        &self,
        predicate: Option<&Predicate>,
        sort: &Sort,
    ) -> Result<Vec<TupleRef<'_>>> {
        let keys: Vec<(usize, SortDirection)> = sort
            .keys()
            .iter()
            .map(|(field, direction)| Ok((self.column_pos(field)?, *direction)))
            .collect::<Result<_>>()?;

        let mut decorated: Vec<(Vec<Value>, Tuple)> = Vec::new();
        for tuple in self.tuples() {
            if let Some(predicate) = predicate {
                if !predicate.matches(self, tuple.handle())? {
                    continue;
                }
            }
            let row = tuple.row();
            let key_values = keys
                .iter()
                .map(|(pos, _)| self.columns[*pos].get(row))
                .collect::<Result<Vec<Value>>>()?;
            decorated.push((key_values, tuple.handle()));
        }

        decorated.sort_by(|a, b| {
            for (i, (_, direction)) in keys.iter().enumerate() {
                let mut ord = a.0[i].total_cmp(&b.0[i]);
                if *direction == SortDirection::Descending {
                    ord = ord.reverse();
                }
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        Ok(decorated
            .into_iter()
            .map(|(_, tuple)| TupleRef::new(self, tuple))
            .collect())
    }

    // --- Predicate parsing ---

    /// Parses predicate text against this table's schema. The expression
    /// must statically type to bool.
    pub fn parse_predicate(&self, text: &str) -> Result<Predicate> {
        let expr = crate::parser::parse(text)?;
        let result = expr.result_type(&self.schema)?;
        if result != DataType::Bool {
            return Err(DataError::UnsupportedResult {
                requested: DataType::Bool,
            });
        }
        Ok(Predicate::from(expr))
    }

    // --- Indexes ---

    /// Creates a duplicate-allowing sorted index over `field`. Creating an
    /// index that already exists is a no-op.
    pub fn create_index(&mut self, field: &str) -> Result<()> {
        self.create_index_inner(field, true)
    }

    /// Creates an index that rejects duplicate keys: inserting an existing
    /// key overwrites the row it maps to.
    pub fn create_unique_index(&mut self, field: &str) -> Result<()> {
        self.create_index_inner(field, false)
    }

    fn create_index_inner(&mut self, field: &str, allow_duplicates: bool) -> Result<()> {
        let pos = self.column_pos(field)?;
        if self.indexes.iter().any(|index| index.field() == field) {
            return Ok(());
        }
        let key_type = self.columns[pos].data_type();
        self.indexes
            .push(ColumnIndex::new(field, pos, key_type, allow_duplicates));
        debug!(column = field, %key_type, allow_duplicates, "created index");
        Ok(())
    }

    /// The index over `field`, rebuilt first if a structural change left it
    /// stale. A stale index never answers queries.
    pub fn index(&mut self, field: &str) -> Result<&ColumnIndex> {
        let pos = self
            .indexes
            .iter()
            .position(|index| index.field() == field)
            .ok_or_else(|| DataError::NoIndex { name: field.into() })?;
        let index = &mut self.indexes[pos];
        if !index.is_live() {
            let column = &self.columns[index.column()];
            index.rebuild(column, &self.valid);
        }
        Ok(&self.indexes[pos])
    }

    /// Whether an index exists over `field`.
    pub fn has_index(&self, field: &str) -> bool {
        self.indexes.iter().any(|index| index.field() == field)
    }

    /// Disposes of the index over `field`, detaching it from the table's
    /// update path.
    pub fn drop_index(&mut self, field: &str) -> Result<()> {
        let before = self.indexes.len();
        self.indexes.retain(|index| index.field() != field);
        if self.indexes.len() == before {
            return Err(DataError::NoIndex { name: field.into() });
        }
        debug!(column = field, "dropped index");
        Ok(())
    }

    /// Marks every index stale: a structural change invalidates them
    /// wholesale, and each rebuilds lazily on its next use.
    fn structural_change(&mut self) {
        for index in &mut self.indexes {
            index.mark_stale();
        }
    }
}
