use std::sync::Arc;

use allocative::Allocative;

use crate::error::Result;
use crate::table::Table;
use crate::value::Value;

/// A lightweight handle denoting one logical row of a table.
///
/// The handle carries the generation of its row slot. Deleting the row bumps
/// the slot's generation, so every accessor going through a stale handle
/// fails fast with a stale-tuple error; a handle freshly obtained for a
/// reused slot is valid and distinct. Two handles for the same (row,
/// generation) are interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tuple {
    row: usize,
    generation: u64,
}

impl Tuple {
    /// The row slot this handle denotes.
    pub fn row(self) -> usize {
        self.row
    }
}

/// Per-table registry of row-slot generations.
///
/// This is the invalidation side of the tuple layer: handing out handles is
/// O(1), and invalidating a row is a single counter bump rather than a hunt
/// for outstanding handles.
#[derive(Debug, Clone, Default, Allocative)]
pub(crate) struct TupleManager {
    generations: Vec<u64>,
}

impl TupleManager {
    /// Extends the registry to cover `slots` row slots.
    pub(crate) fn grow(&mut self, slots: usize) {
        if slots > self.generations.len() {
            self.generations.resize(slots, 0);
        }
    }

    /// Handle for a live row slot.
    pub(crate) fn handle(&self, row: usize) -> Tuple {
        Tuple {
            row,
            generation: self.generations[row],
        }
    }

    /// Whether the handle still denotes the live occupant of its slot.
    pub(crate) fn is_current(&self, tuple: Tuple) -> bool {
        self.generations
            .get(tuple.row)
            .is_some_and(|generation| *generation == tuple.generation)
    }

    /// Permanently invalidates every handle out for this row.
    pub(crate) fn invalidate(&mut self, row: usize) {
        if let Some(generation) = self.generations.get_mut(row) {
            *generation += 1;
        }
    }

    /// Invalidates every handle for every slot, used when the table is
    /// cleared.
    pub(crate) fn invalidate_all(&mut self) {
        for generation in &mut self.generations {
            *generation += 1;
        }
    }
}

/// A tuple bound to its table for ergonomic reads.
///
/// Produced by table iteration; every accessor re-checks handle validity
/// before delegating to the backing columns. Writes go through
/// [Table::set] and friends.
#[derive(Debug, Clone, Copy)]
pub struct TupleRef<'t> {
    table: &'t Table,
    tuple: Tuple,
}

impl<'t> TupleRef<'t> {
    pub(crate) fn new(table: &'t Table, tuple: Tuple) -> Self {
        Self { table, tuple }
    }

    /// The underlying detached handle.
    pub fn handle(self) -> Tuple {
        self.tuple
    }

    /// The row slot this tuple denotes.
    pub fn row(self) -> usize {
        self.tuple.row()
    }

    /// Whether the handle is still live.
    pub fn is_valid(self) -> bool {
        self.table.is_valid(self.tuple)
    }

    /// Reads a field as a [Value].
    pub fn get(self, field: &str) -> Result<Value> {
        self.table.get(self.tuple, field)
    }

    /// Reads a boolean field.
    pub fn get_bool(self, field: &str) -> Result<bool> {
        self.table.get_bool(self.tuple, field)
    }

    /// Reads an int field, widening from byte storage.
    pub fn get_int(self, field: &str) -> Result<i32> {
        self.table.get_int(self.tuple, field)
    }

    /// Reads a long field, widening from narrower storage.
    pub fn get_long(self, field: &str) -> Result<i64> {
        self.table.get_long(self.tuple, field)
    }

    /// Reads a float field, widening from integer storage.
    pub fn get_float(self, field: &str) -> Result<f32> {
        self.table.get_float(self.tuple, field)
    }

    /// Reads a double field, widening from any numeric storage.
    pub fn get_double(self, field: &str) -> Result<f64> {
        self.table.get_double(self.tuple, field)
    }

    /// Reads a text field.
    pub fn get_str(self, field: &str) -> Result<Arc<str>> {
        self.table.get_str(self.tuple, field)
    }
}
