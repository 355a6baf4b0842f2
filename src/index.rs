use std::sync::Arc;

use bitvec::prelude::*;
use tracing::debug;

use crate::column::Column;
use crate::data_type::DataType;
use crate::error::{DataError, Result};
use crate::rbtree::{RangeFlags, RbTree};
use crate::value::Value;

/// Maintenance state of an index.
///
/// `Fresh` indexes have never been built; `Live` indexes track their column
/// incrementally; `Stale` indexes saw a structural change and must be rebuilt
/// before the next query is trusted. The owning table performs the rebuild
/// lazily, when the index is next requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Fresh,
    Live,
    Stale,
}

/// Bitset specialization for boolean keys: the key domain has exactly two
/// values, so one bit-set per truth value replaces the tree and lookups are
/// bit-scans. Iteration among equal keys runs in row order.
#[derive(Debug, Clone, Default)]
struct BoolStore {
    falses: BitVec,
    trues: BitVec,
}

impl BoolStore {
    fn clear(&mut self) {
        self.falses.clear();
        self.trues.clear();
    }

    fn side_mut(&mut self, key: bool) -> &mut BitVec {
        if key { &mut self.trues } else { &mut self.falses }
    }

    fn side(&self, key: bool) -> &BitVec {
        if key { &self.trues } else { &self.falses }
    }

    fn put(&mut self, key: bool, row: usize) {
        let side = self.side_mut(key);
        if row >= side.len() {
            side.resize(row + 1, false);
        }
        side.set(row, true);
    }

    fn remove(&mut self, key: bool, row: usize) -> bool {
        let side = self.side_mut(key);
        if row < side.len() && side[row] {
            side.set(row, false);
            return true;
        }
        false
    }

    fn get(&self, key: bool) -> Option<usize> {
        self.side(key).iter_ones().next()
    }

    fn size(&self) -> usize {
        self.falses.count_ones() + self.trues.count_ones()
    }

    fn unique_count(&self) -> usize {
        usize::from(self.falses.any()) + usize::from(self.trues.any())
    }

    fn minimum_row(&self) -> Option<usize> {
        self.falses.iter_ones().next().or_else(|| self.trues.iter_ones().next())
    }

    fn maximum_row(&self) -> Option<usize> {
        self.trues.iter_ones().last().or_else(|| self.falses.iter_ones().last())
    }

    /// Row of the floor(size/2)-th entry in ascending (false before true)
    /// order.
    fn median_row(&self) -> Option<usize> {
        let size = self.size();
        if size == 0 {
            return None;
        }
        let k = size / 2;
        let false_count = self.falses.count_ones();
        if k < false_count {
            self.falses.iter_ones().nth(k)
        } else {
            self.trues.iter_ones().nth(k - false_count)
        }
    }

    fn rows(&self, lo: Option<bool>, hi: Option<bool>, flags: RangeFlags) -> Vec<usize> {
        let in_range = |key: bool| -> bool {
            if let Some(lo) = lo {
                match (key, lo) {
                    (false, true) => return false,
                    (k, l) if k == l && !flags.left_inclusive => return false,
                    _ => {}
                }
            }
            if let Some(hi) = hi {
                match (key, hi) {
                    (true, false) => return false,
                    (k, h) if k == h && !flags.right_inclusive => return false,
                    _ => {}
                }
            }
            true
        };

        let keys: [bool; 2] = if flags.ascending {
            [false, true]
        } else {
            [true, false]
        };
        let mut out = Vec::new();
        for key in keys {
            if !in_range(key) {
                continue;
            }
            let mut side: Vec<usize> = self.side(key).iter_ones().collect();
            if !flags.ascending {
                side.reverse();
            }
            out.extend(side);
        }
        out
    }
}

#[derive(Debug, Clone)]
enum IndexStore {
    Bool(BoolStore),
    Byte(RbTree<i8>),
    Int(RbTree<i32>),
    Long(RbTree<i64>),
    Float(RbTree<f32>),
    Double(RbTree<f64>),
    Text(RbTree<Arc<str>>),
}

/// Sorted index over one column of a table, mapping the column's values to
/// row numbers.
///
/// Null cells never enter the index; queries reflect the non-null rows only.
/// Instances are owned by their table, which keeps them consistent: a
/// single-cell write patches the index in place, while structural changes
/// mark it stale for a lazy full rebuild.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    field: String,
    column: usize,
    key_type: DataType,
    store: IndexStore,
    state: IndexState,
    allow_duplicates: bool,
}

impl ColumnIndex {
    pub(crate) fn new(
        field: impl Into<String>,
        column: usize,
        key_type: DataType,
        allow_duplicates: bool,
    ) -> Self {
        let store = match key_type {
            DataType::Bool => IndexStore::Bool(BoolStore::default()),
            DataType::Byte => IndexStore::Byte(RbTree::new(allow_duplicates)),
            DataType::Int => IndexStore::Int(RbTree::new(allow_duplicates)),
            DataType::Long => IndexStore::Long(RbTree::new(allow_duplicates)),
            DataType::Float => IndexStore::Float(RbTree::new(allow_duplicates)),
            DataType::Double => IndexStore::Double(RbTree::new(allow_duplicates)),
            DataType::Text => IndexStore::Text(RbTree::new(allow_duplicates)),
        };
        Self {
            field: field.into(),
            column,
            key_type,
            store,
            state: IndexState::Fresh,
            allow_duplicates,
        }
    }

    /// Name of the indexed column.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Position of the indexed column in its table.
    pub(crate) fn column(&self) -> usize {
        self.column
    }

    /// Key type of the index.
    pub fn key_type(&self) -> DataType {
        self.key_type
    }

    /// Current maintenance state.
    pub fn state(&self) -> IndexState {
        self.state
    }

    pub fn allows_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    // --- Maintenance (driven by the owning table) ---

    pub(crate) fn mark_stale(&mut self) {
        if self.state == IndexState::Live {
            self.state = IndexState::Stale;
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        self.state == IndexState::Live
    }

    /// Full rebuild from the column's current values, skipping dead slots
    /// and null cells. Transitions any state to `Live`.
    pub(crate) fn rebuild(&mut self, column: &Column, valid: &BitVec) {
        match &mut self.store {
            IndexStore::Bool(s) => s.clear(),
            IndexStore::Byte(t) => t.clear(),
            IndexStore::Int(t) => t.clear(),
            IndexStore::Long(t) => t.clear(),
            IndexStore::Float(t) => t.clear(),
            IndexStore::Double(t) => t.clear(),
            IndexStore::Text(t) => t.clear(),
        }
        let mut entries = 0usize;
        for row in valid.iter_ones() {
            let value = column.get(row).expect("valid row within column extent");
            if !value.is_null() {
                self.put_value(&value, row);
                entries += 1;
            }
        }
        self.state = IndexState::Live;
        debug!(field = %self.field, entries, "rebuilt column index");
    }

    /// Incremental patch for a single-cell change: the old pair leaves the
    /// index, the new one enters it. Only applied to a live index; stale and
    /// fresh indexes catch up on their next rebuild.
    pub(crate) fn cell_changed(&mut self, row: usize, previous: &Value, current: &Value) {
        if !self.is_live() {
            return;
        }
        if !previous.is_null() {
            self.remove_value(previous, row);
        }
        if !current.is_null() {
            self.put_value(current, row);
        }
    }

    fn put_value(&mut self, value: &Value, row: usize) {
        match (&mut self.store, value) {
            (IndexStore::Bool(s), Value::Bool(b)) => s.put(*b, row),
            (IndexStore::Byte(t), Value::Byte(b)) => {
                t.put(*b, row);
            }
            (IndexStore::Int(t), Value::Int(i)) => {
                t.put(*i, row);
            }
            (IndexStore::Long(t), Value::Long(l)) => {
                t.put(*l, row);
            }
            (IndexStore::Float(t), Value::Float(f)) => {
                t.put(*f, row);
            }
            (IndexStore::Double(t), Value::Double(d)) => {
                t.put(*d, row);
            }
            (IndexStore::Text(t), Value::Text(s)) => {
                t.put(Arc::clone(s), row);
            }
            _ => {}
        }
    }

    fn remove_value(&mut self, value: &Value, row: usize) {
        match (&mut self.store, value) {
            (IndexStore::Bool(s), Value::Bool(b)) => {
                s.remove(*b, row);
            }
            (IndexStore::Byte(t), Value::Byte(b)) => {
                t.remove_pair(b, row);
            }
            (IndexStore::Int(t), Value::Int(i)) => {
                t.remove_pair(i, row);
            }
            (IndexStore::Long(t), Value::Long(l)) => {
                t.remove_pair(l, row);
            }
            (IndexStore::Float(t), Value::Float(f)) => {
                t.remove_pair(f, row);
            }
            (IndexStore::Double(t), Value::Double(d)) => {
                t.remove_pair(d, row);
            }
            (IndexStore::Text(t), Value::Text(s)) => {
                t.remove_pair(s, row);
            }
            _ => {}
        }
    }

    // --- Queries ---

    /// Number of entries (indexed rows).
    pub fn size(&self) -> usize {
        match &self.store {
            IndexStore::Bool(s) => s.size(),
            IndexStore::Byte(t) => t.size(),
            IndexStore::Int(t) => t.size(),
            IndexStore::Long(t) => t.size(),
            IndexStore::Float(t) => t.size(),
            IndexStore::Double(t) => t.size(),
            IndexStore::Text(t) => t.size(),
        }
    }

    /// Number of distinct keys, independent of duplicate row counts.
    pub fn unique_count(&self) -> usize {
        match &self.store {
            IndexStore::Bool(s) => s.unique_count(),
            IndexStore::Byte(t) => t.unique_count(),
            IndexStore::Int(t) => t.unique_count(),
            IndexStore::Long(t) => t.unique_count(),
            IndexStore::Float(t) => t.unique_count(),
            IndexStore::Double(t) => t.unique_count(),
            IndexStore::Text(t) => t.unique_count(),
        }
    }

    /// Row holding the smallest indexed value.
    pub fn minimum(&self) -> Option<usize> {
        match &self.store {
            IndexStore::Bool(s) => s.minimum_row(),
            IndexStore::Byte(t) => t.minimum_row(),
            IndexStore::Int(t) => t.minimum_row(),
            IndexStore::Long(t) => t.minimum_row(),
            IndexStore::Float(t) => t.minimum_row(),
            IndexStore::Double(t) => t.minimum_row(),
            IndexStore::Text(t) => t.minimum_row(),
        }
    }

    /// Row holding the largest indexed value.
    pub fn maximum(&self) -> Option<usize> {
        match &self.store {
            IndexStore::Bool(s) => s.maximum_row(),
            IndexStore::Byte(t) => t.maximum_row(),
            IndexStore::Int(t) => t.maximum_row(),
            IndexStore::Long(t) => t.maximum_row(),
            IndexStore::Float(t) => t.maximum_row(),
            IndexStore::Double(t) => t.maximum_row(),
            IndexStore::Text(t) => t.maximum_row(),
        }
    }

    /// Row of the floor(size/2)-th entry in ascending key order.
    pub fn median(&self) -> Option<usize> {
        match &self.store {
            IndexStore::Bool(s) => s.median_row(),
            IndexStore::Byte(t) => t.median_row(),
            IndexStore::Int(t) => t.median_row(),
            IndexStore::Long(t) => t.median_row(),
            IndexStore::Float(t) => t.median_row(),
            IndexStore::Double(t) => t.median_row(),
            IndexStore::Text(t) => t.median_row(),
        }
    }

    fn key_mismatch(&self, key: &Value) -> DataError {
        DataError::KeyMismatch {
            index: self.key_type,
            key: key.data_type().unwrap_or(self.key_type),
        }
    }

    /// Widens a query bound to the index key type. `None` and `Null` both
    /// mean "unbounded on that side".
    fn widen_bound(&self, bound: Option<&Value>) -> Result<Option<Value>> {
        match bound {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .widen_to(self.key_type)
                .map(Some)
                .map_err(|_| self.key_mismatch(value)),
        }
    }

    /// Exact lookup: the row mapped by `key` (the first inserted when
    /// duplicates are allowed).
    ///
    /// # Errors
    /// [DataError::KeyMismatch] when the key cannot widen to the index key
    /// type.
    pub fn get(&self, key: &Value) -> Result<Option<usize>> {
        let key = self
            .widen_bound(Some(key))?
            .ok_or_else(|| self.key_mismatch(key))?;
        Ok(match (&self.store, &key) {
            (IndexStore::Bool(s), Value::Bool(b)) => s.get(*b),
            (IndexStore::Byte(t), Value::Byte(b)) => t.get(b),
            (IndexStore::Int(t), Value::Int(i)) => t.get(i),
            (IndexStore::Long(t), Value::Long(l)) => t.get(l),
            (IndexStore::Float(t), Value::Float(f)) => t.get(f),
            (IndexStore::Double(t), Value::Double(d)) => t.get(d),
            (IndexStore::Text(t), Value::Text(s)) => t.get(s),
            _ => None,
        })
    }

    /// Ordered range query over `[lo, hi]` honoring the direction and
    /// inclusivity flags. Unbounded sides are expressed as `None` or `Null`.
    ///
    /// # Errors
    /// [DataError::KeyMismatch] when a bound cannot widen to the index key
    /// type.
    pub fn rows(
        &self,
        lo: Option<&Value>,
        hi: Option<&Value>,
        flags: RangeFlags,
    ) -> Result<Box<dyn Iterator<Item = usize> + '_>> {
        let lo = self.widen_bound(lo)?;
        let hi = self.widen_bound(hi)?;
        Ok(match &self.store {
            IndexStore::Bool(s) => {
                let lo = lo.and_then(|v| v.as_bool());
                let hi = hi.and_then(|v| v.as_bool());
                Box::new(s.rows(lo, hi, flags).into_iter())
            }
            IndexStore::Byte(t) => {
                let lo = lo.and_then(|v| v.as_byte());
                let hi = hi.and_then(|v| v.as_byte());
                Box::new(t.rows(lo.as_ref(), hi.as_ref(), flags))
            }
            IndexStore::Int(t) => {
                let lo = lo.and_then(|v| v.as_int());
                let hi = hi.and_then(|v| v.as_int());
                Box::new(t.rows(lo.as_ref(), hi.as_ref(), flags))
            }
            IndexStore::Long(t) => {
                let lo = lo.and_then(|v| v.as_long());
                let hi = hi.and_then(|v| v.as_long());
                Box::new(t.rows(lo.as_ref(), hi.as_ref(), flags))
            }
            IndexStore::Float(t) => {
                let lo = lo.and_then(|v| v.as_float());
                let hi = hi.and_then(|v| v.as_float());
                Box::new(t.rows(lo.as_ref(), hi.as_ref(), flags))
            }
            IndexStore::Double(t) => {
                let lo = lo.and_then(|v| v.as_double());
                let hi = hi.and_then(|v| v.as_double());
                Box::new(t.rows(lo.as_ref(), hi.as_ref(), flags))
            }
            IndexStore::Text(t) => {
                let lo = lo.and_then(|v| match v {
                    Value::Text(s) => Some(s),
                    _ => None,
                });
                let hi = hi.and_then(|v| match v {
                    Value::Text(s) => Some(s),
                    _ => None,
                });
                Box::new(t.rows(lo.as_ref(), hi.as_ref(), flags))
            }
        })
    }

    /// All rows holding exactly `key`, in insertion order (row order for the
    /// boolean specialization).
    pub fn rows_eq(&self, key: &Value) -> Result<Box<dyn Iterator<Item = usize> + '_>> {
        self.rows(Some(key), Some(key), RangeFlags::ascending())
    }

    /// Full traversal of the index in the given direction.
    pub fn all(&self, ascending: bool) -> Box<dyn Iterator<Item = usize> + '_> {
        let flags = if ascending {
            RangeFlags::ascending()
        } else {
            RangeFlags::descending()
        };
        self.rows(None, None, flags)
            .expect("unbounded query cannot mismatch")
    }

    // --- Typed fast paths ---

    /// Range query with int keys. See [ColumnIndex::rows].
    pub fn rows_int(
        &self,
        lo: i32,
        hi: i32,
        flags: RangeFlags,
    ) -> Result<Box<dyn Iterator<Item = usize> + '_>> {
        self.rows(Some(&Value::Int(lo)), Some(&Value::Int(hi)), flags)
    }

    /// Range query with long keys. See [ColumnIndex::rows].
    pub fn rows_long(
        &self,
        lo: i64,
        hi: i64,
        flags: RangeFlags,
    ) -> Result<Box<dyn Iterator<Item = usize> + '_>> {
        self.rows(Some(&Value::Long(lo)), Some(&Value::Long(hi)), flags)
    }

    /// Range query with double keys. See [ColumnIndex::rows].
    pub fn rows_double(
        &self,
        lo: f64,
        hi: f64,
        flags: RangeFlags,
    ) -> Result<Box<dyn Iterator<Item = usize> + '_>> {
        self.rows(Some(&Value::Double(lo)), Some(&Value::Double(hi)), flags)
    }

    /// Range query with string keys. See [ColumnIndex::rows].
    pub fn rows_str(
        &self,
        lo: &str,
        hi: &str,
        flags: RangeFlags,
    ) -> Result<Box<dyn Iterator<Item = usize> + '_>> {
        self.rows(Some(&Value::from(lo)), Some(&Value::from(hi)), flags)
    }

    /// Rows holding exactly the given boolean key.
    pub fn rows_bool(&self, key: bool) -> Result<Box<dyn Iterator<Item = usize> + '_>> {
        self.rows_eq(&Value::Bool(key))
    }
}
