use std::sync::Arc;

use allocative::Allocative;
use bitvec::prelude::*;

use crate::data_type::DataType;
use crate::error::{DataError, Result};
use crate::value::Value;

/// Physical storage for column data.
/// Each variant wraps a collection of a specific type to ensure contiguous
/// memory allocation (columnar storage). The `Constant` variant is the
/// degenerate case: every logical row shares one immutable value.
#[derive(Debug, Clone, PartialEq, Allocative)]
pub enum ColumnData {
    /// Compact bit-vector for boolean values.
    Bool(#[allocative(skip)] BitVec),
    /// Vector of 8-bit integers.
    Byte(Vec<i8>),
    /// Vector of 32-bit integers.
    Int(Vec<i32>),
    /// Vector of 64-bit integers.
    Long(Vec<i64>),
    /// Vector of 32-bit floats.
    Float(Vec<f32>),
    /// Vector of 64-bit floats.
    Double(Vec<f64>),
    /// Vector of thread-safe atomic reference-counted strings.
    Text(#[allocative(skip)] Vec<Arc<str>>),
    /// A single value shared by every logical row.
    Constant(Value),
}

/// Typed, growable, row-indexed storage for one attribute.
///
/// A column tracks its logical row extent separately from its backing
/// capacity, carries a default value used to fill newly exposed slots, and
/// can reject external mutation (`read_only`) or null values (`allows_null`).
/// Change reporting happens at the table layer: every mutator returns the
/// previous value when the cell actually changed and `None` when the write
/// was a no-op, and the owning table turns that into notifications.
#[derive(Debug, Clone, PartialEq, Allocative)]
pub struct Column {
    data_type: DataType,
    data: ColumnData,
    #[allocative(skip)]
    null_bitmap: BitVec,
    default: Value,
    read_only: bool,
    allows_null: bool,
}

/// Zero value used to back fresh slots of each type.
fn zero_of(data_type: DataType) -> Value {
    match data_type {
        DataType::Bool => Value::Bool(false),
        DataType::Byte => Value::Byte(0),
        DataType::Int => Value::Int(0),
        DataType::Long => Value::Long(0),
        DataType::Float => Value::Float(0.0),
        DataType::Double => Value::Double(0.0),
        DataType::Text => Value::Text(Arc::from("")),
    }
}

impl Column {
    /// Creates a new, empty column of the given type with a zero default.
    pub fn new(data_type: DataType) -> Self {
        let data = match data_type {
            DataType::Bool => ColumnData::Bool(bitvec!()),
            DataType::Byte => ColumnData::Byte(vec![]),
            DataType::Int => ColumnData::Int(vec![]),
            DataType::Long => ColumnData::Long(vec![]),
            DataType::Float => ColumnData::Float(vec![]),
            DataType::Double => ColumnData::Double(vec![]),
            DataType::Text => ColumnData::Text(vec![]),
        };
        Self {
            data_type,
            data,
            null_bitmap: bitvec!(),
            default: zero_of(data_type),
            read_only: false,
            allows_null: true,
        }
    }

    /// Creates an empty column whose fresh slots are filled with `default`.
    ///
    /// # Errors
    /// Fails when the default cannot be stored as the column's type.
    pub fn with_default(data_type: DataType, default: Value) -> Result<Self> {
        let default = default.widen_to(data_type)?;
        let mut column = Self::new(data_type);
        column.default = default;
        Ok(column)
    }

    /// Creates a column pre-sized to `rows` logical rows backed by at least
    /// `capacity` slots.
    ///
    /// # Errors
    /// Fails with [DataError::CapacityTooSmall] when `capacity < rows`.
    pub fn with_rows(data_type: DataType, rows: usize, capacity: usize) -> Result<Self> {
        if capacity < rows {
            return Err(DataError::CapacityTooSmall { capacity, rows });
        }
        let mut column = Self::new(data_type);
        column.reserve(capacity);
        column.set_maximum_row(rows);
        Ok(column)
    }

    /// Creates a constant column: one immutable value shared by every row.
    /// Constant columns are read-only and never produce change reports.
    pub fn constant(value: Value) -> Self {
        let data_type = value.data_type().unwrap_or(DataType::Text);
        Self {
            data_type,
            data: ColumnData::Constant(value),
            null_bitmap: bitvec!(),
            default: zero_of(data_type),
            read_only: true,
            allows_null: true,
        }
    }

    /// The declared type of this column.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The value used to fill newly exposed slots.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Whether external mutation is rejected.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Marks the column as rejecting (or accepting) external mutation.
    /// Constant columns stay read-only regardless.
    pub fn set_read_only(&mut self, read_only: bool) {
        if !matches!(self.data, ColumnData::Constant(_)) {
            self.read_only = read_only;
        }
    }

    /// Whether null values may be stored.
    pub fn allows_null(&self) -> bool {
        self.allows_null
    }

    /// Configures whether null values may be stored.
    pub fn set_allows_null(&mut self, allows_null: bool) {
        self.allows_null = allows_null;
    }

    /// Returns the number of rows currently stored in the column.
    pub fn row_count(&self) -> usize {
        self.null_bitmap.len()
    }

    /// Returns true if there is no row in the column.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Grows or truncates the logical row extent. Existing values are
    /// preserved; newly exposed slots take the column's default value.
    ///
    /// Structural resizing is the owning table's job, so this bypasses the
    /// read-only flag (which guards cell mutation only).
    pub fn set_maximum_row(&mut self, rows: usize) {
        let current = self.row_count();
        if rows < current {
            self.truncate(rows);
            return;
        }
        for _ in current..rows {
            self.push_default();
        }
    }

    fn truncate(&mut self, rows: usize) {
        self.null_bitmap.truncate(rows);
        match &mut self.data {
            ColumnData::Bool(v) => v.truncate(rows),
            ColumnData::Byte(v) => v.truncate(rows),
            ColumnData::Int(v) => v.truncate(rows),
            ColumnData::Long(v) => v.truncate(rows),
            ColumnData::Float(v) => v.truncate(rows),
            ColumnData::Double(v) => v.truncate(rows),
            ColumnData::Text(v) => v.truncate(rows),
            ColumnData::Constant(_) => {}
        }
    }

    /// Pre-reserves backing storage for at least `capacity` total slots.
    pub fn reserve(&mut self, capacity: usize) {
        let extra = capacity.saturating_sub(self.row_count());
        match &mut self.data {
            ColumnData::Bool(v) => v.reserve(extra),
            ColumnData::Byte(v) => v.reserve(extra),
            ColumnData::Int(v) => v.reserve(extra),
            ColumnData::Long(v) => v.reserve(extra),
            ColumnData::Float(v) => v.reserve(extra),
            ColumnData::Double(v) => v.reserve(extra),
            ColumnData::Text(v) => v.reserve(extra),
            ColumnData::Constant(_) => {}
        }
    }

    /// Amortized geometric growth: when the backing vector is full, grow it
    /// by half its length plus one before appending.
    fn grow_for_append(&mut self) {
        fn bump<T>(v: &mut Vec<T>) {
            if v.len() == v.capacity() {
                v.reserve_exact(v.len() / 2 + 1);
            }
        }
        match &mut self.data {
            ColumnData::Byte(v) => bump(v),
            ColumnData::Int(v) => bump(v),
            ColumnData::Long(v) => bump(v),
            ColumnData::Float(v) => bump(v),
            ColumnData::Double(v) => bump(v),
            ColumnData::Text(v) => bump(v),
            ColumnData::Bool(_) | ColumnData::Constant(_) => {}
        }
    }

    /// Appends one default-valued slot. Used by the owning table when a row
    /// is added, so it bypasses the read-only flag.
    pub fn push_default(&mut self) {
        self.grow_for_append();
        let default = self.default.clone();
        self.push_raw(&default);
    }

    fn push_raw(&mut self, value: &Value) {
        let null = value.is_null();
        self.null_bitmap.push(null);
        // Null keeps index alignment by storing the type's zero value.
        let stored = if null {
            zero_of(self.data_type)
        } else {
            value.clone()
        };
        match (&mut self.data, stored) {
            (ColumnData::Bool(v), Value::Bool(b)) => v.push(b),
            (ColumnData::Byte(v), Value::Byte(b)) => v.push(b),
            (ColumnData::Int(v), Value::Int(i)) => v.push(i),
            (ColumnData::Long(v), Value::Long(l)) => v.push(l),
            (ColumnData::Float(v), Value::Float(f)) => v.push(f),
            (ColumnData::Double(v), Value::Double(d)) => v.push(d),
            (ColumnData::Text(v), Value::Text(s)) => v.push(s),
            (ColumnData::Constant(_), _) => {}
            _ => unreachable!("push_raw callers widen to the column type first"),
        }
    }

    /// Appends a new value to the end of the column.
    ///
    /// # Errors
    /// Fails when the value's type cannot widen to the column's type, or a
    /// null is offered to a null-rejecting column.
    pub fn push(&mut self, value: Value) -> Result<()> {
        if value.is_null() && !self.allows_null {
            return Err(DataError::NullNotAllowed);
        }
        let value = value.widen_to(self.data_type)?;
        self.grow_for_append();
        self.push_raw(&value);
        Ok(())
    }

    fn check_bounds(&self, row: usize) -> Result<()> {
        let row_count = self.row_count();
        if row >= row_count {
            return Err(DataError::RowOutOfBounds { row, row_count });
        }
        Ok(())
    }

    /// Retrieves the value at the specified row index.
    ///
    /// # Errors
    /// Fails with [DataError::RowOutOfBounds] for rows outside the logical
    /// extent.
    pub fn get(&self, row: usize) -> Result<Value> {
        self.check_bounds(row)?;
        if let ColumnData::Constant(value) = &self.data {
            return Ok(value.clone());
        }
        if self.null_bitmap[row] {
            return Ok(Value::Null);
        }
        Ok(match &self.data {
            ColumnData::Bool(v) => Value::Bool(v[row]),
            ColumnData::Byte(v) => Value::Byte(v[row]),
            ColumnData::Int(v) => Value::Int(v[row]),
            ColumnData::Long(v) => Value::Long(v[row]),
            ColumnData::Float(v) => Value::Float(v[row]),
            ColumnData::Double(v) => Value::Double(v[row]),
            ColumnData::Text(v) => Value::Text(Arc::clone(&v[row])),
            ColumnData::Constant(_) => unreachable!(),
        })
    }

    /// Replaces the value at `row`, reporting the previous value.
    ///
    /// Returns `Ok(Some(previous))` when the stored value changed and
    /// `Ok(None)` when the write was suppressed because the new value is
    /// bit-for-bit identical to the current one.
    ///
    /// # Errors
    /// [DataError::ReadOnly] on read-only or constant columns (reported
    /// before any type checking so callers can distinguish the two),
    /// [DataError::TypeMismatch] when the value cannot widen to the column
    /// type, [DataError::NullNotAllowed] for rejected nulls, and
    /// [DataError::RowOutOfBounds] for rows outside the logical extent.
    pub fn set(&mut self, row: usize, value: &Value) -> Result<Option<Value>> {
        self.check_bounds(row)?;
        if self.read_only {
            return Err(DataError::ReadOnly);
        }
        if value.is_null() && !self.allows_null {
            return Err(DataError::NullNotAllowed);
        }
        let value = value.widen_to(self.data_type)?;
        let previous = self.get(row)?;
        if previous.bits_eq(&value) {
            return Ok(None);
        }

        self.write_cell(row, &value);
        Ok(Some(previous))
    }

    /// Writes a cell that has already been widened to the column type,
    /// bypassing the read-only flag and change reporting.
    fn write_cell(&mut self, row: usize, value: &Value) {
        if value.is_null() {
            // The stored cell keeps its old payload; the bitmap alone marks
            // the null, which is what get() consults first.
            self.null_bitmap.set(row, true);
            return;
        }
        self.null_bitmap.set(row, false);
        match (&mut self.data, value) {
            (ColumnData::Bool(v), Value::Bool(b)) => {
                v.set(row, *b);
            }
            (ColumnData::Byte(v), Value::Byte(b)) => v[row] = *b,
            (ColumnData::Int(v), Value::Int(i)) => v[row] = *i,
            (ColumnData::Long(v), Value::Long(l)) => v[row] = *l,
            (ColumnData::Float(v), Value::Float(f)) => v[row] = *f,
            (ColumnData::Double(v), Value::Double(d)) => v[row] = *d,
            (ColumnData::Text(v), Value::Text(s)) => v[row] = Arc::clone(s),
            (ColumnData::Constant(_), _) => {}
            _ => unreachable!("value was widened to the column type"),
        }
    }

    /// Resets a recycled row slot to the column default. Slot recycling is
    /// structural, so this bypasses the read-only flag.
    pub(crate) fn reset_slot(&mut self, row: usize) {
        let default = self.default.clone();
        self.write_cell(row, &default);
    }

    // --- Typed fast paths ---

    fn null_check(&self, row: usize) -> Result<()> {
        if !matches!(self.data, ColumnData::Constant(_)) && self.null_bitmap[row] {
            return Err(DataError::NullValue { row });
        }
        Ok(())
    }

    fn mismatch(&self, requested: DataType) -> DataError {
        DataError::TypeMismatch {
            stored: self.data_type,
            requested,
        }
    }

    /// Reads a boolean cell.
    pub fn get_bool(&self, row: usize) -> Result<bool> {
        self.check_bounds(row)?;
        self.null_check(row)?;
        match &self.data {
            ColumnData::Bool(v) => Ok(v[row]),
            ColumnData::Constant(value) => {
                value.as_bool().ok_or_else(|| self.mismatch(DataType::Bool))
            }
            _ => Err(self.mismatch(DataType::Bool)),
        }
    }

    /// Reads a cell as a 32-bit integer, widening from byte storage.
    pub fn get_int(&self, row: usize) -> Result<i32> {
        self.check_bounds(row)?;
        self.null_check(row)?;
        match &self.data {
            ColumnData::Byte(v) => Ok(i32::from(v[row])),
            ColumnData::Int(v) => Ok(v[row]),
            ColumnData::Constant(value) => value
                .widen_int()
                .ok_or_else(|| self.mismatch(DataType::Int)),
            _ => Err(self.mismatch(DataType::Int)),
        }
    }

    /// Reads a cell as a 64-bit integer, widening from narrower storage.
    pub fn get_long(&self, row: usize) -> Result<i64> {
        self.check_bounds(row)?;
        self.null_check(row)?;
        match &self.data {
            ColumnData::Byte(v) => Ok(i64::from(v[row])),
            ColumnData::Int(v) => Ok(i64::from(v[row])),
            ColumnData::Long(v) => Ok(v[row]),
            ColumnData::Constant(value) => value
                .widen_long()
                .ok_or_else(|| self.mismatch(DataType::Long)),
            _ => Err(self.mismatch(DataType::Long)),
        }
    }

    /// Reads a cell as a 32-bit float, widening from integer storage.
    pub fn get_float(&self, row: usize) -> Result<f32> {
        self.check_bounds(row)?;
        self.null_check(row)?;
        match &self.data {
            ColumnData::Byte(v) => Ok(f32::from(v[row])),
            ColumnData::Int(v) => Ok(v[row] as f32),
            ColumnData::Long(v) => Ok(v[row] as f32),
            ColumnData::Float(v) => Ok(v[row]),
            ColumnData::Constant(value) => value
                .widen_float()
                .ok_or_else(|| self.mismatch(DataType::Float)),
            _ => Err(self.mismatch(DataType::Float)),
        }
    }

    /// Reads a cell as a 64-bit float, widening from any numeric storage.
    pub fn get_double(&self, row: usize) -> Result<f64> {
        self.check_bounds(row)?;
        self.null_check(row)?;
        match &self.data {
            ColumnData::Byte(v) => Ok(f64::from(v[row])),
            ColumnData::Int(v) => Ok(f64::from(v[row])),
            ColumnData::Long(v) => Ok(v[row] as f64),
            ColumnData::Float(v) => Ok(f64::from(v[row])),
            ColumnData::Double(v) => Ok(v[row]),
            ColumnData::Constant(value) => value
                .widen_double()
                .ok_or_else(|| self.mismatch(DataType::Double)),
            _ => Err(self.mismatch(DataType::Double)),
        }
    }

    /// Reads a text cell. The returned handle shares the stored allocation.
    pub fn get_str(&self, row: usize) -> Result<Arc<str>> {
        self.check_bounds(row)?;
        self.null_check(row)?;
        match &self.data {
            ColumnData::Text(v) => Ok(Arc::clone(&v[row])),
            ColumnData::Constant(Value::Text(s)) => Ok(Arc::clone(s)),
            _ => Err(self.mismatch(DataType::Text)),
        }
    }

    /// Writes a boolean cell. See [Column::set] for change reporting.
    pub fn set_bool(&mut self, row: usize, value: bool) -> Result<Option<Value>> {
        self.set(row, &Value::Bool(value))
    }

    /// Writes an integer cell, widening into wider numeric storage.
    pub fn set_int(&mut self, row: usize, value: i32) -> Result<Option<Value>> {
        self.set(row, &Value::Int(value))
    }

    /// Writes a long cell, widening into wider numeric storage.
    pub fn set_long(&mut self, row: usize, value: i64) -> Result<Option<Value>> {
        self.set(row, &Value::Long(value))
    }

    /// Writes a float cell, widening into double storage.
    pub fn set_float(&mut self, row: usize, value: f32) -> Result<Option<Value>> {
        self.set(row, &Value::Float(value))
    }

    /// Writes a double cell.
    pub fn set_double(&mut self, row: usize, value: f64) -> Result<Option<Value>> {
        self.set(row, &Value::Double(value))
    }

    /// Writes a text cell.
    pub fn set_str(&mut self, row: usize, value: &str) -> Result<Option<Value>> {
        self.set(row, &Value::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─────────────────────────────────────────────────────────────
    // Test 1 : Creation
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_column_new() {
        let col = Column::new(DataType::Int);

        assert_eq!(col.data_type(), DataType::Int);
        assert_eq!(col.row_count(), 0);
        assert!(col.is_empty());
        assert_eq!(col.default_value(), &Value::Int(0));
        assert!(!col.is_read_only());
        assert!(col.allows_null());
    }

    // ─────────────────────────────────────────────────────────────
    // Test 2 : Basic push & get
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_push_and_get() {
        let mut col = Column::new(DataType::Int);

        col.push(Value::Int(42)).unwrap();

        assert_eq!(col.row_count(), 1);
        assert_eq!(col.get(0), Ok(Value::Int(42)));
        assert_eq!(col.get_int(0), Ok(42));
    }

    // ─────────────────────────────────────────────────────────────
    // Test 3 : NULL handling
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_null_handling() {
        let mut col = Column::new(DataType::Int);

        col.push(Value::Int(10)).unwrap();
        col.push(Value::Null).unwrap();
        col.push(Value::Int(20)).unwrap();

        assert_eq!(col.row_count(), 3);
        assert_eq!(col.get(0), Ok(Value::Int(10)));
        assert_eq!(col.get(1), Ok(Value::Null));
        assert_eq!(col.get(2), Ok(Value::Int(20)));

        assert_eq!(col.get_int(1), Err(DataError::NullValue { row: 1 }));
    }

    #[test]
    fn test_null_rejection() {
        let mut col = Column::new(DataType::Int);
        col.set_allows_null(false);

        assert_eq!(col.push(Value::Null), Err(DataError::NullNotAllowed));
        col.push(Value::Int(1)).unwrap();
        assert_eq!(col.set(0, &Value::Null), Err(DataError::NullNotAllowed));
    }

    // ─────────────────────────────────────────────────────────────
    // Test 4 : Type mismatch
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_type_mismatch() {
        let mut col = Column::new(DataType::Int);

        let result = col.push(Value::Text("hello".into()));

        assert!(result.is_err());
        assert_eq!(col.row_count(), 0);
    }

    #[test]
    fn test_widening_set_and_get() {
        let mut col = Column::new(DataType::Double);
        col.push(Value::Double(0.0)).unwrap();

        // int setter widens into double storage
        col.set_int(0, 7).unwrap();
        assert_eq!(col.get(0), Ok(Value::Double(7.0)));
        assert_eq!(col.get_double(0), Ok(7.0));

        // narrowing read fails with a typed error
        assert_eq!(
            col.get_int(0),
            Err(DataError::TypeMismatch {
                stored: DataType::Double,
                requested: DataType::Int,
            })
        );

        // cross-kind write fails with a typed error
        assert_eq!(
            col.set_bool(0, true),
            Err(DataError::TypeMismatch {
                stored: DataType::Double,
                requested: DataType::Bool,
            })
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Test 5 : Out of bounds
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_out_of_bounds() {
        let mut col = Column::new(DataType::Int);

        assert_eq!(
            col.get(0),
            Err(DataError::RowOutOfBounds {
                row: 0,
                row_count: 0
            })
        );
        assert_eq!(
            col.set(100, &Value::Int(1)),
            Err(DataError::RowOutOfBounds {
                row: 100,
                row_count: 0
            })
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Test 6 : Growth preserves data
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_set_maximum_row_growth() {
        let mut col = Column::with_default(DataType::Int, Value::Int(-1)).unwrap();
        for i in 0..5 {
            col.push(Value::Int(i)).unwrap();
        }

        col.set_maximum_row(8);

        assert_eq!(col.row_count(), 8);
        for i in 0..5 {
            assert_eq!(col.get(i as usize), Ok(Value::Int(i)));
        }
        for row in 5..8 {
            assert_eq!(col.get(row), Ok(Value::Int(-1)));
        }

        col.set_maximum_row(2);
        assert_eq!(col.row_count(), 2);
        assert_eq!(col.get(1), Ok(Value::Int(1)));
    }

    #[test]
    fn test_with_rows_capacity() {
        let col = Column::with_rows(DataType::Long, 4, 16).unwrap();
        assert_eq!(col.row_count(), 4);
        assert_eq!(col.get(3), Ok(Value::Long(0)));

        assert_eq!(
            Column::with_rows(DataType::Long, 8, 4),
            Err(DataError::CapacityTooSmall {
                capacity: 4,
                rows: 8
            })
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Test 7 : No-op suppression
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_noop_suppression() {
        let mut col = Column::new(DataType::Int);
        col.push(Value::Int(5)).unwrap();

        assert_eq!(col.set(0, &Value::Int(5)), Ok(None));
        assert_eq!(col.set(0, &Value::Int(6)), Ok(Some(Value::Int(5))));
        assert_eq!(col.set(0, &Value::Int(6)), Ok(None));

        // null to null is also a no-op
        col.set(0, &Value::Null).unwrap();
        assert_eq!(col.set(0, &Value::Null), Ok(None));
    }

    #[test]
    fn test_noop_suppression_is_bit_exact() {
        let mut col = Column::new(DataType::Double);
        col.push(Value::Double(0.0)).unwrap();

        // -0.0 differs from 0.0 bit-for-bit, so this is a real change
        assert_eq!(
            col.set(0, &Value::Double(-0.0)),
            Ok(Some(Value::Double(0.0)))
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Test 8 : Read-only and constant columns
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_read_only() {
        let mut col = Column::new(DataType::Int);
        col.push(Value::Int(1)).unwrap();
        col.set_read_only(true);

        assert_eq!(col.set(0, &Value::Int(2)), Err(DataError::ReadOnly));
        // read-only is reported even for a write that would also mismatch
        assert_eq!(col.set(0, &Value::Bool(true)), Err(DataError::ReadOnly));
        assert_eq!(col.get(0), Ok(Value::Int(1)));

        col.set_read_only(false);
        assert_eq!(col.set(0, &Value::Int(2)), Ok(Some(Value::Int(1))));
    }

    #[test]
    fn test_constant_column() {
        let mut col = Column::constant(Value::Text("fixed".into()));
        col.set_maximum_row(100);

        assert_eq!(col.row_count(), 100);
        assert_eq!(col.get(0), Ok(Value::Text("fixed".into())));
        assert_eq!(col.get(99), Ok(Value::Text("fixed".into())));
        assert_eq!(col.get_str(42).unwrap().as_ref(), "fixed");

        assert_eq!(col.set(0, &Value::Text("no".into())), Err(DataError::ReadOnly));
        // the read-only flag cannot be cleared on a constant column
        col.set_read_only(false);
        assert!(col.is_read_only());
    }

    // ─────────────────────────────────────────────────────────────
    // Test 9 : Bit-packed booleans
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_bool_column() {
        let mut col = Column::new(DataType::Bool);
        for i in 0..100 {
            col.push(Value::Bool(i % 3 == 0)).unwrap();
        }

        assert_eq!(col.get_bool(0), Ok(true));
        assert_eq!(col.get_bool(1), Ok(false));
        assert_eq!(col.get_bool(99), Ok(true));

        col.set_bool(1, true).unwrap();
        assert_eq!(col.get_bool(1), Ok(true));
    }

    // ─────────────────────────────────────────────────────────────
    // Test 10 : Large column
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_large_column() {
        let mut col = Column::new(DataType::Int);

        for i in 0..10_000 {
            col.push(Value::Int(i)).unwrap();
        }

        assert_eq!(col.row_count(), 10_000);
        assert_eq!(col.get(5_000), Ok(Value::Int(5_000)));
        assert_eq!(col.get_int(9_999), Ok(9_999));
    }
}
