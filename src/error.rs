use thiserror::Error;

use crate::data_type::DataType;

/// Shorthand for results produced by the engine.
pub type Result<T> = std::result::Result<T, DataError>;

/// Structured errors raised by tables, columns, indexes, tuples and
/// expressions.
///
/// Every failure mode gets its own variant so callers can tell "wrong type"
/// apart from "not allowed at all" or "that row is gone" without string
/// matching.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    /// A typed accessor was invoked against storage of an incompatible type,
    /// or a value could not be stored without narrowing.
    #[error("{requested} access on {stored} storage")]
    TypeMismatch {
        /// Declared type of the column or expression.
        stored: DataType,
        /// Type the caller asked for or supplied.
        requested: DataType,
    },
    /// Mutation attempted on a read-only or constant column.
    #[error("column is read-only")]
    ReadOnly,
    /// A null value was offered to a column that rejects nulls.
    #[error("column does not accept null values")]
    NullNotAllowed,
    /// Row index outside the column's logical extent.
    #[error("row {row} out of bounds ({row_count} rows)")]
    RowOutOfBounds { row: usize, row_count: usize },
    /// Requested capacity cannot hold the requested number of rows.
    #[error("capacity {capacity} is smaller than the requested {rows} rows")]
    CapacityTooSmall { capacity: usize, rows: usize },
    /// A typed fast-path getter hit a cell holding null.
    #[error("row {row} holds null")]
    NullValue { row: usize },
    /// An accessor was called through a tuple whose row has been deleted.
    #[error("tuple for row {row} was invalidated")]
    StaleTuple { row: usize },
    /// Field name does not resolve to a column.
    #[error("unknown column '{name}'")]
    UnknownColumn { name: String },
    /// A column with that name already exists in the table.
    #[error("column '{name}' already exists")]
    DuplicateColumn { name: String },
    /// A key-typed index query was issued against an index built over a
    /// different key type.
    #[error("{key} key used against a {index} index")]
    KeyMismatch {
        /// Key type of the index.
        index: DataType,
        /// Key type the query supplied.
        key: DataType,
    },
    /// No index exists over the named column.
    #[error("no index on column '{name}'")]
    NoIndex { name: String },
    /// An expression was asked for a value of a type it cannot produce.
    #[error("expression cannot produce a {requested} value")]
    UnsupportedResult { requested: DataType },
    /// An expression has no static type (e.g. a bare null literal).
    #[error("expression has no static type")]
    Untypable,
    /// Integer division or remainder with a zero divisor.
    #[error("division by zero")]
    DivideByZero,
    /// Branches of a conditional resolve to types with no common supertype.
    #[error("no common type between {left} and {right}")]
    NoCommonType { left: DataType, right: DataType },
    /// Tree-view accessor used before a spanning tree was built.
    #[error("no spanning tree has been built over this graph")]
    NoSpanningTree,
    /// The predicate text failed to tokenize or parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors raised while tokenizing or parsing expression text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("character {ch:?} at position {pos} is not supported")]
    BadChar { ch: char, pos: usize },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("malformed number {text:?}")]
    BadNumber { text: String },
    #[error("unexpected token {found} (expected {expected})")]
    Expected { expected: String, found: String },
    #[error("unexpected trailing input after expression: {found}")]
    TrailingInput { found: String },
    #[error("expression is not a boolean predicate")]
    NotAPredicate,
}
