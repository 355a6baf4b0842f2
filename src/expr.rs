use std::sync::Arc;

use crate::data_type::DataType;
use crate::error::{DataError, Result};
use crate::table::{Schema, Table};
use crate::tuple::Tuple;
use crate::value::Value;

/// Binary operators of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem
        )
    }

    fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    fn is_ordering(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// A node of the expression tree, evaluable against one tuple of a table.
///
/// Trees are immutable: composite constructors take their children by value,
/// so a missing subexpression is unrepresentable, and replacing a
/// subexpression means building a new tree around the new child.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reads the named field of the evaluated tuple.
    Column(String),
    /// A typed literal.
    Literal(Value),
    /// Logical negation of a boolean child.
    Not(Box<Expr>),
    /// Arithmetic negation of a numeric child.
    Neg(Box<Expr>),
    /// Binary arithmetic, comparison, or logical operation.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// If-then-else over a boolean test; only the taken branch is evaluated.
    If {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// Arithmetic promotes bytes to int, the way the numeric tower expects.
fn arithmetic_type(shared: DataType) -> DataType {
    if shared == DataType::Byte {
        DataType::Int
    } else {
        shared
    }
}

impl Expr {
    /// Column reference.
    pub fn col(name: impl Into<String>) -> Expr {
        Expr::Column(name.into())
    }

    /// Typed literal.
    pub fn lit(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    /// Logical NOT.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    /// Arithmetic negation.
    #[allow(clippy::should_implement_trait)]
    pub fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }

    fn binary(self, op: BinaryOp, other: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn add(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Add, other)
    }

    pub fn sub(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Sub, other)
    }

    pub fn mul(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Mul, other)
    }

    pub fn div(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Div, other)
    }

    pub fn rem(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Rem, other)
    }

    pub fn equals(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Eq, other)
    }

    pub fn not_equals(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Ne, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Lt, other)
    }

    pub fn le(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Le, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Gt, other)
    }

    pub fn ge(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Ge, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Or, other)
    }

    /// If-then-else expression.
    pub fn if_else(test: Expr, then: Expr, otherwise: Expr) -> Expr {
        Expr::If {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    // --- Evaluation ---

    /// Evaluates this tree against one tuple.
    ///
    /// Null propagates through arithmetic, makes comparisons false, and is
    /// rejected by logical operators; no silent coercion ever happens.
    pub fn evaluate(&self, table: &Table, tuple: Tuple) -> Result<Value> {
        match self {
            Expr::Column(name) => table.get(tuple, name),
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Not(child) => {
                let value = child.evaluate(table, tuple)?;
                let b = value.as_bool().ok_or(DataError::UnsupportedResult {
                    requested: DataType::Bool,
                })?;
                Ok(Value::Bool(!b))
            }
            Expr::Neg(child) => {
                let value = child.evaluate(table, tuple)?;
                Ok(match value {
                    Value::Null => Value::Null,
                    Value::Byte(b) => Value::Int(-i32::from(b)),
                    Value::Int(i) => Value::Int(-i),
                    Value::Long(l) => Value::Long(-l),
                    Value::Float(f) => Value::Float(-f),
                    Value::Double(d) => Value::Double(-d),
                    _ => {
                        return Err(DataError::UnsupportedResult {
                            requested: DataType::Double,
                        });
                    }
                })
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    if !left.evaluate_bool(table, tuple)? {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(right.evaluate_bool(table, tuple)?))
                }
                BinaryOp::Or => {
                    if left.evaluate_bool(table, tuple)? {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(right.evaluate_bool(table, tuple)?))
                }
                op if op.is_comparison() => {
                    let l = left.evaluate(table, tuple)?;
                    let r = right.evaluate(table, tuple)?;
                    compare(*op, &l, &r)
                }
                op => {
                    let l = left.evaluate(table, tuple)?;
                    let r = right.evaluate(table, tuple)?;
                    arithmetic(*op, &l, &r)
                }
            },
            Expr::If {
                test,
                then,
                otherwise,
            } => {
                if test.evaluate_bool(table, tuple)? {
                    then.evaluate(table, tuple)
                } else {
                    otherwise.evaluate(table, tuple)
                }
            }
        }
    }

    /// Evaluates and requires a boolean result.
    pub fn evaluate_bool(&self, table: &Table, tuple: Tuple) -> Result<bool> {
        self.evaluate(table, tuple)?
            .as_bool()
            .ok_or(DataError::UnsupportedResult {
                requested: DataType::Bool,
            })
    }

    /// Evaluates and requires an int result (widening from byte).
    pub fn evaluate_int(&self, table: &Table, tuple: Tuple) -> Result<i32> {
        self.evaluate(table, tuple)?
            .widen_int()
            .ok_or(DataError::UnsupportedResult {
                requested: DataType::Int,
            })
    }

    /// Evaluates and requires a long result, widening from narrower ints.
    pub fn evaluate_long(&self, table: &Table, tuple: Tuple) -> Result<i64> {
        self.evaluate(table, tuple)?
            .widen_long()
            .ok_or(DataError::UnsupportedResult {
                requested: DataType::Long,
            })
    }

    /// Evaluates and requires a double result, widening from any numeric.
    pub fn evaluate_double(&self, table: &Table, tuple: Tuple) -> Result<f64> {
        self.evaluate(table, tuple)?
            .widen_double()
            .ok_or(DataError::UnsupportedResult {
                requested: DataType::Double,
            })
    }

    /// Evaluates and requires a text result.
    pub fn evaluate_str(&self, table: &Table, tuple: Tuple) -> Result<Arc<str>> {
        match self.evaluate(table, tuple)? {
            Value::Text(s) => Ok(s),
            _ => Err(DataError::UnsupportedResult {
                requested: DataType::Text,
            }),
        }
    }

    // --- Static typing ---

    /// Infers the result type of this tree under the given schema, without
    /// evaluating it.
    pub fn result_type(&self, schema: &Schema) -> Result<DataType> {
        match self {
            Expr::Column(name) => {
                schema
                    .data_type(name)
                    .ok_or_else(|| DataError::UnknownColumn {
                        name: name.clone(),
                    })
            }
            Expr::Literal(value) => value.data_type().ok_or(DataError::Untypable),
            Expr::Not(child) => {
                let t = child.result_type(schema)?;
                if t != DataType::Bool {
                    return Err(DataError::UnsupportedResult {
                        requested: DataType::Bool,
                    });
                }
                Ok(DataType::Bool)
            }
            Expr::Neg(child) => {
                let t = child.result_type(schema)?;
                if !t.is_numeric() {
                    return Err(DataError::UnsupportedResult {
                        requested: DataType::Double,
                    });
                }
                Ok(arithmetic_type(t))
            }
            Expr::Binary { op, left, right } => {
                let l = left.result_type(schema)?;
                let r = right.result_type(schema)?;
                match op {
                    BinaryOp::And | BinaryOp::Or => {
                        if l != DataType::Bool || r != DataType::Bool {
                            return Err(DataError::UnsupportedResult {
                                requested: DataType::Bool,
                            });
                        }
                        Ok(DataType::Bool)
                    }
                    op if op.is_comparison() => {
                        let shared = l
                            .shared(r)
                            .ok_or(DataError::NoCommonType { left: l, right: r })?;
                        if op.is_ordering() && shared == DataType::Bool {
                            return Err(DataError::UnsupportedResult {
                                requested: DataType::Bool,
                            });
                        }
                        Ok(DataType::Bool)
                    }
                    _ => {
                        let shared = l
                            .shared(r)
                            .ok_or(DataError::NoCommonType { left: l, right: r })?;
                        if !shared.is_numeric() {
                            return Err(DataError::UnsupportedResult {
                                requested: DataType::Double,
                            });
                        }
                        Ok(arithmetic_type(shared))
                    }
                }
            }
            Expr::If {
                test,
                then,
                otherwise,
            } => {
                if test.result_type(schema)? != DataType::Bool {
                    return Err(DataError::UnsupportedResult {
                        requested: DataType::Bool,
                    });
                }
                let t = then.result_type(schema)?;
                let o = otherwise.result_type(schema)?;
                t.shared(o)
                    .ok_or(DataError::NoCommonType { left: t, right: o })
            }
        }
    }
}

/// Comparison with null-lenient semantics: a null operand makes every
/// comparison false.
fn compare(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Bool(false));
    }
    let ordering = match (l, r) {
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => {
            if op.is_ordering() {
                return Err(DataError::UnsupportedResult {
                    requested: DataType::Bool,
                });
            }
            a.cmp(b)
        }
        _ => match (l.widen_long(), r.widen_long()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => match (l.widen_double(), r.widen_double()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => {
                    return Err(DataError::NoCommonType {
                        left: l.data_type().expect("non-null"),
                        right: r.data_type().expect("non-null"),
                    });
                }
            },
        },
    };
    let result = match op {
        BinaryOp::Eq => ordering.is_eq(),
        BinaryOp::Ne => !ordering.is_eq(),
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!("compare is called for comparison operators only"),
    };
    Ok(Value::Bool(result))
}

/// Arithmetic in the widest operand type, with null propagation.
fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    debug_assert!(op.is_arithmetic());
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    let (lt, rt) = (
        l.data_type().expect("non-null"),
        r.data_type().expect("non-null"),
    );
    let shared = lt
        .shared(rt)
        .ok_or(DataError::NoCommonType { left: lt, right: rt })?;
    if !shared.is_numeric() {
        return Err(DataError::UnsupportedResult {
            requested: DataType::Double,
        });
    }
    match arithmetic_type(shared) {
        DataType::Int => {
            let (a, b) = (l.widen_int().unwrap(), r.widen_int().unwrap());
            let out = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a.checked_div(b).ok_or(DataError::DivideByZero)?,
                BinaryOp::Rem => a.checked_rem(b).ok_or(DataError::DivideByZero)?,
                _ => unreachable!(),
            };
            Ok(Value::Int(out))
        }
        DataType::Long => {
            let (a, b) = (l.widen_long().unwrap(), r.widen_long().unwrap());
            let out = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div => a.checked_div(b).ok_or(DataError::DivideByZero)?,
                BinaryOp::Rem => a.checked_rem(b).ok_or(DataError::DivideByZero)?,
                _ => unreachable!(),
            };
            Ok(Value::Long(out))
        }
        DataType::Float => {
            let (a, b) = (l.widen_float().unwrap(), r.widen_float().unwrap());
            let out = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => unreachable!(),
            };
            Ok(Value::Float(out))
        }
        DataType::Double => {
            let (a, b) = (l.widen_double().unwrap(), r.widen_double().unwrap());
            let out = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                _ => unreachable!(),
            };
            Ok(Value::Double(out))
        }
        _ => unreachable!("arithmetic_type returns a numeric type"),
    }
}

/// A boolean-valued expression used to filter tuple iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate(Expr);

impl Predicate {
    /// Whether the tuple satisfies this predicate.
    pub fn matches(&self, table: &Table, tuple: Tuple) -> Result<bool> {
        self.0.evaluate_bool(table, tuple)
    }

    /// Inverts the predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate(self.0.not())
    }

    /// Conjunction of two predicates.
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate(self.0.and(other.0))
    }

    /// Disjunction of two predicates.
    pub fn or(self, other: Predicate) -> Predicate {
        Predicate(self.0.or(other.0))
    }

    /// The underlying expression tree.
    pub fn expr(&self) -> &Expr {
        &self.0
    }
}

impl From<Expr> for Predicate {
    fn from(expr: Expr) -> Self {
        Predicate(expr)
    }
}
