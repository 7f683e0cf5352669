//! Scalar expressions used by filters, computed columns and bounds
//!
//! Expressions are typed against a `RecordHeader` when a plan node is built
//! and evaluated per row during enumeration. Nulls and unavailable fields
//! propagate through comparisons and arithmetic; `and`/`or` follow
//! three-valued logic.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::tuple::{FieldType, FieldValue, Tuple, TupleDescriptor, Value};

use super::errors::{PlanError, PlanResult};
use super::header::RecordHeader;

static NEXT_PARAMETER: AtomicU64 = AtomicU64::new(1);

/// Binding slot for the current left row of an Apply.
///
/// Created before the correlated subplan is built, referenced from that
/// subplan through `Expr::Parameter`, and bound by the Apply that owns it.
#[derive(Debug, Clone)]
pub struct ApplyParameter {
    id: u64,
    name: String,
    descriptor: Arc<TupleDescriptor>,
}

impl ApplyParameter {
    /// New parameter for rows of the given shape
    pub fn new(name: impl Into<String>, descriptor: Arc<TupleDescriptor>) -> Self {
        Self {
            id: NEXT_PARAMETER.fetch_add(1, AtomicOrdering::Relaxed),
            name: name.into(),
            descriptor,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &Arc<TupleDescriptor> {
        &self.descriptor
    }
}

impl PartialEq for ApplyParameter {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ApplyParameter {}

impl Hash for ApplyParameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ApplyParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name)
    }
}

/// Lookup of bound apply parameters during evaluation
pub trait ParameterSource {
    fn parameter(&self, parameter: &ApplyParameter) -> Option<Tuple>;
}

/// Source with nothing bound
pub struct NoParameters;

impl ParameterSource for NoParameters {
    fn parameter(&self, _: &ApplyParameter) -> Option<Tuple> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

impl ArithOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
        }
    }
}

/// Scalar expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(usize),
    Literal(Value),
    Null(FieldType),
    Parameter {
        parameter: ApplyParameter,
        field: usize,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
}

impl Expr {
    pub fn column(index: usize) -> Self {
        Expr::Column(index)
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn param(parameter: &ApplyParameter, field: usize) -> Self {
        Expr::Parameter {
            parameter: parameter.clone(),
            field,
        }
    }

    fn compare(self, op: CompareOp, other: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn equal(self, other: Expr) -> Self {
        self.compare(CompareOp::Eq, other)
    }

    pub fn not_equal(self, other: Expr) -> Self {
        self.compare(CompareOp::Ne, other)
    }

    pub fn less(self, other: Expr) -> Self {
        self.compare(CompareOp::Lt, other)
    }

    pub fn less_or_equal(self, other: Expr) -> Self {
        self.compare(CompareOp::Le, other)
    }

    pub fn greater(self, other: Expr) -> Self {
        self.compare(CompareOp::Gt, other)
    }

    pub fn greater_or_equal(self, other: Expr) -> Self {
        self.compare(CompareOp::Ge, other)
    }

    fn arith(self, op: ArithOp, other: Expr) -> Self {
        Expr::Arith {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn plus(self, other: Expr) -> Self {
        self.arith(ArithOp::Add, other)
    }

    pub fn minus(self, other: Expr) -> Self {
        self.arith(ArithOp::Sub, other)
    }

    pub fn times(self, other: Expr) -> Self {
        self.arith(ArithOp::Mul, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Self {
        Expr::IsNull(Box::new(self))
    }

    /// True if the expression reads fields of the current row
    pub fn references_row(&self) -> bool {
        match self {
            Expr::Column(_) => true,
            Expr::Literal(_) | Expr::Null(_) | Expr::Parameter { .. } => false,
            Expr::Compare { left, right, .. }
            | Expr::Arith { left, right, .. }
            | Expr::And(left, right)
            | Expr::Or(left, right) => left.references_row() || right.references_row(),
            Expr::Not(inner) | Expr::IsNull(inner) => inner.references_row(),
        }
    }

    /// Type of the expression over rows of `header`
    pub fn result_type(&self, header: &RecordHeader) -> PlanResult<FieldType> {
        match self {
            Expr::Column(i) => header.check_column(*i),
            Expr::Literal(v) => Ok(v.field_type()),
            Expr::Null(t) => Ok(*t),
            Expr::Parameter { parameter, field } => {
                parameter.descriptor().field_type(*field).map_err(|_| {
                    PlanError::invalid_column(*field, parameter.descriptor().len())
                })
            }
            Expr::Compare { op, left, right } => {
                let l = left.result_type(header)?;
                let r = right.result_type(header)?;
                if l != r && !(l.is_numeric() && r.is_numeric()) {
                    return Err(PlanError::type_mismatch(
                        format!("{} {} {}", left, op.as_str(), right),
                        l.as_str(),
                        r,
                    ));
                }
                Ok(FieldType::Bool)
            }
            Expr::Arith { op, left, right } => {
                let l = left.result_type(header)?;
                let r = right.result_type(header)?;
                for t in [l, r] {
                    if !t.is_numeric() {
                        return Err(PlanError::type_mismatch(
                            format!("operand of {}", op.as_str()),
                            "numeric",
                            t,
                        ));
                    }
                }
                if l == FieldType::Int && r == FieldType::Int {
                    Ok(FieldType::Int)
                } else {
                    Ok(FieldType::Float)
                }
            }
            Expr::And(left, right) | Expr::Or(left, right) => {
                expect_bool(left, header)?;
                expect_bool(right, header)?;
                Ok(FieldType::Bool)
            }
            Expr::Not(inner) => {
                expect_bool(inner, header)?;
                Ok(FieldType::Bool)
            }
            Expr::IsNull(inner) => {
                inner.result_type(header)?;
                Ok(FieldType::Bool)
            }
        }
    }

    /// Evaluates against `row`
    pub fn eval(&self, row: &Tuple, params: &dyn ParameterSource) -> PlanResult<FieldValue> {
        match self {
            Expr::Column(i) => row
                .field(*i)
                .cloned()
                .ok_or_else(|| PlanError::invalid_column(*i, row.len())),
            Expr::Literal(v) => Ok(FieldValue::Value(v.clone())),
            Expr::Null(_) => Ok(FieldValue::Null),
            Expr::Parameter { parameter, field } => {
                let bound = params
                    .parameter(parameter)
                    .ok_or_else(|| PlanError::unbound_parameter(parameter))?;
                bound
                    .field(*field)
                    .cloned()
                    .ok_or_else(|| PlanError::invalid_column(*field, bound.len()))
            }
            Expr::Compare { op, left, right } => {
                let l = left.eval(row, params)?;
                let r = right.eval(row, params)?;
                Ok(match (l.value(), r.value()) {
                    (Some(a), Some(b)) => FieldValue::from(op.holds(compare_values(a, b))),
                    _ => FieldValue::Null,
                })
            }
            Expr::Arith { op, left, right } => {
                let l = left.eval(row, params)?;
                let r = right.eval(row, params)?;
                match (l.value(), r.value()) {
                    (Some(a), Some(b)) => arith(*op, a, b).map(FieldValue::Value),
                    _ => Ok(FieldValue::Null),
                }
            }
            Expr::And(left, right) => {
                let l = truth(&left.eval(row, params)?);
                if l == Some(false) {
                    return Ok(FieldValue::from(false));
                }
                let r = truth(&right.eval(row, params)?);
                Ok(match (l, r) {
                    (_, Some(false)) => FieldValue::from(false),
                    (Some(true), Some(true)) => FieldValue::from(true),
                    _ => FieldValue::Null,
                })
            }
            Expr::Or(left, right) => {
                let l = truth(&left.eval(row, params)?);
                if l == Some(true) {
                    return Ok(FieldValue::from(true));
                }
                let r = truth(&right.eval(row, params)?);
                Ok(match (l, r) {
                    (_, Some(true)) => FieldValue::from(true),
                    (Some(false), Some(false)) => FieldValue::from(false),
                    _ => FieldValue::Null,
                })
            }
            Expr::Not(inner) => Ok(match truth(&inner.eval(row, params)?) {
                Some(b) => FieldValue::from(!b),
                None => FieldValue::Null,
            }),
            Expr::IsNull(inner) => {
                let v = inner.eval(row, params)?;
                Ok(FieldValue::from(v.value().is_none()))
            }
        }
    }

    /// Evaluates a predicate; only a true result keeps the row
    pub fn matches(&self, row: &Tuple, params: &dyn ParameterSource) -> PlanResult<bool> {
        Ok(truth(&self.eval(row, params)?) == Some(true))
    }
}

fn expect_bool(expr: &Expr, header: &RecordHeader) -> PlanResult<()> {
    let t = expr.result_type(header)?;
    if t != FieldType::Bool {
        return Err(PlanError::type_mismatch(expr.to_string(), "bool", t));
    }
    Ok(())
}

fn truth(value: &FieldValue) -> Option<bool> {
    value.value().and_then(Value::as_bool)
}

/// Compares values, promoting Int to Float when the types differ
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) => (*x as f64).total_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.total_cmp(&(*y as f64)),
        _ => a.cmp(b),
    }
}

fn arith(op: ArithOp, a: &Value, b: &Value) -> PlanResult<Value> {
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        let result = match op {
            ArithOp::Add => x.checked_add(*y),
            ArithOp::Sub => x.checked_sub(*y),
            ArithOp::Mul => x.checked_mul(*y),
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| PlanError::arithmetic(format!("{} {} {} overflows", x, op.as_str(), y)));
    }
    match (a.as_float(), b.as_float()) {
        (Some(x), Some(y)) => Ok(Value::Float(match op {
            ArithOp::Add => x + y,
            ArithOp::Sub => x - y,
            ArithOp::Mul => x * y,
        })),
        _ => Err(PlanError::arithmetic(format!(
            "cannot apply {} to {} and {}",
            op.as_str(),
            a,
            b
        ))),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(i) => write!(f, "#{}", i),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Null(_) => write!(f, "null"),
            Expr::Parameter { parameter, field } => write!(f, "{}.{}", parameter, field),
            Expr::Compare { op, left, right } => write!(f, "({} {} {})", left, op.as_str(), right),
            Expr::Arith { op, left, right } => write!(f, "({} {} {})", left, op.as_str(), right),
            Expr::And(l, r) => write!(f, "({} and {})", l, r),
            Expr::Or(l, r) => write!(f, "({} or {})", l, r),
            Expr::Not(e) => write!(f, "not {}", e),
            Expr::IsNull(e) => write!(f, "{} is null", e),
        }
    }
}
