//! Logical plan nodes
//!
//! A `CompilableProvider` is an immutable node of the plan DAG. It owns its
//! sources through `Arc`, so a subplan can feed several parents. The header
//! is derived once, when the node is built; builders validate parameters
//! against the source headers and fail with `PlanError` before anything is
//! compiled.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::index::{Direction, Entire, Infinity, KeyComparer, Range, Shift};
use crate::tuple::{FieldType, Tuple};
use crate::virtual_index::IndexInfo;

use super::errors::{PlanError, PlanResult};
use super::expr::{ApplyParameter, Expr};
use super::header::{RecordHeader, SortOrder};

static NEXT_PROVIDER: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a plan node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u64);

impl ProviderId {
    pub(crate) fn next() -> Self {
        ProviderId(NEXT_PROVIDER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an executable runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionSite {
    /// Next to the indexes, streaming directly from readers
    Storage,
    /// In the caller's process, over rows already transferred
    Local,
}

impl ExecutionSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionSite::Storage => "storage",
            ExecutionSite::Local => "local",
        }
    }
}

impl fmt::Display for ExecutionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinAlgorithm {
    Hash,
    NestedLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyType {
    /// Left rows without right rows produce nothing
    Inner,
    /// Left rows without right rows produce one row padded with
    /// unavailable fields
    LeftOuter,
}

/// How many right rows an Apply accepts per left row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplySequenceType {
    All,
    First,
    FirstOrDefault,
    Single,
    SingleOrDefault,
}

impl ApplySequenceType {
    /// At most one right row is combined per left row
    pub fn is_scalar(&self) -> bool {
        !matches!(self, ApplySequenceType::All)
    }

    /// More than one right row is an error
    pub fn is_single(&self) -> bool {
        matches!(
            self,
            ApplySequenceType::Single | ApplySequenceType::SingleOrDefault
        )
    }

    /// Zero right rows is an error
    pub fn requires_row(&self) -> bool {
        matches!(self, ApplySequenceType::First | ApplySequenceType::Single)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateKind::Count => "count",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
        }
    }
}

/// One aggregate output column. `column: None` is only valid for `Count`
/// and counts rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateColumn {
    pub name: String,
    pub kind: AggregateKind,
    pub column: Option<usize>,
}

impl AggregateColumn {
    pub fn new(name: impl Into<String>, kind: AggregateKind, column: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            column: Some(column),
        }
    }

    pub fn count_rows(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AggregateKind::Count,
            column: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedColumn {
    pub name: String,
    pub expr: Expr,
}

/// One end of a range over a source's order columns
#[derive(Debug, Clone, PartialEq)]
pub enum BoundSpec {
    NegativeInfinity,
    PositiveInfinity,
    /// Key values, the last one shifted
    Key(Vec<Expr>, Shift),
    /// Leading key values; the remaining fields are open towards `Infinity`
    Prefix(Vec<Expr>, Infinity),
}

impl BoundSpec {
    pub fn key(values: Vec<Expr>) -> Self {
        BoundSpec::Key(values, Shift::Exact)
    }

    fn values(&self) -> &[Expr] {
        match self {
            BoundSpec::Key(values, _) | BoundSpec::Prefix(values, _) => values,
            BoundSpec::NegativeInfinity | BoundSpec::PositiveInfinity => &[],
        }
    }

    /// The bound as an `Entire`, if every value is a literal
    fn literal_entire(&self) -> Option<Entire> {
        let literal_key = |values: &[Expr]| {
            values
                .iter()
                .map(|e| match e {
                    Expr::Literal(v) => Some(v.clone()),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Tuple::from_values)
        };
        Some(match self {
            BoundSpec::NegativeInfinity => Entire::negative_infinity(),
            BoundSpec::PositiveInfinity => Entire::positive_infinity(),
            BoundSpec::Key(values, shift) => {
                Entire::shifted(&literal_key(values.as_slice())?, *shift)
            }
            BoundSpec::Prefix(values, tail) => {
                Entire::prefix(&literal_key(values.as_slice())?, *tail)
            }
        })
    }
}

impl fmt::Display for BoundSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |values: &[Expr]| {
            values
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            BoundSpec::NegativeInfinity => write!(f, "-inf"),
            BoundSpec::PositiveInfinity => write!(f, "+inf"),
            BoundSpec::Key(values, Shift::Exact) => write!(f, "({})", list(values)),
            BoundSpec::Key(values, shift) => write!(f, "({}){:?}", list(values), shift),
            BoundSpec::Prefix(values, Infinity::Negative) => write!(f, "({}, -inf)", list(values)),
            BoundSpec::Prefix(values, Infinity::Positive) => write!(f, "({}, +inf)", list(values)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeSpec {
    pub first: BoundSpec,
    pub second: BoundSpec,
}

impl RangeSpec {
    pub fn new(first: BoundSpec, second: BoundSpec) -> Self {
        Self { first, second }
    }

    pub fn full() -> Self {
        Self::new(BoundSpec::NegativeInfinity, BoundSpec::PositiveInfinity)
    }

    /// Traversal direction over a source sorted by `order`.
    ///
    /// Only bounds made of infinities and literals can reverse the
    /// traversal; a range with parameter bounds always runs forward.
    pub fn direction(&self, order: &SortOrder) -> Direction {
        let comparer = KeyComparer::new(order.columns().iter().map(|&(_, d)| d).collect());
        match (self.first.literal_entire(), self.second.literal_entire()) {
            (Some(first), Some(second)) => Range::new(first, second).direction(&comparer),
            _ => Direction::Positive,
        }
    }
}

/// Operator and parameters of a plan node
#[derive(Debug, Clone)]
pub enum ProviderKind {
    Index { info: IndexInfo },
    Raw { rows: Arc<Vec<Tuple>> },
    Reindex { key: Vec<(usize, Direction)> },
    Store { name: String },
    Aggregate {
        group_by: Vec<usize>,
        columns: Vec<AggregateColumn>,
    },
    Alias { alias: String },
    Calculate { columns: Vec<CalculatedColumn> },
    Distinct,
    Filter { predicate: Expr },
    Join {
        algorithm: JoinAlgorithm,
        join_type: JoinType,
        equal_columns: Vec<(usize, usize)>,
    },
    Sort { order: SortOrder },
    Range { range: RangeSpec },
    Seek { key: Vec<Expr> },
    Select { columns: Vec<usize> },
    Skip { count: Expr },
    Take { count: Expr },
    ExecutionSite { site: ExecutionSite },
    Apply {
        parameter: ApplyParameter,
        apply_type: ApplyType,
        sequence_type: ApplySequenceType,
    },
    Existence { name: String },
    RowNumber { name: String },
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Index { .. } => "Index",
            ProviderKind::Raw { .. } => "Raw",
            ProviderKind::Reindex { .. } => "Reindex",
            ProviderKind::Store { .. } => "Store",
            ProviderKind::Aggregate { .. } => "Aggregate",
            ProviderKind::Alias { .. } => "Alias",
            ProviderKind::Calculate { .. } => "Calculate",
            ProviderKind::Distinct => "Distinct",
            ProviderKind::Filter { .. } => "Filter",
            ProviderKind::Join { .. } => "Join",
            ProviderKind::Sort { .. } => "Sort",
            ProviderKind::Range { .. } => "Range",
            ProviderKind::Seek { .. } => "Seek",
            ProviderKind::Select { .. } => "Select",
            ProviderKind::Skip { .. } => "Skip",
            ProviderKind::Take { .. } => "Take",
            ProviderKind::ExecutionSite { .. } => "ExecutionSite",
            ProviderKind::Apply { .. } => "Apply",
            ProviderKind::Existence { .. } => "Existence",
            ProviderKind::RowNumber { .. } => "RowNumber",
        }
    }

    /// Operator parameters for explain output
    pub fn describe(&self) -> String {
        fn columns(cols: &[usize]) -> String {
            cols.iter()
                .map(|c| format!("#{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        }
        match self {
            ProviderKind::Index { info } => format!("{} [{}]", info.name, info.attributes),
            ProviderKind::Raw { rows } => format!("{} rows", rows.len()),
            ProviderKind::Reindex { key } => SortOrder::new(key.clone()).to_string(),
            ProviderKind::Store { name } => name.clone(),
            ProviderKind::Aggregate { group_by, columns: aggregates } => {
                let aggregates: Vec<String> = aggregates
                    .iter()
                    .map(|a| match a.column {
                        Some(c) => format!("{}({}) as {}", a.kind.as_str(), c, a.name),
                        None => format!("{}(*) as {}", a.kind.as_str(), a.name),
                    })
                    .collect();
                format!("group by [{}] {}", columns(group_by), aggregates.join(", "))
            }
            ProviderKind::Alias { alias } => alias.clone(),
            ProviderKind::Calculate { columns } => columns
                .iter()
                .map(|c| format!("{} = {}", c.name, c.expr))
                .collect::<Vec<_>>()
                .join(", "),
            ProviderKind::Distinct => String::new(),
            ProviderKind::Filter { predicate } => predicate.to_string(),
            ProviderKind::Join {
                algorithm,
                join_type,
                equal_columns,
            } => {
                let pairs: Vec<String> = equal_columns
                    .iter()
                    .map(|(l, r)| format!("#{} = #{}", l, r))
                    .collect();
                format!("{:?} {:?} on {}", algorithm, join_type, pairs.join(" and "))
            }
            ProviderKind::Sort { order } => order.to_string(),
            ProviderKind::Range { range } => format!("[{} .. {}]", range.first, range.second),
            ProviderKind::Seek { key } => key
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            ProviderKind::Select { columns: cols } => columns(cols),
            ProviderKind::Skip { count } | ProviderKind::Take { count } => count.to_string(),
            ProviderKind::ExecutionSite { site } => site.to_string(),
            ProviderKind::Apply {
                parameter,
                apply_type,
                sequence_type,
            } => format!("{} {:?} {:?}", parameter, apply_type, sequence_type),
            ProviderKind::Existence { name } | ProviderKind::RowNumber { name } => name.clone(),
        }
    }
}

/// Immutable logical plan node
#[derive(Debug)]
pub struct CompilableProvider {
    id: ProviderId,
    kind: ProviderKind,
    sources: Vec<Arc<CompilableProvider>>,
    header: RecordHeader,
}

impl CompilableProvider {
    fn create(
        kind: ProviderKind,
        sources: Vec<Arc<CompilableProvider>>,
        header: RecordHeader,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: ProviderId::next(),
            kind,
            sources,
            header,
        })
    }

    /// Leaf reading an index. The header is declared by the schema layer and
    /// checked against the built index at compile time.
    pub fn index(info: IndexInfo, header: RecordHeader) -> Arc<Self> {
        let header = header.with_origin(&info.name);
        Self::create(ProviderKind::Index { info }, Vec::new(), header)
    }

    /// Leaf holding literal rows
    pub fn raw(header: RecordHeader, rows: Vec<Tuple>) -> PlanResult<Arc<Self>> {
        if let Some(row) = rows.iter().find(|r| r.descriptor() != header.descriptor()) {
            return Err(PlanError::invalid_parameter(format!(
                "raw row {} does not match header {}",
                row,
                header.descriptor()
            )));
        }
        Ok(Self::create(
            ProviderKind::Raw {
                rows: Arc::new(rows),
            },
            Vec::new(),
            header,
        ))
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    pub fn sources(&self) -> &[Arc<CompilableProvider>] {
        &self.sources
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn unary(self: &Arc<Self>, kind: ProviderKind, header: RecordHeader) -> Arc<Self> {
        Self::create(kind, vec![self.clone()], header)
    }

    /// Materialises the source into an index ordered by `key`
    pub fn reindex(self: &Arc<Self>, key: Vec<(usize, Direction)>) -> PlanResult<Arc<Self>> {
        if key.is_empty() {
            return Err(PlanError::invalid_parameter("reindex key is empty"));
        }
        let columns: Vec<usize> = key.iter().map(|&(c, _)| c).collect();
        let header = self
            .header
            .clone()
            .with_key(columns)?
            .with_order(SortOrder::new(key.clone()))?;
        Ok(self.unary(ProviderKind::Reindex { key }, header))
    }

    /// Materialises the source once per enumeration
    pub fn store(self: &Arc<Self>, name: impl Into<String>) -> Arc<Self> {
        self.unary(
            ProviderKind::Store { name: name.into() },
            self.header.clone(),
        )
    }

    /// Unordered grouping: group columns first, then one column per aggregate
    pub fn aggregate(
        self: &Arc<Self>,
        group_by: Vec<usize>,
        columns: Vec<AggregateColumn>,
    ) -> PlanResult<Arc<Self>> {
        let grouped = self.header.select(&group_by)?;
        let mut added = Vec::with_capacity(columns.len());
        for aggregate in &columns {
            let source_type = match aggregate.column {
                Some(c) => Some(self.header.check_column(c)?),
                None => None,
            };
            let output = match (aggregate.kind, source_type) {
                (AggregateKind::Count, _) => FieldType::Int,
                (_, None) => {
                    return Err(PlanError::invalid_parameter(format!(
                        "{} requires a column",
                        aggregate.kind.as_str()
                    )))
                }
                (AggregateKind::Sum, Some(t)) | (AggregateKind::Avg, Some(t))
                    if !t.is_numeric() =>
                {
                    return Err(PlanError::type_mismatch(
                        aggregate.kind.as_str(),
                        "numeric",
                        t,
                    ))
                }
                (AggregateKind::Avg, Some(_)) => FieldType::Float,
                (_, Some(t)) => t,
            };
            added.push((aggregate.name.clone(), output));
        }
        let key: Vec<usize> = (0..group_by.len()).collect();
        let mut header = grouped.unordered().extend(added);
        if !key.is_empty() {
            header = header.with_key(key)?;
        }
        Ok(self.unary(ProviderKind::Aggregate { group_by, columns }, header))
    }

    pub fn alias(self: &Arc<Self>, alias: impl Into<String>) -> Arc<Self> {
        let alias = alias.into();
        let header = self.header.alias(&alias);
        self.unary(ProviderKind::Alias { alias }, header)
    }

    /// Appends computed columns
    pub fn calculate<N: Into<String>>(
        self: &Arc<Self>,
        columns: impl IntoIterator<Item = (N, Expr)>,
    ) -> PlanResult<Arc<Self>> {
        let mut calculated = Vec::new();
        let mut added = Vec::new();
        for (name, expr) in columns {
            let name = name.into();
            added.push((name.clone(), expr.result_type(&self.header)?));
            calculated.push(CalculatedColumn { name, expr });
        }
        let header = self.header.extend(added);
        Ok(self.unary(
            ProviderKind::Calculate {
                columns: calculated,
            },
            header,
        ))
    }

    /// Drops repeated rows, keeping the first occurrence
    pub fn distinct(self: &Arc<Self>) -> Arc<Self> {
        self.unary(ProviderKind::Distinct, self.header.clone())
    }

    pub fn filter(self: &Arc<Self>, predicate: Expr) -> PlanResult<Arc<Self>> {
        let t = predicate.result_type(&self.header)?;
        if t != FieldType::Bool {
            return Err(PlanError::type_mismatch("filter predicate", "bool", t));
        }
        Ok(self.unary(ProviderKind::Filter { predicate }, self.header.clone()))
    }

    /// Equality join; output columns are the left columns then the right
    pub fn join(
        self: &Arc<Self>,
        right: &Arc<Self>,
        algorithm: JoinAlgorithm,
        join_type: JoinType,
        equal_columns: Vec<(usize, usize)>,
    ) -> PlanResult<Arc<Self>> {
        for &(l, r) in &equal_columns {
            let lt = self.header.check_column(l)?;
            let rt = right.header.check_column(r)?;
            if lt != rt {
                return Err(PlanError::type_mismatch(
                    format!("join column #{} = #{}", l, r),
                    lt.as_str(),
                    rt,
                ));
            }
        }
        let header = self.header.join(&right.header);
        Ok(Self::create(
            ProviderKind::Join {
                algorithm,
                join_type,
                equal_columns,
            },
            vec![self.clone(), right.clone()],
            header,
        ))
    }

    /// Stable sort
    pub fn sort(self: &Arc<Self>, order: SortOrder) -> PlanResult<Arc<Self>> {
        if order.is_empty() {
            return Err(PlanError::invalid_parameter("sort order is empty"));
        }
        let header = self.header.clone().with_order(order.clone())?;
        Ok(self.unary(ProviderKind::Sort { order }, header))
    }

    /// Rows whose order-column values fall in `range`
    pub fn range(self: &Arc<Self>, range: RangeSpec) -> PlanResult<Arc<Self>> {
        self.check_key_exprs("Range", range.first.values())?;
        self.check_key_exprs("Range", range.second.values())?;
        let header = match range.direction(self.header.order()) {
            Direction::Positive => self.header.clone(),
            Direction::Negative => self.header.reorder(self.header.order().reversed()),
        };
        Ok(self.unary(ProviderKind::Range { range }, header))
    }

    /// The row whose order-column values equal `key`
    pub fn seek(self: &Arc<Self>, key: Vec<Expr>) -> PlanResult<Arc<Self>> {
        if key.is_empty() {
            return Err(PlanError::invalid_parameter("seek key is empty"));
        }
        self.check_key_exprs("Seek", &key)?;
        Ok(self.unary(ProviderKind::Seek { key }, self.header.clone()))
    }

    fn check_key_exprs(&self, operator: &str, values: &[Expr]) -> PlanResult<()> {
        let order = self.header.order();
        if order.is_empty() {
            return Err(PlanError::order_required(operator));
        }
        if values.len() > order.len() {
            return Err(PlanError::invalid_parameter(format!(
                "{} key has {} values for an order of {} columns",
                operator,
                values.len(),
                order.len()
            )));
        }
        for (expr, &(column, _)) in values.iter().zip(order.columns()) {
            if expr.references_row() {
                return Err(PlanError::invalid_parameter(format!(
                    "{} key {} reads the current row",
                    operator, expr
                )));
            }
            let expected = self.header.check_column(column)?;
            let actual = expr.result_type(&self.header)?;
            if actual != expected {
                return Err(PlanError::type_mismatch(
                    format!("{} key {}", operator, expr),
                    expected.as_str(),
                    actual,
                ));
            }
        }
        Ok(())
    }

    pub fn select(self: &Arc<Self>, columns: Vec<usize>) -> PlanResult<Arc<Self>> {
        let header = self.header.select(&columns)?;
        Ok(self.unary(ProviderKind::Select { columns }, header))
    }

    pub fn skip(self: &Arc<Self>, count: Expr) -> PlanResult<Arc<Self>> {
        self.check_count("Skip", &count)?;
        Ok(self.unary(ProviderKind::Skip { count }, self.header.clone()))
    }

    pub fn take(self: &Arc<Self>, count: Expr) -> PlanResult<Arc<Self>> {
        self.check_count("Take", &count)?;
        Ok(self.unary(ProviderKind::Take { count }, self.header.clone()))
    }

    fn check_count(&self, operator: &str, count: &Expr) -> PlanResult<()> {
        if count.references_row() {
            return Err(PlanError::invalid_parameter(format!(
                "{} count {} reads the current row",
                operator, count
            )));
        }
        let t = count.result_type(&self.header)?;
        if t != FieldType::Int {
            return Err(PlanError::type_mismatch(format!("{} count", operator), "int", t));
        }
        Ok(())
    }

    /// Runs the subtree at `site`
    pub fn execution_site(self: &Arc<Self>, site: ExecutionSite) -> Arc<Self> {
        self.unary(ProviderKind::ExecutionSite { site }, self.header.clone())
    }

    /// Evaluates `right` once per row of this node with `parameter` bound to
    /// that row
    pub fn apply(
        self: &Arc<Self>,
        parameter: &ApplyParameter,
        right: &Arc<Self>,
        apply_type: ApplyType,
        sequence_type: ApplySequenceType,
    ) -> PlanResult<Arc<Self>> {
        if parameter.descriptor() != self.header.descriptor() {
            return Err(PlanError::invalid_parameter(format!(
                "parameter {} binds {} but left rows are {}",
                parameter,
                parameter.descriptor(),
                self.header.descriptor()
            )));
        }
        let header = self.header.join(&right.header);
        Ok(Self::create(
            ProviderKind::Apply {
                parameter: parameter.clone(),
                apply_type,
                sequence_type,
            },
            vec![self.clone(), right.clone()],
            header,
        ))
    }

    /// Single boolean row: whether this node yields any row
    pub fn existence(self: &Arc<Self>, name: impl Into<String>) -> Arc<Self> {
        let name = name.into();
        let header = RecordHeader::new([(name.clone(), FieldType::Bool)]);
        self.unary(ProviderKind::Existence { name }, header)
    }

    /// Appends a 1-based row number
    pub fn row_number(self: &Arc<Self>, name: impl Into<String>) -> Arc<Self> {
        let name = name.into();
        let header = self.header.extend([(name.clone(), FieldType::Int)]);
        self.unary(ProviderKind::RowNumber { name }, header)
    }
}
