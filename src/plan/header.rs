//! Record headers: the logical schema of a plan node
//!
//! A header pairs the tuple descriptor with named columns, an optional key
//! and the order the node's rows are guaranteed to come out in. Operators
//! that rely on order (range, seek, merge) read it from here, so a header
//! must never claim an order its executable does not produce.

use std::fmt;
use std::sync::Arc;

use crate::index::Direction;
use crate::tuple::{FieldType, TupleDescriptor};

use super::errors::{PlanError, PlanResult};

/// Named output column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub index: usize,
    pub field_type: FieldType,
    /// Where the value comes from: an index name, an alias, or
    /// `None` for computed columns
    pub origin: Option<String>,
}

/// Ordered list of `(column, direction)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrder(Vec<(usize, Direction)>);

impl SortOrder {
    pub fn new(columns: Vec<(usize, Direction)>) -> Self {
        Self(columns)
    }

    pub fn unordered() -> Self {
        Self::default()
    }

    pub fn ascending(columns: &[usize]) -> Self {
        Self(columns.iter().map(|&c| (c, Direction::Positive)).collect())
    }

    pub fn columns(&self) -> &[(usize, Direction)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Same columns, every direction flipped
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().map(|&(c, d)| (c, d.reverse())).collect())
    }

    /// Remaps through `position`, keeping the longest prefix whose columns
    /// survive
    fn remap(&self, position: impl Fn(usize) -> Option<usize>) -> Self {
        Self(
            self.0
                .iter()
                .map_while(|&(c, d)| position(c).map(|p| (p, d)))
                .collect(),
        )
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(c, d)| format!("#{} {}", c, d))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Logical schema of a plan node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    descriptor: Arc<TupleDescriptor>,
    columns: Vec<Column>,
    key: Option<Vec<usize>>,
    order: SortOrder,
}

impl RecordHeader {
    /// Header with named columns, no key and no order
    pub fn new<N: Into<String>>(columns: impl IntoIterator<Item = (N, FieldType)>) -> Self {
        let columns: Vec<Column> = columns
            .into_iter()
            .enumerate()
            .map(|(index, (name, field_type))| Column {
                name: name.into(),
                index,
                field_type,
                origin: None,
            })
            .collect();
        Self::from_columns(columns, None, SortOrder::unordered())
    }

    fn from_columns(columns: Vec<Column>, key: Option<Vec<usize>>, order: SortOrder) -> Self {
        let descriptor = TupleDescriptor::create(
            columns.iter().map(|c| c.field_type).collect::<Vec<_>>(),
        );
        Self {
            descriptor,
            columns,
            key,
            order,
        }
    }

    /// Declares the natural key
    pub fn with_key(mut self, key: Vec<usize>) -> PlanResult<Self> {
        for &c in &key {
            self.check_column(c)?;
        }
        self.key = Some(key);
        Ok(self)
    }

    /// Declares the guaranteed emission order
    pub fn with_order(mut self, order: SortOrder) -> PlanResult<Self> {
        for &(c, _) in order.columns() {
            self.check_column(c)?;
        }
        self.order = order;
        Ok(self)
    }

    /// Marks every column as coming from `origin`
    pub fn with_origin(mut self, origin: &str) -> Self {
        for column in &mut self.columns {
            column.origin = Some(origin.to_string());
        }
        self
    }

    pub fn descriptor(&self) -> &Arc<TupleDescriptor> {
        &self.descriptor
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn key(&self) -> Option<&[usize]> {
        self.key.as_deref()
    }

    pub fn order(&self) -> &SortOrder {
        &self.order
    }

    pub fn column(&self, index: usize) -> PlanResult<&Column> {
        self.columns
            .get(index)
            .ok_or_else(|| PlanError::invalid_column(index, self.columns.len()))
    }

    pub fn check_column(&self, index: usize) -> PlanResult<FieldType> {
        self.column(index).map(|c| c.field_type)
    }

    /// Position of the first column called `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Projection onto `indexes`, keeping whatever order prefix survives
    pub fn select(&self, indexes: &[usize]) -> PlanResult<Self> {
        let mut columns = Vec::with_capacity(indexes.len());
        for (position, &i) in indexes.iter().enumerate() {
            let mut column = self.column(i)?.clone();
            column.index = position;
            columns.push(column);
        }
        let position = |c: usize| indexes.iter().position(|&i| i == c);
        let key = self
            .key
            .as_ref()
            .and_then(|key| key.iter().map(|&c| position(c)).collect::<Option<Vec<_>>>());
        let order = self.order.remap(position);
        Ok(Self::from_columns(columns, key, order))
    }

    /// Concatenation with `right`; the left order is kept, keys are dropped
    pub fn join(&self, right: &RecordHeader) -> Self {
        let offset = self.columns.len();
        let mut columns = self.columns.clone();
        columns.extend(right.columns.iter().cloned().map(|mut c| {
            c.index += offset;
            c
        }));
        Self::from_columns(columns, None, self.order.clone())
    }

    /// Appends computed columns, keeping key and order
    pub fn extend<N: Into<String>>(&self, added: impl IntoIterator<Item = (N, FieldType)>) -> Self {
        let mut columns = self.columns.clone();
        for (name, field_type) in added {
            columns.push(Column {
                name: name.into(),
                index: columns.len(),
                field_type,
                origin: None,
            });
        }
        Self::from_columns(columns, self.key.clone(), self.order.clone())
    }

    /// Prefixes every column name with `alias`
    pub fn alias(&self, alias: &str) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: format!("{}.{}", alias, c.name),
                origin: Some(alias.to_string()),
                ..c.clone()
            })
            .collect();
        Self::from_columns(columns, self.key.clone(), self.order.clone())
    }

    /// Same columns and key under a different order
    pub fn reorder(&self, order: SortOrder) -> Self {
        Self {
            order,
            ..self.clone()
        }
    }

    /// Same columns with neither key nor order
    pub fn unordered(&self) -> Self {
        Self {
            key: None,
            order: SortOrder::unordered(),
            ..self.clone()
        }
    }
}

impl fmt::Display for RecordHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{}:{}", c.name, c.field_type))
            .collect();
        write!(f, "({})", names.join(", "))?;
        if !self.order.is_empty() {
            write!(f, " order by {}", self.order)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> RecordHeader {
        RecordHeader::new([
            ("id", FieldType::Int),
            ("name", FieldType::Text),
            ("age", FieldType::Int),
        ])
        .with_key(vec![0])
        .unwrap()
        .with_order(SortOrder::new(vec![(0, Direction::Positive), (2, Direction::Negative)]))
        .unwrap()
    }

    #[test]
    fn test_select_remaps_order_prefix() {
        let selected = header().select(&[2, 0]).unwrap();
        assert_eq!(selected.columns()[0].name, "age");
        assert_eq!(selected.key(), Some(&[1][..]));
        assert_eq!(
            selected.order().columns(),
            &[(1, Direction::Positive), (0, Direction::Negative)]
        );

        let dropped = header().select(&[1, 2]).unwrap();
        assert!(dropped.order().is_empty());
        assert!(dropped.key().is_none());
    }

    #[test]
    fn test_select_rejects_bad_column() {
        let err = header().select(&[5]).unwrap_err();
        assert_eq!(err.code(), crate::plan::PlanErrorCode::InvalidColumn);
    }

    #[test]
    fn test_join_offsets_right_columns() {
        let right = RecordHeader::new([("x", FieldType::Bool)]);
        let joined = header().join(&right);
        assert_eq!(joined.len(), 4);
        assert_eq!(joined.columns()[3].index, 3);
        assert_eq!(joined.descriptor().fields()[3], FieldType::Bool);
        assert_eq!(joined.order(), header().order());
    }

    #[test]
    fn test_alias_and_lookup() {
        let aliased = header().alias("p");
        assert_eq!(aliased.column_index("p.name"), Some(1));
        assert_eq!(aliased.columns()[1].origin.as_deref(), Some("p"));
    }

    #[test]
    fn test_display() {
        let text = header().to_string();
        assert!(text.starts_with("(id:int, name:text, age:int)"));
        assert!(text.contains("order by #0 asc, #2 desc"));
    }
}
