//! Fixtures shared by executor tests

use std::sync::Arc;

use crate::plan::{ExecutionSite, ProviderId, RecordHeader};
use crate::tuple::{FieldType, Tuple, Value};

use super::context::EnumerationContext;
use super::provider::{ExecutableProvider, NodeInfo};
use super::source::RawExec;

pub(crate) fn node(header: RecordHeader, sources: Vec<Arc<dyn ExecutableProvider>>) -> NodeInfo {
    NodeInfo::new(ProviderId::next(), header, sources, ExecutionSite::Local)
}

/// Raw executable of int rows
pub(crate) fn ints(names: &[&str], rows: &[&[i64]]) -> Arc<dyn ExecutableProvider> {
    let header = RecordHeader::new(names.iter().map(|n| (*n, FieldType::Int)));
    let rows: Vec<Tuple> = rows
        .iter()
        .map(|r| Tuple::from_values(r.iter().map(|&v| Value::Int(v))))
        .collect();
    Arc::new(RawExec::new(node(header, vec![]), &rows))
}

pub(crate) fn collect(exec: &dyn ExecutableProvider) -> Vec<Tuple> {
    let ctx = EnumerationContext::new(8);
    exec.on_before_enumerate(&ctx).unwrap();
    let rows = exec
        .enumerate(&ctx)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    exec.on_after_enumerate(&ctx).unwrap();
    rows
}

/// Int fields of each row; unavailable and null fields read as None
pub(crate) fn int_rows(rows: &[Tuple]) -> Vec<Vec<Option<i64>>> {
    rows.iter()
        .map(|r| {
            (0..r.len())
                .map(|i| r.value(i).and_then(Value::as_int))
                .collect()
        })
        .collect()
}
