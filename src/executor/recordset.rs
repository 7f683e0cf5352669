//! Root cursor over a compiled plan
//!
//! A `RecordSet` owns one root enumeration context. It runs the
//! before-enumeration hooks lazily on the first read, and the
//! after-enumeration hooks plus context close once the rows are exhausted,
//! an error is returned, or the record set is dropped.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::plan::RecordHeader;
use crate::tuple::Tuple;

use super::context::EnumerationContext;
use super::errors::ExecutorResult;
use super::provider::{ExecutableProvider, RowStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Pending,
    Running,
    Finished,
}

/// Forward-only cursor over the rows of an executable
pub struct RecordSet {
    root: Arc<dyn ExecutableProvider>,
    ctx: EnumerationContext,
    stream: Option<RowStream>,
    current: Option<Tuple>,
    state: CursorState,
    rows: u64,
}

impl RecordSet {
    pub fn new(root: Arc<dyn ExecutableProvider>, max_depth: usize) -> Self {
        Self {
            root,
            ctx: EnumerationContext::new(max_depth),
            stream: None,
            current: None,
            state: CursorState::Pending,
            rows: 0,
        }
    }

    pub fn header(&self) -> &RecordHeader {
        self.root.header()
    }

    /// Row the cursor is on, after a successful `move_next`
    pub fn current(&self) -> Option<&Tuple> {
        self.current.as_ref()
    }

    /// Advances to the next row. Returns false once the rows are exhausted.
    pub fn move_next(&mut self) -> ExecutorResult<bool> {
        match self.next() {
            Some(Ok(row)) => {
                self.current = Some(row);
                Ok(true)
            }
            Some(Err(e)) => {
                self.current = None;
                Err(e)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    /// Reads every remaining row
    pub fn to_vec(self) -> ExecutorResult<Vec<Tuple>> {
        self.collect()
    }

    fn start(&mut self) -> ExecutorResult<()> {
        self.state = CursorState::Running;
        self.root.on_before_enumerate(&self.ctx)?;
        self.stream = Some(self.root.enumerate(&self.ctx)?);
        Ok(())
    }

    fn finish(&mut self) -> ExecutorResult<()> {
        if self.state == CursorState::Finished {
            return Ok(());
        }
        self.state = CursorState::Finished;
        self.stream = None;
        let result = self.root.on_after_enumerate(&self.ctx);
        self.ctx.close();
        debug!(root = %self.root.id(), rows = self.rows, "enumeration finished");
        result
    }
}

impl Iterator for RecordSet {
    type Item = ExecutorResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            CursorState::Finished => return None,
            CursorState::Pending => {
                if let Err(e) = self.start() {
                    let _ = self.finish();
                    return Some(Err(e));
                }
            }
            CursorState::Running => {}
        }
        let next = self.stream.as_mut().and_then(|s| s.next());
        match next {
            Some(Ok(row)) => {
                self.rows += 1;
                Some(Ok(row))
            }
            Some(Err(e)) => {
                let _ = self.finish();
                Some(Err(e))
            }
            None => self.finish().err().map(Err),
        }
    }
}

impl Drop for RecordSet {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(error = %e, "after-enumeration hook failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{int_rows, ints};
    use crate::tuple::Value;

    #[test]
    fn test_move_next_and_current() {
        let mut records = RecordSet::new(ints(&["a"], &[&[1], &[2]]), 4);
        assert!(records.current().is_none());

        assert!(records.move_next().unwrap());
        assert_eq!(records.current().and_then(|r| r.value(0)), Some(&Value::Int(1)));
        assert!(records.move_next().unwrap());
        assert!(!records.move_next().unwrap());
        assert!(records.current().is_none());
        assert!(!records.move_next().unwrap());
    }

    #[test]
    fn test_restartable() {
        let root = ints(&["a"], &[&[1], &[2]]);
        let first = RecordSet::new(root.clone(), 4).to_vec().unwrap();
        let second = RecordSet::new(root, 4).to_vec().unwrap();
        assert_eq!(int_rows(&first), int_rows(&second));
    }
}
