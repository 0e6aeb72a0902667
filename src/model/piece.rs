use super::TaskId;

/// A maximal single-successor chain of tasks, the unit the operation-sequence
/// gene permutes.
///
/// Piece ids are dense and topologically ordered: every piece a chain depends
/// on carries a smaller id than the chain itself.
#[derive(Debug, Clone)]
pub struct Piece {
    pub id: usize,
    /// Tasks in execution order along the chain.
    pub tasks: Vec<TaskId>,
    /// Pieces whose last task feeds the first task of this chain.
    pub predecessors: Vec<usize>,
}

impl Piece {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
