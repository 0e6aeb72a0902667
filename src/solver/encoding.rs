use crate::model::Problem;

/// Gene-level layout derived from a problem: segment length, per-slot machine
/// ranges and the canonical operation-sequence template.
///
/// Both chromosome segments have one slot per task. Machine-selection slots
/// are grouped by piece in chain order; `ms_begin[p]` is the first slot of
/// piece `p`, so task-step `k` of piece `p` lives at `ms_begin[p] + k`.
#[derive(Debug, Clone)]
pub struct Encoding {
    pub gene_len: usize,
    /// First machine-selection slot per piece id.
    pub ms_begin: Vec<usize>,
    /// Exclusive upper bound of the legal gene value per slot, equal to the
    /// machine count of the owning task's group.
    pub ms_range: Vec<usize>,
    /// Piece ids with chain-length multiplicity, in topological order.
    pub os_template: Vec<usize>,
}

impl Encoding {
    pub fn new(problem: &Problem) -> Self {
        let gene_len = problem.task_count();
        let mut ms_begin = Vec::with_capacity(problem.pieces().len());
        let mut ms_range = Vec::with_capacity(gene_len);
        let mut os_template = Vec::with_capacity(gene_len);
        for piece in problem.pieces() {
            ms_begin.push(ms_range.len());
            for &task_id in &piece.tasks {
                let task = problem.task_ref(task_id);
                ms_range.push(problem.group_for(task).len());
                os_template.push(piece.id);
            }
        }
        Self {
            gene_len,
            ms_begin,
            ms_range,
            os_template,
        }
    }

    /// Machine-selection slot of task-step `order` of `piece`.
    pub fn slot(&self, piece: usize, order: usize) -> usize {
        self.ms_begin[piece] + order
    }

    /// Uniformly random machine-selection segment.
    pub fn random_ms(&self, rng: &mut fastrand::Rng) -> Vec<usize> {
        self.ms_range.iter().map(|&range| rng.usize(0..range)).collect()
    }

    /// Random permutation of the operation-sequence template. Callers must
    /// repair the result before decoding it.
    pub fn shuffled_os(&self, rng: &mut fastrand::Rng) -> Vec<usize> {
        let mut os = self.os_template.clone();
        rng.shuffle(&mut os);
        os
    }
}
