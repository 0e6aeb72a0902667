use crate::model::Problem;

/// Reorders an operation-sequence segment into a dependency-feasible order.
///
/// Scratch buffers are reused across calls and are not safe to share, so each
/// execution context owns one engine and passes it into every operator that
/// permutes the sequence segment.
#[derive(Debug, Default)]
pub struct RepairEngine {
    /// Occurrences held back per piece until its dependencies flush.
    queued: Vec<usize>,
    /// Unmet predecessor task-steps per piece.
    remaining: Vec<usize>,
}

impl RepairEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores feasibility in place.
    ///
    /// The occurrence multiset is preserved and already-feasible entries keep
    /// their relative order; held-back occurrences are flushed as soon as the
    /// last dependency task-step is emitted, cascading down successor chains.
    /// Runs in O(sequence length).
    pub fn repair(&mut self, problem: &Problem, sequence: &mut [usize]) {
        let piece_count = problem.pieces().len();
        self.queued.clear();
        self.queued.resize(piece_count, 0);
        self.remaining.clear();
        self.remaining.extend_from_slice(problem.dependency_counts());

        let mut write = 0;
        for read in 0..sequence.len() {
            let piece = sequence[read];
            if self.remaining[piece] > 0 {
                self.queued[piece] += 1;
                continue;
            }
            sequence[write] = piece;
            write += 1;

            let Some(mut successor) = problem.piece_successor(piece) else {
                continue;
            };
            self.remaining[successor] -= 1;
            while self.remaining[successor] == 0 && self.queued[successor] > 0 {
                let flushed = self.queued[successor];
                self.queued[successor] = 0;
                for _ in 0..flushed {
                    sequence[write] = successor;
                    write += 1;
                }
                match problem.piece_successor(successor) {
                    Some(next) => {
                        self.remaining[next] -= flushed;
                        successor = next;
                    }
                    None => break,
                }
            }
        }
        debug_assert_eq!(write, sequence.len());
    }
}
