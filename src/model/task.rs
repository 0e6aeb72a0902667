use super::{GroupId, TaskId};

/// One schedulable job step.
///
/// `predecessors` is derived from the successor links of the whole task set
/// while the owning [`Problem`](super::Problem) is built and never changes
/// afterwards.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    /// Deadline in schedule time units. `None` means the task never expires.
    pub expire_time: Option<f64>,
    /// Processing time of a single unit.
    pub require_time_each: f64,
    pub group: GroupId,
    /// Number of units this task processes.
    pub count: u32,
    pub successor: Option<TaskId>,
    /// Setup time paid once, before the first unit.
    pub prepare_time: f64,
    pub(crate) predecessors: Vec<TaskId>,
}

impl Task {
    pub fn new(id: TaskId, group: GroupId, require_time_each: f64, count: u32) -> Self {
        Self {
            id,
            expire_time: None,
            require_time_each,
            group,
            count,
            successor: None,
            prepare_time: 0.0,
            predecessors: Vec::new(),
        }
    }

    /// Total busy time on the assigned machine.
    pub fn require_time(&self) -> f64 {
        self.prepare_time + self.count as f64 * self.require_time_each
    }

    pub fn predecessors(&self) -> &[TaskId] {
        &self.predecessors
    }
}
