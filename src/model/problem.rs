use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::error::{TaskForgeError, TfResult};
use crate::model::{
    GroupId, MachineGroup, Piece, Task, TaskId, TimeUnit, WorkHours, UNRESTRICTED_GROUP,
};

/// An immutable scheduling instance: the task graph, the machine groups and
/// the piece decomposition derived from them.
///
/// Construction validates every cross reference and rejects cyclic successor
/// chains, so downstream code can index freely.
#[derive(Debug)]
pub struct Problem {
    tasks: BTreeMap<TaskId, Task>,
    groups: BTreeMap<GroupId, MachineGroup>,
    pieces: Vec<Piece>,
    /// Total predecessor task count per piece, indexed by piece id.
    dependency_counts: Vec<usize>,
    /// Successor piece per piece id. A piece feeds at most one other piece.
    piece_successors: Vec<Option<usize>>,
    /// Owning piece per task.
    task_pieces: HashMap<TaskId, usize>,
    /// Groups whose machines are treated as uncontended capacity.
    virtual_groups: HashSet<GroupId>,
    work_hours: WorkHours,
    time_unit: TimeUnit,
}

impl Problem {
    pub fn new(tasks: Vec<Task>, groups: Vec<MachineGroup>) -> TfResult<Self> {
        Self::with_calendar(tasks, groups, WorkHours::default(), TimeUnit::default())
    }

    pub fn with_calendar(
        tasks: Vec<Task>,
        groups: Vec<MachineGroup>,
        work_hours: WorkHours,
        time_unit: TimeUnit,
    ) -> TfResult<Self> {
        if tasks.is_empty() {
            return Err(TaskForgeError::Data("no task to assign".into()));
        }
        let groups = index_groups(groups)?;
        let tasks = link_tasks(tasks, &groups)?;
        let (pieces, piece_successors) = decompose_pieces(&tasks);

        let mut dependency_counts = vec![0usize; pieces.len()];
        let mut task_pieces = HashMap::new();
        for piece in &pieces {
            dependency_counts[piece.id] =
                piece.predecessors.iter().map(|&p| pieces[p].len()).sum();
            for &task in &piece.tasks {
                task_pieces.insert(task, piece.id);
            }
        }

        debug!(
            tasks = tasks.len(),
            groups = groups.len(),
            pieces = pieces.len(),
            "problem built"
        );
        Ok(Self {
            tasks,
            groups,
            pieces,
            dependency_counts,
            piece_successors,
            task_pieces,
            virtual_groups: HashSet::new(),
            work_hours,
            time_unit,
        })
    }

    /// Replaces the set of uncontended machine groups. Must be called before
    /// the problem is shared with a solver.
    pub fn set_virtual_groups(&mut self, groups: impl IntoIterator<Item = GroupId>) {
        self.virtual_groups = groups.into_iter().collect();
    }

    pub fn is_virtual(&self, group: GroupId) -> bool {
        self.virtual_groups.contains(&group)
    }

    pub fn virtual_groups(&self) -> &HashSet<GroupId> {
        &self.virtual_groups
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// The task behind a validated id. Panics only if `id` does not belong to
    /// this problem.
    pub fn task_ref(&self, id: TaskId) -> &Task {
        &self.tasks[&id]
    }

    /// Tasks in ascending id order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn group(&self, id: GroupId) -> Option<&MachineGroup> {
        self.groups.get(&id)
    }

    /// Groups in ascending id order.
    pub fn groups(&self) -> impl Iterator<Item = &MachineGroup> {
        self.groups.values()
    }

    /// The group a validated task references. Panics only if `task` does not
    /// belong to this problem.
    pub fn group_for(&self, task: &Task) -> &MachineGroup {
        &self.groups[&task.group]
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece_successor(&self, piece: usize) -> Option<usize> {
        self.piece_successors[piece]
    }

    pub fn dependency_counts(&self) -> &[usize] {
        &self.dependency_counts
    }

    pub fn piece_of(&self, task: TaskId) -> Option<usize> {
        self.task_pieces.get(&task).copied()
    }

    pub fn work_hours(&self) -> WorkHours {
        self.work_hours
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }
}

/// Indexes groups by id and rebuilds the unrestricted group so it always
/// covers every registered machine, in group-id order.
fn index_groups(groups: Vec<MachineGroup>) -> TfResult<BTreeMap<GroupId, MachineGroup>> {
    let mut map = BTreeMap::new();
    for group in groups {
        let id = group.id;
        if map.insert(id, group).is_some() {
            return Err(TaskForgeError::Data(format!(
                "duplicate machine group id {id}"
            )));
        }
    }
    let all: Vec<_> = map
        .values()
        .flat_map(|g| g.machines().iter().copied())
        .collect();
    if !all.is_empty() {
        map.insert(
            UNRESTRICTED_GROUP,
            MachineGroup::new(UNRESTRICTED_GROUP, all),
        );
    }
    Ok(map)
}

/// Checks group references, fills predecessor lists from successor links and
/// rejects graphs with dependency cycles.
fn link_tasks(
    tasks: Vec<Task>,
    groups: &BTreeMap<GroupId, MachineGroup>,
) -> TfResult<BTreeMap<TaskId, Task>> {
    let mut map: BTreeMap<TaskId, Task> = BTreeMap::new();
    for task in tasks {
        let id = task.id;
        match groups.get(&task.group) {
            None => {
                return Err(TaskForgeError::Data(format!(
                    "machine group {} referenced by task {} not found",
                    task.group, id
                )))
            }
            Some(group) if group.is_empty() => {
                return Err(TaskForgeError::Data(format!(
                    "machine group {} referenced by task {} has no enabled machine",
                    task.group, id
                )))
            }
            Some(_) => {}
        }
        if map.insert(id, task).is_some() {
            return Err(TaskForgeError::Data(format!("duplicate task id {id}")));
        }
    }

    let ids: Vec<TaskId> = map.keys().copied().collect();
    let mut in_degree: HashMap<TaskId, usize> = HashMap::new();
    for &id in &ids {
        if let Some(successor) = map[&id].successor {
            match map.get_mut(&successor) {
                Some(next) => next.predecessors.push(id),
                None => {
                    return Err(TaskForgeError::Data(format!(
                        "cannot find successor {successor} of task {id}"
                    )))
                }
            }
            *in_degree.entry(successor).or_insert(0) += 1;
        }
    }

    // Kahn's algorithm: anything left unfinished sits on a cycle.
    let mut queue: VecDeque<TaskId> = ids
        .iter()
        .copied()
        .filter(|id| !in_degree.contains_key(id))
        .collect();
    let mut finished: HashSet<TaskId> = HashSet::new();
    while let Some(id) = queue.pop_front() {
        finished.insert(id);
        if let Some(successor) = map[&id].successor {
            if let Some(degree) = in_degree.get_mut(&successor) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(successor);
                }
            }
        }
    }
    for &id in &ids {
        if !finished.contains(&id) {
            return Err(TaskForgeError::Data(format!(
                "cannot solve: task {id} is part of a dependency cycle"
            )));
        }
    }
    Ok(map)
}

/// Splits the task graph into maximal single-successor chains.
///
/// Walking backward from every terminal task yields each chain once; the
/// recursion into branching predecessors numbers dependency pieces before the
/// pieces that consume them, which keeps piece ids topologically ordered.
fn decompose_pieces(tasks: &BTreeMap<TaskId, Task>) -> (Vec<Piece>, Vec<Option<usize>>) {
    let mut pieces: Vec<Piece> = Vec::new();
    for (&id, task) in tasks {
        if task.successor.is_none() {
            chain_to_piece(tasks, id, &mut pieces);
        }
    }

    let mut successors = vec![None; pieces.len()];
    for piece in &pieces {
        for &pre in &piece.predecessors {
            successors[pre] = Some(piece.id);
        }
    }
    (pieces, successors)
}

fn chain_to_piece(
    tasks: &BTreeMap<TaskId, Task>,
    entry: TaskId,
    pieces: &mut Vec<Piece>,
) -> usize {
    let mut chain = vec![entry];
    let mut cursor = entry;
    while tasks[&cursor].predecessors.len() == 1 {
        cursor = tasks[&cursor].predecessors[0];
        chain.push(cursor);
    }

    let mut predecessors = Vec::new();
    if tasks[&cursor].predecessors.len() > 1 {
        for &pre in &tasks[&cursor].predecessors {
            predecessors.push(chain_to_piece(tasks, pre, pieces));
        }
    }

    chain.reverse();
    let id = pieces.len();
    pieces.push(Piece {
        id,
        tasks: chain,
        predecessors,
    });
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: GroupId, machines: Vec<i32>) -> MachineGroup {
        MachineGroup::new(id, machines)
    }

    fn chain(ids: &[TaskId]) -> Vec<Task> {
        ids.iter()
            .enumerate()
            .map(|(i, &id)| {
                let mut t = Task::new(id, 0, 1.0, 1);
                t.successor = ids.get(i + 1).copied();
                t
            })
            .collect()
    }

    #[test]
    fn single_chain_becomes_one_piece() {
        let problem = Problem::new(chain(&[1, 2, 3]), vec![group(0, vec![10])]).unwrap();
        assert_eq!(problem.pieces().len(), 1);
        assert_eq!(problem.pieces()[0].tasks, vec![1, 2, 3]);
        assert_eq!(problem.piece_successor(0), None);
        assert_eq!(problem.dependency_counts(), &[0]);
    }

    #[test]
    fn branching_predecessors_split_into_ordered_pieces() {
        // 1 -> 3 <- 2, then 3 -> 4.
        let mut t1 = Task::new(1, 0, 1.0, 1);
        t1.successor = Some(3);
        let mut t2 = Task::new(2, 0, 1.0, 1);
        t2.successor = Some(3);
        let mut t3 = Task::new(3, 0, 1.0, 1);
        t3.successor = Some(4);
        let t4 = Task::new(4, 0, 1.0, 1);

        let problem = Problem::new(vec![t1, t2, t3, t4], vec![group(0, vec![10])]).unwrap();
        assert_eq!(problem.pieces().len(), 3);
        // Dependency pieces are numbered before the chain that consumes them.
        let last = &problem.pieces()[2];
        assert_eq!(last.tasks, vec![3, 4]);
        assert_eq!(last.predecessors.len(), 2);
        for &pre in &last.predecessors {
            assert!(pre < last.id);
            assert_eq!(problem.piece_successor(pre), Some(last.id));
        }
        assert_eq!(problem.dependency_counts()[last.id], 2);
    }

    #[test]
    fn cycle_is_rejected() {
        let mut t1 = Task::new(1, 0, 1.0, 1);
        t1.successor = Some(2);
        let mut t2 = Task::new(2, 0, 1.0, 1);
        t2.successor = Some(1);
        let err = Problem::new(vec![t1, t2], vec![group(0, vec![10])]).unwrap_err();
        assert!(err.to_string().contains("dependency cycle"));
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut t1 = Task::new(1, 0, 1.0, 1);
        t1.successor = Some(1);
        let err = Problem::new(vec![t1], vec![group(0, vec![10])]).unwrap_err();
        assert!(err.to_string().contains("dependency cycle"));
    }

    #[test]
    fn missing_group_is_rejected() {
        let err = Problem::new(vec![Task::new(1, 9, 1.0, 1)], vec![group(0, vec![10])])
            .unwrap_err();
        assert!(err.to_string().contains("machine group 9"));
    }

    #[test]
    fn missing_successor_is_rejected() {
        let mut t1 = Task::new(1, 0, 1.0, 1);
        t1.successor = Some(42);
        let err = Problem::new(vec![t1], vec![group(0, vec![10])]).unwrap_err();
        assert!(err.to_string().contains("successor 42"));
    }

    #[test]
    fn empty_task_set_is_rejected() {
        let err = Problem::new(Vec::new(), vec![group(0, vec![10])]).unwrap_err();
        assert!(err.to_string().contains("no task"));
    }

    #[test]
    fn unrestricted_group_is_synthesized() {
        let problem = Problem::new(
            vec![Task::new(1, UNRESTRICTED_GROUP, 1.0, 1)],
            vec![group(0, vec![10, 11]), group(1, vec![20])],
        )
        .unwrap();
        let all = problem.group(UNRESTRICTED_GROUP).unwrap();
        assert_eq!(all.machines(), &[10, 11, 20]);
    }

    #[test]
    fn duplicate_task_id_is_rejected() {
        let tasks = vec![Task::new(1, 0, 1.0, 1), Task::new(1, 0, 2.0, 1)];
        let err = Problem::new(tasks, vec![group(0, vec![10])]).unwrap_err();
        assert!(err.to_string().contains("duplicate task id 1"));
    }

    #[test]
    fn duplicate_group_id_is_rejected() {
        let err = Problem::new(
            vec![Task::new(1, 0, 1.0, 1)],
            vec![group(0, vec![10]), group(0, vec![11])],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate machine group id 0"));
    }

    #[test]
    fn group_without_machines_is_rejected() {
        let err =
            Problem::new(vec![Task::new(1, 0, 1.0, 1)], vec![group(0, Vec::new())]).unwrap_err();
        assert!(err.to_string().contains("no enabled machine"));
    }

    #[test]
    fn piece_lookup_maps_every_task() {
        let problem = Problem::new(chain(&[1, 2, 3]), vec![group(0, vec![10])]).unwrap();
        assert_eq!(problem.piece_of(1), Some(0));
        assert_eq!(problem.piece_of(3), Some(0));
        assert_eq!(problem.piece_of(42), None);
    }

    #[test]
    fn virtual_groups_are_tracked() {
        let mut problem = Problem::new(chain(&[1, 2]), vec![group(0, vec![10])]).unwrap();
        assert!(!problem.is_virtual(0));
        problem.set_virtual_groups([0]);
        assert!(problem.is_virtual(0));
        assert!(!problem.is_virtual(UNRESTRICTED_GROUP));
    }
}
