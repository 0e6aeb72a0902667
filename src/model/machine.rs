use std::collections::HashSet;

use super::{GroupId, MachineId};

/// A pool of interchangeable machines.
///
/// The machine-selection gene indexes into `machines`, so the vector order is
/// part of the chromosome encoding and must stay stable once a solve starts.
#[derive(Debug, Clone)]
pub struct MachineGroup {
    pub id: GroupId,
    machines: Vec<MachineId>,
    members: HashSet<MachineId>,
}

impl MachineGroup {
    pub fn new(id: GroupId, machines: Vec<MachineId>) -> Self {
        let members = machines.iter().copied().collect();
        Self { id, machines, members }
    }

    pub fn machines(&self) -> &[MachineId] {
        &self.machines
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn machine_at(&self, index: usize) -> MachineId {
        self.machines[index]
    }

    pub fn contains(&self, machine: MachineId) -> bool {
        self.members.contains(&machine)
    }
}
