pub mod calendar;
pub mod machine;
pub mod piece;
pub mod problem;
pub mod task;

pub use calendar::{TimeUnit, WorkHours};
pub use machine::MachineGroup;
pub use piece::Piece;
pub use problem::Problem;
pub use task::Task;

pub type TaskId = i32;
pub type MachineId = i32;
pub type GroupId = i32;

/// Group id standing for "any registered machine". Problem construction always
/// rebuilds this group from the full machine roster, replacing any input rows
/// that claim the id.
pub const UNRESTRICTED_GROUP: GroupId = -1;
