pub mod types;
pub mod age_group;
pub mod teams;
pub mod pivot;
pub mod view;

pub use types::{AllocationRecord, Filter, PivotSet, PivotTable, RosterTeam, SlotCell, ALL_TEAMS};
pub use age_group::group_roster_by_age_group;
pub use pivot::format_start_time;
pub use view::StatisticsView;
