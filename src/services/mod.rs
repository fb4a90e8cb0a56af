pub mod assist;
pub mod persist;
pub mod usage;
