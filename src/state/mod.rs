// State management module
// Local view state mirrored from pipeline events

pub mod dashboard;

pub use dashboard::{DashboardState, Tab};
