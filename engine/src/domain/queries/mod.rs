//! Query results

pub mod unit_status;

pub use unit_status::UnitStatusView;
