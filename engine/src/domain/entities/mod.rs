pub mod group;
pub mod runtime_status;
pub mod unit;

pub use group::{Group, GroupDraft};
pub use runtime_status::RuntimeStatus;
pub use unit::{Unit, UnitBuilder};
