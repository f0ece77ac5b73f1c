mod entity;
pub mod runtime;
pub mod time;
pub mod unit;

pub use entity::{EntityId, EntityState, ServiceCall, StateChange};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ParseError {
    #[display("'{literal}' is not a valid time of day")]
    InvalidTime { literal: String },
    #[display("'{literal}' is not a valid duration")]
    InvalidDuration { literal: String },
    #[display("'{literal}' is not a valid weekday specification")]
    InvalidWeekdays { literal: String },
}
