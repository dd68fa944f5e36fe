//! Dogtrack service models

pub mod dog;
pub mod event;
pub mod event_type;
pub mod submission;
pub mod user;

// Re-export for convenience
pub use dog::{Dog, NewDog};
pub use event::{EventDetail, NewEvent};
pub use event_type::{EventType, NewEventType};
pub use submission::{RawSubmission, TimeInput, Token};
pub use user::{NewUser, User};
