// Event/notification bus: push events for subscribers and transient notices for the operator

pub mod bus;
pub mod notices;

pub use bus::{EventBus, FieldEvent};
pub use notices::{Notice, NoticeBoard, Severity};
