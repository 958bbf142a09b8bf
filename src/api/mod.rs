pub mod alarm;

pub use alarm::{AlarmCamera, AlarmHandler, AlarmStats};
