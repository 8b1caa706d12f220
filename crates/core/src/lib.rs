#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod recorder;
pub mod time;
pub mod timer;

pub use error::Error;
pub use recorder::ResponseRecorder;
pub use time::Clock;
pub use timer::{Countdown, TimerEvent};
