#![forbid(unsafe_code)]

pub mod answer;
pub mod model;
pub mod scoring;
pub mod time;

pub use answer::check_answer;
pub use scoring::{AttemptTally, score_percent};
pub use time::Clock;
