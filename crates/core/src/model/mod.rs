mod attempt;
mod catalog;
mod ids;
mod practice;
mod question;
mod snapshot;
mod test_attempt;
mod test_config;
mod test_instance;

pub use ids::{AttemptId, ConfigId, ParseIdError, TestId};

pub use attempt::{QuestionAttempt, QuestionStatus, UserAnswer};
pub use catalog::{CatalogError, DomainStructure, ProfileName, RepositoryRef};
pub use practice::{AnsweredQuestion, PracticeProgress, PracticeStats};
pub use question::{AnswerKey, Question, QuestionKind};
pub use snapshot::{AttemptSnapshot, SnapshotEntry};
pub use test_attempt::{AttemptType, TestAttempt};
pub use test_config::{QuestionRange, RangeError, TestConfigError, TestConfiguration};
pub use test_instance::{RetestType, TestInstance};
