#![forbid(unsafe_code)]

pub mod bank;
pub mod repository;
pub mod sqlite;

pub use bank::{FsQuestionBank, InMemoryQuestionBank, QuestionBank};
pub use repository::{Storage, StorageError};
