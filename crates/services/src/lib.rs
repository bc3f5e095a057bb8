#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod practice_service;
pub mod results_service;
pub mod sessions;
pub mod test_config_service;

pub use testmate_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::{CatalogService, SearchHit};
pub use error::{
    AppServicesError, CatalogServiceError, PracticeError, SessionError, TestConfigServiceError,
};
pub use practice_service::PracticeService;
pub use results_service::ResultsService;
pub use test_config_service::TestConfigService;

pub use sessions::{
    AnswerView, SavedResult, SessionContext, SessionMode, SessionOutcome, SessionProgress,
    SessionRequest, TestLoopService, TestSession,
};
