#![forbid(unsafe_code)]

pub mod account_service;
pub mod app_services;
pub mod auth;
pub mod error;
pub mod markdown;
pub mod puzzle_service;
pub mod quiz_service;
pub mod teacher_service;
pub mod views;

pub use mathwrks_core::Clock;

pub use account_service::AccountService;
pub use app_services::AppServices;
pub use auth::{AuthSettings, Claims, PasswordHasher, Role, TokenIssuer};
pub use error::{AccountServiceError, AppServicesError, AuthError, ContentError, QuizError};
pub use puzzle_service::PuzzleService;
pub use quiz_service::QuizService;
pub use teacher_service::{TeacherRepos, TeacherService};
