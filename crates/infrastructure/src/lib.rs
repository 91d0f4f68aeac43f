//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_email_service;
mod postgres_otp_repository;
mod postgres_rate_limit_repository;
mod postgres_user_directory;
mod redis_rate_limit_repository;
mod smtp_email_service;

pub use console_email_service::ConsoleEmailService;
pub use postgres_otp_repository::PostgresOtpRepository;
pub use postgres_rate_limit_repository::PostgresRateLimitRepository;
pub use postgres_user_directory::PostgresUserDirectory;
pub use redis_rate_limit_repository::RedisRateLimitRepository;
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService};
