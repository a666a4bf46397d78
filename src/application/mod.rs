//! Application services, repository seams and request context.

pub mod accounts;
pub mod context;
pub mod error;
pub mod follows;
pub mod guard;
pub mod listing;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod sessions;
