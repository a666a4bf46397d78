//! Yatube: a small blogging platform.
//!
//! Authors publish posts (optionally into groups), readers comment and follow
//! authors. The crate is layered the usual way: `domain` holds records and
//! invariants, `application` the services and repository seams, `infra` the
//! Postgres and HTTP adapters, `cache` the whole-page cache and
//! `presentation` the askama views.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
