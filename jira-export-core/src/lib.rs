#![doc = "jira-export-core: core logic library for jira-export."]

//! This crate contains the export pipeline, data models and the Jira session.
//! Command-line handling and config file parsing live in the `jira-export` crate.
//!
//! # Modules
//! - [`inline`], [`css`], [`embed`], [`cache`]: turn an issue page into a
//!   self-contained HTML document
//! - [`pdf`]: HTML → PDF through an external renderer, in parallel
//! - [`export`]: the run orchestration tying both stages together
//! - [`contract`]: the fetch seam, mockable in tests

pub mod cache;
pub mod config;
pub mod contract;
pub mod css;
pub mod embed;
pub mod export;
pub mod filename;
pub mod inline;
pub mod issue_details;
pub mod jira;
pub mod keys;
pub mod pdf;
pub mod report;
