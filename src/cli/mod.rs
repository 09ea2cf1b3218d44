//! CLI operation handlers.
//!
//! - [`migrations`]: Database schema migrations
//! - [`report`]: Query, aggregate, and print the statistics
//!
//! Output formatting utilities are in [`output`].

pub mod migrations;
pub mod output;
pub mod report;
