//! Feed-side half of the notification pipeline: turns the source site's
//! RSS document into typed episode-release facts, and builds the canonical
//! episode deep links.

pub mod link;
pub mod parser;
