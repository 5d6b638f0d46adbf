//! Episode-release extraction from the site's RSS feed.
//!
//! One scan turns a fetched feed document into a sequence of
//! [`EpisodeRelease`] facts. Extraction is best-effort per entry: a single
//! bad link never aborts the scan, only a document that fails to parse as a
//! feed at all is fatal for the call.

use feed_rs::model::Entry;
use url::Url;

use herald_common::types::EpisodeRelease;

/// Marker substring for supplementary items (trailers, extras) that share
/// the feed with regular episode releases. Filtered, not an error.
const ADDITIONAL_MARKER: &str = "/additional/";

/// Host of the source catalog; episode links must live on it or a subdomain.
const FEED_HOST: &str = "lostfilm.tv";

/// Why the scan failed as a whole.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("malformed feed document: {0}")]
    Malformed(#[from] feed_rs::parser::ParseFeedError),
}

/// Why a single entry produced no fact but is not a filtering rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("entry has no link")]
    MissingLink,
    #[error("link is not a valid URL: {0}")]
    Unparseable(#[from] url::ParseError),
    #[error("link does not match the episode pattern: {0}")]
    PatternMismatch(String),
}

/// Classification of one feed entry's link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A regular episode release.
    Matched(EpisodeRelease),
    /// A supplementary item — filtered silently.
    Skipped,
    /// A data error — logged and skipped by the scan.
    Invalid(LinkError),
}

/// A parsed feed document, ready to be drained into episode releases.
pub struct FeedScan {
    entries: Vec<Entry>,
}

/// Parse a raw feed document.
///
/// A document that is not well-formed RSS/Atom is fatal for the call; no
/// partial result is returned.
pub fn scan_feed(document: &str) -> Result<FeedScan, FeedError> {
    let feed = feed_rs::parser::parse(document.as_bytes())?;
    Ok(FeedScan {
        entries: feed.entries,
    })
}

impl FeedScan {
    /// Drain the scan into episode-release facts: a lazy, finite,
    /// non-restartable sequence. Per-entry problems are reported through
    /// tracing and skipped, never raised.
    pub fn into_releases(self) -> impl Iterator<Item = EpisodeRelease> {
        self.entries.into_iter().filter_map(|entry| {
            let link = match entry.links.first() {
                Some(l) => l.href.as_str(),
                None => {
                    tracing::warn!(entry_id = %entry.id, "Feed entry has no link, skipping");
                    return None;
                }
            };
            match classify_link(link) {
                LinkOutcome::Matched(release) => Some(release),
                LinkOutcome::Skipped => {
                    tracing::debug!(link, "Supplementary item filtered");
                    None
                }
                LinkOutcome::Invalid(err) => {
                    tracing::warn!(link, error = %err, "Bad feed entry link, skipping");
                    None
                }
            }
        })
    }
}

/// Classify one entry link against the canonical episode pattern
/// `https://[subdomain.]lostfilm.tv/series/<alias>/season_<N>/episode_<M>/`.
pub fn classify_link(link: &str) -> LinkOutcome {
    if link.contains(ADDITIONAL_MARKER) {
        return LinkOutcome::Skipped;
    }

    let url = match Url::parse(link.trim()) {
        Ok(url) => url,
        Err(err) => return LinkOutcome::Invalid(err.into()),
    };

    match match_episode_path(&url) {
        Some((alias, season, episode)) => LinkOutcome::Matched(EpisodeRelease {
            show_alias: alias,
            season_number: season,
            episode_number: episode,
            source_link: url.to_string(),
        }),
        None => LinkOutcome::Invalid(LinkError::PatternMismatch(link.to_string())),
    }
}

fn match_episode_path(url: &Url) -> Option<(String, u32, u32)> {
    if url.scheme() != "https" || !host_is_feed_site(url.host_str()?) {
        return None;
    }

    let mut segments = url.path_segments()?;

    if segments.next()? != "series" {
        return None;
    }
    let alias = segments.next()?;
    if alias.is_empty() {
        return None;
    }
    let season = numbered_segment(segments.next()?, "season_")?;
    let episode = numbered_segment(segments.next()?, "episode_")?;
    // The canonical pattern closes the episode segment with '/': a trailing
    // slash (or deeper path) yields one more segment, a bare episode number
    // yields none.
    segments.next()?;

    Some((alias.to_string(), season, episode))
}

fn host_is_feed_site(host: &str) -> bool {
    host == FEED_HOST || host.ends_with(&format!(".{FEED_HOST}"))
}

/// Parse a `<prefix><digits>` path segment such as `season_5`.
fn numbered_segment(segment: &str, prefix: &str) -> Option<u32> {
    let digits = segment.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
