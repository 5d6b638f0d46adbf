//! Canonical episode URL construction.
//!
//! The site exposes one stable URL shape per episode:
//! `https://www.lostfilm.tv/series/<alias>/season_<N>/episode_<M>`.
//! The dispatcher uses this for the human-facing deep link; the parser's
//! tests use it to validate extracted links against the same template.

/// Build the canonical episode page URL. Pure template substitution —
/// inputs are assumed pre-validated by the time this is called.
pub fn episode_url(alias: &str, season: u32, episode: u32) -> String {
    format!("https://www.lostfilm.tv/series/{alias}/season_{season}/episode_{episode}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_url_substitution() {
        assert_eq!(
            episode_url("Fargo", 5, 3),
            "https://www.lostfilm.tv/series/Fargo/season_5/episode_3"
        );
    }

    #[test]
    fn test_episode_url_multi_digit_numbers() {
        assert_eq!(
            episode_url("The_Expanse", 12, 101),
            "https://www.lostfilm.tv/series/The_Expanse/season_12/episode_101"
        );
    }
}
