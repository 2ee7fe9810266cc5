// OpenDota endpoints, relative to the configured API base URL

pub const MATCHES_ENDPOINT: &str = "matches/";
pub const EXPLORER_ENDPOINT: &str = "explorer";
pub const MATCH_PAGE_URL: &str = "https://www.opendota.com/matches/";

pub const USER_AGENT: &str = concat!("dota_counters/", env!("CARGO_PKG_VERSION"));

/// Explorer SQL listing public matches after `start_time`, oldest first.
pub fn matches_since_query(start_time: i64) -> String {
    format!(
        "SELECT match_id FROM public_matches WHERE start_time > {} ORDER BY start_time ASC",
        start_time
    )
}

pub fn match_url(api_url: &str, match_id: u64) -> String {
    format!("{}{}{}", api_url, MATCHES_ENDPOINT, match_id)
}

pub fn explorer_url(api_url: &str) -> String {
    format!("{}{}", api_url, EXPLORER_ENDPOINT)
}
