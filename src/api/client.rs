use crate::config::Config;
use crate::driver::MatchSource;
use crate::error::AppError;
use governor::clock::{Clock, DefaultClock};
use governor::{
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use serde_json::Value;
use std::num::NonZeroU32;
use std::thread;
use std::time::Duration;

use super::endpoints::{explorer_url, match_url, matches_since_query, USER_AGENT};
use super::models::*;

pub struct OpenDotaClient {
    config: Config,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    clock: DefaultClock,
}

impl OpenDotaClient {
    pub fn new(config: Config) -> Self {
        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_minute(per_minute));
        OpenDotaClient {
            config,
            rate_limiter,
            clock: DefaultClock::default(),
        }
    }

    fn wait_for_permit(&self) {
        while let Err(not_until) = self.rate_limiter.check() {
            thread::sleep(not_until.wait_time_from(self.clock.now()));
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        retry_delay(self.config.retry_base, self.config.retry_max, attempt)
    }

    /// GETs a JSON document. Transport faults, 429/5xx answers and bodies
    /// that are not JSON are retried until they succeed. A 404 is `None`.
    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Option<Value>, AppError> {
        let mut attempt = 0;

        loop {
            self.wait_for_permit();

            let mut request = ureq::get(url).set("User-Agent", USER_AGENT);
            for (key, value) in query {
                request = request.query(key, value);
            }
            if let Some(api_key) = &self.config.api_key {
                request = request.query("api_key", api_key);
            }

            let failure = match request.call() {
                Ok(resp) => match resp.into_string() {
                    Ok(body) => match serde_json::from_str::<Value>(&body) {
                        Ok(value) => return Ok(Some(value)),
                        Err(e) => format!("unreadable body ({})", e),
                    },
                    Err(e) => format!("interrupted body ({})", e),
                },
                Err(ureq::Error::Status(404, _)) => return Ok(None),
                Err(ureq::Error::Status(code, _)) if code == 429 || code >= 500 => {
                    format!("HTTP {}", code)
                }
                Err(ureq::Error::Status(code, _)) => {
                    return Err(AppError::HttpError(format!("HTTP {} from {}", code, url)));
                }
                Err(ureq::Error::Transport(transport)) => format!("network problem ({})", transport),
            };

            let delay = self.backoff(attempt);
            log::warn!(
                "{} from {}, retrying in {}ms",
                failure,
                url,
                delay.as_millis()
            );
            thread::sleep(delay);
            attempt = attempt.saturating_add(1);
        }
    }
}

impl MatchSource for OpenDotaClient {
    fn match_ids_since(&self, start_time: i64) -> Result<Vec<u64>, AppError> {
        let url = explorer_url(&self.config.api_url);
        let sql = matches_since_query(start_time);

        let value = self
            .get_json(&url, &[("sql", sql.as_str())])?
            .ok_or_else(|| AppError::HttpError(format!("{} not found", url)))?;
        let response: ExplorerResponse = serde_json::from_value(value)
            .map_err(|e| AppError::JsonError(format!("Explorer response: {}", e)))?;

        if let Some(err) = response.err {
            return Err(AppError::HttpError(format!("Explorer query failed: {}", err)));
        }
        Ok(response.rows.into_iter().map(|row| row.match_id).collect())
    }

    fn fetch_match(&self, match_id: u64) -> Result<Option<MatchRecord>, AppError> {
        match self.fetch_match_json(match_id)? {
            Some(value) => MatchRecord::from_json_value(match_id, value).map(Some),
            None => Ok(None),
        }
    }
}

impl OpenDotaClient {
    /// The raw match document, kept as-is for the local archive.
    pub fn fetch_match_json(&self, match_id: u64) -> Result<Option<Value>, AppError> {
        let url = match_url(&self.config.api_url, match_id);
        let Some(value) = self.get_json(&url, &[])? else {
            return Ok(None);
        };
        Ok(looks_like_match(&value).then_some(value))
    }
}

/// The API answers unknown ids with `{"error": ..}` instead of a match.
pub fn looks_like_match(value: &Value) -> bool {
    value.get("error").is_none() && value.get("start_time").map_or(false, |t| !t.is_null())
}

/// Exponential backoff, `base * 2^attempt`, capped at `max`.
pub fn retry_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    base.saturating_mul(factor).min(max)
}
