// src/config.rs
// =============================================================================
// Application configuration, read once at startup from the environment.
//
// A .env file in the working directory is loaded first if present. After
// that the Config is immutable: it is shared (by Arc or by value) with the
// components that need it, never re-read.
//
// Parsing goes through a lookup function instead of std::env directly, so
// tests can feed in a HashMap without touching the process environment.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::notify::{Mailbox, MailjetCredentials};
use crate::retry::{Backoff, RetryPolicy};

pub const DEFAULT_TARGET_URL: &str =
    "https://www.onlinejobs.ph/jobseekers/jobsearch?jobkeyword=developer";
const DEFAULT_SUBJECT: &str = "OLJ Job Postings for Developers";
const DEFAULT_TEXT_PART: &str =
    "These are the latest job postings for developers in OnlineJobs.ph.";

// Which engine renders the target page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Http,
    Chrome,
}

impl EngineKind {
    fn default_for_build() -> Self {
        if cfg!(feature = "chrome") {
            EngineKind::Chrome
        } else {
            EngineKind::Http
        }
    }
}

impl FromStr for EngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(EngineKind::Http),
            "chrome" | "chromium" => {
                if cfg!(feature = "chrome") {
                    Ok(EngineKind::Chrome)
                } else {
                    Err(anyhow!(
                        "chrome engine requested but this build lacks the 'chrome' feature"
                    ))
                }
            }
            other => Err(anyhow!("unknown render engine '{}' (expected http or chrome)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// None is only acceptable for dry runs
    pub mailjet: Option<MailjetCredentials>,
    /// `production` sends for real; anything else uses Mailjet's sandbox
    pub environment: String,
    pub target_url: String,
    pub run_interval: Duration,
    pub retry: RetryPolicy,
    pub page_timeout: Duration,
    pub engine: EngineKind,
    pub chrome_executable: Option<PathBuf>,
    pub sender: Mailbox,
    pub recipients: Vec<Mailbox>,
    pub subject: String,
    pub text_part: String,
    pub utc_offset: FixedOffset,
    pub escape_html: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mailjet = match (get("MJ_APIKEY_PUBLIC"), get("MJ_APIKEY_PRIVATE")) {
            (Some(api_key), Some(api_secret)) => Some(MailjetCredentials { api_key, api_secret }),
            (None, None) => None,
            _ => return Err(anyhow!("MJ_APIKEY_PUBLIC and MJ_APIKEY_PRIVATE must be set together")),
        };

        let sender_email = get("MAIL_SENDER_EMAIL").context("MAIL_SENDER_EMAIL must be set")?;
        let sender_name = get("MAIL_SENDER_NAME").unwrap_or_else(|| "Job Digest".to_string());

        let recipients = Mailbox::parse_list(
            &get("MAIL_RECIPIENTS").context("MAIL_RECIPIENTS must be set")?,
        )
        .context("MAIL_RECIPIENTS is not a valid mailbox list")?;
        if recipients.is_empty() {
            return Err(anyhow!("MAIL_RECIPIENTS must name at least one recipient"));
        }

        let run_interval_secs: u64 = parse_or(&get, "RUN_INTERVAL_SECS", 3600)?;
        if run_interval_secs == 0 {
            return Err(anyhow!("RUN_INTERVAL_SECS must be greater than zero"));
        }

        let page_timeout_secs: u64 = parse_or(&get, "PAGE_TIMEOUT_SECS", 30)?;
        if page_timeout_secs == 0 {
            return Err(anyhow!("PAGE_TIMEOUT_SECS must be greater than zero"));
        }

        let retry = RetryPolicy {
            max_retries: parse_or(&get, "MAX_RETRIES", 5)?,
            backoff: parse_backoff(
                get("RETRY_BACKOFF").as_deref().unwrap_or("none"),
                Duration::from_millis(parse_or(&get, "RETRY_DELAY_MS", 1000)?),
            )?,
        };

        let engine = match get("RENDER_ENGINE") {
            Some(value) => value.parse::<EngineKind>().context("RENDER_ENGINE is invalid")?,
            None => EngineKind::default_for_build(),
        };

        let utc_offset = match get("DIGEST_UTC_OFFSET") {
            Some(value) => value
                .parse::<FixedOffset>()
                .map_err(|e| anyhow!("DIGEST_UTC_OFFSET '{}' is invalid: {}", value, e))?,
            None => FixedOffset::east_opt(8 * 3600)
                .ok_or_else(|| anyhow!("invalid default offset"))?,
        };

        Ok(Self {
            mailjet,
            environment: get("APP_ENV").unwrap_or_else(|| "development".to_string()),
            target_url: get("TARGET_URL").unwrap_or_else(|| DEFAULT_TARGET_URL.to_string()),
            run_interval: Duration::from_secs(run_interval_secs),
            retry,
            page_timeout: Duration::from_secs(page_timeout_secs),
            engine,
            chrome_executable: get("CHROME_EXECUTABLE").map(PathBuf::from),
            sender: Mailbox::new(sender_email, Some(sender_name)),
            recipients,
            subject: get("MAIL_SUBJECT").unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            text_part: get("MAIL_TEXT_PART").unwrap_or_else(|| DEFAULT_TEXT_PART.to_string()),
            utc_offset,
            escape_html: parse_or(&get, "DIGEST_ESCAPE_HTML", true)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

// Parses `key` if set, otherwise returns `default`
fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map_err(|e| anyhow!("{} must be a valid value, got '{}': {}", key, value, e)),
        None => Ok(default),
    }
}

fn parse_backoff(kind: &str, delay: Duration) -> Result<Backoff> {
    match kind.to_ascii_lowercase().as_str() {
        "none" => Ok(Backoff::None),
        "fixed" => Ok(Backoff::Fixed(delay)),
        "exponential" => Ok(Backoff::Exponential {
            base: delay,
            max: delay.saturating_mul(32),
        }),
        other => Err(anyhow!(
            "RETRY_BACKOFF must be none, fixed or exponential, got '{}'",
            other
        )),
    }
}

// Handy for building a Config from literal pairs in tests
#[cfg(test)]
pub(crate) fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}
