// src/digest.rs
// =============================================================================
// Turns a run's listings into the email subject and HTML body.
//
// Formatting is a pure function of (records, timestamp): no I/O, no clock
// reads, no failure cases. Same input, same bytes out.
//
// Record fields are scraped free text from a third-party page, so they are
// HTML-escaped before they go into the body. Escaping can be turned off to
// get the fields verbatim.
// =============================================================================

use chrono::{DateTime, FixedOffset, Utc};

use crate::extract::ListingRecord;

/// The composed email payload for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub generated_at: DateTime<FixedOffset>,
    pub subject: String,
    pub html_body: String,
}

// Opening tag of every listing block; also what tests count blocks by
const BLOCK_OPEN: &str =
    r#"<div class="listing" style="border: 1px solid #ccc; padding: 10px; margin-bottom: 10px;">"#;

#[derive(Debug, Clone)]
pub struct DigestFormatter {
    subject_prefix: String,
    offset: FixedOffset,
    escape_html: bool,
}

impl DigestFormatter {
    pub fn new(subject_prefix: impl Into<String>, offset: FixedOffset, escape_html: bool) -> Self {
        Self {
            subject_prefix: subject_prefix.into(),
            offset,
            escape_html,
        }
    }

    // Builds the digest for `records`, keeping their order.
    pub fn format(&self, records: &[ListingRecord], generated_at: DateTime<Utc>) -> Digest {
        let generated_at = generated_at.with_timezone(&self.offset);
        let subject = format!("{} - {}", self.subject_prefix, format_timestamp(&generated_at));

        let html_body = records
            .iter()
            .map(|record| self.render_block(record))
            .collect::<String>();

        Digest {
            generated_at,
            subject,
            html_body,
        }
    }

    fn render_block(&self, record: &ListingRecord) -> String {
        format!(
            concat!(
                "{open}<h4>{title}</h4><h4>{posted}</h4><p>{kind}</p><p>{pay}</p>",
                "<a href=\"{url}\">View Job</a></div>"
            ),
            open = BLOCK_OPEN,
            title = self.field(&record.title),
            posted = self.field(&record.posted_meta),
            kind = self.field(&record.employment_type),
            pay = self.field(&record.compensation),
            url = self.field(&record.url),
        )
    }

    fn field(&self, value: &str) -> String {
        if self.escape_html {
            escape_html(value)
        } else {
            value.to_string()
        }
    }
}

// "2026-10-18 09:05 (UTC+08:00)": 24-hour clock, zero-padded
fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M (UTC%:z)").to_string()
}

// Escapes the five HTML-significant characters.
fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
