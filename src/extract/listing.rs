// src/extract/listing.rs
// =============================================================================
// This module turns a rendered results page into ListingRecords.
//
// The target site marks up every posting like this (simplified):
//
//   <div class="latest-job-post">
//     <a href="/jobseekers/job/123">
//       <h4 data-original-title="...">Rust Developer</h4>
//       <span class="badge">Full Time</span>
//       <p data-temp="...">Posted on Oct 18, 2026</p>
//       <dd class="col">$1,500/month</dd>
//     </a>
//   </div>
//
// These selectors are the only "wire format" we have with the site. If the
// site restructures its markup, extraction returns nothing useful.
//
// Policy for incomplete postings: a container that lacks any of the five
// sub-elements is skipped (and logged); the rest of the page still counts.
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

// The selectors are constants, so parsing them can only fail if we typo one.
// A failing test catches that before anything ships.
static CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector(".latest-job-post"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h4[data-original-title]"));
static EMPLOYMENT_TYPE: LazyLock<Selector> = LazyLock::new(|| selector("span.badge"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static COMPENSATION: LazyLock<Selector> = LazyLock::new(|| selector("dd.col"));
static POSTED_META: LazyLock<Selector> = LazyLock::new(|| selector("p[data-temp]"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("listing selectors are static and valid")
}

/// One job posting as it appeared on the results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRecord {
    pub title: String,
    pub employment_type: String,
    /// Always absolute
    pub url: String,
    pub compensation: String,
    pub posted_meta: String,
}

/// Why a single container could not become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Title,
    EmploymentType,
    Url,
    Compensation,
    PostedMeta,
}

impl MissingField {
    fn as_str(self) -> &'static str {
        match self {
            MissingField::Title => "title",
            MissingField::EmploymentType => "employment type",
            MissingField::Url => "url",
            MissingField::Compensation => "compensation",
            MissingField::PostedMeta => "posted meta",
        }
    }
}

/// Result of parsing one page: the good records plus how many were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedListings {
    pub records: Vec<ListingRecord>,
    pub skipped: usize,
}

// Parses all listing containers on a page, in DOM order.
//
// Parameters:
//   html: the rendered DOM
//   page_url: the page's own URL, for resolving relative links
//
// A page with no containers at all yields an empty result - that is a
// legitimate "no postings right now", not an error.
pub fn parse_listings(html: &str, page_url: &Url) -> ParsedListings {
    let document = Html::parse_document(html);
    let mut parsed = ParsedListings::default();

    for (position, container) in document.select(&CONTAINER).enumerate() {
        match parse_container(container, page_url) {
            Ok(record) => parsed.records.push(record),
            Err(missing) => {
                tracing::warn!(
                    position,
                    "skipping listing without {}",
                    missing.as_str()
                );
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

fn parse_container(
    container: ElementRef<'_>,
    page_url: &Url,
) -> Result<ListingRecord, MissingField> {
    let title = text_of(container, &TITLE)
        .filter(|title| !title.is_empty())
        .ok_or(MissingField::Title)?;
    let employment_type = text_of(container, &EMPLOYMENT_TYPE).ok_or(MissingField::EmploymentType)?;
    let url = container
        .select(&LINK)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| resolve_url(page_url, href))
        .ok_or(MissingField::Url)?;
    let compensation = text_of(container, &COMPENSATION).ok_or(MissingField::Compensation)?;
    let posted_meta = text_of(container, &POSTED_META).ok_or(MissingField::PostedMeta)?;

    Ok(ListingRecord {
        title,
        employment_type,
        url,
        compensation,
        posted_meta,
    })
}

// Text of the first element matching `selector`, roughly what a browser's
// innerText gives: all text nodes, runs of whitespace collapsed to one space.
fn text_of(container: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let element = container.select(selector).next()?;
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    Some(text)
}

// Resolves a possibly-relative href against the page URL.
//
// Only http(s) results are accepted; a "javascript:" or "mailto:" link is
// not a link to a posting.
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let resolved = base.join(href.trim()).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}
