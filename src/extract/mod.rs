// src/extract/mod.rs
// =============================================================================
// This module pulls job listings out of the target results page.
//
// Submodules:
// - engine: the rendering-session seam and the plain-HTTP engine
// - chrome: headless Chromium engine (only with the "chrome" feature)
// - listing: parses the rendered DOM into ListingRecords
// - page: PageExtractor, one full attempt with guaranteed session teardown
// =============================================================================

mod engine;
mod listing;
mod page;

#[cfg(feature = "chrome")]
mod chrome;

pub use engine::{ExtractError, HttpEngine, RenderEngine};
pub use listing::ListingRecord;
pub use page::{ListingSource, PageExtractor};

#[cfg(feature = "chrome")]
pub use chrome::ChromeEngine;
