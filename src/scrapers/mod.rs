//! Opinion article scrapers.
//!
//! Scrapers drive a [`crate::browser::Browser`] rather than fetching pages
//! themselves, so the same code runs against a real WebDriver session or
//! against static HTML.
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | El País Opinión | [`elpais`] | Dated opinion pieces from the section front page |
//!
//! Field extraction goes through the ordered selector lists in [`extract`].

pub mod elpais;
pub mod extract;
