//! Decision support for school guidance teams.
//!
//! Reads teacher behavior reports, matches their notes against a keyword
//! lexicon, runs a fixed rule table and returns recommended interventions with
//! prescriptive plans. Dashboard summaries aggregate the same rules over a
//! whole report set.

pub mod config;
pub mod db;
pub mod error;
pub mod lexicon;
pub mod models;
pub mod plan;
pub mod report;
pub mod risk;
pub mod rules;

pub use lexicon::extract_keywords;
pub use report::analyze_all_reports;
pub use risk::calculate_confidence;
pub use rules::generate_recommendations;
