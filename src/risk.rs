use crate::models::{RiskLevel, Severity};

/// Reports for one student before they are treated as at risk.
pub const AT_RISK_REPORT_COUNT: usize = 5;
pub const CRITICAL_REPORT_COUNT: usize = 10;

const CONFIDENCE_PER_KEYWORD: usize = 15;
const MAX_KEYWORD_CONFIDENCE: usize = 85;

/// Confidence from keyword volume alone: 15 points per match, capped at 85.
pub fn calculate_confidence<S: AsRef<str>>(matched_keywords: &[S]) -> u8 {
    let confidence = matched_keywords
        .len()
        .saturating_mul(CONFIDENCE_PER_KEYWORD)
        .min(MAX_KEYWORD_CONFIDENCE);
    confidence as u8
}

pub fn risk_level(report_count: usize) -> Option<RiskLevel> {
    match report_count {
        count if count >= CRITICAL_REPORT_COUNT => Some(RiskLevel::Critical),
        count if count >= AT_RISK_REPORT_COUNT => Some(RiskLevel::High),
        _ => None,
    }
}

/// Numeric weight for averaging. Unrecognised severities carry no weight.
pub fn severity_weight(severity: &Severity) -> Option<f64> {
    match severity {
        Severity::Low => Some(1.0),
        Severity::Medium => Some(2.0),
        Severity::High => Some(3.0),
        Severity::Other(_) => None,
    }
}
