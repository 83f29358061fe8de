use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Severity a teacher assigned to a behavior report.
///
/// Only `Low`, `Medium` and `High` take part in rule evaluation and tallies.
/// Anything else is carried through verbatim so it can still be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Low,
    Medium,
    High,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Other(value) => value,
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Low" => Severity::Low,
            "Medium" => Severity::Medium,
            "High" => Severity::High,
            _ => Severity::Other(value),
        }
    }
}

impl From<&str> for Severity {
    fn from(value: &str) -> Self {
        Severity::from(value.to_string())
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report category. The known values drive rules; the set stays open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Academic,
    Conduct,
    Disruption,
    Attendance,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Academic => "Academic",
            Category::Conduct => "Conduct",
            Category::Disruption => "Disruption",
            Category::Attendance => "Attendance",
            Category::Other(value) => value,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Academic" => Category::Academic,
            "Conduct" => Category::Conduct,
            "Disruption" => Category::Disruption,
            "Attendance" => Category::Attendance,
            _ => Category::Other(value),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorReport {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub section_id: Option<i64>,
    #[serde(default)]
    pub section_name: Option<String>,
    pub teacher_id: Option<i64>,
    pub category: Option<Category>,
    pub severity: Option<Severity>,
    pub notes: Option<String>,
    pub report_date: Option<NaiveDate>,
}

impl BehaviorReport {
    pub fn display_name(&self) -> &str {
        if self.student_name.trim().is_empty() {
            "Student"
        } else {
            &self.student_name
        }
    }

    pub fn category_label(&self) -> &str {
        self.category.as_ref().map(Category::as_str).unwrap_or("General")
    }

    pub fn severity_label(&self) -> &str {
        self.severity.as_ref().map(Severity::as_str).unwrap_or("Medium")
    }

    pub fn is_severity(&self, severity: &Severity) -> bool {
        self.severity.as_ref() == Some(severity)
    }

    pub fn is_category(&self, category: &Category) -> bool {
        self.category.as_ref() == Some(category)
    }

    /// First `max_chars` characters of the notes, empty when there are none.
    pub fn notes_excerpt(&self, max_chars: usize) -> String {
        self.notes
            .as_deref()
            .map(|notes| notes.chars().take(max_chars).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationType {
    GroupIntervention,
    UrgentIntervention,
    IndividualPlan,
    ParentCommunication,
    AcademicSupport,
    BehavioralSupport,
    CounselingReferral,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::GroupIntervention => "GROUP_INTERVENTION",
            RecommendationType::UrgentIntervention => "URGENT_INTERVENTION",
            RecommendationType::IndividualPlan => "INDIVIDUAL_PLAN",
            RecommendationType::ParentCommunication => "PARENT_COMMUNICATION",
            RecommendationType::AcademicSupport => "ACADEMIC_SUPPORT",
            RecommendationType::BehavioralSupport => "BEHAVIORAL_SUPPORT",
            RecommendationType::CounselingReferral => "COUNSELING_REFERRAL",
        }
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Three-step scale used for both effort and expected impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Low,
    Medium,
    High,
}

/// Snapshot of the report that produced a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanContext {
    pub student_name: String,
    pub category: String,
    pub severity: String,
    pub report_date: Option<NaiveDate>,
    pub specific_issue: String,
    pub keywords: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptivePlan {
    pub owners: Vec<String>,
    pub timeframe: String,
    pub expected_impact: Level,
    pub risk_if_ignored: String,
    pub steps: Vec<String>,
    pub metrics: Vec<String>,
    pub review_after_days: u32,
    pub context: PlanContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub title: String,
    pub description: String,
    pub actions: Vec<String>,
    pub priority: Priority,
    pub effort: Level,
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    pub plan: PrescriptivePlan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    High,
    Critical,
}

/// A student with at least one report, as listed next to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedStudent {
    pub student_id: i64,
    pub student_name: String,
    pub section_id: Option<i64>,
    pub section_name: Option<String>,
    pub report_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskStudent {
    pub student_id: i64,
    pub student_name: String,
    pub report_count: usize,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityTrend {
    pub week_start: NaiveDate,
    pub report_count: usize,
    pub high_severity_count: usize,
    pub avg_severity: f64,
    pub student_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRiskProfile {
    pub student_name: String,
    pub report_count: usize,
    pub high_severity_count: usize,
    pub category_breakdown: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub count: usize,
    pub avg_severity: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalysis {
    pub total_reports: usize,
    pub high_severity_count: usize,
    pub medium_severity_count: usize,
    pub low_severity_count: usize,
    pub at_risk_students: Vec<AtRiskStudent>,
    pub category_breakdown: BTreeMap<String, usize>,
    pub severity_trends: Vec<SeverityTrend>,
    pub top_recommendations: Vec<Recommendation>,
    pub student_risk_profile: BTreeMap<i64, StudentRiskProfile>,
}

/// A report paired with the recommendations generated for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedReport {
    #[serde(flatten)]
    pub report: BehaviorReport,
    pub recommendations: Vec<Recommendation>,
    pub has_recommendations: bool,
}
