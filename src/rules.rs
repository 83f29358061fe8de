//! Rule table and recommendation generation for a single report.

use std::collections::HashSet;

use tracing::debug;

use crate::lexicon::{self, LexiconCategory};
use crate::models::{
    BehaviorReport, Category, Level, Priority, Recommendation, RecommendationType, Severity,
};
use crate::plan;
use crate::risk;

pub const FREQUENT_REPORT_THRESHOLD: usize = 5;
pub const GROUP_PATTERN_THRESHOLD: usize = 3;

/// How a rule arrives at its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceRule {
    Fixed(u8),
    /// Keyword confidence, never lower than the floor.
    Floor(u8),
}

impl ConfidenceRule {
    pub fn resolve(self, keyword_confidence: u8) -> u8 {
        match self {
            ConfidenceRule::Fixed(value) => value,
            ConfidenceRule::Floor(floor) => keyword_confidence.max(floor),
        }
    }
}

/// Which keywords a recommendation reports as its evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordSource {
    None,
    Fixed(&'static [&'static str]),
    Matched(LexiconCategory),
}

/// Everything a rule predicate or template may look at.
pub struct RuleInput<'a> {
    pub report: &'a BehaviorReport,
    pub all_reports: &'a [BehaviorReport],
    pub keywords: &'a [&'static str],
}

impl RuleInput<'_> {
    pub fn student_report_count(&self) -> usize {
        self.all_reports
            .iter()
            .filter(|other| other.student_id == self.report.student_id)
            .count()
    }

    pub fn category_report_count(&self) -> usize {
        self.all_reports
            .iter()
            .filter(|other| other.category == self.report.category)
            .count()
    }

    fn mentions(&self, category: LexiconCategory) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lexicon::is_in_category(keyword, category))
    }
}

pub struct Rule {
    pub name: &'static str,
    pub kind: RecommendationType,
    pub confidence: ConfidenceRule,
    pub keywords: KeywordSource,
    pub priority: Priority,
    pub effort: Level,
    trigger: fn(&RuleInput<'_>) -> bool,
}

impl Rule {
    pub fn applies(&self, input: &RuleInput<'_>) -> bool {
        (self.trigger)(input)
    }
}

/// Rules in evaluation order.
pub static RULES: &[Rule] = &[
    Rule {
        name: "High Severity Alert",
        kind: RecommendationType::UrgentIntervention,
        confidence: ConfidenceRule::Fixed(95),
        keywords: KeywordSource::None,
        priority: Priority::Critical,
        effort: Level::High,
        trigger: |input| input.report.is_severity(&Severity::High),
    },
    Rule {
        name: "Frequent Reporter Pattern",
        kind: RecommendationType::IndividualPlan,
        confidence: ConfidenceRule::Fixed(92),
        keywords: KeywordSource::None,
        priority: Priority::Critical,
        effort: Level::High,
        trigger: |input| input.student_report_count() >= FREQUENT_REPORT_THRESHOLD,
    },
    Rule {
        name: "Multiple Students - Same Issue",
        kind: RecommendationType::GroupIntervention,
        confidence: ConfidenceRule::Fixed(88),
        keywords: KeywordSource::None,
        priority: Priority::High,
        effort: Level::Medium,
        trigger: |input| input.category_report_count() >= GROUP_PATTERN_THRESHOLD,
    },
    Rule {
        name: "Attendance Concern",
        kind: RecommendationType::ParentCommunication,
        confidence: ConfidenceRule::Fixed(90),
        keywords: KeywordSource::Fixed(&["absent", "late", "attendance"]),
        priority: Priority::Medium,
        effort: Level::Low,
        trigger: |input| {
            input.report.is_category(&Category::Attendance)
                || input.mentions(LexiconCategory::Attendance)
        },
    },
    Rule {
        name: "Academic Intervention",
        kind: RecommendationType::AcademicSupport,
        confidence: ConfidenceRule::Floor(75),
        keywords: KeywordSource::Matched(LexiconCategory::Academic),
        priority: Priority::High,
        effort: Level::Medium,
        trigger: |input| {
            input.report.is_category(&Category::Academic)
                || input.mentions(LexiconCategory::Academic)
        },
    },
    Rule {
        name: "Behavioral Support",
        kind: RecommendationType::BehavioralSupport,
        confidence: ConfidenceRule::Floor(80),
        keywords: KeywordSource::Matched(LexiconCategory::Behavioral),
        priority: Priority::High,
        effort: Level::Medium,
        trigger: |input| {
            input.report.is_category(&Category::Disruption)
                || input.report.is_category(&Category::Conduct)
                || input.mentions(LexiconCategory::Behavioral)
        },
    },
    Rule {
        name: "Social-Emotional Support",
        kind: RecommendationType::CounselingReferral,
        confidence: ConfidenceRule::Floor(78),
        keywords: KeywordSource::Matched(LexiconCategory::Social),
        priority: Priority::Medium,
        effort: Level::Medium,
        trigger: |input| input.mentions(LexiconCategory::Social),
    },
];

struct Template {
    title: String,
    description: String,
    actions: &'static [&'static str],
}

fn template(kind: RecommendationType, input: &RuleInput<'_>) -> Template {
    let category = input.report.category_label();
    match kind {
        RecommendationType::UrgentIntervention => Template {
            title: format!("URGENT: {category} - High Severity"),
            description: "High severity report requires immediate attention and parent communication"
                .to_string(),
            actions: &[
                "Schedule parent meeting within 48 hours",
                "Create intervention plan",
                "Assign support staff",
                "Daily check-ins",
            ],
        },
        RecommendationType::IndividualPlan => Template {
            title: format!("At-Risk Student: {}", input.report.display_name()),
            description: format!(
                "{} reports indicate ongoing concerns - comprehensive support needed",
                input.student_report_count()
            ),
            actions: &[
                "Create Behavior Improvement Plan (BIP)",
                "Counselor referral",
                "Parent partnership meeting",
                "Daily progress monitoring",
                "Consider assessment for support services",
            ],
        },
        RecommendationType::GroupIntervention => Template {
            title: format!("{category} Workshop Program"),
            description: format!(
                "{} students showing {category} issues - recommend group intervention",
                input.category_report_count()
            ),
            actions: &[
                "Schedule group workshop/intervention",
                "Create action plan template",
                "Track progress weekly",
            ],
        },
        RecommendationType::ParentCommunication => Template {
            title: "Attendance Issue Detected".to_string(),
            description: "Student showing attendance/punctuality concerns".to_string(),
            actions: &[
                "Contact parents about attendance policy",
                "Discuss barriers to attendance",
                "Create attendance contract",
                "Monitor daily attendance",
            ],
        },
        RecommendationType::AcademicSupport => Template {
            title: "Academic Support Needed".to_string(),
            description: "Student shows academic struggle - tutoring or intervention recommended"
                .to_string(),
            actions: &[
                "Recommend tutoring program",
                "Assess learning needs",
                "Differentiate instruction",
                "Weekly progress checks",
            ],
        },
        RecommendationType::BehavioralSupport => Template {
            title: "Behavioral Intervention Recommended".to_string(),
            description: "Student behavior requires structured support".to_string(),
            actions: &[
                "Implement positive reinforcement plan",
                "Clear behavior expectations",
                "Classroom management strategy",
                "Check-in with student daily",
            ],
        },
        RecommendationType::CounselingReferral => Template {
            title: "Social-Emotional Support Recommended".to_string(),
            description: "Student may benefit from counseling or emotional support".to_string(),
            actions: &[
                "Refer to school counselor",
                "Monitor emotional well-being",
                "Create safe peer group",
                "Provide coping strategies",
            ],
        },
    }
}

/// A rule hit before deduplication and plan enrichment.
struct Candidate {
    rule: &'static Rule,
    confidence: u8,
}

/// Evaluate every rule against `report` and return one recommendation per
/// type, highest confidence first, each carrying its prescriptive plan.
pub fn generate_recommendations(
    report: &BehaviorReport,
    all_reports: &[BehaviorReport],
) -> Vec<Recommendation> {
    let keywords = lexicon::extract_keywords(report.notes.as_deref());
    let keyword_confidence = risk::calculate_confidence(&keywords);
    let input = RuleInput {
        report,
        all_reports,
        keywords: &keywords,
    };

    let mut candidates: Vec<Candidate> = RULES
        .iter()
        .filter(|rule| rule.applies(&input))
        .map(|rule| Candidate {
            rule,
            confidence: rule.confidence.resolve(keyword_confidence),
        })
        .collect();

    // Stable sort keeps rule order among equal confidences.
    candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    let mut seen = HashSet::new();
    let recommendations: Vec<Recommendation> = candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.rule.kind))
        .map(|candidate| build_recommendation(candidate, &input))
        .collect();

    debug!(
        report_id = report.id,
        student_id = report.student_id,
        keywords = keywords.len(),
        recommendations = recommendations.len(),
        "evaluated behavior report"
    );

    recommendations
}

fn build_recommendation(candidate: Candidate, input: &RuleInput<'_>) -> Recommendation {
    let rule = candidate.rule;
    let template = template(rule.kind, input);
    let keywords = match rule.keywords {
        KeywordSource::None => None,
        KeywordSource::Fixed(words) => Some(words.iter().map(|word| word.to_string()).collect()),
        KeywordSource::Matched(category) => Some(
            lexicon::filter_category(input.keywords, category)
                .into_iter()
                .map(str::to_string)
                .collect(),
        ),
    };

    Recommendation {
        kind: rule.kind,
        title: template.title,
        description: template.description,
        actions: template.actions.iter().map(|action| action.to_string()).collect(),
        priority: rule.priority,
        effort: rule.effort,
        confidence: candidate.confidence,
        keywords,
        plan: plan::build_plan(rule.kind, input.report, input.all_reports),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn report(
        id: i64,
        student_id: i64,
        name: &str,
        category: &str,
        severity: &str,
        notes: &str,
    ) -> BehaviorReport {
        BehaviorReport {
            id,
            student_id,
            student_name: name.to_string(),
            section_id: Some(1),
            section_name: None,
            teacher_id: Some(1),
            category: Some(Category::from(category)),
            severity: Some(Severity::from(severity)),
            notes: Some(notes.to_string()),
            report_date: None,
        }
    }

    fn kinds(recommendations: &[Recommendation]) -> Vec<RecommendationType> {
        recommendations.iter().map(|rec| rec.kind).collect()
    }

    fn find(
        recommendations: &[Recommendation],
        kind: RecommendationType,
    ) -> Option<&Recommendation> {
        recommendations.iter().find(|rec| rec.kind == kind)
    }

    #[test]
    fn high_severity_always_triggers_urgent_intervention() {
        for category in ["Academic", "Conduct", "Field Trip"] {
            let high = report(1, 1, "Ana", category, "High", "");
            let recs = generate_recommendations(&high, &[high.clone()]);
            let urgent = find(&recs, RecommendationType::UrgentIntervention)
                .expect("urgent intervention");
            assert_eq!(urgent.confidence, 95);
            assert_eq!(urgent.priority, Priority::Critical);
            assert!(urgent.keywords.is_none());
            assert_eq!(recs[0].kind, RecommendationType::UrgentIntervention);
        }
    }

    #[test]
    fn duplicate_rule_hits_collapse_to_one_per_type() {
        let academic = report(1, 1, "Ana", "Academic", "Medium", "Needs help with math and reading");
        let recs = generate_recommendations(&academic, &[academic.clone()]);
        let academic_count = recs
            .iter()
            .filter(|rec| rec.kind == RecommendationType::AcademicSupport)
            .count();
        assert_eq!(academic_count, 1);

        let mut unique = kinds(&recs);
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), recs.len());
    }

    #[test]
    fn frequent_reporter_needs_five_reports() {
        let reports: Vec<BehaviorReport> = (0..5)
            .map(|id| report(id, 42, "Pedro", &format!("Other {id}"), "Low", ""))
            .collect();
        let recs = generate_recommendations(&reports[0], &reports);
        let plan = find(&recs, RecommendationType::IndividualPlan).expect("individual plan");
        assert_eq!(plan.confidence, 92);
        assert_eq!(plan.title, "At-Risk Student: Pedro");

        let recs = generate_recommendations(&reports[0], &reports[..4]);
        assert!(find(&recs, RecommendationType::IndividualPlan).is_none());
    }

    #[test]
    fn group_pattern_needs_three_reports_in_category() {
        let reports = vec![
            report(1, 1, "Ana", "Academic", "Low", ""),
            report(2, 2, "Ben", "Academic", "Low", ""),
            report(3, 3, "Cy", "Academic", "Low", ""),
        ];
        for current in &reports {
            let recs = generate_recommendations(current, &reports);
            let group = find(&recs, RecommendationType::GroupIntervention).expect("group");
            assert_eq!(group.confidence, 88);
            assert_eq!(group.title, "Academic Workshop Program");
        }

        let recs = generate_recommendations(&reports[0], &reports[..2]);
        assert!(find(&recs, RecommendationType::GroupIntervention).is_none());
    }

    #[test]
    fn attendance_detected_from_category_or_keywords() {
        let by_category = report(1, 1, "Ana", "Attendance", "Low", "");
        let recs = generate_recommendations(&by_category, &[]);
        let parent = find(&recs, RecommendationType::ParentCommunication).expect("parent");
        assert_eq!(parent.confidence, 90);
        assert_eq!(
            parent.keywords.as_deref(),
            Some(&["absent".to_string(), "late".to_string(), "attendance".to_string()][..])
        );

        let by_keyword = report(2, 2, "Ben", "Other", "Low", "Arrived tardy twice");
        let recs = generate_recommendations(&by_keyword, &[]);
        assert!(find(&recs, RecommendationType::ParentCommunication).is_some());
    }

    #[test]
    fn keyword_confidence_raises_but_never_lowers_floor() {
        let weak = report(1, 1, "Ana", "Conduct", "Low", "");
        let recs = generate_recommendations(&weak, &[]);
        let behavioral = find(&recs, RecommendationType::BehavioralSupport).expect("behavioral");
        assert_eq!(behavioral.confidence, 80);
        assert_eq!(behavioral.keywords.as_deref(), Some(&[][..]));

        // hit, push, fight, aggressive, violent, threat
        let strong = report(
            2,
            2,
            "Ben",
            "Other",
            "Low",
            "He would hit, push, fight; aggressive and violent, made a threat",
        );
        let recs = generate_recommendations(&strong, &[]);
        let behavioral = find(&recs, RecommendationType::BehavioralSupport).expect("behavioral");
        assert_eq!(behavioral.confidence, 85);
        assert_eq!(behavioral.keywords.as_ref().map(Vec::len), Some(6));
    }

    #[test]
    fn social_keywords_trigger_counseling_referral() {
        let quiet = report(1, 1, "Ana", "Other", "Low", "Very quiet and withdrawn lately");
        let recs = generate_recommendations(&quiet, &[]);
        let referral = find(&recs, RecommendationType::CounselingReferral).expect("referral");
        assert_eq!(referral.confidence, 78);
        assert_eq!(
            referral.keywords.as_deref(),
            Some(&["quiet".to_string(), "withdrawn".to_string()][..])
        );
    }

    #[test]
    fn output_is_sorted_by_confidence() {
        let reports: Vec<BehaviorReport> = (0..5)
            .map(|id| report(id, 7, "Cy", "Attendance", "High", "Absent and upset"))
            .collect();
        let recs = generate_recommendations(&reports[0], &reports);
        assert_eq!(
            kinds(&recs),
            vec![
                RecommendationType::UrgentIntervention,
                RecommendationType::IndividualPlan,
                RecommendationType::ParentCommunication,
                RecommendationType::GroupIntervention,
                RecommendationType::CounselingReferral,
            ]
        );
        assert!(recs.windows(2).all(|pair| pair[0].confidence >= pair[1].confidence));
    }

    #[test]
    fn missing_fields_do_not_fail() {
        let bare = BehaviorReport {
            id: 9,
            student_id: 9,
            student_name: String::new(),
            section_id: None,
            section_name: None,
            teacher_id: None,
            category: None,
            severity: None,
            notes: None,
            report_date: None,
        };
        assert!(generate_recommendations(&bare, &[]).is_empty());

        let recs = generate_recommendations(&bare, &[bare.clone(), bare.clone(), bare.clone()]);
        let group = find(&recs, RecommendationType::GroupIntervention).expect("group");
        assert_eq!(group.title, "General Workshop Program");
        assert_eq!(group.plan.context.student_name, "Student");
    }

    #[test]
    fn reading_scenario_yields_group_and_academic_support() {
        let reports = vec![
            report(
                1,
                1,
                "Maria",
                "Academic",
                "Medium",
                "Maria struggles to understand what she reads. She can decode words but doesn't get the meaning. Needs to reread passages multiple times.",
            ),
            report(
                2,
                2,
                "Carlos",
                "Academic",
                "Medium",
                "Carlos has difficulty with reading comprehension. Cannot explain what he just read.",
            ),
            report(
                3,
                3,
                "Jose",
                "Academic",
                "Low",
                "Reading skills need improvement; falls behind classmates.",
            ),
        ];

        for current in &reports {
            let recs = generate_recommendations(current, &reports);
            let group = find(&recs, RecommendationType::GroupIntervention).expect("group");
            assert_eq!(group.confidence, 88);
            let academic = find(&recs, RecommendationType::AcademicSupport).expect("academic");
            assert!(academic.confidence >= 75);
        }

        let recs = generate_recommendations(&reports[0], &reports);
        let academic = find(&recs, RecommendationType::AcademicSupport).expect("academic");
        let issue = &academic.plan.context.specific_issue;
        assert!(issue.contains("struggles to understand"));
        assert!(issue.chars().count() <= 100);
    }

    #[test]
    fn serialized_recommendations_match_dashboard_shape() {
        let notes = "Struggles with math; often late and sad";
        let reports: Vec<BehaviorReport> = (1..=5)
            .map(|id| report(id, 42, "Cruz, Pedro", "Academic", "High", notes))
            .collect();

        let json = serde_json::to_value(generate_recommendations(&reports[0], &reports))
            .expect("serialize");
        let items = json.as_array().expect("array");

        let shape: Vec<(&str, u64)> = items
            .iter()
            .map(|item| {
                (
                    item["type"].as_str().expect("type"),
                    item["confidence"].as_u64().expect("confidence"),
                )
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                ("URGENT_INTERVENTION", 95),
                ("INDIVIDUAL_PLAN", 92),
                ("PARENT_COMMUNICATION", 90),
                ("GROUP_INTERVENTION", 88),
                ("COUNSELING_REFERRAL", 78),
                ("ACADEMIC_SUPPORT", 75),
            ]
        );

        for item in &items[..2] {
            assert!(item.get("keywords").is_none());
        }
        assert!(items[3].get("keywords").is_none());
        assert_eq!(
            items[2]["keywords"],
            serde_json::json!(["absent", "late", "attendance"])
        );
        assert_eq!(items[4]["keywords"], serde_json::json!(["sad"]));
        assert_eq!(items[5]["keywords"], serde_json::json!(["math"]));

        let urgent = &items[0];
        assert_eq!(urgent["priority"], "CRITICAL");
        assert_eq!(urgent["effort"], "HIGH");
        assert!(urgent["actions"].as_array().is_some_and(|actions| !actions.is_empty()));

        let plan = &urgent["plan"];
        for key in ["owners", "timeframe", "expectedImpact", "riskIfIgnored", "steps", "metrics"] {
            assert!(plan.get(key).is_some(), "plan is missing {key}");
        }
        assert!(plan["reviewAfterDays"].is_u64());
        assert_eq!(plan["context"]["studentName"], "Cruz, Pedro");
        assert_eq!(plan["context"]["specificIssue"], notes);
        assert_eq!(plan["context"]["keywords"], "math, late, sad");
        assert!(plan["context"]["reportDate"].is_null());
    }
}
