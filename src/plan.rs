//! Prescriptive plans: who acts, for how long, doing what, measured how.
//!
//! Each recommendation type has its own builder. Builders scale owners,
//! timeframe and targets from the report's severity and the student's history
//! in the full report set.

use crate::lexicon;
use crate::models::{
    BehaviorReport, Category, Level, PlanContext, PrescriptivePlan, RecommendationType, Severity,
};

const REPEAT_OFFENDER_REPORTS: usize = 3;
const WIDESPREAD_PATTERN_REPORTS: usize = 5;
const CONTEXT_ISSUE_CHARS: usize = 100;

/// Report plus the derived history every builder draws on.
pub struct PlanInput<'a> {
    pub report: &'a BehaviorReport,
    pub all_reports: &'a [BehaviorReport],
    pub keywords: Vec<&'static str>,
    pub student_report_count: usize,
    pub is_repeat_offender: bool,
    pub has_high_severity_history: bool,
}

impl<'a> PlanInput<'a> {
    pub fn new(report: &'a BehaviorReport, all_reports: &'a [BehaviorReport]) -> Self {
        let keywords = lexicon::extract_keywords(report.notes.as_deref());
        let history: Vec<&BehaviorReport> = all_reports
            .iter()
            .filter(|other| other.student_id == report.student_id)
            .collect();
        let student_report_count = history.len();

        Self {
            report,
            all_reports,
            keywords,
            student_report_count,
            is_repeat_offender: student_report_count >= REPEAT_OFFENDER_REPORTS,
            has_high_severity_history: history
                .iter()
                .any(|other| other.is_severity(&Severity::High)),
        }
    }

    fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|candidate| *candidate == keyword)
    }

    fn first_keyword_of(&self, candidates: &[&str]) -> Option<&'static str> {
        self.keywords
            .iter()
            .copied()
            .find(|keyword| candidates.contains(keyword))
    }

    fn any_keyword_of(&self, candidates: &[&str]) -> bool {
        self.keywords.iter().any(|keyword| candidates.contains(keyword))
    }

    fn is_high(&self) -> bool {
        self.report.is_severity(&Severity::High)
    }

    fn name(&self) -> &str {
        self.report.display_name()
    }

    fn category(&self) -> &str {
        self.report.category_label()
    }

    fn excerpt(&self, max_chars: usize) -> String {
        self.report.notes_excerpt(max_chars)
    }

    fn context(&self) -> PlanContext {
        let report = self.report;
        PlanContext {
            student_name: self.name().to_string(),
            category: self.category().to_string(),
            severity: report.severity_label().to_string(),
            report_date: report.report_date,
            specific_issue: match report.notes.as_deref() {
                Some(notes) if !notes.is_empty() => report.notes_excerpt(CONTEXT_ISSUE_CHARS),
                _ => "Behavior concern".to_string(),
            },
            keywords: if self.keywords.is_empty() {
                "None detected".to_string()
            } else {
                self.keywords.join(", ")
            },
        }
    }
}

pub type PlanBuilder = fn(&PlanInput<'_>) -> PrescriptivePlan;

/// Builder for a recommendation type. Parent communication is the general
/// fallback plan.
pub fn builder_for(kind: RecommendationType) -> PlanBuilder {
    match kind {
        RecommendationType::UrgentIntervention => urgent_intervention,
        RecommendationType::IndividualPlan => individual_plan,
        RecommendationType::GroupIntervention => group_intervention,
        RecommendationType::AcademicSupport => academic_support,
        RecommendationType::BehavioralSupport => behavioral_support,
        RecommendationType::CounselingReferral => counseling_referral,
        RecommendationType::ParentCommunication => parent_communication,
    }
}

pub fn build_plan(
    kind: RecommendationType,
    report: &BehaviorReport,
    all_reports: &[BehaviorReport],
) -> PrescriptivePlan {
    let input = PlanInput::new(report, all_reports);
    builder_for(kind)(&input)
}

fn owners<const N: usize>(roles: [Option<&str>; N]) -> Vec<String> {
    let mut owners: Vec<String> = Vec::with_capacity(N);
    for role in roles.into_iter().flatten() {
        if !owners.iter().any(|existing| existing == role) {
            owners.push(role.to_string());
        }
    }
    owners
}

fn pick<'s>(condition: bool, when_true: &'s str, when_false: &'s str) -> &'s str {
    if condition { when_true } else { when_false }
}

fn urgent_intervention(input: &PlanInput<'_>) -> PrescriptivePlan {
    let report = input.report;
    let escalated = input.has_high_severity_history;

    PrescriptivePlan {
        owners: owners([
            Some("Guidance Counselor"),
            Some("Adviser"),
            Some("Parent/Guardian"),
            Some("School Administrator"),
        ]),
        timeframe: format!(
            "Immediate (48 hours) + {} weeks intensive monitoring",
            pick(escalated, "6", "4")
        ),
        expected_impact: Level::High,
        risk_if_ignored: format!(
            "Critical: Potential for {}; {}",
            pick(
                report.is_category(&Category::Conduct),
                "suspension or expulsion",
                "safety incident"
            ),
            pick(escalated, "pattern escalation", "behavioral crisis")
        ),
        steps: vec![
            format!(
                "Immediate alert to principal about {}'s {} incident",
                input.name(),
                input.category().to_lowercase()
            ),
            format!(
                "Parent meeting scheduled within 24-48 hours ({})",
                pick(escalated, "REQUIRED in-person", "phone or in-person")
            ),
            format!(
                "Create Crisis Response Plan addressing: \"{}...\"",
                input.excerpt(80)
            ),
            "Assign dedicated adult mentor for daily check-ins (morning + after incident-prone periods)"
                .to_string(),
            pick(
                input.is_repeat_offender,
                "Consider short-term behavior contract with clear consequences",
                "Establish behavior expectations and early warning signs",
            )
            .to_string(),
            "Document all interactions and progress in student file (legal protection)".to_string(),
        ],
        metrics: vec![
            format!(
                "Zero {} incidents of \"{}\" within 2 weeks",
                report.severity_label(),
                input.category()
            ),
            "Parent communication documented at least 2x per week".to_string(),
            format!(
                "{} completes daily check-in log with 90%+ compliance",
                input.name()
            ),
            pick(
                escalated,
                "Behavioral assessment completed by week 3",
                "Trend analysis shows improvement by week 2",
            )
            .to_string(),
        ],
        review_after_days: if escalated { 5 } else { 7 },
        context: input.context(),
    }
}

fn individual_plan(input: &PlanInput<'_>) -> PrescriptivePlan {
    let report = input.report;
    let count = input.student_report_count;
    let chronic = count >= WIDESPREAD_PATTERN_REPORTS;
    let academic = report.is_category(&Category::Academic);

    let support_step = if academic {
        let subject = if input.has_keyword("math") {
            "math"
        } else if input.has_keyword("reading") {
            "reading"
        } else {
            "struggling subjects"
        };
        format!("Assign subject tutor + modified assignments for {subject}")
    } else {
        "Implement token economy with daily point tracking and weekly reward".to_string()
    };

    let first_metric = if academic {
        format!(
            "{}'s grades improve by at least 1 letter grade by week 6",
            input.name()
        )
    } else {
        format!("Incident rate drops from {count} reports to ≤2 by week 8")
    };

    PrescriptivePlan {
        owners: owners([
            Some("Guidance Counselor"),
            Some("Adviser"),
            Some("Parent/Guardian"),
        ]),
        timeframe: format!(
            "{} weeks with reviews every {} weeks",
            pick(chronic, "8-10", "6-8"),
            pick(chronic, "2", "3")
        ),
        expected_impact: Level::High,
        risk_if_ignored: format!(
            "Chronic pattern solidifies; {} likely",
            pick(academic, "grade retention risk", "escalation to suspension")
        ),
        steps: vec![
            format!(
                "Conduct root cause analysis for {}'s {} issues (past {count} reports reviewed)",
                input.name(),
                input.category().to_lowercase()
            ),
            format!(
                "Create personalized {} targeting: \"{}...\"",
                pick(
                    academic,
                    "Academic Success Plan (ASP)",
                    "Behavior Improvement Plan (BIP)"
                ),
                input.excerpt(70)
            ),
            support_step,
            format!(
                "Schedule {} check-in sessions (counselor + adviser rotation)",
                pick(chronic, "twice-weekly", "weekly")
            ),
            "Parent progress reports every Friday via SMS/email with specific data".to_string(),
            pick(
                input.is_repeat_offender,
                "Develop \"trigger management\" plan with student input",
                "Teach replacement behaviors with role-play practice",
            )
            .to_string(),
        ],
        metrics: vec![
            first_metric,
            "≥ 70% of daily goals met in week 3; ≥ 85% by week 6".to_string(),
            pick(
                input.is_repeat_offender,
                "Parent engagement in 4+ touchpoints",
                "Parent meeting attendance 100%",
            )
            .to_string(),
        ],
        review_after_days: 21,
        context: input.context(),
    }
}

fn group_intervention(input: &PlanInput<'_>) -> PrescriptivePlan {
    let report = input.report;
    let affected_count = input
        .all_reports
        .iter()
        .filter(|other| other.category == report.category)
        .count();
    let widespread = affected_count >= WIDESPREAD_PATTERN_REPORTS;
    let category = input.category();

    let focus = if report.is_category(&Category::Attendance) {
        "time management, morning routines"
    } else if report.is_category(&Category::Academic) {
        "study skills, test-taking"
    } else {
        "self-regulation, peer conflict"
    };

    PrescriptivePlan {
        owners: owners([
            Some("Guidance Team"),
            Some("Grade Level Chair"),
            Some("Class Advisers"),
        ]),
        timeframe: format!(
            "{} weeks, {}",
            pick(widespread, "6", "4"),
            pick(widespread, "2 sessions per week", "1 session per week")
        ),
        expected_impact: if widespread { Level::High } else { Level::Medium },
        risk_if_ignored: format!(
            "{}; classroom disruption continues",
            pick(widespread, "School-wide climate issue", "Pattern spreads to peers")
        ),
        steps: vec![
            format!(
                "SCOPE: {affected_count} students showing {} concerns - group intervention required",
                category.to_lowercase()
            ),
            format!(
                "Design {} workshop targeting \"{category}\" (e.g., {focus})",
                pick(widespread, "6-session intensive", "4-session")
            ),
            "Coordinate with teachers to reinforce skills during regular class time".to_string(),
            "Provide parent info session or handouts on supporting the skill at home".to_string(),
            pick(
                widespread,
                "Conduct classroom-wide culture check and adjust environment/systems",
                "Monitor non-participants for emerging similar issues",
            )
            .to_string(),
        ],
        metrics: vec![
            format!(
                "Workshop attendance: ≥{}% of {affected_count} targeted students",
                pick(widespread, "85", "75")
            ),
            format!(
                "{category} incidents reduced by ≥40% across the group by week {}",
                pick(widespread, "6", "4")
            ),
            "Teacher ratings: Classroom climate improves by ≥1 level on post-survey".to_string(),
        ],
        review_after_days: if widespread { 21 } else { 28 },
        context: input.context(),
    }
}

fn academic_support(input: &PlanInput<'_>) -> PrescriptivePlan {
    let report = input.report;
    let high = input.is_high();
    let subject = input
        .first_keyword_of(&["math", "reading", "writing", "science"])
        .unwrap_or("this subject");
    let multiplier = if high {
        1.5
    } else if report.is_severity(&Severity::Low) {
        0.7
    } else {
        1.0
    };
    let short_weeks = (4.0_f64 * multiplier).round() as u32;
    let long_weeks = (6.0_f64 * multiplier).round() as u32;
    let name = input.name();

    PrescriptivePlan {
        owners: owners([
            Some("Subject Teacher"),
            Some("Adviser"),
            high.then_some("Academic Coordinator"),
        ]),
        timeframe: format!(
            "{short_weeks}-{long_weeks} weeks with {} checks",
            pick(high, "twice-weekly", "weekly")
        ),
        expected_impact: if high { Level::High } else { Level::Medium },
        risk_if_ignored: format!(
            "{}; confidence erosion in {subject}",
            pick(high, "Failing grade IMMINENT; retention risk", "Academic gaps widen")
        ),
        steps: vec![
            format!(
                "Diagnostic assessment: Identify {name}'s exact gaps in {subject} (issue: \"{}...\")",
                input.excerpt(50)
            ),
            if high {
                "URGENT: Intensive tutoring (3x/week minimum) + modified grading for catch-up period"
                    .to_string()
            } else {
                format!("Enroll in after-school tutoring or peer support for {subject} (2x/week)")
            },
            format!(
                "Scaffolding: {}",
                pick(
                    high,
                    "Break assignments into daily mini-tasks; provide answer banks",
                    "Provide study guides + extended time on assessments"
                )
            ),
            if input.has_keyword("homework") {
                format!("Homework accountability: {name} checks off completed work with teacher daily")
            } else {
                "Weekly progress check-ins with subject teacher".to_string()
            },
            format!(
                "Parent communication: {}",
                pick(
                    high,
                    "Twice-weekly progress updates",
                    "Bi-weekly summary of improvements"
                )
            ),
        ],
        metrics: vec![
            if high {
                format!("{name} achieves passing grade (≥75%) in {subject} by week {long_weeks}")
            } else {
                format!("Quiz/test scores in {subject} improve by ≥15 points within 4 weeks")
            },
            format!(
                "Homework completion rate: ≥{}% for {name}",
                pick(high, "90", "80")
            ),
            format!("Self-report survey: {name} rates confidence in {subject} as \"improved\" by end"),
        ],
        review_after_days: if high { 14 } else { 21 },
        context: input.context(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn behavioral_support(input: &PlanInput<'_>) -> PrescriptivePlan {
    let behavior = input
        .first_keyword_of(&["disrupt", "aggressive", "defiant", "bully"])
        .unwrap_or("behavior");
    let aggressive = input.any_keyword_of(&["hit", "fight", "aggressive", "violent"]);
    let name = input.name();

    PrescriptivePlan {
        owners: owners([
            Some("Adviser"),
            Some("Subject Teachers"),
            aggressive.then_some("Guidance Counselor"),
        ]),
        timeframe: format!(
            "{} weeks with {} monitoring",
            pick(aggressive, "6-8", "4-6"),
            pick(aggressive, "daily", "twice-weekly")
        ),
        expected_impact: if aggressive { Level::High } else { Level::Medium },
        risk_if_ignored: format!(
            "{}; loss of instructional time for all students",
            pick(aggressive, "Safety risk; potential suspension", "Persistent disruption")
        ),
        steps: vec![
            format!(
                "Target behavior: Address {name}'s {behavior} issue - \"{}...\"",
                input.excerpt(60)
            ),
            pick(
                aggressive,
                "Safety protocol: Establish de-escalation plan with clear adult response steps",
                "Post visual behavior expectations in classroom; review with student",
            )
            .to_string(),
            format!(
                "Positive reinforcement: {name} earns points for {} (exchangeable for privileges)",
                pick(aggressive, "calm conflict resolution", "on-task behavior")
            ),
            pick(
                aggressive,
                "Mandatory cool-down space + teach alternative coping strategies (deep breathing, self-talk)",
                "Use low-level responses to disruption (proximity, non-verbal cues) - avoid power struggles",
            )
            .to_string(),
            pick(
                aggressive,
                "Parent contract: Immediate notification if aggressive incident occurs",
                "Weekly behavior report card sent to parents",
            )
            .to_string(),
        ],
        metrics: vec![
            if aggressive {
                format!("Zero aggressive incidents for {name} within 3 weeks")
            } else {
                format!("{} tallies reduced by ≥60% by week 4", capitalize(behavior))
            },
            format!(
                "{name} earns daily reinforcement target on ≥{} days/week",
                pick(aggressive, "5", "4")
            ),
            format!(
                "Teacher satisfaction rating: \"Behavior manageable without major disruption\" by week {}",
                pick(aggressive, "6", "4")
            ),
        ],
        review_after_days: if aggressive { 14 } else { 21 },
        context: input.context(),
    }
}

fn counseling_referral(input: &PlanInput<'_>) -> PrescriptivePlan {
    let concern = input
        .first_keyword_of(&["sad", "cry", "anxious", "withdrawn", "conflict"])
        .unwrap_or("emotional/social concern");
    let crisis = input.any_keyword_of(&["suicide", "self-harm", "crisis"]) || input.is_high();
    let name = input.name();

    let coping = if concern.contains("anxious") {
        "Grounding techniques, cognitive reframing"
    } else if concern.contains("conflict") {
        "Conflict resolution, assertiveness"
    } else {
        "Emotion regulation, self-advocacy"
    };

    PrescriptivePlan {
        owners: owners([
            Some("Guidance Counselor"),
            crisis.then_some("School Psychologist"),
            Some("Adviser"),
        ]),
        timeframe: pick(
            crisis,
            "8-10 sessions (2x/week initially)",
            "6 sessions, weekly",
        )
        .to_string(),
        expected_impact: if crisis { Level::High } else { Level::Medium },
        risk_if_ignored: format!(
            "{}; peer conflicts continue; academic impact",
            pick(
                crisis,
                "Mental health crisis; safety risk",
                "Emotional distress persists"
            )
        ),
        steps: vec![
            format!(
                "{} - {name} reports \"{}...\"",
                pick(
                    crisis,
                    "🚨 CRISIS PROTOCOL: Immediate safety assessment + parent notification within 24 hours",
                    "Intake session: Assess concern"
                ),
                input.excerpt(50)
            ),
            if crisis {
                "Referral to external mental health provider + create Safety Plan with student/parent"
                    .to_string()
            } else {
                format!("Establish counseling goals targeting {concern} (student input required)")
            },
            format!("Teach coping skills: {coping}"),
            "Coordinate with teachers for classroom supports (breaks, check-ins, modified participation)"
                .to_string(),
            format!(
                "Parent engagement: {}",
                pick(
                    crisis,
                    "Weekly progress updates + resource referrals",
                    "Mid-point and end-of-counseling conferences"
                )
            ),
        ],
        metrics: vec![
            if crisis {
                format!("{name} maintains safety (zero harm incidents) for 4+ consecutive weeks")
            } else {
                format!(
                    "Self-report: {name} rates {concern} as \"improved\" (≥2 points on 10-point scale) by session 4"
                )
            },
            if crisis {
                "External counselor/therapist engaged by week 2".to_string()
            } else {
                format!("Peer relationships: {name} demonstrates improved social skills (teacher observation)")
            },
            "Academic performance: No grade decline during counseling period".to_string(),
        ],
        review_after_days: if crisis { 7 } else { 21 },
        context: input.context(),
    }
}

fn parent_communication(input: &PlanInput<'_>) -> PrescriptivePlan {
    let report = input.report;
    let high = input.is_high();
    let medium = report.is_severity(&Severity::Medium);
    let urgency = if high {
        "URGENT"
    } else if medium {
        "Important"
    } else {
        "Routine"
    };
    let name = input.name();
    let category = input.category();
    let incident_date = report
        .report_date
        .map(|date| date.format("%-m/%-d/%Y").to_string())
        .unwrap_or_else(|| "recent date".to_string());

    PrescriptivePlan {
        owners: owners([Some("Adviser"), high.then_some("Guidance Counselor")]),
        timeframe: pick(high, "1 week", "2 weeks").to_string(),
        expected_impact: if high { Level::Medium } else { Level::Low },
        risk_if_ignored: format!(
            "{}; lack of home-school partnership",
            pick(
                high,
                "Issue escalates without parent support",
                "Continued misalignment"
            )
        ),
        steps: vec![
            format!(
                "{urgency} parent contact for {name}: \"{}...\"",
                input.excerpt(70)
            ),
            if high {
                format!(
                    "Schedule FACE-TO-FACE meeting within 48 hours (both parents if possible) to discuss {} concern",
                    category.to_lowercase()
                )
            } else {
                format!(
                    "Phone call or virtual meeting with parent/guardian within {}",
                    pick(medium, "3 school days", "1 week")
                )
            },
            format!(
                "Share specific data: {category} incident on {incident_date} + any prior reports ({} total)",
                input.student_report_count
            ),
            format!(
                "Partnership plan: Agree on {} + home consequences/supports",
                pick(
                    high,
                    "DAILY check-in method (SMS/email)",
                    "weekly communication cadence"
                )
            ),
            pick(
                high,
                "Document agreements in writing; both parties sign and keep copy",
                "Log all communications in student file",
            )
            .to_string(),
        ],
        metrics: vec![
            format!(
                "Parent contact completed and documented within {}",
                pick(high, "48 hours", "3 school days")
            ),
            format!(
                "Communication cadence maintained: {}",
                pick(
                    high,
                    "5+ contacts in week 1",
                    "Minimum 2 touchpoints across 2 weeks"
                )
            ),
            format!(
                "{name}'s {} behavior shows improvement (verified by {})",
                category.to_lowercase(),
                pick(high, "daily logs", "week 2 follow-up")
            ),
        ],
        review_after_days: if high { 7 } else { 14 },
        context: input.context(),
    }
}
