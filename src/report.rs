use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::info;

use crate::models::{
    AnnotatedReport, AtRiskStudent, BehaviorReport, CategorySummary, DashboardAnalysis,
    Recommendation, ReportedStudent, Severity, SeverityTrend, StudentRiskProfile,
};
use crate::risk;
use crate::rules;

const RECOMMENDATIONS_PER_REPORT: usize = 2;
const TOP_RECOMMENDATIONS: usize = 10;

pub fn analyze_all_reports(all_reports: &[BehaviorReport]) -> DashboardAnalysis {
    let mut analysis = DashboardAnalysis {
        total_reports: all_reports.len(),
        ..DashboardAnalysis::default()
    };

    for report in all_reports {
        match report.severity {
            Some(Severity::High) => analysis.high_severity_count += 1,
            Some(Severity::Medium) => analysis.medium_severity_count += 1,
            Some(Severity::Low) => analysis.low_severity_count += 1,
            _ => {}
        }
        *analysis
            .category_breakdown
            .entry(report.category_label().to_string())
            .or_insert(0) += 1;
    }

    analysis.at_risk_students = at_risk_students(all_reports);
    analysis.severity_trends = severity_trends(all_reports);
    analysis.student_risk_profile = student_risk_profiles(all_reports);
    analysis.top_recommendations = top_recommendations(all_reports);

    info!(
        reports = analysis.total_reports,
        at_risk = analysis.at_risk_students.len(),
        high_severity = analysis.high_severity_count,
        "analyzed behavior reports"
    );

    analysis
}

/// Students with enough reports to be flagged, most reported first.
pub fn at_risk_students(all_reports: &[BehaviorReport]) -> Vec<AtRiskStudent> {
    let mut counts: HashMap<i64, (&str, usize)> = HashMap::new();
    for report in all_reports {
        counts
            .entry(report.student_id)
            .or_insert((report.display_name(), 0))
            .1 += 1;
    }

    let mut students: Vec<AtRiskStudent> = counts
        .into_iter()
        .filter_map(|(student_id, (student_name, report_count))| {
            risk::risk_level(report_count).map(|risk_level| AtRiskStudent {
                student_id,
                student_name: student_name.to_string(),
                report_count,
                risk_level,
            })
        })
        .collect();

    students.sort_by(|a, b| {
        b.report_count
            .cmp(&a.report_count)
            .then(a.student_id.cmp(&b.student_id))
    });
    students
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Weekly buckets keyed on the Monday of each report date.
pub fn severity_trends(all_reports: &[BehaviorReport]) -> Vec<SeverityTrend> {
    #[derive(Default)]
    struct Bucket {
        report_count: usize,
        high_severity_count: usize,
        weight_total: f64,
        weighted_reports: usize,
        students: BTreeSet<i64>,
    }

    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for report in all_reports {
        let Some(date) = report.report_date else {
            continue;
        };
        let bucket = buckets.entry(week_start(date)).or_default();
        bucket.report_count += 1;
        bucket.students.insert(report.student_id);
        if let Some(severity) = &report.severity {
            if *severity == Severity::High {
                bucket.high_severity_count += 1;
            }
            if let Some(weight) = risk::severity_weight(severity) {
                bucket.weight_total += weight;
                bucket.weighted_reports += 1;
            }
        }
    }

    buckets
        .into_iter()
        .map(|(week_start, bucket)| SeverityTrend {
            week_start,
            report_count: bucket.report_count,
            high_severity_count: bucket.high_severity_count,
            avg_severity: if bucket.weighted_reports == 0 {
                0.0
            } else {
                bucket.weight_total / bucket.weighted_reports as f64
            },
            student_count: bucket.students.len(),
        })
        .collect()
}

pub fn student_risk_profiles(all_reports: &[BehaviorReport]) -> BTreeMap<i64, StudentRiskProfile> {
    let mut profiles: BTreeMap<i64, StudentRiskProfile> = BTreeMap::new();
    for report in all_reports {
        let profile = profiles
            .entry(report.student_id)
            .or_insert_with(|| StudentRiskProfile {
                student_name: report.display_name().to_string(),
                report_count: 0,
                high_severity_count: 0,
                category_breakdown: BTreeMap::new(),
            });
        profile.report_count += 1;
        if report.is_severity(&Severity::High) {
            profile.high_severity_count += 1;
        }
        *profile
            .category_breakdown
            .entry(report.category_label().to_string())
            .or_insert(0) += 1;
    }
    profiles
}

/// Every student with at least one report, ordered by id. Name and section
/// come from the student's first report that carries them.
pub fn reported_students(all_reports: &[BehaviorReport]) -> Vec<ReportedStudent> {
    let mut students: BTreeMap<i64, ReportedStudent> = BTreeMap::new();
    for report in all_reports {
        let student = students
            .entry(report.student_id)
            .or_insert_with(|| ReportedStudent {
                student_id: report.student_id,
                student_name: report.display_name().to_string(),
                section_id: None,
                section_name: None,
                report_count: 0,
            });
        student.report_count += 1;
        if student.section_id.is_none() {
            student.section_id = report.section_id;
        }
        if student.section_name.is_none() {
            student.section_name = report.section_name.clone();
        }
    }
    students.into_values().collect()
}

/// The two strongest recommendations of every report, best ten overall.
/// Not deduplicated across reports.
pub fn top_recommendations(all_reports: &[BehaviorReport]) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = all_reports
        .iter()
        .flat_map(|report| {
            rules::generate_recommendations(report, all_reports)
                .into_iter()
                .take(RECOMMENDATIONS_PER_REPORT)
        })
        .collect();

    recommendations.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    recommendations.truncate(TOP_RECOMMENDATIONS);
    recommendations
}

/// Attach recommendations to every report, in input order.
pub fn annotate_reports(all_reports: &[BehaviorReport]) -> Vec<AnnotatedReport> {
    all_reports
        .iter()
        .map(|report| {
            let recommendations = rules::generate_recommendations(report, all_reports);
            AnnotatedReport {
                report: report.clone(),
                has_recommendations: !recommendations.is_empty(),
                recommendations,
            }
        })
        .collect()
}

pub fn summarize_by_category(all_reports: &[BehaviorReport]) -> Vec<CategorySummary> {
    let mut map: HashMap<&str, (usize, f64, usize)> = HashMap::new();

    for report in all_reports {
        let entry = map.entry(report.category_label()).or_insert((0, 0.0, 0));
        entry.0 += 1;
        if let Some(weight) = report.severity.as_ref().and_then(risk::severity_weight) {
            entry.1 += weight;
            entry.2 += 1;
        }
    }

    let mut summaries: Vec<CategorySummary> = map
        .into_iter()
        .map(|(category, (count, total_weight, weighted))| CategorySummary {
            category: category.to_string(),
            count,
            avg_severity: if weighted == 0 {
                0.0
            } else {
                total_weight / weighted as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.cmp(&b.category)));
    summaries
}

pub fn build_report(scope: Option<&str>, all_reports: &[BehaviorReport]) -> String {
    let analysis = analyze_all_reports(all_reports);
    let summaries = summarize_by_category(all_reports);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all sections");

    let _ = writeln!(output, "# Behavior Analytics Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} reports)",
        scope_label, analysis.total_reports
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Severity Mix");
    let _ = writeln!(output, "- High: {}", analysis.high_severity_count);
    let _ = writeln!(output, "- Medium: {}", analysis.medium_severity_count);
    let _ = writeln!(output, "- Low: {}", analysis.low_severity_count);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No reports recorded.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} reports (avg severity {:.1})",
                summary.category, summary.count, summary.avg_severity
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## At-Risk Students");

    if analysis.at_risk_students.is_empty() {
        let _ = writeln!(output, "No students at the at-risk threshold.");
    } else {
        for student in analysis.at_risk_students.iter() {
            let _ = writeln!(
                output,
                "- {} (#{}) {} reports, risk {:?}",
                student.student_name, student.student_id, student.report_count, student.risk_level
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Trend");

    if analysis.severity_trends.is_empty() {
        let _ = writeln!(output, "No dated reports.");
    } else {
        for trend in analysis.severity_trends.iter() {
            let _ = writeln!(
                output,
                "- Week of {}: {} reports, {} high, avg severity {:.1}, {} students",
                trend.week_start,
                trend.report_count,
                trend.high_severity_count,
                trend.avg_severity,
                trend.student_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Recommendations");

    if analysis.top_recommendations.is_empty() {
        let _ = writeln!(output, "No recommendations generated.");
    } else {
        for rec in analysis.top_recommendations.iter() {
            let _ = writeln!(
                output,
                "- [{}] {} for {} (confidence {}%, review in {} days)",
                rec.kind,
                rec.title,
                rec.plan.context.student_name,
                rec.confidence,
                rec.plan.review_after_days
            );
        }
    }

    let mut recent: Vec<&BehaviorReport> = all_reports.iter().collect();
    recent.sort_by(|a, b| b.report_date.cmp(&a.report_date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Report Notes");

    if recent.is_empty() {
        let _ = writeln!(output, "No reports recorded.");
    } else {
        for report in recent.iter().take(5) {
            let date = report
                .report_date
                .map(|date| date.to_string())
                .unwrap_or_else(|| "undated".to_string());
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {}",
                report.display_name(),
                report.category_label(),
                date,
                report.notes.as_deref().unwrap_or("")
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, RecommendationType, RiskLevel};
    use crate::rules::tests::report;

    fn pedro_reports(count: i64) -> Vec<BehaviorReport> {
        let mut reports: Vec<BehaviorReport> = (0..count)
            .map(|id| report(id, 42, "Pedro", "Conduct", "Medium", "Talks during class"))
            .collect();
        reports.push(report(100, 7, "Lina", "Academic", "Low", ""));
        reports
    }

    #[test]
    fn flags_students_at_five_reports() {
        let analysis = analyze_all_reports(&pedro_reports(5));
        assert_eq!(
            analysis.at_risk_students,
            vec![AtRiskStudent {
                student_id: 42,
                student_name: "Pedro".to_string(),
                report_count: 5,
                risk_level: RiskLevel::High,
            }]
        );

        let analysis = analyze_all_reports(&pedro_reports(10));
        assert_eq!(analysis.at_risk_students.len(), 1);
        assert_eq!(analysis.at_risk_students[0].risk_level, RiskLevel::Critical);

        let analysis = analyze_all_reports(&pedro_reports(4));
        assert!(analysis.at_risk_students.is_empty());
    }

    #[test]
    fn underscores_in_names_do_not_split_students() {
        let reports: Vec<BehaviorReport> = (0..5)
            .map(|id| report(id, 3, "Ana_Marie", "Conduct", "Low", ""))
            .collect();
        let students = at_risk_students(&reports);
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].student_id, 3);
        assert_eq!(students[0].student_name, "Ana_Marie");
    }

    #[test]
    fn severity_tallies_skip_unknown_values() {
        let mut reports = vec![
            report(1, 1, "A", "Conduct", "High", ""),
            report(2, 2, "B", "Conduct", "Medium", ""),
            report(3, 3, "C", "Conduct", "Low", ""),
            report(4, 4, "D", "Conduct", "Severe", ""),
        ];
        reports[1].severity = None;

        let analysis = analyze_all_reports(&reports);
        assert_eq!(analysis.total_reports, 4);
        assert_eq!(analysis.high_severity_count, 1);
        assert_eq!(analysis.medium_severity_count, 0);
        assert_eq!(analysis.low_severity_count, 1);
        assert_eq!(analysis.category_breakdown.get("Conduct"), Some(&4));
    }

    #[test]
    fn top_recommendations_take_two_per_report_and_cap_at_ten() {
        let reports: Vec<BehaviorReport> = (0..8)
            .map(|id| report(id, id, "Kid", "Attendance", "High", "Often absent and upset"))
            .collect();
        let top = top_recommendations(&reports);
        assert_eq!(top.len(), 10);
        assert!(top.windows(2).all(|pair| pair[0].confidence >= pair[1].confidence));
        assert!(top.iter().all(|rec| matches!(
            rec.kind,
            RecommendationType::UrgentIntervention | RecommendationType::ParentCommunication
        )));

        let single = vec![report(1, 1, "Solo", "Other", "Low", "")];
        assert!(top_recommendations(&single).is_empty());
    }

    #[test]
    fn weekly_trends_bucket_by_monday() {
        let mut reports = vec![
            report(1, 1, "A", "Conduct", "High", ""),
            report(2, 2, "B", "Conduct", "Low", ""),
            report(3, 1, "A", "Conduct", "Medium", ""),
            report(4, 4, "D", "Conduct", "Low", ""),
        ];
        // Wednesday and Sunday of the same week, then the following Monday.
        reports[0].report_date = NaiveDate::from_ymd_opt(2025, 3, 5);
        reports[1].report_date = NaiveDate::from_ymd_opt(2025, 3, 9);
        reports[2].report_date = NaiveDate::from_ymd_opt(2025, 3, 10);

        let trends = severity_trends(&reports);
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].week_start, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(trends[0].report_count, 2);
        assert_eq!(trends[0].high_severity_count, 1);
        assert!((trends[0].avg_severity - 2.0).abs() < 0.001);
        assert_eq!(trends[0].student_count, 2);
        assert_eq!(trends[1].week_start, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(trends[1].report_count, 1);
    }

    #[test]
    fn student_profiles_break_down_categories() {
        let reports = vec![
            report(1, 5, "Mia", "Conduct", "High", ""),
            report(2, 5, "Mia", "Academic", "Low", ""),
            report(3, 5, "Mia", "Conduct", "Medium", ""),
        ];
        let profiles = student_risk_profiles(&reports);
        let mia = profiles.get(&5).expect("profile");
        assert_eq!(mia.report_count, 3);
        assert_eq!(mia.high_severity_count, 1);
        assert_eq!(mia.category_breakdown.get("Conduct"), Some(&2));
        assert_eq!(mia.category_breakdown.get("Academic"), Some(&1));
    }

    #[test]
    fn reported_students_are_distinct_and_carry_sections() {
        let mut reports = pedro_reports(3);
        reports[1].section_name = Some("Grade 7 - Rizal".to_string());
        reports.push(report(101, 3, "", "Academic", "Low", ""));

        let students = reported_students(&reports);
        let ids: Vec<i64> = students.iter().map(|student| student.student_id).collect();
        assert_eq!(ids, vec![3, 7, 42]);

        assert_eq!(students[0].student_name, "Student");
        assert_eq!(students[2].report_count, 3);
        assert_eq!(students[2].section_id, Some(1));
        assert_eq!(students[2].section_name.as_deref(), Some("Grade 7 - Rizal"));

        let json = serde_json::to_value(&students[2]).expect("serialize");
        assert_eq!(json["studentName"], "Pedro");
        assert_eq!(json["sectionName"], "Grade 7 - Rizal");
        assert_eq!(json["reportCount"], 3);
    }

    #[test]
    fn annotated_reports_keep_order_and_flag_recommendations() {
        let reports = vec![
            report(1, 1, "A", "Other", "Low", ""),
            report(2, 2, "B", "Attendance", "Low", ""),
        ];
        let annotated = annotate_reports(&reports);
        assert_eq!(annotated[0].report.id, 1);
        assert!(!annotated[0].has_recommendations);
        assert!(annotated[1].has_recommendations);
        assert_eq!(annotated[1].report.category, Some(Category::Attendance));

        let json = serde_json::to_value(&annotated[1]).expect("serialize");
        assert_eq!(json["studentName"], "B");
        assert_eq!(json["hasRecommendations"], true);
        assert_eq!(json["recommendations"][0]["type"], "PARENT_COMMUNICATION");
    }

    #[test]
    fn report_lists_sections() {
        let report = build_report(Some("Grade 7 - Rizal"), &pedro_reports(5));
        assert!(report.contains("# Behavior Analytics Report"));
        assert!(report.contains("Generated for Grade 7 - Rizal (6 reports)"));
        assert!(report.contains("- Conduct: 5 reports (avg severity 2.0)"));
        assert!(report.contains("- Pedro (#42) 5 reports, risk High"));
        assert!(report.contains("## Top Recommendations"));
    }
}
