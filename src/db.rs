use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::{DssError, DssResult};
use crate::models::{BehaviorReport, Category, Severity};

/// Load every behavior report with its student's display name and section, newest first.
pub async fn fetch_reports(pool: &PgPool) -> DssResult<Vec<BehaviorReport>> {
    let rows = sqlx::query(
        r#"
        SELECT
            r.id::bigint AS id,
            r.report_date,
            r.category,
            r.severity,
            r.notes,
            r.student_id::bigint AS student_id,
            r.section_id::bigint AS section_id,
            r.teacher_id::bigint AS teacher_id,
            TRIM(CONCAT(s.last_name, ', ', s.first_name, ' ', COALESCE(s.middle_name, ''))) AS student_name,
            sec.section_name
        FROM student_behavior_reports r
        JOIN students s ON s.id = r.student_id
        LEFT JOIN sections sec ON sec.id = r.section_id
        ORDER BY r.report_date DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut reports = Vec::with_capacity(rows.len());

    for row in rows {
        reports.push(BehaviorReport {
            id: row.try_get("id")?,
            student_id: row.try_get("student_id")?,
            student_name: row
                .try_get::<Option<String>, _>("student_name")?
                .unwrap_or_default(),
            section_id: row.try_get("section_id")?,
            section_name: row.try_get("section_name")?,
            teacher_id: row.try_get("teacher_id")?,
            category: row.try_get::<Option<String>, _>("category")?.map(Category::from),
            severity: row.try_get::<Option<String>, _>("severity")?.map(Severity::from),
            notes: row.try_get("notes")?,
            report_date: row.try_get::<Option<NaiveDate>, _>("report_date")?,
        });
    }

    info!(reports = reports.len(), "fetched behavior reports from postgres");
    Ok(reports)
}

#[derive(serde::Deserialize)]
struct CsvRow {
    id: i64,
    student_id: i64,
    student_name: Option<String>,
    section_id: Option<i64>,
    #[serde(default)]
    section_name: Option<String>,
    teacher_id: Option<i64>,
    category: Option<String>,
    severity: Option<String>,
    notes: Option<String>,
    report_date: Option<NaiveDate>,
}

impl From<CsvRow> for BehaviorReport {
    fn from(row: CsvRow) -> Self {
        BehaviorReport {
            id: row.id,
            student_id: row.student_id,
            student_name: row.student_name.unwrap_or_default(),
            section_id: row.section_id,
            section_name: row.section_name,
            teacher_id: row.teacher_id,
            category: row.category.map(Category::from),
            severity: row.severity.map(Severity::from),
            notes: row.notes,
            report_date: row.report_date,
        }
    }
}

/// Parse reports from CSV with a header row. Empty cells become absent values.
pub fn read_reports<R: Read>(source: R) -> DssResult<Vec<BehaviorReport>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let mut reports = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        reports.push(BehaviorReport::from(result?));
    }

    Ok(reports)
}

pub fn load_csv(csv_path: &Path) -> DssResult<Vec<BehaviorReport>> {
    let file = std::fs::File::open(csv_path).map_err(csv::Error::from)?;
    let reports = read_reports(file)?;
    info!(
        reports = reports.len(),
        path = %csv_path.display(),
        "loaded behavior reports from csv"
    );
    Ok(reports)
}

pub fn find_report(reports: &[BehaviorReport], report_id: i64) -> DssResult<&BehaviorReport> {
    reports
        .iter()
        .find(|report| report.id == report_id)
        .ok_or(DssError::ReportNotFound(report_id))
}
