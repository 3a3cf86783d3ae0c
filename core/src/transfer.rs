use std::io::{Read, Write};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{ImportError, ImportField};
use crate::log::WeightLog;
use crate::models::{GoalKind, KG_PER_LB, WeightEntry};

/// How the columns of an imported file were interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub date: usize,
    pub weight: usize,
    pub notes: Option<usize>,
    pub goal: Option<usize>,
    pub date_column: String,
    pub weight_column: String,
    /// Weight values are pounds and get converted to kg.
    pub pounds: bool,
}

fn matches_field(header: &str, field: ImportField) -> bool {
    let lower = header.to_lowercase();
    field.patterns().iter().any(|p| lower.contains(p))
}

fn is_pounds_header(header: &str) -> bool {
    header
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphabetic())
        .any(|word| word == "lb" || word == "lbs")
}

/// Map arbitrary headers onto the date and weight fields.
///
/// Any header containing "date" or "time" is a date candidate; any header
/// containing "weight", "kg" or "lbs" is a weight candidate. Exactly one
/// candidate is required for each.
pub fn map_columns(headers: &[String]) -> Result<ColumnMapping, ImportError> {
    let candidates = |field: ImportField| -> Vec<usize> {
        headers
            .iter()
            .enumerate()
            .filter(|(_, h)| matches_field(h, field))
            .map(|(i, _)| i)
            .collect()
    };
    let date_candidates = candidates(ImportField::Date);
    let weight_candidates = candidates(ImportField::Weight);

    let mut missing = Vec::new();
    if date_candidates.is_empty() {
        missing.push(ImportField::Date);
    }
    if weight_candidates.is_empty() {
        missing.push(ImportField::Weight);
    }
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns {
            found: headers.to_vec(),
            missing,
        });
    }

    for (field, found) in [
        (ImportField::Date, &date_candidates),
        (ImportField::Weight, &weight_candidates),
    ] {
        if found.len() > 1 {
            return Err(ImportError::AmbiguousColumn {
                field,
                candidates: found.iter().map(|&i| headers[i].clone()).collect(),
            });
        }
    }

    let date = date_candidates[0];
    let weight = weight_candidates[0];
    if date == weight {
        return Err(ImportError::AmbiguousColumn {
            field: ImportField::Weight,
            candidates: vec![headers[weight].clone()],
        });
    }

    let optional = |needle: &str| -> Option<usize> {
        headers.iter().enumerate().position(|(i, h)| {
            i != date && i != weight && h.to_lowercase().contains(needle)
        })
    };

    Ok(ColumnMapping {
        date,
        weight,
        notes: optional("note"),
        goal: optional("goal"),
        date_column: headers[date].clone(),
        weight_column: headers[weight].clone(),
        pounds: is_pounds_header(&headers[weight]),
    })
}

/// Parse a date in any of the formats spreadsheets and trackers tend to export.
#[must_use]
pub fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}

fn sniff_delimiter(data: &str) -> u8 {
    let header = data.lines().next().unwrap_or_default();
    if header.contains(';') && !header.contains(',') {
        b';'
    } else {
        b','
    }
}

/// Entries parsed from a CSV file, before they are merged into a log.
#[derive(Debug, Clone)]
pub struct ParsedImport {
    pub mapping: ColumnMapping,
    pub entries: Vec<WeightEntry>,
}

/// Parse a weight CSV with flexible headers. Any bad row fails the whole file.
///
/// `default_goal` is used for rows without a (recognisable) goal column.
pub fn parse_weight_csv<R: Read>(
    mut reader: R,
    default_goal: GoalKind,
) -> Result<ParsedImport, ImportError> {
    let mut data = String::new();
    reader.read_to_string(&mut data)?;
    let data = data.trim_start_matches('\u{feff}');

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(data))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(String::is_empty) {
        return Err(ImportError::NoHeader);
    }
    let mapping = map_columns(&headers)?;

    let mut entries = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let row = line + 2;

        let date_raw = record.get(mapping.date).unwrap_or("").trim();
        let weight_raw = record.get(mapping.weight).unwrap_or("").trim();
        if date_raw.is_empty() && weight_raw.is_empty() {
            continue; // blank row
        }

        let date = parse_flexible_date(date_raw).ok_or_else(|| ImportError::InvalidDate {
            row,
            value: date_raw.to_string(),
        })?;
        let weight: f64 = weight_raw
            .parse()
            .ok()
            .filter(|w: &f64| w.is_finite() && *w > 0.0)
            .ok_or_else(|| ImportError::InvalidWeight {
                row,
                value: weight_raw.to_string(),
            })?;
        let weight_kg = if mapping.pounds {
            weight * KG_PER_LB
        } else {
            weight
        };

        let notes = mapping
            .notes
            .and_then(|i| record.get(i))
            .unwrap_or("")
            .to_string();
        let goal = mapping
            .goal
            .and_then(|i| record.get(i))
            .and_then(|g| GoalKind::from_str(g).ok())
            .unwrap_or(default_goal);

        entries.push(WeightEntry {
            date,
            weight_kg,
            notes,
            goal,
        });
    }

    Ok(ParsedImport { mapping, entries })
}

/// What an import did, or would do on a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub dry_run: bool,
    pub rows_parsed: usize,
    pub entries_added: usize,
    pub entries_replaced: usize,
    pub date_column: String,
    pub weight_column: String,
    pub converted_from_lbs: bool,
}

/// Upsert parsed rows into `log`; later rows win over earlier rows and over
/// existing entries for the same date.
pub fn merge_import(log: &mut WeightLog, parsed: ParsedImport, dry_run: bool) -> ImportSummary {
    let rows_parsed = parsed.entries.len();
    let mut entries_added = 0;
    let mut entries_replaced = 0;
    for entry in parsed.entries {
        if log.upsert(entry).is_some() {
            entries_replaced += 1;
        } else {
            entries_added += 1;
        }
    }
    ImportSummary {
        dry_run,
        rows_parsed,
        entries_added,
        entries_replaced,
        date_column: parsed.mapping.date_column,
        weight_column: parsed.mapping.weight_column,
        converted_from_lbs: parsed.mapping.pounds,
    }
}

// --- Export ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    /// Semicolon-separated CSV, which spreadsheet apps in comma-decimal
    /// locales open without an import wizard.
    Excel,
    Json,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv | Self::Excel => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "excel" | "xls" => Ok(Self::Excel),
            "json" => Ok(Self::Json),
            _ => bail!("Invalid export format '{s}'. Use csv, excel or json"),
        }
    }
}

#[must_use]
pub fn default_export_filename(format: ExportFormat, today: NaiveDate) -> String {
    format!("weight_data_{}.{}", today.format("%Y%m%d"), format.extension())
}

fn write_delimited<W: Write>(log: &WeightLog, writer: W, delimiter: u8) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    wtr.write_record(["date", "weight", "notes", "goal"])?;
    for e in log {
        wtr.write_record([
            e.date.format("%Y-%m-%d").to_string(),
            e.weight_kg.to_string(),
            e.notes.clone(),
            e.goal.to_string(),
        ])?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write the whole log in `format`. Returns the number of entries written.
pub fn export_log<W: Write>(log: &WeightLog, format: ExportFormat, mut writer: W) -> Result<usize> {
    match format {
        ExportFormat::Csv => write_delimited(log, writer, b',')?,
        ExportFormat::Excel => write_delimited(log, writer, b';')?,
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, log)?;
            writeln!(writer)?;
        }
    }
    Ok(log.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn sample_log() -> WeightLog {
        WeightLog::from_entries(vec![
            WeightEntry {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                weight_kg: 85.2,
                notes: "Morning weight".to_string(),
                goal: GoalKind::Cut,
            },
            WeightEntry {
                date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
                weight_kg: 84.6,
                notes: "after run, tired".to_string(),
                goal: GoalKind::Cut,
            },
        ])
    }

    #[test]
    fn test_map_columns_synonyms() {
        let m = map_columns(&headers(&["Timestamp", "Body Weight (kg)", "Notes"])).unwrap();
        assert_eq!(m.date, 0);
        assert_eq!(m.weight, 1);
        assert_eq!(m.notes, Some(2));
        assert!(!m.pounds);

        let m = map_columns(&headers(&["Weight_lbs", "Measured Date"])).unwrap();
        assert_eq!(m.date, 1);
        assert_eq!(m.weight, 0);
        assert!(m.pounds);
    }

    #[test]
    fn test_map_columns_reports_missing_date_only() {
        let err = map_columns(&headers(&["day", "weight"])).unwrap_err();
        assert_eq!(err.missing_fields(), &[ImportField::Date]);
        assert!(err.to_string().contains("found columns: [day, weight]"));
    }

    #[test]
    fn test_map_columns_reports_missing_weight_only() {
        let err = map_columns(&headers(&["date", "mass"])).unwrap_err();
        assert_eq!(err.missing_fields(), &[ImportField::Weight]);
    }

    #[test]
    fn test_map_columns_reports_both_missing() {
        let err = map_columns(&headers(&["a", "b"])).unwrap_err();
        assert_eq!(err.missing_fields(), &[ImportField::Date, ImportField::Weight]);
    }

    #[test]
    fn test_map_columns_ambiguous() {
        let err = map_columns(&headers(&["date", "time", "weight"])).unwrap_err();
        assert!(matches!(
            err,
            ImportError::AmbiguousColumn { field: ImportField::Date, ref candidates }
                if candidates.len() == 2
        ));

        let err = map_columns(&headers(&["date", "weight", "kg"])).unwrap_err();
        assert!(matches!(
            err,
            ImportError::AmbiguousColumn { field: ImportField::Weight, .. }
        ));
    }

    #[test]
    fn test_parse_flexible_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_flexible_date("2024-01-15"), Some(expected));
        assert_eq!(parse_flexible_date("1/15/2024"), Some(expected));
        assert_eq!(parse_flexible_date("15/01/2024"), Some(expected));
        assert_eq!(parse_flexible_date("2024-01-15 07:30:00"), Some(expected));
        assert_eq!(parse_flexible_date("2024-01-15T07:30:00+02:00"), Some(expected));
        assert_eq!(parse_flexible_date("yesterday"), None);
    }

    #[test]
    fn test_parse_weight_csv_basic() {
        let csv = "\
Date,Weight (kg),Notes
2024-01-02,80.4,after gym
2024-01-01,80.9,
";
        let parsed = parse_weight_csv(csv.as_bytes(), GoalKind::Bulk).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].notes, "after gym");
        assert_eq!(parsed.entries[1].goal, GoalKind::Bulk);
    }

    #[test]
    fn test_parse_weight_csv_converts_pounds() {
        let csv = "date,weight (lbs)\n2024-01-01,200\n";
        let parsed = parse_weight_csv(csv.as_bytes(), GoalKind::Maintenance).unwrap();
        assert!(parsed.mapping.pounds);
        assert!((parsed.entries[0].weight_kg - 90.7184).abs() < 1e-3);
    }

    #[test]
    fn test_parse_weight_csv_rejects_bad_date() {
        let csv = "date,weight\n2024-01-01,80\nnot a date,81\n";
        let err = parse_weight_csv(csv.as_bytes(), GoalKind::Maintenance).unwrap_err();
        assert!(matches!(err, ImportError::InvalidDate { row: 3, .. }));
    }

    #[test]
    fn test_parse_weight_csv_rejects_bad_weight() {
        let csv = "date,weight\n2024-01-01,-3\n";
        let err = parse_weight_csv(csv.as_bytes(), GoalKind::Maintenance).unwrap_err();
        assert!(matches!(err, ImportError::InvalidWeight { row: 2, .. }));
    }

    #[test]
    fn test_parse_weight_csv_skips_blank_rows() {
        let csv = "date,weight\n2024-01-01,80\n,\n2024-01-02,80.2\n";
        let parsed = parse_weight_csv(csv.as_bytes(), GoalKind::Maintenance).unwrap();
        assert_eq!(parsed.entries.len(), 2);
    }

    #[test]
    fn test_parse_weight_csv_missing_weight_column() {
        let csv = "when,notes\n2024-01-01,hi\n";
        let err = parse_weight_csv(csv.as_bytes(), GoalKind::Maintenance).unwrap_err();
        // "when" does not contain date/time, so both are missing
        assert_eq!(err.missing_fields(), &[ImportField::Date, ImportField::Weight]);

        let csv = "date,notes\n2024-01-01,hi\n";
        let err = parse_weight_csv(csv.as_bytes(), GoalKind::Maintenance).unwrap_err();
        assert_eq!(err.missing_fields(), &[ImportField::Weight]);
    }

    #[test]
    fn test_csv_round_trip() {
        let log = sample_log();
        let mut buf = Vec::new();
        assert_eq!(export_log(&log, ExportFormat::Csv, &mut buf).unwrap(), 2);

        let parsed = parse_weight_csv(buf.as_slice(), GoalKind::Maintenance).unwrap();
        let reimported = WeightLog::from_entries(parsed.entries);
        assert_eq!(reimported, log);
    }

    #[test]
    fn test_round_trip_with_renamed_headers() {
        let log = sample_log();
        let mut buf = Vec::new();
        export_log(&log, ExportFormat::Csv, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        for header in [
            "Time,Body Weight,notes,goal",
            "recorded date,kg,notes,goal",
            "DATE,WEIGHT,notes,goal",
        ] {
            let renamed = text.replacen("date,weight,notes,goal", header, 1);
            let parsed = parse_weight_csv(renamed.as_bytes(), GoalKind::Maintenance).unwrap();
            let reimported = WeightLog::from_entries(parsed.entries);
            let pairs: Vec<(NaiveDate, f64)> =
                reimported.entries().iter().map(|e| (e.date, e.weight_kg)).collect();
            let expected: Vec<(NaiveDate, f64)> =
                log.entries().iter().map(|e| (e.date, e.weight_kg)).collect();
            assert_eq!(pairs, expected, "header {header}");
        }
    }

    #[test]
    fn test_excel_export_uses_semicolons_and_reimports() {
        let log = sample_log();
        let mut buf = Vec::new();
        export_log(&log, ExportFormat::Excel, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("date;weight;notes;goal"));
        // The comma inside the note must not confuse the sniffer
        let parsed = parse_weight_csv(buf.as_slice(), GoalKind::Maintenance).unwrap();
        assert_eq!(WeightLog::from_entries(parsed.entries), log);
    }

    #[test]
    fn test_json_export() {
        let log = sample_log();
        let mut buf = Vec::new();
        export_log(&log, ExportFormat::Json, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["date"], "2024-01-01");
        assert_eq!(value[0]["weight"], 85.2);
        assert_eq!(value[1]["goal"], "cut");
    }

    #[test]
    fn test_merge_import_counts() {
        let mut log = sample_log();
        let csv = "date,weight\n2024-01-08,84.0\n2024-01-09,83.9\n2024-01-09,83.7\n";
        let parsed = parse_weight_csv(csv.as_bytes(), GoalKind::Cut).unwrap();
        let summary = merge_import(&mut log, parsed, false);
        assert_eq!(summary.rows_parsed, 3);
        assert_eq!(summary.entries_added, 1);
        assert_eq!(summary.entries_replaced, 2);
        assert_eq!(log.len(), 3);
        assert!((log.last().unwrap().weight_kg - 83.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_export_format_and_filename() {
        assert_eq!("Excel".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert!("xml".parse::<ExportFormat>().is_err());
        let today = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        assert_eq!(
            default_export_filename(ExportFormat::Json, today),
            "weight_data_20240509.json"
        );
    }
}
