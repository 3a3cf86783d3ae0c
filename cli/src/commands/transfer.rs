use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use heft_core::service::HeftService;
use heft_core::transfer::{ExportFormat, default_export_filename};

use super::helpers::today;

pub(crate) fn cmd_import_csv(
    svc: &HeftService,
    user: &str,
    path: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let summary = svc.import_csv(user, file, dry_run)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.dry_run {
        println!("Dry run — no changes made.\n");
    } else {
        println!("Import complete.\n");
    }
    println!(
        "  Columns:        date = '{}', weight = '{}'{}",
        summary.date_column,
        summary.weight_column,
        if summary.converted_from_lbs {
            " (converted from lbs)"
        } else {
            ""
        }
    );
    println!("  Rows parsed:    {}", summary.rows_parsed);
    if summary.dry_run {
        println!("  Entries to add: {}", summary.entries_added);
        println!("  Would replace:  {}", summary.entries_replaced);
    } else {
        println!("  Entries added:  {}", summary.entries_added);
        println!("  Replaced:       {}", summary.entries_replaced);
    }

    Ok(())
}

/// Writes to `output`, `-` for stdout, or `weight_data_YYYYMMDD.<ext>` in the
/// current directory.
pub(crate) fn cmd_export(
    svc: &HeftService,
    user: &str,
    format: &str,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let format: ExportFormat = format.parse()?;

    if output.as_deref() == Some(Path::new("-")) {
        let stdout = std::io::stdout();
        svc.export(user, format, stdout.lock())?;
        return Ok(());
    }

    let path = output.unwrap_or_else(|| PathBuf::from(default_export_filename(format, today())));
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let count = svc.export(user, format, &mut out)?;
    out.flush()
        .with_context(|| format!("Failed to write file: {}", path.display()))?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "path": path.display().to_string(), "entries": count })
        );
    } else {
        println!("Exported {count} entries to {}", path.display());
    }

    Ok(())
}
