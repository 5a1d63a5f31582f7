//! Text rendering for `log`, `global-log` and `status`.

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use gitlet_core::{Commit, Modification, Status};
use std::fmt::Display;
use std::io::Write;

const DATE_FORMAT: &str = "%a %b %-d %H:%M:%S %Y %z";

/// Render a commit timestamp in `tz`
pub fn format_date<Tz>(timestamp: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.with_timezone(tz).format(DATE_FORMAT).to_string()
}

/// Write one log entry followed by a blank line.
pub fn write_log_entry<Tz>(writer: &mut dyn Write, commit: &Commit, tz: &Tz) -> Result<()>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    writeln!(writer, "===")?;
    writeln!(writer, "commit {}", commit.id())?;
    if let (Some(first), Some(second)) = (commit.parentage.first(), commit.parentage.second()) {
        writeln!(writer, "Merge: {} {}", first.short(), second.short())?;
    }
    writeln!(writer, "Date: {}", format_date(&commit.timestamp, tz))?;
    writeln!(writer, "{}", commit.message)?;
    writeln!(writer)?;
    Ok(())
}

fn write_section(
    writer: &mut dyn Write,
    title: &str,
    lines: impl IntoIterator<Item = String>,
) -> Result<()> {
    writeln!(writer, "=== {} ===", title)?;
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writeln!(writer)?;
    Ok(())
}

pub fn write_status(writer: &mut dyn Write, status: &Status) -> Result<()> {
    write_section(
        writer,
        "Branches",
        status.branches.iter().map(|name| {
            if *name == status.current_branch {
                format!("*{}", name)
            } else {
                name.clone()
            }
        }),
    )?;
    write_section(writer, "Staged Files", status.staged.iter().cloned())?;
    write_section(writer, "Removed Files", status.removed.iter().cloned())?;
    write_section(
        writer,
        "Modifications Not Staged For Commit",
        status.modified.iter().map(|(path, kind)| match kind {
            Modification::Modified => format!("{} (modified)", path),
            Modification::Deleted => format!("{} (deleted)", path),
        }),
    )?;
    write_section(writer, "Untracked Files", status.untracked.iter().cloned())?;
    Ok(())
}
