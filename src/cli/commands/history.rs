use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::clock::SystemClock;
use crate::history::{HistoryRecord, TranslationHistory};
use crate::ui::Style;

const PREVIEW_CHARS: usize = 60;

/// Opens the on-disk translation history.
pub fn open_history() -> Result<Arc<TranslationHistory>> {
    Ok(Arc::new(TranslationHistory::new(Arc::new(SystemClock))?))
}

pub fn list(limit: usize, search: Option<&str>) -> Result<()> {
    let history = open_history()?;
    let records = match search {
        Some(keyword) => history.search(keyword, limit),
        None => history.records(limit),
    };

    if records.is_empty() {
        println!("{}", Style::hint("No translations recorded yet"));
        return Ok(());
    }

    let now = SystemTime::now();
    for record in &records {
        print_record(record, now);
    }
    if search.is_none() && history.len() > records.len() {
        println!(
            "{}",
            Style::hint(format!("{} of {} shown", records.len(), history.len()))
        );
    }
    Ok(())
}

pub fn clear() -> Result<()> {
    let history = open_history()?;
    let removed = history.len();
    history.clear()?;

    println!(
        "{} Removed {removed} history record{}",
        Style::success("✓"),
        if removed == 1 { "" } else { "s" }
    );
    Ok(())
}

fn print_record(record: &HistoryRecord, now: SystemTime) {
    let age = now
        .duration_since(record.recorded_at())
        .unwrap_or(Duration::ZERO);
    println!(
        "{} {} {} {}",
        Style::label(format_age(age)),
        Style::code(format!("{} → {}", record.source_language, record.target_language)),
        Style::value(&record.model),
        Style::secondary(&record.skill)
    );
    println!("  {}", Style::secondary(preview(&record.source_text)));
    println!("  {}", preview(&record.translated_text));
    println!();
}

fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    match secs {
        0..60 => format!("{secs}s ago"),
        60..3_600 => format!("{}m ago", secs / 60),
        3_600..86_400 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// First line of `text`, cut to a fixed number of characters.
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut out: String = line.chars().take(PREVIEW_CHARS).collect();
    if out.len() < line.len() || text.lines().nth(1).is_some() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_age_picks_largest_unit() {
        assert_eq!(format_age(Duration::from_secs(5)), "5s ago");
        assert_eq!(format_age(Duration::from_secs(125)), "2m ago");
        assert_eq!(format_age(Duration::from_secs(7_200)), "2h ago");
        assert_eq!(format_age(Duration::from_secs(3 * 86_400)), "3d ago");
    }

    #[test]
    fn test_preview_cuts_long_and_multiline_text() {
        assert_eq!(preview("short"), "short");
        assert_eq!(preview("one\ntwo"), "one…");

        let long = "字".repeat(PREVIEW_CHARS + 10);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 1);
        assert!(cut.ends_with('…'));
    }
}
