use anyhow::{anyhow, Context, Result};
use clap::Args;
use classdraft_common::{Content, HistoryEntry, HistoryEntryId};
use classdraft_editor::{try_reconstruct, HistoryLog, TimelineItem};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// History listing as returned by the store (newest first)
    pub history: PathBuf,

    /// Entry to reconstruct (defaults to the latest)
    #[arg(short, long)]
    pub entry: Option<u64>,
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let path = PathBuf::from(cwd).join(&args.history);
    let source = fs::read_to_string(&path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let entries: Vec<HistoryEntry> = serde_json::from_str(&source)
        .with_context(|| format!("{} is not a history listing", path.display()))?;

    let log = load_log(entries)?;

    println!(
        "{} {} ({} entries)",
        "History".bright_blue().bold(),
        log.document_id().to_string().bright_white(),
        log.len()
    );
    for item in log.timeline() {
        println!("  {}", format_item(&item));
    }
    println!();

    let target = match args.entry {
        Some(id) => HistoryEntryId(id),
        None => log
            .latest()
            .map(|entry| entry.id)
            .ok_or_else(|| anyhow!("history is empty"))?,
    };
    let content = reconstruct_entry(&log, target)?;

    println!(
        "{} entry {} ({} chars)",
        "Content at".green().bold(),
        target,
        content.char_count()
    );
    println!("{}", serde_json::to_string_pretty(content.as_value())?);
    let text = content.text();
    if !text.is_empty() {
        println!();
        println!("{}", text.dimmed());
    }

    Ok(())
}

pub fn load_log(entries: Vec<HistoryEntry>) -> Result<HistoryLog> {
    let document_id = entries
        .first()
        .map(|entry| entry.document_id.clone())
        .ok_or_else(|| anyhow!("history is empty"))?;
    Ok(HistoryLog::from_newest_first(document_id, entries)?)
}

pub fn reconstruct_entry(log: &HistoryLog, target: HistoryEntryId) -> Result<Content> {
    try_reconstruct(log.entries(), target)
        .with_context(|| format!("entry {} cannot be replayed", target))?
        .ok_or_else(|| anyhow!("entry {} is not in the history", target))
}

pub fn format_item(item: &TimelineItem) -> String {
    let delta = match item.char_delta {
        d if d > 0 => format!("+{}", d).green(),
        d if d < 0 => d.to_string().red(),
        _ => "±0".dimmed(),
    };
    let restored = match item.restored_from {
        Some(from) => format!(" (restored #{})", from),
        None => String::new(),
    };
    format!(
        "#{:<4} {}  {:<8} {:>6} chars {:>6}{}",
        item.id,
        item.created_at.format("%Y-%m-%d %H:%M:%S"),
        format!("{:?}", item.source).to_lowercase(),
        item.char_count,
        delta,
        restored
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use classdraft_common::{ContentPatch, HistoryPayload};

    fn listing() -> String {
        let first = Content::paragraph("one");
        let second = Content::paragraph("one two");
        serde_json::json!([
            {
                "id": 2,
                "document_id": "essay",
                "created_at": "2026-03-01T09:00:10Z",
                "char_count": 7,
                "source": "autosave",
                "payload": HistoryPayload::Delta { patch: ContentPatch::diff(&first, &second) }
            },
            {
                "id": 1,
                "document_id": "essay",
                "created_at": "2026-03-01T09:00:00Z",
                "char_count": 3,
                "source": "blur",
                "payload": HistoryPayload::Snapshot { content: first }
            }
        ])
        .to_string()
    }

    #[test]
    fn test_replay_reconstructs_each_entry() {
        let entries: Vec<HistoryEntry> = serde_json::from_str(&listing()).unwrap();
        let log = load_log(entries).unwrap();

        assert_eq!(
            reconstruct_entry(&log, HistoryEntryId(1)).unwrap(),
            Content::paragraph("one")
        );
        assert_eq!(
            reconstruct_entry(&log, HistoryEntryId(2)).unwrap(),
            Content::paragraph("one two")
        );
        assert!(reconstruct_entry(&log, HistoryEntryId(3)).is_err());
    }

    #[test]
    fn test_replay_command_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("history.json"), listing()).unwrap();

        let args = ReplayArgs {
            history: PathBuf::from("history.json"),
            entry: Some(1),
        };
        replay(args, dir.path().to_str().unwrap()).unwrap();
    }

    #[test]
    fn test_empty_history_is_an_error() {
        assert!(load_log(Vec::new()).is_err());
    }
}
