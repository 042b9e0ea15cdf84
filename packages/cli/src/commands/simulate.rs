use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use classdraft_common::{Content, DocumentId, DocumentKind, HistoryEntry, SaveTrigger};
use classdraft_editor::{Decision, HistoryLog, PersistenceClient, SaveScheduler, SchedulerConfig};
use classdraft_store::{HistoryStrategy, MemoryStore};
use colored::Colorize;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Timed edit script: [{ "atMs": 0, "edit": {...} } | { "atMs": 500, "blur": true }]
    pub script: PathBuf,

    /// Save profile to schedule with
    #[arg(short, long, default_value = "response")]
    pub profile: String,
}

/// One step of an edit script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    pub at_ms: u64,

    #[serde(default)]
    pub edit: Option<Content>,

    #[serde(default)]
    pub blur: bool,
}

/// A save call made during a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedSave {
    pub at_ms: u64,
    pub seq: u64,
    pub trigger: SaveTrigger,
    pub content: Content,
}

#[derive(Debug)]
pub struct SimulationReport {
    pub saves: Vec<IssuedSave>,
    pub entries: Vec<HistoryEntry>,
}

pub async fn simulate(args: SimulateArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let timings = config.profile(&args.profile)?;

    let path = PathBuf::from(cwd).join(&args.script);
    let source = fs::read_to_string(&path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let steps: Vec<ScriptStep> = serde_json::from_str(&source)
        .with_context(|| format!("{} is not an edit script", path.display()))?;

    println!(
        "{} {} steps with profile {} (debounce {} ms, min interval {} ms)",
        "Simulating".bright_blue().bold(),
        steps.len(),
        args.profile.cyan(),
        timings.debounce_ms,
        timings.min_interval_ms
    );
    println!();

    let report = run_script(&steps, timings, config.history_strategy()).await?;

    for save in &report.saves {
        println!(
            "  {} save #{} {:<8} {} chars",
            format!("[{:>8.3}s]", save.at_ms as f64 / 1000.0).dimmed(),
            save.seq,
            save.trigger.to_string(),
            save.content.char_count()
        );
    }

    let edits = steps.iter().filter(|step| step.edit.is_some()).count();
    println!();
    println!(
        "{} {} edits coalesced into {} saves",
        "Done".green().bold(),
        edits,
        report.saves.len()
    );

    if let Some(first) = report.entries.first() {
        let mut listing = report.entries.clone();
        listing.reverse();
        let log = HistoryLog::from_newest_first(first.document_id.clone(), listing)?;
        println!();
        for item in log.timeline() {
            println!("  {}", super::replay::format_item(&item));
        }
    }

    Ok(())
}

/// Drive a scheduler through `steps` on a virtual clock against an
/// in-memory store, flushing once after the last step
pub async fn run_script(
    steps: &[ScriptStep],
    timings: SchedulerConfig,
    strategy: HistoryStrategy,
) -> Result<SimulationReport> {
    validate(steps)?;

    let store = MemoryStore::new(strategy);
    let document_id = DocumentId::new("simulation");
    store
        .create_document(document_id.clone(), DocumentKind::AssignmentResponse)
        .await?;

    let start = Instant::now();
    let mut scheduler = SaveScheduler::new(document_id.clone(), timings, Content::empty());
    let mut saves = Vec::new();
    let mut run = Run {
        store: &store,
        document_id: &document_id,
        start,
        saves: &mut saves,
    };

    let mut now = start;
    for step in steps {
        now = start + Duration::from_millis(step.at_ms);
        run.fire_until(&mut scheduler, now).await?;

        if let Some(content) = &step.edit {
            scheduler.notify_edit(content.clone(), now);
        }
        if step.blur {
            let decision = scheduler.flush(SaveTrigger::Blur, now);
            run.apply(&mut scheduler, decision, now).await?;
        }
    }

    // Let pending timers run out, then flush as on exit
    while let Some(deadline) = scheduler.next_deadline() {
        now = deadline;
        run.fire_until(&mut scheduler, now).await?;
    }
    let decision = scheduler.flush(SaveTrigger::Force, now);
    run.apply(&mut scheduler, decision, now).await?;

    Ok(SimulationReport {
        saves,
        entries: store.entries(&document_id).await?,
    })
}

fn validate(steps: &[ScriptStep]) -> Result<()> {
    let mut previous = 0;
    for (index, step) in steps.iter().enumerate() {
        if step.edit.is_some() == step.blur {
            return Err(anyhow!(
                "step {} must have exactly one of \"edit\" or \"blur\"",
                index
            ));
        }
        if step.at_ms < previous {
            return Err(anyhow!("step {} goes back in time", index));
        }
        previous = step.at_ms;
    }
    Ok(())
}

struct Run<'a> {
    store: &'a MemoryStore,
    document_id: &'a DocumentId,
    start: Instant,
    saves: &'a mut Vec<IssuedSave>,
}

impl Run<'_> {
    /// Fire every deadline due at or before `until`, in order
    async fn fire_until(&mut self, scheduler: &mut SaveScheduler, until: Instant) -> Result<()> {
        while let Some(deadline) = scheduler.next_deadline() {
            if deadline > until {
                break;
            }
            let decision = scheduler.poll(deadline);
            self.apply(scheduler, decision, deadline).await?;
        }
        Ok(())
    }

    async fn apply(
        &mut self,
        scheduler: &mut SaveScheduler,
        decision: Decision,
        at: Instant,
    ) -> Result<()> {
        let Decision::Issue(ticket) = decision else {
            return Ok(());
        };

        self.saves.push(IssuedSave {
            at_ms: (at - self.start).as_millis() as u64,
            seq: ticket.seq,
            trigger: ticket.request.trigger,
            content: ticket.request.content.clone(),
        });

        match self.store.save(self.document_id, ticket.request).await {
            Ok(_) => {
                scheduler.complete_success(ticket.seq);
            }
            Err(err) => {
                tracing::warn!(seq = ticket.seq, error = %err, "simulated save failed");
                scheduler.complete_failure(ticket.seq);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classdraft_editor::{reconstruct, SaveProfile};

    fn edit(at_ms: u64, text: &str) -> ScriptStep {
        ScriptStep {
            at_ms,
            edit: Some(Content::paragraph(text)),
            blur: false,
        }
    }

    fn blur(at_ms: u64) -> ScriptStep {
        ScriptStep {
            at_ms,
            edit: None,
            blur: true,
        }
    }

    #[tokio::test]
    async fn test_throttle_scenario() {
        let steps = vec![edit(0, "A"), edit(4_000, "B"), edit(8_000, "C")];
        let report = run_script(&steps, SaveProfile::Response.config(), HistoryStrategy::Snapshot)
            .await
            .unwrap();

        let timeline: Vec<(u64, Content)> = report
            .saves
            .iter()
            .map(|save| (save.at_ms, save.content.clone()))
            .collect();
        assert_eq!(
            timeline,
            vec![
                (3_000, Content::paragraph("A")),
                (13_000, Content::paragraph("C")),
            ]
        );

        assert_eq!(report.entries.len(), 2);
        let h1 = report.entries[0].id;
        let h2 = report.entries[1].id;
        assert_eq!(reconstruct(&report.entries, h1), Some(Content::paragraph("A")));
        assert_eq!(reconstruct(&report.entries, h2), Some(Content::paragraph("C")));
    }

    #[tokio::test]
    async fn test_blur_saves_immediately() {
        let steps = vec![edit(0, "draft"), blur(500)];
        let report = run_script(&steps, SaveProfile::Response.config(), HistoryStrategy::Snapshot)
            .await
            .unwrap();

        assert_eq!(report.saves.len(), 1);
        assert_eq!(report.saves[0].at_ms, 500);
        assert_eq!(report.saves[0].trigger, SaveTrigger::Blur);
    }

    #[tokio::test]
    async fn test_last_edit_is_always_saved() {
        // Bursts of five quick edits separated by pauses longer than the debounce
        let steps: Vec<ScriptStep> = (0..40)
            .map(|i| edit(i * 1_500 + (i / 5) * 6_000, &"x".repeat(i as usize + 1)))
            .collect();
        let report = run_script(
            &steps,
            SaveProfile::Instructions.config(),
            HistoryStrategy::Delta { keyframe_every: 4 },
        )
        .await
        .unwrap();

        let last = report.saves.last().unwrap();
        assert_eq!(last.content, Content::paragraph("x".repeat(40)));

        assert!(report.saves.len() > 1);
        // No two saves closer than the min interval
        for pair in report.saves.windows(2) {
            assert!(pair[1].at_ms - pair[0].at_ms >= 15_000, "{:?}", pair);
        }

        let latest = report.entries.last().unwrap().id;
        assert_eq!(
            reconstruct(&report.entries, latest),
            Some(Content::paragraph("x".repeat(40)))
        );
    }

    #[test]
    fn test_script_steps_are_validated() {
        let both = ScriptStep {
            at_ms: 0,
            edit: Some(Content::empty()),
            blur: true,
        };
        assert!(validate(&[both]).is_err());
        assert!(validate(&[edit(100, "a"), edit(50, "b")]).is_err());
        assert!(validate(&[edit(0, "a"), blur(0)]).is_ok());
    }

    #[test]
    fn test_script_json_shape() {
        let steps: Vec<ScriptStep> = serde_json::from_str(
            r#"[{ "atMs": 0, "edit": "hello" }, { "atMs": 250, "blur": true }]"#,
        )
        .unwrap();
        assert_eq!(steps, vec![
            ScriptStep { at_ms: 0, edit: Some(Content::from("hello")), blur: false },
            blur(250),
        ]);
    }
}
