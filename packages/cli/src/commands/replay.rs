use super::{document_id, load_document, load_schema};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use folio_editor::{
    EditingSession, EditorConfig, ManualClock, MemoryBackend, Mutation, MutationOutcome, Point,
    SaveOutcome, SelectOrigin, SelectionState, SelectionTarget, SessionEvent, StaticLayout,
    SurfaceMetrics,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Document payload to edit (JSON)
    #[arg(short, long)]
    pub document: PathBuf,

    /// Component schemas (JSON list)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Script of editing steps (JSON list)
    #[arg(long)]
    pub script: PathBuf,

    /// Rendered geometry used for selection and scrolling (JSON)
    #[arg(short, long)]
    pub layout: Option<PathBuf>,

    /// Directory holding folio.config.json
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to write the final content (stdout if omitted)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// One scripted user action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    Select {
        node: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        #[serde(default = "default_origin")]
        origin: SelectOrigin,
    },
    SelectParent,
    Apply {
        mutation: Mutation,
    },
    Duplicate,
    Delete,
    Undo,
    Redo,
    /// Start editing the selection if needed, then replace its text
    EditText {
        text: String,
    },
    Format {
        format: String,
    },
    CommitEdit,
    CancelEdit,
    Metrics {
        metrics: SurfaceMetrics,
    },
    Zoom {
        zoom: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        anchor: Option<Point>,
    },
    Frame,
    Advance {
        ms: u64,
    },
    Save,
}

fn default_origin() -> SelectOrigin {
    SelectOrigin::Pointer
}

type Session = EditingSession<MemoryBackend, ManualClock>;

pub fn replay(args: ReplayArgs) -> Result<()> {
    let payload = load_document(&args.document)?;
    let schema = load_schema(&args.schema)?;
    let script: Vec<Step> = {
        let source = fs::read_to_string(&args.script)
            .with_context(|| format!("Cannot read script {}", args.script.display()))?;
        serde_json::from_str(&source)
            .with_context(|| format!("Invalid script {}", args.script.display()))?
    };
    let layout: StaticLayout = match &args.layout {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)
            .with_context(|| format!("Invalid layout {}", path.display()))?,
        None => StaticLayout::new(),
    };
    let config = match &args.config {
        Some(dir) => EditorConfig::load(dir)?,
        None => EditorConfig::default(),
    };

    let id = document_id(&args.document);
    let mut backend = MemoryBackend::new();
    backend.insert(id.clone(), payload);
    let clock = ManualClock::new();
    let mut session = EditingSession::open(&id, schema, backend, clock.clone(), config)?;

    session.subscribe(print_event);

    println!("🎬 {} {}", "Replaying".green().bold(), args.script.display());
    println!("   Document: {} ({} steps)", id, script.len());
    println!();

    for (index, step) in script.iter().enumerate() {
        println!("{} {:?}", format!("[{}]", index + 1).bright_blue(), step);
        run_step(&mut session, &clock, &layout, step)?;
        print_state(&session);
    }

    let content = serde_json::to_string_pretty(&session.document().payload(session.schema()))?;
    match &args.out {
        Some(path) => {
            fs::write(path, content)?;
            println!();
            println!("✨ {} Wrote {}", "Done".green().bold(), path.display());
        }
        None => {
            println!();
            println!("{}", content);
        }
    }

    println!(
        "   Saves: {}, unsaved changes: {}",
        session.backend().save_count(),
        session.has_unsaved_changes()?
    );

    Ok(())
}

fn run_step(session: &mut Session, clock: &ManualClock, layout: &StaticLayout, step: &Step) -> Result<()> {
    match step {
        Step::Select {
            node,
            region,
            origin,
        } => {
            let target = match region {
                Some(region) => SelectionTarget::region(node.clone(), region.clone()),
                None => SelectionTarget::node(node.clone()),
            };
            session.select_node(target, *origin, layout);
        }
        Step::SelectParent => {
            if !session.select_parent(layout) {
                println!("    {} No parent to select", "⚠️".yellow());
            }
        }
        Step::Apply { mutation } => report_outcome(&session.apply(mutation.clone())?),
        Step::Duplicate => report_optional(session.duplicate()?),
        Step::Delete => report_optional(session.delete()?),
        Step::Undo => {
            if !session.undo()? {
                println!("    {} Nothing to undo", "⚠️".yellow());
            }
        }
        Step::Redo => {
            if !session.redo()? {
                println!("    {} Nothing to redo", "⚠️".yellow());
            }
        }
        Step::EditText { text } => {
            if session.inline_edit().is_none() {
                session.enable_inline_edit()?;
            }
            session.inline_set_text(text)?;
        }
        Step::Format { format } => {
            if !session.inline_apply_format(format)? {
                println!("    {} Format {} not permitted here", "⚠️".yellow(), format);
            }
        }
        Step::CommitEdit => {
            session.commit_inline_edit();
        }
        Step::CancelEdit => {
            session.cancel_inline_edit();
        }
        Step::Metrics { metrics } => session.set_surface_metrics(*metrics),
        Step::Zoom { zoom, anchor } => session.set_zoom(*zoom, *anchor),
        Step::Frame => {
            session.on_animation_frame(layout);
        }
        Step::Advance { ms } => {
            clock.advance_ms(*ms);
            // A failed save is reported through the event stream
            if let Err(err) = session.poll() {
                println!("    {} {}", "✗".red(), err);
            }
        }
        Step::Save => match session.save_now()? {
            SaveOutcome::Saved { .. } => {}
            SaveOutcome::Unchanged => println!("    {} Nothing to save", "✓".green()),
        },
    }
    Ok(())
}

fn report_optional(outcome: Option<MutationOutcome>) {
    match outcome {
        Some(outcome) => report_outcome(&outcome),
        None => println!("    {} Nothing selected", "⚠️".yellow()),
    }
}

fn report_outcome(outcome: &MutationOutcome) {
    if let MutationOutcome::Rejected(reason) = outcome {
        println!("    {} Rejected: {:?}", "✗".red(), reason);
    }
}

fn print_event(event: &SessionEvent) {
    let line = match event {
        SessionEvent::SelectionChanged(selection) => format!("selection → {}", describe(selection)),
        SessionEvent::ContentChanged { version } => format!("content v{}", version),
        SessionEvent::HistoryChanged { can_undo, can_redo } => {
            format!("history undo={} redo={}", can_undo, can_redo)
        }
        SessionEvent::ViewportChanged(state) => format!(
            "viewport pan=({:.1}, {:.1}) zoom={:.2}",
            state.pan_x, state.pan_y, state.zoom
        ),
        SessionEvent::InlineEditStarted { node_id, target_id } => {
            format!("editing {} (target {})", node_id, target_id)
        }
        SessionEvent::InlineEditCommitted { node_id } => format!("committed {}", node_id),
        SessionEvent::InlineEditCancelled { node_id } => format!("cancelled {}", node_id),
        SessionEvent::Saved { at } => format!("saved at {}", at.to_rfc3339()),
        SessionEvent::SaveFailed { message } => {
            println!("    {} save failed: {}", "✗".red(), message);
            return;
        }
    };
    println!("    {} {}", "•".dimmed(), line.dimmed());
}

fn print_state(session: &Session) {
    let selection = session.selection();
    let history = session.history();
    println!(
        "    selection: {}  undo: {}  redo: {}",
        describe(selection).bright_white(),
        history.undo_levels().saturating_sub(1),
        history.redo_levels()
    );

    if selection.node().is_some() {
        let caps = session.capabilities();
        let flag = |on: bool, name: &str| {
            if on {
                name.green().to_string()
            } else {
                name.dimmed().to_string()
            }
        };
        println!(
            "    {} [{} {} {} {} {} {}]",
            caps.label,
            flag(caps.can_move_before, "↑"),
            flag(caps.can_move_after, "↓"),
            flag(caps.can_duplicate, "dup"),
            flag(caps.can_delete, "del"),
            flag(caps.can_format, "fmt"),
            flag(caps.can_select_parent, "parent"),
        );
    }
}

pub(crate) fn describe(selection: &SelectionState) -> String {
    match selection {
        SelectionState::None => "none".to_string(),
        SelectionState::Node { node } => node.clone(),
        SelectionState::Region { node, region } => format!("{}/{}", node, region),
    }
}
