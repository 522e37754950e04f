use super::replay::Step;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_common::Node;
use folio_editor::{
    DeclarativeSchema, DocumentPayload, EditorConfig, EmptyPlaceholderPolicy, Mutation, Rect,
    RegionDescriptor, SelectOrigin, StaticLayout, DEFAULT_CONFIG_NAME,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Drop empty placeholder children when an inline edit commits
    #[arg(long)]
    pub remove_empty_placeholders: bool,

    /// Force overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs) -> Result<()> {
    let config_path = args.dir.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Folio workspace...".bright_blue().bold());

    if !args.dir.exists() {
        fs::create_dir_all(&args.dir)?;
        println!("  {} Created {}/", "✓".green(), args.dir.display());
    }

    let mut config = EditorConfig::default();
    if args.remove_empty_placeholders {
        config.inline_edit.empty_placeholder = EmptyPlaceholderPolicy::Remove;
    }
    write_json(&config_path, &config)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    write_sample(&args.dir.join("schema.json"), &sample_schema(), args.force)?;
    write_sample(&args.dir.join("home.json"), &sample_document(), args.force)?;
    write_sample(&args.dir.join("layout.json"), &sample_layout(), args.force)?;
    write_sample(&args.dir.join("script.json"), &sample_script(), args.force)?;

    println!();
    println!("{}", "✅ Workspace initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: folio inspect --document home.json --schema schema.json");
    println!("  2. Run: folio replay --document home.json --schema schema.json --script script.json --layout layout.json");

    Ok(())
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn write_sample(path: &Path, value: &impl Serialize, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    write_json(path, value)?;
    if let Some(name) = path.file_name() {
        println!("  {} Created {}", "✓".green(), name.to_string_lossy());
    }
    Ok(())
}

fn sample_schema() -> Vec<DeclarativeSchema> {
    vec![
        DeclarativeSchema::new("hero", "Hero")
            .with_region("title", RegionDescriptor::text(["bold", "italic"]))
            .with_region(
                "default",
                RegionDescriptor::container(["p", "button"]).with_max_length(3),
            )
            .with_default("data-variant", "wide"),
        DeclarativeSchema::new("column", "Column")
            .with_region("default", RegionDescriptor::container(["p"]).with_multiline()),
    ]
}

fn sample_document() -> DocumentPayload {
    DocumentPayload {
        content: vec![Node::element("page", "main").with_children([
            Node::element("hero", "hero").with_children([
                Node::element("hero-title", "h1")
                    .in_region("title")
                    .with_child(Node::text_node("hero-title-text", "Welcome")),
                Node::element("hero-intro", "p")
                    .with_child(Node::text_node("hero-intro-text", "Start here")),
            ]),
            Node::element("column", "column"),
        ])],
        comments: Vec::new(),
    }
}

fn sample_layout() -> StaticLayout {
    StaticLayout::new()
        .with_node("page", Rect::new(0.0, 0.0, 1200.0, 900.0))
        .with_node("hero", Rect::new(40.0, 40.0, 800.0, 320.0))
        .with_region("hero", "title", Rect::new(40.0, 40.0, 800.0, 80.0))
        .with_region("hero", "default", Rect::new(40.0, 120.0, 800.0, 240.0))
        .with_node("hero-intro", Rect::new(40.0, 120.0, 800.0, 40.0))
        .with_node("column", Rect::new(40.0, 400.0, 800.0, 200.0))
}

fn sample_script() -> Vec<Step> {
    vec![
        Step::Select {
            node: "hero".to_string(),
            region: Some("title".to_string()),
            origin: SelectOrigin::TreePanel,
        },
        Step::EditText {
            text: "Hello, Folio".to_string(),
        },
        Step::CommitEdit,
        Step::Select {
            node: "hero-intro".to_string(),
            region: None,
            origin: SelectOrigin::Pointer,
        },
        Step::Duplicate,
        Step::Advance { ms: 300 },
        Step::Apply {
            mutation: Mutation::RemoveNode {
                node_id: "hero-intro".to_string(),
            },
        },
        Step::Advance { ms: 300 },
        Step::Undo,
        Step::Advance { ms: 1500 },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_editor::SchemaRegistry;

    #[test]
    fn test_init_writes_loadable_files() {
        let dir = tempfile::tempdir().unwrap();
        init(InitArgs {
            dir: dir.path().to_path_buf(),
            remove_empty_placeholders: true,
            force: false,
        })
        .unwrap();

        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config.inline_edit.empty_placeholder, EmptyPlaceholderPolicy::Remove);

        let schema = fs::read_to_string(dir.path().join("schema.json")).unwrap();
        assert_eq!(SchemaRegistry::from_json(&schema).unwrap().len(), 2);

        let script = fs::read_to_string(dir.path().join("script.json")).unwrap();
        let steps: Vec<Step> = serde_json::from_str(&script).unwrap();
        assert_eq!(steps.len(), 10);
        assert!(dir.path().join("layout.json").exists());
    }
}
