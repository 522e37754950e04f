use super::{document_id, load_document, load_schema};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_common::{Node, COMMENT_TAG, SHADOW_ROOT_TAG};
use folio_editor::{capabilities, NodeType, ParentFallback, SchemaRegistry, SelectionState};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Document payload to inspect (JSON)
    #[arg(short, long)]
    pub document: PathBuf,

    /// Component schemas (JSON list)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Show text leaves
    #[arg(long)]
    pub text: bool,
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let payload = load_document(&args.document)?;
    let schema = load_schema(&args.schema)?;

    println!(
        "🔍 {} ({} top-level nodes, {} comments)",
        document_id(&args.document).bright_white().bold(),
        payload.content.len(),
        payload.comments.len()
    );
    println!();

    for root in &payload.content {
        print_node(&payload.content, &schema, root, 0, args.text);
    }

    Ok(())
}

fn print_node(roots: &[Node], schema: &SchemaRegistry, node: &Node, depth: usize, show_text: bool) {
    let indent = "  ".repeat(depth);

    match schema.classify(node) {
        NodeType::Text => {
            if show_text {
                println!("{}{:?}", indent, node.text.as_deref().unwrap_or_default());
            }
            return;
        }
        NodeType::Boundary => println!("{}{}", indent, SHADOW_ROOT_TAG.dimmed()),
        NodeType::Comment => {
            println!("{}{}", indent, COMMENT_TAG.dimmed());
            return;
        }
        NodeType::Plain => println!("{}{} {}", indent, node.tag, region_label(node)),
        NodeType::Component(provider) => {
            let regions = provider
                .regions()
                .into_iter()
                .map(|(name, region)| {
                    if region.is_container() {
                        format!("{}[{}]", name, region.normalized().allowed_tags.join(","))
                    } else {
                        format!("{}(text)", name)
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            println!(
                "{}{} {} {}",
                indent,
                provider.metadata().label.cyan().bold(),
                region_label(node),
                regions.dimmed()
            );
        }
    }

    if !node.is_boundary() {
        let selection = SelectionState::Node {
            node: node.id.clone(),
        };
        let caps = capabilities(roots, schema, &selection, &node.id, ParentFallback::default());
        let mut flags = Vec::new();
        if caps.can_move_before {
            flags.push("↑");
        }
        if caps.can_move_after {
            flags.push("↓");
        }
        if caps.can_duplicate {
            flags.push("dup");
        }
        if caps.can_delete {
            flags.push("del");
        }
        if caps.can_format {
            flags.push("fmt");
        }
        println!("{}  #{} {}", indent, node.id.bright_black(), flags.join(" ").green());
    }

    for child in &node.children {
        print_node(roots, schema, child, depth + 1, show_text);
    }
}

fn region_label(node: &Node) -> String {
    match &node.region {
        Some(region) => format!("@{}", region).yellow().to_string(),
        None => String::new(),
    }
}
