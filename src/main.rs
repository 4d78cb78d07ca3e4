//! PanelFlow CLI - validate configs and replay event scripts

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use panelflow::handler::StubHandler;
use panelflow::logging::{init_logging, LogConfig};
use panelflow::{
    load_config, Dispatcher, FixSuggestion, HandlerRegistry, IncomingEvent, OutgoingEvent,
    OutgoingKind, PanelFlowError, TreeSnapshot,
};

#[derive(Parser)]
#[command(name = "panelflow")]
#[command(about = "PanelFlow - state and navigation core for multi-panel applications")]
#[command(version)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a panel config (schema, references)
    Validate {
        /// Path to the YAML or JSON config
        file: PathBuf,
    },

    /// Post a script of events to a config and print what the engine emits
    Replay {
        /// Path to the YAML or JSON config
        file: PathBuf,

        /// YAML or JSON list of incoming events
        script: PathBuf,

        /// Register a no-op handler for every handler name in the config
        #[arg(long)]
        stub_handlers: bool,

        /// Print outgoing events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default().with_level(cli.log_level.clone());
    if let Some(file) = &cli.log_file {
        log_config = log_config.with_file(file.clone());
    }
    if let Err(e) = init_logging(&log_config) {
        eprintln!("{} {:#}", "Warning:".yellow().bold(), e);
    }

    let result = match cli.command {
        Commands::Validate { file } => validate_config(&file),
        Commands::Replay {
            file,
            script,
            stub_handlers,
            json,
        } => replay_script(&file, &script, stub_handlers, json),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = e
            .downcast_ref::<PanelFlowError>()
            .and_then(|pf| pf.fix_suggestion())
        {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn validate_config(file: &Path) -> anyhow::Result<()> {
    let registry = load_config(file)?;

    println!("{} Config '{}' is valid", "✓".green(), file.display());
    println!("  Entry panel: {}", registry.entry_panel_id());
    println!("  Panels: {}", registry.len());
    let widgets: usize = registry.panels().map(|p| p.widgets.len()).sum();
    println!("  Widgets: {}", widgets);

    let mut handlers: Vec<&str> = registry
        .handler_references()
        .into_iter()
        .map(|(_, name)| name)
        .collect();
    handlers.sort_unstable();
    handlers.dedup();
    if handlers.is_empty() {
        println!("  Handlers: (none)");
    } else {
        println!("  Handlers: {}", handlers.join(", "));
    }
    Ok(())
}

fn replay_script(
    file: &Path,
    script: &Path,
    stub_handlers: bool,
    json: bool,
) -> anyhow::Result<()> {
    let registry = load_config(file)?;
    let handlers = if stub_handlers {
        StubHandler::registry_for(registry.handler_references().into_iter().map(|(_, name)| name))
    } else {
        HandlerRegistry::new()
    };

    let source = fs::read_to_string(script)
        .map_err(|e| anyhow::anyhow!("Failed to read script {:?}: {}", script, e))?;
    let events: Vec<IncomingEvent> = serde_yaml::from_str(&source)
        .map_err(|e| anyhow::anyhow!("Invalid event script {:?}: {}", script, e))?;

    let mut app = Dispatcher::new(registry, handlers)?;

    let errors = Rc::new(Cell::new(0usize));
    for kind in [OutgoingKind::StateChanged, OutgoingKind::ErrorOccurred] {
        let errors = Rc::clone(&errors);
        app.subscribe(kind, move |event| {
            if matches!(event, OutgoingEvent::ErrorOccurred { .. }) {
                errors.set(errors.get() + 1);
            }
            print_event(event, json);
        });
    }

    if !json {
        println!("{} Replaying {} events", "→".cyan(), events.len());
        print_tree(&app.snapshot(), 1);
    }

    for (i, event) in events.into_iter().enumerate() {
        if !json {
            println!("{} #{} {}", "→".cyan(), i + 1, describe(&event).bold());
        }
        app.post_event(event);
    }

    if !json {
        let active = app.active_node();
        println!(
            "{} Active panel: {} ({} nodes, {} errors)",
            "✓".green(),
            active.panel_id().cyan().bold(),
            app.tree().len(),
            errors.get()
        );
    }
    Ok(())
}

fn describe(event: &IncomingEvent) -> String {
    match event {
        IncomingEvent::WidgetSubmitted { widget_id, value } => {
            format!("submit {} = {}", widget_id, value)
        }
        IncomingEvent::HorizontalNavigation { direction } => format!("horizontal {:?}", direction),
        IncomingEvent::VerticalNavigation { direction } => format!("vertical {:?}", direction),
        IncomingEvent::BackNavigation => "back".to_string(),
    }
}

fn print_event(event: &OutgoingEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
        return;
    }
    match event {
        OutgoingEvent::StateChanged { tree } => print_tree(tree, 1),
        OutgoingEvent::ErrorOccurred { title, message, .. } => {
            println!("  {} {}: {}", "✗".red(), title.red().bold(), message);
        }
    }
}

fn print_tree(node: &TreeSnapshot, depth: usize) {
    let indent = "  ".repeat(depth);
    let marker = if node.is_active { "*".green().bold().to_string() } else { " ".to_string() };
    let fields = if node.form_data.is_empty() {
        String::new()
    } else {
        format!(" {}", serde_json::Value::Object(node.form_data.clone()))
    };
    println!("{}{} {} {}{}", indent, marker, node.panel_id, node.node_id, fields.dimmed());
    for stack in &node.stacks {
        println!("{}  [{}]", indent, stack.widget_id.yellow());
        for child in &stack.nodes {
            print_tree(child, depth + 2);
        }
    }
}
