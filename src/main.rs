use std::{io::Read, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::ConfigModule;
use futures::StreamExt;
use log::{error, info, warn};

use crate::{
    client::{ComfyClient, GenerationEvent},
    db::{AddMethod, DatabaseModule, NewWorkflow, WorkflowRecord, WorkflowUpdate},
    storage::ImageStorage,
    workflow::{Graph, InputValue, UuidGenerator},
};

mod client;
mod config;
mod db;
mod nodes;
mod preset;
mod storage;
mod workflow;

#[derive(Parser, Debug)]
struct CommandLineFlags {
    #[arg(long, short)]
    pub config_path: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a workflow in API format.
    Import {
        #[arg(long)]
        server: String,
        #[arg(long)]
        name: String,
        #[command(flatten)]
        source: ImportSource,
    },
    /// List stored workflows.
    List {
        #[arg(long)]
        server: Option<String>,
    },
    /// Show a workflow's nodes in display order.
    Show { workflow: String },
    /// Print a workflow in wire format.
    Export {
        workflow: String,
        #[arg(long)]
        compact: bool,
    },
    /// Set one node input. The value is parsed as JSON, falling back to a plain string.
    Set {
        workflow: String,
        node: String,
        input: String,
        value: String,
    },
    Rename { workflow: String, name: String },
    Remove { workflow: String },
    /// Import every workflow saved on a server, refreshing ones synced before.
    Sync { server: String },
    /// Remove every workflow synced from a server.
    ClearSynced { server: String },
    /// Show a server's queue, or change it.
    Queue {
        server: String,
        /// Stop the job that is running now.
        #[arg(long)]
        interrupt: bool,
        /// Prompt ids to drop from the pending queue.
        #[arg(long)]
        delete: Vec<String>,
        /// Drop everything that is pending.
        #[arg(long)]
        clear: bool,
    },
    /// Submit a workflow to its server and save the outputs.
    Run { workflow: String },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ImportSource {
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long)]
    url: Option<String>,
    /// TOML file with generation parameters for the built-in txt2img template.
    #[arg(long)]
    preset: Option<PathBuf>,
    /// Read the workflow from stdin, e.g. piped from the clipboard.
    #[arg(long)]
    stdin: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = CommandLineFlags::parse();

    // Immediately crash on panic.
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic: {:?}", panic_info);
        std::process::exit(1);
    }));

    // Initialize context.
    let config = ConfigModule::new(&args.config_path).context("failed to initialize config")?;
    info!("Loaded config from {}", config.path().display());
    let storage = config
        .with_config(|c| ImageStorage::new(&c.storage.root))
        .await;
    let db = DatabaseModule::new(config.clone(), Arc::new(storage.clone())).await?;

    match args.command {
        Command::Import { server, name, source } => {
            let server_id = config.with_config(|c| c.server(&server).map(|s| s.id.clone())).await?;
            let (data, add_method) = read_source(&config, &source).await?;
            let record = db
                .add_workflow(NewWorkflow {
                    name,
                    server_id,
                    data,
                    add_method,
                })
                .await?;
            println!("Imported {} ({} nodes) as {}", record.name, record.data.len(), record.id);
        }
        Command::List { server } => {
            for record in db.list_workflows(server.as_deref()).await? {
                println!(
                    "{}  {:<24} {:<10} {:>3} nodes  via {}",
                    record.id,
                    record.name,
                    record.server_id,
                    record.data.len(),
                    record.add_method
                );
            }
        }
        Command::Show { workflow } => {
            let record = db.find_workflow(&workflow).await?;
            print!("{}", describe(&record));
            let outputs = storage.list_outputs(&record.server_id, &record.id)?;
            if let Some(latest) = outputs.last() {
                println!("{} saved outputs, latest {}", outputs.len(), latest.display());
            }
        }
        Command::Export { workflow, compact } => {
            let record = db.find_workflow(&workflow).await?;
            let text = if compact {
                record.data.to_json()?
            } else {
                record.data.to_json_pretty()?
            };
            println!("{}", text);
        }
        Command::Set { workflow, node, input, value } => {
            let record = db.find_workflow(&workflow).await?;
            let Some(target) = record.data.node(&node) else {
                bail!("Workflow {} has no node {}", record.name, node);
            };
            let value = parse_value(&value);
            let editor = nodes::editor_for(&target.type_tag);
            editor.validate(&input, &value)?;
            if let Some(folder) = editor.model_folder(&input) {
                check_model(&config, &record.server_id, folder, &input, &value).await?;
            }
            if db.update_node_input(&record.id, &node, &input, value).await? {
                println!("Updated {}.{}", node, input);
            } else {
                println!("{}.{} already has that value", node, input);
            }
        }
        Command::Rename { workflow, name } => {
            let record = db.find_workflow(&workflow).await?;
            let update = WorkflowUpdate {
                name: Some(name),
                ..Default::default()
            };
            db.update_workflow(&record.id, update).await?;
        }
        Command::Remove { workflow } => {
            let record = db.find_workflow(&workflow).await?;
            db.remove_workflow(&record.id).await?;
            println!("Removed {}", record.name);
        }
        Command::Sync { server } => {
            let client = connect(&config, &server).await?;
            sync(&client, &db).await?;
        }
        Command::Queue {
            server,
            interrupt,
            delete,
            clear,
        } => {
            let client = connect(&config, &server).await?;
            if interrupt {
                client.interrupt(None).await?;
            }
            if !delete.is_empty() {
                client.delete_queue_items(&delete).await?;
            }
            if clear {
                client.clear_queue().await?;
            }
            let queue = client.queue().await?;
            for entry in &queue.running {
                println!("running  #{} {}", entry.number, entry.prompt_id);
            }
            for entry in &queue.pending {
                println!("pending  #{} {}", entry.number, entry.prompt_id);
            }
            if queue.running.is_empty() && queue.pending.is_empty() {
                println!("Queue is empty");
            }
        }
        Command::ClearSynced { server } => {
            let removed = db.clear_server_synced_workflows(&server).await?;
            println!("Removed {} synced workflows", removed);
        }
        Command::Run { workflow } => {
            let record = db.find_workflow(&workflow).await?;
            run(&config, &db, &storage, &record).await?;
        }
    }
    Ok(())
}

async fn read_source(config: &ConfigModule, source: &ImportSource) -> Result<(Graph, AddMethod)> {
    let (raw, add_method) = if let Some(path) = &source.file {
        let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        (raw, AddMethod::File)
    } else if let Some(url) = &source.url {
        let timeout = config.with_config(|c| c.backend.request_timeout_secs).await;
        let raw = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?
            .get(url)
            .send()
            .await
            .context("failed to fetch workflow")?
            .error_for_status()
            .context("failed to fetch workflow")?
            .text()
            .await
            .context("failed to read workflow")?;
        (raw, AddMethod::Url)
    } else if let Some(path) = &source.preset {
        let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let params: preset::GenerationParams = toml::from_str(&text).context("failed to parse preset parameters")?;
        let graph = preset::create_preset(&params, &mut UuidGenerator, &mut rand::thread_rng());
        return Ok((graph, AddMethod::Preset));
    } else {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw).context("failed to read stdin")?;
        (raw, AddMethod::Clipboard)
    };

    let parsed = workflow::parse(&raw, &mut UuidGenerator).context("failed to import workflow")?;
    for warning in &parsed.warnings {
        println!("warning: {}", warning);
    }
    if parsed.graph.is_empty() {
        bail!("No usable nodes in workflow");
    }
    Ok((parsed.graph, add_method))
}

async fn connect(config: &ConfigModule, server: &str) -> Result<ComfyClient> {
    let config = config.snapshot().await;
    let server = config.server(server)?.clone();
    ComfyClient::new(server, &config.backend, config.client_id())
}

/// Checks a model file name against the server's model folder. Skipped, with a warning, when
/// the server can't list that folder.
async fn check_model(config: &ConfigModule, server: &str, folder: &str, input: &str, value: &InputValue) -> Result<()> {
    let client = connect(config, server).await?;
    match client.models(folder).await {
        Ok(models) if !models.is_empty() => nodes::validate_model(input, value, &models),
        Ok(_) => {
            warn!("Server {} lists no models in {}, not checking {}", server, folder, input);
            Ok(())
        }
        Err(e) => {
            warn!("Couldn't list {} on {}, not checking {}: {:?}", folder, server, input, e);
            Ok(())
        }
    }
}

/// Name a synced workflow is stored under.
fn synced_name(filename: &str) -> &str {
    filename.strip_suffix(".json").unwrap_or(filename)
}

async fn sync(client: &ComfyClient, db: &DatabaseModule) -> Result<()> {
    let server_id = client.server_id().to_owned();
    let files = client.list_workflows().await?;
    let (mut added, mut refreshed, mut failed) = (0, 0, 0);
    for file in files {
        let graph = match client.fetch_workflow(&file.filename).await {
            Ok(converted) => serde_json::to_string(&converted)
                .context("failed to serialize workflow")
                .and_then(|raw| workflow::parse(&raw, &mut UuidGenerator).context("failed to parse workflow")),
            Err(e) => Err(e),
        };
        let parsed = match graph {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping {}: {:?}", file.filename, e);
                failed += 1;
                continue;
            }
        };
        for warning in &parsed.warnings {
            println!("warning: {}: {}", file.filename, warning);
        }
        if parsed.graph.is_empty() {
            warn!("Skipping {}: no usable nodes", file.filename);
            failed += 1;
            continue;
        }
        if db.sync_workflow(&server_id, synced_name(&file.filename), parsed.graph).await? {
            added += 1;
        } else {
            refreshed += 1;
        }
    }
    println!("Synced from {}: {} new, {} refreshed, {} failed", server_id, added, refreshed, failed);
    Ok(())
}

fn parse_value(text: &str) -> InputValue {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => InputValue::from(value),
        Err(_) => InputValue::from(text),
    }
}

fn format_value(value: &InputValue) -> String {
    match value {
        InputValue::Link(link) => format!("-> {}", link),
        InputValue::Literal(value) => value.to_string(),
    }
}

fn describe(record: &WorkflowRecord) -> String {
    let mut out = format!("{} ({}) on {}\n", record.name, record.id, record.server_id);
    for node in record.data.display_order() {
        let editor = nodes::editor_for(&node.type_tag);
        let status = if !nodes::is_supported(&node.type_tag) {
            " [unsupported]"
        } else if editor.is_read_only() {
            " [read-only]"
        } else {
            ""
        };
        let title = node.title().map(|t| format!(" \"{}\"", t)).unwrap_or_default();
        out += &format!("#{} {}{}{}\n", node.external_key, node.type_tag, title, status);
        for (name, value) in &node.inputs {
            let marker = if editor.input(name).is_some() { "*" } else { " " };
            out += &format!("  {} {} = {}\n", marker, name, format_value(value));
        }
    }
    for (node, input, link) in record.data.dangling_links() {
        out += &format!("warning: #{}.{} links to missing node {}\n", node, input, link.node);
    }
    out
}

async fn run(config: &ConfigModule, db: &DatabaseModule, storage: &ImageStorage, record: &WorkflowRecord) -> Result<()> {
    let client = connect(config, &record.server_id).await?;

    let events = client.generate(&record.data);
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        match event {
            GenerationEvent::Queued { prompt_id, number } => println!("Queued as #{} ({})", number, prompt_id),
            GenerationEvent::NodeStarted(node) => info!("Executing node {}", node),
            GenerationEvent::NodeCompleted { completed, total, .. } => println!("Nodes: {}/{}", completed, total),
            GenerationEvent::Progress { value, max } => println!("Progress: {}/{}", value, max),
            GenerationEvent::Completed(images) => {
                if images.is_empty() {
                    warn!("Workflow {} produced no images", record.name);
                }
                for image in images {
                    let data = client.download(&image).await?;
                    let path = storage.save_output(&record.server_id, &record.id, &image.filename, &data)?;
                    println!("Saved {}", path.display());
                }
            }
            GenerationEvent::Error(e) => return Err(e.context(format!("failed to run {}", record.name))),
        }
    }
    db.update_usage(&record.id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::workflow::NodeLink;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("20"), InputValue::from(json!(20)));
        assert_eq!(parse_value("\"20\""), InputValue::from("20"));
        assert_eq!(parse_value("b.safetensors"), InputValue::from("b.safetensors"));
        assert_eq!(parse_value(r#"["3", 1]"#), InputValue::from(NodeLink { node: "3".to_string(), slot: 1 }));
    }

    #[test]
    fn test_describe() {
        let raw = r#"{
            "10": {"class_type": "MysteryNode", "inputs": {"x": ["99", 0]}},
            "2": {"class_type": "VAEDecode", "inputs": {"samples": ["1", 0]}},
            "1": {"class_type": "CheckpointLoaderSimple", "inputs": {"ckpt_name": "a.safetensors"}, "_meta": {"title": "Load"}}
        }"#;
        let record = WorkflowRecord {
            id: "wf".to_string(),
            name: "test".to_string(),
            server_id: "local".to_string(),
            data: workflow::parse(raw, &mut UuidGenerator).unwrap().graph,
            add_method: AddMethod::File,
            created_at: 0,
            last_used: None,
        };
        assert_eq!(
            describe(&record),
            "test (wf) on local\n\
             #1 CheckpointLoaderSimple \"Load\"\n\
             \x20 * ckpt_name = \"a.safetensors\"\n\
             #2 VAEDecode [read-only]\n\
             \x20   samples = -> 1#0\n\
             #10 MysteryNode [unsupported]\n\
             \x20   x = -> 99#0\n\
             warning: #10.x links to missing node 99\n"
        );
    }

    #[test]
    fn test_synced_name() {
        assert_eq!(synced_name("portrait.json"), "portrait");
        assert_eq!(synced_name("notes"), "notes");
    }

    #[test]
    fn test_queue_flags() {
        let flags = CommandLineFlags::try_parse_from([
            "comfy-portal", "-c", "config.toml", "queue", "local", "--delete", "p1", "--delete", "p2", "--interrupt",
        ])
        .unwrap();
        let Command::Queue { server, interrupt, delete, clear } = flags.command else {
            panic!("expected the queue command");
        };
        assert_eq!(server, "local");
        assert!(interrupt);
        assert!(!clear);
        assert_eq!(delete, vec!["p1".to_string(), "p2".to_string()]);
    }

    #[test]
    fn test_flags() {
        let flags = CommandLineFlags::try_parse_from([
            "comfy-portal", "-c", "config.toml", "import", "--server", "local", "--name", "a", "--file", "a.json",
        ])
        .unwrap();
        assert!(matches!(flags.command, Command::Import { .. }));
        // Exactly one source.
        assert!(CommandLineFlags::try_parse_from([
            "comfy-portal", "-c", "config.toml", "import", "--server", "local", "--name", "a",
        ])
        .is_err());
        assert!(CommandLineFlags::try_parse_from([
            "comfy-portal", "-c", "config.toml", "import", "--server", "local", "--name", "a", "--file", "a", "--stdin",
        ])
        .is_err());
    }
}
