use crate::core::file_selector::{load_selected_files, load_tree_files, run_selector, tree_root};
use crate::core::presets::{PRESET_PROMPTS, find_preset};
use crate::core::selection::{Session, normalize_path};
use crate::core::suggestions::suggest;
use crate::core::token_estimator::format_token_count;
use crate::core::tree_renderer::render_path_tree;
use crate::domain::errors::SelectionError;
use crate::domain::models::{CompiledDocument, ComposeConfig, FileTreeNode, PromptPayload};
use crate::infra::file_service::{FileService, HttpFileService};
use crate::infra::file_system::{DEFAULT_EXCLUDES, LocalFileService};
use crate::infra::logger::setup_logger;
use crate::infra::output::{OutputTarget, write_output};
use crate::infra::prompt_store::PromptStore;
use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "super-prompt")]
#[command(
    about = "Combine system instructions, a prompt and project files into one LLM prompt",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Base URL of the Super Prompt backend
    #[arg(
        long,
        env = "SUPER_PROMPT_API_URL",
        default_value = HttpFileService::DEFAULT_BASE_URL,
        global = true
    )]
    pub api_url: String,

    /// Location of the saved system prompt
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a prompt from selected files
    Compile {
        /// Project directory (remote directory with --remote)
        #[arg(long, default_value = ".")]
        path: String,

        /// Include this file; repeatable. Skips the interactive picker.
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<String>,

        #[arg(long, default_value = DEFAULT_EXCLUDES)]
        exclude: String,

        /// Include every file under --path
        #[arg(long)]
        auto: bool,

        #[arg(long, conflicts_with_all = ["system_file", "preset"])]
        system: Option<String>,

        #[arg(long, conflicts_with = "preset")]
        system_file: Option<PathBuf>,

        /// Use a built-in system prompt (see `system-prompt presets`)
        #[arg(long)]
        preset: Option<String>,

        #[arg(long)]
        prompt: Option<String>,

        #[arg(long, conflicts_with = "prompt")]
        prompt_file: Option<PathBuf>,

        /// Add a project-structure section
        #[arg(long)]
        tree: bool,

        /// Read files from the backend instead of the local disk
        #[arg(long)]
        remote: bool,

        /// Let the backend compile the prompt
        #[arg(long)]
        server: bool,

        #[arg(long)]
        output: Option<String>,

        #[arg(long)]
        clipboard: bool,
    },

    /// Inspect and change the backend file store
    Files {
        /// Serve from this local directory instead of the backend
        #[arg(long, value_name = "DIR")]
        local: Option<String>,

        #[command(subcommand)]
        action: FilesAction,
    },

    /// Suggest improvements for a prompt
    Suggest {
        #[arg(long)]
        prompt: String,

        /// Ask the backend instead of the built-in rules
        #[arg(long)]
        server: bool,
    },

    /// Manage the saved system prompt
    SystemPrompt {
        #[command(subcommand)]
        action: SystemPromptAction,
    },
}

#[derive(Subcommand)]
pub enum FilesAction {
    Cwd,
    List,
    Content {
        path: String,
    },
    Tree {
        #[arg(default_value = "")]
        path: String,

        #[arg(long)]
        json: bool,
    },
    Upload {
        file: PathBuf,
    },
    Delete {
        path: String,
    },
}

#[derive(Subcommand)]
pub enum SystemPromptAction {
    Save { text: String },
    Load,
    Clear,
    Presets,
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logger(cli.verbose)?;

    match cli.command {
        Commands::Compile {
            path,
            files,
            exclude,
            auto,
            system,
            system_file,
            preset,
            prompt,
            prompt_file,
            tree,
            remote,
            server,
            output,
            clipboard,
        } => {
            info!("Starting compile command");
            debug!(
                "Command parameters: path={}, files={:?}, exclude={}, auto={}, tree={}, remote={}, server={}, output={:?}",
                path, files, exclude, auto, tree, remote, server, output
            );

            let store = open_store(cli.store);
            let config = ComposeConfig {
                root_path: path,
                files,
                exclude_patterns: split_patterns(&exclude),
                system_prompt: resolve_system_prompt(system, system_file, preset, store.as_ref())?,
                main_prompt: resolve_main_prompt(prompt, prompt_file)?,
                include_tree: tree,
                auto_select: auto,
                remote,
                server_compile: server,
                output_path: output,
                clipboard_output: clipboard,
            };

            match compile(&config, &cli.api_url) {
                Err(e)
                    if e.downcast_ref::<SelectionError>()
                        == Some(&SelectionError::UserCancelled) =>
                {
                    info!("Selection cancelled, nothing written");
                    Ok(())
                }
                result => result,
            }
        }
        Commands::Files { local, action } => {
            let service = connect(
                local.is_none(),
                &cli.api_url,
                local.as_deref().unwrap_or("."),
                split_patterns(DEFAULT_EXCLUDES),
            )?;
            files_command(service.as_ref(), local.is_none(), action)
        }
        Commands::Suggest { prompt, server } => {
            let suggestions = if server {
                let service = HttpFileService::new(&cli.api_url)?;
                service.suggestions(&PromptPayload::new("", &prompt, &[]))?
            } else {
                suggest(&prompt)
            };

            if suggestions.is_empty() {
                println!("No suggestions, the prompt covers the basics.");
            }
            for suggestion in suggestions {
                println!("- {}", suggestion);
            }
            Ok(())
        }
        Commands::SystemPrompt { action } => system_prompt_command(open_store(cli.store), action),
    }
}

fn split_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn open_store(path: Option<PathBuf>) -> Option<PromptStore> {
    path.or_else(PromptStore::default_location).map(PromptStore::new)
}

/// Flag, file or preset, in that order; otherwise the saved prompt, if any.
fn resolve_system_prompt(
    system: Option<String>,
    system_file: Option<PathBuf>,
    preset: Option<String>,
    store: Option<&PromptStore>,
) -> anyhow::Result<String> {
    if let Some(text) = system {
        return Ok(text);
    }
    if let Some(path) = system_file {
        return fs::read_to_string(&path)
            .with_context(|| format!("Failed to read system prompt from {}", path.display()));
    }
    if let Some(key) = preset {
        return find_preset(&key)
            .map(|p| p.prompt.to_string())
            .ok_or_else(|| anyhow::anyhow!("Unknown preset '{}'", key));
    }

    match store.map(PromptStore::load) {
        Some(Ok(Some(saved))) => {
            info!("Using saved system prompt");
            Ok(saved)
        }
        Some(Err(e)) => {
            warn!("Ignoring saved system prompt: {}", e);
            Ok(String::new())
        }
        _ => Ok(String::new()),
    }
}

fn resolve_main_prompt(
    prompt: Option<String>,
    prompt_file: Option<PathBuf>,
) -> anyhow::Result<String> {
    match (prompt, prompt_file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read prompt from {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

fn connect(
    remote: bool,
    api_url: &str,
    root: &str,
    exclude_patterns: Vec<String>,
) -> anyhow::Result<Box<dyn FileService>> {
    if remote {
        Ok(Box::new(HttpFileService::new(api_url)?))
    } else {
        Ok(Box::new(LocalFileService::new(root, exclude_patterns)))
    }
}

/// Directory a tree scan starts from. Remote scans without an explicit path use
/// the project around the backend's `server` directory; local ones the service root.
fn scan_root(service: &dyn FileService, remote: bool, path: &str) -> anyhow::Result<String> {
    let explicit = !path.is_empty() && path != ".";
    Ok(match (remote, explicit) {
        (_, true) => path.to_string(),
        (true, false) => project_root(&service.cwd()?).to_string(),
        (false, false) => String::new(),
    })
}

fn fetch_tree(
    service: &dyn FileService,
    remote: bool,
    path: &str,
) -> anyhow::Result<FileTreeNode> {
    let root = scan_root(service, remote, path)?;
    Ok(service.directory_tree(&root)?)
}

fn project_root(cwd: &str) -> &str {
    cwd.split("/server").next().unwrap_or(cwd)
}

fn compile(config: &ComposeConfig, api_url: &str) -> anyhow::Result<()> {
    let service = connect(
        config.remote,
        api_url,
        &config.root_path,
        config.exclude_patterns.clone(),
    )?;

    let mut session = Session {
        system_prompt: config.system_prompt.clone(),
        main_prompt: config.main_prompt.clone(),
        include_tree: config.include_tree,
        ..Session::default()
    };

    if !config.files.is_empty() {
        info!("Loading {} requested files", config.files.len());
        let root = if config.remote {
            Some(scan_root(service.as_ref(), true, &config.root_path)?)
        } else {
            None
        };
        let files = load_selected_files(service.as_ref(), &config.files, root.as_deref());
        session.selection.replace_all(files);
    } else {
        info!("Scanning for files in {}", config.root_path);
        // A local --path is already the service root.
        let scope = if config.remote {
            config.root_path.as_str()
        } else {
            ""
        };
        let tree = fetch_tree(service.as_ref(), config.remote, scope)?;

        if config.auto_select {
            info!("Auto-selecting all {} files", tree.file_count());
            session
                .selection
                .replace_all(load_tree_files(service.as_ref(), &tree));
        } else {
            session = run_selector(service.as_ref(), tree, session)?;
        }
    }

    let document = if config.server_compile {
        info!("Compiling on the server");
        let response = service.compile_prompt(&session.payload())?;
        for suggestion in &response.suggestions {
            info!("Suggestion: {}", suggestion);
        }
        CompiledDocument {
            text: response.compiled_prompt,
            ..session.document()
        }
    } else {
        session.document()
    };

    info!("Writing output");
    let target = OutputTarget::from_options(config.output_path.clone(), config.clipboard_output);
    write_output(&document, &target)
}

fn files_command(
    service: &dyn FileService,
    remote: bool,
    action: FilesAction,
) -> anyhow::Result<()> {
    match action {
        FilesAction::Cwd => println!("{}", service.cwd()?),
        FilesAction::List => {
            for file in service.list_files()? {
                println!("{}\t{}", file.path, file.kind);
            }
        }
        FilesAction::Content { path } => {
            let content = service.file_content(&path)?;
            println!("{}", content.content);
            eprintln!("{} tokens", format_token_count(content.token_count));
        }
        FilesAction::Tree { path, json } => {
            let tree = fetch_tree(service, remote, &path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                let root = tree_root(&tree);
                let paths: Vec<String> = tree
                    .files()
                    .iter()
                    .map(|f| normalize_path(&f.path, root))
                    .collect();
                println!("{}", render_path_tree(&paths));
            }
        }
        FilesAction::Upload { file } => {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .with_context(|| format!("Not a file: {}", file.display()))?;
            let bytes = fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let uploaded = service.upload_file(&name, bytes)?;
            println!("Uploaded {} -> {}", name, uploaded.path);
        }
        FilesAction::Delete { path } => {
            service.delete_file(&path)?;
            println!("Deleted {}", path);
        }
    }
    Ok(())
}

fn system_prompt_command(
    store: Option<PromptStore>,
    action: SystemPromptAction,
) -> anyhow::Result<()> {
    if let SystemPromptAction::Presets = action {
        for preset in PRESET_PROMPTS.iter() {
            println!("{:<12} {:<12} {}", preset.key, preset.name, preset.prompt);
        }
        return Ok(());
    }

    let store = store.context("No config directory available; pass --store")?;
    match action {
        SystemPromptAction::Save { text } => {
            store.save(&text)?;
            println!("Saved system prompt to {}", store.path().display());
        }
        SystemPromptAction::Load => match store.load()? {
            Some(saved) => println!("{}", saved),
            None => eprintln!("No saved system prompt"),
        },
        SystemPromptAction::Clear => {
            if store.clear()? {
                println!("Cleared saved system prompt");
            } else {
                eprintln!("No saved system prompt");
            }
        }
        SystemPromptAction::Presets => {}
    }
    Ok(())
}
