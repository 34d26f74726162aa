use crate::core::prompt_compiler::compile_prompt;
use crate::core::suggestions::suggest;
use crate::core::token_estimator::estimate_text_tokens;
use crate::domain::errors::ServiceError;
use crate::domain::models::{
    FileContent, FileTreeNode, PromptPayload, PromptResponse, RemoteFile, SelectedFile,
};
use crate::infra::file_service::FileService;
use crossterm::{
    ExecutableCommand, cursor,
    terminal::{Clear, ClearType},
};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::{DirEntry, WalkDir};

pub const DEFAULT_EXCLUDES: &str = ".git,node_modules,target,.venv";

// Spinner on stderr while walking large trees. Silent when stderr is not a terminal.
struct ScanProgress {
    start_time: Instant,
    update_interval: Duration,
    last_update: Instant,
    scanned_count: usize,
    enabled: bool,
}

impl ScanProgress {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            update_interval: Duration::from_millis(250),
            last_update: Instant::now(),
            scanned_count: 0,
            enabled: io::stderr().is_terminal(),
        }
    }

    fn update(&mut self) -> io::Result<()> {
        self.scanned_count += 1;

        let now = Instant::now();
        if !self.enabled || now.duration_since(self.last_update) < self.update_interval {
            return Ok(());
        }
        self.last_update = now;

        let spinner_chars = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
        let spinner_idx =
            ((self.start_time.elapsed().as_millis() / 100) % spinner_chars.len() as u128) as usize;

        let mut stderr = io::stderr();
        stderr.execute(cursor::SavePosition)?;
        stderr.execute(Clear(ClearType::CurrentLine))?;
        write!(
            stderr,
            "{} Scanning files: {} entries",
            spinner_chars[spinner_idx], self.scanned_count
        )?;
        stderr.flush()?;
        stderr.execute(cursor::RestorePosition)?;
        Ok(())
    }

    fn finish(&self) -> io::Result<()> {
        if self.enabled {
            io::stderr().execute(Clear(ClearType::CurrentLine))?;
        }
        debug!(
            "Scanned {} entries in {:.1}s",
            self.scanned_count,
            self.start_time.elapsed().as_secs_f32()
        );
        Ok(())
    }
}

fn is_excluded(entry: &DirEntry, root: &Path, exclude_patterns: &[String]) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
    let rel = rel.to_string_lossy();
    exclude_patterns
        .iter()
        .filter(|p| !p.is_empty())
        .any(|pat| rel.contains(pat.as_str()))
}

fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn build_directory_tree(root: &Path, exclude_patterns: &[String]) -> io::Result<FileTreeNode> {
    info!("Building directory tree for: {}", root.display());
    let mut progress = ScanProgress::new();

    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string());

    // Open directories, innermost last: (depth, node).
    let mut stack: Vec<(usize, FileTreeNode)> = Vec::new();

    fn close_until(stack: &mut Vec<(usize, FileTreeNode)>, depth: usize) {
        while stack.len() > 1 && stack.last().is_some_and(|(d, _)| *d >= depth) {
            if let Some((_, done)) = stack.pop() {
                if let Some((_, parent)) = stack.last_mut() {
                    parent.children.get_or_insert_with(Vec::new).push(done);
                }
            }
        }
    }

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e, root, exclude_patterns))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        progress.update()?;

        if entry.depth() == 0 {
            if !entry.file_type().is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a directory: {}", root.display()),
                ));
            }
            stack.push((0, FileTreeNode::directory(root_name.clone(), "", Vec::new())));
            continue;
        }

        close_until(&mut stack, entry.depth());
        let name = entry.file_name().to_string_lossy().to_string();
        let path = relative_path(entry.path(), root);

        if entry.file_type().is_dir() {
            stack.push((entry.depth(), FileTreeNode::directory(name, path, Vec::new())));
        } else if entry.file_type().is_file() {
            if let Some((_, parent)) = stack.last_mut() {
                parent
                    .children
                    .get_or_insert_with(Vec::new)
                    .push(FileTreeNode::file(name, path));
            }
        }
    }

    close_until(&mut stack, 1);
    progress.finish()?;

    let tree = match stack.pop() {
        Some((_, tree)) => tree,
        None => {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("cannot read directory {}", root.display()),
            ));
        }
    };
    info!("Found {} files", tree.file_count());
    Ok(tree)
}

pub fn read_file_contents(path: &Path) -> Result<String, ServiceError> {
    if !path.is_file() {
        warn!("Not a readable file: {}", path.display());
        return Err(ServiceError::NotFound(path.display().to_string()));
    }

    debug!("Reading file contents: {}", path.display());
    let bytes = fs::read(path)?;
    debug!("Read {} bytes from file", bytes.len());
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub struct LocalFileService {
    root: PathBuf,
    exclude_patterns: Vec<String>,
}

impl LocalFileService {
    pub fn new(root: impl Into<PathBuf>, exclude_patterns: Vec<String>) -> Self {
        Self {
            root: root.into(),
            exclude_patterns,
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ServiceError> {
        let candidate = Path::new(path);
        let relative = if candidate.is_absolute() {
            candidate
                .strip_prefix(&self.root)
                .map_err(|_| ServiceError::OutsideRoot(path.to_string()))?
        } else {
            candidate
        };

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ServiceError::OutsideRoot(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl FileService for LocalFileService {
    fn cwd(&self) -> Result<String, ServiceError> {
        Ok(self.root.display().to_string())
    }

    fn list_files(&self) -> Result<Vec<RemoteFile>, ServiceError> {
        let tree = build_directory_tree(&self.root, &self.exclude_patterns)?;
        Ok(tree
            .files()
            .into_iter()
            .map(|node| RemoteFile {
                path: node.path.clone(),
                name: node.name.clone(),
                kind: node.extension.clone().unwrap_or_default(),
            })
            .collect())
    }

    fn file_content(&self, path: &str) -> Result<FileContent, ServiceError> {
        let content = read_file_contents(&self.resolve(path)?)?;
        Ok(FileContent {
            token_count: estimate_text_tokens(&content),
            content,
        })
    }

    fn directory_tree(&self, root_path: &str) -> Result<FileTreeNode, ServiceError> {
        let dir = self.resolve(root_path)?;
        if !dir.is_dir() {
            return Err(ServiceError::NotFound(root_path.to_string()));
        }
        let mut tree = build_directory_tree(&dir, &self.exclude_patterns)?;

        // Re-anchor paths on the service root so they can be passed back to `file_content`.
        let prefix = relative_path(&dir, &self.root);
        if !prefix.is_empty() {
            prefix_paths(&mut tree, &prefix);
        }
        Ok(tree)
    }

    fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<RemoteFile, ServiceError> {
        let name = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ServiceError::OutsideRoot(file_name.to_string()))?;

        let target = self.root.join(&name);
        fs::write(&target, bytes)?;
        info!("Stored {} in {}", name, self.root.display());

        Ok(RemoteFile {
            kind: Path::new(&name)
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: name.clone(),
            name,
        })
    }

    fn delete_file(&self, path: &str) -> Result<(), ServiceError> {
        let target = self.resolve(path)?;
        if !target.is_file() {
            return Err(ServiceError::NotFound(path.to_string()));
        }
        fs::remove_file(&target)?;
        info!("Deleted {}", target.display());
        Ok(())
    }

    fn compile_prompt(&self, payload: &PromptPayload) -> Result<PromptResponse, ServiceError> {
        let files: Vec<SelectedFile> = payload
            .files
            .iter()
            .map(|f| SelectedFile::new(f.file_path.clone(), f.content.clone().unwrap_or_default()))
            .collect();
        let system_prompt = payload.system_prompt.as_deref().unwrap_or("");
        let compiled_prompt = compile_prompt(system_prompt, &payload.prompt_text, &files, false);

        let mut metadata = HashMap::new();
        metadata.insert("file_count".to_string(), files.len().into());
        metadata.insert(
            "prompt_length".to_string(),
            payload.prompt_text.chars().count().into(),
        );
        metadata.insert(
            "total_length".to_string(),
            compiled_prompt.chars().count().into(),
        );

        Ok(PromptResponse {
            suggestions: suggest(&payload.prompt_text),
            compiled_prompt,
            metadata,
        })
    }

    fn suggestions(&self, payload: &PromptPayload) -> Result<Vec<String>, ServiceError> {
        Ok(suggest(&payload.prompt_text))
    }
}

fn prefix_paths(node: &mut FileTreeNode, prefix: &str) {
    node.path = if node.path.is_empty() {
        prefix.to_string()
    } else {
        format!("{}/{}", prefix, node.path)
    };
    if let Some(children) = node.children.as_mut() {
        for child in children {
            prefix_paths(child, prefix);
        }
    }
}
