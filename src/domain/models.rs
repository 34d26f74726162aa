use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `path` is forward-slash separated, relative, and unique within a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: String,
    pub content: String,
    pub token_count: Option<usize>,
    pub name: Option<String>,
    pub extension: Option<String>,
}

impl SelectedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().filter(|n| !n.is_empty()).map(str::to_string);
        let extension = name
            .as_deref()
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.to_string())
            .filter(|ext| !ext.is_empty());

        Self {
            path,
            content: content.into(),
            token_count: None,
            name,
            extension,
        }
    }

    pub fn with_token_count(mut self, token_count: usize) -> Self {
        self.token_count = Some(token_count);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTreeNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileTreeNode>>,
}

impl FileTreeNode {
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_string());
        Self {
            kind: NodeKind::File,
            name,
            path: path.into(),
            extension,
            children: None,
        }
    }

    pub fn directory(
        name: impl Into<String>,
        path: impl Into<String>,
        children: Vec<FileTreeNode>,
    ) -> Self {
        Self {
            kind: NodeKind::Directory,
            name: name.into(),
            path: path.into(),
            extension: None,
            children: Some(children),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn children(&self) -> &[FileTreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn file_count(&self) -> usize {
        match self.kind {
            NodeKind::File => 1,
            NodeKind::Directory => self.children().iter().map(FileTreeNode::file_count).sum(),
        }
    }

    pub fn files(&self) -> Vec<&FileTreeNode> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a FileTreeNode>) {
        match self.kind {
            NodeKind::File => out.push(self),
            NodeKind::Directory => {
                for child in self.children() {
                    child.collect_files(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDocument {
    pub text: String,
    pub file_count: usize,
    pub system_prompt_present: bool,
    pub total_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    #[serde(rename = "file_path")]
    pub path: String,
    #[serde(rename = "file_name")]
    pub name: String,
    #[serde(rename = "file_type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
    pub token_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<&SelectedFile> for FileReference {
    fn from(file: &SelectedFile) -> Self {
        Self {
            file_name: file.name.clone().unwrap_or_else(|| file.path.clone()),
            file_path: file.path.clone(),
            file_type: file.extension.clone().unwrap_or_default(),
            content: Some(file.content.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPayload {
    pub prompt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub files: Vec<FileReference>,
}

impl PromptPayload {
    pub fn new(system_prompt: &str, main_prompt: &str, files: &[SelectedFile]) -> Self {
        Self {
            prompt_text: main_prompt.to_string(),
            system_prompt: (!system_prompt.is_empty()).then(|| system_prompt.to_string()),
            files: files.iter().map(FileReference::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptResponse {
    pub compiled_prompt: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetPrompt {
    pub key: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct ComposeConfig {
    pub root_path: String,
    pub files: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub system_prompt: String,
    pub main_prompt: String,
    pub include_tree: bool,
    pub auto_select: bool,
    pub remote: bool,
    pub server_compile: bool,
    pub output_path: Option<String>,
    pub clipboard_output: bool,
}
