use crate::core::prompt_compiler::build_compiled_document;
use crate::domain::models::{CompiledDocument, PromptPayload, SelectedFile};
use log::debug;

/// Turns a service or disk path into the relative, forward-slash form used as
/// selection identity.
pub fn normalize_path(path: &str, root: Option<&str>) -> String {
    let mut normalized = path.replace('\\', "/");

    if let Some(root) = root.map(|r| r.replace('\\', "/")) {
        let root = root.trim_end_matches('/');
        if !root.is_empty() {
            if let Some(rest) = normalized.strip_prefix(root) {
                if rest.is_empty() || rest.starts_with('/') {
                    normalized = rest.trim_start_matches('/').to_string();
                }
            }
        }
    }

    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    files: Vec<SelectedFile>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    pub fn insert(&mut self, file: SelectedFile) -> bool {
        if self.contains(&file.path) {
            debug!("Ignoring duplicate selection: {}", file.path);
            return false;
        }
        debug!("Selected {}", file.path);
        self.files.push(file);
        true
    }

    pub fn remove(&mut self, path: &str) -> Option<SelectedFile> {
        let pos = self.files.iter().position(|f| f.path == path)?;
        debug!("Deselected {}", path);
        Some(self.files.remove(pos))
    }

    /// Deselects the path if present, otherwise selects the file.
    /// Returns whether the file is selected afterwards.
    pub fn toggle(&mut self, file: SelectedFile) -> bool {
        if self.remove(&file.path).is_some() {
            false
        } else {
            self.files.push(file);
            true
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn replace_all(&mut self, files: impl IntoIterator<Item = SelectedFile>) {
        self.files.clear();
        for file in files {
            self.insert(file);
        }
    }

    pub fn file_tokens(&self) -> usize {
        self.files.iter().map(|f| f.token_count.unwrap_or(0)).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub selection: Selection,
    pub system_prompt: String,
    pub main_prompt: String,
    pub include_tree: bool,
}

impl Session {
    pub fn document(&self) -> CompiledDocument {
        build_compiled_document(
            &self.system_prompt,
            &self.main_prompt,
            self.selection.files(),
            self.include_tree,
        )
    }

    pub fn payload(&self) -> PromptPayload {
        PromptPayload::new(&self.system_prompt, &self.main_prompt, self.selection.files())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("src\\main.rs", None), "src/main.rs");
        assert_eq!(normalize_path("./src/main.rs", None), "src/main.rs");
        assert_eq!(
            normalize_path("/home/u/proj/src/main.rs", Some("/home/u/proj")),
            "src/main.rs"
        );
        assert_eq!(
            normalize_path("/home/u/proj/src/main.rs", Some("/home/u/proj/")),
            "src/main.rs"
        );
        // A sibling directory sharing the prefix is not stripped.
        assert_eq!(
            normalize_path("/home/u/project2/a.rs", Some("/home/u/proj")),
            "/home/u/project2/a.rs"
        );
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut selection = Selection::new();
        assert!(selection.toggle(SelectedFile::new("a.rs", "A")));
        assert!(selection.toggle(SelectedFile::new("b.rs", "B")));
        assert_eq!(selection.paths(), vec!["a.rs", "b.rs"]);

        assert!(!selection.toggle(SelectedFile::new("a.rs", "")));
        assert_eq!(selection.paths(), vec!["b.rs"]);
    }

    #[test]
    fn test_insert_keeps_path_unique() {
        let mut selection = Selection::new();
        assert!(selection.insert(SelectedFile::new("a.rs", "first")));
        assert!(!selection.insert(SelectedFile::new("a.rs", "second")));
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.files()[0].content, "first");
    }

    #[test]
    fn test_replace_all_and_token_sum() {
        let mut selection = Selection::new();
        selection.insert(SelectedFile::new("old.rs", ""));
        selection.replace_all(vec![
            SelectedFile::new("x.rs", "").with_token_count(3),
            SelectedFile::new("y.rs", ""),
            SelectedFile::new("x.rs", "").with_token_count(100),
        ]);

        assert_eq!(selection.paths(), vec!["x.rs", "y.rs"]);
        assert_eq!(selection.file_tokens(), 3);

        selection.clear();
        assert!(selection.is_empty());
        assert!(selection.remove("x.rs").is_none());
    }

    #[test]
    fn test_session_document_tracks_inputs() {
        let mut session = Session {
            system_prompt: "Sys".to_string(),
            main_prompt: "Main".to_string(),
            ..Session::default()
        };
        session.selection.insert(SelectedFile::new("f.txt", "X").with_token_count(4));

        let doc = session.document();
        assert_eq!(
            doc.text,
            "Sys\n\nPrompt:\nMain\n\nIncluded Files:\n\nFile: f.txt\n\nX\n"
        );
        assert_eq!(doc.total_tokens, 6);
        assert_eq!(session.document(), doc);

        session.include_tree = true;
        assert!(session.document().text.contains("Project Structure:\n└── f.txt"));
        assert_eq!(session.payload().files.len(), 1);
    }
}
