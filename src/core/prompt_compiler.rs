use crate::core::token_estimator::{estimate_tokens, format_token_count};
use crate::core::tree_renderer::render_path_tree;
use crate::domain::models::{CompiledDocument, SelectedFile};
use log::debug;

const PROJECT_STRUCTURE_HEADER: &str = "\n\nProject Structure:\n";
const PROMPT_HEADER: &str = "\n\nPrompt:\n";
const INCLUDED_FILES_HEADER: &str = "\n\nIncluded Files:\n\n";
const FILE_SEPARATOR: &str = "\n---\n\n";

pub fn compile_prompt(
    system_prompt: &str,
    main_prompt: &str,
    files: &[SelectedFile],
    include_tree: bool,
) -> String {
    debug!(
        "Compiling prompt from {} files (include_tree={})",
        files.len(),
        include_tree
    );
    let mut result = String::from(system_prompt);

    if include_tree && !files.is_empty() {
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        result.push_str(PROJECT_STRUCTURE_HEADER);
        result.push_str(&render_path_tree(&paths));
    }

    result.push_str(PROMPT_HEADER);
    result.push_str(main_prompt);

    if !files.is_empty() {
        let file_contents = files
            .iter()
            .map(|file| format!("File: {}\n\n{}\n", file.path, file.content))
            .collect::<Vec<_>>()
            .join(FILE_SEPARATOR);

        result.push_str(INCLUDED_FILES_HEADER);
        result.push_str(&file_contents);
    }

    result
}

pub fn build_compiled_document(
    system_prompt: &str,
    main_prompt: &str,
    files: &[SelectedFile],
    include_tree: bool,
) -> CompiledDocument {
    CompiledDocument {
        text: compile_prompt(system_prompt, main_prompt, files, include_tree),
        file_count: files.len(),
        system_prompt_present: !system_prompt.trim().is_empty(),
        total_tokens: estimate_tokens(files, system_prompt, main_prompt),
    }
}

impl CompiledDocument {
    pub fn system_prompt_count(&self) -> usize {
        usize::from(self.system_prompt_present)
    }

    pub fn metadata_line(&self) -> String {
        format!(
            "{} · {} · {} tokens",
            counted(self.file_count, "file"),
            counted(self.system_prompt_count(), "system prompt"),
            format_token_count(self.total_tokens)
        )
    }
}

fn counted(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> SelectedFile {
        SelectedFile::new(path, content)
    }

    #[test]
    fn test_compile_prompt_only() {
        assert_eq!(compile_prompt("", "Hello", &[], false), "\n\nPrompt:\nHello");
    }

    #[test]
    fn test_compile_with_system_prompt_and_file() {
        let files = vec![file("f.txt", "X")];
        assert_eq!(
            compile_prompt("Sys", "Main", &files, false),
            "Sys\n\nPrompt:\nMain\n\nIncluded Files:\n\nFile: f.txt\n\nX\n"
        );
    }

    #[test]
    fn test_files_keep_selection_order_and_separator() {
        let files = vec![file("z.rs", "zed"), file("a.rs", "ay")];
        let compiled = compile_prompt("", "P", &files, false);

        assert_eq!(
            compiled,
            "\n\nPrompt:\nP\n\nIncluded Files:\n\nFile: z.rs\n\nzed\n\n---\n\nFile: a.rs\n\nay\n"
        );
    }

    #[test]
    fn test_tree_section_precedes_prompt() {
        let files = vec![file("src/b.rs", "B"), file("src/a.rs", "A")];
        let compiled = compile_prompt("Sys", "Main", &files, true);

        assert!(compiled.starts_with(
            "Sys\n\nProject Structure:\n├── src/\n  └── a.rs\n  └── b.rs\n\nPrompt:\nMain"
        ));
        // File bodies stay in selection order even though the tree is sorted.
        let b = compiled.find("File: src/b.rs").unwrap();
        let a = compiled.find("File: src/a.rs").unwrap();
        assert!(b < a);
    }

    #[test]
    fn test_tree_flag_ignored_without_files() {
        assert_eq!(compile_prompt("", "Hi", &[], true), "\n\nPrompt:\nHi");
    }

    #[test]
    fn test_missing_content_compiles_as_empty() {
        let files = vec![file("gone.txt", "")];
        assert_eq!(
            compile_prompt("", "", &files, false),
            "\n\nPrompt:\n\n\nIncluded Files:\n\nFile: gone.txt\n\n\n"
        );
    }

    #[test]
    fn test_compile_is_idempotent() {
        let files = vec![file("a/b.rs", "one"), file("c.rs", "two")];
        let first = compile_prompt("S", "M", &files, true);
        let second = compile_prompt("S", "M", &files, true);
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_compiled_document() {
        let files = vec![
            file("a.rs", "fn a() {}").with_token_count(7),
            file("b.rs", "fn b() {}"),
        ];
        let doc = build_compiled_document("Be terse", "Refactor", &files, false);

        assert_eq!(doc.file_count, 2);
        assert!(doc.system_prompt_present);
        // 7 + ceil(8/4) + ceil(8/4)
        assert_eq!(doc.total_tokens, 11);
        assert_eq!(doc.text, compile_prompt("Be terse", "Refactor", &files, false));
        assert_eq!(doc.metadata_line(), "2 files · 1 system prompt · ~11 tokens");
    }

    #[test]
    fn test_whitespace_system_prompt_is_not_counted() {
        let doc = build_compiled_document("   \n", "Q", &[], false);
        assert!(!doc.system_prompt_present);
        assert_eq!(doc.system_prompt_count(), 0);
        assert!(doc.text.starts_with("   \n\n\nPrompt:\nQ"));
    }

    #[test]
    fn test_metadata_line_singular_and_plural() {
        let one = build_compiled_document("", "", &[file("a.rs", "").with_token_count(0)], false);
        assert_eq!(one.metadata_line(), "1 file · 0 system prompts · ~0 tokens");

        let none = build_compiled_document("Sys", "", &[], false);
        assert_eq!(none.metadata_line(), "0 files · 1 system prompt · ~1 tokens");
    }
}
