use log::debug;
use std::collections::HashMap;

const BRANCH: &str = "├── ";
const LAST: &str = "└── ";

/// Renders selected paths as an indented project-structure listing.
///
/// Paths are sorted, split on `/`, and every directory prefix is emitted once in
/// first-encounter order. The last segment of a path gets `└── `, every
/// directory segment before it gets `├── ` and a trailing `/`. Sibling position
/// is not tracked, so a directory that is the last child of its parent still
/// renders with `├── `.
pub fn render_path_tree<S: AsRef<str>>(paths: &[S]) -> String {
    let mut sorted: Vec<&str> = paths.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.dedup();

    // Insertion-ordered map: key -> index into `lines`.
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut lines: Vec<String> = Vec::new();

    for path in sorted {
        let parts: Vec<&str> = path.split('/').collect();
        let last = parts.len() - 1;
        let mut current = String::new();

        for (depth, part) in parts.iter().enumerate() {
            let indent = "  ".repeat(depth);

            if depth < last {
                if !current.is_empty() {
                    current.push('/');
                }
                current.push_str(part);

                if !index.contains_key(&current) {
                    index.insert(current.clone(), lines.len());
                    lines.push(format!("{indent}{BRANCH}{part}/"));
                }
            } else {
                let line = format!("{indent}{LAST}{part}");
                match index.get(path) {
                    // Same key seen before as a directory: overwrite in place.
                    Some(&i) => lines[i] = line,
                    None => {
                        index.insert(path.to_string(), lines.len());
                        lines.push(line);
                    }
                }
            }
        }
    }

    debug!("Rendered path tree with {} lines", lines.len());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_selection() {
        let paths: Vec<String> = Vec::new();
        assert_eq!(render_path_tree(&paths), "");
    }

    #[test]
    fn test_single_top_level_file() {
        assert_eq!(render_path_tree(&["a.txt"]), "└── a.txt");
    }

    #[test]
    fn test_shared_directory_emitted_once() {
        assert_eq!(
            render_path_tree(&["src/b.js", "src/a.js"]),
            "├── src/\n  └── a.js\n  └── b.js"
        );
    }

    #[test]
    fn test_nested_directories_in_first_encounter_order() {
        let paths = ["src/utils/helper.rs", "README.md", "src/main.rs", "src/lib.rs"];
        let expected = [
            "└── README.md",
            "├── src/",
            "  └── lib.rs",
            "  └── main.rs",
            "  ├── utils/",
            "    └── helper.rs",
        ]
        .join("\n");

        assert_eq!(render_path_tree(&paths), expected);
    }

    #[test]
    fn test_sorting_is_by_full_path_bytes() {
        // "a-b/x" < "a/x" because '-' (0x2D) sorts before '/' (0x2F).
        assert_eq!(
            render_path_tree(&["a/x", "a-b/x"]),
            "├── a-b/\n  └── x\n├── a/\n  └── x"
        );
        // Uppercase sorts before lowercase.
        assert_eq!(render_path_tree(&["b.txt", "Z.txt"]), "└── Z.txt\n└── b.txt");
    }

    #[test]
    fn test_last_sibling_directory_keeps_branch_prefix() {
        // `docs/` is the last entry at depth 0, yet renders with `├── `.
        // The listing only marks the final segment of each path.
        assert_eq!(
            render_path_tree(&["a.txt", "docs/guide.md"]),
            "└── a.txt\n├── docs/\n  └── guide.md"
        );
    }

    #[test]
    fn test_file_and_directory_with_same_key() {
        assert_eq!(render_path_tree(&["a/b", "a"]), "└── a\n  └── b");
    }

    #[test]
    fn test_deterministic_for_any_input_order() {
        let forward = render_path_tree(&["x/1", "y/2", "x/3"]);
        let backward = render_path_tree(&["x/3", "y/2", "x/1"]);
        assert_eq!(forward, backward);
    }
}
