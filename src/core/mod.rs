pub mod debounce;
pub mod file_selector;
pub mod presets;
pub mod prompt_compiler;
pub mod selection;
pub mod suggestions;
pub mod token_estimator;
pub mod tree_renderer;
