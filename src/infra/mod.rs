pub mod file_service;
pub mod file_system;
pub mod logger;
pub mod output;
pub mod prompt_store;
