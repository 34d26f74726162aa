use crate::domain::models::CompiledDocument;
use crossterm::{
    ExecutableCommand,
    style::{Color, ResetColor, SetForegroundColor},
};
use log::{debug, info};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

const PREVIEW_LENGTH: usize = 200;

pub trait OutputWriter {
    fn write(&self, content: &str) -> anyhow::Result<()>;
}

pub struct FileWriter {
    path: String,
}

impl FileWriter {
    pub fn new(path: String) -> Self {
        Self { path }
    }
}

impl OutputWriter for FileWriter {
    fn write(&self, content: &str) -> anyhow::Result<()> {
        debug!("Writing output to file: {}", self.path);
        fs::write(Path::new(&self.path), content)?;
        info!("Output written to file: {}", self.path);
        Ok(())
    }
}

pub struct ConsoleWriter;

impl OutputWriter for ConsoleWriter {
    fn write(&self, content: &str) -> anyhow::Result<()> {
        debug!("Writing output to console");
        let mut stdout = io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(feature = "clipboard-support")]
pub struct ClipboardWriter;

#[cfg(feature = "clipboard-support")]
impl OutputWriter for ClipboardWriter {
    fn write(&self, content: &str) -> anyhow::Result<()> {
        use clipboard::{ClipboardContext, ClipboardProvider};
        use log::warn;

        debug!("Writing output to clipboard");
        let mut ctx: ClipboardContext = ClipboardProvider::new().map_err(|e| {
            warn!("Failed to access clipboard: {}", e);
            anyhow::anyhow!("Failed to access clipboard: {}", e)
        })?;

        ctx.set_contents(content.to_owned()).map_err(|e| {
            warn!("Failed to copy to clipboard: {}", e);
            anyhow::anyhow!("Failed to copy to clipboard: {}", e)
        })?;
        info!("Output copied to clipboard (size: {} bytes)", content.len());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Console,
    File(String),
    Clipboard,
}

impl OutputTarget {
    pub fn from_options(output_path: Option<String>, clipboard_output: bool) -> Self {
        match (clipboard_output, output_path) {
            (true, _) => OutputTarget::Clipboard,
            (false, Some(path)) => OutputTarget::File(path),
            (false, None) => OutputTarget::Console,
        }
    }
}

pub fn create_writer(target: &OutputTarget) -> anyhow::Result<Box<dyn OutputWriter>> {
    match target {
        OutputTarget::Console => Ok(Box::new(ConsoleWriter)),
        OutputTarget::File(path) => Ok(Box::new(FileWriter::new(path.clone()))),
        #[cfg(feature = "clipboard-support")]
        OutputTarget::Clipboard => Ok(Box::new(ClipboardWriter)),
        #[cfg(not(feature = "clipboard-support"))]
        OutputTarget::Clipboard => Err(
            crate::domain::errors::SelectionError::UnsupportedCapability("clipboard").into(),
        ),
    }
}

pub fn preview(content: &str, length: usize) -> String {
    if content.chars().count() > length {
        let head: String = content.chars().take(length).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}

pub fn write_output(document: &CompiledDocument, target: &OutputTarget) -> anyhow::Result<()> {
    let writer = create_writer(target)?;
    writer.write(&document.text)?;

    let mut stderr = io::stderr();
    stderr.execute(SetForegroundColor(Color::Green))?;
    match target {
        OutputTarget::Console => writeln!(stderr, "\n✓ {}", document.metadata_line())?,
        OutputTarget::File(path) => {
            writeln!(stderr, "✓ Prompt written to {} ({})", path, document.metadata_line())?
        }
        OutputTarget::Clipboard => {
            writeln!(stderr, "📋 Prompt copied to clipboard ({})", document.metadata_line())?
        }
    }
    stderr.execute(ResetColor)?;

    if *target == OutputTarget::Clipboard {
        writeln!(stderr, "\nPreview of copied content:\n")?;
        writeln!(stderr, "{}", preview(&document.text, PREVIEW_LENGTH))?;
    }

    Ok(())
}
