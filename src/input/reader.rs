use anyhow::{Context, Result, bail};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

const MAX_INPUT_SIZE: usize = 1024 * 1024;

/// Where `seltl translate` takes its text from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource<'a> {
    Inline(&'a str),
    File(&'a Path),
    Stdin,
}

impl<'a> InputSource<'a> {
    /// Inline text wins over a file; with neither, stdin is read.
    pub fn pick(text: Option<&'a str>, file: Option<&'a Path>) -> Self {
        match (text, file) {
            (Some(text), _) => Self::Inline(text),
            (None, Some(path)) => Self::File(path),
            (None, None) => Self::Stdin,
        }
    }
}

pub struct InputReader;

impl InputReader {
    pub fn read(source: &InputSource<'_>) -> Result<String> {
        match source {
            InputSource::Inline(text) => {
                check_size(text.len(), "text")?;
                Ok((*text).to_string())
            }
            InputSource::File(path) => Self::read_file(path),
            InputSource::Stdin => Self::read_stdin(),
        }
    }

    fn read_file(path: &Path) -> Result<String> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to access file: {}", path.display()))?;

        check_size(metadata.len() as usize, "file")?;

        fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))
    }

    #[allow(clippy::significant_drop_tightening)]
    fn read_stdin() -> Result<String> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 8192];
        let mut stdin = io::stdin().lock();

        loop {
            let bytes_read = stdin
                .read(&mut chunk)
                .context("Failed to read from stdin")?;
            if bytes_read == 0 {
                break;
            }

            buffer.extend_from_slice(&chunk[..bytes_read]);
            check_size(buffer.len(), "input")?;
        }

        String::from_utf8(buffer).context("Input is not valid UTF-8")
    }
}

fn check_size(size: usize, what: &str) -> Result<()> {
    if size > MAX_INPUT_SIZE {
        bail!(
            "Input size ({:.1} MB) exceeds maximum allowed size (1 MB).\n\n\
             Consider splitting the {what} into smaller parts.",
            size as f64 / 1024.0 / 1024.0
        );
    }
    Ok(())
}
