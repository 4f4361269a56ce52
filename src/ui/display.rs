use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Spinner, Style};
use crate::app::Display;
use crate::translation::TranslationResult;

struct DisplayState {
    out: Box<dyn Write + Send>,
    // Translation text already written to `out` for the current attempt.
    printed: String,
    spinner: Option<Spinner>,
}

/// [`Display`] for a terminal.
///
/// The translation streams to stdout as it grows; source echoes, status
/// lines and errors go to stderr and are suppressed in quiet mode (errors
/// excepted).
pub struct TerminalDisplay {
    echo_source: bool,
    quiet: bool,
    state: Mutex<DisplayState>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            echo_source: true,
            quiet: false,
            state: Mutex::new(DisplayState {
                out,
                printed: String::new(),
                spinner: None,
            }),
        }
    }

    #[must_use]
    pub fn echo_source(mut self, echo_source: bool) -> Self {
        self.echo_source = echo_source;
        self
    }

    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_line(state: &mut DisplayState) {
        if !state.printed.is_empty() && !state.printed.ends_with('\n') {
            let _ = writeln!(state.out);
        }
        let _ = state.out.flush();
        state.printed.clear();
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TerminalDisplay {
    fn on_translate_triggered(&self, text: &str) {
        let mut state = self.lock();
        Self::finish_line(&mut state);

        if self.quiet {
            return;
        }
        if self.echo_source {
            eprintln!("{}", Style::header("Source"));
            eprintln!("{}", Style::secondary(text.trim_end()));
        }
        state.spinner = Some(Spinner::new("Translating..."));
    }

    fn on_append_triggered(&self, text: &str) {
        if !self.quiet {
            eprintln!("{} {}", Style::label("Appended:"), Style::secondary(text));
        }
    }

    fn on_progress(&self, partial: &str) {
        let mut state = self.lock();
        state.spinner = None;

        let suffix = if let Some(suffix) = partial.strip_prefix(state.printed.as_str()) {
            suffix.to_string()
        } else {
            // Not a continuation of what is on screen; start over below it.
            Self::finish_line(&mut state);
            partial.to_string()
        };

        let _ = state.out.write_all(suffix.as_bytes());
        let _ = state.out.flush();
        state.printed = partial.to_string();
    }

    fn on_complete(&self, result: &TranslationResult) {
        let mut state = self.lock();
        state.spinner = None;

        if result.success {
            if !result.content.starts_with(state.printed.as_str()) {
                Self::finish_line(&mut state);
            }
            let rest = result.content[state.printed.len()..].to_string();
            let _ = state.out.write_all(rest.as_bytes());
            state.printed.clone_from(&result.content);
            Self::finish_line(&mut state);

            if result.from_cache && !self.quiet {
                eprintln!("{}", Style::hint("(from cache)"));
            }
        } else {
            Self::finish_line(&mut state);
            eprintln!(
                "{} {}",
                Style::error("Error:"),
                result.error.as_deref().unwrap_or("Translation failed")
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn display() -> (TerminalDisplay, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let display = TerminalDisplay::with_writer(Box::new(buffer.clone())).quiet(true);
        (display, buffer)
    }

    #[test]
    fn test_progress_writes_only_new_text() {
        let (display, out) = display();

        display.on_translate_triggered("hello");
        display.on_progress("你");
        display.on_progress("你好");
        display.on_progress("你好!");
        display.on_progress("你好!.");
        display.on_complete(&TranslationResult::completed("你好!.".to_string()));

        assert_eq!(out.contents(), "你好!.\n");
    }

    #[test]
    fn test_cancelled_attempt_line_is_closed_by_next_trigger() {
        let (display, out) = display();

        display.on_translate_triggered("one");
        display.on_progress("partial");
        // No completion: the attempt was cancelled.
        display.on_translate_triggered("two");
        display.on_progress("full");
        display.on_complete(&TranslationResult::completed("full".to_string()));

        assert_eq!(out.contents(), "partial\nfull\n");
    }

    #[test]
    fn test_complete_without_progress_prints_content() {
        let (display, out) = display();

        display.on_complete(&TranslationResult::cached("cached".to_string()));

        assert_eq!(out.contents(), "cached\n");
    }

    #[test]
    fn test_failure_writes_nothing_to_stdout() {
        let (display, out) = display();

        display.on_translate_triggered("text");
        display.on_complete(&TranslationResult::failed("API key is not set"));

        assert_eq!(out.contents(), "");
    }
}
