//! Progress bars for document imports, and a log writer that prints above them
//!
//! Everything goes to stderr, so stdout stays clean for `--json` output and
//! the MCP protocol stream.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

const IMPORT_TEMPLATE: &str = "{spinner} [{bar:30}] {pos}/{len} documents {wide_msg}";

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

/// Add a document-count bar; the message shows the document being imported
pub fn add_progress_bar(len: u64) -> ProgressBar {
    let bar = multi_progress().add(ProgressBar::new(len));
    if let Ok(style) = ProgressStyle::with_template(IMPORT_TEMPLATE) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Remove complete lines from `buffer`, without their line endings
fn drain_lines(buffer: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(idx) = buffer.find('\n') {
        lines.push(buffer[..idx].trim_end_matches('\r').to_string());
        buffer.drain(..=idx);
    }
    lines
}

/// `MakeWriter` for `tracing_subscriber` that routes log lines through the
/// shared `MultiProgress`
#[derive(Default, Clone)]
pub struct LogWriterFactory;

pub struct LogWriter {
    buffer: String,
}

impl LogWriter {
    fn emit(line: String) {
        let _ = multi_progress().println(line);
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push_str(&String::from_utf8_lossy(buf));
        drain_lines(&mut self.buffer)
            .into_iter()
            .for_each(Self::emit);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            Self::emit(rest.trim_end_matches(['\r', '\n']).to_string());
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            buffer: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut buffer = String::from("first\r\nsecond\n\npartial");
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines, vec!["first", "second", ""]);
        assert_eq!(buffer, "partial");
    }

    #[test]
    fn test_import_bar_has_length() {
        let bar = add_progress_bar(4);
        bar.inc(1);
        assert_eq!(bar.length(), Some(4));
        assert_eq!(bar.position(), 1);
        bar.finish_and_clear();
    }
}
