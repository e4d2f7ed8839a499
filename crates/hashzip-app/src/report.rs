//! Progress log and the surfaces it is shown on.

use std::io::Write;

/// Severity of a short user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Failure,
}

/// A short message shown outside the report (toast, status line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: Option<String>,
}

impl Notice {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            message: None,
        }
    }

    pub fn failure(title: impl Into<String>, message: Option<String>) -> Self {
        Self {
            level: NoticeLevel::Failure,
            title: title.into(),
            message,
        }
    }
}

/// Where a command's report is displayed.
pub trait ReportSurface {
    /// Show the whole report as it stands now.
    fn render(&mut self, document: &str);

    fn notify(&mut self, notice: Notice);
}

/// Append-only report text, re-rendered after every append.
pub struct ProgressLog<'a, S: ReportSurface + ?Sized> {
    document: String,
    surface: &'a mut S,
}

impl<'a, S: ReportSurface + ?Sized> ProgressLog<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        Self {
            document: String::new(),
            surface,
        }
    }

    pub fn push(&mut self, segment: impl AsRef<str>) {
        self.document.push_str(segment.as_ref());
        self.surface.render(&self.document);
    }

    pub fn notify(&mut self, notice: Notice) {
        self.surface.notify(notice);
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn into_document(self) -> String {
        self.document
    }
}

/// Prints the report to a writer, only the part not printed yet.
pub struct TerminalSurface<W: Write> {
    out: W,
    printed: usize,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }
}

impl TerminalSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ReportSurface for TerminalSurface<W> {
    fn render(&mut self, document: &str) {
        if let Some(tail) = document.get(self.printed..) {
            let _ = self.out.write_all(tail.as_bytes());
            let _ = self.out.flush();
            self.printed = document.len();
        }
    }

    fn notify(&mut self, notice: Notice) {
        let mark = match notice.level {
            NoticeLevel::Success => "✔",
            NoticeLevel::Failure => "✘",
        };
        match notice.message {
            Some(message) => eprintln!("{mark} {}: {message}", notice.title),
            None => eprintln!("{mark} {}", notice.title),
        }
    }
}

/// Keeps every rendered document and notice; used when embedding.
#[derive(Debug, Default)]
pub struct MemorySurface {
    pub renders: Vec<String>,
    pub notices: Vec<Notice>,
}

impl MemorySurface {
    pub fn last(&self) -> &str {
        self.renders.last().map(String::as_str).unwrap_or("")
    }
}

impl ReportSurface for MemorySurface {
    fn render(&mut self, document: &str) {
        self.renders.push(document.to_string());
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_renders_after_each_push() {
        let mut surface = MemorySurface::default();
        let mut log = ProgressLog::new(&mut surface);
        log.push("# Title\n\n");
        log.push("entry\n\n");
        assert_eq!(log.document(), "# Title\n\nentry\n\n");
        drop(log);

        assert_eq!(surface.renders, ["# Title\n\n", "# Title\n\nentry\n\n"]);
    }

    #[test]
    fn test_terminal_prints_only_new_text() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.render("a");
        surface.render("ab");
        surface.render("abc");
        assert_eq!(surface.out, b"abc");
    }
}
