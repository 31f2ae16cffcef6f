use std::fmt::{Display, Formatter};

/// Line-oriented audit text produced by an action batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Appends trimmed helper output as indented `OUT:` / `ERR:` lines, skipping
    /// blank streams.
    pub fn push_streams(&mut self, stdout: &str, stderr: &str) {
        let out = stdout.trim();
        if !out.is_empty() {
            self.lines.push(format!("    OUT: {out}"));
        }
        let err = stderr.trim();
        if !err.is_empty() {
            self.lines.push(format!("    ERR: {err}"));
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn lines_starting_with<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a String> {
        self.lines.iter().filter(move |line| line.starts_with(prefix))
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
