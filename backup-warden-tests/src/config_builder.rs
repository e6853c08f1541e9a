//! Builder for config texts in the line-oriented policy grammar

use std::path::{Path, PathBuf};

/// One `[pattern]` section with its key=value fields.
#[derive(Debug, Clone)]
pub struct PolicySection {
    pub pattern: String,
    pub kind: &'static str,
    pub directory: PathBuf,
    pub disk_limit: u32,
    pub min_backups: u32,
    pub max_backups: u32,
}

/// Builds config file contents section by section.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    sections: Vec<PolicySection>,
    raw_lines: Vec<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file-artifact section with sensible defaults
    /// (limit 90%, keep 2 to 5).
    pub fn section(self, pattern: &str, directory: &Path) -> Self {
        self.section_with(pattern, directory, "arquivo", 90, 2, 5)
    }

    /// Add a fully specified section.
    pub fn section_with(
        mut self,
        pattern: &str,
        directory: &Path,
        kind: &'static str,
        disk_limit: u32,
        min_backups: u32,
        max_backups: u32,
    ) -> Self {
        self.sections.push(PolicySection {
            pattern: pattern.to_string(),
            kind,
            directory: directory.to_path_buf(),
            disk_limit,
            min_backups,
            max_backups,
        });
        self
    }

    /// Append a raw line verbatim (for malformed-input tests).
    pub fn raw_line(mut self, line: &str) -> Self {
        self.raw_lines.push(line.to_string());
        self
    }

    /// Render the config text.
    pub fn build(&self) -> String {
        let mut text = String::from("# generated by test_utils::ConfigBuilder\n");
        for section in &self.sections {
            text.push_str(&format!(
                "[{}]\n\
                 tipo_backup={}\n\
                 diretorio={}\n\
                 limite_disco={}\n\
                 qtd_minima_backups={}\n\
                 qtd_maxima_backups={}\n",
                section.pattern,
                section.kind,
                section.directory.display(),
                section.disk_limit,
                section.min_backups,
                section.max_backups,
            ));
        }
        for line in &self.raw_lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    /// Write the config text to a file and return its path.
    pub fn write_to(&self, path: &Path) -> PathBuf {
        std::fs::write(path, self.build()).expect("Failed to write test config");
        path.to_path_buf()
    }
}
