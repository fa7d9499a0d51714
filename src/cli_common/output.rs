//! Модуль для форматирования и вывода результатов

use crate::analyzer::{AnalysisReport, DocumentReport, EditSummary, NodeSummary};
use crate::diagnostics::Diagnostic;
use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Формат вывода результатов
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Writer для вывода результатов
pub struct OutputWriter {
    writer: Box<dyn Write>,
    format: OutputFormat,
}

impl OutputWriter {
    /// Создает writer для stdout
    pub fn stdout(format: OutputFormat) -> Self {
        Self { writer: Box::new(io::stdout()), format }
    }

    /// Создает writer для файла
    pub fn file(path: &Path, format: OutputFormat) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self { writer: Box::new(file), format })
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Записывает сериализуемый объект
    pub fn write_object<T: Serialize>(&mut self, obj: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(obj)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Записывает строку
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }

    /// Записывает заголовок
    pub fn write_header(&mut self, header: &str) -> Result<()> {
        writeln!(self.writer, "\n{}", header.bold().blue())?;
        writeln!(self.writer, "{}", "=".repeat(header.len()).blue())?;
        Ok(())
    }

    /// Отчёт по одному документу
    pub fn write_report(&mut self, title: &str, report: &AnalysisReport) -> Result<()> {
        if self.format == OutputFormat::Json {
            return self.write_object(report);
        }
        self.write_header(title)?;
        self.write_diagnostics(&report.diagnostics)?;
        if !report.semantic_edits.is_empty() {
            self.write_line(&format!("{} semantic edit(s)", report.semantic_edits.len()))?;
        }
        for mapping in &report.active_statements {
            let target = match mapping.new_statement {
                Some(id) => format!("node {} {:?}", id.0, mapping.new_part),
                None => "deleted".red().to_string(),
            };
            self.write_line(&format!(
                "  active [{}..{}) -> {} [{}..{})",
                mapping.old_span.start,
                mapping.old_span.end(),
                target,
                mapping.new_span.start,
                mapping.new_span.end()
            ))?;
        }
        Ok(())
    }

    pub fn write_batch(&mut self, reports: &[DocumentReport]) -> Result<()> {
        if self.format == OutputFormat::Json {
            return self.write_object(&reports);
        }
        for doc in reports {
            self.write_report(&doc.name, &doc.report)?;
        }
        let rude: usize = reports.iter().map(|r| r.report.diagnostics.len()).sum();
        self.write_line(&format!("\n{} documents, {} rude edits", reports.len(), rude))?;
        Ok(())
    }

    /// Скрипт правок верхнего уровня
    pub fn write_edits(&mut self, edits: &[EditSummary]) -> Result<()> {
        if self.format == OutputFormat::Json {
            return self.write_object(&edits);
        }
        if edits.is_empty() {
            return self.write_line(&"No edits".green().to_string());
        }
        for edit in edits {
            let old = edit.old.as_ref().map(describe_node).unwrap_or_default();
            let new = edit.new.as_ref().map(describe_node).unwrap_or_default();
            let line = match (edit.old.is_some(), edit.new.is_some()) {
                (true, true) => format!("{:?} {} -> {}", edit.kind, old, new),
                (true, false) => format!("{:?} {}", edit.kind, old),
                _ => format!("{:?} {}", edit.kind, new),
            };
            self.write_line(&format!("  {}", line))?;
        }
        Ok(())
    }

    fn write_diagnostics(&mut self, diagnostics: &[Diagnostic]) -> Result<()> {
        if diagnostics.is_empty() {
            return self.write_line(&"No rude edits".green().to_string());
        }
        for d in diagnostics {
            let (start, len) = d.span;
            self.write_line(&format!("  {} [{}..{}) {}", d.code.red().bold(), start, start + len, d.message))?;
        }
        Ok(())
    }

    /// Завершает запись и сбрасывает буфер
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn describe_node(node: &NodeSummary) -> String {
    match &node.name {
        Some(name) => format!("{:?} '{}' [{}..{})", node.kind, name, node.span.start, node.span.end()),
        None => format!("{:?} [{}..{})", node.kind, node.span.start, node.span.end()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RudeEditKind;
    use crate::core::errors::ErrorLevel;
    use tempfile::NamedTempFile;

    fn report() -> AnalysisReport {
        AnalysisReport {
            edits: Vec::new(),
            diagnostics: vec![Diagnostic {
                code: RudeEditKind::Delete.code(),
                kind: RudeEditKind::Delete,
                level: ErrorLevel::Error,
                span: (4, 6),
                display_name: Some("method".to_string()),
                arguments: vec!["method".to_string()],
                message: RudeEditKind::Delete.format_message(&["method".to_string()]),
            }],
            semantic_edits: Vec::new(),
            active_statements: Vec::new(),
        }
    }

    #[test]
    fn text_report_lists_codes() {
        colored::control::set_override(false);
        let temp_file = NamedTempFile::new().unwrap();
        let mut writer = OutputWriter::file(temp_file.path(), OutputFormat::Text).unwrap();
        writer.write_report("doc", &report()).unwrap();
        writer.flush().unwrap();
        let text = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(text.contains(&RudeEditKind::Delete.code()));
        assert!(text.contains("[4..10)"));
    }

    #[test]
    fn json_report_is_parseable() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut writer = OutputWriter::file(temp_file.path(), OutputFormat::Json).unwrap();
        writer.write_report("doc", &report()).unwrap();
        writer.flush().unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(temp_file.path()).unwrap()).unwrap();
        assert_eq!(value["diagnostics"][0]["span"], serde_json::json!([4, 6]));
    }
}
