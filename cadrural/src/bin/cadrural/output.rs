use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, CellAlignment, Color as TableColor, Table, presets};
use serde::Serialize;

use crate::style::{Notice, PALETTE, paint};

#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Tables for people (default)
    #[default]
    Table,
    /// Pretty JSON, same shapes as the HTTP API
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Data rendered as one or more tables in table mode.
pub trait TableDisplay {
    fn to_table(&self, output: &OutputManager) -> Vec<Table>;
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    fn is_json(&self) -> bool {
        self.options.output_format == OutputFormat::Json
    }

    fn colors(&self) -> bool {
        !self.options.no_color
    }

    /// Prints `data` as JSON or tables; nothing in quiet mode.
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }
        if self.is_json() {
            println!("{}", serde_json::to_string_pretty(data)?);
        } else {
            for table in data.to_table(self) {
                println!("{table}");
            }
        }
        Ok(())
    }

    /// The line printed for a notice, or `None` when it is suppressed.
    ///
    /// Errors always print. Warnings are silenced by quiet mode only, since they
    /// go to stderr; success and info lines are also dropped in JSON mode.
    fn notice_line(&self, notice: Notice, message: &str) -> Option<String> {
        let shown = match notice {
            Notice::Error => true,
            Notice::Warning => !self.options.quiet,
            Notice::Success | Notice::Info => !self.options.quiet && !self.is_json(),
        };
        shown.then(|| {
            let tone = notice.tone();
            format!(
                "{} {}",
                paint(notice.icon(), tone, false, self.colors()),
                paint(message, tone, false, self.colors())
            )
        })
    }

    fn notify(&self, notice: Notice, message: &str) {
        if let Some(line) = self.notice_line(notice, message) {
            if notice.to_stderr() {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        }
    }

    pub fn success(&self, message: &str) {
        self.notify(Notice::Success, message);
    }

    pub fn error(&self, message: &str) {
        self.notify(Notice::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.notify(Notice::Warning, message);
    }

    pub fn info(&self, message: &str) {
        self.notify(Notice::Info, message);
    }

    pub fn heading(&self, text: &str) {
        if self.options.quiet || self.is_json() {
            return;
        }
        if self.colors() {
            println!("\n{}", text.color(PALETTE.title.term).bold());
        } else {
            println!("\n{text}\n{}", "=".repeat(text.chars().count()));
        }
    }

    /// Empty table with the given bold header row.
    pub fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(if self.colors() {
            presets::UTF8_FULL_CONDENSED
        } else {
            presets::ASCII_FULL
        });
        table.set_header(headers.iter().map(|header| {
            let cell = Cell::new(header).add_attribute(Attribute::Bold);
            if self.colors() { cell.fg(TableColor::Cyan) } else { cell }
        }));
        table
    }

    /// Two-column table of labels and values.
    pub fn key_value_table(&self, headers: &[&str], rows: &[(&str, String)]) -> Table {
        let mut table = self.table(headers);
        for (key, value) in rows {
            table.add_row(vec![Cell::new(key), Cell::new(value).set_alignment(CellAlignment::Right)]);
        }
        table
    }
}
