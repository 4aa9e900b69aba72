use crate::error::Result;
use crate::model::Directory;
use console::style;
use serde::Serialize;
use std::io::Write;

pub const SCHEMA_VERSION: u32 = 1;
const AUTHOR_SEPARATOR: &str = ", ";
const COLUMN_GAP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub path: String,
    pub changes: u64,
    pub percent: u64,
    pub authors: Vec<String>,
}

impl ReportRow {
    fn new(path: String, changes: u64, total: u64, authors: Vec<String>) -> Self {
        Self {
            path,
            changes,
            percent: percent(changes, total),
            authors,
        }
    }

    /// `"12 (86%)"`
    pub fn changes_cell(&self) -> String {
        format!("{} ({}%)", self.changes, self.percent)
    }

    pub fn authors_cell(&self) -> String {
        self.authors.join(AUTHOR_SEPARATOR)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub version: u32,
    pub total: u64,
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// Ranks the analyzed directories.
    ///
    /// Empty directories are dropped, the rest are sorted by changes
    /// (descending, stable) and flattened into rows at the requested
    /// granularity. `top` keeps only the first rows: `None` keeps all of
    /// them and `Some(0)` none.
    pub fn build(directories: Vec<Directory>, granularity: Granularity, top: Option<usize>) -> Self {
        let mut directories: Vec<Directory> =
            directories.into_iter().filter(|d| !d.is_empty()).collect();
        let total: u64 = directories.iter().map(|d| d.changes).sum();

        // Arrival order depends on worker scheduling, so ties are broken by path.
        directories.sort_by(|a, b| b.changes.cmp(&a.changes).then_with(|| a.path.cmp(&b.path)));

        let mut rows = Vec::new();
        for dir in directories {
            match granularity {
                Granularity::File => {
                    let mut files = dir.files;
                    files.sort_by(|a, b| b.changes.cmp(&a.changes));
                    for file in files {
                        let path = dir.path.join(&file.path).display().to_string();
                        rows.push(ReportRow::new(path, file.changes, total, file.authors));
                    }
                }
                Granularity::Directory => {
                    rows.push(ReportRow::new(
                        dir.path.display().to_string(),
                        dir.changes,
                        total,
                        dir.authors,
                    ));
                }
            }
        }

        if let Some(top) = top {
            rows.truncate(top);
        }

        Self {
            version: SCHEMA_VERSION,
            total,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes an aligned PATH / CHANGES / AUTHORS table. Writes nothing at
    /// all for an empty report.
    pub fn write_table<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let cells: Vec<(String, String, String)> = self
            .rows
            .iter()
            .map(|r| (r.path.clone(), r.changes_cell(), r.authors_cell()))
            .collect();

        let path_width = cells.iter().map(|c| c.0.chars().count()).max().unwrap_or(0).max(4);
        let changes_width = cells.iter().map(|c| c.1.chars().count()).max().unwrap_or(0).max(7);

        writeln!(
            out,
            "{}{}{}{}{}",
            style("PATH").bold(),
            pad(4, path_width),
            style("CHANGES").bold(),
            pad(7, changes_width),
            style("AUTHORS").bold()
        )?;
        for (path, changes, authors) in &cells {
            writeln!(
                out,
                "{path}{}{changes}{}{authors}",
                pad(path.chars().count(), path_width),
                pad(changes.chars().count(), changes_width),
            )?;
        }
        Ok(())
    }

    pub fn write_json<W: Write>(&self, out: &mut W, days: u32) -> Result<()> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            version: u32,
            days: u32,
            total: u64,
            rows: &'a [ReportRow],
        }

        let doc = JsonReport {
            version: self.version,
            days,
            total: self.total,
            rows: &self.rows,
        };
        serde_json::to_writer_pretty(&mut *out, &doc)?;
        writeln!(out)?;
        Ok(())
    }
}

fn pad(len: usize, width: usize) -> String {
    " ".repeat(width - len + COLUMN_GAP)
}

/// Share of `total`, rounded to the nearest whole percent.
fn percent(changes: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (changes as f64 / total as f64 * 100.0).round() as u64
}
