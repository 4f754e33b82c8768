//! Create and manipulate the [Table].

use crate::utils;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// A row-based table of delimited text data.
///
/// # Examples
///
/// ```
/// use convsel::Table;
///
/// let mut table = Table::new();
/// table.headers = vec!["Sites".to_string(), "Diffsel".to_string()];
/// table.add_row(vec!["12".to_string(), "0.998".to_string()])?;
///
/// println!("{}", table.to_markdown());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
///
/// | Sites | Diffsel |
/// |-------|---------|
/// |  12   |  0.998  |
///
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Table {
    /// Names of the table columns.
    pub headers: Vec<String>,
    /// Rows of table values.
    pub rows: Vec<Vec<String>>,
    /// Optional file path for where the table was read from.
    pub path: Option<PathBuf>,
}

impl Table {
    /// Create a new table with empty headers and rows.
    pub fn new() -> Self {
        Table { headers: Vec::new(), rows: Vec::new(), path: None }
    }

    /// Add a new row to the table.
    ///
    /// Returns an Error if the new row doesn't match the header width.
    pub fn add_row(&mut self, row: Vec<String>) -> Result<(), Report> {
        let new = row.len();
        let ex = self.headers.len();
        if ex != new {
            Err(eyre!("New row size ({new}) does not match the table headers ({ex})."))?
        }
        self.rows.push(row);
        Ok(())
    }

    /// Get table value at a particular column and row index.
    ///
    /// # Arguments
    ///
    /// * `header` - Column name.
    /// * `row` - Row index (0-based).
    ///
    /// # Examples
    ///
    /// ```
    /// use convsel::Table;
    ///
    /// let mut table = Table::new();
    /// table.headers = vec!["Sites".to_string(), "Diffsel".to_string()];
    /// table.add_row(vec!["12".to_string(), "0.998".to_string()])?;
    ///
    /// assert_eq!(table.get("Diffsel", 0)?, "0.998");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get(&self, header: &str, row: usize) -> Result<&str, Report> {
        let header_i = self.get_header_index(header)?;
        let row = self.get_row(row)?;
        Ok(&row[header_i])
    }

    /// Return a vector of table values in a column.
    ///
    /// # Arguments
    ///
    /// * `header` - Column name.
    pub fn get_column(&self, header: &str) -> Result<Vec<&str>, Report> {
        let header_i = self.get_header_index(header)?;
        let column = self.rows.iter().map(|row| row[header_i].as_str()).collect();
        Ok(column)
    }

    /// Return a vector of table values in a row.
    ///
    /// # Arguments
    ///
    /// * `i` - Row index (0-based).
    pub fn get_row(&self, i: usize) -> Result<&[String], Report> {
        if i >= self.rows.len() {
            Err(eyre!("Row ({i}) does not exist in the table."))
        } else {
            Ok(&self.rows[i])
        }
    }

    /// Get the column index (0-based) corresponding to the header.
    ///
    /// # Arguments
    ///
    /// * `header` - Header name.
    pub fn get_header_index(&self, header: &str) -> Result<usize, Report> {
        let pos = self.headers.iter().position(|h| h == header).ok_or_else(|| {
            eyre!("Column '{header}' was not found in table: {:?}.", self.path)
        })?;

        Ok(pos)
    }

    /// Read a TSV or CSV file into a Table.
    ///
    /// # Arguments
    ///
    /// * `path` - File path.
    /// * `delim` - Optional delimiter. Otherwise, will be identified based on path suffix (.tsv or .csv).
    ///
    /// # Examples
    ///
    /// ```
    /// use convsel::Table;
    /// use std::io::Write;
    /// use tempfile::NamedTempFile;
    ///
    /// let mut file = NamedTempFile::new()?;
    /// writeln!(file, "Sites\tDiffsel\n12\t0.998")?;
    /// let table = Table::read(file.path(), Some('\t'))?;
    /// assert_eq!(table.get_column("Sites")?, vec!["12"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn read(path: &Path, delim: Option<char>) -> Result<Table, Report> {
        let mut table = Table::new();

        // if not provided, lookup delimiter from file extension
        let delim = match delim {
            Some(c) => c,
            None => utils::get_delimiter(&path)?,
        };

        // attempt to open the file path
        let file = File::open(path).wrap_err_with(|| eyre!("Failed to read file: {path:?}"))?;

        // read and parse lines
        for line in BufReader::new(file).lines() {
            let line = line.wrap_err_with(|| eyre!("Failed to read line in file: {path:?}"))?;
            let row = line.split(delim).map(String::from).collect_vec();
            // if headers are empty, this is the first line, write headers
            if table.headers.is_empty() {
                table.headers = row;
            }
            // otherwise regular row
            else {
                table.rows.push(row);
            }
        }

        table.path = Some(path.to_path_buf());

        Ok(table)
    }

    /// Write table to file.
    ///
    /// # Examples
    ///
    /// ```
    /// use convsel::Table;
    /// use tempfile::NamedTempFile;
    ///
    /// let mut table = Table::new();
    /// table.headers = vec!["Sites".to_string(), "Diffsel".to_string()];
    /// table.add_row(vec!["12".to_string(), "0.998".to_string()])?;
    ///
    /// let file = NamedTempFile::new()?;
    /// table.write(file.path(), Some('\t'))?;
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn write(&self, path: &Path, delim: Option<char>) -> Result<(), Report> {
        let mut file =
            File::create(path).wrap_err_with(|| format!("Unable to create file: {path:?}"))?;

        // if not provided, lookup delimiter from file extension
        let delim = match delim {
            Some(c) => c,
            None => utils::get_delimiter(&path)?,
        };

        // write headers
        let line = format!("{}\n", self.headers.iter().join(delim.to_string().as_str()));
        file.write_all(line.as_bytes())
            .wrap_err_with(|| format!("Unable to write table headers: {line}"))?;

        // write regular rows
        for row in &self.rows {
            let line = format!("{}\n", row.iter().join(delim.to_string().as_str()));
            file.write_all(line.as_bytes())
                .wrap_err_with(|| format!("Unable to write table rows: {line}"))?;
        }

        Ok(())
    }

    /// Convert table to markdown format.
    pub fn to_markdown(&self) -> String {
        // get the maximum width of each column
        let col_widths = self
            // iterate through columns/headers
            .headers
            .iter()
            .enumerate()
            .map(|(col_i, header)| {
                let header_width = header.len();
                self
                    // iterate through this column's rows,
                    // get max string width, +2 to add space on either side
                    .rows
                    .iter()
                    .map(|row| {
                        let cell_width = row[col_i].len();
                        if cell_width >= header_width {
                            cell_width + 2
                        } else {
                            header_width + 2
                        }
                    })
                    .max()
                    .unwrap_or(header_width + 2)
            })
            .collect_vec();

        let mut markdown = String::from("|");
        // frame in between headers and rows
        let mut header_frame = String::from("|");

        // Create the header line
        for (header, col_width) in self.headers.iter().zip(col_widths.iter()) {
            let cell = format!("{:^width$}|", header, width = col_width);
            markdown.push_str(&cell);

            let frame = format!("{}|", "-".repeat(*col_width));
            header_frame.push_str(&frame);
        }
        markdown.push('\n');
        markdown.push_str(&header_frame);
        markdown.push('\n');

        // Create the row lines
        for row in &self.rows {
            markdown.push('|');
            for (col_i, col_width) in col_widths.iter().enumerate() {
                let cell = format!("{:^width$}|", row[col_i], width = col_width);
                markdown.push_str(&cell);
            }
            markdown.push('\n');
        }

        markdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as IoWrite;
    use tempfile::NamedTempFile;

    fn site_table() -> Result<Table, Report> {
        let mut table = Table::new();
        table.headers = vec!["Sites".to_string(), "Diffsel".to_string()];
        table.add_row(vec!["0".to_string(), "0.42".to_string()])?;
        table.add_row(vec!["1".to_string(), "0.998".to_string()])?;
        Ok(table)
    }

    #[test]
    fn add_row_wrong_width() -> Result<(), Report> {
        let mut table = site_table()?;
        assert!(table.add_row(vec!["2".to_string()]).is_err());
        Ok(())
    }

    #[test]
    fn missing_column() -> Result<(), Report> {
        let table = site_table()?;
        assert!(table.get_column("pvalue").is_err());
        Ok(())
    }

    #[test]
    fn write_read_round_trip() -> Result<(), Report> {
        let table = site_table()?;
        let file = NamedTempFile::new()?;
        table.write(file.path(), Some('\t'))?;

        let restored = Table::read(file.path(), Some('\t'))?;
        assert_eq!(restored.headers, table.headers);
        assert_eq!(restored.rows, table.rows);
        Ok(())
    }

    #[test]
    fn read_csv_by_extension() -> Result<(), Report> {
        let mut file = NamedTempFile::with_suffix(".csv")?;
        writeln!(file, "Sites,Diffsel")?;
        writeln!(file, "3,0.5")?;
        let table = Table::read(file.path(), None)?;
        assert_eq!(table.get("Diffsel", 0)?, "0.5");
        Ok(())
    }
}
