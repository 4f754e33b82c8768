//! Read protein alignments from fasta files.

use color_eyre::eyre::{eyre, ContextCompat, Report, Result, WrapErr};
use color_eyre::Help;
use noodles::{core::Position, fasta};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

// ----------------------------------------------------------------------------
// Record
// ----------------------------------------------------------------------------

/// A single named sequence from a fasta file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub id: String,
    pub sequence: Vec<char>,
}

impl Record {
    /// Create a [`Record`] from a [`noodles`] [`fasta::Record`].
    pub fn from_noodles(record: fasta::Record) -> Result<Self, Report> {
        let id = record.name().to_string();

        // convert sequence to vec of char residues, noodle positions are 1-based!
        let start = Position::try_from(1)?;
        let sequence = record
            .sequence()
            .get(start..)
            .wrap_err(format!("Failed to parse sequence record {id}"))?
            .iter()
            .map(|b| (*b as char).to_ascii_uppercase())
            .collect::<Vec<_>>();

        Ok(Record { id, sequence })
    }
}

// ----------------------------------------------------------------------------
// Alignment
// ----------------------------------------------------------------------------

/// A multiple sequence alignment where all records have the same length.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Alignment {
    pub records: Vec<Record>,
    /// Number of columns in the alignment.
    pub length: usize,
    /// Optional file path for where the alignment was read from.
    pub path: Option<PathBuf>,
}

impl Alignment {
    /// Read a fasta file into an [`Alignment`].
    ///
    /// Returns an Error if the file is empty or the records are not all the
    /// same length.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use convsel::sequence::Alignment;
    /// use std::io::Write;
    /// use tempfile::NamedTempFile;
    ///
    /// let mut file = NamedTempFile::new()?;
    /// writeln!(file, ">sample_A\nMKLV\n>sample_B\nMKIV")?;
    /// let alignment = Alignment::read(&file.path())?;
    /// assert_eq!(alignment.records.len(), 2);
    /// assert_eq!(alignment.length, 4);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn read<P>(path: &P) -> Result<Alignment, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let mut reader = File::open(path)
            .map(BufReader::new)
            .map(fasta::Reader::new)
            .wrap_err(format!("Failed to read: {path:?}"))?;

        let mut alignment =
            Alignment { records: Vec::new(), length: 0, path: Some(path.as_ref().to_path_buf()) };

        for result in reader.records() {
            let record = result.wrap_err(format!("Failed to parse fasta record in: {path:?}"))?;
            let record = Record::from_noodles(record)?;

            if alignment.records.is_empty() {
                alignment.length = record.sequence.len();
            } else if record.sequence.len() != alignment.length {
                Err(eyre!(
                    "Records in {path:?} are different lengths ({} vs {} for {}).",
                    alignment.length,
                    record.sequence.len(),
                    record.id,
                )
                .suggestion("Are the sequences actually aligned?"))?;
            }
            alignment.records.push(record);
        }

        if alignment.records.is_empty() {
            Err(eyre!("No fasta records were found in: {path:?}"))?
        }

        Ok(alignment)
    }

    /// Return the record with the requested id, if present.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Return the ids of all records.
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }
}
