#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use merchant_recon::Table;
use tempfile::{TempDir, tempdir};

pub const BASE_CSV: &str = "\
Client Code,GMV,Transaction Count,Successful Transactions,Attempted Transactions
M1,100,10,9,10
M2,100,20,18,20
M3,0,5,4,5
M4,200,8,8,8
";

pub const CURRENT_CSV: &str = "\
client code,gmv,txn count,successful transactions,attempted transactions
M1,130,12,11,12
M2,70,15,12,15
M3,50,6,6,6
M5,10,1,1,1
";

pub const MAPPING_CSV: &str = "\
Client Code,Account Manager
M1,Asha
M2,Ravi
M3,Asha
M9,Ghost
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Base, current and mapping sample snapshots.
    pub fn write_samples(&self) -> (PathBuf, PathBuf, PathBuf) {
        (
            self.write("base.csv", BASE_CSV),
            self.write("current.csv", CURRENT_CSV),
            self.write("mapping.csv", MAPPING_CSV),
        )
    }
}

/// In-memory table from a header slice and row slices.
pub fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
    Table::from_raw(
        headers.iter().copied(),
        rows.iter().map(|row| row.iter().copied()),
    )
}

/// In-memory table parsed from CSV text.
pub fn csv_table(raw: &str) -> Table {
    merchant_recon::io_utils::read_table_from(raw.as_bytes(), b',', encoding_rs::UTF_8)
        .expect("parse csv table")
}
