//! CSV ingestion and export.
//!
//! - **Delimiter resolution**: `.tsv` means tab, anything else comma, unless
//!   overridden.
//! - **Encoding**: input bytes are decoded with `encoding_rs` (UTF-8 default).
//! - **stdout**: the `-` path writes the export to standard output.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    data::{Table, Value},
    join::ReconciledTable,
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads a whole delimited file into a [`Table`]. Headers are kept verbatim;
/// normalization happens in the pipeline.
pub fn read_table(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    read_table_from(BufReader::new(file), delimiter, encoding)
        .with_context(|| format!("Reading table from {path:?}"))
}

pub fn read_table_from<R: Read>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Table> {
    let mut reader = open_csv_reader(reader, delimiter);
    let header_record = reader.byte_headers().context("Reading header row")?.clone();
    let mut headers = decode_record(&header_record, encoding)?;
    if let Some(first) = headers.first_mut() {
        // Excel-saved UTF-8 files lead with a byte-order mark.
        *first = first.trim_start_matches('\u{feff}').to_string();
    }

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        if decoded.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut values: Vec<Value> = decoded.iter().map(|cell| Value::from_raw(cell)).collect();
        values.resize(headers.len(), Value::Null);
        rows.push(values);
    }
    debug!("Read {} row(s) across {} column(s)", rows.len(), headers.len());
    Ok(Table::new(headers, rows))
}

pub fn open_csv_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = if is_dash(path) {
        Box::new(std::io::stdout())
    } else {
        Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
        ))
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(sink))
}

/// Writes every column of `table`, header row first; nulls become empty cells.
pub fn write_export<W: Write>(writer: &mut csv::Writer<W>, table: &ReconciledTable) -> Result<()> {
    writer
        .write_record(table.headers())
        .context("Writing export headers")?;
    for (idx, record) in table.records.iter().enumerate() {
        writer
            .write_record(record.values.iter().map(Value::as_display))
            .with_context(|| format!("Writing export row {}", idx + 2))?;
    }
    writer.flush().context("Flushing export writer")?;
    Ok(())
}
