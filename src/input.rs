use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::types::{TaxId, TaxonRecord};

/// Opens a text file for line reading, transparently un-gzipping `*.gz`.
pub fn open_text<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let f = File::open(path)?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

/// Parses one `taxid<TAB>value[<TAB>total]` line.
fn parse_record_line(line: &str) -> Option<TaxonRecord> {
    let mut fields = line.split('\t').map(str::trim);
    let id: TaxId = fields.next()?.parse().ok()?;
    let value: f64 = fields.next()?.parse().ok()?;
    let total_population = match fields.next() {
        Some(raw) if !raw.is_empty() => Some(raw.parse::<f64>().ok()?),
        _ => None,
    };
    Some(TaxonRecord { id, value, total_population })
}

/// Reads the record stream from any buffered reader, keeping input order.
///
/// Blank lines and `#` comments are ignored; unparseable lines are skipped
/// with a warning.
pub fn read_records_from<R: BufRead>(reader: R) -> io::Result<Vec<TaxonRecord>> {
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match parse_record_line(trimmed) {
            Some(record) => records.push(record),
            None => log::warn!("Skipping invalid line {}: {}", line_no + 1, trimmed),
        }
    }

    Ok(records)
}

/// Reads a TSV record file (optionally gzipped).
pub fn read_records<P: AsRef<Path>>(path: P) -> io::Result<Vec<TaxonRecord>> {
    let records = read_records_from(open_text(&path)?)?;
    log::info!("Read {} records from {}", records.len(), path.as_ref().display());
    Ok(records)
}
