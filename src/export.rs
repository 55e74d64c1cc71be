use std::fs::{File, OpenOptions};
use std::io::{BufRead as _, BufReader, BufWriter, Read as _, Write as _};
use std::path::Path;

use anyhow::Context as _;

use crate::cli::TableFormat;
use crate::formats::{BookRecord, COLUMNS, TableRow};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const NOT_AVAILABLE: &str = "NA";

/// Opens `path` for writing, refusing to replace an existing file unless
/// `force` is set.
pub fn create_output(path: &Path, force: bool) -> anyhow::Result<File> {
    if path.exists() && !force {
        anyhow::bail!("output already exists: {}", path.display());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options
        .open(path)
        .with_context(|| format!("open output: {}", path.display()))
}

/// A CSV writer that starts the file with a UTF-8 byte order mark so
/// spreadsheet tools pick the right encoding.
pub fn csv_writer(path: &Path, force: bool) -> anyhow::Result<csv::Writer<BufWriter<File>>> {
    let mut out = BufWriter::new(create_output(path, force)?);
    out.write_all(UTF8_BOM)
        .with_context(|| format!("write bom: {}", path.display()))?;
    Ok(csv::Writer::from_writer(out))
}

pub fn write_table(
    path: &Path,
    records: &[BookRecord],
    format: TableFormat,
    force: bool,
) -> anyhow::Result<()> {
    let rows: Vec<TableRow> = records.iter().map(TableRow::from).collect();
    let written = match format {
        TableFormat::Jsonl => write_jsonl(path, &rows, force),
        TableFormat::Csv => write_csv(path, &rows, force),
    };
    written.with_context(|| format!("write table: {}", path.display()))?;

    tracing::info!(rows = rows.len(), out = %path.display(), ?format, "table exported");
    Ok(())
}

fn write_jsonl(path: &Path, rows: &[TableRow], force: bool) -> anyhow::Result<()> {
    let mut out = BufWriter::new(create_output(path, force)?);
    for row in rows {
        serde_json::to_writer(&mut out, row).context("serialize table row")?;
        out.write_all(b"\n").context("write table newline")?;
    }
    out.flush().context("flush table")?;
    Ok(())
}

fn write_csv(path: &Path, rows: &[TableRow], force: bool) -> anyhow::Result<()> {
    let mut writer = csv_writer(path, force)?;
    writer.write_record(COLUMNS).context("write csv header")?;
    for row in rows {
        let price_original = row
            .price_original
            .map_or_else(|| NOT_AVAILABLE.to_owned(), |p| p.to_string());
        let price_special = row.price_special.to_string();
        writer
            .write_record([
                row.name.as_str(),
                row.author.as_str(),
                row.category_1.as_deref().unwrap_or_default(),
                row.category_2.as_deref().unwrap_or_default(),
                row.category_3.as_deref().unwrap_or_default(),
                row.category_4.as_deref().unwrap_or_default(),
                price_original.as_str(),
                price_special.as_str(),
            ])
            .context("write csv row")?;
    }
    writer.flush().context("flush csv")?;
    Ok(())
}

/// Loads a table written by [`write_table`]; `.csv` files are read as CSV,
/// anything else as JSON Lines.
pub fn load_table(path: &Path) -> anyhow::Result<Vec<TableRow>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let file = File::open(path).with_context(|| format!("open table: {}", path.display()))?;
    let rows = if is_csv {
        load_csv(file)
    } else {
        load_jsonl(file)
    }
    .with_context(|| format!("load table: {}", path.display()))?;

    tracing::debug!(rows = rows.len(), input = %path.display(), "table loaded");
    Ok(rows)
}

fn load_jsonl(file: File) -> anyhow::Result<Vec<TableRow>> {
    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context("read table line")?;
        let line = line.trim_start_matches('\u{feff}');
        if line.trim().is_empty() {
            continue;
        }
        let row: TableRow = serde_json::from_str(line)
            .with_context(|| format!("parse table row at line {}", idx + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

fn load_csv(mut file: File) -> anyhow::Result<Vec<TableRow>> {
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).context("read csv")?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers().context("read csv header")?.clone();
    if headers.iter().ne(COLUMNS) {
        anyhow::bail!("unexpected csv columns: {headers:?}");
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.context("read csv row")?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        let optional = |i: usize| Some(field(i).to_owned()).filter(|s| !s.is_empty());

        let price_original = match field(6) {
            "" | NOT_AVAILABLE => None,
            text => Some(
                text.parse::<u32>()
                    .with_context(|| format!("parse Price_original at row {}", idx + 1))?,
            ),
        };
        let price_special = field(7)
            .parse::<u32>()
            .with_context(|| format!("parse Price_special at row {}", idx + 1))?;

        rows.push(TableRow {
            name: field(0).to_owned(),
            author: field(1).to_owned(),
            category_1: optional(2),
            category_2: optional(3),
            category_3: optional(4),
            category_4: optional(5),
            price_original,
            price_special,
        });
    }
    Ok(rows)
}
