//! Plain-text numeric matrices, optionally gzipped.

use candle_core::{Device, Tensor};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    let file = File::open(input_file)?;
    match ext {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not; "stdout" writes to stdout
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write>> {
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    let file = File::create(output_file)?;
    match ext {
        Some("gz") => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

///
/// Read a dense matrix; rows are lines, columns split on tabs, commas or
/// spaces. Blank lines and lines starting with `#` are skipped.
///
/// * `input_file` - file name--either gzipped or not
pub fn read_matrix(input_file: &str) -> anyhow::Result<Vec<Vec<f64>>> {
    let reader = open_buf_reader(input_file)?;
    let mut rows = vec![];

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split(|c: char| c == '\t' || c == ',' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(|w| {
                w.parse::<f64>().map_err(|e| {
                    anyhow::anyhow!("{}:{}: cannot parse '{}': {}", input_file, lineno + 1, w, e)
                })
            })
            .collect::<anyhow::Result<Vec<f64>>>()?;

        if let Some(first) = rows.first().map(|r: &Vec<f64>| r.len()) {
            if first != row.len() {
                anyhow::bail!(
                    "{}:{}: expected {} columns, found {}",
                    input_file,
                    lineno + 1,
                    first,
                    row.len()
                );
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        anyhow::bail!("{} has no numeric rows", input_file);
    }
    Ok(rows)
}

///
/// Read a dense matrix into an (N, D) f64 tensor
/// * `input_file` - file name--either gzipped or not
/// * `device` - target device
pub fn read_tensor(input_file: &str, device: &Device) -> anyhow::Result<Tensor> {
    let rows = read_matrix(input_file)?;
    let (n, d) = (rows.len(), rows[0].len());
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(Tensor::from_vec(flat, (n, d), device)?)
}

///
/// Write named columns of equal length, tab-separated with a header
/// * `output_file` - file name, gzipped by extension, or "stdout"
pub fn write_columns(
    output_file: &str,
    names: &[&str],
    columns: &[Vec<f64>],
) -> anyhow::Result<()> {
    if names.len() != columns.len() {
        anyhow::bail!("{} names for {} columns", names.len(), columns.len());
    }
    let nrows = columns.first().map(|c| c.len()).unwrap_or(0);
    if columns.iter().any(|c| c.len() != nrows) {
        anyhow::bail!("columns must have the same length");
    }

    let mut buf = open_buf_writer(output_file)?;
    writeln!(buf, "{}", names.join("\t"))?;
    for i in 0..nrows {
        let line: Vec<String> = columns.iter().map(|c| c[i].to_string()).collect();
        writeln!(buf, "{}", line.join("\t"))?;
    }
    buf.flush()?;
    Ok(())
}
