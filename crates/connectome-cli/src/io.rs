// ─────────────────────────────────────────────────────────────────────
// Connectome Kernel — Text Input / Output
// ─────────────────────────────────────────────────────────────────────
//! Whitespace-separated matrix input and the tab-separated result table.
//!
//! Output layout (`n_global` measure rows, one column per
//! definition × threshold pair):
//!
//! ```text
//! \tcorr\tcorr\t…
//! \tabsolute:0.100000\tabsolute:0.200000\t…
//! global:charpath\t1.2345\t1.3456\t…
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use connectome_core::GridOutput;
use connectome_types::{ConnectomeError, ConnectomeResult};

/// Dense row-major matrix as read from text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

/// Parse rows of whitespace-separated numbers.
///
/// Tokens that are not numbers are skipped, lines without any number are
/// ignored, and every remaining row must have the same number of values.
pub fn parse_matrix<R: BufRead>(reader: R) -> ConnectomeResult<TextMatrix> {
    let mut data = Vec::new();
    let mut cols = 0usize;
    let mut rows = 0usize;
    let mut skipped = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let before = data.len();
        for token in line.split_whitespace() {
            match token.parse::<f64>() {
                Ok(v) => data.push(v),
                Err(_) => skipped += 1,
            }
        }
        let width = data.len() - before;
        if width == 0 {
            continue;
        }
        if rows == 0 {
            cols = width;
        } else if width != cols {
            return Err(ConnectomeError::Input(format!(
                "line {}: expected {cols} values, found {width}",
                lineno + 1
            )));
        }
        rows += 1;
    }

    if rows == 0 {
        return Err(ConnectomeError::Input("input contains no numeric rows".to_string()));
    }
    if skipped > 0 {
        log::debug!("skipped {skipped} non-numeric tokens");
    }
    Ok(TextMatrix { rows, cols, data })
}

pub fn read_matrix(path: &Path) -> ConnectomeResult<TextMatrix> {
    let file = File::open(path)
        .map_err(|e| ConnectomeError::Io(format!("{}: {e}", path.display())))?;
    parse_matrix(BufReader::new(file))
}

/// Write the labelled global-measure table.
pub fn write_table<W: Write>(mut w: W, output: &GridOutput) -> std::io::Result<()> {
    write!(w, "\t")?;
    for col in &output.column_labels {
        write!(w, "{}\t", col.definition)?;
    }
    writeln!(w)?;
    write!(w, "\t")?;
    for col in &output.column_labels {
        write!(w, "{}\t", col.threshold)?;
    }
    writeln!(w)?;

    let tensor = &output.tensor;
    for (m, label) in output.row_labels.iter().enumerate() {
        write!(w, "{label}\t")?;
        for c in 0..tensor.n_columns() {
            write!(w, "{}\t", format_general(tensor.global[c * tensor.n_global + m]))?;
        }
        writeln!(w)?;
    }
    w.flush()
}

pub fn write_table_file(path: &Path, output: &GridOutput) -> ConnectomeResult<()> {
    let file = File::create(path)
        .map_err(|e| ConnectomeError::Io(format!("{}: {e}", path.display())))?;
    write_table(BufWriter::new(file), output)
        .map_err(|e| ConnectomeError::Io(format!("{}: {e}", path.display())))
}

/// Shortest of fixed or scientific notation at 9 significant digits,
/// trailing zeros removed (C's `%.9g`).
pub fn format_general(v: f64) -> String {
    const PRECISION: i32 = 9;
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sci = format!("{:.*e}", (PRECISION - 1) as usize, v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if (-4..PRECISION).contains(&exp) {
        let fixed = format!("{:.*}", (PRECISION - 1 - exp) as usize, v);
        trim_fraction(&fixed).to_string()
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectome_types::{GridSpec, ResultTensor};
    use std::io::Cursor;

    #[test]
    fn test_parse_matrix_basic() {
        let text = "1 2 3\n4\t5\t6\n\n7 8 9\n";
        let m = parse_matrix(Cursor::new(text)).unwrap();
        assert_eq!((m.rows, m.cols), (3, 3));
        assert_eq!(m.data[3..6], [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_parse_matrix_skips_labels() {
        let text = "roi_a roi_b\n0.5 x 1.5\n2.5 3.5\n";
        let m = parse_matrix(Cursor::new(text)).unwrap();
        assert_eq!((m.rows, m.cols), (2, 2));
        assert_eq!(m.data, vec![0.5, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_parse_matrix_ragged() {
        let err = parse_matrix(Cursor::new("1 2 3\n4 5\n")).unwrap_err();
        match err {
            ConnectomeError::Input(msg) => assert!(msg.contains("line 2"), "{msg}"),
            other => panic!("expected Input error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_matrix_empty() {
        assert!(matches!(
            parse_matrix(Cursor::new("\n  \nfoo\n")),
            Err(ConnectomeError::Input(_))
        ));
    }

    #[test]
    fn test_format_general() {
        assert_eq!(format_general(0.0), "0");
        assert_eq!(format_general(1.0), "1");
        assert_eq!(format_general(0.5), "0.5");
        assert_eq!(format_general(2.0 / 3.0), "0.666666667");
        assert_eq!(format_general(1234.5), "1234.5");
        assert_eq!(format_general(123456789.0), "123456789");
        assert_eq!(format_general(1234567890.0), "1.23456789e+09");
        assert_eq!(format_general(0.0001), "0.0001");
        assert_eq!(format_general(0.00001), "1e-05");
        assert_eq!(format_general(-2.5e-7), "-2.5e-07");
        assert_eq!(format_general(f64::NAN), "nan");
        assert_eq!(format_general(f64::INFINITY), "inf");
    }

    #[test]
    fn test_write_table_layout() {
        let spec = GridSpec::parse(
            &["corr", "ridge:0.5"],
            &["absolute:0.1"],
            &["global:charpath", "global:efficiency"],
        )
        .unwrap();
        let mut tensor = ResultTensor::for_grid(&spec, 4);
        tensor.set_global(0, 0, 0, 1.5);
        tensor.set_global(0, 0, 1, 0.25);
        tensor.set_global(1, 0, 0, 2.0);
        let output = GridOutput {
            tensor,
            column_labels: spec.column_labels(),
            row_labels: spec.row_labels(),
        };

        let mut buf = Vec::new();
        write_table(&mut buf, &output).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "\tcorr\tridge:0.500000\t");
        assert_eq!(lines[1], "\tabsolute:0.100000\tabsolute:0.100000\t");
        assert_eq!(lines[2], "global:charpath\t1.5\t2\t");
        assert_eq!(lines[3], "global:efficiency\t0.25\tnan\t");
    }
}
