use std::io::{self, Write};

use mf_core::matrix::Matrix;

/// Write one CSV row per frame, with a header naming the columns
/// `{prefix}_0 .. {prefix}_{n-1}` and `energy` when energies are given.
///
/// # Errors
/// Propagates write errors from `out`.
pub fn write_csv<W: Write>(
    mut out: W,
    prefix: &str,
    features: &Matrix,
    energies: Option<&Matrix>,
) -> io::Result<()> {
    let header: Vec<String> = (0..features.cols()).map(|c| format!("{prefix}_{c}")).collect();
    write!(out, "{}", header.join(","))?;
    if energies.is_some() {
        write!(out, ",energy")?;
    }
    writeln!(out)?;

    for (r, row) in features.rows_iter().enumerate() {
        for (c, v) in row.iter().enumerate() {
            if c > 0 {
                write!(out, ",")?;
            }
            write!(out, "{v}")?;
        }
        if let Some(e) = energies {
            write!(out, ",{}", e.get(r, 0))?;
        }
        writeln!(out)?;
    }
    out.flush()
}
