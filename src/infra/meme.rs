// ============================================================
// Layer 6 — MEME Motif Files
// ============================================================
// Writes and reads the MEME minimal motif format (v4) that the
// Tomtom comparison tool consumes:
//
//   MEME version 4
//
//   ALPHABET= ACGT
//
//   strands: + -
//
//   Background letter frequencies
//   A 0.2500 C 0.2500 G 0.2500 T 0.2500
//
//   MOTIF filter0
//   letter-probability matrix: alength= 4 w= 3 nsites= 3
//   0.9000 0.0500 0.0250 0.0250
//   ...
//
// Every PWM gets an entry, including empty ones (`w= 0`), so
// the number of MOTIF lines always equals the number of filters
// and entry j always describes filter j.
//
// Reference: https://meme-suite.org/meme/doc/meme-format.html

use std::{
    fs,
    fmt::Write as _,
    path::Path,
};

use anyhow::{bail, Context, Result};
use ndarray::Array2;

use crate::domain::pwm::{Pwm, ALPHABET};

const BACKGROUND: f64 = 0.25;

/// Render PWMs as MEME text; entry j is named `{prefix}{j}`.
pub fn format_meme(pwms: &[Pwm], prefix: &str) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = writeln!(out, "MEME version 4\n");
    let _ = writeln!(out, "ALPHABET= {}\n", ALPHABET.iter().collect::<String>());
    let _ = writeln!(out, "strands: + -\n");
    let _ = writeln!(out, "Background letter frequencies");
    let background: Vec<String> = ALPHABET
        .iter()
        .map(|base| format!("{base} {BACKGROUND:.4}"))
        .collect();
    let _ = writeln!(out, "{}\n", background.join(" "));

    for (j, pwm) in pwms.iter().enumerate() {
        let w = pwm.len();
        let _ = writeln!(out, "MOTIF {prefix}{j}");
        let _ = writeln!(out, "letter-probability matrix: alength= {} w= {w} nsites= {w}", ALPHABET.len());
        for row in pwm.rows() {
            let cells: Vec<String> = row.iter().map(|p| format!("{p:.4}")).collect();
            let _ = writeln!(out, "{}", cells.join(" "));
        }
        let _ = writeln!(out);
    }
    out
}

pub fn write_meme(pwms: &[Pwm], path: &Path, prefix: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format_meme(pwms, prefix))
        .with_context(|| format!("Cannot write motif file '{}'", path.display()))?;
    tracing::info!("Wrote {} motifs to '{}'", pwms.len(), path.display());
    Ok(())
}

/// Number of MOTIF entries (= number of filters the file was written for).
pub fn count_meme_entries(path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read motif file '{}'", path.display()))?;
    Ok(text.lines().filter(|l| l.starts_with("MOTIF")).count())
}

/// Parse MEME text back into (name, PWM) pairs, in file order.
pub fn parse_meme(text: &str) -> Result<Vec<(String, Pwm)>> {
    let mut lines = text.lines().map(str::trim);
    let mut motifs = Vec::new();

    while let Some(line) = lines.next() {
        let Some(rest) = line.strip_prefix("MOTIF") else { continue };
        let name = rest
            .split_whitespace()
            .next()
            .context("MOTIF line without a name")?
            .to_string();

        // The matrix header follows, possibly after a URL or blank lines
        let width = loop {
            match lines.next() {
                Some(l) if l.starts_with("letter-probability matrix") => break matrix_width(l)?,
                Some(l) if l.starts_with("MOTIF") => bail!("motif '{name}' has no letter-probability matrix"),
                Some(_) => continue,
                None => bail!("motif '{name}' has no letter-probability matrix"),
            }
        };

        let mut matrix = Array2::<f64>::zeros((width, ALPHABET.len()));
        for i in 0..width {
            let row = lines
                .next()
                .with_context(|| format!("motif '{name}' ends after {i} of {width} rows"))?;
            let values = row
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("motif '{name}': bad row '{row}'"))?;
            if values.len() != ALPHABET.len() {
                bail!("motif '{name}': expected {} columns, found {}", ALPHABET.len(), values.len());
            }
            for (k, v) in values.into_iter().enumerate() {
                matrix[[i, k]] = v;
            }
        }

        let pwm = Pwm::from_matrix(matrix).context("matrix width")?;
        motifs.push((name, pwm));
    }
    Ok(motifs)
}

pub fn read_meme(path: &Path) -> Result<Vec<(String, Pwm)>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read motif file '{}'", path.display()))?;
    parse_meme(&text)
}

/// `w=` value of a `letter-probability matrix:` line
fn matrix_width(line: &str) -> Result<usize> {
    let mut tokens = line.split_whitespace();
    while let Some(tok) = tokens.next() {
        if tok == "w=" {
            let value = tokens.next().context("'w=' without a value")?;
            return value.parse().with_context(|| format!("bad motif width '{value}'"));
        }
    }
    bail!("no 'w=' in '{line}'")
}
