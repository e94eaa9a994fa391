//! Load the whitespace-separated C-MAPSS training file into the document store.
//!
//! Usage: `data-dump [PATH] [--replace]`, PATH defaulting to `CMaps/train_FD001.txt`.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rul_core::store::DocumentStore;
use rul_core::{init_tracing, load_config, Frame};
use tracing::info;

const DEFAULT_INPUT: &str = "CMaps/train_FD001.txt";

fn column_names() -> Vec<String> {
    let mut cols = vec!["unit_number".to_string(), "time_cycles".to_string()];
    cols.extend((1..=3).map(|i| format!("setting_{i}")));
    cols.extend((1..=21).map(|i| format!("s_{i}")));
    cols
}

fn read_cmaps(path: &Path) -> Result<Frame> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let columns = column_names();
    let mut rows = Vec::new();
    for (n, line) in text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
        let row = line.split_whitespace().map(str::parse::<f64>).collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("{}:{}: non-numeric field", path.display(), n + 1))?;
        if row.len() != columns.len() {
            bail!("{}:{}: expected {} fields, found {}", path.display(), n + 1, columns.len(), row.len());
        }
        rows.push(row);
    }
    Ok(Frame::from_rows(columns, &rows)?)
}

fn main() -> Result<()> {
    let cfg = load_config("data-dump")?;
    init_tracing("data-dump", &cfg.log)?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let replace = args.iter().any(|a| a == "--replace");
    let input = args.iter().find(|a| !a.starts_with("--")).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));

    let frame = read_cmaps(&input)?;
    info!(rows = frame.height(), cols = frame.width(), "dataset parsed");
    let store = DocumentStore::open(&cfg.store.path)?;
    let coll = store.collection(&cfg.store.database, &cfg.store.collection)?;
    if replace { coll.clear()?; }
    let inserted = coll.insert_frame(&frame)?;
    info!(inserted, total = coll.count(), collection = coll.name(), "dump complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trailing_whitespace_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train_FD001.txt");
        let row: Vec<String> = (0..26).map(|i| format!("{}.5", i)).collect();
        fs::write(&path, format!("{}  \n{}  \n", row.join(" "), row.join(" "))).unwrap();
        let f = read_cmaps(&path).unwrap();
        assert_eq!((f.height(), f.width()), (2, 26));
        assert_eq!(f.column("s_21").unwrap()[0], 25.5);
    }

    #[test]
    fn short_rows_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, "1 2 3\n").unwrap();
        assert!(read_cmaps(&path).is_err());
    }
}
