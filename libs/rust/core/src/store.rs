//! Embedded document store holding the raw sensor records.
//!
//! Documents are JSON objects kept in a sled tree named `<database>.<collection>`,
//! keyed by big-endian ids from `generate_id` so iteration follows insertion order.
use std::path::Path;

use serde_json::{Map, Value};
use sled::{Db, Tree};
use tracing::{debug, info};

use crate::error::{Result, RulError};
use crate::frame::{parse_cell, Frame};

pub const ID_FIELD: &str = "_id";
pub const MISSING_SENTINEL: &str = "na";

pub type Document = Map<String, Value>;

#[derive(Clone)]
pub struct DocumentStore {
    db: Db,
}

impl DocumentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "document store opened");
        Ok(Self { db })
    }

    pub fn collection(&self, database: &str, collection: &str) -> Result<Collection> {
        let name = format!("{database}.{collection}");
        let tree = self.db.open_tree(name.as_bytes())?;
        Ok(Collection { db: self.db.clone(), tree, name })
    }
}

#[derive(Clone)]
pub struct Collection {
    db: Db,
    tree: Tree,
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str { &self.name }

    pub fn count(&self) -> usize { self.tree.len() }

    /// Insert documents, assigning each a fresh `_id`. Returns the number written.
    pub fn insert_many<I: IntoIterator<Item = Document>>(&self, docs: I) -> Result<usize> {
        let mut batch = sled::Batch::default();
        let mut n = 0usize;
        for mut doc in docs {
            let id = self.db.generate_id()?;
            doc.insert(ID_FIELD.to_string(), Value::from(id));
            batch.insert(id.to_be_bytes().to_vec(), serde_json::to_vec(&doc)?);
            n += 1;
        }
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;
        info!(collection = %self.name, inserted = n, "documents inserted");
        Ok(n)
    }

    /// Store every row of `frame` as one document; missing cells become the `na` sentinel.
    pub fn insert_frame(&self, frame: &Frame) -> Result<usize> {
        let docs = (0..frame.height()).map(|i| {
            frame.columns().iter().zip(frame.row(i)).map(|(c, v)| {
                let value = if v.is_nan() { Value::from(MISSING_SENTINEL) } else { Value::from(v) };
                (c.clone(), value)
            }).collect::<Document>()
        });
        self.insert_many(docs)
    }

    pub fn find_all(&self) -> Result<Vec<Document>> {
        self.tree.iter().values().map(|v| Ok(serde_json::from_slice(&v?)?)).collect()
    }

    pub fn clear(&self) -> Result<()> {
        self.tree.clear()?;
        self.tree.flush()?;
        Ok(())
    }

    /// Load the collection as a frame, dropping `_id`. Columns are the union of
    /// document keys in first-seen order; absent keys, `null` and `na` are missing.
    pub fn to_frame(&self) -> Result<Frame> {
        let docs = self.find_all()?;
        let mut columns: Vec<String> = Vec::new();
        for doc in &docs {
            for k in doc.keys() {
                if k != ID_FIELD && !columns.contains(k) { columns.push(k.clone()); }
            }
        }
        let mut data = vec![Vec::with_capacity(docs.len()); columns.len()];
        for doc in &docs {
            for (name, col) in columns.iter().zip(data.iter_mut()) {
                col.push(cell_value(name, doc.get(name))?);
            }
        }
        Frame::new(columns, data)
    }
}

fn cell_value(name: &str, v: Option<&Value>) -> Result<f64> {
    match v {
        None | Some(Value::Null) => Ok(f64::NAN),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| RulError::invalid(format!("field `{name}` holds unrepresentable number {n}"))),
        Some(Value::String(s)) => parse_cell(s)
            .map(|c| c.unwrap_or(f64::NAN))
            .ok_or_else(|| RulError::invalid(format!("field `{name}` is not numeric: {s:?}"))),
        Some(other) => Err(RulError::invalid(format!("field `{name}` has unsupported value {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document { v.as_object().cloned().unwrap() }

    #[test]
    fn insert_and_load_frame() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let coll = store.collection("rul", "rul_collect").unwrap();
        coll.insert_many(vec![
            doc(json!({"unit_number": 1, "s_2": 641.8, "s_3": "na"})),
            doc(json!({"unit_number": 1, "s_2": 642.1, "s_3": 1589.7, "s_4": null})),
        ]).unwrap();
        assert_eq!(coll.count(), 2);
        let f = coll.to_frame().unwrap();
        assert_eq!(f.columns(), &["unit_number".to_string(), "s_2".into(), "s_3".into(), "s_4".into()]);
        assert!(f.column("s_3").unwrap()[0].is_nan());
        assert_eq!(f.column("s_3").unwrap()[1], 1589.7);
        assert!(f.column("s_4").unwrap().iter().all(|v| v.is_nan()));
        assert!(coll.find_all().unwrap().iter().all(|d| d.contains_key(ID_FIELD)));
    }

    #[test]
    fn frame_round_trip_keeps_missing() {
        let dir = tempfile::tempdir().unwrap();
        let coll = DocumentStore::open(dir.path()).unwrap().collection("db", "c").unwrap();
        let f = Frame::from_rows(vec!["a".into(), "b".into()], &[vec![1.0, f64::NAN], vec![2.0, 3.0]]).unwrap();
        coll.insert_frame(&f).unwrap();
        let back = coll.to_frame().unwrap();
        assert_eq!(back.column("a").unwrap(), &[1.0, 2.0]);
        assert!(back.column("b").unwrap()[0].is_nan());
        coll.clear().unwrap();
        assert_eq!(coll.count(), 0);
    }

    #[test]
    fn text_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let coll = DocumentStore::open(dir.path()).unwrap().collection("db", "c").unwrap();
        coll.insert_many(vec![doc(json!({"a": "engine"}))]).unwrap();
        assert!(matches!(coll.to_frame(), Err(RulError::InvalidData(_))));
    }
}
