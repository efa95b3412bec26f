
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::{RagError, Result};

pub const DEFAULT_EMBEDDINGS_PATH: &str = "embeddings.json";

/// In-memory mapping from chunk text to its embedding vector.
///
/// Entries keep their insertion order. Re-inserting an existing chunk text
/// replaces its vector in place. All vectors share the dimension of the
/// first one inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStore {
    entries: Vec<(String, Vec<f32>)>,
    positions: HashMap<String, usize>,
}

impl VectorStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vector for `chunk_text`, overwriting any previous one.
    ///
    /// NaN and infinite components are rejected since JSON cannot hold them.
    #[inline]
    pub fn put(&mut self, chunk_text: impl Into<String>, vector: Vec<f32>) -> Result<()> {
        if vector.iter().any(|value| !value.is_finite()) {
            return Err(RagError::Embedding(
                "Embedding contains NaN or infinite values".to_string(),
            ));
        }

        if let Some(expected) = self.dimension() {
            if vector.len() != expected {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let chunk_text = chunk_text.into();
        match self.positions.get(&chunk_text) {
            Some(&position) => {
                debug!("Overwriting embedding for existing chunk at {}", position);
                self.entries[position].1 = vector;
            }
            None => {
                self.positions.insert(chunk_text.clone(), self.entries.len());
                self.entries.push((chunk_text, vector));
            }
        }

        Ok(())
    }

    #[inline]
    pub fn get(&self, chunk_text: &str) -> Option<&[f32]> {
        self.positions
            .get(chunk_text)
            .map(|&position| self.entries[position].1.as_slice())
    }

    /// Chunk texts in insertion order
    #[inline]
    pub fn all_chunks(&self) -> Vec<&str> {
        self.entries.iter().map(|(text, _)| text.as_str()).collect()
    }

    #[inline]
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.entries
            .iter()
            .map(|(text, vector)| (text.as_str(), vector.as_slice()))
    }

    /// Dimension shared by every stored vector, `None` while empty
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|(_, vector)| vector.len())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a store from a flat JSON object of chunk text to vector
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(RagError::NotFound(format!(
                "Embeddings file does not exist: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let entries: OrderedEntries = serde_json::from_str(&content).map_err(|e| {
            RagError::Parse(format!(
                "Invalid embeddings file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut store = Self::new();
        for (text, vector) in entries.0 {
            store.put(text, vector).map_err(|e| {
                RagError::Parse(format!(
                    "Inconsistent embeddings file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        info!(
            "Loaded {} embeddings from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Write the store in the format accepted by [`VectorStore::load`]
    #[inline]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string(self)
            .map_err(|e| RagError::Parse(format!("Failed to serialize embeddings: {}", e)))?;
        fs::write(path, content)?;

        info!("Saved {} embeddings to {}", self.len(), path.display());
        Ok(())
    }
}

impl Serialize for VectorStore {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (text, vector) in &self.entries {
            map.serialize_entry(text, vector)?;
        }
        map.end()
    }
}

/// Map entries in the order they appear in the source document
struct OrderedEntries(Vec<(String, Vec<f32>)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of chunk text to an array of numbers")
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<OrderedEntries, V::Error>
            where
                V: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((text, vector)) = map.next_entry::<String, Vec<f32>>()? {
                    entries.push((text, vector));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
