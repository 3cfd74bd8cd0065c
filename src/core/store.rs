use crate::domain::model::{PaperIndex, PaperRows};
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// Missing or unreadable indexes start out empty.
pub async fn load_index<S: Storage>(storage: &S, path: &str) -> PaperIndex {
    if !storage.exists(path).await {
        return PaperIndex::new();
    }

    let bytes = match storage.read_file(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Could not read {}: {}; starting from an empty index", path, e);
            return PaperIndex::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!("Could not parse {}: {}; starting from an empty index", path, e);
            PaperIndex::new()
        }
    }
}

/// Adds or replaces rows; returns how many ids were new to the topic.
pub fn merge_rows(index: &mut PaperIndex, topic: &str, rows: PaperRows) -> usize {
    let existing = index.entry(topic.to_string()).or_default();
    let mut added = 0;
    for (id, row) in rows {
        if existing.insert(id, row).is_none() {
            added += 1;
        }
    }
    added
}

pub async fn save_index<S: Storage>(storage: &S, path: &str, index: &PaperIndex) -> Result<()> {
    let json = serde_json::to_string_pretty(index)?;
    storage.write_file(path, json.as_bytes()).await
}

/// Read, merge and write back in one step. Returns the merged index and the
/// number of rows that were new.
pub async fn merge_into_index<S: Storage>(
    storage: &S,
    path: &str,
    topic: &str,
    rows: PaperRows,
) -> Result<(PaperIndex, usize)> {
    let mut index = load_index(storage, path).await;
    let added = merge_rows(&mut index, topic, rows);
    save_index(storage, path, &index).await?;
    tracing::debug!("Index {} now holds {} topic(s)", path, index.len());
    Ok((index, added))
}
