//! Exact-duplicate collapsing over a run's Document set (§4.3). Two
//! Documents are duplicates iff their similarity hash matches; on collision
//! the earliest `doc_timestamp` survives.

use heatmap_core::types::Document;
use std::collections::HashMap;
use uuid::Uuid;

pub struct DedupeOutcome {
    pub kept: Vec<Document>,
    pub dropped_doc_ids: Vec<Uuid>,
}

pub fn dedupe(documents: Vec<Document>) -> DedupeOutcome {
    let mut by_hash: HashMap<u64, Document> = HashMap::new();
    let mut dropped_doc_ids = Vec::new();

    for doc in documents {
        match by_hash.get(&doc.similarity_hash) {
            Some(existing) if existing.doc_timestamp <= doc.doc_timestamp => {
                dropped_doc_ids.push(doc.doc_id);
            }
            Some(existing) => {
                dropped_doc_ids.push(existing.doc_id);
                by_hash.insert(doc.similarity_hash, doc);
            }
            None => {
                by_hash.insert(doc.similarity_hash, doc);
            }
        }
    }

    let mut kept: Vec<Document> = by_hash.into_values().collect();
    kept.sort_by_key(|d| d.doc_id);
    dropped_doc_ids.sort();

    DedupeOutcome { kept, dropped_doc_ids }
}
