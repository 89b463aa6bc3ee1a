//! Result tree: `origin_url -> surface -> hits`.
//!
//! Grounded on the teacher's `output::ScanReport`/`ReportEntry` flat report struct,
//! generalized into the nested map the result tree calls for (spec §3).

use std::collections::HashMap;

use serde::Serialize;

use crate::executor::ExecutedResponse;
use crate::surface::{Reason, SurfaceTag};

/// One confirmed hit: a name plus the reasons that justified it.
#[derive(Debug, Clone, Serialize)]
pub struct HitRecord {
    pub name: String,
    pub reasons: Vec<Reason>,
    #[serde(skip)]
    pub response: Option<ExecutedResponse>,
}

/// `origin_url -> surface -> Vec<HitRecord>`, append-only once built.
#[derive(Debug, Default)]
pub struct ResultTree {
    by_origin: HashMap<String, HashMap<SurfaceTag, Vec<HitRecord>>>,
}

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, origin_url: &str, surface: SurfaceTag, hit: HitRecord) {
        self.by_origin
            .entry(origin_url.to_string())
            .or_default()
            .entry(surface)
            .or_default()
            .push(hit);
    }

    pub fn is_empty(&self) -> bool {
        self.by_origin.values().all(|surfaces| surfaces.values().all(|hits| hits.is_empty()))
    }

    pub fn total_hits(&self) -> usize {
        self.by_origin.values().flat_map(|surfaces| surfaces.values()).map(Vec::len).sum()
    }

    pub fn origins(&self) -> impl Iterator<Item = &String> {
        self.by_origin.keys()
    }

    pub fn surfaces_for(&self, origin_url: &str) -> Option<&HashMap<SurfaceTag, Vec<HitRecord>>> {
        self.by_origin.get(origin_url)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SurfaceTag, &HitRecord)> {
        self.by_origin.iter().flat_map(|(origin, surfaces)| {
            surfaces
                .iter()
                .flat_map(move |(surface, hits)| hits.iter().map(move |hit| (origin, surface, hit)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_reports_no_hits() {
        let tree = ResultTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.total_hits(), 0);
    }

    #[test]
    fn record_accumulates_under_origin_and_surface() {
        let mut tree = ResultTree::new();
        tree.record(
            "https://example.com/",
            SurfaceTag::Url,
            HitRecord { name: "debug".to_string(), reasons: vec![], response: None },
        );
        tree.record(
            "https://example.com/",
            SurfaceTag::Header,
            HitRecord { name: "X-Secret".to_string(), reasons: vec![], response: None },
        );
        assert_eq!(tree.total_hits(), 2);
        assert!(!tree.is_empty());
        let surfaces = tree.surfaces_for("https://example.com/").unwrap();
        assert_eq!(surfaces.get(&SurfaceTag::Url).unwrap().len(), 1);
        assert_eq!(surfaces.get(&SurfaceTag::Header).unwrap().len(), 1);
    }
}
