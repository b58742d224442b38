//! Ordered, index-addressed collection of per-image outcomes.

use crate::types::GenerationResult;

/// Sparse result collection for one generation run.
///
/// Position is the 1-based `order` of the image in the planned sequence,
/// stored at `order - 1`. Arrival order is irrelevant: the merge is
/// insert-or-replace per index, so the last writer for an index wins and
/// interleaving between the HTTP reply and streamed events needs no
/// coordination. Indices below the highest filled one may still be `None`;
/// consumers render those as pending.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    slots: Vec<Option<GenerationResult>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of addressable slots: highest filled index + 1.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GenerationResult> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Insert or replace the entry at `index`, growing through any gap.
    pub fn merge(&mut self, index: usize, result: GenerationResult) {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(result);
    }

    /// Merge a streamed partial: keep whatever an earlier entry already
    /// carried (role, overlay, params) and overlay the new image URL.
    pub fn merge_image(&mut self, index: usize, url: &str) {
        let entry = match self.get(index) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.url = Some(url.to_string());
                updated.success = true;
                updated
            }
            None => GenerationResult::from_stream((index + 1) as u32, url.to_string()),
        };
        self.merge(index, entry);
    }

    /// Replace the whole collection with the terminal response payload.
    pub fn replace_all(&mut self, results: Vec<GenerationResult>) {
        self.slots = results.into_iter().map(Some).collect();
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Entries in order, `None` where still pending.
    pub fn slots(&self) -> &[Option<GenerationResult>] {
        &self.slots
    }

    /// Just the filled entries, in index order.
    pub fn filled(&self) -> impl Iterator<Item = &GenerationResult> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn filled_count(&self) -> usize {
        self.filled().count()
    }

    /// Owned snapshot for consumers.
    pub fn to_vec(&self) -> Vec<Option<GenerationResult>> {
        self.slots.clone()
    }
}
