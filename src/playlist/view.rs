use crate::library::TrackRef;

/// Case-insensitive substring filter over the master list.
///
/// Lowercased titles are computed once per master list so that refiltering
/// on every keystroke stays cheap.
#[derive(Debug, Default, Clone)]
pub(super) struct VisibleView {
    lower_titles: Vec<String>,
    indices: Vec<usize>,
    query: String,
}

impl VisibleView {
    pub fn new(master: &[TrackRef]) -> Self {
        Self {
            lower_titles: master.iter().map(|t| t.title().to_lowercase()).collect(),
            indices: (0..master.len()).collect(),
            query: String::new(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn position_of(&self, master_index: usize) -> Option<usize> {
        self.indices.iter().position(|&i| i == master_index)
    }

    pub fn contains(&self, master_index: usize) -> bool {
        self.position_of(master_index).is_some()
    }

    /// Recompute from scratch. `pinned` stays visible whatever the query.
    pub fn apply(&mut self, query: &str, pinned: Option<usize>) {
        self.query = query.to_string();
        let needle = query.trim().to_lowercase();
        self.indices = self
            .lower_titles
            .iter()
            .enumerate()
            .filter(|(i, title)| {
                needle.is_empty() || title.contains(&needle) || pinned == Some(*i)
            })
            .map(|(i, _)| i)
            .collect();
    }
}
