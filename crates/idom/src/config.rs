/// Tree-wide configuration, fixed when the tree is created.
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// Give element groups a name index for exact tag-name lookup.
    pub index_elements: bool,
    /// Give document groups a name index. Documents scan by default.
    pub index_documents: bool,
    /// Maximum characters of text shown per line by [`debug::outline`](crate::debug::outline).
    pub outline_preview_chars: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            index_elements: true,
            index_documents: false,
            outline_preview_chars: 40,
        }
    }
}

impl TreeConfig {
    /// Configuration with indexing disabled everywhere; every query scans.
    pub fn unindexed() -> Self {
        Self {
            index_elements: false,
            index_documents: false,
            ..Self::default()
        }
    }
}
