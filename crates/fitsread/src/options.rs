/// Settings applied when a [`Fits`](crate::fits::Fits) loads its header and data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Reject headers whose first record is not `SIMPLE = T`.
    pub require_simple: bool,
    /// Refuse to decode data arrays larger than this many bytes.
    pub max_data_bytes: Option<usize>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_simple(mut self, require: bool) -> Self {
        self.require_simple = require;
        self
    }

    pub fn max_data_bytes(mut self, limit: usize) -> Self {
        self.max_data_bytes = Some(limit);
        self
    }
}
