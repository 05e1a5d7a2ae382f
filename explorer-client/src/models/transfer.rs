/// Bytes sent so far for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    pub key: String,
    pub transferred: u64,
    pub total: u64,
}

impl TransferProgress {
    pub fn new(key: impl Into<String>, transferred: u64, total: u64) -> Self {
        Self {
            key: key.into(),
            transferred,
            total,
        }
    }

    /// Whole percentage, rounded to nearest. An empty body counts as done.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let ratio = self.transferred.min(self.total) as f64 / self.total as f64;
        (ratio * 100.0).round() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.transferred >= self.total
    }
}
