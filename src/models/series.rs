// One catalog entry. Read once per run, never mutated.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesDefinition {
    pub id: String,
    pub org_id: i64,
    pub name: String,
    /// Native sampling interval in seconds.
    pub interval: u32,
    pub last_update: i64,
}

impl SeriesDefinition {
    /// Row key of this series in the given month bucket.
    pub fn row_key(&self, month: u32) -> String {
        format!("{}_{}", self.id, month)
    }
}
