// Retention tiers: ttl -> destination table.
// Tables bucket similar TTLs: the name carries the largest power of two <= ttl in hours.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionTier {
    pub ttl: u32,
    pub table: String,
}

/// Ordered raw / medium / long tiers plus a ttl lookup.
#[derive(Debug, Clone)]
pub struct TierTable {
    tiers: Vec<RetentionTier>,
    by_ttl: HashMap<u32, String>,
}

/// `metric_{}` with 24h -> `metric_16`, 1440h -> `metric_1024`.
pub fn ttl_table_name(ttl: u32, format: &str) -> String {
    let hours = (ttl / 3600).max(1);
    let bucket = 1u32 << (u32::BITS - 1 - hours.leading_zeros());
    format.replace("{}", &bucket.to_string())
}

impl TierTable {
    /// `ttls` must hold exactly three strictly increasing values.
    pub fn new(ttls: &[u32], format: &str) -> anyhow::Result<Self> {
        anyhow::ensure!(
            ttls.len() == 3,
            "expected raw, medium and long ttls, got {}",
            ttls.len()
        );
        anyhow::ensure!(
            ttls.windows(2).all(|w| w[0] < w[1]),
            "ttls must be strictly increasing, got {:?}",
            ttls
        );
        let tiers: Vec<RetentionTier> = ttls
            .iter()
            .map(|&ttl| RetentionTier {
                ttl,
                table: ttl_table_name(ttl, format),
            })
            .collect();
        let by_ttl = tiers.iter().map(|t| (t.ttl, t.table.clone())).collect();
        Ok(Self { tiers, by_ttl })
    }

    pub fn tiers(&self) -> &[RetentionTier] {
        &self.tiers
    }

    pub fn lookup(&self, ttl: u32) -> Option<&str> {
        self.by_ttl.get(&ttl).map(String::as_str)
    }

    pub fn raw(&self) -> &RetentionTier {
        &self.tiers[0]
    }

    pub fn medium(&self) -> &RetentionTier {
        &self.tiers[1]
    }

    pub fn long(&self) -> &RetentionTier {
        &self.tiers[self.tiers.len() - 1]
    }
}
