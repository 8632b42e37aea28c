//! Verdict cache.
//!
//! Keyed by a digest of the catalogued outlet lean plus the extracted
//! text, so a repeat analysis of unchanged content skips the model call.
//! Extraction always runs; only the scoring round-trip is saved.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use super::scoring::BiasVerdict;
use super::source_lean::SourceLean;

/// How long a cached verdict stays valid.
pub const VERDICT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

struct CacheEntry {
    verdict: BiasVerdict,
    stored_at: Instant,
}

/// In-memory TTL cache for scored verdicts.
pub struct VerdictCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl VerdictCache {
    pub fn new() -> Self {
        Self::with_ttl(VERDICT_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cache key for a piece of extracted text. The same text from an
    /// outlet with a different catalogued lean calibrates differently,
    /// so the lean is part of the key.
    pub fn key(lean: Option<SourceLean>, body_text: &str) -> String {
        let lean_tag = lean.map(|l| l.as_str()).unwrap_or("none");
        let mut hasher = Sha256::new();
        hasher.update(lean_tag.as_bytes());
        hasher.update(b"|");
        hasher.update(body_text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<BiasVerdict> {
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(key) {
                Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                    return Some(entry.verdict.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // expired, drop it so the map does not grow unbounded
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        None
    }

    pub fn put(&self, key: String, verdict: BiasVerdict) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            CacheEntry {
                verdict,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for VerdictCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::scoring::BiasLabel;

    fn verdict() -> BiasVerdict {
        BiasVerdict {
            label: BiasLabel::Center,
            confidence: Some(0.6),
            summary: "A summary.".to_string(),
            rationale: "A rationale.".to_string(),
            global_perspective: "A perspective.".to_string(),
        }
    }

    #[test]
    fn test_put_then_get_round_trips() {
        let cache = VerdictCache::new();
        let key = VerdictCache::key(None, "body text");

        cache.put(key.clone(), verdict());
        let hit = cache.get(&key).unwrap();

        assert_eq!(hit.label, BiasLabel::Center);
        assert_eq!(hit.summary, "A summary.");
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = VerdictCache::with_ttl(Duration::ZERO);
        let key = VerdictCache::key(None, "body text");

        cache.put(key.clone(), verdict());

        assert!(cache.get(&key).is_none());
        // the expired entry is evicted, not just hidden
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_separates_catalogued_leans() {
        let body = "the same extracted text";
        let none = VerdictCache::key(None, body);
        let left = VerdictCache::key(Some(SourceLean::Left), body);
        let right = VerdictCache::key(Some(SourceLean::Right), body);

        assert_ne!(none, left);
        assert_ne!(left, right);
        assert_eq!(none, VerdictCache::key(None, body));
    }

    #[test]
    fn test_key_is_a_hex_digest() {
        let key = VerdictCache::key(None, "anything");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
