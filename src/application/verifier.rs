//! Post-run verification of warmed detail records.

use tracing::{error, info};

use crate::domain::{DetailRecord, cache_keys, validate_slug};
use crate::infrastructure::CacheStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub checked: usize,
    /// Slugs whose cached record is missing, unreadable or incomplete
    pub failed: Vec<String>,
}

impl VerificationReport {
    pub fn errors(&self) -> usize {
        self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct CacheVerifier {
    store: CacheStore,
}

impl CacheVerifier {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    /// Re-read every slug's detail record and re-apply the completeness
    /// predicate. Store errors count as failures.
    pub async fn verify(&self, slugs: &[String]) -> VerificationReport {
        let mut report = VerificationReport::default();

        for slug in slugs {
            report.checked += 1;
            let Ok(valid_slug) = validate_slug(slug) else {
                error!("❌ Verification: '{}' is not a valid slug", slug);
                report.failed.push(slug.clone());
                continue;
            };

            let problem = match self
                .store
                .try_get::<DetailRecord>(&cache_keys::detail(valid_slug))
                .await
            {
                Ok(Some(record)) => record.validate().err().map(|e| e.to_string()),
                Ok(None) => Some("missing from cache".to_string()),
                Err(e) => Some(e.to_string()),
            };

            if let Some(problem) = problem {
                error!("❌ Verification failed for {}: {}", slug, problem);
                report.failed.push(slug.clone());
            }
        }

        if report.is_clean() {
            info!("✅ Verification passed for {} records", report.checked);
        } else {
            error!(
                "❌ Verification found {} bad records out of {}",
                report.errors(),
                report.checked
            );
        }
        report
    }
}
