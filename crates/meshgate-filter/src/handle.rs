//! versioned holder for the active rule set.
//!
//! reloads build a complete new [`RuleSet`] off to the side and swap a
//! fresh `Arc` in under a short write lock. readers clone the `Arc` and
//! evaluate against it without holding any lock, so an in-flight
//! evaluation always sees one whole rule list, never a mix of two.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use meshgate_proto::FilterRule;
use tracing::{info, warn};

use crate::engine::AccessEvaluator;
use crate::error::{Error, Result};
use crate::rule_set::RuleSet;

/// one generation of the active rules.
#[derive(Debug)]
pub struct PolicySnapshot {
    version: u64,
    rules: Arc<RuleSet>,
}

impl PolicySnapshot {
    /// monotonically increasing version, starting at 0 for the initial rules.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// the rules of this generation.
    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// an evaluator bound to this generation.
    pub fn evaluator(&self) -> AccessEvaluator {
        AccessEvaluator::from_shared(Arc::clone(&self.rules))
    }
}

/// policy handle for hot-reload.
///
/// cloning the handle shares the same underlying snapshot.
#[derive(Debug, Clone)]
pub struct PolicyHandle {
    current: Arc<RwLock<Arc<PolicySnapshot>>>,
}

impl PolicyHandle {
    /// create a handle whose initial snapshot (version 0) holds `rules`.
    pub fn new(rules: RuleSet) -> Self {
        let snapshot = PolicySnapshot {
            version: 0,
            rules: Arc::new(rules),
        };
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// create a handle with no rules (deny all).
    pub fn empty() -> Self {
        Self::new(RuleSet::empty())
    }

    /// the active snapshot.
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        // the guarded value is only ever replaced whole, so a poisoned lock
        // still holds a complete snapshot
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// version of the active snapshot.
    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    /// an evaluator over the active snapshot.
    pub fn evaluator(&self) -> AccessEvaluator {
        self.snapshot().evaluator()
    }

    /// install an already compiled rule set, returning its version.
    pub fn replace(&self, rules: RuleSet) -> u64 {
        let rule_count = rules.len();
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let version = guard.version + 1;
        *guard = Arc::new(PolicySnapshot {
            version,
            rules: Arc::new(rules),
        });
        drop(guard);

        info!(version, rules = rule_count, "policy reloaded");
        version
    }

    /// compile and install a wire rule list.
    ///
    /// on error the active snapshot is left untouched.
    pub fn reload(&self, rules: Vec<FilterRule>) -> Result<u64> {
        let compiled = RuleSet::compile(rules);
        self.install(compiled)
    }

    /// parse, compile and install a json rule list.
    pub fn reload_json(&self, json: &str, max_size: usize) -> Result<u64> {
        let compiled = RuleSet::from_json_with_limit(json, max_size);
        self.install(compiled)
    }

    /// read, parse, compile and install a json rule-list file.
    pub fn reload_from_file(&self, path: impl AsRef<Path>, max_size: usize) -> Result<u64> {
        let compiled = read_rules_file(path.as_ref(), max_size)
            .and_then(|json| RuleSet::from_json_with_limit(&json, max_size));
        self.install(compiled)
    }

    fn install(&self, compiled: Result<RuleSet>) -> Result<u64> {
        match compiled {
            Ok(rules) => Ok(self.replace(rules)),
            Err(e) => {
                warn!(
                    error = %e,
                    retained_version = self.version(),
                    "rejected policy reload, keeping previous rules"
                );
                Err(e)
            }
        }
    }
}

/// read a rule-list file, refusing it before loading if it is over `max_size`.
fn read_rules_file(path: &Path, max_size: usize) -> Result<String> {
    let io_err = |source: std::io::Error| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let len = std::fs::metadata(path).map_err(io_err)?.len();
    let len = usize::try_from(len).unwrap_or(usize::MAX);
    if len > max_size {
        return Err(Error::TooLarge(len));
    }
    std::fs::read_to_string(path).map_err(io_err)
}

impl Default for PolicyHandle {
    fn default() -> Self {
        Self::empty()
    }
}
