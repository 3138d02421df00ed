//! the compiled rule list evaluations run against.

use meshgate_proto::FilterRule;
use meshgate_types::MAX_POLICY_SIZE;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::{Error, Result};
use crate::rule::CompiledRule;

/// an ordered, validated list of filter rules.
///
/// keeps the wire rules exactly as received next to their compiled form, so
/// the list can be handed back to clients or auditors unchanged.
///
/// ```json
/// [
///   {"SrcIPs": ["100.64.0.2/32"], "DstPorts": [{"IP": "100.64.0.3/32", "Ports": {"First": 0, "Last": 65535}}]}
/// ]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<FilterRule>,
    compiled: Vec<CompiledRule>,
}

impl RuleSet {
    /// create an empty rule set (deny all).
    pub fn empty() -> Self {
        Self::default()
    }

    /// compile a wire rule list.
    ///
    /// one malformed rule rejects the whole list.
    pub fn compile(rules: Vec<FilterRule>) -> Result<Self> {
        let compiled = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                CompiledRule::compile(rule).map_err(|cause| Error::InvalidRule { index, cause })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules, compiled })
    }

    /// parse and compile a json array of wire rules.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_limit(json, MAX_POLICY_SIZE)
    }

    /// like [`from_json`](Self::from_json) with an explicit size limit in bytes.
    pub fn from_json_with_limit(json: &str, max_size: usize) -> Result<Self> {
        if json.len() > max_size {
            return Err(Error::TooLarge(json.len()));
        }
        let rules: Vec<FilterRule> = serde_json::from_str(json)?;
        Self::compile(rules)
    }

    /// the wire rules, in the order they were supplied.
    pub fn filter_rules(&self) -> &[FilterRule] {
        &self.rules
    }

    /// the compiled rules, index-aligned with [`filter_rules`](Self::filter_rules).
    pub fn compiled(&self) -> &[CompiledRule] {
        &self.compiled
    }

    /// number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// true if there are no rules (deny all).
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Serialize for RuleSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.rules.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rules = Vec::<FilterRule>::deserialize(deserializer)?;
        RuleSet::compile(rules).map_err(de::Error::custom)
    }
}
