//! Policy engine
//!
//! Policies (`CMPxxxx`) carry per-scope OLD/NEW state with version-gated
//! defaults. State lives in a stack of slot maps sharing depth with
//! `block(SCOPE_FOR POLICIES)` and `cmake_policy(PUSH/POP)`. Effective
//! lookup order: slots from the top depth downward, the
//! `CMAKE_POLICY_DEFAULT_<id>` override, then the built-in default gated
//! by `CMAKE_POLICY_VERSION` against the policy's switch version. The
//! legacy mirror variable `CMAKE_POLICY_<id>` is write-only: `set`
//! maintains it for scripts that read it, but it never feeds lookup, so
//! popped scopes really do forget their settings.

use cmeval_types::CmakeVersion;
use serde::{Deserialize, Serialize};

use crate::context::Evaluator;

/// The CMake release this evaluator models.
pub const BASELINE_VERSION: CmakeVersion = CmakeVersion::new(3, 28, 0, 0);
pub const BASELINE_VERSION_STRING: &str = "3.28.0";

/// Policy versions below this are floored (`cmake_minimum_required`).
pub const POLICY_FLOOR: CmakeVersion = CmakeVersion::new(2, 4, 0, 0);
pub const POLICY_FLOOR_STRING: &str = "2.4";

/// Per-slot policy state. Absence of a slot means UNSET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyStatus {
    Old,
    New,
}

impl PolicyStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Old => "OLD",
            Self::New => "NEW",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("OLD") {
            Some(Self::Old)
        } else if value.eq_ignore_ascii_case("NEW") {
            Some(Self::New)
        } else {
            None
        }
    }
}

/// Which scope boundary resets a policy's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyScope {
    Block,
    Global,
    FlowBlock,
}

/// One row of the known-policy table.
#[derive(Debug, Clone, Copy)]
pub struct PolicyEntry {
    pub id: &'static str,
    pub switch_version: CmakeVersion,
    pub default_before: PolicyStatus,
    pub default_at_or_after: PolicyStatus,
    pub scope: PolicyScope,
}

/// The closed table of policies this evaluator understands.
static POLICY_TABLE: &[PolicyEntry] = &[
    PolicyEntry {
        // project() manages VERSION variables.
        id: "CMP0048",
        switch_version: CmakeVersion::new(3, 0, 0, 0),
        default_before: PolicyStatus::Old,
        default_at_or_after: PolicyStatus::New,
        scope: PolicyScope::Block,
    },
    PolicyEntry {
        // if() quoted arguments are not dereferenced.
        id: "CMP0054",
        switch_version: CmakeVersion::new(3, 1, 0, 0),
        default_before: PolicyStatus::Old,
        default_at_or_after: PolicyStatus::New,
        scope: PolicyScope::Block,
    },
    PolicyEntry {
        // find_package() honors <Pkg>_ROOT.
        id: "CMP0074",
        switch_version: CmakeVersion::new(3, 12, 0, 0),
        default_before: PolicyStatus::Old,
        default_at_or_after: PolicyStatus::New,
        scope: PolicyScope::Block,
    },
    PolicyEntry {
        // option() honors normal variables.
        id: "CMP0077",
        switch_version: CmakeVersion::new(3, 13, 0, 0),
        default_before: PolicyStatus::Old,
        default_at_or_after: PolicyStatus::New,
        scope: PolicyScope::Block,
    },
    PolicyEntry {
        // Source file extensions must be explicit.
        id: "CMP0115",
        switch_version: CmakeVersion::new(3, 20, 0, 0),
        default_before: PolicyStatus::Old,
        default_at_or_after: PolicyStatus::New,
        scope: PolicyScope::Block,
    },
    PolicyEntry {
        // foreach() loop variables are scoped to the loop.
        id: "CMP0124",
        switch_version: CmakeVersion::new(3, 21, 0, 0),
        default_before: PolicyStatus::Old,
        default_at_or_after: PolicyStatus::New,
        scope: PolicyScope::FlowBlock,
    },
];

/// `CMPxxxx`: exactly three letters and four digits.
#[must_use]
pub fn is_policy_id(id: &str) -> bool {
    let b = id.as_bytes();
    b.len() == 7
        && b[0].eq_ignore_ascii_case(&b'C')
        && b[1].eq_ignore_ascii_case(&b'M')
        && b[2].eq_ignore_ascii_case(&b'P')
        && b[3..].iter().all(u8::is_ascii_digit)
}

#[must_use]
pub fn canonical_id(id: &str) -> String {
    id.to_ascii_uppercase()
}

#[must_use]
pub fn table_entry(id: &str) -> Option<&'static PolicyEntry> {
    if !is_policy_id(id) {
        return None;
    }
    POLICY_TABLE.iter().find(|e| e.id.eq_ignore_ascii_case(id))
}

#[must_use]
pub fn is_known_policy(id: &str) -> bool {
    table_entry(id).is_some()
}

#[must_use]
pub fn known_policies() -> &'static [PolicyEntry] {
    POLICY_TABLE
}

impl Evaluator {
    pub(crate) fn policy_push(&mut self) {
        self.policy_stack.push(std::collections::HashMap::new());
    }

    /// Pop one policy depth. Fails on the root depth.
    pub(crate) fn policy_pop(&mut self) -> bool {
        if self.policy_stack.len() <= 1 {
            return false;
        }
        self.policy_stack.pop();
        true
    }

    #[must_use]
    pub(crate) fn policy_depth(&self) -> usize {
        self.policy_stack.len()
    }

    /// Write OLD/NEW into the current depth and the legacy mirror.
    pub(crate) fn policy_set(&mut self, id: &str, status: PolicyStatus) {
        let canonical = canonical_id(id);
        if let Some(top) = self.policy_stack.last_mut() {
            top.insert(canonical.clone(), status);
        }
        self.var_set(format!("CMAKE_POLICY_{canonical}"), status.as_str().to_string());
    }

    pub(crate) fn policy_unset_slot(&mut self, id: &str) {
        let canonical = canonical_id(id);
        if let Some(top) = self.policy_stack.last_mut() {
            top.remove(&canonical);
        }
    }

    /// Effective status as a string: `OLD`, `NEW`, or empty for unset or
    /// unknown ids.
    #[must_use]
    pub fn policy_get_effective(&self, id: &str) -> String {
        if !is_policy_id(id) {
            return String::new();
        }
        let canonical = canonical_id(id);

        for slots in self.policy_stack.iter().rev() {
            if let Some(status) = slots.get(&canonical) {
                return status.as_str().to_string();
            }
        }

        let default_var = self.var_get(&format!("CMAKE_POLICY_DEFAULT_{canonical}"));
        if let Some(status) = PolicyStatus::parse(&default_var) {
            return status.as_str().to_string();
        }

        let Some(entry) = table_entry(&canonical) else {
            return String::new();
        };
        let gated = CmakeVersion::parse_strict(&self.var_get("CMAKE_POLICY_VERSION"))
            .map_or(entry.default_before, |current| {
                if current >= entry.switch_version {
                    entry.default_at_or_after
                } else {
                    entry.default_before
                }
            });
        gated.as_str().to_string()
    }

    /// Sweep every known policy: OLD or NEW at the current depth
    /// according to whether its switch version is at or below
    /// `policy_version`.
    pub(crate) fn policy_apply_version_defaults(&mut self, policy_version: CmakeVersion) {
        for entry in POLICY_TABLE {
            let status = if entry.switch_version <= policy_version {
                PolicyStatus::New
            } else {
                PolicyStatus::Old
            };
            self.policy_set(entry.id, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluatorOptions;

    fn evaluator() -> Evaluator {
        Evaluator::new(EvaluatorOptions::new("/proj/src", "/proj/build")).unwrap()
    }

    #[test]
    fn id_recognition() {
        assert!(is_policy_id("CMP0077"));
        assert!(is_policy_id("cmp0124"));
        assert!(!is_policy_id("CMP77"));
        assert!(!is_policy_id("XMP0077"));
        assert!(!is_policy_id("CMP007x"));
    }

    #[test]
    fn set_and_get_at_depth() {
        let mut eval = evaluator();
        eval.policy_set("cmp0077", PolicyStatus::New);
        assert_eq!(eval.policy_get_effective("CMP0077"), "NEW");
        // Legacy mirror written too.
        assert_eq!(eval.var_get("CMAKE_POLICY_CMP0077"), "NEW");
    }

    #[test]
    fn pop_discards_inner_slots() {
        let mut eval = evaluator();
        eval.policy_push();
        eval.policy_set("CMP0124", PolicyStatus::New);
        assert_eq!(eval.policy_get_effective("CMP0124"), "NEW");
        assert!(eval.policy_pop());
        // The mirror variable survives for scripts, but lookup forgets.
        assert_eq!(eval.var_get("CMAKE_POLICY_CMP0124"), "NEW");
        assert_eq!(eval.policy_get_effective("CMP0124"), "OLD");
    }

    #[test]
    fn pop_at_root_fails() {
        let mut eval = evaluator();
        assert!(!eval.policy_pop());
    }

    #[test]
    fn default_override_variable() {
        let mut eval = evaluator();
        eval.var_set("CMAKE_POLICY_DEFAULT_CMP0054".into(), "NEW".into());
        assert_eq!(eval.policy_get_effective("CMP0054"), "NEW");
    }

    #[test]
    fn version_gated_default() {
        let mut eval = evaluator();
        eval.var_set("CMAKE_POLICY_VERSION".into(), "3.22".into());
        assert_eq!(eval.policy_get_effective("CMP0124"), "NEW");
        eval.var_set("CMAKE_POLICY_VERSION".into(), "3.20".into());
        assert_eq!(eval.policy_get_effective("CMP0124"), "OLD");
    }

    #[test]
    fn unknown_policy_is_empty() {
        let eval = evaluator();
        assert_eq!(eval.policy_get_effective("CMP9999"), "");
        assert_eq!(eval.policy_get_effective("garbage"), "");
    }

    #[test]
    fn version_sweep() {
        let mut eval = evaluator();
        eval.policy_apply_version_defaults(CmakeVersion::new(3, 13, 0, 0));
        assert_eq!(eval.policy_get_effective("CMP0077"), "NEW");
        assert_eq!(eval.policy_get_effective("CMP0124"), "OLD");
    }
}
