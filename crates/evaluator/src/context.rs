//! Evaluator state
//!
//! One [`Evaluator`] owns everything a run touches: the variable scope
//! stack, policy stack, target registry, user-command registry, macro
//! bind frames, flow flags, the event stream and the run report. The
//! interpreter is single-threaded and cooperative; flags set by one
//! statement are observed at the next statement boundary.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use cmeval_config::Config;
use cmeval_errors::{Error, EvalError};
use cmeval_events::{
    DiagClass, DiagCode, DiagSeverity, Diagnostic, Event, EventData, EventStream, Origin,
    RunReport, TargetPropOp,
};

use crate::flow::BlockFrame;
use crate::policy::PolicyStatus;
use crate::usercmd::UserCommand;

/// Everything needed to construct an [`Evaluator`].
#[derive(Debug, Clone)]
pub struct EvaluatorOptions {
    pub source_dir: PathBuf,
    pub binary_dir: PathBuf,
    pub config: Config,
    /// `-D NAME=VALUE` style preseeds applied after the built-in ones.
    pub defines: Vec<(String, String)>,
}

impl EvaluatorOptions {
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>, binary_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            binary_dir: binary_dir.into(),
            config: Config::default(),
            defines: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }
}

/// What a finished run hands to the consumer.
#[derive(Debug)]
pub struct EvalOutcome {
    pub events: Vec<Event>,
    pub report: RunReport,
}

/// The evaluator context. See the crate docs for the component map.
pub struct Evaluator {
    pub(crate) source_dir: String,
    pub(crate) binary_dir: String,
    pub(crate) config: Config,

    pub(crate) current_file: String,

    // Variable environment: frame 0 is global, lookups walk top-down.
    pub(crate) scopes: Vec<HashMap<String, String>>,

    // Policy engine: one slot map per depth.
    pub(crate) policy_stack: Vec<HashMap<String, PolicyStatus>>,

    // Target registry. Insertion order kept for deterministic output.
    pub(crate) known_targets: Vec<String>,
    pub(crate) alias_targets: HashSet<String>,

    // Shadow of TargetPropSet emissions, read by $<TARGET_PROPERTY:...>.
    pub(crate) target_properties: HashMap<(String, String), String>,

    // User commands and macro textual-bind frames.
    pub(crate) user_commands: HashMap<String, UserCommand>,
    pub(crate) macro_frames: Vec<HashMap<String, String>>,

    // Flow controller state.
    pub(crate) block_frames: Vec<BlockFrame>,
    pub(crate) loop_depth: usize,
    pub(crate) include_depth: usize,
    pub(crate) break_requested: bool,
    pub(crate) continue_requested: bool,
    pub(crate) return_requested: bool,
    pub(crate) stop_requested: bool,
    pub(crate) oom: bool,

    // message(CHECK_START/CHECK_PASS/CHECK_FAIL) stack.
    pub(crate) check_stack: Vec<String>,

    // Read-through state for $CACHE{} and set(ENV{}). A `None` overlay
    // entry is a tombstone left by unset(ENV{}).
    pub(crate) cache_entries: HashMap<String, String>,
    pub(crate) env_overlay: HashMap<String, Option<String>>,

    // include_guard() bookkeeping, keyed by canonical file path.
    pub(crate) include_guards: HashSet<String>,

    pub(crate) stream: EventStream,
    pub(crate) report: RunReport,
}

impl Evaluator {
    /// Build an evaluator with preseeded variables.
    ///
    /// # Errors
    ///
    /// Construction currently cannot fail; the `Result` is part of the
    /// embedding contract so option validation can grow without breaking
    /// callers.
    pub fn new(options: EvaluatorOptions) -> Result<Self, Error> {
        let source_dir = crate::paths::normalize(&options.source_dir.display().to_string());
        let binary_dir = crate::paths::normalize(&options.binary_dir.display().to_string());

        let mut eval = Self {
            source_dir,
            binary_dir,
            config: options.config,
            current_file: String::new(),
            scopes: vec![HashMap::new()],
            policy_stack: vec![HashMap::new()],
            known_targets: Vec::new(),
            alias_targets: HashSet::new(),
            target_properties: HashMap::new(),
            user_commands: HashMap::new(),
            macro_frames: Vec::new(),
            block_frames: Vec::new(),
            loop_depth: 0,
            include_depth: 0,
            break_requested: false,
            continue_requested: false,
            return_requested: false,
            stop_requested: false,
            oom: false,
            check_stack: Vec::new(),
            cache_entries: HashMap::new(),
            env_overlay: HashMap::new(),
            include_guards: HashSet::new(),
            stream: EventStream::new(),
            report: RunReport::default(),
        };
        eval.preseed_variables();
        for (name, value) in &options.defines {
            eval.var_set(name.clone(), value.clone());
        }
        Ok(eval)
    }

    fn preseed_variables(&mut self) {
        let host = if cfg!(target_os = "windows") {
            "Windows"
        } else if cfg!(target_os = "macos") {
            "Darwin"
        } else {
            "Linux"
        };
        let compiler_id = if cfg!(target_os = "windows") {
            "MSVC"
        } else if cfg!(target_os = "macos") {
            "AppleClang"
        } else {
            "GNU"
        };
        let src = self.source_dir.clone();
        let bin = self.binary_dir.clone();
        for (name, value) in [
            ("CMAKE_VERSION", crate::policy::BASELINE_VERSION_STRING),
            ("CMAKE_SYSTEM_NAME", host),
            ("CMAKE_HOST_SYSTEM_NAME", host),
            ("CMAKE_C_COMPILER_ID", compiler_id),
            ("CMAKE_CXX_COMPILER_ID", compiler_id),
            ("CMAKE_MODULE_PATH", ""),
            ("CMAKE_PREFIX_PATH", ""),
        ] {
            self.var_set(name.to_string(), value.to_string());
        }
        for (name, value) in [
            ("CMAKE_SOURCE_DIR", &src),
            ("CMAKE_BINARY_DIR", &bin),
            ("CMAKE_CURRENT_SOURCE_DIR", &src),
            ("CMAKE_CURRENT_BINARY_DIR", &bin),
        ] {
            self.var_set(name.to_string(), value.clone());
        }
    }

    // ---- control flags -------------------------------------------------

    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_requested || self.oom
    }

    pub fn request_stop(&mut self) {
        self.stop_requested = true;
        self.report.finalize(true);
    }

    /// Reserved for embedders: marks the run as resource-exhausted and
    /// forces `Fatal` status.
    pub fn mark_out_of_memory(&mut self) {
        self.oom = true;
        self.report.finalize(true);
    }

    #[must_use]
    pub(crate) fn flow_interrupted(&self) -> bool {
        self.should_stop()
            || self.break_requested
            || self.continue_requested
            || self.return_requested
    }

    // ---- event emission ------------------------------------------------

    pub(crate) fn origin(&self, line: usize, command: &str) -> Origin {
        Origin::new(self.current_file.clone(), line, command)
    }

    pub(crate) fn emit(&mut self, origin: Origin, data: EventData) {
        if self.should_stop() {
            return;
        }
        // Keep the target-property shadow in sync so TARGET_PROPERTY genex
        // reads observe prior writes.
        if let EventData::TargetPropSet {
            target,
            key,
            value,
            op,
        } = &data
        {
            let slot = (target.clone(), key.to_ascii_uppercase());
            match op {
                TargetPropOp::Set => {
                    self.target_properties.insert(slot, value.clone());
                }
                TargetPropOp::AppendList => {
                    let entry = self.target_properties.entry(slot).or_default();
                    if !entry.is_empty() {
                        entry.push(';');
                    }
                    entry.push_str(value);
                }
                TargetPropOp::AppendString => {
                    self.target_properties.entry(slot).or_default().push_str(value);
                }
            }
        }
        self.stream.push(origin, data);
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn emit_diag(
        &mut self,
        severity: DiagSeverity,
        component: &str,
        command: &str,
        origin: Origin,
        cause: impl Into<String>,
        hint: impl Into<String>,
        class: DiagClass,
        code: DiagCode,
    ) {
        let cause = cause.into();
        let hint = hint.into();
        match severity {
            DiagSeverity::Warning => tracing::warn!(%origin, "{cause}"),
            DiagSeverity::Error => tracing::error!(%origin, "{cause}"),
        }
        self.report.record(severity, class, code);
        self.stream.push(
            origin,
            EventData::Diagnostic(Diagnostic::new(
                severity, component, command, cause, hint, class, code,
            )),
        );
    }

    /// Input-error shorthand used by most handlers.
    pub(crate) fn input_error(
        &mut self,
        command: &str,
        origin: Origin,
        cause: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.emit_diag(
            DiagSeverity::Error,
            "dispatcher",
            command,
            origin,
            cause,
            hint,
            DiagClass::InputError,
            DiagCode::BadArguments,
        );
    }

    // ---- variable environment -----------------------------------------

    /// Scoped lookup; missing names resolve to the empty string. The
    /// `ENV{}` and `CACHE{}` namespaces intercept before the scopes.
    #[must_use]
    pub fn var_get(&self, name: &str) -> String {
        if let Some(env_name) = strip_namespace(name, "ENV") {
            return self.env_get(env_name).unwrap_or_default();
        }
        if let Some(cache_name) = strip_namespace(name, "CACHE") {
            return self.cache_entries.get(cache_name).cloned().unwrap_or_default();
        }
        for frame in self.scopes.iter().rev() {
            if let Some(v) = frame.get(name) {
                return v.clone();
            }
        }
        String::new()
    }

    #[must_use]
    pub fn var_defined(&self, name: &str) -> bool {
        if let Some(env_name) = strip_namespace(name, "ENV") {
            return self.env_defined(env_name);
        }
        if let Some(cache_name) = strip_namespace(name, "CACHE") {
            return self.cache_entries.contains_key(cache_name);
        }
        self.scopes.iter().rev().any(|f| f.contains_key(name))
    }

    #[must_use]
    pub(crate) fn var_defined_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|frame| frame.contains_key(name))
    }

    pub fn var_set(&mut self, name: String, value: String) {
        if let Some(frame) = self.scopes.last_mut() {
            frame.insert(name, value);
        }
    }

    /// Write to the parent frame. Fails when already at global scope.
    pub(crate) fn var_set_parent(&mut self, name: String, value: String) -> bool {
        let depth = self.scopes.len();
        if depth < 2 {
            return false;
        }
        self.scopes[depth - 2].insert(name, value);
        true
    }

    pub fn var_unset(&mut self, name: &str) {
        if let Some(frame) = self.scopes.last_mut() {
            frame.remove(name);
        }
    }

    pub(crate) fn var_unset_parent(&mut self, name: &str) -> bool {
        let depth = self.scopes.len();
        if depth < 2 {
            return false;
        }
        self.scopes[depth - 2].remove(name);
        true
    }

    pub(crate) fn scope_push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub(crate) fn scope_pop(&mut self) -> Result<(), Error> {
        if self.scopes.len() <= 1 {
            return Err(EvalError::ScopeCorruption {
                message: "attempted to pop the global variable scope".to_string(),
            }
            .into());
        }
        self.scopes.pop();
        Ok(())
    }

    #[must_use]
    pub(crate) fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    // ---- environment / cache namespaces -------------------------------

    #[must_use]
    pub(crate) fn env_get(&self, name: &str) -> Option<String> {
        let key = normalize_env_name(name);
        if let Some(entry) = self.env_overlay.get(&key) {
            return entry.clone();
        }
        std::env::var(&key).ok()
    }

    #[must_use]
    pub(crate) fn env_defined(&self, name: &str) -> bool {
        let key = normalize_env_name(name);
        if let Some(entry) = self.env_overlay.get(&key) {
            return entry.is_some();
        }
        std::env::var(&key).is_ok()
    }

    pub(crate) fn env_set(&mut self, name: &str, value: String) {
        self.env_overlay.insert(normalize_env_name(name), Some(value));
    }

    pub(crate) fn env_unset(&mut self, name: &str) {
        self.env_overlay.insert(normalize_env_name(name), None);
    }

    // ---- finishing -----------------------------------------------------

    /// Consume the evaluator, producing the event stream and report.
    #[must_use]
    pub fn finish(mut self) -> EvalOutcome {
        self.report.finalize(self.should_stop());
        EvalOutcome {
            events: self.stream.drain(),
            report: self.report,
        }
    }

    /// Access events without consuming (test helper and embedder API).
    #[must_use]
    pub fn events(&self) -> &EventStream {
        &self.stream
    }

    #[must_use]
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    #[must_use]
    pub fn known_target_names(&self) -> &[String] {
        &self.known_targets
    }
}

/// Match `NS{name}` and return `name`.
fn strip_namespace<'a>(input: &'a str, ns: &str) -> Option<&'a str> {
    let rest = input.strip_prefix(ns)?;
    let inner = rest.strip_prefix('{')?;
    inner.strip_suffix('}')
}

/// Environment names are case-normalized on Windows, case-preserving on
/// POSIX, matching platform semantics.
fn normalize_env_name(name: &str) -> String {
    if cfg!(target_os = "windows") {
        name.to_ascii_uppercase()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> Evaluator {
        Evaluator::new(EvaluatorOptions::new("/proj/src", "/proj/build")).unwrap()
    }

    #[test]
    fn unset_variable_is_empty() {
        let eval = evaluator();
        assert_eq!(eval.var_get("NOPE"), "");
        assert!(!eval.var_defined("NOPE"));
    }

    #[test]
    fn scoped_lookup_walks_frames() {
        let mut eval = evaluator();
        eval.var_set("A".into(), "outer".into());
        eval.scope_push();
        assert_eq!(eval.var_get("A"), "outer");
        eval.var_set("A".into(), "inner".into());
        assert_eq!(eval.var_get("A"), "inner");
        eval.scope_pop().unwrap();
        assert_eq!(eval.var_get("A"), "outer");
    }

    #[test]
    fn parent_scope_writes_one_frame_down() {
        let mut eval = evaluator();
        eval.scope_push();
        assert!(eval.var_set_parent("B".into(), "v".into()));
        eval.scope_pop().unwrap();
        assert_eq!(eval.var_get("B"), "v");
        // Global scope has no parent.
        assert!(!eval.var_set_parent("C".into(), "v".into()));
    }

    #[test]
    fn global_scope_cannot_pop() {
        let mut eval = evaluator();
        assert!(eval.scope_pop().is_err());
    }

    #[test]
    fn cache_namespace_reads_through() {
        let mut eval = evaluator();
        eval.cache_entries.insert("OPT".into(), "ON".into());
        assert_eq!(eval.var_get("CACHE{OPT}"), "ON");
        assert!(eval.var_defined("CACHE{OPT}"));
        assert_eq!(eval.var_get("CACHE{OTHER}"), "");
    }

    #[test]
    fn env_overlay_wins_over_process() {
        let mut eval = evaluator();
        eval.env_set("CMEVAL_TEST_ENV", "overlay".into());
        assert_eq!(eval.var_get("ENV{CMEVAL_TEST_ENV}"), "overlay");
        eval.env_unset("CMEVAL_TEST_ENV");
        assert!(!eval.env_defined("CMEVAL_TEST_ENV"));
    }

    #[test]
    fn preseeded_variables_present() {
        let eval = evaluator();
        assert_eq!(eval.var_get("CMAKE_SOURCE_DIR"), "/proj/src");
        assert_eq!(eval.var_get("CMAKE_BINARY_DIR"), "/proj/build");
        assert!(!eval.var_get("CMAKE_VERSION").is_empty());
    }

    #[test]
    fn target_prop_shadow_tracks_ops() {
        let mut eval = evaluator();
        let o = eval.origin(1, "set_target_properties");
        eval.emit(
            o.clone(),
            EventData::TargetPropSet {
                target: "t".into(),
                key: "LINK_FLAGS".into(),
                value: "-a".into(),
                op: TargetPropOp::Set,
            },
        );
        eval.emit(
            o.clone(),
            EventData::TargetPropSet {
                target: "t".into(),
                key: "LINK_FLAGS".into(),
                value: "-b".into(),
                op: TargetPropOp::AppendList,
            },
        );
        eval.emit(
            o,
            EventData::TargetPropSet {
                target: "t".into(),
                key: "LINK_FLAGS".into(),
                value: "x".into(),
                op: TargetPropOp::AppendString,
            },
        );
        assert_eq!(
            eval.target_properties[&("t".to_string(), "LINK_FLAGS".to_string())],
            "-a;-bx"
        );
    }
}
