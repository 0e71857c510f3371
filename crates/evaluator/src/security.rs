//! File-system security policy
//!
//! Every `file(...)` path funnels through [`Evaluator::resolve_and_validate_path`]:
//! normalize, resolve relative paths against the intent's base directory,
//! then require containment inside one of the allowed roots (the source
//! tree, the binary tree, and any roots added via configuration).
//! Violations produce exactly one `Security Violation` error diagnostic
//! and the caller performs no filesystem access.

use cmeval_events::{DiagClass, DiagCode, DiagSeverity, Origin};

use crate::context::Evaluator;
use crate::paths;

/// What the caller intends to do with the path; selects the base
/// directory for relative inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathIntent {
    /// Reads and write-adjacent operations resolve against
    /// `CMAKE_CURRENT_SOURCE_DIR`.
    Source,
    /// Generated outputs resolve against `CMAKE_CURRENT_BINARY_DIR`.
    Binary,
}

fn contains(root: &str, path: &str) -> bool {
    if root.is_empty() {
        return false;
    }
    path == root || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

impl Evaluator {
    fn allowed_roots(&self) -> Vec<String> {
        let mut roots = vec![self.source_dir.clone(), self.binary_dir.clone()];
        for extra in &self.config.security.extra_allowed_roots {
            roots.push(paths::normalize(&extra.display().to_string()));
        }
        roots
    }

    /// Resolve `raw` for a filesystem operation. Returns the normalized
    /// absolute path, or `None` after emitting the security diagnostic.
    pub(crate) fn resolve_and_validate_path(
        &mut self,
        raw: &str,
        command: &str,
        origin: &Origin,
        intent: PathIntent,
    ) -> Option<String> {
        let base = match intent {
            PathIntent::Source => {
                let dir = self.var_get("CMAKE_CURRENT_SOURCE_DIR");
                if dir.is_empty() {
                    self.source_dir.clone()
                } else {
                    dir
                }
            }
            PathIntent::Binary => {
                let dir = self.var_get("CMAKE_CURRENT_BINARY_DIR");
                if dir.is_empty() {
                    self.binary_dir.clone()
                } else {
                    dir
                }
            }
        };

        let resolved = if paths::is_absolute(raw) {
            paths::normalize(raw)
        } else {
            paths::normalize(&paths::join(&base, raw))
        };

        if self.allowed_roots().iter().any(|root| contains(root, &resolved)) {
            return Some(resolved);
        }

        self.emit_diag(
            DiagSeverity::Error,
            "file",
            command,
            origin.clone(),
            format!("Security Violation: path '{resolved}' is outside the project roots"),
            "file() operations are restricted to the source and binary trees",
            DiagClass::IoEnvError,
            DiagCode::SecurityViolation,
        );
        None
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
    fn relative_paths_resolve_inside_source() {
        let mut eval = evaluator();
        let origin = eval.origin(1, "file");
        let path = eval
            .resolve_and_validate_path("data/in.txt", "file", &origin, PathIntent::Source)
            .unwrap();
        assert_eq!(path, "/proj/src/data/in.txt");
        assert_eq!(eval.report().error_count, 0);
    }

    #[test]
    fn binary_intent_resolves_inside_build() {
        let mut eval = evaluator();
        let origin = eval.origin(1, "file");
        let path = eval
            .resolve_and_validate_path("gen.h", "file", &origin, PathIntent::Binary)
            .unwrap();
        assert_eq!(path, "/proj/build/gen.h");
    }

    #[test]
    fn absolute_outside_is_rejected() {
        let mut eval = evaluator();
        let origin = eval.origin(3, "file");
        let result =
            eval.resolve_and_validate_path("/etc/passwd", "file", &origin, PathIntent::Source);
        assert!(result.is_none());
        assert_eq!(eval.report().error_count, 1);
        assert!(eval.events().has_diag_cause_containing(
            cmeval_events::DiagSeverity::Error,
            "Security Violation"
        ));
    }

    #[test]
    fn dotdot_escape_is_rejected() {
        let mut eval = evaluator();
        let origin = eval.origin(1, "file");
        let result = eval.resolve_and_validate_path(
            "../../etc/shadow",
            "file",
            &origin,
            PathIntent::Source,
        );
        assert!(result.is_none());
    }

    #[test]
    fn prefix_sibling_is_rejected() {
        let mut eval = evaluator();
        let origin = eval.origin(1, "file");
        // "/proj/src-evil" shares a string prefix but is not contained.
        let result = eval.resolve_and_validate_path(
            "/proj/src-evil/x",
            "file",
            &origin,
            PathIntent::Source,
        );
        assert!(result.is_none());
    }

    #[test]
    fn extra_roots_from_config() {
        let mut options = EvaluatorOptions::new("/proj/src", "/proj/build");
        options
            .config
            .security
            .extra_allowed_roots
            .push("/opt/toolchains".into());
        let mut eval = Evaluator::new(options).unwrap();
        let origin = eval.origin(1, "file");
        let path = eval
            .resolve_and_validate_path(
                "/opt/toolchains/arm.cmake",
                "file",
                &origin,
                PathIntent::Source,
            )
            .unwrap();
        assert_eq!(path, "/opt/toolchains/arm.cmake");
    }
}
