//! Shared test harness: a throwaway source/binary tree pair plus an
//! evaluator wired to it.
#![allow(dead_code)]

use std::path::PathBuf;

use cmeval_evaluator::{Evaluator, EvaluatorOptions};
use cmeval_events::{DiagSeverity, EventData};

pub struct Sandbox {
    _dir: tempfile::TempDir,
    pub source: PathBuf,
    pub binary: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create sandbox");
        let source = dir.path().join("src");
        let binary = dir.path().join("build");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&binary).unwrap();
        Self {
            _dir: dir,
            source,
            binary,
        }
    }

    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(EvaluatorOptions::new(&self.source, &self.binary)).unwrap()
    }

    /// Drop a file under the source tree, creating parent directories.
    pub fn write_source_file(&self, relative: &str, content: &str) {
        let path = self.source.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}

pub fn run(eval: &mut Evaluator, script: &str) {
    eval.run_source_text(script).expect("script evaluation");
}

pub fn count_tag(eval: &Evaluator, tag: &str) -> usize {
    eval.events().count_tag(tag)
}

pub fn count_error_diags_for_command(eval: &Evaluator, command: &str) -> usize {
    eval.events()
        .diagnostics()
        .filter(|(_, d)| d.severity == DiagSeverity::Error && d.command == command)
        .count()
}

pub fn count_warning_diags_for_command(eval: &Evaluator, command: &str) -> usize {
    eval.events()
        .diagnostics()
        .filter(|(_, d)| d.severity == DiagSeverity::Warning && d.command == command)
        .count()
}

/// Count `TargetPropSet` events matching all fields.
pub fn count_target_prop_events(
    eval: &Evaluator,
    target: &str,
    key: &str,
    value: &str,
    op: cmeval_events::TargetPropOp,
) -> usize {
    eval.events()
        .iter()
        .filter(|e| match &e.data {
            EventData::TargetPropSet {
                target: t,
                key: k,
                value: v,
                op: o,
            } => t == target && k == key && v == value && *o == op,
            _ => false,
        })
        .count()
}
