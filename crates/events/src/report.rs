//! Run report: rolling diagnostic counters and overall status

use serde::{Deserialize, Serialize};

use crate::diag::{DiagClass, DiagCode, DiagSeverity};

/// Final verdict of an evaluation run, derived from the counters plus the
/// evaluator's stop/oom flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    #[default]
    Ok,
    OkWithWarnings,
    OkWithErrors,
    Fatal,
}

impl OverallStatus {
    /// Process exit code the CLI maps this status to.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Ok | Self::OkWithWarnings => 0,
            Self::OkWithErrors => 1,
            Self::Fatal => 2,
        }
    }
}

/// Rolling counters updated on every diagnostic emission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub warning_count: usize,
    pub error_count: usize,
    pub input_error_count: usize,
    pub engine_limitation_count: usize,
    pub io_env_error_count: usize,
    pub policy_conflict_count: usize,
    pub unsupported_count: usize,
    pub overall_status: OverallStatus,
}

impl RunReport {
    /// Record one diagnostic and refresh the overall status.
    pub fn record(&mut self, severity: DiagSeverity, class: DiagClass, code: DiagCode) {
        match severity {
            DiagSeverity::Warning => self.warning_count += 1,
            DiagSeverity::Error => self.error_count += 1,
        }
        match class {
            DiagClass::InputError => self.input_error_count += 1,
            DiagClass::EngineLimitation => self.engine_limitation_count += 1,
            DiagClass::IoEnvError => self.io_env_error_count += 1,
            DiagClass::PolicyConflict => self.policy_conflict_count += 1,
        }
        if code == DiagCode::Unsupported {
            self.unsupported_count += 1;
        }
        self.finalize(false);
    }

    /// Recompute `overall_status`. `fatal` is true when the evaluator
    /// stopped (explicit stop or resource exhaustion).
    pub fn finalize(&mut self, fatal: bool) {
        self.overall_status = if fatal {
            OverallStatus::Fatal
        } else if self.error_count > 0 {
            OverallStatus::OkWithErrors
        } else if self.warning_count > 0 {
            OverallStatus::OkWithWarnings
        } else {
            OverallStatus::Ok
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_derivation() {
        let mut report = RunReport::default();
        assert_eq!(report.overall_status, OverallStatus::Ok);

        report.record(
            DiagSeverity::Warning,
            DiagClass::EngineLimitation,
            DiagCode::Unsupported,
        );
        assert_eq!(report.overall_status, OverallStatus::OkWithWarnings);
        assert_eq!(report.unsupported_count, 1);

        report.record(
            DiagSeverity::Error,
            DiagClass::InputError,
            DiagCode::BadArguments,
        );
        assert_eq!(report.overall_status, OverallStatus::OkWithErrors);

        report.finalize(true);
        assert_eq!(report.overall_status, OverallStatus::Fatal);
        assert_eq!(report.overall_status.exit_code(), 2);
    }
}
