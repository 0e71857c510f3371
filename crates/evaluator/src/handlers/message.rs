//! `message()` — modes, check stack, deprecation gating, configure log

use std::io::Write;

use cmeval_errors::Error;
use cmeval_events::{DiagClass, DiagCode, DiagSeverity};
use cmeval_types::is_cmake_false;

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageMode {
    Notice,
    Status,
    Verbose,
    Debug,
    Trace,
    Warning,
    AuthorWarning,
    Deprecation,
    SendError,
    FatalError,
    CheckStart,
    CheckPass,
    CheckFail,
    ConfigureLog,
    Plain,
}

fn parse_mode(head: &str) -> Option<MessageMode> {
    let mode = match head.to_ascii_uppercase().as_str() {
        "NOTICE" => MessageMode::Notice,
        "STATUS" => MessageMode::Status,
        "VERBOSE" => MessageMode::Verbose,
        "DEBUG" => MessageMode::Debug,
        "TRACE" => MessageMode::Trace,
        "WARNING" => MessageMode::Warning,
        "AUTHOR_WARNING" => MessageMode::AuthorWarning,
        "DEPRECATION" => MessageMode::Deprecation,
        "SEND_ERROR" => MessageMode::SendError,
        "FATAL_ERROR" => MessageMode::FatalError,
        "CHECK_START" => MessageMode::CheckStart,
        "CHECK_PASS" => MessageMode::CheckPass,
        "CHECK_FAIL" => MessageMode::CheckFail,
        "CONFIGURE_LOG" => MessageMode::ConfigureLog,
        _ => return None,
    };
    Some(mode)
}

impl Evaluator {
    #[allow(clippy::too_many_lines)]
    pub(crate) fn cmd_message(&mut self, inv: &Invocation) -> Result<(), Error> {
        let (mut mode, msg_begin) = match inv.args.first().map(|t| parse_mode(&t.text)) {
            Some(Some(mode)) => (mode, 1usize),
            _ => (MessageMode::Plain, 0usize),
        };

        // Message text is the remaining arguments joined without separator.
        let mut message: String = inv.args[msg_begin.min(inv.args.len())..]
            .iter()
            .map(|t| t.text.as_str())
            .collect();

        match mode {
            MessageMode::CheckStart => {
                self.check_stack.push(message.clone());
            }
            MessageMode::CheckPass | MessageMode::CheckFail => {
                let Some(start) = self.check_stack.pop() else {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        "message(CHECK_PASS/CHECK_FAIL) requires a preceding CHECK_START",
                        "Use message(CHECK_START ...) before CHECK_PASS/CHECK_FAIL",
                    );
                    return Ok(());
                };
                message = format!("{start} - {message}");
            }
            _ => {}
        }

        if mode == MessageMode::Deprecation {
            let error_deprecated = self.var_get("CMAKE_ERROR_DEPRECATED");
            let error_enabled = !error_deprecated.is_empty() && !is_cmake_false(&error_deprecated);
            let warn_deprecated = self.var_get("CMAKE_WARN_DEPRECATED");
            let warn_enabled = warn_deprecated.is_empty() || !is_cmake_false(&warn_deprecated);
            if error_enabled {
                mode = MessageMode::SendError;
            } else if warn_enabled {
                mode = MessageMode::Warning;
            } else {
                return Ok(());
            }
        }

        if mode == MessageMode::ConfigureLog {
            if let Err(io_err) = self.append_configure_log(inv.line, &message) {
                self.emit_diag(
                    DiagSeverity::Error,
                    "message",
                    &inv.name,
                    inv.origin.clone(),
                    format!("message(CONFIGURE_LOG) failed to write the log: {io_err}"),
                    "",
                    DiagClass::IoEnvError,
                    DiagCode::IoError,
                );
            }
            return Ok(());
        }

        match mode {
            MessageMode::FatalError => {
                self.emit_diag(
                    DiagSeverity::Error,
                    "message",
                    &inv.name,
                    inv.origin.clone(),
                    message,
                    "",
                    DiagClass::InputError,
                    DiagCode::FatalError,
                );
                self.request_stop();
            }
            MessageMode::SendError => {
                self.emit_diag(
                    DiagSeverity::Error,
                    "message",
                    &inv.name,
                    inv.origin.clone(),
                    message,
                    "",
                    DiagClass::InputError,
                    DiagCode::BadArguments,
                );
            }
            MessageMode::Warning | MessageMode::AuthorWarning => {
                self.emit_diag(
                    DiagSeverity::Warning,
                    "message",
                    &inv.name,
                    inv.origin.clone(),
                    message,
                    "",
                    DiagClass::InputError,
                    DiagCode::BadArguments,
                );
            }
            MessageMode::Status | MessageMode::CheckStart | MessageMode::CheckPass
            | MessageMode::CheckFail => {
                tracing::info!("{message}");
            }
            MessageMode::Notice | MessageMode::Plain => {
                tracing::info!("{message}");
            }
            MessageMode::Verbose | MessageMode::Debug => {
                tracing::debug!("{message}");
            }
            MessageMode::Trace => {
                tracing::trace!("{message}");
            }
            MessageMode::Deprecation | MessageMode::ConfigureLog => {}
        }
        Ok(())
    }

    /// Append one `message-v1` YAML document to
    /// `<binary>/CMakeFiles/CMakeConfigureLog.yaml`.
    fn append_configure_log(&mut self, line: usize, message: &str) -> std::io::Result<()> {
        let mut bin = self.var_get("CMAKE_BINARY_DIR");
        if bin.is_empty() {
            bin = self.binary_dir.clone();
        }
        let dir = paths::join(&bin, "CMakeFiles");
        std::fs::create_dir_all(&dir)?;
        let log_path = paths::join(&dir, "CMakeConfigureLog.yaml");

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let current_file = if self.current_file.is_empty() {
            "CMakeLists.txt"
        } else {
            &self.current_file
        };
        writeln!(file, "---")?;
        writeln!(file, "events:")?;
        writeln!(file, "  - kind: \"message-v1\"")?;
        writeln!(file, "    backtrace:")?;
        writeln!(file, "      - \"{current_file}:{line} (message)\"")?;
        if !self.check_stack.is_empty() {
            writeln!(file, "    checks:")?;
            for check in self.check_stack.iter().rev() {
                writeln!(file, "      - \"{check}\"")?;
            }
        }
        writeln!(file, "    message: |")?;
        for msg_line in message.lines() {
            writeln!(file, "      {msg_line}")?;
        }
        if message.is_empty() {
            writeln!(file)?;
        }
        writeln!(file, "...")?;
        Ok(())
    }
}
