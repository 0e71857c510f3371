//! `file()` — filesystem-bounded side effects
//!
//! Every subcommand that accepts a path funnels it through the security
//! policy first; a rejected path performs no filesystem access at all.
//! Relative inputs resolve against the current source directory,
//! generated outputs against the current binary directory.
//!
//! `ARCHIVE_CREATE`/`ARCHIVE_EXTRACT` delegate to the `tar`/`flate2`
//! backend; `DOWNLOAD`/`UPLOAD` are declared engine limitations.

use std::io::Read;

use cmeval_errors::Error;
use cmeval_events::{DiagClass, DiagCode, DiagSeverity};
use cmeval_types::join_list;
use sha2::Digest;

use crate::context::Evaluator;
use crate::dispatch::Invocation;
use crate::paths;
use crate::security::PathIntent;

impl Evaluator {
    fn io_error(&mut self, inv: &Invocation, path: &str, err: &std::io::Error) {
        self.emit_diag(
            DiagSeverity::Error,
            "file",
            &inv.name,
            inv.origin.clone(),
            format!("file({}) failed on '{path}': {err}", inv.args[0].text.to_ascii_uppercase()),
            "",
            DiagClass::IoEnvError,
            DiagCode::IoError,
        );
    }

    #[allow(clippy::too_many_lines)]
    pub(crate) fn cmd_file(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(sub) = inv.args.first().map(|t| t.text.to_ascii_uppercase()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file() missing subcommand",
                "",
            );
            return Ok(());
        };

        match sub.as_str() {
            "READ" => self.file_read(inv),
            "STRINGS" => self.file_strings(inv),
            "WRITE" | "APPEND" => self.file_write(inv, sub == "APPEND"),
            "TOUCH" | "TOUCH_NOCREATE" => self.file_touch(inv, sub == "TOUCH_NOCREATE"),
            "COPY" | "INSTALL" => self.file_copy(inv),
            "REMOVE" | "REMOVE_RECURSE" => self.file_remove(inv, sub == "REMOVE_RECURSE"),
            "MAKE_DIRECTORY" => self.file_make_directory(inv),
            "GLOB" | "GLOB_RECURSE" => self.file_glob(inv, sub == "GLOB_RECURSE"),
            "RENAME" => self.file_rename(inv),
            "SIZE" => self.file_size(inv),
            "TIMESTAMP" => self.file_timestamp(inv),
            "SHA224" | "SHA256" | "SHA384" | "SHA512" | "BLAKE3" => self.file_hash(inv, &sub),
            "MD5" | "SHA1" | "SHA3_224" | "SHA3_256" | "SHA3_384" | "SHA3_512" => {
                self.unsupported_path(
                    "file",
                    inv,
                    format!("file({sub}) hash algorithm is not available"),
                );
                Ok(())
            }
            "DOWNLOAD" | "UPLOAD" => {
                self.unsupported_path(
                    "file",
                    inv,
                    format!("file({sub}) network transfers are not implemented"),
                );
                Ok(())
            }
            "GENERATE" => self.file_generate(inv),
            "LOCK" => self.file_lock(inv),
            "ARCHIVE_CREATE" => self.file_archive_create(inv),
            "ARCHIVE_EXTRACT" => self.file_archive_extract(inv),
            _ => {
                self.input_error(
                    &inv.name,
                    inv.origin.clone(),
                    "file() unknown subcommand",
                    sub,
                );
                Ok(())
            }
        }
    }

    fn file_read(&mut self, inv: &Invocation) -> Result<(), Error> {
        let (Some(path_tok), Some(out_var)) = (inv.args.get(1), inv.args.get(2)) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(READ) requires a path and an output variable",
                "Usage: file(READ <path> <out>)",
            );
            return Ok(());
        };
        let out_var = out_var.text.clone();
        let Some(path) = self.resolve_and_validate_path(
            &path_tok.text.clone(),
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Source,
        ) else {
            return Ok(());
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => self.var_set(out_var, content),
            Err(err) => self.io_error(inv, &path, &err),
        }
        Ok(())
    }

    fn file_strings(&mut self, inv: &Invocation) -> Result<(), Error> {
        let (Some(path_tok), Some(out_var)) = (inv.args.get(1), inv.args.get(2)) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(STRINGS) requires a path and an output variable",
                "Usage: file(STRINGS <path> <out>)",
            );
            return Ok(());
        };
        let out_var = out_var.text.clone();
        let Some(path) = self.resolve_and_validate_path(
            &path_tok.text.clone(),
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Source,
        ) else {
            return Ok(());
        };
        match std::fs::read(&path) {
            Ok(bytes) => {
                // Printable runs, one list entry per line-ish string.
                let text = String::from_utf8_lossy(&bytes);
                let lines: Vec<String> = text
                    .lines()
                    .map(|l| l.trim_end_matches('\r').to_string())
                    .filter(|l| !l.is_empty())
                    .collect();
                self.var_set(out_var, join_list(&lines));
            }
            Err(err) => self.io_error(inv, &path, &err),
        }
        Ok(())
    }

    fn file_write(&mut self, inv: &Invocation, append: bool) -> Result<(), Error> {
        let Some(path_tok) = inv.args.get(1) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(WRITE/APPEND) requires a path",
                "Usage: file(WRITE <path> <content>...)",
            );
            return Ok(());
        };
        let content: String = inv.args[2..].iter().map(|t| t.text.as_str()).collect();
        let Some(path) = self.resolve_and_validate_path(
            &path_tok.text.clone(),
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Binary,
        ) else {
            return Ok(());
        };
        if let Some(parent) = std::path::Path::new(&path).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let result = if append {
            use std::io::Write;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .and_then(|mut f| f.write_all(content.as_bytes()))
        } else {
            std::fs::write(&path, content.as_bytes())
        };
        if let Err(err) = result {
            self.io_error(inv, &path, &err);
        }
        Ok(())
    }

    fn file_touch(&mut self, inv: &Invocation, nocreate: bool) -> Result<(), Error> {
        for tok in inv.args[1..].to_vec() {
            let Some(path) = self.resolve_and_validate_path(
                &tok.text,
                &inv.name,
                &inv.origin.clone(),
                PathIntent::Binary,
            ) else {
                continue;
            };
            let exists = std::path::Path::new(&path).exists();
            if exists || nocreate {
                continue;
            }
            if let Err(err) = std::fs::write(&path, b"") {
                self.io_error(inv, &path, &err);
            }
        }
        Ok(())
    }

    fn file_copy(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(dest_pos) = inv.args.iter().position(|t| t.eq_keyword("DESTINATION")) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(COPY/INSTALL) requires DESTINATION",
                "Usage: file(COPY <files>... DESTINATION <dir>)",
            );
            return Ok(());
        };
        let Some(dest_tok) = inv.args.get(dest_pos + 1).cloned() else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(COPY/INSTALL) DESTINATION requires a directory",
                "",
            );
            return Ok(());
        };
        let Some(dest_dir) = self.resolve_and_validate_path(
            &dest_tok.text,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Binary,
        ) else {
            return Ok(());
        };
        if let Err(err) = std::fs::create_dir_all(&dest_dir) {
            self.io_error(inv, &dest_dir, &err);
            return Ok(());
        }

        for tok in inv.args[1..dest_pos].to_vec() {
            let Some(src) = self.resolve_and_validate_path(
                &tok.text,
                &inv.name,
                &inv.origin.clone(),
                PathIntent::Source,
            ) else {
                continue;
            };
            let target = paths::join(&dest_dir, paths::filename(&src));
            let result = if std::path::Path::new(&src).is_dir() {
                copy_dir_recursive(&src, &target)
            } else {
                std::fs::copy(&src, &target).map(|_| ())
            };
            if let Err(err) = result {
                self.io_error(inv, &src, &err);
            }
        }
        Ok(())
    }

    fn file_remove(&mut self, inv: &Invocation, recurse: bool) -> Result<(), Error> {
        for tok in inv.args[1..].to_vec() {
            if tok.text.is_empty() {
                continue;
            }
            let Some(path) = self.resolve_and_validate_path(
                &tok.text,
                &inv.name,
                &inv.origin.clone(),
                PathIntent::Binary,
            ) else {
                continue;
            };
            let p = std::path::Path::new(&path);
            if !p.exists() {
                continue;
            }
            let result = if p.is_dir() {
                if recurse {
                    std::fs::remove_dir_all(p)
                } else {
                    // Plain REMOVE ignores directories.
                    continue;
                }
            } else {
                std::fs::remove_file(p)
            };
            if let Err(err) = result {
                self.io_error(inv, &path, &err);
            }
        }
        Ok(())
    }

    fn file_make_directory(&mut self, inv: &Invocation) -> Result<(), Error> {
        for tok in inv.args[1..].to_vec() {
            let Some(path) = self.resolve_and_validate_path(
                &tok.text,
                &inv.name,
                &inv.origin.clone(),
                PathIntent::Binary,
            ) else {
                continue;
            };
            if let Err(err) = std::fs::create_dir_all(&path) {
                self.io_error(inv, &path, &err);
            }
        }
        Ok(())
    }

    fn file_glob(&mut self, inv: &Invocation, recurse: bool) -> Result<(), Error> {
        let Some(out_var) = inv.args.get(1).map(|t| t.text.clone()) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(GLOB) requires an output variable",
                "Usage: file(GLOB <out> [RELATIVE <dir>] <globbing-expressions>...)",
            );
            return Ok(());
        };

        let mut relative_base: Option<String> = None;
        let mut patterns: Vec<String> = Vec::new();
        let mut i = 2usize;
        while i < inv.args.len() {
            let tok = &inv.args[i];
            if tok.eq_keyword("RELATIVE") {
                relative_base = inv.args.get(i + 1).map(|t| t.text.clone());
                i += 2;
                continue;
            }
            if tok.eq_keyword("CONFIGURE_DEPENDS") || tok.eq_keyword("LIST_DIRECTORIES") {
                // LIST_DIRECTORIES carries a boolean payload.
                if tok.eq_keyword("LIST_DIRECTORIES") {
                    i += 1;
                }
                i += 1;
                continue;
            }
            patterns.push(tok.text.clone());
            i += 1;
        }

        let mut matches: Vec<String> = Vec::new();
        for pattern in patterns {
            // Split the non-wildcard directory prefix from the pattern so
            // the base directory can be security-checked.
            let (dir_part, file_part) = match pattern.rfind('/') {
                Some(pos) if pattern[..pos].find(['*', '?', '[']).is_none() => {
                    (pattern[..pos].to_string(), pattern[pos + 1..].to_string())
                }
                _ => (String::new(), pattern.clone()),
            };
            let Some(base) = self.resolve_and_validate_path(
                &dir_part,
                &inv.name,
                &inv.origin.clone(),
                PathIntent::Source,
            ) else {
                continue;
            };
            let walk_pattern = if recurse && !file_part.contains("**") {
                format!("**/{file_part}")
            } else {
                file_part
            };
            let walker = globwalk::GlobWalkerBuilder::from_patterns(&base, &[walk_pattern])
                .follow_links(false)
                .build();
            let walker = match walker {
                Ok(w) => w,
                Err(e) => {
                    self.input_error(
                        &inv.name,
                        inv.origin.clone(),
                        format!("file(GLOB) invalid globbing expression: {e}"),
                        pattern,
                    );
                    continue;
                }
            };
            for entry in walker.filter_map(Result::ok) {
                // GLOB lists directories; GLOB_RECURSE lists files only.
                if recurse && entry.file_type().is_dir() {
                    continue;
                }
                matches.push(paths::normalize(&entry.path().display().to_string()));
            }
        }

        matches.sort();
        matches.dedup();
        if let Some(rel_base) = relative_base {
            let rel_base = paths::resolve_for_argument(&rel_base, &self.current_source_dir(), false);
            matches = matches
                .iter()
                .map(|m| paths::make_relative(m, &rel_base).unwrap_or_else(|| m.clone()))
                .collect();
        }
        self.var_set(out_var, join_list(&matches));
        Ok(())
    }

    fn file_rename(&mut self, inv: &Invocation) -> Result<(), Error> {
        let (Some(old_tok), Some(new_tok)) = (inv.args.get(1).cloned(), inv.args.get(2).cloned())
        else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(RENAME) requires old and new names",
                "Usage: file(RENAME <oldname> <newname>)",
            );
            return Ok(());
        };
        let Some(old_path) = self.resolve_and_validate_path(
            &old_tok.text,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Source,
        ) else {
            return Ok(());
        };
        let Some(new_path) = self.resolve_and_validate_path(
            &new_tok.text,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Source,
        ) else {
            return Ok(());
        };
        if let Err(err) = std::fs::rename(&old_path, &new_path) {
            self.io_error(inv, &old_path, &err);
        }
        Ok(())
    }

    fn file_size(&mut self, inv: &Invocation) -> Result<(), Error> {
        let (Some(path_tok), Some(out_var)) = (inv.args.get(1).cloned(), inv.args.get(2)) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(SIZE) requires a path and an output variable",
                "Usage: file(SIZE <path> <out>)",
            );
            return Ok(());
        };
        let out_var = out_var.text.clone();
        let Some(path) = self.resolve_and_validate_path(
            &path_tok.text,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Source,
        ) else {
            return Ok(());
        };
        match std::fs::metadata(&path) {
            Ok(meta) => self.var_set(out_var, meta.len().to_string()),
            Err(err) => self.io_error(inv, &path, &err),
        }
        Ok(())
    }

    fn file_timestamp(&mut self, inv: &Invocation) -> Result<(), Error> {
        let (Some(path_tok), Some(out_var)) = (inv.args.get(1).cloned(), inv.args.get(2)) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(TIMESTAMP) requires a path and an output variable",
                "Usage: file(TIMESTAMP <path> <out> [<format>] [UTC])",
            );
            return Ok(());
        };
        let out_var = out_var.text.clone();
        let format = inv
            .args
            .get(3)
            .filter(|t| !t.eq_keyword("UTC"))
            .map_or("%Y-%m-%dT%H:%M:%S", |t| t.text.as_str())
            .to_string();
        let Some(path) = self.resolve_and_validate_path(
            &path_tok.text,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Source,
        ) else {
            return Ok(());
        };
        // Unreadable timestamps produce the empty string, not an error.
        let value = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(|mtime| {
                let dt: chrono::DateTime<chrono::Utc> = mtime.into();
                dt.format(&format).to_string()
            })
            .unwrap_or_default();
        self.var_set(out_var, value);
        Ok(())
    }

    fn file_hash(&mut self, inv: &Invocation, algorithm: &str) -> Result<(), Error> {
        let (Some(path_tok), Some(out_var)) = (inv.args.get(1).cloned(), inv.args.get(2)) else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(<HASH>) requires a path and an output variable",
                "Usage: file(SHA256 <path> <out>)",
            );
            return Ok(());
        };
        let out_var = out_var.text.clone();
        let Some(path) = self.resolve_and_validate_path(
            &path_tok.text,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Source,
        ) else {
            return Ok(());
        };
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(err) => {
                self.io_error(inv, &path, &err);
                return Ok(());
            }
        };
        let digest = match algorithm {
            "SHA224" => hex::encode(sha2::Sha224::digest(&bytes)),
            "SHA256" => hex::encode(sha2::Sha256::digest(&bytes)),
            "SHA384" => hex::encode(sha2::Sha384::digest(&bytes)),
            "SHA512" => hex::encode(sha2::Sha512::digest(&bytes)),
            "BLAKE3" => blake3::hash(&bytes).to_hex().to_string(),
            _ => unreachable!("hash dispatch covers the supported set"),
        };
        self.var_set(out_var, digest);
        Ok(())
    }

    fn file_generate(&mut self, inv: &Invocation) -> Result<(), Error> {
        let mut output: Option<String> = None;
        let mut content: Option<String> = None;
        let mut input: Option<String> = None;
        let mut i = 1usize;
        while i < inv.args.len() {
            let tok = &inv.args[i];
            if tok.eq_keyword("OUTPUT") {
                output = inv.args.get(i + 1).map(|t| t.text.clone());
                i += 2;
            } else if tok.eq_keyword("CONTENT") {
                content = inv.args.get(i + 1).map(|t| t.text.clone());
                i += 2;
            } else if tok.eq_keyword("INPUT") {
                input = inv.args.get(i + 1).map(|t| t.text.clone());
                i += 2;
            } else {
                i += 1;
            }
        }

        let Some(output) = output else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(GENERATE) requires OUTPUT",
                "Usage: file(GENERATE OUTPUT <file> CONTENT <content>|INPUT <file>)",
            );
            return Ok(());
        };
        let content = if let Some(content) = content {
            content
        } else if let Some(input) = input {
            let Some(input_path) = self.resolve_and_validate_path(
                &input,
                &inv.name,
                &inv.origin.clone(),
                PathIntent::Source,
            ) else {
                return Ok(());
            };
            match std::fs::read_to_string(&input_path) {
                Ok(c) => c,
                Err(err) => {
                    self.io_error(inv, &input_path, &err);
                    return Ok(());
                }
            }
        } else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(GENERATE) requires CONTENT or INPUT",
                "Usage: file(GENERATE OUTPUT <file> CONTENT <content>|INPUT <file>)",
            );
            return Ok(());
        };

        // With no generator downstream, genex in the content resolves
        // eagerly against the active configuration.
        let content = self.genex_eval_eager(&content, &inv.origin, &inv.name);

        let Some(out_path) = self.resolve_and_validate_path(
            &output,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Binary,
        ) else {
            return Ok(());
        };
        if let Some(parent) = std::path::Path::new(&out_path).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(err) = std::fs::write(&out_path, content.as_bytes()) {
            self.io_error(inv, &out_path, &err);
        }
        Ok(())
    }

    fn file_lock(&mut self, inv: &Invocation) -> Result<(), Error> {
        let Some(path_tok) = inv.args.get(1).cloned() else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(LOCK) requires a path",
                "Usage: file(LOCK <path> [RELEASE] [RESULT_VARIABLE <out>])",
            );
            return Ok(());
        };
        let release = inv.args.iter().any(|t| t.eq_keyword("RELEASE"));
        let result_var = inv
            .args
            .iter()
            .position(|t| t.eq_keyword("RESULT_VARIABLE"))
            .and_then(|i| inv.args.get(i + 1))
            .map(|t| t.text.clone());

        let Some(path) = self.resolve_and_validate_path(
            &path_tok.text,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Binary,
        ) else {
            return Ok(());
        };
        // Single-process evaluator: the lock file existing is the lock.
        let outcome = if release {
            Ok(())
        } else {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map(|_| ())
        };
        match outcome {
            Ok(()) => {
                if let Some(var) = result_var {
                    self.var_set(var, "0".to_string());
                }
            }
            Err(err) => {
                if let Some(var) = result_var {
                    self.var_set(var, err.to_string());
                } else {
                    self.io_error(inv, &path, &err);
                }
            }
        }
        Ok(())
    }

    fn file_archive_create(&mut self, inv: &Invocation) -> Result<(), Error> {
        let mut output: Option<String> = None;
        let mut archive_paths: Vec<String> = Vec::new();
        let mut compression: Option<String> = None;
        let mut i = 1usize;
        while i < inv.args.len() {
            let tok = &inv.args[i];
            if tok.eq_keyword("OUTPUT") {
                output = inv.args.get(i + 1).map(|t| t.text.clone());
                i += 2;
            } else if tok.eq_keyword("PATHS") {
                i += 1;
                while i < inv.args.len()
                    && !inv.args[i].eq_keyword("OUTPUT")
                    && !inv.args[i].eq_keyword("FORMAT")
                    && !inv.args[i].eq_keyword("COMPRESSION")
                {
                    archive_paths.push(inv.args[i].text.clone());
                    i += 1;
                }
            } else if tok.eq_keyword("FORMAT") || tok.eq_keyword("COMPRESSION") {
                if tok.eq_keyword("COMPRESSION") {
                    compression = inv.args.get(i + 1).map(|t| t.text.clone());
                }
                i += 2;
            } else {
                i += 1;
            }
        }

        let Some(output) = output else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(ARCHIVE_CREATE) requires OUTPUT",
                "Usage: file(ARCHIVE_CREATE OUTPUT <archive> PATHS <paths>...)",
            );
            return Ok(());
        };
        if archive_paths.is_empty() {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(ARCHIVE_CREATE) requires PATHS",
                "Usage: file(ARCHIVE_CREATE OUTPUT <archive> PATHS <paths>...)",
            );
            return Ok(());
        }
        let gzip = match compression.as_deref() {
            None | Some("None") => compression.as_deref() != Some("None")
                && std::path::Path::new(&output)
                    .extension()
                    .is_some_and(|e| e == "gz" || e == "tgz"),
            Some(c) if c.eq_ignore_ascii_case("GZip") => true,
            Some(other) => {
                self.unsupported_path(
                    "file",
                    inv,
                    format!("file(ARCHIVE_CREATE) compression '{other}' is not available"),
                );
                return Ok(());
            }
        };

        let Some(out_path) = self.resolve_and_validate_path(
            &output,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Binary,
        ) else {
            return Ok(());
        };
        let mut sources = Vec::new();
        for raw in archive_paths {
            let Some(resolved) = self.resolve_and_validate_path(
                &raw,
                &inv.name,
                &inv.origin.clone(),
                PathIntent::Source,
            ) else {
                return Ok(());
            };
            sources.push(resolved);
        }

        if let Err(err) = write_archive(&out_path, &sources, gzip) {
            self.io_error(inv, &out_path, &err);
        }
        Ok(())
    }

    fn file_archive_extract(&mut self, inv: &Invocation) -> Result<(), Error> {
        let mut input: Option<String> = None;
        let mut destination: Option<String> = None;
        let mut i = 1usize;
        while i < inv.args.len() {
            let tok = &inv.args[i];
            if tok.eq_keyword("INPUT") {
                input = inv.args.get(i + 1).map(|t| t.text.clone());
                i += 2;
            } else if tok.eq_keyword("DESTINATION") {
                destination = inv.args.get(i + 1).map(|t| t.text.clone());
                i += 2;
            } else {
                i += 1;
            }
        }

        let Some(input) = input else {
            self.input_error(
                &inv.name,
                inv.origin.clone(),
                "file(ARCHIVE_EXTRACT) requires INPUT",
                "Usage: file(ARCHIVE_EXTRACT INPUT <archive> [DESTINATION <dir>])",
            );
            return Ok(());
        };
        let Some(archive_path) = self.resolve_and_validate_path(
            &input,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Source,
        ) else {
            return Ok(());
        };
        let dest_raw = destination.unwrap_or_else(|| self.current_binary_dir());
        let Some(dest) = self.resolve_and_validate_path(
            &dest_raw,
            &inv.name,
            &inv.origin.clone(),
            PathIntent::Binary,
        ) else {
            return Ok(());
        };

        if let Err(err) = extract_archive(&archive_path, &dest) {
            self.io_error(inv, &archive_path, &err);
        }
        Ok(())
    }
}

fn copy_dir_recursive(src: &str, dest: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let src_child = paths::join(src, &name.to_string_lossy());
        let dest_child = paths::join(dest, &name.to_string_lossy());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&src_child, &dest_child)?;
        } else {
            std::fs::copy(&src_child, &dest_child)?;
        }
    }
    Ok(())
}

/// Write a (possibly gzipped) tar archive. Entry names are relative to
/// each source path's parent so extraction recreates the leaf names.
fn write_archive(out_path: &str, sources: &[String], gzip: bool) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = std::path::Path::new(out_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(out_path)?;

    let append_all = |builder: &mut tar::Builder<Box<dyn std::io::Write>>| -> std::io::Result<()> {
        for source in sources {
            let name = paths::filename(source).to_string();
            let p = std::path::Path::new(source);
            if p.is_dir() {
                builder.append_dir_all(&name, p)?;
            } else {
                builder.append_path_with_name(p, &name)?;
            }
        }
        builder.finish()
    };

    let writer: Box<dyn std::io::Write> = if gzip {
        Box::new(flate2::write::GzEncoder::new(
            file,
            flate2::Compression::default(),
        ))
    } else {
        Box::new(file)
    };
    let mut builder = tar::Builder::new(writer);
    append_all(&mut builder)?;
    builder.into_inner()?.flush()
}

/// Extract a tar archive, transparently handling gzip by magic bytes.
fn extract_archive(archive_path: &str, dest: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    let mut file = std::fs::File::open(archive_path)?;
    let mut magic = [0u8; 2];
    let n = file.read(&mut magic)?;
    drop(file);

    let file = std::fs::File::open(archive_path)?;
    if n == 2 && magic == [0x1f, 0x8b] {
        let decoder = flate2::read::GzDecoder::new(file);
        tar::Archive::new(decoder).unpack(dest)
    } else {
        tar::Archive::new(file).unpack(dest)
    }
}
