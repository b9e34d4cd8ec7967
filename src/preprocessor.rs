//! Textual `include` expansion, run before scanning.
//!
//! Only the leading block of a file is examined.  Every non-blank line of that
//! block must have the form
//!
//! ```text
//! include "relative/or/absolute/path.lox"
//! include <library_name>
//! ```
//!
//! and the first line that is neither blank nor a directive ends the block.
//! Each directive is replaced by the text it names, whose own leading
//! includes are expanded first.  [`Resolved::line_delta`] is the number of
//! lines this added in front of the user's own code, and
//! [`Resolved::origins`] maps every expanded line back to where it was written.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{LoxError, Result};

/// Libraries compiled into the binary, reachable as `include <name>`.
const BUNDLED: &[(&str, &str)] = &[("hello_world", include_str!("stdlib/hello_world.lox"))];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub source: String,
    pub line_delta: usize,
    /// One entry per line of `source`.
    pub origins: Vec<SourceLine>,
}

/// Where an expanded line came from.  `file` is `None` for the file being
/// run and names the include otherwise; `line` is 0-based within that file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub file: Option<PathBuf>,
    pub line: usize,
}

impl SourceLine {
    fn own(line: usize) -> Self {
        Self { file: None, line }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive<'s> {
    /// `include "path"` or `include 'path'`
    Path(&'s str),
    /// `include <name>`
    Library(&'s str),
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    base_dir: PathBuf,
    include_dir: Option<PathBuf>,
}

impl Preprocessor {
    /// Quoted paths are resolved against `base_dir`, normally the directory
    /// of the file being run.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            include_dir: None,
        }
    }

    /// Look for `<name>` libraries in `dir` before the bundled ones.
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dir = Some(dir.into());
        self
    }

    pub fn resolve(&self, source: &str) -> Result<Resolved> {
        let mut chain: Vec<PathBuf> = Vec::new();
        let resolved = self.expand(source, &self.base_dir, &mut chain)?;

        info!("Preprocessor added {} lines", resolved.line_delta);

        Ok(resolved)
    }

    /// `chain` holds the files currently being expanded, to catch cycles.
    fn expand(&self, source: &str, base_dir: &Path, chain: &mut Vec<PathBuf>) -> Result<Resolved> {
        let mut out = String::with_capacity(source.len());
        let mut line_delta: usize = 0;
        let mut origins: Vec<SourceLine> = Vec::new();
        let mut own_line: usize = 0;
        let mut rest: &str = source;

        while !rest.is_empty() {
            let (line, tail) = match rest.find('\n') {
                Some(pos) => rest.split_at(pos + 1),
                None => (rest, ""),
            };

            if line.trim().is_empty() {
                out.push_str(line);
                origins.push(SourceLine::own(own_line));
                own_line += 1;
                rest = tail;
                continue;
            }

            let Some(directive) = parse_directive(line) else {
                break;
            };

            let (path, text): (PathBuf, String) = match directive {
                Directive::Path(raw) => {
                    let path: PathBuf = base_dir.join(raw);
                    let text = fs::read_to_string(&path)
                        .map_err(|e| LoxError::include(&path, e.to_string()))?;
                    (path, text)
                }
                Directive::Library(name) => self.find_library(name)?,
            };
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let included: Resolved = self.expand_file(&path, &text, &dir, chain)?;

            debug!("Included {:?}", directive);

            out.push_str(&included.source);
            if !included.source.ends_with('\n') {
                out.push('\n');
            }

            // The directive occupied one line; its replacement at least one.
            line_delta += line_count(&included.source).max(1) - 1;

            if included.origins.is_empty() {
                origins.push(SourceLine::own(own_line));
            }
            origins.extend(included.origins.into_iter().map(|origin| SourceLine {
                file: origin.file.or_else(|| Some(path.clone())),
                line: origin.line,
            }));

            own_line += 1;
            rest = tail;
        }

        out.push_str(rest);
        origins.extend((0..line_count(rest)).map(|i| SourceLine::own(own_line + i)));

        Ok(Resolved {
            source: out,
            line_delta,
            origins,
        })
    }

    fn expand_file(
        &self,
        path: &Path,
        text: &str,
        dir: &Path,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Resolved> {
        if chain.iter().any(|seen| seen == path) {
            return Err(LoxError::include(path, "Circular include."));
        }

        chain.push(path.to_path_buf());
        let result = self.expand(text, dir, chain);
        chain.pop();

        result
    }

    fn find_library(&self, name: &str) -> Result<(PathBuf, String)> {
        if let Some(dir) = &self.include_dir {
            let path = dir.join(format!("{}.lox", name));
            if path.is_file() {
                let text = fs::read_to_string(&path)
                    .map_err(|e| LoxError::include(&path, e.to_string()))?;
                return Ok((path, text));
            }
        }

        BUNDLED
            .iter()
            .find(|(bundled, _)| *bundled == name)
            .map(|(bundled, text)| (PathBuf::from(format!("<{}>", bundled)), text.to_string()))
            .ok_or_else(|| LoxError::include(format!("<{}>", name), "Unknown library."))
    }
}

/// Lines the text will occupy once terminated by a newline.
fn line_count(text: &str) -> usize {
    let newlines = text.matches('\n').count();

    if text.is_empty() || text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let rest: &str = line.trim().strip_prefix("include")?;

    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let target: &str = rest.trim_start();
    let mut chars = target.chars();
    let (open, close) = (chars.next()?, chars.next_back()?);
    let inner: &str = &target[open.len_utf8()..target.len() - close.len_utf8()];

    if inner.is_empty() {
        return None;
    }

    match (open, close) {
        ('"', '"') | ('\'', '\'') => Some(Directive::Path(inner)),
        ('<', '>') => Some(Directive::Library(inner)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lox-pre-{}-{}", std::process::id(), tag));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn recognises_each_directive_form() {
        assert_eq!(
            parse_directive("include \"lib/a.lox\"\n"),
            Some(Directive::Path("lib/a.lox"))
        );
        assert_eq!(
            parse_directive("include 'a.lox'"),
            Some(Directive::Path("a.lox"))
        );
        assert_eq!(
            parse_directive("include <hello_world>"),
            Some(Directive::Library("hello_world"))
        );
        assert_eq!(parse_directive("include\"a.lox\""), None);
        assert_eq!(parse_directive("include <a\""), None);
        assert_eq!(parse_directive("print 1;"), None);
    }

    #[test]
    fn source_without_includes_is_untouched() {
        let source = "print 1;\ninclude <hello_world>\n";

        let resolved = Preprocessor::default().resolve(source).unwrap();

        assert_eq!(resolved.source, source);
        assert_eq!(resolved.line_delta, 0);
    }

    #[test]
    fn bundled_library_is_spliced_in() {
        let resolved = Preprocessor::default()
            .resolve("include <hello_world>\nhello_world();\n")
            .unwrap();

        assert!(resolved.source.starts_with("fun hello_world()"));
        assert!(resolved.source.ends_with("hello_world();\n"));
        assert_eq!(resolved.line_delta, 2);
    }

    #[test]
    fn quoted_paths_resolve_relative_to_the_base_dir() {
        let dir = scratch_dir("relative");
        fs::write(dir.join("two.lox"), "var b = 2;\n").unwrap();
        fs::write(dir.join("one.lox"), "include \"two.lox\"\nvar a = 1;\n").unwrap();

        let resolved = Preprocessor::new(&dir)
            .resolve("\ninclude 'one.lox'\n\nprint a + b;\n")
            .unwrap();

        assert_eq!(resolved.source, "\nvar b = 2;\nvar a = 1;\n\nprint a + b;\n");
        assert_eq!(resolved.line_delta, 1);
    }

    #[test]
    fn missing_file_is_an_include_error() {
        let dir = scratch_dir("missing");

        let err = Preprocessor::new(&dir)
            .resolve("include \"nope.lox\"\n")
            .unwrap_err();

        assert!(matches!(err, LoxError::Include { .. }));
    }

    #[test]
    fn unknown_library_is_an_include_error() {
        let err = Preprocessor::default()
            .resolve("include <no_such_lib>\n")
            .unwrap_err();

        assert_eq!(err.to_string(), "Include error: Unknown library. (<no_such_lib>)");
    }

    #[test]
    fn include_dir_shadows_bundled_libraries() {
        let dir = scratch_dir("libs");
        fs::write(dir.join("hello_world.lox"), "var shadowed = true;\n").unwrap();

        let resolved = Preprocessor::default()
            .with_include_dir(&dir)
            .resolve("include <hello_world>\n")
            .unwrap();

        assert_eq!(resolved.source, "var shadowed = true;\n");
        assert_eq!(resolved.line_delta, 0);
    }

    #[test]
    fn origins_trace_lines_back_to_their_file() {
        let dir = scratch_dir("origins");
        fs::write(dir.join("inner.lox"), "var x = 1;\n").unwrap();
        fs::write(dir.join("outer.lox"), "include \"inner.lox\"\nvar y = 2;\n").unwrap();

        let resolved = Preprocessor::new(&dir)
            .resolve("\ninclude \"outer.lox\"\nprint x + y;")
            .unwrap();

        let files: Vec<Option<PathBuf>> = resolved.origins.iter().map(|o| o.file.clone()).collect();
        let lines: Vec<usize> = resolved.origins.iter().map(|o| o.line).collect();

        assert_eq!(
            files,
            vec![None, Some(dir.join("inner.lox")), Some(dir.join("outer.lox")), None]
        );
        assert_eq!(lines, vec![0, 0, 1, 2]);
    }

    #[test]
    fn self_inclusion_is_rejected() {
        let dir = scratch_dir("cycle");
        fs::write(dir.join("loop.lox"), "include \"loop.lox\"\n").unwrap();

        let err = Preprocessor::new(&dir)
            .resolve("include \"loop.lox\"\n")
            .unwrap_err();

        assert_eq!(err.message(), Some("Circular include."));
    }
}
