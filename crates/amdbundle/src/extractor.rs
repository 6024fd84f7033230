//! AMD dependency extraction
//!
//! Finds `define(...)` and `require(...)` call sites in script text and reads
//! the string literals of their dependency arrays. Comments and the insides of
//! string literals are masked out first so call sites inside them are ignored.
//! The masked copy keeps every byte offset of the original text.

use indexmap::IndexSet;
use log::trace;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::require_config::Configuration;

static CALL_SITE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(define|require)\s*\(").expect("call site pattern is a valid regex")
});

/// Ids the loader provides itself
const RESERVED_DEPENDENCIES: [&str; 3] = ["require", "exports", "module"];

/// Result of running an extractor over one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedScript {
    pub processed_text: String,
    /// Dependency ids in first-seen order, without duplicates
    pub dependencies: Vec<String>,
}

/// Turns script text into its rewritten form plus the module ids it depends on
pub trait DependencyExtractor: std::fmt::Debug {
    fn process(
        &self,
        relative_path: &str,
        text: &str,
        configuration: &Configuration,
    ) -> anyhow::Result<ProcessedScript>;
}

/// Extractor for AMD modules.
///
/// An anonymous first `define(` gets the module id inserted as its name so the
/// module still registers correctly once concatenated into a bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmdExtractor;

impl DependencyExtractor for AmdExtractor {
    fn process(
        &self,
        relative_path: &str,
        text: &str,
        configuration: &Configuration,
    ) -> anyhow::Result<ProcessedScript> {
        let scan = scan_calls(text);

        let processed_text = match scan.anonymous_define_at {
            Some(at) => {
                let id = module_id(relative_path, configuration);
                trace!("Naming anonymous define in {relative_path} as '{id}'");
                format!("{}'{}', {}", &text[..at], id, &text[at..])
            }
            None => text.to_owned(),
        };

        let dependencies = scan
            .dependencies
            .into_iter()
            .filter(|dep| is_file_dependency(dep))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();

        Ok(ProcessedScript {
            processed_text,
            dependencies,
        })
    }
}

fn is_file_dependency(id: &str) -> bool {
    if id.is_empty() || RESERVED_DEPENDENCIES.contains(&id) {
        return false;
    }
    if id.contains('!') {
        trace!("Skipping loader plugin dependency '{id}'");
        return false;
    }
    true
}

/// Module id for a file, preferring a `paths` alias over the raw path
fn module_id(relative_path: &str, configuration: &Configuration) -> String {
    let mut best: Option<(&str, &str)> = None;
    for (alias, target) in &configuration.paths {
        let target = target.trim_end_matches('/');
        let matches = relative_path == target
            || (relative_path.starts_with(target)
                && relative_path[target.len()..].starts_with('/'));
        if matches && best.is_none_or(|(_, current)| target.len() > current.len()) {
            best = Some((alias.as_str(), target));
        }
    }

    match best {
        Some((alias, target)) => format!("{alias}{}", &relative_path[target.len()..]),
        None => relative_path.to_owned(),
    }
}

#[derive(Debug, Default)]
struct ScanResult {
    dependencies: Vec<String>,
    /// Byte offset just past the `(` of the first `define`, when it has no name
    anonymous_define_at: Option<usize>,
}

fn scan_calls(text: &str) -> ScanResult {
    let masked = mask_source(text);
    let mut parser = CallParser {
        source: text.as_bytes(),
        masked: &masked,
        pos: 0,
    };
    let mut result = ScanResult::default();
    let mut seen_define = false;

    for captures in CALL_SITE.captures_iter(&masked) {
        let (Some(call), Some(keyword)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if is_member_access(&masked, call.start()) {
            continue;
        }

        parser.pos = call.end();
        parser.skip_whitespace();

        if keyword.as_bytes() == b"define" {
            let named = parser.at_string();
            if named {
                parser.string();
                parser.skip_whitespace();
                parser.eat(b',');
                parser.skip_whitespace();
            }
            if !seen_define {
                seen_define = true;
                if !named {
                    result.anonymous_define_at = Some(call.end());
                }
            }
            if parser.peek() == Some(b'[') {
                result.dependencies.extend(parser.string_array());
            }
        } else if parser.peek() == Some(b'[') {
            result.dependencies.extend(parser.string_array());
        } else if parser.at_string() {
            // CommonJS sugar: require("id")
            if let Some(id) = parser.string() {
                parser.skip_whitespace();
                if parser.peek() == Some(b')') {
                    result.dependencies.push(id);
                }
            }
        }
    }

    result
}

/// `x.define(` and `x.require(` are ordinary method calls
fn is_member_access(masked: &[u8], start: usize) -> bool {
    masked[..start]
        .iter()
        .rev()
        .find(|byte| !byte.is_ascii_whitespace())
        .is_some_and(|&byte| byte == b'.')
}

/// Copy of `text` with comments and string contents blanked to spaces.
///
/// Quotes and newlines survive so offsets and line structure line up with the
/// original.
fn mask_source(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut masked = bytes.to_vec();
    let len = bytes.len();
    let mut i = 0;

    let blank = |masked: &mut Vec<u8>, i: usize| {
        if bytes[i] != b'\n' {
            masked[i] = b' ';
        }
    };

    while i < len {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < len && bytes[i] != b'\n' {
                    blank(&mut masked, i);
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                blank(&mut masked, i);
                blank(&mut masked, i + 1);
                i += 2;
                while i < len {
                    let closes = bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/');
                    blank(&mut masked, i);
                    i += 1;
                    if closes {
                        blank(&mut masked, i);
                        i += 1;
                        break;
                    }
                }
            }
            b'/' if regex_allowed(&masked, i) => {
                i += 1;
                let mut in_class = false;
                while i < len && bytes[i] != b'\n' {
                    match bytes[i] {
                        b'\\' if i + 1 < len => {
                            blank(&mut masked, i);
                            i += 1;
                        }
                        b'[' => in_class = true,
                        b']' => in_class = false,
                        b'/' if !in_class => break,
                        _ => {}
                    }
                    blank(&mut masked, i);
                    i += 1;
                }
                i += 1;
            }
            quote @ (b'"' | b'\'' | b'`') => {
                i += 1;
                while i < len && bytes[i] != quote {
                    if bytes[i] == b'\\' && i + 1 < len {
                        blank(&mut masked, i);
                        i += 1;
                    }
                    blank(&mut masked, i);
                    i += 1;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    masked
}

/// Keywords after which a `/` starts a regular expression
const REGEX_PREFIX_KEYWORDS: &[&[u8]] = &[
    b"return", b"typeof", b"case", b"do", b"else", b"in", b"instanceof", b"new", b"delete",
    b"void", b"throw", b"yield", b"await",
];

/// Whether the `/` at `at` opens a regex literal rather than dividing, judged
/// by the last significant byte before it
fn regex_allowed(masked: &[u8], at: usize) -> bool {
    let Some(end) = masked[..at]
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
    else {
        return true;
    };

    let previous = masked[end];
    if is_identifier_byte(previous) {
        let start = masked[..end]
            .iter()
            .rposition(|&byte| !is_identifier_byte(byte))
            .map_or(0, |position| position + 1);
        return REGEX_PREFIX_KEYWORDS.contains(&&masked[start..=end]);
    }

    matches!(
        previous,
        b'(' | b',' | b'=' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b'}' | b';'
            | b'+' | b'-' | b'*' | b'%' | b'<' | b'>' | b'~' | b'^'
    )
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

/// Cursor over a call's argument list.
///
/// Structure is read from the masked bytes, literal values from the source.
struct CallParser<'a> {
    source: &'a [u8],
    masked: &'a [u8],
    pos: usize,
}

impl CallParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.masked.get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn at_string(&self) -> bool {
        matches!(self.peek(), Some(b'"' | b'\'' | b'`'))
    }

    /// Read the string literal at the cursor
    fn string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        let start = self.pos + 1;
        let mut end = start;
        while end < self.source.len() && self.source[end] != quote {
            end += if self.source[end] == b'\\' { 2 } else { 1 };
        }
        if end >= self.source.len() {
            return None;
        }
        self.pos = end + 1;
        Some(String::from_utf8_lossy(&self.source[start..end]).into_owned())
    }

    /// Read the string elements of the array literal at the cursor
    fn string_array(&mut self) -> Vec<String> {
        let mut values = Vec::new();
        self.pos += 1;
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(b',') => self.pos += 1,
                Some(b'"' | b'\'' | b'`') => match self.string() {
                    Some(value) => values.push(value),
                    None => break,
                },
                Some(_) => {
                    while self.peek().is_some_and(|byte| byte != b',' && byte != b']') {
                        self.pos += 1;
                    }
                }
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn process(relative_path: &str, text: &str) -> ProcessedScript {
        AmdExtractor
            .process(relative_path, text, &Configuration::default())
            .expect("extraction should not fail")
    }

    #[test]
    fn test_anonymous_define_gets_named() {
        let result = process(
            "app/main",
            "define(['jquery', './util'], function ($, util) {\n  return {};\n});\n",
        );
        assert_eq!(result.dependencies, vec!["jquery", "./util"]);
        assert_eq!(
            result.processed_text,
            "define('app/main', ['jquery', './util'], function ($, util) {\n  return {};\n});\n"
        );
    }

    #[test]
    fn test_named_define_is_left_alone() {
        let text = "define(\"app/main\", [\"knockout\"], function (ko) {});";
        let result = process("app/main", text);
        assert_eq!(result.dependencies, vec!["knockout"]);
        assert_eq!(result.processed_text, text);
    }

    #[test]
    fn test_reserved_and_plugin_ids_are_dropped() {
        let result = process(
            "app/view",
            "define(['require', 'exports', 'module', 'text!tpl/view.html', 'app/model'], f);",
        );
        assert_eq!(result.dependencies, vec!["app/model"]);
    }

    #[test]
    fn test_comments_and_strings_are_ignored() {
        let text = r#"
// define(['commented/out'], f);
/* require(['also/commented']) */
var s = "define(['in/string'])";
define(['real/dep'], function () {
    require(['lazy/dep'], function () {});
    var helper = require('sugar/dep');
    obj.require(['method/call']);
});
"#;
        let result = process("app/main", text);
        assert_eq!(result.dependencies, vec!["real/dep", "lazy/dep", "sugar/dep"]);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let result = process(
            "app/main",
            "define(['a', 'b'], function () { require(['b', 'c', 'a']); });",
        );
        assert_eq!(result.dependencies, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_define_without_dependencies() {
        let result = process("app/config", "define({ debug: false });");
        assert!(result.dependencies.is_empty());
        assert_eq!(
            result.processed_text,
            "define('app/config', { debug: false });"
        );
    }

    #[test]
    fn test_non_literal_array_elements_are_skipped() {
        let result = process("app/main", "define([base + '/x', 'y', other], f);");
        assert_eq!(result.dependencies, vec!["y"]);
    }

    #[test]
    fn test_module_id_uses_paths_alias() {
        let mut configuration = Configuration::default();
        configuration
            .paths
            .insert("jquery".to_owned(), "lib/jquery-3.7.1".to_owned());
        configuration
            .paths
            .insert("app".to_owned(), "Controllers/app/".to_owned());

        assert_eq!(module_id("lib/jquery-3.7.1", &configuration), "jquery");
        assert_eq!(module_id("Controllers/app/main", &configuration), "app/main");
        assert_eq!(
            module_id("Controllers/application", &configuration),
            "Controllers/application"
        );
    }

    #[test]
    fn test_quote_inside_regex_literal() {
        let text = "var re = /'/g;\ndefine(['dep'], function () {});\nvar t = 'x';\n";
        let result = process("app/main", text);
        assert_eq!(result.dependencies, vec!["dep"]);
        assert_eq!(
            result.processed_text,
            "var re = /'/g;\ndefine('app/main', ['dep'], function () {});\nvar t = 'x';\n"
        );
    }

    #[test]
    fn test_division_is_not_a_regex() {
        let text = "var half = width / 2, slash = '/';\ndefine(['x'], function () {});\n";
        let result = process("app/main", text);
        assert_eq!(result.dependencies, vec!["x"]);
    }

    #[test]
    fn test_regex_after_return_and_in_class() {
        let masked = mask_source("return /'[/]'/;");
        assert_eq!(
            String::from_utf8(masked).expect("masked text is ascii here"),
            "return /     /;"
        );
        assert!(regex_allowed(b"x = ", 4));
        assert!(!regex_allowed(b"total ", 6));
        assert!(!regex_allowed(b"f(a) ", 5));
    }

    #[test]
    fn test_mask_preserves_offsets() {
        let text = "a /* ü */ 'x\\'y' // z\nb";
        let masked = mask_source(text);
        assert_eq!(masked.len(), text.len());
        assert_eq!(
            String::from_utf8(masked).expect("masked text is ascii here"),
            "a          '    '     \nb"
        );
    }
}
