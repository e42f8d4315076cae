//! Top-level module scanner.
//!
//! Walks JavaScript/TypeScript source with a byte cursor, skipping comments,
//! strings, template literals, and regex literals, and collects the two
//! things the transform needs: top-level static import declarations (with
//! the byte span of each specifier, for in-place rewriting) and exported
//! binding names (for classification).
//!
//! Scanning is lenient about code it merely passes over, but strict inside
//! the declarations it must understand: an unterminated specifier string,
//! an unfinished import clause, or an unterminated export list is a scan
//! error, reported with a line number so the caller can name the file.

use std::fmt;
use std::ops::Range;

/// A top-level static import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Specifier text as written, without quotes.
    pub specifier: String,
    /// Byte range of the specifier contents (inside the quotes).
    pub span: Range<usize>,
    /// Quote character used in the source (`'` or `"`).
    pub quote: char,
}

/// Scan result for one module.
#[derive(Debug, Default, Clone)]
pub struct ModuleSummary {
    /// Static imports in source order.
    pub imports: Vec<ImportDecl>,
    /// Exported binding names in source order (re-exports, `default`, and
    /// `export *` excluded).
    pub exports: Vec<String>,
}

/// Error produced when a declaration cannot be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub message: String,
    /// 1-indexed line of the failure.
    pub line: u32,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScanError {}

/// Scan a module's source text.
pub fn scan_module(source: &str) -> Result<ModuleSummary, ScanError> {
    Scanner::new(source).scan()
}

/// Keywords after which a `/` starts a regex literal, not division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "case",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "instanceof",
    "do",
    "else",
    "yield",
    "await",
];

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    /// Brace depth outside strings/comments; declarations are collected at
    /// depth 0 only.
    depth: i32,
    /// Last significant byte consumed (0 at start of input).
    prev: u8,
    /// Last identifier/keyword consumed, when it was the previous token.
    prev_word: Option<&'a str>,
    out: ModuleSummary,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            depth: 0,
            prev: 0,
            prev_word: None,
            out: ModuleSummary::default(),
        }
    }

    fn scan(mut self) -> Result<ModuleSummary, ScanError> {
        while let Some(b) = self.peek() {
            match b {
                b'/' => self.slash()?,
                b'\'' | b'"' => {
                    self.skip_string_lenient(b);
                    self.note(b'"');
                }
                b'`' => {
                    self.skip_template()?;
                    self.note(b'"');
                }
                b'{' => {
                    self.depth += 1;
                    self.pos += 1;
                    self.note(b'{');
                }
                b'}' => {
                    self.depth -= 1;
                    self.pos += 1;
                    self.note(b'}');
                }
                _ if is_ident_start(b) => {
                    let word = self.read_word();
                    let property = self.prev == b'.';
                    self.prev = b'a';
                    if !property && self.depth == 0 {
                        match word {
                            "import" => {
                                self.prev_word = None;
                                self.scan_import()?;
                                continue;
                            }
                            "export" => {
                                self.prev_word = None;
                                self.scan_export()?;
                                continue;
                            }
                            _ => {}
                        }
                    }
                    self.prev_word = Some(word);
                }
                _ => {
                    if !b.is_ascii_whitespace() {
                        self.note(b);
                    }
                    self.pos += 1;
                }
            }
        }
        Ok(self.out)
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Cursor is just past the `import` keyword.
    fn scan_import(&mut self) -> Result<(), ScanError> {
        self.skip_trivia()?;
        match self.peek() {
            // Dynamic `import(...)` and `import.meta` are not declarations.
            Some(b'(' | b'.') => return Ok(()),
            // Side-effect import: `import './x'`.
            Some(q @ (b'\'' | b'"')) => {
                let decl = self.read_specifier(q)?;
                self.out.imports.push(decl);
                return Ok(());
            }
            Some(_) => {}
            None => return Err(self.error("unterminated import declaration")),
        }

        // Import clause: scan to the `from` keyword, skipping any named
        // binding list (where `from` may legally appear as a binding name).
        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error("unterminated import declaration")),
                Some(b';') => {
                    return Err(self.error("expected 'from' in import declaration"))
                }
                Some(b'{') => {
                    self.pos += 1;
                    loop {
                        self.skip_trivia()?;
                        match self.peek() {
                            None => {
                                return Err(self.error("unterminated import declaration"))
                            }
                            Some(b'}') => {
                                self.pos += 1;
                                break;
                            }
                            Some(_) => self.pos += 1,
                        }
                    }
                }
                Some(b) if is_ident_start(b) => {
                    let word = self.read_word();
                    if word == "from" {
                        self.skip_trivia()?;
                        match self.peek() {
                            Some(q @ (b'\'' | b'"')) => {
                                let decl = self.read_specifier(q)?;
                                self.out.imports.push(decl);
                                return Ok(());
                            }
                            _ => {
                                return Err(
                                    self.error("expected module specifier after 'from'")
                                )
                            }
                        }
                    }
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Cursor is just past the `export` keyword.
    fn scan_export(&mut self) -> Result<(), ScanError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(b'{') => {
                self.pos += 1;
                self.scan_export_list()
            }
            // `export * from ...` is a re-export, not part of the lazy surface.
            Some(b'*') => {
                self.pos += 1;
                Ok(())
            }
            Some(b) if is_ident_start(b) => {
                let word = self.read_word();
                self.scan_export_declaration(word)
            }
            _ => Ok(()),
        }
    }

    /// Cursor is just past the `{` of an export list. Collects exported
    /// names (the alias after `as`, when present), then drops them all if a
    /// trailing `from` marks the list as a re-export.
    fn scan_export_list(&mut self) -> Result<(), ScanError> {
        let mut names: Vec<String> = Vec::new();
        let mut current: Option<String> = None;
        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error("unterminated export clause")),
                Some(b'}') => {
                    self.pos += 1;
                    if let Some(name) = current.take() {
                        names.push(name);
                    }
                    break;
                }
                Some(b',') => {
                    self.pos += 1;
                    if let Some(name) = current.take() {
                        names.push(name);
                    }
                }
                Some(q @ (b'\'' | b'"')) => {
                    // String alias: `export { a as "b" }`.
                    let (text, _, _) = self.read_string_strict(q)?;
                    current = Some(text);
                }
                Some(b) if is_ident_start(b) => {
                    let word = self.read_word().to_string();
                    if word == "as" {
                        // The next token replaces the local name.
                        current = None;
                        continue;
                    }
                    current = Some(word);
                }
                Some(_) => self.pos += 1,
            }
        }

        self.skip_trivia()?;
        if self.peek().is_some_and(is_ident_start) {
            let mark = self.pos;
            let word = self.read_word();
            if word == "from" {
                // Re-export: names come from another module, not this one.
                return Ok(());
            }
            self.pos = mark;
        }
        self.out.exports.extend(names);
        Ok(())
    }

    /// `export <keyword> ...` declaration forms.
    fn scan_export_declaration(&mut self, keyword: &str) -> Result<(), ScanError> {
        match keyword {
            "default" => Ok(()),
            "const" | "let" | "var" => {
                self.skip_trivia()?;
                // Destructuring exports have no single binding name to
                // classify; skip them silently.
                if self.peek().is_some_and(is_ident_start) {
                    let name = self.read_word().to_string();
                    self.out.exports.push(name);
                }
                Ok(())
            }
            "async" => {
                self.skip_trivia()?;
                if self.peek().is_some_and(is_ident_start) {
                    let word = self.read_word();
                    if word == "function" {
                        return self.scan_export_declaration("function");
                    }
                }
                Ok(())
            }
            "function" => {
                self.skip_trivia()?;
                if self.peek() == Some(b'*') {
                    self.pos += 1;
                    self.skip_trivia()?;
                }
                if self.peek().is_some_and(is_ident_start) {
                    let name = self.read_word().to_string();
                    self.out.exports.push(name);
                }
                Ok(())
            }
            "class" => {
                self.skip_trivia()?;
                if self.peek().is_some_and(is_ident_start) {
                    let name = self.read_word().to_string();
                    self.out.exports.push(name);
                }
                Ok(())
            }
            // Typed-dialect surface (stripped before classification) and
            // anything else we do not recognize: not a lazy export.
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Lexing helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn note(&mut self, b: u8) {
        self.prev = b;
        self.prev_word = None;
    }

    fn read_word(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| is_ident_start(b) || b.is_ascii_digit())
        {
            self.pos += 1;
        }
        // Identifier bytes are ASCII here; multibyte identifier characters
        // terminate the word, which is fine for the keywords we match.
        std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("")
    }

    /// Skip whitespace and comments inside a declaration.
    fn skip_trivia(&mut self) -> Result<(), ScanError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                Some(b'/') if self.peek_at(1) == Some(b'*') => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    /// Dispatch a `/`: comment, regex literal, or plain division.
    fn slash(&mut self) -> Result<(), ScanError> {
        match self.peek_at(1) {
            Some(b'/') => {
                self.skip_line_comment();
                Ok(())
            }
            Some(b'*') => self.skip_block_comment(),
            _ => {
                if self.regex_context() {
                    self.skip_regex();
                    self.note(b'"');
                } else {
                    self.pos += 1;
                    self.note(b'/');
                }
                Ok(())
            }
        }
    }

    /// Whether a `/` at the cursor starts a regex literal, judged from the
    /// previous significant token. `<` is deliberately not a regex context:
    /// in markup-bearing modules a `/` after `<` is a closing JSX tag far
    /// more often than a comparison against a regex.
    fn regex_context(&self) -> bool {
        if let Some(word) = self.prev_word {
            return REGEX_PRECEDING_KEYWORDS.contains(&word);
        }
        matches!(
            self.prev,
            0 | b'(' | b'[' | b'{' | b'}' | b',' | b';' | b':' | b'=' | b'!' | b'&' | b'|'
                | b'?' | b'+' | b'-' | b'*' | b'%' | b'^' | b'~' | b'>'
        )
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        self.pos += 2;
        while self.pos + 1 < self.src.len() {
            if self.src[self.pos] == b'*' && self.src[self.pos + 1] == b'/' {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        self.pos = start;
        Err(self.error("unterminated block comment"))
    }

    /// Skip a string the scanner is merely passing over. A raw newline ends
    /// it (that line is broken anyway; resync rather than give up on the
    /// whole file).
    fn skip_string_lenient(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ if b == quote => {
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Read a string that is part of a declaration; unterminated is fatal.
    /// Returns (contents, content byte range, quote char).
    fn read_string_strict(
        &mut self,
        quote: u8,
    ) -> Result<(String, Range<usize>, char), ScanError> {
        let open = self.pos;
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ if b == quote => {
                    let range = start..self.pos;
                    let text = String::from_utf8_lossy(&self.src[range.clone()]).into_owned();
                    self.pos += 1;
                    return Ok((text, range, quote as char));
                }
                _ => self.pos += 1,
            }
        }
        self.pos = open;
        Err(self.error("unterminated string literal"))
    }

    fn read_specifier(&mut self, quote: u8) -> Result<ImportDecl, ScanError> {
        let (specifier, span, quote) = self.read_string_strict(quote)?;
        Ok(ImportDecl {
            specifier,
            span,
            quote,
        })
    }

    fn skip_template(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    return Ok(());
                }
                b'$' if self.peek_at(1) == Some(b'{') => {
                    self.pos += 2;
                    self.skip_template_expr()?;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = start;
        Err(self.error("unterminated template literal"))
    }

    /// Skip a `${ ... }` substitution, balancing braces and nested literals.
    fn skip_template_expr(&mut self) -> Result<(), ScanError> {
        let mut depth = 1u32;
        while depth > 0 {
            match self.peek() {
                None => return Err(self.error("unterminated template literal")),
                Some(b'{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b'}') => {
                    depth -= 1;
                    self.pos += 1;
                }
                Some(b @ (b'\'' | b'"')) => self.skip_string_lenient(b),
                Some(b'`') => self.skip_template()?,
                Some(b'/') if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                Some(b'/') if self.peek_at(1) == Some(b'*') => self.skip_block_comment()?,
                Some(_) => self.pos += 1,
            }
        }
        Ok(())
    }

    fn skip_regex(&mut self) {
        self.pos += 1;
        let mut in_class = false;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    break;
                }
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
    }

    fn error(&self, message: &str) -> ScanError {
        let line = 1 + self.src[..self.pos.min(self.src.len())]
            .iter()
            .filter(|&&b| b == b'\n')
            .count() as u32;
        ScanError {
            message: message.to_string(),
            line,
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_import_with_span() {
        let source = "import { Foo } from './x'\n";
        let summary = scan_module(source).unwrap();
        assert_eq!(summary.imports.len(), 1);
        let decl = &summary.imports[0];
        assert_eq!(decl.specifier, "./x");
        assert_eq!(decl.quote, '\'');
        assert_eq!(&source[decl.span.clone()], "./x");
    }

    #[test]
    fn test_default_and_namespace_imports() {
        let summary = scan_module(
            "import React from \"react\";\nimport * as path from './path';\n",
        )
        .unwrap();
        assert_eq!(summary.imports.len(), 2);
        assert_eq!(summary.imports[0].specifier, "react");
        assert_eq!(summary.imports[0].quote, '"');
        assert_eq!(summary.imports[1].specifier, "./path");
    }

    #[test]
    fn test_side_effect_import() {
        let summary = scan_module("import './polyfill'\n").unwrap();
        assert_eq!(summary.imports.len(), 1);
        assert_eq!(summary.imports[0].specifier, "./polyfill");
    }

    #[test]
    fn test_multiline_clause() {
        let source = "import {\n  a,\n  b,\n} from './deps'\n";
        let summary = scan_module(source).unwrap();
        assert_eq!(summary.imports.len(), 1);
        assert_eq!(&source[summary.imports[0].span.clone()], "./deps");
    }

    #[test]
    fn test_from_as_binding_name() {
        let summary = scan_module("import { from as f } from './m'\n").unwrap();
        assert_eq!(summary.imports.len(), 1);
        assert_eq!(summary.imports[0].specifier, "./m");
    }

    #[test]
    fn test_dynamic_import_and_import_meta_skipped() {
        let summary =
            scan_module("const m = import('./dyn');\nconst u = import.meta.url;\n").unwrap();
        assert!(summary.imports.is_empty());
    }

    #[test]
    fn test_imports_in_comments_and_strings_ignored() {
        let summary = scan_module(
            "// import a from './a'\n/* import b from './b' */\nconst s = \"import c from './c'\";\nimport d from './d'\n",
        )
        .unwrap();
        assert_eq!(summary.imports.len(), 1);
        assert_eq!(summary.imports[0].specifier, "./d");
    }

    #[test]
    fn test_import_in_template_literal_ignored() {
        let summary =
            scan_module("const t = `import x from './x' ${1 + 2}`;\nimport y from './y'\n")
                .unwrap();
        assert_eq!(summary.imports.len(), 1);
        assert_eq!(summary.imports[0].specifier, "./y");
    }

    #[test]
    fn test_regex_with_quote_does_not_derail() {
        let summary =
            scan_module("const re = /'/;\nimport z from './z'\n").unwrap();
        assert_eq!(summary.imports.len(), 1);
        assert_eq!(summary.imports[0].specifier, "./z");
    }

    #[test]
    fn test_export_list() {
        let summary = scan_module("const A = 1;\nexport { A, useB, helper }\n").unwrap();
        assert_eq!(summary.exports, ["A", "useB", "helper"]);
    }

    #[test]
    fn test_export_list_with_alias() {
        let summary = scan_module("export { internal as Button, x as useX }\n").unwrap();
        assert_eq!(summary.exports, ["Button", "useX"]);
    }

    #[test]
    fn test_export_declarations() {
        let summary = scan_module(
            "export const Button = () => null\nexport function useFetch() {}\nexport async function useLoad() {}\nexport class Panel {}\n",
        )
        .unwrap();
        assert_eq!(summary.exports, ["Button", "useFetch", "useLoad", "Panel"]);
    }

    #[test]
    fn test_reexports_and_default_excluded() {
        let summary = scan_module(
            "export { A } from './other'\nexport * from './all'\nexport default function Main() {}\n",
        )
        .unwrap();
        assert!(summary.exports.is_empty());
    }

    #[test]
    fn test_jsx_closing_tags_do_not_derail() {
        let summary = scan_module(
            "import { Panel } from './panel'\nfunction App() { return <div>hi</div> }\nexport const Button = () => <Panel><span/></Panel>\n",
        )
        .unwrap();
        assert_eq!(summary.imports.len(), 1);
        assert_eq!(summary.exports, ["Button"]);
    }

    #[test]
    fn test_export_inside_block_ignored() {
        let summary =
            scan_module("function f() {\n  const exportish = { export: 1 };\n}\nexport const Real = 1\n")
                .unwrap();
        assert_eq!(summary.exports, ["Real"]);
    }

    #[test]
    fn test_unterminated_specifier_is_error() {
        let err = scan_module("import { A } from './x\n").unwrap_err();
        assert!(err.message.contains("unterminated string"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_missing_from_is_error() {
        let err = scan_module("import { A };\n").unwrap_err();
        assert!(err.message.contains("from"));
    }

    #[test]
    fn test_unterminated_block_comment_is_error() {
        let err = scan_module("/* never closed\nimport a from './a'\n").unwrap_err();
        assert!(err.message.contains("block comment"));
    }

    #[test]
    fn test_unterminated_export_clause_is_error() {
        let err = scan_module("export { A, useB\n").unwrap_err();
        assert!(err.message.contains("export clause"));
    }

    #[test]
    fn test_empty_source() {
        let summary = scan_module("").unwrap();
        assert!(summary.imports.is_empty());
        assert!(summary.exports.is_empty());
    }
}
