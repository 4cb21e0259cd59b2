//! Interface Extraction
//!
//! Regex-based extraction of the public surface of JS/TS source files:
//! exports (default presence + named identifiers), import statements, props
//! interfaces (`interface ButtonProps { .. }` / `type ButtonProps = { .. }`)
//! and type aliases. Line-anchored patterns keep commented-out code with a
//! `//` prefix from matching.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cross_file::AnalyzerError;

static_regex!(
    export_decl_re,
    r"(?m)^[ \t]*export\s+(?:declare\s+)?(?:async\s+)?(?:abstract\s+)?(?:function\s*\*?|class|const|let|var|interface|type|enum)\s+([A-Za-z_$][\w$]*)"
);
static_regex!(export_default_re, r"(?m)^[ \t]*export\s+default\b");
static_regex!(export_list_re, r"(?m)^[ \t]*export\s+(?:type\s+)?\{([^}]*)\}");
static_regex!(cjs_default_re, r"(?m)^[ \t]*module\.exports\s*=");
static_regex!(
    cjs_named_re,
    r"(?m)^[ \t]*(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*="
);
static_regex!(
    import_from_re,
    r#"(?m)^[ \t]*import\s+(?:type\s+)?([^;'"]+?)\s+from\s+['"]([^'"]+)['"]"#
);
static_regex!(import_side_effect_re, r#"(?m)^[ \t]*import\s+['"]([^'"]+)['"]"#);
static_regex!(
    require_re,
    r#"(?m)^[ \t]*(?:const|let|var)\s+(\{[^}]*\}|[A-Za-z_$][\w$]*)\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#
);
static_regex!(
    props_head_re,
    r"(?m)^[ \t]*(?:export\s+)?(?:interface\s+([A-Za-z_$][\w$]*Props)\b[^{=;]*\{|type\s+([A-Za-z_$][\w$]*Props)\s*=\s*\{)"
);
static_regex!(
    prop_field_re,
    r#"^(?:readonly\s+)?([A-Za-z_$][\w$]*|"[^"]+"|'[^']+')(\?)?\s*:\s*([\s\S]+)$"#
);
static_regex!(
    type_alias_re,
    r"(?m)^[ \t]*(?:export\s+)?type\s+([A-Za-z_$][\w$]*)\s*(?:<[^=]*>)?\s*=\s*([^;\n]+)"
);

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Exports
// ============================================================================

/// Default-export presence plus named export identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSet {
    pub has_default: bool,
    pub named: BTreeSet<String>,
}

impl ExportSet {
    /// Named exports present in `self` but missing from `other`.
    pub fn removed_in<'a>(&'a self, other: &'a ExportSet) -> impl Iterator<Item = &'a String> {
        self.named.difference(&other.named)
    }
}

pub fn extract_exports(text: &str) -> ExportSet {
    let mut set = ExportSet::default();

    if export_default_re().is_match(text) || cjs_default_re().is_match(text) {
        set.has_default = true;
    }
    for caps in export_decl_re().captures_iter(text) {
        set.named.insert(caps[1].to_string());
    }
    for caps in export_list_re().captures_iter(text) {
        for item in caps[1].split(',') {
            let item = item.trim();
            let item = item.strip_prefix("type ").unwrap_or(item).trim();
            if item.is_empty() {
                continue;
            }
            let exported = match item.split_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => item,
            };
            if exported == "default" {
                set.has_default = true;
            } else if is_identifier(exported) {
                set.named.insert(exported.to_string());
            }
        }
    }
    for caps in cjs_named_re().captures_iter(text) {
        set.named.insert(caps[1].to_string());
    }

    set
}

// ============================================================================
// Imports
// ============================================================================

/// One name pulled in by an import: `{ imported as local }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedName {
    pub imported: String,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatement {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub named: Vec<ImportedName>,
    /// `import './styles.css'`
    #[serde(default)]
    pub side_effect: bool,
    /// Byte range of the statement in the source text
    #[serde(skip)]
    pub span: Range<usize>,
}

impl ImportStatement {
    /// Every local identifier this statement binds.
    pub fn locals(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Some(d) = &self.default {
            out.push(d.as_str());
        }
        if let Some(ns) = &self.namespace {
            out.push(ns.as_str());
        }
        out.extend(self.named.iter().map(|n| n.local.as_str()));
        out
    }

    /// Whether the statement imports `name` (by its exported name) from the source.
    pub fn imports_name(&self, name: &str) -> bool {
        self.named.iter().any(|n| n.imported == name)
    }
}

fn parse_named_list(inner: &str, alias_sep: &str) -> Vec<ImportedName> {
    let mut out = Vec::new();
    for item in inner.split(',') {
        let item = item.trim();
        let item = item.strip_prefix("type ").unwrap_or(item).trim();
        if item.is_empty() {
            continue;
        }
        let (imported, local) = match item.split_once(alias_sep) {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (item, item),
        };
        if (is_identifier(imported) || imported == "default") && is_identifier(local) {
            out.push(ImportedName {
                imported: imported.to_string(),
                local: local.to_string(),
            });
        }
    }
    out
}

/// Split `Default, { a, b as c }` / `* as ns` into its bindings.
fn parse_import_clause(clause: &str) -> (Option<String>, Option<String>, Vec<ImportedName>) {
    let clause = clause.trim();
    let (head, braces) = match clause.find('{') {
        Some(open) => {
            let close = clause[open..]
                .find('}')
                .map(|i| open + i)
                .unwrap_or(clause.len());
            (&clause[..open], Some(&clause[open + 1..close]))
        }
        None => (clause, None),
    };

    let mut default = None;
    let mut namespace = None;
    for part in head.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some(rest) = part.strip_prefix('*') {
            let ns = rest.trim().trim_start_matches("as").trim();
            if is_identifier(ns) {
                namespace = Some(ns.to_string());
            }
        } else if is_identifier(part) {
            default = Some(part.to_string());
        }
    }

    let named = braces
        .map(|inner| parse_named_list(inner, " as "))
        .unwrap_or_default();
    (default, namespace, named)
}

/// All import statements (ES modules and `require`) in source order.
pub fn extract_imports(text: &str) -> Vec<ImportStatement> {
    let mut out = Vec::new();

    for caps in import_from_re().captures_iter(text) {
        let (default, namespace, named) = parse_import_clause(&caps[1]);
        out.push(ImportStatement {
            source: caps[2].to_string(),
            default,
            namespace,
            named,
            side_effect: false,
            span: caps.get(0).map(|m| m.range()).unwrap_or_default(),
        });
    }
    for caps in import_side_effect_re().captures_iter(text) {
        out.push(ImportStatement {
            source: caps[1].to_string(),
            default: None,
            namespace: None,
            named: Vec::new(),
            side_effect: true,
            span: caps.get(0).map(|m| m.range()).unwrap_or_default(),
        });
    }
    for caps in require_re().captures_iter(text) {
        let binding = caps[1].trim();
        let (default, named) = match binding.strip_prefix('{') {
            Some(inner) => (None, parse_named_list(inner.trim_end_matches('}'), ":")),
            None => (Some(binding.to_string()), Vec::new()),
        };
        out.push(ImportStatement {
            source: caps[2].to_string(),
            default,
            namespace: None,
            named,
            side_effect: false,
            span: caps.get(0).map(|m| m.range()).unwrap_or_default(),
        });
    }

    out.sort_by_key(|s| s.span.start);
    out
}

/// Whether `ident` is referenced anywhere in `text` outside import statements.
pub fn identifier_referenced(text: &str, ident: &str) -> bool {
    let mut stripped = text.to_string();
    for stmt in extract_imports(text) {
        if stmt.span.end <= stripped.len() {
            let blank = " ".repeat(stmt.span.len());
            stripped.replace_range(stmt.span.clone(), &blank);
        }
    }
    let pattern = format!(r"(?:^|[^\w$]){}(?:[^\w$]|$)", regex::escape(ident));
    Regex::new(&pattern)
        .map(|re| re.is_match(&stripped))
        .unwrap_or(false)
}

// ============================================================================
// Props and type aliases
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropField {
    pub type_text: String,
    pub optional: bool,
}

/// The parts of a file's interface the cross-file analyzer compares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceShape {
    pub exports: ExportSet,
    /// `ButtonProps` → field name → field
    pub props: BTreeMap<String, BTreeMap<String, PropField>>,
    /// Type alias name → normalized right-hand side
    pub type_aliases: BTreeMap<String, String>,
}

/// Byte offset of the brace closing the block whose body starts at `start`.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a props body into members at top-level `;`, `,` or newlines.
fn split_members(body: &str) -> Vec<String> {
    let mut members = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut prev = '\0';

    for c in body.chars() {
        match c {
            '{' | '(' | '[' | '<' => depth += 1,
            '}' | ')' | ']' => depth = (depth - 1).max(0),
            '>' if prev != '=' => depth = (depth - 1).max(0),
            _ => {}
        }
        if depth == 0 && matches!(c, ';' | ',' | '\n') {
            if !current.trim().is_empty() {
                members.push(current.trim().to_string());
            }
            current.clear();
        } else {
            current.push(c);
        }
        prev = c;
    }
    if !current.trim().is_empty() {
        members.push(current.trim().to_string());
    }
    members
}

fn parse_props_body(body: &str) -> BTreeMap<String, PropField> {
    let mut fields = BTreeMap::new();
    for member in split_members(body) {
        if member.starts_with("//") || member.starts_with("/*") || member.starts_with('*') {
            continue;
        }
        let Some(caps) = prop_field_re().captures(&member) else {
            continue;
        };
        let name = caps[1].trim_matches(|c| c == '"' || c == '\'').to_string();
        fields.insert(
            name,
            PropField {
                type_text: collapse_whitespace(&caps[3]),
                optional: caps.get(2).is_some(),
            },
        );
    }
    fields
}

/// Extract exports, props interfaces and type aliases.
///
/// Fails with `AnalyzerError::Parse` when a props block is never closed.
pub fn extract_interface(text: &str) -> Result<InterfaceShape, AnalyzerError> {
    let mut shape = InterfaceShape {
        exports: extract_exports(text),
        ..Default::default()
    };

    for caps in props_head_re().captures_iter(text) {
        let Some(name) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        let body_start = caps.get(0).map(|m| m.end()).unwrap_or_default();
        let body_end = matching_brace(text, body_start).ok_or_else(|| {
            AnalyzerError::Parse(format!("unbalanced braces in '{}'", name.as_str()))
        })?;
        shape.props.insert(
            name.as_str().to_string(),
            parse_props_body(&text[body_start..body_end]),
        );
    }

    for caps in type_alias_re().captures_iter(text) {
        let name = &caps[1];
        if shape.props.contains_key(name) {
            continue;
        }
        shape
            .type_aliases
            .insert(name.to_string(), collapse_whitespace(&caps[2]));
    }

    Ok(shape)
}
