//! Mutation Operations
//!
//! The closed set of edits the toolkit understands. Each variant carries the
//! target file (relative to the project root), a 1-based line, the literal
//! before-value and the after-value, plus an optional 1-based occurrence used
//! to disambiguate repeated matches on one line.

use serde::{Deserialize, Serialize};

/// Operation discriminant, used for statistics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    SetLineToken,
    SetPropertyValue,
    SetTextRun,
    AppendToken,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::SetLineToken => write!(f, "set_line_token"),
            OperationKind::SetPropertyValue => write!(f, "set_property_value"),
            OperationKind::SetTextRun => write!(f, "set_text_run"),
            OperationKind::AppendToken => write!(f, "append_token"),
        }
    }
}

/// A single atomic edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationOperation {
    /// Replace exactly one whole-token occurrence of `old_token` on `line`.
    #[serde(rename_all = "camelCase")]
    SetLineToken {
        file: String,
        line: usize,
        old_token: String,
        new_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        occurrence: Option<usize>,
    },
    /// Replace the value of a `property: value` / `property="value"` pair.
    #[serde(rename_all = "camelCase")]
    SetPropertyValue {
        file: String,
        line: usize,
        property: String,
        old_value: String,
        new_value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        occurrence: Option<usize>,
    },
    /// Replace a literal text run (labels, headings, copy).
    #[serde(rename_all = "camelCase")]
    SetTextRun {
        file: String,
        line: usize,
        old_text: String,
        new_text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        occurrence: Option<usize>,
    },
    /// Insert `appended_token` right after `anchor_token`, removing nothing.
    #[serde(rename_all = "camelCase")]
    AppendToken {
        file: String,
        line: usize,
        anchor_token: String,
        appended_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        occurrence: Option<usize>,
    },
}

impl MutationOperation {
    pub fn set_line_token(
        file: impl Into<String>,
        line: usize,
        old_token: impl Into<String>,
        new_token: impl Into<String>,
    ) -> Self {
        MutationOperation::SetLineToken {
            file: file.into(),
            line,
            old_token: old_token.into(),
            new_token: new_token.into(),
            occurrence: None,
        }
    }

    pub fn set_property_value(
        file: impl Into<String>,
        line: usize,
        property: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        MutationOperation::SetPropertyValue {
            file: file.into(),
            line,
            property: property.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            occurrence: None,
        }
    }

    pub fn set_text_run(
        file: impl Into<String>,
        line: usize,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Self {
        MutationOperation::SetTextRun {
            file: file.into(),
            line,
            old_text: old_text.into(),
            new_text: new_text.into(),
            occurrence: None,
        }
    }

    pub fn append_token(
        file: impl Into<String>,
        line: usize,
        anchor_token: impl Into<String>,
        appended_token: impl Into<String>,
    ) -> Self {
        MutationOperation::AppendToken {
            file: file.into(),
            line,
            anchor_token: anchor_token.into(),
            appended_token: appended_token.into(),
            occurrence: None,
        }
    }

    /// Pick the n-th (1-based) match on the line.
    pub fn with_occurrence(mut self, n: usize) -> Self {
        match &mut self {
            MutationOperation::SetLineToken { occurrence, .. }
            | MutationOperation::SetPropertyValue { occurrence, .. }
            | MutationOperation::SetTextRun { occurrence, .. }
            | MutationOperation::AppendToken { occurrence, .. } => *occurrence = Some(n),
        }
        self
    }

    /// Return a copy aimed at a different line.
    pub fn retargeted(&self, new_line: usize) -> Self {
        let mut op = self.clone();
        match &mut op {
            MutationOperation::SetLineToken { line, .. }
            | MutationOperation::SetPropertyValue { line, .. }
            | MutationOperation::SetTextRun { line, .. }
            | MutationOperation::AppendToken { line, .. } => *line = new_line,
        }
        op
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            MutationOperation::SetLineToken { .. } => OperationKind::SetLineToken,
            MutationOperation::SetPropertyValue { .. } => OperationKind::SetPropertyValue,
            MutationOperation::SetTextRun { .. } => OperationKind::SetTextRun,
            MutationOperation::AppendToken { .. } => OperationKind::AppendToken,
        }
    }

    pub fn file(&self) -> &str {
        match self {
            MutationOperation::SetLineToken { file, .. }
            | MutationOperation::SetPropertyValue { file, .. }
            | MutationOperation::SetTextRun { file, .. }
            | MutationOperation::AppendToken { file, .. } => file,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            MutationOperation::SetLineToken { line, .. }
            | MutationOperation::SetPropertyValue { line, .. }
            | MutationOperation::SetTextRun { line, .. }
            | MutationOperation::AppendToken { line, .. } => *line,
        }
    }

    pub fn occurrence(&self) -> Option<usize> {
        match self {
            MutationOperation::SetLineToken { occurrence, .. }
            | MutationOperation::SetPropertyValue { occurrence, .. }
            | MutationOperation::SetTextRun { occurrence, .. }
            | MutationOperation::AppendToken { occurrence, .. } => *occurrence,
        }
    }

    /// The literal value the operation expects to find.
    ///
    /// For `AppendToken` this is the anchor.
    pub fn before(&self) -> &str {
        match self {
            MutationOperation::SetLineToken { old_token, .. } => old_token,
            MutationOperation::SetPropertyValue { old_value, .. } => old_value,
            MutationOperation::SetTextRun { old_text, .. } => old_text,
            MutationOperation::AppendToken { anchor_token, .. } => anchor_token,
        }
    }

    /// The literal value the operation writes in place of `before()`.
    ///
    /// For `AppendToken` this is `"<anchor> <appended>"`.
    pub fn after(&self) -> String {
        match self {
            MutationOperation::SetLineToken { new_token, .. } => new_token.clone(),
            MutationOperation::SetPropertyValue { new_value, .. } => new_value.clone(),
            MutationOperation::SetTextRun { new_text, .. } => new_text.clone(),
            MutationOperation::AppendToken {
                anchor_token,
                appended_token,
                ..
            } => format!("{} {}", anchor_token.trim(), appended_token.trim()),
        }
    }

    /// Property name for property-style operations.
    pub fn property(&self) -> Option<&str> {
        match self {
            MutationOperation::SetPropertyValue { property, .. } => Some(property),
            _ => None,
        }
    }

    /// One-line human description, used in logs and context summaries.
    pub fn describe(&self) -> String {
        match self {
            MutationOperation::SetPropertyValue {
                file,
                line,
                property,
                old_value,
                new_value,
                ..
            } => format!(
                "{}:{} {}: '{}' -> '{}'",
                file, line, property, old_value, new_value
            ),
            _ => format!(
                "{}:{} {} '{}' -> '{}'",
                self.file(),
                self.line(),
                self.kind(),
                self.before(),
                self.after()
            ),
        }
    }
}
