//! Small lexical helpers for SQL fragments carried by the schema.
//!
//! Check, default, generated and index expressions are stored as text. The
//! parser only needs to know which columns such a fragment mentions, and the
//! emitter needs whitespace normalisation and identifier quoting, so a full
//! SQL parser is not required.

use std::borrow::Cow;

/// Words that never name a column inside an expression.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "and",
    "as",
    "asc",
    "between",
    "binary",
    "blob",
    "boolean",
    "case",
    "cast",
    "collate",
    "current_date",
    "current_time",
    "current_timestamp",
    "date",
    "desc",
    "distinct",
    "else",
    "end",
    "escape",
    "exists",
    "false",
    "glob",
    "in",
    "int",
    "integer",
    "is",
    "isnull",
    "json",
    "like",
    "match",
    "nocase",
    "not",
    "notnull",
    "null",
    "numeric",
    "or",
    "real",
    "regexp",
    "rtrim",
    "text",
    "then",
    "true",
    "when",
];

/// Words that must be quoted when used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "add",
    "all",
    "alter",
    "and",
    "as",
    "asc",
    "autoincrement",
    "between",
    "by",
    "case",
    "cast",
    "check",
    "collate",
    "column",
    "constraint",
    "create",
    "default",
    "delete",
    "desc",
    "distinct",
    "drop",
    "else",
    "end",
    "escape",
    "except",
    "exists",
    "foreign",
    "from",
    "group",
    "having",
    "if",
    "in",
    "index",
    "insert",
    "intersect",
    "into",
    "is",
    "join",
    "key",
    "like",
    "limit",
    "match",
    "natural",
    "not",
    "null",
    "of",
    "offset",
    "on",
    "or",
    "order",
    "primary",
    "references",
    "rename",
    "select",
    "set",
    "table",
    "then",
    "to",
    "transaction",
    "trigger",
    "union",
    "unique",
    "update",
    "using",
    "values",
    "view",
    "virtual",
    "when",
    "where",
    "with",
];

/// Collapses whitespace runs to a single space and trims the result.
///
/// Whitespace inside single-quoted strings and double-quoted identifiers is
/// preserved, so semantically identical fragments compare equal regardless
/// of how they were formatted.
#[must_use]
pub fn normalize_whitespace(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for ch in sql.chars() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if ch == '\'' || ch == '"' {
            quote = Some(ch);
        }
        out.push(ch);
    }
    out
}

/// Returns the column names an expression mentions, in order of first use.
///
/// String literals, numbers, keywords, type names and function names (words
/// directly followed by `(`) are skipped. Qualifiers such as `t` in `t.col`
/// are skipped as well.
#[must_use]
pub fn referenced_columns(expr: &str) -> Vec<String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut found: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                i += 1;
            }
            i += 1;
        } else if ch == '"' || ch == '`' || ch == '[' {
            let close = if ch == '[' { ']' } else { ch };
            let start = i + 1;
            i = start;
            while i < chars.len() && chars[i] != close {
                i += 1;
            }
            let name: String = chars[start..i.min(chars.len())].iter().collect();
            i += 1;
            if !followed_by(&chars, i, '.') {
                push_unique(&mut found, name);
            }
        } else if ch.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
        } else if ch.is_alphabetic() || ch == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let lower = word.to_ascii_lowercase();
            if EXPRESSION_KEYWORDS.contains(&lower.as_str())
                || followed_by(&chars, i, '(')
                || followed_by(&chars, i, '.')
            {
                continue;
            }
            push_unique(&mut found, word);
        } else {
            i += 1;
        }
    }
    found
}

fn push_unique(found: &mut Vec<String>, name: String) {
    if !found.contains(&name) {
        found.push(name);
    }
}

fn followed_by(chars: &[char], mut i: usize, expected: char) -> bool {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    chars.get(i) == Some(&expected)
}

/// Quotes an identifier when it is not a plain word or is a reserved word.
#[must_use]
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_WORDS.contains(&name.to_ascii_lowercase().as_str());

    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

/// Quotes a string literal.
#[must_use]
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Turns an arbitrary fragment into an identifier-safe slug for generated
/// names (`lower(email)` becomes `lower_email`).
#[must_use]
pub fn slug(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    for ch in fragment.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Slug of an index predicate. Comparison operators are spelled out, so
/// `state = 1` and `state > 1` slug differently.
#[must_use]
pub fn predicate_slug(predicate: &str) -> String {
    let is_operator = |ch: char| matches!(ch, '<' | '>' | '=' | '!');
    let mut spelled = String::with_capacity(predicate.len());
    let mut chars = predicate.chars().peekable();
    while let Some(ch) = chars.next() {
        if !is_operator(ch) {
            spelled.push(ch);
            continue;
        }
        let mut operator = ch.to_string();
        while let Some(next) = chars.next_if(|c| is_operator(*c)) {
            operator.push(next);
        }
        let word = match operator.as_str() {
            "=" | "==" => "eq",
            "!=" | "<>" => "ne",
            "<" => "lt",
            "<=" => "le",
            ">" => "gt",
            ">=" => "ge",
            _ => "op",
        };
        spelled.push('_');
        spelled.push_str(word);
        spelled.push('_');
    }
    slug(&spelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  create   table\n\tusers (id  integer) "),
            "create table users (id integer)"
        );
        assert_eq!(
            normalize_whitespace("default  'two  spaces'"),
            "default 'two  spaces'"
        );
    }

    #[test]
    fn test_referenced_columns() {
        assert_eq!(
            referenced_columns("age >= 18 AND length(name) > 0"),
            vec!["age", "name"]
        );
        assert_eq!(
            referenced_columns("status IN ('open', 'closed') or \"closed at\" is not null"),
            vec!["status", "closed at"]
        );
        assert!(referenced_columns("CURRENT_TIMESTAMP").is_empty());
        assert!(referenced_columns("datetime('now')").is_empty());
        assert_eq!(referenced_columns("cast(price as real) * 1.5e2"), vec!["price"]);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("displayName"), "displayName");
        assert_eq!(quote_identifier("order"), "\"order\"");
        assert_eq!(quote_identifier("first name"), "\"first name\"");
        assert_eq!(quote_identifier("1st"), "\"1st\"");
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("lower(email)"), "lower_email");
        assert_eq!(slug("a + b"), "a_b");
    }

    #[test]
    fn test_predicate_slug() {
        assert_eq!(predicate_slug("deleted = 0"), "deleted_eq_0");
        assert_eq!(predicate_slug("state>=1 and state<>4"), "state_ge_1_and_state_ne_4");
        assert_ne!(predicate_slug("state = 1"), predicate_slug("state > 1"));
    }
}
