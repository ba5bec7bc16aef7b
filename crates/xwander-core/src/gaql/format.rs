//! Free-standing GAQL validation and pretty printing
//!
//! Both functions accept hand-written queries as well as `GaqlBuilder`
//! output. Validation is structural only: filter and order syntax is left
//! to the Google Ads API.

use crate::common::{AppResult, XwanderError};

const DEFAULT_INDENT: &str = "  ";

/// Whitespace-separated words; a quoted literal stays inside one word
/// together with its spaces
fn split_words(query: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in query.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        if c.is_whitespace() {
            if let Some(s) = start.take() {
                words.push(&query[s..idx]);
            }
            continue;
        }

        if start.is_none() {
            start = Some(idx);
        }
        if c == '\'' || c == '"' {
            quote = Some(c);
        }
    }

    if let Some(s) = start {
        words.push(&query[s..]);
    }
    words
}

/// Text outside `'...'` and `"..."` literals
fn unquoted_segments(query: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in query.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                    start = idx + c.len_utf8();
                }
            }
            None if c == '\'' || c == '"' => {
                segments.push(&query[start..idx]);
                quote = Some(c);
            }
            None => {}
        }
    }

    if quote.is_none() {
        segments.push(&query[start..]);
    }
    segments
}

/// Word-like tokens outside literals, so `from_date`, `campaign.select` or
/// `'%from%'` never count as keywords
fn keyword_tokens(query: &str) -> impl Iterator<Item = &str> {
    unquoted_segments(query).into_iter().flat_map(|segment| {
        segment
            .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .filter(|t| !t.is_empty())
    })
}

fn count_keyword(query: &str, keyword: &str) -> usize {
    keyword_tokens(query)
        .filter(|t| t.eq_ignore_ascii_case(keyword))
        .count()
}

/// Check the structure of a GAQL query
///
/// Rules (case-insensitive): the query starts with `SELECT`, contains a
/// `FROM`, and neither keyword appears more than once.
pub fn validate(query: &str) -> AppResult<bool> {
    let starts_with_select = query
        .trim_start()
        .split_whitespace()
        .next()
        .map(|first| first.eq_ignore_ascii_case("SELECT"))
        .unwrap_or(false);

    if !starts_with_select {
        return Err(XwanderError::malformed_query("Query must start with SELECT"));
    }

    let from_count = count_keyword(query, "FROM");
    if from_count == 0 {
        return Err(XwanderError::malformed_query("Query must contain FROM clause"));
    }

    if count_keyword(query, "SELECT") > 1 {
        return Err(XwanderError::malformed_query(
            "Multiple SELECT clauses not allowed",
        ));
    }

    if from_count > 1 {
        return Err(XwanderError::malformed_query("Multiple FROM clauses not allowed"));
    }

    Ok(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Select,
    From,
    Where,
    OrderBy,
    Limit,
}

impl Clause {
    fn keyword(&self) -> &'static str {
        match self {
            Clause::Select => "SELECT",
            Clause::From => "FROM",
            Clause::Where => "WHERE",
            Clause::OrderBy => "ORDER BY",
            Clause::Limit => "LIMIT",
        }
    }
}

/// Re-flow a query onto one line per clause, with one indented line per
/// selected field
pub fn pretty_print(query: &str) -> String {
    pretty_print_with_indent(query, DEFAULT_INDENT)
}

/// Same as [`pretty_print`] with a custom indent string
pub fn pretty_print_with_indent(query: &str, indent: &str) -> String {
    let words = split_words(query);

    // Leading text before the first keyword is kept as-is
    let mut preamble: Vec<&str> = Vec::new();
    let mut clauses: Vec<(Clause, Vec<&str>)> = Vec::new();

    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        let clause = if word.eq_ignore_ascii_case("SELECT") {
            Some(Clause::Select)
        } else if word.eq_ignore_ascii_case("FROM") {
            Some(Clause::From)
        } else if word.eq_ignore_ascii_case("WHERE") {
            Some(Clause::Where)
        } else if word.eq_ignore_ascii_case("LIMIT") {
            Some(Clause::Limit)
        } else if word.eq_ignore_ascii_case("ORDER")
            && words.get(i + 1).is_some_and(|w| w.eq_ignore_ascii_case("BY"))
        {
            i += 1;
            Some(Clause::OrderBy)
        } else {
            None
        };

        if let Some(c) = clause {
            clauses.push((c, Vec::new()));
        } else if let Some((_, body)) = clauses.last_mut() {
            body.push(word);
        } else {
            preamble.push(word);
        }
        i += 1;
    }

    let mut lines: Vec<String> = Vec::new();
    if !preamble.is_empty() {
        lines.push(preamble.join(" "));
    }

    for (clause, body) in clauses {
        let text = body.join(" ");
        match clause {
            Clause::Select => {
                lines.push(clause.keyword().to_string());
                let fields: Vec<&str> = text
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .collect();
                let last = fields.len().saturating_sub(1);
                for (idx, field) in fields.iter().enumerate() {
                    let comma = if idx < last { "," } else { "" };
                    lines.push(format!("{}{}{}", indent, field, comma));
                }
            }
            Clause::Where => {
                lines.push(clause.keyword().to_string());
                if !text.is_empty() {
                    lines.push(format!("{}{}", indent, text));
                }
            }
            Clause::From | Clause::OrderBy | Clause::Limit => {
                if text.is_empty() {
                    lines.push(clause.keyword().to_string());
                } else {
                    lines.push(format!("{} {}", clause.keyword(), text));
                }
            }
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaql::GaqlBuilder;

    #[test]
    fn test_valid_query() {
        assert!(validate("SELECT campaign.name FROM campaign").unwrap());
        assert!(validate("  select campaign.name from campaign  ").unwrap());
    }

    #[test]
    fn test_missing_select() {
        let err = validate("FROM campaign").unwrap_err();
        assert!(err.to_string().contains("must start with SELECT"));
    }

    #[test]
    fn test_missing_from() {
        let err = validate("SELECT campaign.name").unwrap_err();
        assert!(err.to_string().contains("must contain FROM"));
    }

    #[test]
    fn test_duplicate_clauses() {
        let err = validate("SELECT a FROM b SELECT c").unwrap_err();
        assert!(err.to_string().contains("Multiple SELECT"));

        let err = validate("SELECT a FROM b FROM c").unwrap_err();
        assert!(err.to_string().contains("Multiple FROM"));
    }

    #[test]
    fn test_keywords_inside_field_names_are_ignored() {
        assert!(validate("SELECT segments.from_date, campaign.selection FROM campaign").unwrap());
    }

    #[test]
    fn test_builder_output_always_validates() {
        let query = GaqlBuilder::new()
            .add_select(["campaign.id", "metrics.clicks"])
            .set_source("campaign")
            .add_date_range("LAST_30_DAYS")
            .add_order("metrics.clicks", true)
            .set_limit(10)
            .build()
            .unwrap();
        assert!(validate(&query).unwrap());
    }

    #[test]
    fn test_pretty_print_layout() {
        let query = "SELECT campaign.id, campaign.name FROM campaign WHERE campaign.status = ENABLED ORDER BY metrics.clicks DESC LIMIT 50";
        let expected = "SELECT\n  campaign.id,\n  campaign.name\nFROM campaign\nWHERE\n  campaign.status = ENABLED\nORDER BY metrics.clicks DESC\nLIMIT 50";
        assert_eq!(pretty_print(query), expected);
    }

    #[test]
    fn test_pretty_print_is_idempotent() {
        let query = "SELECT   a,b ,c\n FROM   campaign   where x = 1   order by a ASC limit 3";
        let once = pretty_print(query);
        let twice = pretty_print(&once);
        assert_eq!(once, twice);
        assert!(once.contains("ORDER BY a ASC"));
    }

    #[test]
    fn test_pretty_print_custom_indent() {
        let formatted = pretty_print_with_indent("SELECT a, b FROM c", "\t");
        assert_eq!(formatted, "SELECT\n\ta,\n\tb\nFROM c");
    }

    #[test]
    fn test_pretty_print_keeps_clause_order() {
        let formatted = pretty_print("SELECT a FROM b LIMIT 5");
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(lines, vec!["SELECT", "  a", "FROM b", "LIMIT 5"]);
    }

    #[test]
    fn test_keywords_inside_literals_are_ignored() {
        let query = GaqlBuilder::new()
            .add_select(["campaign.name"])
            .set_source("campaign")
            .add_filter("campaign.name LIKE '%from%'")
            .add_filter("ad_group.name = \"select from\"")
            .build()
            .unwrap();
        assert!(validate(&query).unwrap());

        assert!(validate("SELECT a FROM b WHERE c = 'it\\'s from here'").unwrap());

        let err = validate("SELECT a WHERE c = 'from'").unwrap_err();
        assert!(err.to_string().contains("must contain FROM"));
    }

    #[test]
    fn test_pretty_print_keeps_literals_intact() {
        let formatted = pretty_print("SELECT a FROM b WHERE c = 'trips from levi'");
        assert_eq!(formatted, "SELECT\n  a\nFROM b\nWHERE\n  c = 'trips from levi'");

        let formatted = pretty_print("SELECT a FROM b WHERE c = 'x  order by  y' LIMIT 2");
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(lines, vec!["SELECT", "  a", "FROM b", "WHERE", "  c = 'x  order by  y'", "LIMIT 2"]);
    }

    #[test]
    fn test_split_words_keeps_quoted_spans() {
        assert_eq!(
            split_words("a = 'b c'  AND d = \"e f\""),
            vec!["a", "=", "'b c'", "AND", "d", "=", "\"e f\""]
        );
    }
}
