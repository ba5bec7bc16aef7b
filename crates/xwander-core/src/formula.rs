//! Airtable Formula Builder
//!
//! Builds `filterByFormula` expressions without hand-assembling strings.
//!
//! ```ignore
//! let f = Formula::equals("Track", "Day Tours").and(&Formula::not_empty("Start Date"));
//! assert_eq!(f.build(), r#"AND({Track} = "Day Tours", {Start Date} != "")"#);
//! let encoded = f.encode();
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::common::{AppResult, XwanderError};

/// A literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Blank,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl FormulaValue {
    fn render(&self) -> String {
        match self {
            FormulaValue::Blank => "BLANK()".to_string(),
            FormulaValue::Bool(true) => "TRUE()".to_string(),
            FormulaValue::Bool(false) => "FALSE()".to_string(),
            FormulaValue::Integer(n) => n.to_string(),
            FormulaValue::Number(n) => n.to_string(),
            FormulaValue::Text(s) => quote(s),
            FormulaValue::Date(d) => format!("\"{}\"", d.format("%Y-%m-%d")),
            FormulaValue::DateTime(dt) => format!("\"{}\"", dt.to_rfc3339()),
        }
    }
}

impl From<&str> for FormulaValue {
    fn from(s: &str) -> Self {
        FormulaValue::Text(s.to_string())
    }
}

impl From<String> for FormulaValue {
    fn from(s: String) -> Self {
        FormulaValue::Text(s)
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Bool(b)
    }
}

impl From<i64> for FormulaValue {
    fn from(n: i64) -> Self {
        FormulaValue::Integer(n)
    }
}

impl From<i32> for FormulaValue {
    fn from(n: i32) -> Self {
        FormulaValue::Integer(n as i64)
    }
}

impl From<f64> for FormulaValue {
    fn from(n: f64) -> Self {
        FormulaValue::Number(n)
    }
}

impl From<NaiveDate> for FormulaValue {
    fn from(d: NaiveDate) -> Self {
        FormulaValue::Date(d)
    }
}

impl From<DateTime<Utc>> for FormulaValue {
    fn from(dt: DateTime<Utc>) -> Self {
        FormulaValue::DateTime(dt)
    }
}

impl<T: Into<FormulaValue>> From<Option<T>> for FormulaValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FormulaValue::Blank)
    }
}

/// Date argument for the IS_AFTER / IS_BEFORE / IS_SAME helpers
#[derive(Debug, Clone)]
pub enum FormulaDate {
    Literal(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl FormulaDate {
    fn render(&self) -> String {
        match self {
            FormulaDate::Literal(s) => s.clone(),
            FormulaDate::Date(d) => d.format("%Y-%m-%d").to_string(),
            FormulaDate::DateTime(dt) => dt.to_rfc3339(),
        }
    }
}

impl From<&str> for FormulaDate {
    fn from(s: &str) -> Self {
        FormulaDate::Literal(s.to_string())
    }
}

impl From<NaiveDate> for FormulaDate {
    fn from(d: NaiveDate) -> Self {
        FormulaDate::Date(d)
    }
}

impl From<DateTime<Utc>> for FormulaDate {
    fn from(dt: DateTime<Utc>) -> Self {
        FormulaDate::DateTime(dt)
    }
}

fn escape(text: &str) -> String {
    text.replace('"', "\\\"")
}

fn quote(text: &str) -> String {
    format!("\"{}\"", escape(text))
}

/// Field reference: `{Field Name}`
pub fn field(name: &str) -> String {
    format!("{{{}}}", name)
}

/// A complete formula expression
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expression: String,
}

impl Formula {
    /// Wrap a raw expression without any checking
    pub fn raw(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    pub fn build(&self) -> &str {
        &self.expression
    }

    /// Percent-encoded form for the `filterByFormula` query parameter
    pub fn encode(&self) -> String {
        urlencoding::encode(&self.expression).into_owned()
    }

    // ── Logical operators ───────────────────────────────────────────────

    pub fn and(&self, other: &Formula) -> Formula {
        Formula::raw(format!("AND({}, {})", self.expression, other.expression))
    }

    pub fn or(&self, other: &Formula) -> Formula {
        Formula::raw(format!("OR({}, {})", self.expression, other.expression))
    }

    pub fn not(&self) -> Formula {
        Formula::raw(format!("NOT({})", self.expression))
    }

    // ── Comparisons ─────────────────────────────────────────────────────

    fn compare(field_name: &str, op: &str, value: FormulaValue) -> Formula {
        Formula::raw(format!("{} {} {}", field(field_name), op, value.render()))
    }

    pub fn equals(field_name: &str, value: impl Into<FormulaValue>) -> Formula {
        Self::compare(field_name, "=", value.into())
    }

    pub fn not_equals(field_name: &str, value: impl Into<FormulaValue>) -> Formula {
        Self::compare(field_name, "!=", value.into())
    }

    pub fn greater_than(field_name: &str, value: f64) -> Formula {
        Self::compare(field_name, ">", value.into())
    }

    pub fn less_than(field_name: &str, value: f64) -> Formula {
        Self::compare(field_name, "<", value.into())
    }

    pub fn greater_or_equal(field_name: &str, value: f64) -> Formula {
        Self::compare(field_name, ">=", value.into())
    }

    pub fn less_or_equal(field_name: &str, value: f64) -> Formula {
        Self::compare(field_name, "<=", value.into())
    }

    // ── Empty checks ────────────────────────────────────────────────────

    pub fn is_empty(field_name: &str) -> Formula {
        Formula::raw(format!("{} = \"\"", field(field_name)))
    }

    pub fn not_empty(field_name: &str) -> Formula {
        Formula::raw(format!("{} != \"\"", field(field_name)))
    }

    pub fn is_blank(field_name: &str) -> Formula {
        Formula::raw(format!("{} = BLANK()", field(field_name)))
    }

    // ── Text ────────────────────────────────────────────────────────────

    pub fn contains(field_name: &str, search_text: &str) -> Formula {
        Formula::raw(format!("FIND({}, {}) > 0", quote(search_text), field(field_name)))
    }

    pub fn starts_with(field_name: &str, prefix: &str) -> Formula {
        Formula::raw(format!("FIND({}, {}) = 1", quote(prefix), field(field_name)))
    }

    pub fn regex_match(field_name: &str, pattern: &str) -> Formula {
        Formula::raw(format!("REGEX_MATCH({}, {})", field(field_name), quote(pattern)))
    }

    // ── Dates ───────────────────────────────────────────────────────────

    pub fn is_after(field_name: &str, date: impl Into<FormulaDate>) -> Formula {
        Formula::raw(format!("IS_AFTER({}, \"{}\")", field(field_name), date.into().render()))
    }

    pub fn is_before(field_name: &str, date: impl Into<FormulaDate>) -> Formula {
        Formula::raw(format!("IS_BEFORE({}, \"{}\")", field(field_name), date.into().render()))
    }

    /// Same day / month / year, per `unit`
    pub fn is_same(field_name: &str, date: impl Into<FormulaDate>, unit: &str) -> Formula {
        Formula::raw(format!(
            "IS_SAME({}, \"{}\", \"{}\")",
            field(field_name),
            date.into().render(),
            unit
        ))
    }

    pub fn today() -> Formula {
        Formula::raw("TODAY()")
    }

    pub fn is_after_today(field_name: &str) -> Formula {
        Formula::raw(format!("IS_AFTER({}, TODAY())", field(field_name)))
    }

    pub fn is_before_today(field_name: &str) -> Formula {
        Formula::raw(format!("IS_BEFORE({}, TODAY())", field(field_name)))
    }

    // ── Multi-value ─────────────────────────────────────────────────────

    /// `{F} = a` OR `{F} = b` ...; a single value collapses to one comparison
    pub fn in_list<V: Into<FormulaValue>>(field_name: &str, values: Vec<V>) -> AppResult<Formula> {
        if values.is_empty() {
            return Err(XwanderError::formula("in_list requires at least one value"));
        }
        let conditions: Vec<Formula> = values
            .into_iter()
            .map(|v| Self::equals(field_name, v))
            .collect();
        Self::any_of(conditions)
    }

    pub fn not_in_list<V: Into<FormulaValue>>(field_name: &str, values: Vec<V>) -> AppResult<Formula> {
        if values.is_empty() {
            return Err(XwanderError::formula("not_in_list requires at least one value"));
        }
        let conditions: Vec<Formula> = values
            .into_iter()
            .map(|v| Self::not_equals(field_name, v))
            .collect();
        Self::all_of(conditions)
    }

    /// Linked record field contains the given record ID
    pub fn linked_record_id(field_name: &str, record_id: &str) -> Formula {
        Formula::raw(format!(
            "FIND({}, ARRAYJOIN(RECORD_ID({}))) > 0",
            quote(record_id),
            field(field_name)
        ))
    }

    // ── Combining ───────────────────────────────────────────────────────

    fn combine(op: &str, mut formulas: Vec<Formula>) -> AppResult<Formula> {
        match formulas.len() {
            0 => Err(XwanderError::formula(format!(
                "{} requires at least one formula",
                if op == "AND" { "all_of" } else { "any_of" }
            ))),
            1 => Ok(formulas.remove(0)),
            _ => {
                let parts: Vec<&str> = formulas.iter().map(|f| f.expression.as_str()).collect();
                Ok(Formula::raw(format!("{}({})", op, parts.join(", "))))
            }
        }
    }

    pub fn all_of(formulas: Vec<Formula>) -> AppResult<Formula> {
        Self::combine("AND", formulas)
    }

    pub fn any_of(formulas: Vec<Formula>) -> AppResult<Formula> {
        Self::combine("OR", formulas)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Joiner {
    #[default]
    And,
    Or,
}

/// Fluent accumulator of conditions
///
/// All conditions are joined by the operator selected last (AND unless an
/// `or_*` method was called).
#[derive(Debug, Clone, Default)]
pub struct FormulaBuilder {
    conditions: Vec<Formula>,
    joiner: Joiner,
    // in_list errors surface at build()
    error: Option<String>,
}

impl FormulaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, formula: Formula) -> Self {
        self.conditions.push(formula);
        self
    }

    fn push_result(mut self, formula: AppResult<Formula>) -> Self {
        match formula {
            Ok(f) => self.conditions.push(f),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e.to_string());
                }
            }
        }
        self
    }

    pub fn where_eq(self, field_name: &str, value: impl Into<FormulaValue>) -> Self {
        self.push(Formula::equals(field_name, value))
    }

    pub fn where_not(self, field_name: &str, value: impl Into<FormulaValue>) -> Self {
        self.push(Formula::not_equals(field_name, value))
    }

    pub fn and_where(mut self, field_name: &str, value: impl Into<FormulaValue>) -> Self {
        self.joiner = Joiner::And;
        self.where_eq(field_name, value)
    }

    pub fn or_where(mut self, field_name: &str, value: impl Into<FormulaValue>) -> Self {
        self.joiner = Joiner::Or;
        self.where_eq(field_name, value)
    }

    pub fn where_in<V: Into<FormulaValue>>(self, field_name: &str, values: Vec<V>) -> Self {
        let formula = Formula::in_list(field_name, values);
        self.push_result(formula)
    }

    pub fn or_where_in<V: Into<FormulaValue>>(mut self, field_name: &str, values: Vec<V>) -> Self {
        self.joiner = Joiner::Or;
        self.where_in(field_name, values)
    }

    pub fn not_empty(self, field_name: &str) -> Self {
        self.push(Formula::not_empty(field_name))
    }

    pub fn is_empty(self, field_name: &str) -> Self {
        self.push(Formula::is_empty(field_name))
    }

    pub fn contains(self, field_name: &str, text: &str) -> Self {
        self.push(Formula::contains(field_name, text))
    }

    pub fn after(self, field_name: &str, date: impl Into<FormulaDate>) -> Self {
        self.push(Formula::is_after(field_name, date))
    }

    pub fn before(self, field_name: &str, date: impl Into<FormulaDate>) -> Self {
        self.push(Formula::is_before(field_name, date))
    }

    pub fn after_today(self, field_name: &str) -> Self {
        self.push(Formula::is_after_today(field_name))
    }

    pub fn greater_than(self, field_name: &str, value: f64) -> Self {
        self.push(Formula::greater_than(field_name, value))
    }

    pub fn less_than(self, field_name: &str, value: f64) -> Self {
        self.push(Formula::less_than(field_name, value))
    }

    pub fn raw(self, expression: &str) -> Self {
        self.push(Formula::raw(expression))
    }

    pub fn build(&self) -> AppResult<Formula> {
        if let Some(message) = &self.error {
            return Err(XwanderError::formula(message.clone()));
        }
        if self.conditions.is_empty() {
            return Err(XwanderError::formula("No conditions added to builder"));
        }
        let conditions = self.conditions.clone();
        match self.joiner {
            Joiner::And => Formula::all_of(conditions),
            Joiner::Or => Formula::any_of(conditions),
        }
    }

    pub fn encode(&self) -> AppResult<String> {
        Ok(self.build()?.encode())
    }
}
