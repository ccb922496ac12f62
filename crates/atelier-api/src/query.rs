// ── Table query composition ──
//
// A backend-neutral description of a read: filters, ordering, and an
// optional row window. `RestClient` renders it as PostgREST query
// parameters; `MemoryStore` evaluates it directly against JSON rows.

use std::cmp::Ordering;

use serde_json::Value;

/// A single column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    /// Case-insensitive substring match.
    ILike(String, String),
    In(String, Vec<Value>),
    IsNull(String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Self::Eq(c, _)
            | Self::Neq(c, _)
            | Self::Gte(c, _)
            | Self::Lte(c, _)
            | Self::ILike(c, _)
            | Self::In(c, _)
            | Self::IsNull(c) => c,
        }
    }

    /// Render the PostgREST operator expression (`eq.foo`, `in.("a","b")`, ...).
    pub fn to_postgrest(&self) -> String {
        match self {
            Self::Eq(_, v) => format!("eq.{}", scalar_text(v)),
            Self::Neq(_, v) => format!("neq.{}", scalar_text(v)),
            Self::Gte(_, v) => format!("gte.{}", scalar_text(v)),
            Self::Lte(_, v) => format!("lte.{}", scalar_text(v)),
            Self::ILike(_, needle) => format!("ilike.*{needle}*"),
            Self::In(_, values) => {
                let items: Vec<String> = values
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
                        other => scalar_text(other),
                    })
                    .collect();
                format!("in.({})", items.join(","))
            }
            Self::IsNull(_) => "is.null".to_owned(),
        }
    }

    /// Evaluate this predicate against a JSON row object.
    pub fn matches(&self, row: &Value) -> bool {
        let field = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::Eq(_, v) => field == v,
            Self::Neq(_, v) => field != v,
            Self::Gte(_, v) => {
                !field.is_null() && compare_values(field, v) != Ordering::Less
            }
            Self::Lte(_, v) => {
                !field.is_null() && compare_values(field, v) != Ordering::Greater
            }
            Self::ILike(_, needle) => field
                .as_str()
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
            Self::In(_, values) => values.contains(field),
            Self::IsNull(_) => field.is_null(),
        }
    }
}

/// Sort key for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub ascending: bool,
}

impl Sort {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    fn to_postgrest(&self) -> String {
        let dir = if self.ascending { "asc" } else { "desc" };
        format!("{}.{dir}", self.column)
    }
}

/// Row window (offset + limit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub offset: u64,
    pub limit: u64,
}

/// A composed read against one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Sort>,
    pub range: Option<Range>,
    /// Ask the backend for the total matching row count.
    pub count: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, sort: Sort) -> Self {
        self.order.push(sort);
        self
    }

    pub fn range(mut self, offset: u64, limit: u64) -> Self {
        self.range = Some(Range { offset, limit });
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Render as PostgREST query parameters (`select`, filters, `order`, window).
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_owned(), "*".to_owned())];
        for f in &self.filters {
            params.push((f.column().to_owned(), f.to_postgrest()));
        }
        if !self.order.is_empty() {
            let order: Vec<String> = self.order.iter().map(Sort::to_postgrest).collect();
            params.push(("order".to_owned(), order.join(",")));
        }
        if let Some(range) = self.range {
            params.push(("offset".to_owned(), range.offset.to_string()));
            params.push(("limit".to_owned(), range.limit.to_string()));
        }
        params
    }

    /// Apply filters, ordering, and window to an in-memory row set.
    ///
    /// Returns the windowed rows and the pre-window match count.
    pub fn apply(&self, rows: &[Value]) -> (Vec<Value>, u64) {
        let mut matched: Vec<Value> = rows
            .iter()
            .filter(|row| self.filters.iter().all(|f| f.matches(row)))
            .cloned()
            .collect();

        if !self.order.is_empty() {
            matched.sort_by(|a, b| {
                for sort in &self.order {
                    let av = a.get(&sort.column).unwrap_or(&Value::Null);
                    let bv = b.get(&sort.column).unwrap_or(&Value::Null);
                    let ord = compare_nulls_last(av, bv, sort.ascending);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let total = u64::try_from(matched.len()).unwrap_or(u64::MAX);
        let windowed = match self.range {
            Some(Range { offset, limit }) => matched
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => matched,
        };
        (windowed, total)
    }
}

/// Result of a table read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub data: Vec<Value>,
    /// Total matching rows, when the query asked for a count.
    pub count: Option<u64>,
}

// ── Value helpers ────────────────────────────────────────────────────

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_owned(),
        other => other.to_string(),
    }
}

/// Total order over JSON scalars: numbers numerically, strings
/// lexically (ISO-8601 timestamps sort correctly), bools false < true.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        _ => scalar_text(a).cmp(&scalar_text(b)),
    }
}

fn compare_nulls_last(a: &Value, b: &Value, ascending: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = compare_values(a, b);
            if ascending { ord } else { ord.reverse() }
        }
    }
}
