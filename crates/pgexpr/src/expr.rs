//! Expression tree for filters, computed columns and conditional updates.
//!
//! An [`Expr`] is pure data: it carries no placeholder numbering and no
//! resolution state. It is lowered to SQL text plus parameters by
//! [`crate::resolve`], which decides per node whether an absent value makes
//! the node neutral (ignore mode) or an error.
//!
//! # Example
//! ```ignore
//! use pgexpr::{Expr, resolve};
//!
//! let filter = Expr::and(vec![
//!     Expr::eq(Expr::column(r#""u"."status""#), Expr::value("active")),
//!     Expr::gte(Expr::column(r#""u"."age""#), Expr::maybe(min_age)),
//! ]);
//! let resolved = resolve(&filter, 1, true)?;
//! ```

use crate::error::ResolveResult;
use crate::ident::quote_ident;
use crate::resolve::Fragment;
use crate::value::ScalarValue;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Variadic arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Right-associative, rendered as nested `POWER(a, POWER(b, c))`.
    Power,
}

impl ArithmeticOp {
    pub fn sql(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Power => "POWER",
        }
    }

    /// Name used in error paths.
    pub fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "sum",
            ArithmeticOp::Subtract => "difference",
            ArithmeticOp::Multiply => "product",
            ArithmeticOp::Divide => "quotient",
            ArithmeticOp::Power => "power",
        }
    }
}

/// Binary comparison and JSON operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    /// `jsonb ? text`
    JsonHas,
    /// `jsonb @> jsonb`
    JsonContains,
    /// `jsonb <@ jsonb`
    JsonContainedBy,
    /// `jsonb - text`
    JsonMinus,
    /// `jsonb -> key`
    JsonIndex,
    /// `jsonb ->> key`
    JsonIndexText,
}

impl CompareOp {
    pub fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
            CompareOp::JsonHas => "?",
            CompareOp::JsonContains => "@>",
            CompareOp::JsonContainedBy => "<@",
            CompareOp::JsonMinus => "-",
            CompareOp::JsonIndex => "->",
            CompareOp::JsonIndexText => "->>",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompareOp::Eq => "equals",
            CompareOp::Ne => "not equals",
            CompareOp::Gt => "greater than",
            CompareOp::Gte => "greater or equal",
            CompareOp::Lt => "less than",
            CompareOp::Lte => "less or equal",
            CompareOp::Like => "like",
            CompareOp::JsonHas => "json has",
            CompareOp::JsonContains => "json contains",
            CompareOp::JsonContainedBy => "json contained by",
            CompareOp::JsonMinus => "json minus",
            CompareOp::JsonIndex => "json index",
            CompareOp::JsonIndexText => "json index text",
        }
    }
}

/// Operators comparing one value against a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    In,
    NotIn,
    LikeAll,
    LikeSome,
    JsonHasAny,
    JsonHasAll,
    JsonMinusAll,
}

impl ListOp {
    /// The scalar operator a single-item list collapses to.
    pub fn scalar(self) -> CompareOp {
        match self {
            ListOp::In => CompareOp::Eq,
            ListOp::NotIn => CompareOp::Ne,
            ListOp::LikeAll | ListOp::LikeSome => CompareOp::Like,
            ListOp::JsonHasAny | ListOp::JsonHasAll => CompareOp::JsonHas,
            ListOp::JsonMinusAll => CompareOp::JsonMinus,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ListOp::In => "in",
            ListOp::NotIn => "not in",
            ListOp::LikeAll => "like all",
            ListOp::LikeSome => "like some",
            ListOp::JsonHasAny => "json has any",
            ListOp::JsonHasAll => "json has all",
            ListOp::JsonMinusAll => "json minus all",
        }
    }
}

/// Callback form of a raw fragment: receives the cursor (the index the next
/// placeholder would get) and returns its own text and parameters.
pub type RawCallback = dyn Fn(usize) -> ResolveResult<Fragment> + Send + Sync;

/// Raw SQL, passed through verbatim.
#[derive(Clone)]
pub enum RawSql {
    Text(String),
    Callback(Arc<RawCallback>),
}

impl fmt::Debug for RawSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawSql::Text(sql) => f.debug_tuple("Text").field(sql).finish(),
            RawSql::Callback(_) => f.debug_tuple("Callback").field(&"<fn>").finish(),
        }
    }
}

/// A nested query that can render itself starting at a given placeholder
/// index, so numbering continues across the subquery boundary.
pub trait NestedQuery: Send + Sync {
    fn resolve_query(&self, cursor: usize) -> ResolveResult<Fragment>;
}

impl<F> NestedQuery for F
where
    F: Fn(usize) -> ResolveResult<Fragment> + Send + Sync,
{
    fn resolve_query(&self, cursor: usize) -> ResolveResult<Fragment> {
        self(cursor)
    }
}

/// A pre-rendered fragment numbered from `$1` is renumbered to start at the
/// cursor.
impl NestedQuery for Fragment {
    fn resolve_query(&self, cursor: usize) -> ResolveResult<Fragment> {
        Ok(self.renumbered(cursor))
    }
}

/// Shared handle to a [`NestedQuery`].
#[derive(Clone)]
pub struct QueryRef(Arc<dyn NestedQuery>);

impl QueryRef {
    pub fn new<Q: NestedQuery + 'static>(query: Q) -> Self {
        QueryRef(Arc::new(query))
    }

    pub fn resolve_query(&self, cursor: usize) -> ResolveResult<Fragment> {
        self.0.resolve_query(cursor)
    }
}

impl fmt::Debug for QueryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("QueryRef").field(&"<dyn NestedQuery>").finish()
    }
}

/// One `WHEN .. THEN ..` arm of a switch.
#[derive(Debug, Clone)]
pub struct Case {
    pub when: Expr,
    pub then: Expr,
}

impl Case {
    pub fn new(when: impl Into<Expr>, then: impl Into<Expr>) -> Self {
        Self {
            when: when.into(),
            then: then.into(),
        }
    }
}

/// Expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A bare scalar. Inlined as a literal, except text and JSON which are
    /// always bound as parameters.
    Literal(ScalarValue),

    /// A wrapped value, always bound as a parameter. `None` is an absent value:
    /// neutral in ignore mode, an error otherwise.
    Value(Option<ScalarValue>),

    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    IsTrue(Box<Expr>),
    IsFalse(Box<Expr>),

    /// Variadic arithmetic. Neutral operands are skipped in ignore mode.
    Arithmetic(ArithmeticOp, Vec<Expr>),
    Concat(Vec<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),

    /// Binary comparison, all-or-nothing. `cast` is appended to the
    /// parenthesized comparison, e.g. `(data ->> $1)::INTEGER`.
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
        cast: Option<String>,
    },

    /// Value against a list. Neutral list items are skipped in ignore mode; a
    /// single survivor collapses to the scalar operator.
    ListCompare {
        op: ListOp,
        value: Box<Expr>,
        list: Vec<Expr>,
    },

    Between {
        value: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },

    /// Function call, all-or-nothing over its arguments.
    Function {
        name: String,
        args: Vec<Expr>,
        cast: Option<String>,
    },

    Switch {
        cases: Vec<Case>,
        otherwise: Option<Box<Expr>>,
    },

    /// Quoted, qualified column reference. Never parameterized.
    Column(String),

    Raw(RawSql),
    Subquery(QueryRef),
    Exists(QueryRef),

    /// Resolve `primary` in ignore mode; if it is neutral, resolve `fallback`
    /// with ignore mode off.
    Ignore {
        primary: Box<Expr>,
        fallback: Box<Expr>,
    },
}

impl Expr {
    // ========== Leaves ==========

    /// A bound value: `$n`.
    pub fn value(v: impl Into<ScalarValue>) -> Self {
        Expr::Value(Some(v.into()))
    }

    /// A bound value that may be absent.
    pub fn maybe<T: Into<ScalarValue>>(v: Option<T>) -> Self {
        Expr::Value(v.map(Into::into))
    }

    /// An absent value.
    pub fn absent() -> Self {
        Expr::Value(None)
    }

    /// A bare scalar (see [`Expr::Literal`]).
    pub fn literal(v: impl Into<ScalarValue>) -> Self {
        Expr::Literal(v.into())
    }

    /// A column reference from already-quoted SQL text.
    pub fn column(sql: impl Into<String>) -> Self {
        Expr::Column(sql.into())
    }

    /// An alias-qualified column reference: `"alias"."title"`.
    pub fn aliased_column(alias: &str, title: &str) -> Self {
        Expr::Column(format!("{}.{}", quote_ident(alias), quote_ident(title)))
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(RawSql::Text(sql.into()))
    }

    /// Raw SQL produced by a callback that mints its own placeholders.
    pub fn raw_with<F>(f: F) -> Self
    where
        F: Fn(usize) -> ResolveResult<Fragment> + Send + Sync + 'static,
    {
        Expr::Raw(RawSql::Callback(Arc::new(f)))
    }

    pub fn subquery<Q: NestedQuery + 'static>(query: Q) -> Self {
        Expr::Subquery(QueryRef::new(query))
    }

    pub fn exists<Q: NestedQuery + 'static>(query: Q) -> Self {
        Expr::Exists(QueryRef::new(query))
    }

    // ========== Unary ==========

    pub fn not(expr: impl Into<Expr>) -> Self {
        Expr::Not(Box::new(expr.into()))
    }

    pub fn is_null(expr: impl Into<Expr>) -> Self {
        Expr::IsNull(Box::new(expr.into()))
    }

    pub fn is_not_null(expr: impl Into<Expr>) -> Self {
        Expr::IsNotNull(Box::new(expr.into()))
    }

    pub fn is_true(expr: impl Into<Expr>) -> Self {
        Expr::IsTrue(Box::new(expr.into()))
    }

    pub fn is_false(expr: impl Into<Expr>) -> Self {
        Expr::IsFalse(Box::new(expr.into()))
    }

    // ========== Variadic ==========

    pub fn arithmetic(op: ArithmeticOp, operands: Vec<Expr>) -> Self {
        Expr::Arithmetic(op, operands)
    }

    pub fn sum(operands: Vec<Expr>) -> Self {
        Expr::Arithmetic(ArithmeticOp::Add, operands)
    }

    pub fn difference(operands: Vec<Expr>) -> Self {
        Expr::Arithmetic(ArithmeticOp::Subtract, operands)
    }

    pub fn product(operands: Vec<Expr>) -> Self {
        Expr::Arithmetic(ArithmeticOp::Multiply, operands)
    }

    pub fn quotient(operands: Vec<Expr>) -> Self {
        Expr::Arithmetic(ArithmeticOp::Divide, operands)
    }

    pub fn power(operands: Vec<Expr>) -> Self {
        Expr::Arithmetic(ArithmeticOp::Power, operands)
    }

    pub fn concat(operands: Vec<Expr>) -> Self {
        Expr::Concat(operands)
    }

    pub fn and(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    pub fn or(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    // ========== Binary ==========

    pub fn compare(op: CompareOp, left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left.into()),
            right: Box::new(right.into()),
            cast: None,
        }
    }

    /// A comparison whose result is cast, e.g. `(data ->> $1)::INTEGER`.
    pub fn compare_cast(
        op: CompareOp,
        left: impl Into<Expr>,
        right: impl Into<Expr>,
        cast: impl Into<String>,
    ) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left.into()),
            right: Box::new(right.into()),
            cast: Some(cast.into()),
        }
    }

    pub fn eq(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::compare(CompareOp::Eq, left, right)
    }

    pub fn ne(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::compare(CompareOp::Ne, left, right)
    }

    pub fn gt(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::compare(CompareOp::Gt, left, right)
    }

    pub fn gte(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::compare(CompareOp::Gte, left, right)
    }

    pub fn lt(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::compare(CompareOp::Lt, left, right)
    }

    pub fn lte(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::compare(CompareOp::Lte, left, right)
    }

    pub fn like(left: impl Into<Expr>, pattern: impl Into<Expr>) -> Self {
        Self::compare(CompareOp::Like, left, pattern)
    }

    // ========== Lists ==========

    pub fn list_compare(op: ListOp, value: impl Into<Expr>, list: Vec<Expr>) -> Self {
        Expr::ListCompare {
            op,
            value: Box::new(value.into()),
            list,
        }
    }

    pub fn in_list(value: impl Into<Expr>, list: Vec<Expr>) -> Self {
        Self::list_compare(ListOp::In, value, list)
    }

    pub fn not_in(value: impl Into<Expr>, list: Vec<Expr>) -> Self {
        Self::list_compare(ListOp::NotIn, value, list)
    }

    pub fn like_all(value: impl Into<Expr>, patterns: Vec<Expr>) -> Self {
        Self::list_compare(ListOp::LikeAll, value, patterns)
    }

    pub fn like_some(value: impl Into<Expr>, patterns: Vec<Expr>) -> Self {
        Self::list_compare(ListOp::LikeSome, value, patterns)
    }

    pub fn between(value: impl Into<Expr>, low: impl Into<Expr>, high: impl Into<Expr>) -> Self {
        Expr::Between {
            value: Box::new(value.into()),
            low: Box::new(low.into()),
            high: Box::new(high.into()),
        }
    }

    // ========== Calls ==========

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
            cast: None,
        }
    }

    /// A function call followed by a verbatim cast suffix such as `::TEXT`.
    pub fn function_cast(name: impl Into<String>, args: Vec<Expr>, cast: impl Into<String>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
            cast: Some(cast.into()),
        }
    }

    pub fn switch(cases: Vec<Case>, otherwise: Option<Expr>) -> Self {
        Expr::Switch {
            cases,
            otherwise: otherwise.map(Box::new),
        }
    }

    pub fn ignore(primary: impl Into<Expr>, fallback: impl Into<Expr>) -> Self {
        Expr::Ignore {
            primary: Box::new(primary.into()),
            fallback: Box::new(fallback.into()),
        }
    }
}

// Bare Rust scalars become literals.

impl From<ScalarValue> for Expr {
    fn from(v: ScalarValue) -> Self {
        Expr::Literal(v)
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<i128> for Expr {
    fn from(v: i128) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<Decimal> for Expr {
    fn from(v: Decimal) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<String> for Expr {
    fn from(v: String) -> Self {
        Expr::Literal(v.into())
    }
}

impl From<DateTime<Utc>> for Expr {
    fn from(v: DateTime<Utc>) -> Self {
        Expr::Literal(v.into())
    }
}

/// Lists and objects with no node shape of their own are JSON values.
impl From<serde_json::Value> for Expr {
    fn from(v: serde_json::Value) -> Self {
        Expr::Literal(v.into())
    }
}
