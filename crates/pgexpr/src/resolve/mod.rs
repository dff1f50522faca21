//! Lowering of [`Expr`] trees into SQL text plus positional parameters.
//!
//! Resolution threads a cursor (the 1-based index the next `$n` placeholder
//! gets) through the tree. Every call returns its own freshly owned parameter
//! list; the caller appends it and advances its cursor by its length. A
//! subtree that turns out neutral or fails therefore never leaves parameters
//! behind.
//!
//! In ignore mode an absent value makes its node [`Resolved::Neutral`]:
//! variadic operators drop neutral operands, all-or-nothing operators become
//! neutral themselves. Outside ignore mode the same situation is an error
//! whose path names every operator and operand on the way down.
//!
//! # Example
//! ```ignore
//! use pgexpr::{Expr, resolve};
//!
//! let expr = Expr::sum(vec![Expr::value(12i64), Expr::value(10i64)]);
//! let fragment = resolve(&expr, 1, false)?.into_fragment().unwrap();
//! assert_eq!(fragment.sql, "($1 + $2)");
//! ```

mod fragment;


pub use fragment::Fragment;

use crate::error::{ResolveError, ResolveResult};
use crate::expr::{ArithmeticOp, Case, CompareOp, Expr, ListOp, QueryRef, RawSql};
use crate::value::{ParamValue, ScalarValue, to_literal, to_param};

/// Outcome of resolving one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// SQL text (never empty) and its parameters.
    Concrete(Fragment),
    /// The node contributes nothing to the statement.
    Neutral,
}

impl Resolved {
    pub fn is_neutral(&self) -> bool {
        matches!(self, Resolved::Neutral)
    }

    pub fn into_fragment(self) -> Option<Fragment> {
        match self {
            Resolved::Concrete(f) => Some(f),
            Resolved::Neutral => None,
        }
    }
}

/// Resolver settings.
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    /// Maximum nesting depth before resolution fails. `None` disables the check.
    pub max_depth: Option<usize>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(256),
        }
    }
}

impl ResolveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum nesting depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Disable the depth check.
    pub fn unlimited_depth(mut self) -> Self {
        self.max_depth = None;
        self
    }
}

/// Resolve `expr` with placeholders starting at `cursor`, using default
/// settings.
pub fn resolve(expr: &Expr, cursor: usize, ignore: bool) -> ResolveResult<Resolved> {
    Resolver::default().resolve(expr, cursor, ignore)
}

/// Expression resolver.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolveConfig,
}

/// Resolved children collected left to right.
struct Parts {
    cursor: usize,
    sql: Vec<String>,
    params: Vec<ParamValue>,
}

impl Parts {
    fn new(cursor: usize) -> Self {
        Self {
            cursor,
            sql: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Cursor for the next child.
    fn next(&self) -> usize {
        self.cursor + self.params.len()
    }

    fn push(&mut self, fragment: Fragment) {
        self.sql.push(fragment.sql);
        self.params.extend(fragment.params);
    }

    fn len(&self) -> usize {
        self.sql.len()
    }

    fn into_single(mut self) -> Fragment {
        let sql = self.sql.pop().unwrap_or_default();
        Fragment::new(sql, self.params)
    }

    fn join(self, sep: &str) -> Fragment {
        Fragment::new(self.sql.join(sep), self.params)
    }
}

fn neutral_or(ignore: bool, err: impl FnOnce() -> ResolveError) -> ResolveResult<Resolved> {
    if ignore {
        Ok(Resolved::Neutral)
    } else {
        Err(err())
    }
}

fn concrete(sql: String, params: Vec<ParamValue>) -> ResolveResult<Resolved> {
    Ok(Resolved::Concrete(Fragment::new(sql, params)))
}

impl Resolver {
    pub fn new(config: ResolveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    /// Resolve `expr` with placeholders starting at `cursor` (1-based).
    pub fn resolve(&self, expr: &Expr, cursor: usize, ignore: bool) -> ResolveResult<Resolved> {
        if cursor == 0 {
            return Err(ResolveError::new("cursor must start at 1"));
        }
        self.node(expr, cursor, ignore, 0)
    }

    /// Resolve `expr` against a caller-owned parameter list: placeholders
    /// continue after the existing parameters, and the new parameters are
    /// appended only when the result is concrete.
    pub fn resolve_into(
        &self,
        expr: &Expr,
        params: &mut Vec<ParamValue>,
        ignore: bool,
    ) -> ResolveResult<Option<String>> {
        match self.resolve(expr, params.len() + 1, ignore)? {
            Resolved::Concrete(fragment) => Ok(Some(fragment.append_to(params))),
            Resolved::Neutral => Ok(None),
        }
    }

    /// Resolve a child: `None` means neutral.
    fn child(
        &self,
        expr: &Expr,
        cursor: usize,
        ignore: bool,
        depth: usize,
    ) -> ResolveResult<Option<Fragment>> {
        Ok(self.node(expr, cursor, ignore, depth)?.into_fragment())
    }

    fn node(&self, expr: &Expr, cursor: usize, ignore: bool, depth: usize) -> ResolveResult<Resolved> {
        if let Some(max) = self.config.max_depth {
            if depth > max {
                return Err(ResolveError::new(format!("depth limit exceeded ({max})")));
            }
        }
        let depth = depth + 1;

        match expr {
            Expr::Literal(value) => Ok(Resolved::Concrete(literal(value, cursor))),
            Expr::Value(Some(value)) => Ok(Resolved::Concrete(Fragment::placeholder(
                cursor,
                to_param(value),
            ))),
            Expr::Value(None) => neutral_or(ignore, ResolveError::undefined),

            Expr::Not(inner) => self.unary("not", inner, cursor, ignore, depth, |x| format!("NOT {x}")),
            Expr::IsNull(inner) => {
                self.unary("is null", inner, cursor, ignore, depth, |x| format!("{x} IS NULL"))
            }
            Expr::IsNotNull(inner) => self.unary("is not null", inner, cursor, ignore, depth, |x| {
                format!("{x} IS NOT NULL")
            }),
            Expr::IsTrue(inner) => self.unary("is true", inner, cursor, ignore, depth, |x| x),
            Expr::IsFalse(inner) => {
                self.unary("is false", inner, cursor, ignore, depth, |x| format!("NOT {x}"))
            }

            Expr::Arithmetic(ArithmeticOp::Power, operands) => {
                self.power(operands, cursor, ignore, depth)
            }
            Expr::Arithmetic(op, operands) => {
                let sep = format!(" {} ", op.sql());
                self.variadic(op.name(), &sep, operands, cursor, ignore, depth)
            }
            Expr::Concat(operands) => self.variadic("concat", " || ", operands, cursor, ignore, depth),
            Expr::And(operands) => self.variadic("and", " AND ", operands, cursor, ignore, depth),
            Expr::Or(operands) => self.variadic("or", " OR ", operands, cursor, ignore, depth),

            Expr::Compare {
                op,
                left,
                right,
                cast,
            } => self.compare(*op, left, right, cast.as_deref(), cursor, ignore, depth),
            Expr::ListCompare { op, value, list } => {
                self.list_compare(*op, value, list, cursor, ignore, depth)
            }
            Expr::Between { value, low, high } => {
                self.between(value, low, high, cursor, ignore, depth)
            }
            Expr::Function { name, args, cast } => {
                self.function(name, args, cast.as_deref(), cursor, ignore, depth)
            }
            Expr::Switch { cases, otherwise } => {
                self.switch(cases, otherwise.as_deref(), cursor, ignore, depth)
            }

            Expr::Column(sql) => {
                if sql.is_empty() {
                    return Err(ResolveError::empty().within("column"));
                }
                concrete(sql.clone(), Vec::new())
            }
            Expr::Raw(raw) => self.raw(raw, cursor, ignore),
            Expr::Subquery(query) => nested("subquery", query, cursor, |sql| format!("({sql})")),
            Expr::Exists(query) => nested("exists", query, cursor, |sql| format!("EXISTS({sql})")),

            Expr::Ignore { primary, fallback } => self.ignore(primary, fallback, cursor, depth),
        }
    }

    fn unary(
        &self,
        name: &'static str,
        inner: &Expr,
        cursor: usize,
        ignore: bool,
        depth: usize,
        wrap: impl FnOnce(String) -> String,
    ) -> ResolveResult<Resolved> {
        match self
            .child(inner, cursor, ignore, depth)
            .map_err(|e| e.within(name))?
        {
            Some(f) => concrete(wrap(f.sql), f.params),
            None => neutral_or(ignore, || ResolveError::neutral().within(name)),
        }
    }

    /// Resolve list items left to right, dropping neutral ones in ignore mode.
    fn filtered(
        &self,
        items: &[Expr],
        cursor: usize,
        ignore: bool,
        depth: usize,
    ) -> ResolveResult<Parts> {
        let mut parts = Parts::new(cursor);
        for (i, item) in items.iter().enumerate() {
            match self
                .child(item, parts.next(), ignore, depth)
                .map_err(|e| e.at(i))?
            {
                Some(f) => parts.push(f),
                None if ignore => {}
                None => return Err(ResolveError::neutral().at(i)),
            }
        }
        Ok(parts)
    }

    fn variadic(
        &self,
        name: &'static str,
        sep: &str,
        operands: &[Expr],
        cursor: usize,
        ignore: bool,
        depth: usize,
    ) -> ResolveResult<Resolved> {
        let parts = self
            .filtered(operands, cursor, ignore, depth)
            .map_err(|e| e.within(name))?;
        match parts.len() {
            0 => neutral_or(ignore, || ResolveError::empty().within(name)),
            1 => Ok(Resolved::Concrete(parts.into_single())),
            _ => {
                let f = parts.join(sep);
                concrete(format!("({})", f.sql), f.params)
            }
        }
    }

    fn power(
        &self,
        operands: &[Expr],
        cursor: usize,
        ignore: bool,
        depth: usize,
    ) -> ResolveResult<Resolved> {
        let name = ArithmeticOp::Power.name();
        let parts = self
            .filtered(operands, cursor, ignore, depth)
            .map_err(|e| e.within(name))?;
        if parts.len() == 0 {
            return neutral_or(ignore, || ResolveError::empty().within(name));
        }
        let Parts { mut sql, params, .. } = parts;
        let mut acc = sql.pop().unwrap_or_default();
        while let Some(base) = sql.pop() {
            acc = format!("POWER({base}, {acc})");
        }
        concrete(acc, params)
    }

    #[allow(clippy::too_many_arguments)]
    fn compare(
        &self,
        op: CompareOp,
        left: &Expr,
        right: &Expr,
        cast: Option<&str>,
        cursor: usize,
        ignore: bool,
        depth: usize,
    ) -> ResolveResult<Resolved> {
        let name = op.name();
        let mut parts = Parts::new(cursor);
        for (operand, expr) in [("left", left), ("right", right)] {
            match self
                .child(expr, parts.next(), ignore, depth)
                .map_err(|e| e.within(operand).within(name))?
            {
                Some(f) => parts.push(f),
                None => {
                    return neutral_or(ignore, || {
                        ResolveError::neutral().within(operand).within(name)
                    });
                }
            }
        }
        let sql = format!("{} {} {}", parts.sql[0], op.sql(), parts.sql[1]);
        let sql = match cast {
            Some(cast) => format!("({sql}){cast}"),
            None => sql,
        };
        concrete(sql, parts.params)
    }

    fn list_compare(
        &self,
        op: ListOp,
        value: &Expr,
        list: &[Expr],
        cursor: usize,
        ignore: bool,
        depth: usize,
    ) -> ResolveResult<Resolved> {
        let name = op.name();
        let value = match self
            .child(value, cursor, ignore, depth)
            .map_err(|e| e.within("value").within(name))?
        {
            Some(f) => f,
            None => {
                return neutral_or(ignore, || ResolveError::neutral().within("value").within(name));
            }
        };

        let items = self
            .filtered(list, cursor + value.params.len(), ignore, depth)
            .map_err(|e| e.within("list").within(name))?;

        let mut params = value.params;
        let sql = match items.len() {
            0 => {
                return neutral_or(ignore, || ResolveError::empty().within("list").within(name));
            }
            1 => {
                let item = items.into_single();
                params.extend(item.params);
                format!("{} {} {}", value.sql, op.scalar().sql(), item.sql)
            }
            _ => {
                let items = items.join(", ");
                params.extend(items.params);
                let (v, list) = (value.sql, items.sql);
                match op {
                    ListOp::In => format!("{v} IN ({list})"),
                    ListOp::NotIn => format!("{v} NOT IN ({list})"),
                    ListOp::LikeAll => format!("{v} LIKE ALL(ARRAY[{list}])"),
                    ListOp::LikeSome => format!("{v} LIKE SOME(ARRAY[{list}])"),
                    ListOp::JsonHasAny => format!("{v} ?| ARRAY[{list}]"),
                    ListOp::JsonHasAll => format!("{v} ?& ARRAY[{list}]"),
                    ListOp::JsonMinusAll => format!("{v} - ARRAY[{list}]"),
                }
            }
        };
        concrete(sql, params)
    }

    fn between(
        &self,
        value: &Expr,
        low: &Expr,
        high: &Expr,
        cursor: usize,
        ignore: bool,
        depth: usize,
    ) -> ResolveResult<Resolved> {
        let mut parts = Parts::new(cursor);
        for (operand, expr) in [("value", value), ("low", low), ("high", high)] {
            match self
                .child(expr, parts.next(), ignore, depth)
                .map_err(|e| e.within(operand).within("between"))?
            {
                Some(f) => parts.push(f),
                None => {
                    return neutral_or(ignore, || {
                        ResolveError::neutral().within(operand).within("between")
                    });
                }
            }
        }
        let sql = format!(
            "{} BETWEEN {} AND {}",
            parts.sql[0], parts.sql[1], parts.sql[2]
        );
        concrete(sql, parts.params)
    }

    fn function(
        &self,
        name: &str,
        args: &[Expr],
        cast: Option<&str>,
        cursor: usize,
        ignore: bool,
        depth: usize,
    ) -> ResolveResult<Resolved> {
        let segment = format!("function {name}");
        let mut parts = Parts::new(cursor);
        for (i, arg) in args.iter().enumerate() {
            match self
                .child(arg, parts.next(), ignore, depth)
                .map_err(|e| e.at(i).within(segment.as_str()))?
            {
                Some(f) => parts.push(f),
                None => return neutral_or(ignore, || ResolveError::neutral().at(i).within(segment)),
            }
        }
        let args = parts.join(", ");
        let sql = format!("{name}({}){}", args.sql, cast.unwrap_or(""));
        concrete(sql, args.params)
    }

    fn switch(
        &self,
        cases: &[Case],
        otherwise: Option<&Expr>,
        cursor: usize,
        ignore: bool,
        depth: usize,
    ) -> ResolveResult<Resolved> {
        const NAME: &str = "switch statement";
        let case_err = |e: ResolveError, i: usize, half: &str| e.within(half).at(i).within("cases").within(NAME);

        let mut arms = Parts::new(cursor);
        for (i, case) in cases.iter().enumerate() {
            let when = match self
                .child(&case.when, arms.next(), ignore, depth)
                .map_err(|e| case_err(e, i, "when"))?
            {
                Some(f) => f,
                None if ignore => continue,
                None => return Err(case_err(ResolveError::neutral(), i, "when")),
            };
            let then = match self
                .child(&case.then, arms.next() + when.params.len(), ignore, depth)
                .map_err(|e| case_err(e, i, "then"))?
            {
                Some(f) => f,
                None if ignore => continue,
                None => return Err(case_err(ResolveError::neutral(), i, "then")),
            };
            let mut params = when.params;
            params.extend(then.params);
            arms.push(Fragment::new(format!("WHEN {} THEN {}", when.sql, then.sql), params));
        }

        let otherwise = match otherwise {
            Some(expr) => self
                .child(expr, arms.next(), ignore, depth)
                .map_err(|e| e.within("otherwise").within(NAME))?,
            None => None,
        };

        match (arms.len(), otherwise) {
            (0, Some(o)) => Ok(Resolved::Concrete(o)),
            (0, None) => neutral_or(ignore, || ResolveError::empty().within(NAME)),
            (_, Some(o)) => {
                let mut f = arms.join(" ");
                f.params.extend(o.params);
                concrete(format!("CASE {} ELSE {} END", f.sql, o.sql), f.params)
            }
            (_, None) => {
                let f = arms.join(" ");
                concrete(format!("CASE {} END", f.sql), f.params)
            }
        }
    }

    fn raw(&self, raw: &RawSql, cursor: usize, ignore: bool) -> ResolveResult<Resolved> {
        let fragment = match raw {
            RawSql::Text(sql) => Fragment::text(sql.clone()),
            RawSql::Callback(f) => f(cursor).map_err(|e| e.within("raw"))?,
        };
        if fragment.sql.is_empty() {
            return neutral_or(ignore, || ResolveError::empty().within("raw"));
        }
        Ok(Resolved::Concrete(fragment))
    }

    fn ignore(
        &self,
        primary: &Expr,
        fallback: &Expr,
        cursor: usize,
        depth: usize,
    ) -> ResolveResult<Resolved> {
        if let Some(f) = self
            .child(primary, cursor, true, depth)
            .map_err(|e| e.within("primary").within("ignore"))?
        {
            return Ok(Resolved::Concrete(f));
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(target: "pgexpr.resolve", cursor, "primary is neutral, resolving fallback");

        match self
            .child(fallback, cursor, false, depth)
            .map_err(|e| e.within("fallback").within("ignore"))?
        {
            Some(f) => Ok(Resolved::Concrete(f)),
            None => Err(ResolveError::neutral().within("fallback").within("ignore")),
        }
    }
}

/// Bare scalars: inline literal, except text and JSON which are bound.
fn literal(value: &ScalarValue, cursor: usize) -> Fragment {
    if value.is_always_bound() {
        Fragment::placeholder(cursor, to_param(value))
    } else {
        Fragment::text(to_literal(value))
    }
}

fn nested(
    name: &'static str,
    query: &QueryRef,
    cursor: usize,
    wrap: impl FnOnce(&str) -> String,
) -> ResolveResult<Resolved> {
    let fragment = query.resolve_query(cursor).map_err(|e| e.within(name))?;
    if fragment.sql.is_empty() {
        return Err(ResolveError::empty().within(name));
    }
    concrete(wrap(&fragment.sql), fragment.params)
}
