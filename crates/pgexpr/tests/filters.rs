//! Composing optional filters the way a statement builder does.

use pgexpr::{
    Case, Catalog, Column, Expr, ParamValue, Resolved, Resolver, SqlType, Table, resolve,
};

#[derive(Default)]
struct UserSearch {
    status: Option<&'static str>,
    min_age: Option<i64>,
    max_age: Option<i64>,
    roles: Vec<&'static str>,
}

fn users() -> (Catalog, pgexpr::TableId) {
    let mut catalog = Catalog::new();
    let id = catalog
        .add(
            Table::new("public", "users")
                .column(Column::new("id", SqlType::BigInt).primary().auto_increment())
                .column(Column::new("status", SqlType::Text).not_null())
                .column(Column::new("age", SqlType::Integer))
                .column(Column::new("role", SqlType::Text)),
        )
        .unwrap();
    (catalog, id)
}

fn search_filter(catalog: &Catalog, table: pgexpr::TableId, search: &UserSearch) -> Expr {
    let col = |key| catalog.column_expr(table, key).unwrap();
    Expr::and(vec![
        Expr::eq(col("status"), Expr::maybe(search.status)),
        Expr::gte(col("age"), Expr::maybe(search.min_age)),
        Expr::lte(col("age"), Expr::maybe(search.max_age)),
        Expr::in_list(
            col("role"),
            search.roles.iter().map(|r| Expr::value(*r)).collect(),
        ),
    ])
}

/// Builds `SELECT ... WHERE ...` the way a statement builder would: the
/// cursor starts after the parameters already bound.
fn select(filter: &Expr, mut params: Vec<ParamValue>) -> (String, Vec<ParamValue>) {
    let mut sql = String::from(r#"SELECT * FROM "public"."users" LIMIT $1"#);
    let resolver = Resolver::default();
    if let Some(clause) = resolver.resolve_into(filter, &mut params, true).unwrap() {
        sql = format!(r#"SELECT * FROM "public"."users" WHERE {clause} LIMIT $1"#);
    }
    (sql, params)
}

#[test]
fn empty_search_drops_where_clause() {
    let (catalog, users) = users();
    let filter = search_filter(&catalog, users, &UserSearch::default());
    assert!(resolve(&filter, 1, true).unwrap().is_neutral());

    let (sql, params) = select(&filter, vec![ParamValue::Int(10)]);
    assert_eq!(sql, r#"SELECT * FROM "public"."users" LIMIT $1"#);
    assert_eq!(params, vec![ParamValue::Int(10)]);
}

#[test]
fn partial_search_keeps_present_clauses() {
    let (catalog, users) = users();
    let search = UserSearch {
        status: Some("active"),
        max_age: Some(65),
        roles: vec!["admin"],
        ..Default::default()
    };
    let filter = search_filter(&catalog, users, &search);
    let (sql, params) = select(&filter, vec![ParamValue::Int(10)]);

    assert_eq!(
        sql,
        concat!(
            r#"SELECT * FROM "public"."users" WHERE ("public"."users"."status" = $2 AND "#,
            r#""public"."users"."age" <= $3 AND "public"."users"."role" = $4) LIMIT $1"#,
        )
    );
    assert_eq!(
        params,
        vec![
            ParamValue::Int(10),
            ParamValue::Text("active".into()),
            ParamValue::Int(65),
            ParamValue::Text("admin".into()),
        ]
    );
}

#[test]
fn strict_mode_reports_missing_operand() {
    let (catalog, users) = users();
    let search = UserSearch {
        status: Some("active"),
        roles: vec!["a", "b"],
        ..Default::default()
    };
    let filter = search_filter(&catalog, users, &search);
    let err = resolve(&filter, 1, false).unwrap_err();
    assert_eq!(err.to_string(), "and -> 1 -> greater or equal -> right -> undefined");
    assert_eq!(err.path()[..3], ["and", "1", "greater or equal"]);
}

#[test]
fn conditional_update_value() {
    // SET "status" = CASE WHEN ... END, with a fallback when no rule applies.
    let (catalog, users) = users();
    let age = catalog.column_expr(users, "age").unwrap();
    let promote_at: Option<i64> = None;

    let value = Expr::ignore(
        Expr::switch(
            vec![
                Case::new(Expr::gte(age.clone(), Expr::maybe(promote_at)), Expr::value("senior")),
                Case::new(Expr::lt(age, Expr::value(18i64)), Expr::value("minor")),
            ],
            None,
        ),
        Expr::raw(r#""status""#),
    );

    match resolve(&value, 2, false).unwrap() {
        Resolved::Concrete(f) => {
            assert_eq!(
                f.sql,
                r#"CASE WHEN "public"."users"."age" < $2 THEN $3 END"#
            );
            assert_eq!(f.params.len(), 2);
        }
        Resolved::Neutral => panic!("ignore node never yields neutral"),
    }
}

#[test]
fn json_filters() {
    let data = Expr::column(r#""e"."data""#);
    let expr = Expr::and(vec![
        Expr::compare(
            pgexpr::CompareOp::JsonContains,
            data.clone(),
            Expr::value(serde_json::json!({"kind": "click"})),
        ),
        Expr::list_compare(
            pgexpr::ListOp::JsonHasAny,
            data,
            vec![Expr::value("x"), Expr::value("y")],
        ),
    ]);
    let f = resolve(&expr, 1, false).unwrap().into_fragment().unwrap();
    assert_eq!(f.sql, r#"("e"."data" @> $1 AND "e"."data" ?| ARRAY[$2, $3])"#);
    assert_eq!(f.params[0], ParamValue::Text(r#"{"kind":"click"}"#.into()));
}
