//! Round trips against a real database. Skipped unless `DATABASE_URL` is set.

use pgexpr::{
    Catalog, Column, Expr, GenericClient, Reference, SqlType, Table, TableId, resolve, sync,
};
use tokio_postgres::NoTls;

async fn try_connect() -> Option<tokio_postgres::Client> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    Some(client)
}

fn catalog(schema: &str) -> (Catalog, TableId, TableId) {
    let mut catalog = Catalog::new();
    let authors = catalog
        .add(
            Table::new(schema, "authors")
                .column(Column::new("id", SqlType::Integer).primary().auto_increment())
                .column(Column::new("name", SqlType::Text).not_null())
                .column(Column::new("meta", SqlType::Jsonb)),
        )
        .unwrap();
    let books = catalog
        .add(
            Table::new(schema, "books")
                .column(Column::new("id", SqlType::BigInt).primary().auto_increment())
                .column(
                    Column::new("author", SqlType::Integer)
                        .not_null()
                        .references(Reference::new(authors, "id")),
                )
                .column(Column::new("price", SqlType::Numeric))
                .column(Column::new("published", SqlType::TimestampTz)),
        )
        .unwrap();
    (catalog, authors, books)
}

#[tokio::test]
async fn create_insert_filter_drop() {
    let Some(mut client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };

    let schema = "pgexpr_live_ddl";
    client
        .batch_execute(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE; CREATE SCHEMA {schema}"))
        .await
        .unwrap();

    let (catalog, authors, books) = catalog(schema);
    let created = sync::create_all(&mut client, &catalog, &[books]).await.unwrap();
    assert_eq!(created, 4);

    let insert = pgexpr::Fragment::new(
        format!(r#"INSERT INTO "{schema}"."authors"("name", "meta") VALUES ($1, $2) RETURNING "id""#),
        vec![
            pgexpr::ParamValue::Text("Ursula".into()),
            pgexpr::ParamValue::Text(r#"{"genre":"sf"}"#.into()),
        ],
    );
    let rows = client.query_fragment(&insert).await.unwrap();
    let author_id: i32 = rows[0].get(0);

    let insert = pgexpr::Fragment::new(
        format!(
            r#"INSERT INTO "{schema}"."books"("author", "price", "published") VALUES ($1, $2, $3)"#
        ),
        vec![
            pgexpr::ParamValue::Int(i64::from(author_id)),
            pgexpr::ParamValue::Text("12.50".into()),
            pgexpr::ParamValue::Text("2024-01-02T03:04:05.000Z".into()),
        ],
    );
    assert_eq!(client.execute_fragment(&insert).await.unwrap(), 1);

    let price = catalog.column_expr(books, "price").unwrap();
    let meta = catalog.column_expr(authors, "meta").unwrap();
    let filter = Expr::and(vec![
        Expr::gte(price, Expr::value(rust_decimal::Decimal::new(10, 0))),
        Expr::exists(move |cursor: usize| -> pgexpr::ResolveResult<pgexpr::Fragment> {
            let inner = Expr::compare(
                pgexpr::CompareOp::JsonContains,
                meta.clone(),
                Expr::value(serde_json::json!({"genre": "sf"})),
            );
            let f = resolve(&inner, cursor, false)?
                .into_fragment()
                .ok_or_else(pgexpr::ResolveError::neutral)?;
            Ok(pgexpr::Fragment::new(
                format!(
                    r#"SELECT 1 FROM "pgexpr_live_ddl"."authors" WHERE "authors"."id" = "books"."author" AND {}"#,
                    f.sql
                ),
                f.params,
            ))
        }),
        Expr::lt(Expr::column(r#""books"."published""#), Expr::absent()),
    ]);
    let clause = resolve(&filter, 1, true).unwrap().into_fragment().unwrap();
    let select = pgexpr::Fragment::new(
        format!(
            r#"SELECT count(*) FROM "{schema}"."books" WHERE {}"#,
            clause.sql
        ),
        clause.params,
    );
    let rows = client.query_fragment(&select).await.unwrap();
    let count: i64 = rows[0].get(0);
    assert_eq!(count, 1);

    let dropped = sync::drop_all(&mut client, &catalog, &[books]).await.unwrap();
    assert_eq!(dropped, 4);

    client
        .batch_execute(&format!("DROP SCHEMA {schema} CASCADE"))
        .await
        .unwrap();
}
