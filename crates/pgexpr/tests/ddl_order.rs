//! Table ordering and DDL batches over a small shop schema.

use pgexpr::{
    Catalog, Column, DependencyError, Reference, ReferenceAction, SqlType, Table, TableId,
    create_order, create_statements, drop_order, drop_statements,
};
use std::collections::HashMap;

struct Shop {
    catalog: Catalog,
    customers: TableId,
    products: TableId,
    orders: TableId,
    order_items: TableId,
    reviews: TableId,
}

fn id_column() -> Column {
    Column::new("id", SqlType::Integer).primary().auto_increment()
}

fn fk(key: &str, table: TableId) -> Column {
    Column::new(key, SqlType::Integer)
        .not_null()
        .references(Reference::new(table, "id").on_delete(ReferenceAction::Cascade))
}

fn shop() -> Shop {
    let mut catalog = Catalog::new();
    let customers = catalog
        .add(
            Table::new("shop", "customers")
                .column(id_column())
                .column(Column::new("email", SqlType::Varchar(Some(255))).not_null()),
        )
        .unwrap();
    let products = catalog
        .add(
            Table::new("shop", "products")
                .column(id_column())
                .column(Column::new("price", SqlType::Numeric).not_null().default_value(0i64)),
        )
        .unwrap();
    let orders = catalog
        .add(
            Table::new("shop", "orders")
                .column(id_column())
                .column(fk("customer", customers))
                .column(Column::new("placed_at", SqlType::TimestampTz).created_at()),
        )
        .unwrap();
    let order_items = catalog
        .add(
            Table::new("shop", "order_items")
                .column(fk("order", orders).primary())
                .column(fk("product", products).primary())
                .column(Column::new("quantity", SqlType::SmallInt).not_null()),
        )
        .unwrap();
    let reviews = catalog
        .add(
            Table::new("shop", "reviews")
                .column(id_column())
                .column(fk("customer", customers))
                .column(fk("product", products)),
        )
        .unwrap();
    Shop {
        catalog,
        customers,
        products,
        orders,
        order_items,
        reviews,
    }
}

/// Every table appears after every table it references.
fn assert_topological(catalog: &Catalog, order: &[TableId]) {
    let position: HashMap<TableId, usize> =
        order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    for &id in order {
        let table = catalog.table(id).unwrap();
        for reference in table.columns.iter().filter_map(|c| c.reference.as_ref()) {
            if reference.table == id {
                continue;
            }
            assert!(
                position[&reference.table] < position[&id],
                "{} must come after {}",
                table.name,
                catalog.table(reference.table).unwrap().name
            );
        }
    }
}

#[test]
fn create_order_is_topological() {
    let shop = shop();
    let all = [
        shop.reviews,
        shop.order_items,
        shop.orders,
        shop.products,
        shop.customers,
    ];
    let order = create_order(&shop.catalog, &all).unwrap();
    assert_eq!(order.len(), 5);
    assert_topological(&shop.catalog, &order);

    let mut drop = drop_order(&shop.catalog, &all).unwrap();
    drop.reverse();
    assert_eq!(drop, order);
}

#[test]
fn order_is_deterministic() {
    let shop = shop();
    let input = [shop.order_items, shop.reviews];
    let first = create_order(&shop.catalog, &input).unwrap();
    for _ in 0..10 {
        assert_eq!(create_order(&shop.catalog, &input).unwrap(), first);
    }
}

#[test]
fn leaf_input_pulls_in_dependencies() {
    let shop = shop();
    let order = create_order(&shop.catalog, &[shop.order_items]).unwrap();
    assert_eq!(order.len(), 4);
    assert!(order.contains(&shop.customers));
    assert!(!order.contains(&shop.reviews));
    assert_eq!(order.last(), Some(&shop.order_items));
    assert_topological(&shop.catalog, &order);
}

#[test]
fn create_batch_puts_sequences_first() {
    let shop = shop();
    let statements = create_statements(&shop.catalog, &[shop.orders]).unwrap();
    assert_eq!(
        statements,
        vec![
            r#"CREATE SEQUENCE "shop"."customers_id_seq" AS INTEGER"#,
            r#"CREATE SEQUENCE "shop"."orders_id_seq" AS INTEGER"#,
            concat!(
                r#"CREATE TABLE "shop"."customers"("#,
                r#""id" INTEGER DEFAULT nextval('"shop"."customers_id_seq"'::regclass) NOT NULL, "#,
                r#""email" VARCHAR(255) NOT NULL, "#,
                r#"CONSTRAINT "customers_pk" PRIMARY KEY("id"))"#,
            ),
            concat!(
                r#"CREATE TABLE "shop"."orders"("#,
                r#""id" INTEGER DEFAULT nextval('"shop"."orders_id_seq"'::regclass) NOT NULL, "#,
                r#""customer" INTEGER NOT NULL REFERENCES "shop"."customers"("id") ON UPDATE NO ACTION ON DELETE CASCADE, "#,
                r#""placed_at" TIMESTAMPTZ NULL, "#,
                r#"CONSTRAINT "orders_pk" PRIMARY KEY("id"))"#,
            ),
        ]
    );
}

#[test]
fn composite_primary_key() {
    let shop = shop();
    let sql = pgexpr::create_table_sql(&shop.catalog, shop.order_items).unwrap();
    assert!(sql.ends_with(r#"CONSTRAINT "order_items_pk" PRIMARY KEY("order", "product"))"#));
    assert!(pgexpr::create_sequences_sql(shop.catalog.table(shop.order_items).unwrap()).is_empty());
}

#[test]
fn drop_batch_mirrors_create() {
    let shop = shop();
    let create = create_statements(&shop.catalog, &[shop.orders]).unwrap();
    let drop = drop_statements(&shop.catalog, &[shop.orders]).unwrap();
    assert_eq!(
        drop,
        vec![
            r#"DROP TABLE "shop"."orders""#,
            r#"DROP TABLE "shop"."customers""#,
            r#"DROP SEQUENCE "shop"."orders_id_seq""#,
            r#"DROP SEQUENCE "shop"."customers_id_seq""#,
        ]
    );
    assert_eq!(create.len(), drop.len());
}

#[test]
fn cycle_through_three_tables() {
    let mut catalog = Catalog::new();
    let a = catalog
        .add(Table::new("public", "a").column(id_column()).column(Column::new("c", SqlType::Integer)))
        .unwrap();
    let b = catalog
        .add(Table::new("public", "b").column(id_column()).column(fk("a", a)))
        .unwrap();
    let c = catalog
        .add(Table::new("public", "c").column(id_column()).column(fk("b", b)))
        .unwrap();
    catalog.set_reference(a, "c", Reference::new(c, "id")).unwrap();

    let err = create_statements(&catalog, &[a]).unwrap_err();
    assert!(err.is_dependency());
    assert_eq!(
        err.to_string(),
        "Dependency error: circular dependency: public.a -> public.c -> public.b -> public.a"
    );
    assert!(matches!(
        drop_order(&catalog, &[b]),
        Err(DependencyError::Cycle { .. })
    ));
}
