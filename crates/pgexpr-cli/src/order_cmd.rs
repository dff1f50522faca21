use crate::cli::OrderArgs;
use crate::config::ProjectConfig;

pub fn run(args: OrderArgs) -> anyhow::Result<()> {
    let project = ProjectConfig::load(args.config)?;
    let (catalog, tables) = project.file.build_catalog()?;

    let order = if args.drop {
        pgexpr::drop_order(&catalog, &tables)?
    } else {
        pgexpr::create_order(&catalog, &tables)?
    };

    for line in render(&catalog, &order)? {
        println!("{line}");
    }
    Ok(())
}

fn render(catalog: &pgexpr::Catalog, order: &[pgexpr::TableId]) -> anyhow::Result<Vec<String>> {
    order
        .iter()
        .enumerate()
        .map(|(i, &id)| -> anyhow::Result<String> {
            Ok(format!("{}. {}", i + 1, catalog.table(id)?.display_name()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgexpr::{Catalog, Column, Reference, SqlType, Table};

    #[test]
    fn renders_numbered_lines() {
        let mut catalog = Catalog::new();
        let users = catalog
            .add(Table::new("public", "users").column(Column::new("id", SqlType::Integer).primary()))
            .unwrap();
        let posts = catalog
            .add(
                Table::new("blog", "posts").column(
                    Column::new("author", SqlType::Integer).references(Reference::new(users, "id")),
                ),
            )
            .unwrap();

        let order = pgexpr::create_order(&catalog, &[posts]).unwrap();
        assert_eq!(
            render(&catalog, &order).unwrap(),
            vec!["1. public.users", "2. blog.posts"]
        );
    }
}
