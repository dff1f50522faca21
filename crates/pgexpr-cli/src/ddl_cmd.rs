use crate::cli::{DdlAction, DdlArgs};
use crate::config::ProjectConfig;
use crate::db::connect_db;

pub async fn run(args: DdlArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let project = ProjectConfig::load(args.config.clone())?;
    let (catalog, tables) = project.file.build_catalog()?;

    let statements = match args.action {
        DdlAction::Create => pgexpr::create_statements(&catalog, &tables)?,
        DdlAction::Drop => pgexpr::drop_statements(&catalog, &tables)?,
    };

    if !args.apply {
        for sql in &statements {
            println!("{sql};");
        }
        return Ok(());
    }

    let database_url = args
        .database
        .or_else(|| project.file.database.as_ref().map(|db| db.url.clone()))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no database url: pass --database or set database.url in {}",
                project.config_path.display()
            )
        })?;

    let mut client = connect_db(&database_url).await?;
    let applied = pgexpr::sync::apply(&mut client, &statements).await?;
    println!("applied {applied} statements");

    Ok(())
}
