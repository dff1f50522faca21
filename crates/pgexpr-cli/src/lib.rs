mod cli;
mod config;
mod db;
mod ddl_cmd;
mod order_cmd;

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Ddl(args) => ddl_cmd::run(args).await,
        cli::Command::Order(args) => order_cmd::run(args),
    }
}
