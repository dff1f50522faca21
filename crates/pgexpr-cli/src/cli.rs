use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Ddl,
    Order,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Ddl(DdlArgs),
    Order(OrderArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlAction {
    Create,
    Drop,
}

#[derive(Debug, Clone)]
pub struct DdlArgs {
    pub action: DdlAction,
    pub config: PathBuf,
    pub database: Option<String>,
    pub apply: bool,
}

#[derive(Debug, Clone)]
pub struct OrderArgs {
    pub config: PathBuf,
    pub drop: bool,
}

const DEFAULT_CONFIG: &str = "pgexpr.toml";

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help(HelpTopic::Root)),
        "ddl" => parse_ddl(it.map(|s| s.as_str())),
        "order" => parse_order(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

fn parse_ddl<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut action: Option<DdlAction> = None;
    let mut config = PathBuf::from(DEFAULT_CONFIG);
    let mut database: Option<String> = None;
    let mut apply = false;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Ddl)),
            "create" if action.is_none() => action = Some(DdlAction::Create),
            "drop" if action.is_none() => action = Some(DdlAction::Drop),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--database" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--database requires a value");
                };
                database = Some(v.to_string());
            }
            _ if token.starts_with("--database=") => {
                database = Some(token.trim_start_matches("--database=").to_string());
            }
            "--apply" => apply = true,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    let Some(action) = action else {
        anyhow::bail!("ddl requires a subcommand: create or drop");
    };

    Ok(Command::Ddl(DdlArgs {
        action,
        config,
        database,
        apply,
    }))
}

fn parse_order<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from(DEFAULT_CONFIG);
    let mut drop = false;

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Order)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--drop" => drop = true,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Order(OrderArgs { config, drop }))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
pgexpr - schema DDL and table ordering for pgexpr

USAGE:
  pgexpr <COMMAND> [OPTIONS]

COMMANDS:
  ddl           Print or apply CREATE/DROP statements for the configured tables
  order         Print tables in foreign-key dependency order
  help          Print this message

Run `pgexpr <command> --help` for more."
            );
        }
        HelpTopic::Ddl => {
            println!(
                "\
USAGE:
  pgexpr ddl create [OPTIONS]
  pgexpr ddl drop [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path (default: pgexpr.toml)
  --apply               Execute the statements in one transaction instead of printing them
  --database <URL>      Override database.url from config
  -h, --help            Print help"
            );
        }
        HelpTopic::Order => {
            println!(
                "\
USAGE:
  pgexpr order [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path (default: pgexpr.toml)
  --drop                Print drop order instead of create order
  -h, --help            Print help"
            );
        }
    }
}
