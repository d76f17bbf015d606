// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod commands;
mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use commands::{Command, parse_assignment, parse_kind, parse_sort};
use config::Config;
use pipecfg_app::{PageSize, SortDirection};
use runtime::Backend;
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_ENV: &str = "PIPECFG_LOG";

fn main() {
    init_tracing();
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `pipecfg --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    let page_size = config.page_size()?;

    let backend = Backend::open(&config, &options.config_path, options.demo)?;
    if options.check_only {
        backend.check()?;
        println!("ok: {}", backend.describe());
        return Ok(());
    }

    let stdout = io::stdout();
    let stdin = io::stdin();
    commands::run(
        &options.command,
        &backend,
        page_size,
        &mut stdout.lock(),
        &mut stdin.lock(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    show_help: bool,
    command: Command,
}

#[derive(Debug, Default)]
struct CommandFlags {
    filter: Option<String>,
    sort: Option<(String, SortDirection)>,
    page: Option<usize>,
    size: Option<PageSize>,
    assume_yes: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut config_path = default_config_path;
    let mut print_config_path = false;
    let mut print_example = false;
    let mut demo = false;
    let mut check_only = false;
    let mut show_help = false;
    let mut flags = CommandFlags::default();
    let mut positionals = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let arg = arg.as_ref();
        let mut value_for = |flag: &str, what: &str| {
            iter.next()
                .map(|value| value.as_ref().to_owned())
                .ok_or_else(|| anyhow!("{flag} requires {what}"))
        };
        match arg {
            "--config" => {
                config_path = PathBuf::from(value_for("--config", "a file path")?);
            }
            "--print-config-path" => print_config_path = true,
            "--print-example-config" => print_example = true,
            "--demo" => demo = true,
            "--check" => check_only = true,
            "--help" | "-h" => show_help = true,
            "--filter" => flags.filter = Some(value_for("--filter", "a pattern")?),
            "--sort" => {
                flags.sort = Some(parse_sort(&value_for("--sort", "a column")?)?);
            }
            "--page" => {
                let raw = value_for("--page", "a page number")?;
                let page: usize = raw
                    .parse()
                    .ok()
                    .filter(|page| *page > 0)
                    .ok_or_else(|| anyhow!("--page expects a number from 1, got {raw:?}"))?;
                flags.page = Some(page);
            }
            "--size" => {
                let raw = value_for("--size", "a row count or \"all\"")?;
                let size = PageSize::parse(&raw)?;
                if size == PageSize::Rows(0) {
                    bail!("--size must be at least 1 or \"all\"");
                }
                flags.size = Some(size);
            }
            "--yes" | "-y" => flags.assume_yes = true,
            unknown if unknown.starts_with('-') && unknown.len() > 1 => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
            positional => positionals.push(positional.to_owned()),
        }
    }

    let command = build_command(&positionals, flags)?;
    Ok(CliOptions {
        config_path,
        print_config_path,
        print_example,
        demo,
        check_only,
        show_help,
        command,
    })
}

fn build_command(positionals: &[String], flags: CommandFlags) -> Result<Command> {
    let Some((name, rest)) = positionals.split_first() else {
        reject_list_flags("kinds", &flags)?;
        return Ok(Command::Kinds);
    };

    let command = match name.as_str() {
        "kinds" => {
            expect_args("kinds", rest, 0)?;
            Command::Kinds
        }
        "list" => {
            expect_args("list <kind>", rest, 1)?;
            if flags.assume_yes {
                bail!("--yes only applies to delete");
            }
            return Ok(Command::List {
                kind: parse_kind(&rest[0])?,
                filter: flags.filter,
                sort: flags.sort,
                page: flags.page.unwrap_or(1),
                size: flags.size,
            });
        }
        "show" => {
            expect_args("show <kind> <id>", rest, 2)?;
            Command::Show {
                kind: parse_kind(&rest[0])?,
                id: rest[1].clone(),
            }
        }
        "create" => {
            let (kind, assignments) = rest
                .split_first()
                .ok_or_else(|| anyhow!("usage: pipecfg create <kind> Field=value..."))?;
            Command::Create {
                kind: parse_kind(kind)?,
                assignments: assignments
                    .iter()
                    .map(|raw| parse_assignment(raw))
                    .collect::<Result<_>>()?,
            }
        }
        "update" => {
            if rest.len() < 3 {
                bail!("usage: pipecfg update <kind> <id> Field=value...");
            }
            Command::Update {
                kind: parse_kind(&rest[0])?,
                id: rest[1].clone(),
                assignments: rest[2..]
                    .iter()
                    .map(|raw| parse_assignment(raw))
                    .collect::<Result<_>>()?,
            }
        }
        "delete" => {
            expect_args("delete <kind> <id>", rest, 2)?;
            reject_list_flags("delete", &flags)?;
            return Ok(Command::Delete {
                kind: parse_kind(&rest[0])?,
                id: rest[1].clone(),
                assume_yes: flags.assume_yes,
            });
        }
        other => bail!("unknown command {other:?}; run with --help to see supported commands"),
    };

    reject_list_flags(name, &flags)?;
    if flags.assume_yes {
        bail!("--yes only applies to delete");
    }
    Ok(command)
}

fn expect_args(usage: &str, rest: &[String], count: usize) -> Result<()> {
    if rest.len() != count {
        bail!("usage: pipecfg {usage}");
    }
    Ok(())
}

fn reject_list_flags(command: &str, flags: &CommandFlags) -> Result<()> {
    if flags.filter.is_some() || flags.sort.is_some() || flags.page.is_some() || flags.size.is_some()
    {
        bail!("--filter, --sort, --page and --size only apply to list, not {command}");
    }
    Ok(())
}

fn print_help() {
    println!("pipecfg: manage monitoring pipeline configuration");
    println!();
    println!("usage: pipecfg [options] [command]");
    println!();
    println!("commands:");
    println!("  kinds                              Entity kinds and record counts (default)");
    println!("  list <kind>                        Filtered, sorted, paged table");
    println!("  show <kind> <id>                   One record, field by field");
    println!("  create <kind> Field=value...       Create a record");
    println!("  update <kind> <id> Field=value...  Change fields of a record");
    println!("  delete <kind> <id>                 Show what references a record, then delete");
    println!();
    println!("options:");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Use seeded demo data (in-memory)");
    println!("  --check                  Validate config and reach the backend");
    println!("  --filter <pattern>       list: regex, or literal text if not a valid regex");
    println!("  --sort <col>[:asc|desc]  list: sort column and direction");
    println!("  --page <n>               list: 1-based page number");
    println!("  --size <n|all>           list: rows per page");
    println!("  --yes, -y                delete: skip the confirmation prompt");
    println!("  --help                   Show this help");
    println!();
    println!("kinds: device, metric, measurement, filter, group, server");
    println!("logging: set {LOG_ENV} (for example {LOG_ENV}=debug)");
}
