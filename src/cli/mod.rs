mod pipelinerun;
mod taskrun;

use std::io::Write;

use anyhow::{Result, anyhow, bail};
use console::style;
use tracing::debug;

use crate::core::clock::{Clock, SystemClock};
use crate::core::config::Config;
use crate::core::error::ResultsError;
use crate::core::terminal::Decor;
use crate::interfaces::results::{HttpResultsStore, ResultsStore};

pub(crate) const DEFAULT_NAMESPACE: &str = "default";

fn print_help() {
    println!(
        "\n {} {} [global flags] <resource> <command> [flags]\n",
        style("Usage:").bold(),
        style("results").green()
    );

    println!(" {}", style("TaskRuns (taskrun, taskruns, tr)").bold().cyan());
    println!("   list, ls           List TaskRuns in a namespace");
    println!("   describe NAME      Describe the latest TaskRun named NAME");
    println!("   logs, log NAME     Show the logs of the latest TaskRun named NAME");
    println!();
    println!(" {}", style("PipelineRuns (pipelinerun, pipelineruns, pr)").bold().cyan());
    println!("   list, ls           List PipelineRuns in a namespace");
    println!();
    println!(" {}", style("Command flags").bold().cyan());
    println!("   -n, --namespace NS Namespace to look in (default: \"default\")");
    println!("   -l, --limit N      Maximum number of runs to list (default: 0, no limit)");
    println!();
    println!(" {}", style("Global flags").bold().cyan());
    println!("   --api-url URL      Results API address (env: RESULTS_API_URL)");
    println!("   --timeout SECS     Request timeout in seconds (env: RESULTS_TIMEOUT)");
    println!("   --no-color         Disable colors and icons (env: NO_COLOR)");
    println!("   -v, --verbose      Increase log verbosity, repeatable (env: RESULTS_LOG)");
    println!("   -h, --help         Show this help");
    println!();
}

/// Flags accepted anywhere on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GlobalArgs {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub no_color: bool,
    pub verbosity: u8,
    pub help: bool,
}

impl GlobalArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        if self.no_color {
            config.no_color = true;
        }
    }
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow!(ResultsError::Usage(format!("flag needs an argument: {}", flag))))
}

/// Splits global flags from the rest of the command line, which is
/// returned in order.
pub(crate) fn parse_global_flags(args: &[String]) -> Result<(GlobalArgs, Vec<String>)> {
    let mut globals = GlobalArgs::default();
    let mut rest = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api-url" => {
                globals.api_url = Some(flag_value(args, i, "--api-url")?.to_string());
                i += 2;
            }
            "--timeout" => {
                let raw = flag_value(args, i, "--timeout")?;
                let secs = raw.parse().map_err(|_| {
                    ResultsError::Usage(format!("invalid value '{}' for --timeout", raw))
                })?;
                globals.timeout_secs = Some(secs);
                i += 2;
            }
            "--no-color" => {
                globals.no_color = true;
                i += 1;
            }
            "--verbose" => {
                globals.verbosity = globals.verbosity.saturating_add(1);
                i += 1;
            }
            "--help" | "-h" => {
                globals.help = true;
                i += 1;
            }
            flag if flag.len() > 1 && flag.starts_with('-') && flag[1..].chars().all(|c| c == 'v') => {
                let count = u8::try_from(flag.len() - 1).unwrap_or(u8::MAX);
                globals.verbosity = globals.verbosity.saturating_add(count);
                i += 1;
            }
            _ => {
                rest.push(args[i].clone());
                i += 1;
            }
        }
    }
    Ok((globals, rest))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListArgs {
    pub namespace: String,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TargetArgs {
    pub name: String,
    pub namespace: String,
}

pub(crate) fn parse_list_args(args: &[String], start: usize) -> Result<ListArgs> {
    let mut namespace = DEFAULT_NAMESPACE.to_string();
    let mut limit = 0;
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--namespace" | "-n" => {
                namespace = flag_value(args, i, "--namespace")?.to_string();
                i += 2;
            }
            "--limit" | "-l" => {
                let raw = flag_value(args, i, "--limit")?;
                limit = raw.parse().map_err(|_| {
                    ResultsError::Usage(format!("invalid value '{}' for --limit", raw))
                })?;
                i += 2;
            }
            other => bail!(ResultsError::Usage(format!("unexpected argument '{}'", other))),
        }
    }
    Ok(ListArgs { namespace, limit })
}

pub(crate) fn parse_target_args(args: &[String], start: usize, kind: &str) -> Result<TargetArgs> {
    let mut namespace = DEFAULT_NAMESPACE.to_string();
    let mut name: Option<String> = None;
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--namespace" | "-n" => {
                namespace = flag_value(args, i, "--namespace")?.to_string();
                i += 2;
            }
            flag if flag.starts_with('-') => {
                bail!(ResultsError::Usage(format!("unknown flag '{}'", flag)))
            }
            positional => {
                if name.is_some() {
                    bail!(ResultsError::Usage(format!(
                        "unexpected argument '{}'",
                        positional
                    )));
                }
                name = Some(positional.to_string());
                i += 1;
            }
        }
    }
    let name = name.ok_or_else(|| ResultsError::Usage(format!("a {} name is required", kind)))?;
    Ok(TargetArgs { name, namespace })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    TaskRunList(ListArgs),
    TaskRunDescribe(TargetArgs),
    TaskRunLogs(TargetArgs),
    PipelineRunList(ListArgs),
}

pub(crate) fn parse_command(args: &[String]) -> Result<Command> {
    let resource = args.first().map(String::as_str).unwrap_or_default();
    let verb = args.get(1).map(String::as_str).unwrap_or_default();
    match resource {
        "taskrun" | "taskruns" | "tr" => match verb {
            "list" | "ls" => Ok(Command::TaskRunList(parse_list_args(args, 2)?)),
            "describe" => Ok(Command::TaskRunDescribe(parse_target_args(args, 2, "TaskRun")?)),
            "logs" | "log" => Ok(Command::TaskRunLogs(parse_target_args(args, 2, "TaskRun")?)),
            "" => bail!(ResultsError::Usage(
                "missing taskrun command, expected one of: list, describe, logs".to_string()
            )),
            other => bail!(ResultsError::Usage(format!("unknown taskrun command '{}'", other))),
        },
        "pipelinerun" | "pipelineruns" | "pr" => match verb {
            "list" | "ls" => Ok(Command::PipelineRunList(parse_list_args(args, 2)?)),
            "" => bail!(ResultsError::Usage(
                "missing pipelinerun command, expected: list".to_string()
            )),
            other => bail!(ResultsError::Usage(format!(
                "unknown pipelinerun command '{}'",
                other
            ))),
        },
        other => bail!(ResultsError::Usage(format!("unknown resource '{}'", other))),
    }
}

/// Everything a command needs besides its own arguments.
pub(crate) struct Context<'a> {
    pub store: &'a dyn ResultsStore,
    pub clock: &'a dyn Clock,
    pub decor: Decor,
}

/// Runs a command to completion and returns its full output. Nothing is
/// printed here, so a failing command never leaves partial output.
pub(crate) async fn execute(ctx: &Context<'_>, command: &Command) -> Result<Vec<u8>> {
    let output = match command {
        Command::TaskRunList(args) => taskrun::list(ctx, args).await?.into_bytes(),
        Command::TaskRunDescribe(args) => taskrun::describe(ctx, args).await?.into_bytes(),
        Command::TaskRunLogs(args) => taskrun::logs(ctx, args).await?,
        Command::PipelineRunList(args) => pipelinerun::list(ctx, args).await?.into_bytes(),
    };
    Ok(output)
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (globals, rest) = parse_global_flags(&args)?;
    crate::logging::init(globals.verbosity);

    if globals.help || rest.is_empty() {
        print_help();
        return Ok(());
    }

    let command = parse_command(&rest)?;

    let mut config = Config::load()?;
    globals.apply(&mut config);
    debug!(api_url = %config.api_url, timeout_secs = config.timeout_secs, "configured");

    let store = HttpResultsStore::new(&config.api_url, config.timeout())?;
    let ctx = Context {
        store: &store,
        clock: &SystemClock,
        decor: Decor::detect(config.no_color),
    };
    let output = execute(&ctx, &command).await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&output)?;
    stdout.flush()?;
    Ok(())
}
