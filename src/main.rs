mod debug_report;

use std::io::{self, IsTerminal};
use std::sync::Arc;

use hostsort::{
    Context, FolderPool, HostContext, MemoryHostStore, MemoryPoolStore, PoolAllocator, PoolStore,
    RuleBook, RuleSet, resolve_host_verbose,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Rules file shape: the three rule families plus the pool inventory.
#[derive(Debug, Default, Deserialize)]
struct RulesFile {
    #[serde(flatten)]
    book: RuleBook,
    #[serde(default)]
    pools: Vec<FolderPool>,
}

fn run(config: &CliConfig) -> Result<(), String> {
    let rules_file: RulesFile = load_json(&config.rules_path)?;
    let hosts: Vec<HostContext> = load_json(&config.hosts_path)?;

    let rules = RuleSet::compile(rules_file.book).map_err(|err| err.to_string())?;
    let pool_store = Arc::new(MemoryPoolStore::new(rules_file.pools));
    let allocator = PoolAllocator::new(pool_store.clone());
    let host_store = MemoryHostStore::new(hosts.clone());
    let ctx = Context { allocator: &allocator, hosts: Some(&host_store) };

    for host in &hosts {
        if let Some(only) = &config.host_filter {
            if &host.hostname != only {
                continue;
            }
        }
        let verbose = resolve_host_verbose(host, &rules, &ctx).map_err(|err| err.to_string())?;
        debug_report::print_host(&verbose, config.color);
    }

    debug_report::print_pools(&pool_store.list(), config.color);
    Ok(())
}

fn load_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, String> {
    let raw = std::fs::read_to_string(path).map_err(|err| format!("failed to read '{path}': {err}"))?;
    serde_json::from_str(&raw).map_err(|err| format!("failed to parse '{path}': {err}"))
}

struct CliConfig {
    rules_path: String,
    hosts_path: String,
    host_filter: Option<String>,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut rules_path: Option<String> = None;
    let mut hosts_path: Option<String> = None;
    let mut host_filter: Option<String> = None;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("hostsort {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--rules" | "-r" => {
                let value = args.next().ok_or_else(|| "error: --rules expects a value".to_string())?;
                rules_path = Some(value);
            }
            "--hosts" => {
                let value = args.next().ok_or_else(|| "error: --hosts expects a value".to_string())?;
                hosts_path = Some(value);
            }
            "--host" => {
                let value = args.next().ok_or_else(|| "error: --host expects a value".to_string())?;
                host_filter = Some(value);
            }
            _ if arg.starts_with("--rules=") => {
                rules_path = Some(arg.trim_start_matches("--rules=").to_string());
            }
            _ if arg.starts_with("--hosts=") => {
                hosts_path = Some(arg.trim_start_matches("--hosts=").to_string());
            }
            _ if arg.starts_with("--host=") => {
                host_filter = Some(arg.trim_start_matches("--host=").to_string());
            }
            _ => {
                return Err(format!("error: unknown option '{arg}'"));
            }
        }
    }

    let rules_path = rules_path.ok_or_else(|| format!("error: --rules is required\n\n{}", help_text()))?;
    let hosts_path = hosts_path.ok_or_else(|| format!("error: --hosts is required\n\n{}", help_text()))?;

    Ok(CliConfig { rules_path, hosts_path, host_filter, color })
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "hostsort {version}

Rule-evaluation engine debug CLI.

Usage:
  hostsort --rules <file> --hosts <file> [OPTIONS]

Options:
  -r, --rules <file>   Rules file (JSON: actions, labels, params, pools).
  --hosts <file>       Hosts file (JSON array of host contexts).
  --host <name>        Only resolve the named host.
  --color              Force ANSI color output.
  --no-color           Disable ANSI color output.
  -h, --help           Show this help message.
  -V, --version        Print version information.

Exit codes:
  0  Success.
  1  Resolution error (configuration error or exhausted pools).
  2  Invalid arguments or unreadable input.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}
