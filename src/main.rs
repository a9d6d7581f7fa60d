use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::{env, process};

use podsync::config::Config;
use podsync::engine::{rsh_command, Collaborators, SyncEngine};
use podsync::exec::{BoxedReader, ClusterExecutor, ProcessExecutor, RemoteExecutor};
use podsync::forward::{ClusterPortForwarder, PortForwarder};
use podsync::logging::{init_tracing, LogTarget};
use podsync::pathspec::PathSpec;
use podsync::strategies::StrategyKind;
use podsync::types::{RsyncOptions, TransferRequest};
use podsync::validation::Validator;

fn cli() -> Command {
	Command::new("podsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Copy directories to and from containers, rsync style")
		.subcommand_required(true)
		.arg(
			Arg::new("namespace")
				.short('n')
				.long("namespace")
				.value_name("NAMESPACE")
				.global(true)
				.help("Namespace of the target"),
		)
		.arg(
			Arg::new("context")
				.long("context")
				.value_name("CONTEXT")
				.global(true)
				.help("Cluster context to use"),
		)
		.arg(
			Arg::new("config")
				.long("config")
				.value_name("FILE")
				.value_parser(value_parser!(PathBuf))
				.global(true)
				.help("Config file (default: ~/.config/podsync/config.toml)"),
		)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.action(ArgAction::Count)
				.global(true)
				.help("More log output (repeatable)"),
		)
		.subcommand(
			Command::new("rsync")
				.about("Copy SOURCE to DESTINATION; one of them is TARGET:/path")
				.arg(Arg::new("source").value_name("SOURCE").required(true))
				.arg(Arg::new("destination").value_name("DESTINATION").required(true))
				.arg(
					Arg::new("container")
						.short('c')
						.long("container")
						.value_name("CONTAINER")
						.help("Container within the target"),
				)
				.arg(
					Arg::new("strategy")
						.long("strategy")
						.value_name("STRATEGY")
						.value_parser(|s: &str| StrategyKind::from_str(s))
						.help("Transfer mechanism: rsync, rsync-daemon, tar, or auto/empty to try each in turn"),
				)
				.arg(Arg::new("quiet").short('q').long("quiet").action(ArgAction::SetTrue).help("Suppress per-file output"))
				.arg(
					Arg::new("delete")
						.long("delete")
						.action(ArgAction::SetTrue)
						.help("Delete destination files that are not in the source"),
				)
				.arg(Arg::new("progress").long("progress").action(ArgAction::SetTrue).help("Show transfer progress"))
				.arg(Arg::new("compress").long("compress").action(ArgAction::SetTrue).help("Compress file data in transit"))
				.arg(Arg::new("no-perms").long("no-perms").action(ArgAction::SetTrue).help("Do not transfer permissions"))
				.arg(
					Arg::new("exclude")
						.long("exclude")
						.value_name("PATTERN")
						.action(ArgAction::Append)
						.help("Leave out files matching PATTERN"),
				)
				.arg(
					Arg::new("include")
						.long("include")
						.value_name("PATTERN")
						.action(ArgAction::Append)
						.help("Keep files matching PATTERN even if excluded"),
				),
		)
		.subcommand(
			Command::new("rsh")
				.about("Remote shell for rsync (used internally)")
				.arg(
					Arg::new("container")
						.short('c')
						.long("container")
						.value_name("CONTAINER")
						.help("Container within the target"),
				)
				.arg(Arg::new("target").value_name("TARGET").required(true))
				.arg(
					Arg::new("command")
						.value_name("COMMAND")
						.required(true)
						.num_args(1..)
						.trailing_var_arg(true)
						.allow_hyphen_values(true),
				),
		)
}

/// Config file, then environment, then global CLI flags
fn load_config(matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
	let mut config = Config::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
	if let Some(namespace) = matches.get_one::<String>("namespace") {
		config.cluster.namespace = Some(namespace.clone());
	}
	if let Some(context) = matches.get_one::<String>("context") {
		config.cluster.context = Some(context.clone());
	}
	config.validate()?;
	Ok(config)
}

fn patterns(matches: &ArgMatches, name: &str) -> Vec<String> {
	matches.get_many::<String>(name).map(|values| values.cloned().collect()).unwrap_or_default()
}

async fn run_rsync(config: Config, config_file: Option<&Path>, matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	let source = matches.get_one::<String>("source").ok_or("rsync: SOURCE argument required")?;
	let destination = matches.get_one::<String>("destination").ok_or("rsync: DESTINATION argument required")?;
	let strategy = matches.get_one::<StrategyKind>("strategy").copied().unwrap_or(config.strategy);
	let container = matches.get_one::<String>("container").cloned();

	let options = RsyncOptions {
		progress: matches.get_flag("progress"),
		compress: matches.get_flag("compress"),
		no_perms: matches.get_flag("no-perms"),
		includes: patterns(matches, "include"),
		excludes: patterns(matches, "exclude"),
	};
	let request = TransferRequest::new(PathSpec::parse(source)?, PathSpec::parse(destination)?)
		.delete(matches.get_flag("delete"))
		.quiet(matches.get_flag("quiet"))
		.container(container.clone())
		.options(options);

	let target = request.remote_target().map(str::to_string);
	let remote = target.as_ref().map(|target| {
		Arc::new(ClusterExecutor::new(config.cluster.clone(), target.as_str(), container.clone()))
			as Arc<dyn RemoteExecutor>
	});
	let forwarder = target.as_ref().map(|target| {
		Arc::new(ClusterPortForwarder::new(config.cluster.clone(), target.as_str())) as Arc<dyn PortForwarder>
	});
	let collaborators = Collaborators { local: Some(Arc::new(ProcessExecutor::new())), remote, forwarder };

	let rsh = rsh_command(&env::current_exe()?, &config.cluster, config_file, container.as_deref());
	let engine = SyncEngine::new(config, rsh, collaborators);
	engine.run(&request, strategy).await?;
	Ok(())
}

/// Run COMMAND in TARGET with our stdio, returning its exit code
async fn run_rsh(config: Config, matches: &ArgMatches) -> Result<i32, Box<dyn Error>> {
	let target = matches.get_one::<String>("target").ok_or("rsh: TARGET argument required")?;
	let command: Vec<String> = patterns(matches, "command");
	let container = matches.get_one::<String>("container").cloned();

	let executor = ClusterExecutor::new(config.cluster, target.as_str(), container);
	let stdin: BoxedReader = Box::new(tokio::io::stdin());
	let mut stdout = tokio::io::stdout();
	let mut stderr = tokio::io::stderr();
	match executor.execute(&command, Some(stdin), &mut stdout, &mut stderr).await {
		Ok(()) => Ok(0),
		Err(e) if e.is_exit() => Ok(e.exit_code().unwrap_or(1)),
		Err(e) => Err(e.into()),
	}
}

async fn dispatch(matches: &ArgMatches) -> Result<i32, Box<dyn Error>> {
	let config = load_config(matches)?;
	let verbosity = matches.get_count("verbose");

	if let Some(sub_matches) = matches.subcommand_matches("rsh") {
		// stdout belongs to rsync's protocol stream
		init_tracing(&config.log_level, verbosity, LogTarget::Stderr);
		return run_rsh(config, sub_matches).await;
	} else if let Some(sub_matches) = matches.subcommand_matches("rsync") {
		init_tracing(&config.log_level, verbosity, LogTarget::Split);
		let config_file = matches.get_one::<PathBuf>("config").cloned();
		run_rsync(config, config_file.as_deref(), sub_matches).await?;
	}
	Ok(0)
}

#[tokio::main]
async fn main() {
	let matches = cli().get_matches();
	let code = match dispatch(&matches).await {
		Ok(code) => code,
		Err(e) => {
			eprintln!("Error: {}", e);
			1
		}
	};
	// A pending stdin read would otherwise keep the runtime alive
	process::exit(code);
}


// vim: ts=4
