use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::{Path, PathBuf};

use syncopt::config::OptimizerConfig;
use syncopt::error::SyncOptError;
use syncopt::index::{ChecksumIndex, FileDescriptor, RedbChecksumIndex};
use syncopt::logging::{self, *};
use syncopt::optimizer::Pipeline;
use syncopt::round::SyncRound;
use syncopt::storage::{LocalStorage, StorageBackend};

///////////////////////
// Utility functions //
///////////////////////

/// Defaults, then config file, then environment, then CLI flags
fn load_config(matches: &ArgMatches) -> Result<OptimizerConfig, SyncOptError> {
	let mut config = match matches.get_one::<String>("config") {
		Some(path) => OptimizerConfig::load(Path::new(path))?,
		None => OptimizerConfig::default(),
	};
	config.apply_env()?;

	if let Some(user) = matches.get_one::<String>("user") {
		config.user = user.clone();
	}
	if let Some(index) = matches.get_one::<String>("index") {
		config.checksum_index = Some(PathBuf::from(index));
	}
	if let Some(root) = matches.get_one::<String>("storage-root") {
		config.storage_root = Some(PathBuf::from(root));
	}
	if let Some(level) = matches.get_one::<String>("log-level") {
		config.log_level = level.clone();
	}
	Ok(config)
}

/// Open the configured index for maintenance commands, where it is required
fn open_index(config: &OptimizerConfig, command: &str) -> Result<RedbChecksumIndex, SyncOptError> {
	let path = config
		.checksum_index
		.as_deref()
		.ok_or_else(|| format!("{}: no checksum index configured", command))?;
	Ok(RedbChecksumIndex::open(path, &config.user)?)
}

fn required<'m>(matches: &'m ArgMatches, name: &str, command: &str) -> Result<&'m String, SyncOptError> {
	matches
		.get_one::<String>(name)
		.ok_or_else(|| SyncOptError::Other { message: format!("{}: {} required", command, name) })
}

async fn optimize(config: OptimizerConfig, matches: &ArgMatches) -> Result<(), SyncOptError> {
	let input = required(matches, "round", "optimize")?;
	let mut config = config;
	if matches.get_flag("no-renames") {
		config.file_renames = false;
		config.directory_renames = false;
	}
	if matches.get_flag("no-copies") {
		config.copies = false;
	}
	if matches.get_flag("no-ordering") {
		config.ordering = false;
	}

	let round = SyncRound::load(Path::new(input)).await?;
	let index = config
		.checksum_index
		.as_deref()
		.and_then(|path| RedbChecksumIndex::open_for_round(path, &config.user));
	let storage = config.storage_root.as_deref().map(LocalStorage::new);
	if index.is_some() && storage.is_none() {
		warn!("Checksum index configured without a storage root, index lookups disabled");
	}

	let pretty = config.pretty;
	let mut pipeline = Pipeline::new(config);
	if let Some(index) = &index {
		pipeline = pipeline.with_index(index);
	}
	if let Some(storage) = &storage {
		pipeline = pipeline.with_storage(storage);
	}

	let optimized = round.optimize(&pipeline);
	match matches.get_one::<String>("output") {
		Some(output) => {
			optimized.save(Path::new(output), pretty).await?;
			info!("Wrote optimized round to {}", output);
		}
		None => println!("{}", optimized.to_json(pretty)?),
	}
	Ok(())
}

fn index_record(config: &OptimizerConfig, matches: &ArgMatches) -> Result<(), SyncOptError> {
	let index = open_index(config, "index record")?;
	let folder_id = required(matches, "folder", "index record")?;
	let file_id = required(matches, "file", "index record")?;
	let checksum = required(matches, "checksum", "index record")?;
	let name = matches.get_one::<String>("name").unwrap_or(file_id);

	let sequence = match matches.get_one::<String>("sequence") {
		Some(sequence) => sequence
			.parse::<u64>()
			.map_err(|e| format!("index record: invalid sequence {:?}: {}", sequence, e))?,
		None => {
			let root = config
				.storage_root
				.as_deref()
				.ok_or_else(|| "index record: --sequence or a storage root is required".to_string())?;
			LocalStorage::new(root).get_file(folder_id, file_id, None)?.sequence
		}
	};

	let descriptor = FileDescriptor {
		folder_id: folder_id.clone(),
		file_id: file_id.clone(),
		name: name.clone(),
		checksum: checksum.clone(),
		sequence,
	};
	index.record(&descriptor)?;
	info!("Recorded {}/{} as {} (sequence {})", folder_id, file_id, checksum, sequence);
	Ok(())
}

fn index_lookup(config: &OptimizerConfig, matches: &ArgMatches) -> Result<(), SyncOptError> {
	let index = open_index(config, "index lookup")?;
	let checksum = required(matches, "checksum", "index lookup")?;
	for entry in index.find_by_checksum(checksum)? {
		println!("{}/{}\t{}\t{}", entry.folder_id, entry.file_id, entry.name, entry.sequence);
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("syncopt")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Optimizes client/server sync instruction sets")
		.subcommand_required(true)
		.arg(Arg::new("config").short('c').long("config").value_name("FILE").help("Config file"))
		.arg(Arg::new("user").short('u').long("user").value_name("USER").help("Checksum index scope"))
		.arg(Arg::new("index").long("index").value_name("DB").help("Checksum index database"))
		.arg(
			Arg::new("storage-root")
				.long("storage-root")
				.value_name("DIR")
				.help("Local storage backend root"),
		)
		.arg(Arg::new("log-level").long("log-level").value_name("LEVEL").help("Default log level"))
		.subcommand(
			Command::new("optimize")
				.about("Optimize a sync round document")
				.arg(Arg::new("round").required(true))
				.arg(Arg::new("output").short('o').long("output").value_name("FILE"))
				.arg(Arg::new("no-renames").long("no-renames").action(ArgAction::SetTrue))
				.arg(Arg::new("no-copies").long("no-copies").action(ArgAction::SetTrue))
				.arg(Arg::new("no-ordering").long("no-ordering").action(ArgAction::SetTrue)),
		)
		.subcommand(
			Command::new("index")
				.about("Maintain the checksum index")
				.subcommand_required(true)
				.subcommand(
					Command::new("record")
						.about("Record a stored file")
						.arg(Arg::new("folder").long("folder").required(true))
						.arg(Arg::new("file").long("file").required(true))
						.arg(Arg::new("checksum").long("checksum").required(true))
						.arg(Arg::new("name").long("name"))
						.arg(Arg::new("sequence").long("sequence")),
				)
				.subcommand(
					Command::new("lookup")
						.about("List stored files with a checksum")
						.arg(Arg::new("checksum").required(true)),
				),
		)
		.get_matches();

	let config = load_config(&matches)?;
	logging::init_tracing(&config.log_level);
	debug!("Configuration: {:?}", config);

	if let Some(sub_matches) = matches.subcommand_matches("optimize") {
		optimize(config, sub_matches).await?;
	} else if let Some(index_matches) = matches.subcommand_matches("index") {
		if let Some(sub_matches) = index_matches.subcommand_matches("record") {
			index_record(&config, sub_matches)?;
		} else if let Some(sub_matches) = index_matches.subcommand_matches("lookup") {
			index_lookup(&config, sub_matches)?;
		}
	}

	Ok(())
}

// vim: ts=4
