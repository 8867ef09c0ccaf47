/// Integration tests for round documents: config file + round file in,
/// optimized round file out.
use std::fs;
use tempfile::TempDir;

use syncopt::config::OptimizerConfig;
use syncopt::optimizer::Pipeline;
use syncopt::round::{OptimizedRound, SyncRound};
use syncopt::types::{ActionKind, DriveAction};

const ROUND: &str = r#"{
	"folderId": "docs",
	"serverFiles": [
		{ "name": "logo.png", "checksum": "L" }
	],
	"files": {
		"actionsForServer": [],
		"actionsForClient": [
			{ "action": "upload", "new": { "name": "logo-copy.png", "checksum": "L" },
			  "cause": { "client": "new", "server": "none" } }
		]
	},
	"directories": {
		"actionsForServer": [
			{ "action": "remove", "old": { "path": "/Projects", "checksum": "H1" },
			  "cause": { "client": "deleted", "server": "none" } }
		],
		"actionsForClient": [
			{ "action": "acknowledge", "old": { "path": "/Projects", "checksum": "H1" },
			  "cause": { "client": "deleted", "server": "none" } },
			{ "action": "sync", "new": { "path": "/Work", "checksum": "H1" },
			  "cause": { "client": "new", "server": "none" } }
		]
	}
}"#;

#[tokio::test]
async fn test_round_file_roundtrip_with_config() {
	let tmp = TempDir::new().expect("Failed to create temp dir");
	let config_path = tmp.path().join("syncopt.json5");
	fs::write(&config_path, "{ user: 'alice', pretty: false }").unwrap();
	let round_path = tmp.path().join("round.json");
	fs::write(&round_path, ROUND).unwrap();
	let output_path = tmp.path().join("out").join("optimized.json");

	let config = OptimizerConfig::load(&config_path).unwrap();
	assert_eq!(config.user, "alice");
	let pretty = config.pretty;

	let round = SyncRound::load(&round_path).await.unwrap();
	let optimized = round.optimize(&Pipeline::new(config));
	optimized.save(&output_path, pretty).await.unwrap();

	let written = fs::read_to_string(&output_path).unwrap();
	assert!(!written.contains('\n'), "compact output expected");
	let reread: OptimizedRound = serde_json::from_str(&written).unwrap();
	assert_eq!(reread, optimized);

	// The duplicate upload became a server-side copy
	let files = &reread.files;
	assert_eq!(files.actions_for_server.len(), 1);
	assert_eq!(files.actions_for_server[0].kind(), ActionKind::Copy);
	assert_eq!(files.actions_for_client[0].kind(), ActionKind::Acknowledge);

	// The delete + create pair became a move
	let dirs = &reread.directories;
	match &dirs.actions_for_server[..] {
		[DriveAction::Edit { old, new, .. }] => {
			assert_eq!(old.path, "/Projects");
			assert_eq!(new.path, "/Work");
		}
		other => panic!("expected a single move, got {:?}", other),
	}
	assert_eq!(dirs.actions_for_client.len(), 1);
	assert_eq!(dirs.actions_for_client[0].kind(), ActionKind::Acknowledge);
}

#[tokio::test]
async fn test_round_with_optimization_disabled() {
	let tmp = TempDir::new().expect("Failed to create temp dir");
	let round_path = tmp.path().join("round.json");
	fs::write(&round_path, ROUND).unwrap();

	let mut config = OptimizerConfig::default();
	config
		.apply_overrides(vec![
			("SYNCOPT_FILE_RENAMES".to_string(), "0".to_string()),
			("SYNCOPT_DIRECTORY_RENAMES".to_string(), "0".to_string()),
			("SYNCOPT_COPIES".to_string(), "0".to_string()),
			("SYNCOPT_ORDERING".to_string(), "0".to_string()),
		])
		.unwrap();

	let round = SyncRound::load(&round_path).await.unwrap();
	let optimized = round.optimize(&Pipeline::new(config));
	assert_eq!(optimized.files, round.files);
	assert_eq!(optimized.directories, round.directories);
}

#[tokio::test]
async fn test_missing_round_file() {
	let tmp = TempDir::new().expect("Failed to create temp dir");
	let result = SyncRound::load(&tmp.path().join("missing.json")).await;
	assert!(result.is_err());
}
