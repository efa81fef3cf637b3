//! The semantic configuration surface this simulator consumes.
//!
//! Parsing of the on-disk document is the only part of "config" this crate
//! owns — the document format (YAML or JSON) is a stand-in for whatever
//! front-end the real config collaborator eventually speaks.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug, Clone)]
#[command(name = "netsim", about = "Discrete-event network simulator core")]
pub struct CliOptions {
    /// Path to the YAML or JSON simulation config document.
    pub config: PathBuf,

    /// Overrides `general.random_seed`.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Overrides `general.n_worker_threads`.
    #[arg(short = 'p', long = "parallelism")]
    pub n_worker_threads: Option<u32>,

    /// Overrides `general.scheduler_policy`.
    #[arg(long)]
    pub scheduler_policy: Option<SchedulerPolicyKind>,

    /// Minimum log level to emit (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Print the fully merged config document to stdout and exit.
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[clap(rename_all = "kebab-case")]
pub enum SchedulerPolicyKind {
    Serial,
    HostSingle,
    HostSteal,
    ThreadSingle,
    ThreadPerHost,
    ThreadPerThread,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessRecordConfig {
    pub plugin_id: String,
    #[serde(default)]
    pub preload_id: Option<String>,
    pub start_time_seconds: u64,
    #[serde(default)]
    pub stop_time_seconds: Option<u64>,
    #[serde(default)]
    pub argv: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostRecordConfig {
    pub id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub cpu_freq_mhz: Option<u64>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub ip_hint: Option<String>,
    #[serde(default)]
    pub bandwidth_up_kibps: Option<u64>,
    #[serde(default)]
    pub bandwidth_down_kibps: Option<u64>,
    #[serde(default)]
    pub processes: Vec<ProcessRecordConfig>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgramRecordConfig {
    pub id: String,
    pub path: PathBuf,
    #[serde(default)]
    pub start_symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub stop_time_seconds: u64,
    #[serde(default)]
    pub bootstrap_end_time_seconds: Option<u64>,
    pub random_seed: u32,
    #[serde(default)]
    pub n_worker_threads: u32,
    #[serde(default)]
    pub min_run_ahead_millis: u32,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u32,
    pub scheduler_policy: SchedulerPolicyKind,
    /// Output directory for per-host state, wiped at startup (or seeded from
    /// `data_template_directory` if set). `None` skips this entirely — the
    /// core simulator has no host subsystems of its own that write here yet.
    #[serde(default)]
    pub data_directory: Option<PathBuf>,
    #[serde(default)]
    pub data_template_directory: Option<PathBuf>,
}

fn default_heartbeat_interval() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigDocument {
    pub general: GeneralConfig,
    #[serde(default)]
    pub hosts: Vec<HostRecordConfig>,
    #[serde(default)]
    pub programs: Vec<ProgramRecordConfig>,
}

impl ConfigDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;

        let doc = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&text)
                .with_context(|| format!("parsing {:?} as JSON", path))?
        } else {
            serde_yaml::from_str(&text)
                .with_context(|| format!("parsing {:?} as YAML", path))?
        };

        Ok(doc)
    }

    /// Apply command-line overrides on top of the document loaded from disk.
    pub fn merge_cli(mut self, cli: &CliOptions) -> Self {
        if let Some(seed) = cli.seed {
            self.general.random_seed = seed;
        }
        if let Some(n) = cli.n_worker_threads {
            self.general.n_worker_threads = n;
        }
        if let Some(policy) = cli.scheduler_policy {
            self.general.scheduler_policy = policy;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
general:
  stop_time_seconds: 100
  random_seed: 1
  n_worker_threads: 2
  min_run_ahead_millis: 10
  scheduler_policy: host-steal
hosts:
  - id: client
    processes:
      - plugin_id: ping
        start_time_seconds: 1
"#
    }

    #[test]
    fn test_parse_yaml() {
        let doc: ConfigDocument = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(doc.general.stop_time_seconds, 100);
        assert_eq!(doc.general.scheduler_policy, SchedulerPolicyKind::HostSteal);
        assert_eq!(doc.hosts.len(), 1);
        assert_eq!(doc.hosts[0].quantity, 1);
    }

    #[test]
    fn test_merge_cli_overrides_seed_and_threads() {
        let doc: ConfigDocument = serde_yaml::from_str(minimal_yaml()).unwrap();
        let cli = CliOptions {
            config: PathBuf::from("unused.yaml"),
            seed: Some(99),
            n_worker_threads: Some(7),
            scheduler_policy: Some(SchedulerPolicyKind::ThreadSingle),
            log_level: "debug".into(),
            show_config: false,
        };
        let merged = doc.merge_cli(&cli);
        assert_eq!(merged.general.random_seed, 99);
        assert_eq!(merged.general.n_worker_threads, 7);
        assert_eq!(merged.general.scheduler_policy, SchedulerPolicyKind::ThreadSingle);
    }
}
