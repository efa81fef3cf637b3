mod core;
mod host;
mod network;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use signal_hook::{consts, iterator::Signals};

use crate::core::controller::Controller;
use crate::core::logger;
use crate::core::support::configuration::{CliOptions, ConfigDocument};
use crate::network::dns::{Dns, StaticDns};
use crate::network::topology::{Topology, UniformTopology};

fn main() {
    let options = CliOptions::parse();

    let log_level: log::LevelFilter = options.log_level.parse().unwrap_or(log::LevelFilter::Info);
    logger::init(log_level).expect("logger already initialized");

    std::process::exit(run(&options));
}

fn run(options: &CliOptions) -> i32 {
    let doc = match ConfigDocument::load(&options.config).context("loading config document") {
        Ok(doc) => doc.merge_cli(options),
        Err(e) => {
            log::error!("{e:#}");
            return 1;
        }
    };

    if options.show_config {
        match serde_yaml::to_string(&doc) {
            Ok(text) => println!("{text}"),
            Err(e) => log::warn!("could not render config: {e}"),
        }
        return 0;
    }

    let controller = Controller::new(&doc);
    let shared = controller.shared();

    // cooperative shutdown: the current round completes naturally, but the
    // next round boundary always reports `keepRunning = false` afterward.
    match Signals::new([consts::signal::SIGINT, consts::signal::SIGTERM]) {
        Ok(mut signals) => {
            std::thread::spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    log::info!("received signal {signal}, finishing the current round and exiting");
                    shared.request_shutdown();
                }
            });
        }
        Err(e) => log::warn!("could not install signal handler: {e}"),
    }

    let topology: Arc<dyn Topology> = Arc::new(UniformTopology::new(50.0, 1.0));
    let dns: Arc<dyn Dns> = Arc::new(StaticDns::new());

    controller.run(&doc, topology, dns)
}
