// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bluetooth Messenger command line host.
//!
//! Usage: bt-messenger [init | send <text...> | show [conversation-id]]

use anyhow::Result;
use std::env;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bt_messenger::config::Config;
use bt_messenger::events::{EventProcessor, MessengerEvent, StoreWorker};
use bt_messenger::state::{AppState, Status, StatusLevel};

fn print_statuses(statuses: &[Status]) {
    for status in statuses {
        match status.level {
            StatusLevel::Info => println!("{}", status),
            StatusLevel::Error => eprintln!("[{}] {}", status.level.as_str(), status),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bt_messenger=info")),
        )
        .init();

    info!("Starting Bluetooth Messenger v{}...", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = env::args().skip(1).collect();
    let mode = args.first().map(|s| s.as_str()).unwrap_or("show");

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded, data directory {:?}", config.data_dir);

    let state = AppState::new();
    let device_name = config.device.device_name();
    let processor = EventProcessor::new(
        config.layout(),
        config.conversation.peer.clone(),
        config.storage.read_policy,
        state.clone(),
    );
    let (handle, worker) = StoreWorker::spawn(processor, config.storage.worker_queue);

    handle
        .submit(MessengerEvent::DeviceAvailable { device_name })
        .await?;
    let statuses = handle.submit(MessengerEvent::InitializeStorage).await?;

    let mut failed = statuses.iter().any(Status::is_error);
    match mode {
        "init" => print_statuses(&statuses),
        "send" => {
            let content = args[1..].join(" ");
            let statuses = handle.send_message(content).await?;
            failed |= statuses.iter().any(Status::is_error);
            print_statuses(&statuses);
        }
        "show" => {
            let statuses = handle.display(args.get(1).cloned()).await?;
            failed |= statuses.iter().any(Status::is_error);
            print_statuses(&statuses);
        }
        _ => {
            eprintln!("Unknown mode: {}", mode);
            eprintln!("Usage: bt-messenger [init | send <text...> | show [conversation-id]]");
            failed = true;
        }
    }

    drop(handle);
    worker.await?;

    info!("Bluetooth Messenger stopped");
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
