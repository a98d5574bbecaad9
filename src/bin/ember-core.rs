// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
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

use clap::Parser;
use ember_core::core::error::EmulatorError;
use ember_core::core::system::System;
use log::{error, info};
use std::process::ExitCode;

/// PlayStation (PSX) emulator core front-end
#[derive(Parser)]
#[command(name = "ember-core")]
#[command(about = "PlayStation emulator core", long_about = None)]
struct Args {
    /// Path to PlayStation BIOS image (e.g., SCPH1001.BIN, 512 KiB)
    bios: String,

    /// Path to a disc image (.bin or .cue)
    disc: Option<String>,
}

fn main() -> ExitCode {
    // Initialize logger with default level INFO
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("ember-core v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let mut system = System::new();

    info!("Loading BIOS from: {}", args.bios);
    match system.load_bios(&args.bios) {
        Ok(()) => {}
        Err(err @ EmulatorError::InvalidBiosSize { .. }) => {
            error!("Failed to load BIOS: {}", err);
            return ExitCode::from(3);
        }
        Err(err) => {
            error!("Failed to load BIOS: {}", err);
            return ExitCode::from(2);
        }
    }

    match system.bus().read32(0xBFC0_0000) {
        Ok(word) => info!("BIOS loaded, reset vector word: 0x{:08X}", word),
        Err(err) => error!("BIOS reset vector unreadable: {}", err),
    }

    if let Some(disc_path) = &args.disc {
        info!("Loading disc image from: {}", disc_path);
        if let Err(err) = system.load_disc(disc_path) {
            error!("Failed to load disc: {}", err);
            return ExitCode::from(2);
        }

        for track in system.disk().tracks() {
            info!(
                "Track {:02}: {:?}, {} sectors from LBA {}",
                track.number, track.track_type, track.frame_count, track.start_lba
            );
        }
    }

    system.reset();
    info!("Core initialized; attach a CPU front-end to begin execution");

    ExitCode::SUCCESS
}
