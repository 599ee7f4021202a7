// Copyright 2025 eraflo
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

//! `larder pack` builds a package from a source directory.
//! `larder load` opens packages and loads assets through the cache, reporting progress.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use larder_agents::cache_agent::CacheAgent;
use larder_core::task::StepScheduler;
use larder_core::asset::ResourceHandle;
use larder_core::{CacheConfig, CacheError};
use larder_io::{DirectoryPackageLoader, PackageBuilder, RawAsset, RawDecoder};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use walkdir::WalkDir;

type Cache = CacheAgent<DirectoryPackageLoader<RawAsset, RawDecoder>>;

/// Packs asset directories and loads them through the resource cache.
#[derive(Parser, Debug)]
#[command(name = "larder")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cache configuration file
    #[arg(short, long, default_value = "Larder.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Packs every file under a directory into one package
    Pack {
        /// Directory to pack
        source: PathBuf,
        /// Package name, written under the configured bundle root
        #[arg(short, long)]
        name: String,
    },
    /// Opens packages asynchronously, then loads assets from them
    Load {
        /// Packages to open, as one batch
        #[arg(short, long = "bundle", required = true)]
        bundles: Vec<String>,
        /// Assets to load, as one batch
        #[arg(short, long = "asset")]
        assets: Vec<String>,
        /// Milliseconds between scheduler ticks
        #[arg(long, default_value_t = 16)]
        tick_ms: u64,
    },
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = CacheConfig::load_or_default(&args.config)?;
    config.validate()?;

    match args.command {
        Command::Pack { source, name } => pack(&config, &source, &name),
        Command::Load {
            bundles,
            assets,
            tick_ms,
        } => load(config, &bundles, &assets, Duration::from_millis(tick_ms)),
    }
}

fn pack(config: &CacheConfig, source: &Path, name: &str) -> Result<()> {
    if !source.is_dir() {
        bail!("'{}' is not a directory", source.display());
    }

    let mut builder = PackageBuilder::new();
    let mut count = 0;
    for entry in WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("'{}' escaped the source directory", entry.path().display()))?;
        let bytes = fs::read(entry.path())
            .with_context(|| format!("Failed to read '{}'", entry.path().display()))?;
        builder = builder.with_asset(relative.to_string_lossy().replace('\\', "/"), bytes);
        count += 1;
    }

    let destination = config.bundle_root.join(name);
    builder
        .write_to(&destination)
        .with_context(|| format!("Failed to write '{}'", destination.display()))?;
    log::info!("Packed {count} assets into '{}'", destination.display());
    Ok(())
}

fn load(config: CacheConfig, bundles: &[String], assets: &[String], tick: Duration) -> Result<()> {
    let loader = DirectoryPackageLoader::new(config.bundle_root.clone(), RawDecoder);
    let mut cache = CacheAgent::init(loader, config);
    let mut scheduler = StepScheduler::new();

    let failed = Rc::new(Cell::new(false));

    let bundle_names: Vec<&str> = bundles.iter().map(String::as_str).collect();
    let head = cache.load_bundles_async(&mut scheduler, &bundle_names, report(&failed, "bundles"))?;
    drive(&mut cache, &mut scheduler, &[head], tick);

    if !assets.is_empty() && !failed.get() {
        let asset_names: Vec<&str> = assets.iter().map(String::as_str).collect();
        let handles =
            cache.load_assets_async(&mut scheduler, &asset_names, report(&failed, "assets"))?;
        drive(&mut cache, &mut scheduler, &handles, tick);

        for handle in handles {
            if let Ok(asset) = cache.get::<RawAsset>(handle) {
                log::info!("{} -> {} ({} bytes)", handle, asset.path, asset.bytes.len());
            }
        }
    }

    log::info!(
        "Cache holds {} entries in {} slots",
        cache.len(),
        cache.capacity()
    );
    let loader = cache.dispose();
    log::debug!("Released {} packages", loader.released_packages());

    if failed.get() {
        bail!("Some loads failed, see the log above");
    }
    Ok(())
}

fn report(
    failed: &Rc<Cell<bool>>,
    what: &'static str,
) -> impl FnOnce(&mut Cache, Result<(), CacheError>) + 'static {
    let failed = Rc::clone(failed);
    move |_, outcome| match outcome {
        Ok(()) => log::info!("All {what} loaded"),
        Err(e) => {
            log::error!("Loading {what} failed: {e}");
            failed.set(true);
        }
    }
}

fn drive(
    cache: &mut Cache,
    scheduler: &mut StepScheduler<Cache>,
    handles: &[ResourceHandle],
    tick: Duration,
) {
    while !scheduler.is_empty() {
        scheduler.run(cache);
        log::debug!("{:>5.1}%", cache.batch_progress(handles) * 100.0);
        thread::sleep(tick);
    }
}
