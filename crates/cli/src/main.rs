//! k380-fn CLI: set the Logitech K380 function-key mode.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use k380_fn_core::applier::Applier;
use k380_fn_core::clock::SystemClock;
use k380_fn_core::device::{self, DeviceInfo, FnKeysMode};
use k380_fn_core::locator::Locator;
use k380_fn_core::monitor::Monitor;
use k380_fn_core::transport::HidApiOpener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const EXAMPLES: &str = "\
Examples:
  k380-fn -f on        Enable F-keys once
  k380-fn -m on        Monitor and keep F-keys enabled
  k380-fn -m off       Monitor and keep F-keys disabled
  k380-fn -l           List HID devices and look for the K380

Monitor mode keeps the setting after Bluetooth reconnections.";

fn parse_mode(value: &str) -> Result<FnKeysMode, String> {
    FnKeysMode::from_name(value)
        .ok_or_else(|| format!("unknown mode '{value}'. Valid modes: on, off"))
}

#[derive(Parser)]
#[command(
    name = "k380-fn",
    version,
    about = "Logitech K380 keyboard function-key configurator",
    arg_required_else_help = true,
    after_help = EXAMPLES
)]
#[command(group(ArgGroup::new("action").args(["fn_keys", "monitor", "list"])))]
struct Cli {
    /// Enable/disable direct access to F-keys.
    #[arg(short = 'f', value_name = "on|off", value_parser = parse_mode)]
    fn_keys: Option<FnKeysMode>,

    /// Continuously re-apply the setting whenever the keyboard reconnects.
    #[arg(short = 'm', value_name = "on|off", value_parser = parse_mode)]
    monitor: Option<FnKeysMode>,

    /// List HID devices and check whether a K380 is visible.
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Print the device list as JSON.
    #[arg(long, requires = "list")]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        std::process::exit(usage_exit_code(&e));
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if cli.list {
        return list_devices(cli.json);
    }

    if let Some(mode) = cli.monitor {
        return monitor(mode);
    }

    if let Some(mode) = cli.fn_keys {
        let opener = HidApiOpener::new()?;
        Applier::new(Locator::new(opener), SystemClock)
            .apply(mode)
            .context("Failed to apply K380 configuration")?;
        println!("Function keys {}", mode.label());
    }

    Ok(())
}

/// Help and version exit 0; every other parse failure is a usage error.
fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

fn monitor(mode: FnKeysMode) -> Result<()> {
    let opener = HidApiOpener::new()?;

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping after current cycle");
        running_clone.store(false, Ordering::Relaxed);
    })
    .context("install signal handler")?;

    println!("Target state: function keys {}", mode.label());
    println!("Press Ctrl+C to stop monitoring");

    Monitor::new(Locator::new(opener), SystemClock, mode).run(&running);
    Ok(())
}

fn list_devices(json: bool) -> Result<()> {
    let devices = device::list_devices()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    let locator = Locator::new(HidApiOpener::new()?);
    for (i, dev) in devices.iter().enumerate() {
        print_device(i + 1, dev);
        if let Some(model) = dev.model {
            println!("*** FOUND {}! ***", model.name());
            println!("Attempting to open {}...", model.name());
            match locator.check_interface(dev) {
                Ok(product) => {
                    println!("Successfully opened {}!", model.name());
                    if let Some(product) = product {
                        println!("Product String: {product}");
                    }
                }
                Err(e) => println!("Failed to open {}: {e}", model.name()),
            }
            println!();
        }
    }

    let found = devices.iter().any(DeviceInfo::is_supported);
    println!("Total devices found: {}", devices.len());
    println!("K380 found: {}", if found { "YES" } else { "NO" });

    if !found {
        println!();
        println!("Trying direct open...");
        if locator.locate().is_some() {
            println!("Direct open successful!");
        } else {
            println!("Direct open failed (run with RUST_LOG=debug for details)");
        }
    }

    Ok(())
}

fn print_device(index: usize, dev: &DeviceInfo) {
    let text = |s: &Option<String>| s.clone().unwrap_or_default();

    println!("Device {index}:");
    println!("  VID: 0x{:04X} PID: 0x{:04X}", dev.vid, dev.pid);
    println!("  Path: {}", dev.path);
    println!("  Serial: {}", text(&dev.serial));
    println!("  Manufacturer: {}", text(&dev.manufacturer));
    println!("  Product: {}", text(&dev.product));
    println!("  Release: {:x}", dev.release);
    println!("  Interface: {}", dev.interface);
    println!("  Usage (page): 0x{:x} (0x{:x})", dev.usage, dev.usage_page);
    println!();
}
