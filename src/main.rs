use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoop;

use lekeyboard::ble::{BleConfig, ble_owner_task};
use lekeyboard::consts::PERIPHERAL_APPEARANCE;
use lekeyboard::host_power::battery_level;
use lekeyboard::input::spawn_evdev_reader;
use lekeyboard::services::StaticValues;
use lekeyboard::ui::App;
use lekeyboard::{KeyEvent, KeyboardService};

/// Software BLE keyboard: pairs with a host as a HID-over-GATT peripheral.
#[derive(Parser, Debug)]
#[command(name = "lekeyboard", version, long_about = None)]
struct Args {
    /// Bluetooth device name
    #[arg(short, long, default_value = "LeKeyboard")]
    name: String,

    /// Input device to read keys from (e.g. /dev/input/event0). Without it
    /// keys are captured from a focused window.
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Manufacturer name reported by Device Information
    #[arg(long, default_value = "Olly")]
    manufacturer: String,

    /// Fixed battery level in percent; defaults to the host battery
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    battery: Option<u8>,

    /// Enable debug logging when RUST_LOG is unset
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let keyboard = Arc::new(KeyboardService::new());
    let (key_tx, key_rx) = mpsc::channel::<KeyEvent>(256);
    let (evt_tx, evt_rx) = mpsc::channel(256);

    let config = BleConfig {
        device_name: args.name.clone(),
        appearance: Some(PERIPHERAL_APPEARANCE),
        statics: StaticValues::new(battery_level(args.battery), args.manufacturer.clone()),
    };

    let ble_keyboard = Arc::clone(&keyboard);
    let ble = std::thread::Builder::new()
        .name("ble".into())
        .spawn(move || -> anyhow::Result<()> {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("build tokio runtime")?;
            rt.block_on(ble_owner_task(ble_keyboard, key_rx, evt_rx, evt_tx, config))
        })
        .context("spawn BLE thread")?;

    match args.device {
        Some(path) => {
            let reader = spawn_evdev_reader(&path, key_tx)?;
            // The reader owns the only sender; the BLE task ends when it does.
            let _ = reader.join();
        }
        None => {
            let event_loop = EventLoop::new().context("create event loop")?;
            let mut app = App::new(key_tx, Arc::clone(&keyboard));
            event_loop.run_app(&mut app).context("run window")?;
            // Closing the window drops the key sender and stops the BLE task.
            drop(app);
        }
    }

    match ble.join() {
        Ok(res) => res?,
        Err(_) => anyhow::bail!("BLE thread panicked"),
    }
    tracing::info!("Shut down");
    Ok(())
}
