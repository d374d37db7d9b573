//! Application entry point for audio-led-link.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Apply command-line overrides (and persist them with `--save`).
//! 4. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Either stream a capture variant until Ctrl-C, or run the command
//!    console.
//!
//! ```text
//! audio-led-link [computer|mic|console] [--effect <name>] [--color r,g,b] [--save]
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::mpsc;

use audio_led_link::{
    audio::CpalBackend,
    config::{AppConfig, CaptureVariant},
    console,
    discovery::MdnsBrowser,
    net::UdpTransmitter,
    pipeline::{new_shared_status, ParamCell, SessionCommand, SessionController, SessionEvent},
    protocol::{Color, EffectSelection},
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Stream(CaptureVariant),
    Console,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    mode: Option<Mode>,
    effect: Option<EffectSelection>,
    color: Option<Color>,
    save: bool,
}

const USAGE: &str =
    "usage: audio-led-link [computer|mic|console] [--effect <name>] [--color r,g,b] [--save]";

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--effect" => {
                let value = args.next().ok_or_else(|| anyhow!("--effect needs a value"))?;
                cli.effect = Some(value.parse().map_err(|e: String| anyhow!(e))?);
            }
            "--color" => {
                let value = args.next().ok_or_else(|| anyhow!("--color needs a value"))?;
                cli.color = Some(value.parse().map_err(|e: String| anyhow!(e))?);
            }
            "--save" => cli.save = true,
            "console" if cli.mode.is_none() => cli.mode = Some(Mode::Console),
            other if cli.mode.is_none() && !other.starts_with('-') => {
                let variant = CaptureVariant::parse(other)
                    .ok_or_else(|| anyhow!("unknown mode {other:?}\n{USAGE}"))?;
                cli.mode = Some(Mode::Stream(variant));
            }
            other => bail!("unexpected argument {other:?}\n{USAGE}"),
        }
    }

    Ok(cli)
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

async fn run_stream(config: AppConfig) -> Result<()> {
    let profile = config.profile();
    log::info!(
        "streaming {} audio to {}",
        profile.variant.label(),
        profile.service_type
    );

    let browser = MdnsBrowser::new().context("failed to start mDNS browser")?;
    let backend = CpalBackend::new(config.audio.read_timeout());
    let params = Arc::new(ParamCell::new(config.effect, config.color));
    let status = new_shared_status(profile.variant);

    let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(16);
    let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(16);

    let controller = SessionController::new(
        profile,
        config.discovery.clone(),
        Arc::new(browser),
        Arc::new(backend),
        params,
        status,
    )
    .with_events(event_tx);
    let controller_task = tokio::spawn(controller.run(command_rx));

    command_tx.send(SessionCommand::Start).await?;

    let mut stopping = false;
    let mut outcome = Ok(());
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c(), if !stopping => {
                signal.context("failed to listen for Ctrl-C")?;
                log::info!("Ctrl-C received, stopping");
                stopping = true;
                command_tx.send(SessionCommand::Stop).await?;
            }
            event = event_rx.recv() => match event {
                Some(SessionEvent::Started) => log::debug!("session started"),
                Some(SessionEvent::Finished(summary)) => {
                    log::info!(
                        "session finished: {} frames, shutdown frame {}",
                        summary.frames_sent,
                        if summary.shutdown_sent { "sent" } else { "not sent" }
                    );
                    break;
                }
                Some(SessionEvent::Failed { message }) => {
                    outcome = Err(anyhow!(message));
                    break;
                }
                Some(SessionEvent::Rejected { message }) => log::warn!("{message}"),
                Some(SessionEvent::AllOff { .. }) => {}
                None => break,
            }
        }
    }

    drop(command_tx);
    controller_task.await.context("session controller panicked")?;
    outcome
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

fn run_console(config: AppConfig) -> Result<()> {
    let browser = MdnsBrowser::new().context("failed to start mDNS browser")?;
    let cancel = AtomicBool::new(false);
    let endpoint = console::discover_controller(&browser, &config.discovery, &cancel)?;
    println!("Connected to {} ({})", endpoint.instance, endpoint.socket_addr());

    let transmitter = UdpTransmitter::bind_for(&endpoint).context("failed to open UDP socket")?;
    let stdin = std::io::stdin();
    console::run(stdin.lock(), std::io::stdout(), &transmitter, &endpoint)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Overrides
    let cli = parse_args(std::env::args().skip(1))?;
    if let Some(effect) = cli.effect {
        config.effect = effect;
    }
    if let Some(color) = cli.color {
        config.color = color;
    }
    let mode = cli.mode.unwrap_or(Mode::Stream(config.variant));
    if let Mode::Stream(variant) = mode {
        config.variant = variant;
    }
    if cli.save {
        config.save().context("failed to save settings")?;
        log::info!("settings saved");
    }

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 5. Run
    match mode {
        Mode::Stream(_) => rt.block_on(run_stream(config)),
        Mode::Console => rt.block_on(async move {
            tokio::task::spawn_blocking(move || run_console(config))
                .await
                .context("console thread panicked")?
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_means_configured_variant() {
        assert_eq!(parse_args(args(&[])).unwrap(), CliArgs::default());
    }

    #[test]
    fn mode_and_overrides() {
        let cli = parse_args(args(&["mic", "--color", "1,2,3"])).unwrap();
        assert_eq!(cli.mode, Some(Mode::Stream(CaptureVariant::Mic)));
        assert_eq!(cli.color, Some(Color::new(1, 2, 3)));

        let cli = parse_args(args(&["--effect", "waves_outside", "computer"])).unwrap();
        assert_eq!(cli.mode, Some(Mode::Stream(CaptureVariant::Computer)));
        assert_eq!(cli.effect, Some(EffectSelection::WavesOutside));

        let cli = parse_args(args(&["console"])).unwrap();
        assert_eq!(cli.mode, Some(Mode::Console));
        assert!(!cli.save);
    }

    #[test]
    fn save_flag_goes_anywhere() {
        let cli = parse_args(args(&["--save", "mic", "--effect", "speed"])).unwrap();
        assert!(cli.save);
        assert_eq!(cli.mode, Some(Mode::Stream(CaptureVariant::Mic)));

        assert!(parse_args(args(&["computer", "--save"])).unwrap().save);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse_args(args(&["speaker"])).is_err());
        assert!(parse_args(args(&["mic", "mic"])).is_err());
        assert!(parse_args(args(&["--effect"])).is_err());
        assert!(parse_args(args(&["--color", "red"])).is_err());
        assert!(parse_args(args(&["--verbose"])).is_err());
    }
}
