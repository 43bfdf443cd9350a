use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use greeter_core::{Encoding, PersonRegistry};
use greeter_hw::{Capture, FrameAcquirer, V4lCamera};
use greeter_skill::Config;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "greeter", about = "Greeter roster administration and camera diagnostics")]
struct Cli {
    /// Roster file (overrides GREETER_ROSTER_PATH)
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List known persons
    List,
    /// Add a person from a JSON file of face encodings from one frame
    Enroll {
        /// Name to greet this person by
        #[arg(short, long)]
        name: String,
        /// JSON file: one encoding `[..]` or a list of encodings `[[..], ..]`
        #[arg(short, long)]
        encoding: PathBuf,
    },
    /// Show which known persons match the encodings in a JSON file
    Match {
        #[arg(short, long)]
        encoding: PathBuf,
    },
    /// Forget a known person
    Forget {
        name: String,
    },
    /// Capture one frame from the configured camera
    Capture {
        /// Save the captured frame (format from extension, e.g. frame.png)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List V4L2 capture devices
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(roster) = cli.roster {
        config.roster_path = roster;
    }
    tracing::debug!(roster = %config.roster_path.display(), "using roster");

    match cli.command {
        Commands::List => {
            let registry = open_registry(&config)?;
            if registry.is_empty() {
                println!("No known persons");
            }
            for person in registry.persons() {
                println!("{}\t{} dims", person.name, person.encoding.len());
            }
        }
        Commands::Enroll { name, encoding } => {
            let mut registry = open_registry(&config)?;
            let encodings = read_encodings(&encoding)?;
            let replacing = registry.get(name.trim()).is_some();
            registry
                .add_person(&name, &encodings)
                .with_context(|| format!("could not enroll {name}"))?;
            if replacing {
                println!("Replaced {}", name.trim());
            } else {
                println!("Enrolled {}", name.trim());
            }
        }
        Commands::Match { encoding } => {
            let registry = open_registry(&config)?;
            let encodings = read_encodings(&encoding)?;
            let comparator = config.comparator();
            let names = registry.match_names(Some(encodings.as_slice()), comparator.as_ref());
            if names.is_empty() {
                println!("No match");
            } else {
                println!("{}", names.join(", "));
            }
        }
        Commands::Forget { name } => {
            let mut registry = open_registry(&config)?;
            if !registry.remove_person(&name)? {
                bail!("no known person named {name}");
            }
            println!("Forgot {name}");
        }
        Commands::Capture { out } => {
            let acquirer = FrameAcquirer::new(V4lCamera::new(&config.camera_device, config.camera_fps))
                .with_max_attempts(config.capture_attempts)
                .with_retry_delay(config.retry_delay());

            let frame = match acquirer.capture() {
                Capture::Success(frame) => frame,
                Capture::Exhausted {
                    attempts,
                    last_error: Some(e),
                } => bail!("no frame from {} after {attempts} attempts: {e}", config.camera_device),
                Capture::Exhausted { attempts, .. } => {
                    bail!("no frame from {} after {attempts} attempts", config.camera_device)
                }
            };
            tracing::info!(
                device = %config.camera_device,
                width = frame.width,
                height = frame.height,
                "captured frame"
            );

            println!(
                "Captured {}x{} frame, avg brightness {:.1}",
                frame.width,
                frame.height,
                frame.avg_brightness()
            );

            if let Some(out) = out {
                let image = image::RgbImage::from_raw(frame.width, frame.height, frame.data)
                    .context("frame buffer does not match its dimensions")?;
                image
                    .save(&out)
                    .with_context(|| format!("could not write {}", out.display()))?;
                tracing::debug!(path = %out.display(), "saved frame");
                println!("Saved {}", out.display());
            }
        }
        Commands::Devices => {
            let devices = V4lCamera::list_devices();
            if devices.is_empty() {
                println!("No capture devices found");
            }
            for d in devices {
                println!("{}\t{} ({}, {})", d.path, d.name, d.driver, d.bus);
            }
        }
    }

    Ok(())
}

fn open_registry(config: &Config) -> Result<PersonRegistry> {
    PersonRegistry::open(&config.roster_path)
        .with_context(|| format!("could not load roster {}", config.roster_path.display()))
}

/// Read either a single encoding or a list of encodings.
fn read_encodings(path: &Path) -> Result<Vec<Encoding>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;

    if let Ok(many) = serde_json::from_str::<Vec<Encoding>>(&raw) {
        return Ok(many);
    }
    let one: Encoding = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not an encoding or list of encodings", path.display()))?;
    Ok(vec![one])
}
