// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use env_logger::fmt::Color;
use log::{debug, error, info};
use mp1_areas::{BoardId, BootDevice, BootStage, IwdgFlags};
use mp1_identity::iwdg::instance_for_base;
use mp1_identity::security::security_state;
use mp1_identity::sim::SimDevice;
use mp1_identity::{Error, Stm32mp1};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
enum BootItfCommand {
    /// Show the boot interface recorded in the backup register
    Get,
    /// Record the boot interface for later stages
    Save {
        interface: BootDevice,
        #[arg(value_parser = parse_int::parse::<u8>)]
        instance: u8,
    },
}

#[derive(Debug, Parser)]
enum IwdgCommand {
    /// Show the fused configuration of one watchdog
    Get {
        #[arg(value_parser = parse_int::parse::<u32>, required_unless_present = "base")]
        instance: Option<u32>,

        /// Look the instance up from the watchdog's register base
        #[clap(long, value_parser = parse_int::parse::<u32>, conflicts_with = "instance")]
        base: Option<u32>,
    },
    /// Freeze a watchdog in low power modes and lock HW2_OTP.  THE LOCK
    /// CANNOT BE UNDONE until the next reset.
    Freeze {
        #[arg(value_parser = parse_int::parse::<u32>)]
        instance: u32,

        /// Freeze the watchdog in Stop mode
        #[clap(long)]
        on_stop: bool,

        /// Freeze the watchdog in Standby mode
        #[clap(long)]
        on_standby: bool,

        /// Skip interactive verification of the lock
        #[clap(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Parser)]
enum Command {
    /// Print the SoC name and part number
    CpuInfo,
    /// Print the board id and model
    BoardInfo,
    /// Print whether the device is closed
    Security,
    /// Boot interface handed between stages
    BootItf {
        #[clap(subcommand)]
        cmd: BootItfCommand,
    },
    /// Independent watchdog configuration
    Iwdg {
        #[clap(subcommand)]
        cmd: IwdgCommand,
    },
    /// Print the DDR size left to the non-secure world
    Ddr,
    /// Decode a board id word; no device needed
    DecodeBoardId {
        #[arg(value_parser = parse_int::parse::<u32>)]
        word: u32,
    },
}

#[derive(Debug, Parser)]
#[clap(name = "mp1-otp", max_term_width = 80)]
struct Opts {
    /// TOML description of the device
    #[clap(short, long)]
    device: Option<PathBuf>,

    /// Raw OTP dump (little-endian words from OTP 0) loaded over the
    /// device description
    #[clap(long, requires = "device")]
    otp_image: Option<PathBuf>,

    /// Boot stage to run as, instead of the one in the device description
    #[clap(long)]
    stage: Option<BootStage>,

    /// Write the device state to this file once done
    #[clap(long, requires = "device")]
    save: Option<PathBuf>,

    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    cmd: Command,
}

/// Tag and color of the level column. Fuse traffic is logged at trace.
fn level_column(level: log::Level) -> (&'static str, Color) {
    match level {
        log::Level::Error => ("ERROR", Color::Red),
        log::Level::Warn => ("WARN", Color::Yellow),
        log::Level::Info => ("", Color::Cyan),
        log::Level::Debug => ("DEBUG", Color::Green),
        log::Level::Trace => ("OTP", Color::Blue),
    }
}

/// `RUST_LOG` wins over `--verbose`. Debug and trace lines name the module
/// they came from.
fn init_logger(verbose: bool) {
    let default = if verbose { "trace" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format(|buf, record| {
            let (tag, color) = level_column(record.level());
            let mut style = buf.style();
            style.set_color(color).set_bold(record.level() <= log::Level::Warn);

            let args = record.args().to_string().replace('\n', "\n      | ");
            if record.level() >= log::Level::Debug {
                let module = record.target().trim_start_matches("mp1_identity::");
                writeln!(buf, "{: <5} | [{module}] {args}", style.value(tag))
            } else {
                writeln!(buf, "{: <5} | {args}", style.value(tag))
            }
        })
        .init();
}

fn confirm(expected: &str) -> Result<()> {
    println!("Please type '{expected}' to continue:");
    print!("> ");
    std::io::stdout().flush()?;

    let mut reply = String::new();
    std::io::stdin().read_line(&mut reply)?;
    let reply = reply.trim();
    if reply != expected {
        bail!("invalid reply: expected '{expected}', got '{reply}'");
    }

    Ok(())
}

fn load_device(path: &Path, otp_image: Option<&PathBuf>) -> Result<SimDevice> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("could not read {path:?}"))?;
    let dev = SimDevice::from_toml(&text).with_context(|| format!("could not load {path:?}"))?;

    if let Some(image) = otp_image {
        let bytes = std::fs::read(image).with_context(|| format!("could not read {image:?}"))?;
        dev.load_otp_image(&bytes)
            .with_context(|| format!("could not load OTP image {image:?}"))?;
    }

    Ok(dev)
}

fn decode_board_id(word: u32) -> Result<()> {
    let Some(id) = BoardId::from_otp(word).context("could not decode board id")? else {
        println!("no board info (board id not programmed)");
        return Ok(());
    };

    println!("{}", id.info());
    println!("  board:       MB{:04x}", id.board_nb);
    println!("  variant cpn: {}", *id.var_cpn);
    println!("  variant fg:  {}", *id.var_fg);
    match id.revision_letter() {
        Some(rev) => println!("  revision:    {rev}"),
        None => println!("  revision:    none ({})", *id.revision),
    }
    println!("  bom:         {:02}", *id.bom);

    Ok(())
}

fn print_flags(instance: u32, flags: IwdgFlags) {
    println!("IWDG{}:", instance + 1);
    println!(
        "  hardware enabled:   {}",
        flags.contains(IwdgFlags::HW_ENABLED)
    );
    println!(
        "  frozen on stop:     {}",
        flags.contains(IwdgFlags::DISABLE_ON_STOP)
    );
    println!(
        "  frozen on standby:  {}",
        flags.contains(IwdgFlags::DISABLE_ON_STANDBY)
    );
}

fn run(dev: &SimDevice, soc: &Stm32mp1, cmd: Command) -> Result<()> {
    match cmd {
        Command::CpuInfo => {
            soc.print_cpu_info()?;

            println!("part number: {:#010x}", soc.part_number()?);
            match soc.package()? {
                Some(package) => println!("package:     {package:?} ({package})"),
                None => println!("package:     unknown ({})", soc.package_field()?),
            }
            let version = soc.chip_version();
            if version.is_available() {
                println!("revision:    {:#x}", version.0);
            } else {
                println!("revision:    unavailable");
            }
            println!("single core: {}", soc.is_single_core()?);
        }
        Command::BoardInfo => {
            if let Some(model) = soc.board.model() {
                info!("Model: {model}");
            }

            match soc.board.board_id_otp()? {
                Some(otp) => {
                    debug!("board id in OTP {otp}");
                    soc.print_board_info()?;
                }
                None => info!("no board info"),
            }
        }
        Command::Security => {
            println!("security: {}", security_state(dev));
        }
        Command::BootItf { cmd } => match cmd {
            BootItfCommand::Get => {
                println!("boot interface: {}", soc.boot_interface());
            }
            BootItfCommand::Save {
                interface,
                instance,
            } => {
                soc.save_boot_interface(interface as u8, instance)?;
                info!("boot interface {interface} instance {instance} saved");
            }
        },
        Command::Iwdg { cmd } => match cmd {
            IwdgCommand::Get { instance, base } => {
                let instance = match (instance, base) {
                    (Some(i), _) => i,
                    (None, Some(base)) => instance_for_base(base)?,
                    (None, None) => bail!("need an instance or --base"),
                };

                print_flags(instance, soc.watchdog_otp_config(instance)?);
            }
            IwdgCommand::Freeze {
                instance,
                on_stop,
                on_standby,
                yes,
            } => {
                let mut flags = IwdgFlags::empty();
                flags.set(IwdgFlags::DISABLE_ON_STOP, on_stop);
                flags.set(IwdgFlags::DISABLE_ON_STANDBY, on_standby);
                if flags.is_empty() {
                    bail!("nothing to freeze: pass --on-stop and/or --on-standby");
                }

                println!(
                    "{}: HW2_OTP locking CANNOT BE UNDONE until the next reset!",
                    "WARNING".red()
                );
                if !yes {
                    confirm("Lock HW2_OTP")?;
                }

                match soc.shadow_update_watchdog_otp(instance, flags) {
                    Ok(()) => print_flags(instance, soc.watchdog_otp_config(instance)?),
                    Err(e @ Error::FuseLockFailed { .. }) => {
                        error!("watchdog configuration written but NOT locked");
                        return Err(e.into());
                    }
                    Err(e) => return Err(e).context("could not update HW2_OTP"),
                }
            }
        },
        Command::Ddr => {
            println!("DDR size:       {:#x}", soc.ddr.size()?);
            println!("non-secure DDR: {:#x}", soc.ddr_ns_size()?);
        }
        Command::DecodeBoardId { word } => decode_board_id(word)?,
    }

    Ok(())
}

fn main() -> Result<()> {
    let Opts {
        device,
        otp_image,
        stage,
        save,
        verbose,
        cmd,
    } = Opts::parse();

    init_logger(verbose);

    if let Command::DecodeBoardId { word } = cmd {
        return decode_board_id(word);
    }

    let path = device.ok_or_else(|| anyhow!("--device is required for this command"))?;
    let dev = load_device(&path, otp_image.as_ref())?;
    let soc = Stm32mp1::new(&dev, stage.unwrap_or(dev.stage()));

    // Save whatever made it to the device, even if the command failed
    // halfway (e.g. written but not locked)
    let result = run(&dev, &soc, cmd);

    if let Some(out) = save {
        std::fs::write(&out, dev.to_toml()?)
            .with_context(|| format!("could not write {out:?}"))?;
        info!("device state written to {}", out.display());
    }

    result
}
