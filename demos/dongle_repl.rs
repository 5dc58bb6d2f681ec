use anyhow::{Context, Result};
use std::io::Write;
use std::iter::Peekable;
use std::str::{FromStr, SplitWhitespace};

use turris_dongle::{BeepMode, Dongle, DongleConfig, OutputChannel};

fn cmd_discover(dongle: &Dongle) -> Result<()> {
    let devices = dongle.discover()?;
    if devices.is_empty() {
        println!("No devices registered");
    }
    for entry in devices {
        println!(
            "slot {}: {} {} ({:?})",
            entry.slot(),
            entry.device_id(),
            entry.model(),
            entry.kind()
        );
    }
    Ok(())
}

fn cmd_output(args: &mut CmdScanner, dongle: &Dongle) -> Result<()> {
    let channel: OutputChannel = args.parse_next()?;
    let on = match args.next()? {
        "on" | "1" => true,
        "off" | "0" => false,
        other => anyhow::bail!("Expected on or off, got {}", other),
    };
    dongle.set_output(channel, on)?;
    Ok(())
}

fn cmd_beep(args: &mut CmdScanner, dongle: &Dongle) -> Result<()> {
    dongle.set_beep(args.parse_next::<BeepMode>()?)?;
    Ok(())
}

fn cmd_state(dongle: &Dongle) {
    let state = dongle.tx_state();
    for channel in OutputChannel::ALL {
        println!(
            "{:<10} {}",
            channel.default_name(),
            if state.output(channel) { "on" } else { "off" }
        );
    }
    println!("{:<10} {}", "BEEP", state.beep);
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args();
    args.next(); // Skip program name
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let config = match args.next().as_deref() {
        Some("legacy") => DongleConfig::legacy(),
        _ => DongleConfig::default(),
    };

    let dongle = Dongle::new(config);
    dongle
        .connect(&port)
        .with_context(|| format!("Failed to open {}", port))?;
    dongle.subscribe(|msg| println!("<< {} {}", msg.kind(), msg.text()));

    let mut stdout = std::io::stdout();
    loop {
        print!(">> ");
        stdout.flush()?;
        let mut cmd = String::new();
        let mut scan = CmdScanner::read_stdin(&mut cmd)?;
        if let Err(err) = match scan.next() {
            Err(_) => continue,
            Ok("discover") | Ok("d") => cmd_discover(&dongle),
            Ok("output") | Ok("o") => cmd_output(&mut scan, &dongle),
            Ok("beep") => cmd_beep(&mut scan, &dongle),
            Ok("state") => {
                cmd_state(&dongle);
                Ok(())
            }
            Ok("send") => dongle.transmit_state().map_err(Into::into),
            Ok("raw") => dongle.write(&scan.rest()).map_err(Into::into),
            Ok("quit") | Ok("q") => break,
            Ok(cmd) => {
                println!("Unknown command {}", cmd);
                continue;
            }
        } {
            println!("{:?}", err)
        }
    }
    dongle.disconnect();
    Ok(())
}

struct CmdScanner<'a> {
    splt: Peekable<SplitWhitespace<'a>>,
}

impl<'a> CmdScanner<'a> {
    fn read_stdin(buf: &'a mut String) -> Result<Self> {
        buf.clear();
        anyhow::ensure!(std::io::stdin().read_line(buf)? > 0, "End of input");
        let splt = buf.split_whitespace().peekable();
        Ok(Self { splt })
    }
    fn next(&mut self) -> Result<&str> {
        self.splt.next().context("End of stream")
    }
    fn parse_next<T: FromStr>(&mut self) -> Result<T> {
        self.next()?.parse::<T>().ok().context("Parse error")
    }
    fn rest(&mut self) -> String {
        self.splt.by_ref().collect::<Vec<_>>().join(" ")
    }
}
