use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use nscookie::{core::inspect::BtfInfo, helpers::logger::Logger, CookieResolver};

mod cli;
use cli::{Cli, Format};

/// What the probe found out about one kernel.
#[derive(Serialize)]
struct Report<'a> {
    /// Does this kernel expose net.net_cookie?
    supported: bool,
    /// Byte offsets of the device path, in walk order.
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<&'a [u64]>,
    /// Byte offsets of the socket path, in walk order.
    #[serde(skip_serializing_if = "Option::is_none")]
    socket: Option<&'a [u64]>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    Logger::init(cli.log_level()?)?;

    let info = match &cli.btf {
        Some(path) => BtfInfo::from_file(path)?,
        None => BtfInfo::system()?,
    };

    let resolver = CookieResolver::new(&info)?;
    let report = Report {
        supported: resolver.supported(),
        device: resolver.device_chain().map(|c| c.offsets()),
        socket: resolver.socket_chain().map(|c| c.offsets()),
    };

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string(&report)?),
        Format::Text => {
            println!(
                "netns cookie attribution: {}",
                match report.supported {
                    true => "supported",
                    false => "not supported",
                }
            );
            if let (Some(dev), Some(sk)) = (report.device, report.socket) {
                println!("device path offsets: {dev:?}");
                println!("socket path offsets: {sk:?}");
            }
        }
    }

    Ok(())
}
