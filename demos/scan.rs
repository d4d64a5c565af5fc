//! Service scanning example.
//!
//! Browses the local network for a service type and prints every instance
//! as it is found, resolved or removed.
//!
//! # Usage
//!
//! ```
//! cargo run --example scan
//! cargo run --example scan -- --service ipp --protocol tcp --duration 30
//! ```

use std::time::Duration;

use chrono::Local;
use clap::Parser;
use zeroconf_sd::{Event, EventKind, Zeroconf, ZeroconfConfig};

#[derive(Parser, Debug)]
#[command(name = "scan")]
#[command(about = "Browse the local network for DNS-SD services")]
struct Args {
    /// Service type to browse for (without underscore)
    #[arg(long, default_value = "http")]
    service: String,

    /// Transport protocol, tcp or udp
    #[arg(long, default_value = "tcp")]
    protocol: String,

    /// Discovery domain
    #[arg(long, default_value = "local.")]
    domain: String,

    /// How long to scan, in seconds
    #[arg(long, default_value = "10")]
    duration: u64,
}

fn stamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let zeroconf = Zeroconf::new(ZeroconfConfig::default());

    zeroconf.on(EventKind::Found, |event| {
        if let Event::Found(record) = event {
            println!("[{}] found    {}", stamp(), record.full_name());
        }
    });
    zeroconf.on(EventKind::Resolved, |event| {
        if let Event::Resolved(record) = event {
            println!(
                "[{}] resolved {} -> {}:{} {:?}",
                stamp(),
                record.full_name(),
                record.host.as_deref().unwrap_or("?"),
                record.port.unwrap_or(0),
                record.addresses,
            );
        }
    });
    zeroconf.on(EventKind::Remove, |event| {
        if let Event::Remove(name) = event {
            println!("[{}] removed  {name}", stamp());
        }
    });
    zeroconf.on(EventKind::Error, |event| {
        if let Event::Error(err) = event {
            eprintln!("[{}] error: {err}", stamp());
        }
    });

    log::info!(
        "scanning for _{}._{}.{} for {}s",
        args.service,
        args.protocol,
        args.domain,
        args.duration
    );
    zeroconf.scan(&args.service, &args.protocol, &args.domain);

    tokio::time::sleep(Duration::from_secs(args.duration)).await;

    let services = zeroconf.get_services();
    println!("\n{} service(s) after {}s:", services.len(), args.duration);
    for record in &services {
        println!("  {record}");
    }

    zeroconf.shutdown().await;
    Ok(())
}
