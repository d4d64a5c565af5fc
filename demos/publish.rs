//! Service publishing example.
//!
//! Announces a service on the local network and answers queries for it
//! until interrupted.
//!
//! # Usage
//!
//! ```
//! cargo run --example publish
//! cargo run --example publish -- --name "My Web Server" --port 8080
//! ```

use clap::Parser;
use zeroconf_sd::{Event, EventKind, ServiceRegistration, Zeroconf, ZeroconfConfig};

#[derive(Parser, Debug)]
#[command(name = "publish")]
#[command(about = "Publish a DNS-SD service on the local network")]
struct Args {
    /// Service type (without underscore)
    #[arg(long, default_value = "http")]
    service: String,

    /// Instance name
    #[arg(long, default_value = "zeroconf-sd demo")]
    name: String,

    /// Port to advertise
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Address to advertise in A records
    #[arg(long, default_value = "127.0.0.1")]
    addr: std::net::IpAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ZeroconfConfig::default().with_local_addr(args.addr);
    let zeroconf = Zeroconf::new(config);

    zeroconf.on(EventKind::Published, |event| {
        if let Event::Published(record) = event {
            println!("published {record}");
        }
    });
    zeroconf.on(EventKind::Error, |event| {
        if let Event::Error(err) = event {
            eprintln!("error: {err}");
        }
    });

    zeroconf.publish(
        ServiceRegistration::new(&args.service, &args.name, args.port)
            .with_txt_value("path", "/")
            .with_txt_value("demo", true),
    )?;

    log::info!(
        "announcing {}._{}._tcp.local. on port {}; press ctrl-c to stop",
        args.name,
        args.service,
        args.port
    );
    tokio::signal::ctrl_c().await?;

    // Sends the goodbye before returning.
    zeroconf.shutdown().await;
    Ok(())
}
