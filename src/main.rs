use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelwatch::app::Session;
use reelwatch::cli::Cli;
use reelwatch::config::Config;
use reelwatch::daemon::{self, Daemon, DaemonConfig};
use reelwatch::fetcher::HttpFetcher;
use reelwatch::pipeline::Pipeline;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !cli.is_foreground() {
        let pid = daemon::detach()?;
        println!("reelwatch running in the background (PID: {})", pid);
        return Ok(());
    }

    init_tracing(&cli)?;

    let config = match Config::load(cli.configfile.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };

    let mut session = Session::open(config)?;
    let notifier = daemon::connect_notifier(session.prowl_apikey.as_deref()).await;
    let pipeline = Pipeline::new(Arc::new(HttpFetcher::new()), notifier);

    let daemon = Daemon::new(
        pipeline,
        DaemonConfig {
            run_once: cli.is_once(),
            xml_file: cli.xml.clone(),
        },
    );
    daemon.install_signal_handler();
    daemon.run(&mut session).await?;

    Ok(())
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    let registry = tracing_subscriber::registry().with(filter);

    match cli.logfile {
        Some(ref path) => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(cli.append_log)
                .truncate(!cli.append_log)
                .open(path)?;
            registry
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .init();
        }
        None => {
            registry
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
