pub mod server;

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::{
	Parser,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use jot_service::JotService;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(
	version = VERSION,
	rename_all = "kebab",
	styles = styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

pub async fn run(args: Args) -> Result<()> {
	let config = jot_config::load(&args.config)?;
	init_tracing(&config);
	let bind_addr: SocketAddr = config.service.mcp_bind.parse()?;
	let upstream = jot_upstream::connect(&config.upstream)?;
	let service = Arc::new(JotService::new(&config, upstream));

	// The server starts either way; tool calls retry the connection on demand.
	if service.connection.ensure_connected().await? {
		tracing::info!(base_url = %config.upstream.base_url, "Upstream reachable at startup.");
	} else {
		let last_error = service.connection.info().last_error.unwrap_or_default();

		tracing::warn!(
			base_url = %config.upstream.base_url,
			last_error = %last_error,
			"Upstream unreachable at startup."
		);
	}

	server::serve_mcp(bind_addr, service.clone(), shutdown_signal()).await?;
	service.shutdown().await?;

	tracing::info!("Shutdown complete.");

	Ok(())
}

fn init_tracing(config: &jot_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "Failed to listen for the shutdown signal.");

		// Without a signal handler the server runs until the process is killed.
		std::future::pending::<()>().await;
	}

	tracing::info!("Shutdown signal received.");
}
