use clap::Parser;

use jot_mcp::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	let args = Args::parse();
	jot_mcp::run(args).await
}
