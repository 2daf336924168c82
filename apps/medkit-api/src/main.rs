use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = medkit_api::Args::parse();
	medkit_api::run(args).await
}
