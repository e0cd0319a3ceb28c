use clap::Parser;
use g2p_hermes_rs::{CliArgs, G2pHermes};
use log::{LevelFilter, debug};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let mut logger = env_logger::Builder::new();
    logger.filter_level(LevelFilter::Info).parse_default_env();
    if args.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    debug!("{:?}", args);
    let config = args.into_config()?;

    let service = G2pHermes::new(&config);
    service
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;
    Ok(())
}
