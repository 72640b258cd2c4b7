use koin_quests::{server::start_server, util::log, Config};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    log::init();

    let config = Config::load()?;
    start_server(config).await?;

    Ok(())
}
