use cosmofeed::{
    config::Config,
    scheduler::{run_forever, Context},
};
use log::info;

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    info!(
        "Posting to {} every {:.1} hrs",
        config.telegram_chat_id,
        config.posting_delay_hours()
    );
    let ctx = Context::from_config(config)?;
    run_forever(&ctx).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    better_panic::install();
    env_logger::init();

    match run().await {
        Ok(_) => {}
        Err(err) => eprintln!("{:?}", err),
    };
}
