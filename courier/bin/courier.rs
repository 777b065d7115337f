#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = courier::config::Config::resolve()?;
    courier::controller::Courier::new(config).run().await
}
