#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tabsync_server::run().await
}
