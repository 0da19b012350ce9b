#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dayflow_backend::run().await
}
