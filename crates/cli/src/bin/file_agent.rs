use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    file_agent_cli::main_entry().await
}
