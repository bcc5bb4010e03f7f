#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = exam_sessions::run().await {
        eprintln!("exam-sessions fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
