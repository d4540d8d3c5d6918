use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let _log_guard = aoai_chat::logging::init();
    aoai_chat::run().await
}
