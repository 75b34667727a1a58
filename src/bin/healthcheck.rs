use voicenote_backend::probe;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();

    let url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HEALTHCHECK_URL").ok())
        .unwrap_or_else(|| probe::DEFAULT_URL.to_string());

    let status = probe::check(&url, probe::DEFAULT_TIMEOUT).await;
    std::process::exit(status.exit_code());
}
