use anyhow::{bail, Context};
use placer_agent::prelude::*;
use rand::SeedableRng;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PlacerConfig::from_env().context("loading configuration")?;
    config.validate().context("validating configuration")?;

    print_banner(&config);
    let session = prompt_session(&config.endpoints.session_cookie_name).await?;

    let http = build_http_client(&config)?;
    let provider = SessionTokenProvider::new(
        http.clone(),
        config.endpoints.token_page.clone(),
        &config.endpoints.session_cookie_name,
        &session,
    );
    let refresher = TokenRefresher::new(Arc::new(provider), config.token_refresh());
    let token = refresher.reader();

    let mut rng = rand::rngs::StdRng::from_os_rng();
    while let Err(e) = refresher.refresh().await {
        if !e.is_retryable() {
            return Err(e).context("obtaining the first token");
        }
        let wait = config.backoff.draw(&mut rng);
        tracing::error!(error = %e, "could not obtain a token, retrying in {}s", wait.as_secs());
        tokio::time::sleep(wait).await;
    }
    let _refresh_task = refresher.spawn();

    let mut controller = CycleController::new(
        &config,
        Arc::new(HttpImageSource::new(http.clone())),
        Arc::new(GqlCanvasClient::new(http, &config)),
        token,
        Arc::new(TokioClock),
    );
    controller.run().await;
    Ok(())
}

fn print_banner(config: &PlacerConfig) {
    println!("canvas placer v{}", placer_agent::VERSION);
    println!("Using template: {}", config.template_url);
    println!();
    println!("The placer uses your session cookie to place pixels on your behalf.");
    println!("To find it:");
    println!("- Open {} in your browser while logged in", config.endpoints.token_page);
    println!("- Open the developer tools and select the network panel");
    println!("- Reload the page and select the first document request");
    println!("- Under cookies, copy the value of '{}' without quotes", config.endpoints.session_cookie_name);
    println!();
}

async fn prompt_session(cookie_name: &str) -> anyhow::Result<String> {
    print!("Input {cookie_name} cookie: ");
    std::io::stdout().flush().context("flushing prompt")?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("reading session cookie")?;

    let session = line.trim();
    if session.is_empty() {
        bail!("no session cookie supplied");
    }
    Ok(session.to_owned())
}
