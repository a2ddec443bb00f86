use std::time::Instant;

use axum::{
    Extension, Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
};

use crate::{Res, api, config::Config, info, success, utils, warning};

pub fn router(state: api::AppState) -> Router {
    Router::new()
        .route("/", get(api::accounts))
        .route("/login", get(api::login))
        .route("/callback", get(api::callback))
        .route("/health", get(api::health))
        .layer(Extension(state))
        .layer(middleware::from_fn(log_request))
}

pub async fn start_api_server(config: Config, open_browser: bool) -> Res<()> {
    let addr = config.listen_addr();
    let login_url = config.login_url();
    let state = api::AppState::new(config)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    success!("Listening on http://{}", addr);

    if open_browser && webbrowser::open(&login_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            login_url
        )
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let res = next.run(req).await;

    let status = res.status();
    let elapsed = utils::format_elapsed(start.elapsed());
    if status.is_client_error() || status.is_server_error() {
        warning!("{} {} {} {}", method, path, status.as_u16(), elapsed);
    } else {
        info!("{} {} {} {}", method, path, status.as_u16(), elapsed);
    }

    res
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            warning!("Cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await
        }
    }
}
