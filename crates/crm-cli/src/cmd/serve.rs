use super::Globals;
use anyhow::Context;
use crm_server::state::AppState;
use std::sync::Arc;

/// Run the JSON API until Ctrl-C.
pub fn run(g: &Globals, port: u16) -> anyhow::Result<()> {
    // Fail early on an uninitialized root instead of on the first request.
    g.session()?;
    let state = AppState::new(g.root.clone())
        .with_user(g.user.clone())
        .with_clock(Arc::from(g.clock()?));

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        let actual_port = listener.local_addr()?.port();
        println!("CRM API → http://localhost:{actual_port}/api");

        tokio::select! {
            res = crm_server::serve_on(state, listener) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
