// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! meshlink relay: bus subjects in, renderer commands out over WebSocket.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use clap::Parser;
use meshlink_bus::{Backoff, Bus};
use meshlink_missions::MissionPool;
use meshlink_relay::config::{load_prefs, Args, RelaySettings};
use meshlink_relay::hub::Hub;
use meshlink_relay::router::Router;
use meshlink_relay::service::{log_reports, spawn_linked, RelayService};
use meshlink_relay::session;
use meshlink_relay::sink::BusSink;
use meshlink_scene::SceneBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let prefs = load_prefs(!args.no_prefs);
    let settings = RelaySettings::resolve(args, prefs)?;

    let bus = Bus::connect(&settings.bus_url, &Backoff::default())
        .await
        .with_context(|| format!("connect to bus at {}", settings.bus_url))?;
    let bus = Arc::new(bus);

    let hub = Hub::new();
    let pool = Arc::new(MissionPool::start(
        settings.pool,
        Arc::new(BusSink::new(Arc::clone(&bus))),
    ));
    let router = Router::new(
        settings.namespace.clone(),
        SceneBuilder::new(settings.scene.clone()),
        settings.format,
    );
    let service = RelayService::new(Arc::clone(&bus), hub.clone(), router, Arc::clone(&pool));
    let subscription = service.subscribe().await.context("subscribe to namespace")?;

    let shutdown = CancellationToken::new();
    // losing the relay loop takes the listener down too
    let relay = spawn_linked(shutdown.clone(), {
        let shutdown = shutdown.clone();
        async move { service.serve(subscription, shutdown).await }
    });
    let reports = tokio::spawn(log_reports(Arc::clone(&pool), shutdown.clone()));

    let app = session::app(hub, settings.session.clone());
    let handle = Handle::new();
    // graceful shutdown on Ctrl+C
    tokio::spawn({
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => match res {
                    Ok(()) => info!("ctrl-c received; shutting down"),
                    Err(err) => {
                        error!(?err, "failed to install ctrl-c handler");
                        shutdown.cancelled().await;
                    }
                },
                () = shutdown.cancelled() => {}
            }
            shutdown.cancel();
            handle.graceful_shutdown(Some(Duration::from_secs(5)));
        }
    });

    let served = match &settings.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .context("load tls config")?;
            info!("relay listening (TLS) on {}", settings.listen);
            axum_server::bind_rustls(settings.listen, tls_config)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
        }
        None => {
            info!("relay listening on {}", settings.listen);
            axum_server::bind(settings.listen)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
        }
    };

    shutdown.cancel();
    pool.shutdown().await;
    match relay.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(%err, "relay loop ended"),
        Err(err) => error!(?err, "relay task failed"),
    }
    if let Err(err) = reports.await {
        error!(?err, "report task failed");
    }
    served.context("serve websocket listener")?;
    Ok(())
}
