use {
    crate::{
        api::{self, AppState},
        arguments::Arguments,
        deployment::Deployer,
        heartbeat::Heartbeat,
        infra::blockchain,
        record::{self, DeploymentRecord},
    },
    anyhow::{Context, Result},
    clap::Parser,
    std::{future::IntoFuture, sync::Arc, time::Duration},
    tracing::info_span,
};

pub async fn start(args: impl Iterator<Item = String>) {
    let args = Arguments::parse_from(args);
    let obs_config = observe::Config::new(
        args.logging.log_filter.as_str(),
        args.logging.log_stderr_threshold.into_level(),
        args.logging.use_json_logs,
    );
    observe::tracing::initialize(&obs_config);
    tracing::info!("running token deployer with validated arguments:\n{}", args);
    observe::metrics::setup_registry(Some("gbt_token_deployer".into()), None);

    if let Err(err) = run(args).await {
        tracing::error!(?err, "token deployer stopped");
        std::process::exit(1);
    }
}

pub async fn run(args: Arguments) -> Result<()> {
    let startup_span = info_span!("token_deployer_startup", rpc_url = %args.rpc_url);
    let startup_span = startup_span.enter();

    let solc_version = args.solc_version.clone();
    let contract = tokio::task::spawn_blocking(move || contracts::compile(&solc_version))
        .await
        .context("compiler task panicked")?
        .context("failed to compile token contract")?;
    let contract = Arc::new(contract);

    let records = Arc::new(record::Store::new(&args.deployment_file));
    let created = records
        .ensure_initialized(&DeploymentRecord::initial(
            args.rpc_url.as_str(),
            args.chain_id,
            &args.gas_wallet,
        ))
        .await
        .context("failed to initialize deployment record")?;
    if created {
        tracing::info!(path = %records.path().display(), "created deployment record");
    }

    let chain = blockchain::Rpc::new(
        args.rpc_url.clone(),
        args.receipt_timeout,
        args.receipt_poll_interval,
    );
    let deployer = Arc::new(Deployer::new(
        contract,
        Arc::new(chain),
        records.clone(),
        args.private_key,
        args.chain_id,
    ));

    let heartbeat = Heartbeat::new(args.heartbeat_interval).spawn();

    let router = api::handle_all_routes(AppState {
        deployer,
        records,
        static_dir: args.static_dir,
    });
    let listener = tokio::net::TcpListener::bind(args.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", args.bind_address))?;
    tracing::info!(address = %args.bind_address, "serving api");

    drop(startup_span);

    let (shutdown_sender, shutdown_receiver) = tokio::sync::oneshot::channel::<()>();
    let mut serve_api = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_receiver.await;
            })
            .into_future(),
    );

    tokio::select! {
        result = &mut serve_api => {
            tracing::error!(?result, "API task exited");
        }
        result = heartbeat => {
            tracing::error!(?result, "heartbeat task exited");
        }
        _ = shutdown_signal() => {
            tracing::info!("gracefully shutting down API");
            let _ = shutdown_sender.send(());
            match tokio::time::timeout(Duration::from_secs(10), serve_api).await {
                Ok(result) => result
                    .context("API task panicked")?
                    .context("API failed during shutdown")?,
                Err(_) => tracing::error!("API shutdown exceeded timeout"),
            }
        }
    };
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Kubernetes sends sigterm, locally ctrl-c is most common.
    let (Ok(mut sigterm), Ok(mut sigint)) = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) else {
        tracing::warn!("failed to install signal handlers");
        return std::future::pending().await;
    };
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(windows)]
async fn shutdown_signal() {
    // We don't support signal handling on windows
    std::future::pending().await
}
