use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use objdl_core::{
    EntityGrouping, Manifest, ObjectLister, ObjectStore, PathResolver, RetryPolicy, RetryingStore,
    S3Config, S3Store, StoreLocation, TransferObserver, WaveScheduler,
};
use tracing::{debug, info, warn};

use crate::app::progress::ProgressObserver;
use crate::app::{config, settings, summary, terminal};

pub(crate) async fn run_objdl() -> Result<()> {
    let (args, cli_sources) = settings::parse_cli_with_sources();
    let loaded = config::load_default_file_config()?;
    let args = settings::apply_config_defaults(args, &cli_sources, loaded.config.as_ref());
    let http = settings::resolve_http_settings(loaded.config.as_ref());

    terminal::init_tracing(settings::resolve_default_log_level(&args));

    if loaded.config.is_some()
        && let Some(path) = &loaded.path
    {
        debug!(path = %path.display(), "Loaded config file");
    }
    debug!(
        url = %args.url,
        output_dir = %args.output_dir.display(),
        region = %args.region,
        workers = args.workers,
        chunk_size = args.chunk_size,
        max_retries = args.max_retries,
        "Settings resolved"
    );
    info!("objdl starting");

    let location = StoreLocation::parse(&args.url)?;

    let manifest = match &args.manifest {
        Some(path) => Some(Manifest::load(path).await?),
        None => None,
    };

    let s3_config = S3Config::new(&location, &args.access_key, &args.secret_key, &args.region)
        .with_timeouts(http.connect_timeout_secs, http.read_timeout_secs)
        .with_presign_ttl(http.presign_ttl);
    let s3 = S3Store::new(&s3_config).context("Failed to build store client")?;

    let store: Arc<dyn ObjectStore> = if args.max_retries > 0 {
        let policy = RetryPolicy::from_retries(u32::from(args.max_retries));
        debug!(max_attempts = policy.max_attempts(), "range retries enabled");
        Arc::new(RetryingStore::new(s3, policy))
    } else {
        Arc::new(s3)
    };

    let mut lister = ObjectLister::new(Arc::clone(&store));
    if let Some(manifest) = manifest {
        lister = lister.with_manifest(manifest);
    }
    let objects = lister
        .list(location.bucket(), location.prefix(), !args.no_recursive)
        .await?;

    let grouping = if args.flat {
        EntityGrouping::Flat
    } else {
        EntityGrouping::default()
    };
    let resolver = Arc::new(PathResolver::with_grouping(&args.output_dir, grouping));

    if args.dry_run {
        summary::print_dry_run(&objects, &resolver);
        return Ok(());
    }

    if objects.is_empty() {
        info!("No objects matched; nothing to download");
    }

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory '{}'",
                args.output_dir.display()
            )
        })?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current wave");
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let mut scheduler = WaveScheduler::new(
        store,
        location.bucket(),
        Arc::clone(&resolver),
        usize::from(args.workers),
        args.chunk_size,
    )?;

    let show_progress = terminal::should_show_progress(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let progress = show_progress.then(|| Arc::new(ProgressObserver::new(objects.len())));
    if let Some(progress) = &progress {
        scheduler = scheduler.with_observer(Arc::clone(progress) as Arc<dyn TransferObserver>);
    }

    let report = scheduler.run_interruptible(objects, &interrupted).await;

    if let Some(progress) = &progress {
        progress.finish();
    }

    summary::print_completion_summary(&report, &args.output_dir);
    if let Some(path) = &args.report {
        summary::write_report(&report, path)?;
    }

    Ok(())
}
