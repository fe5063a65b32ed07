#![forbid(unsafe_code)]

//! bindstore demo binary entry point.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use bindstore_core::logging::init_json;
use bindstore_core::{AffinityContext, AffinityThread, Bindable, DispatchPriority, StoreConfig};
use bindstore_demo::cli::{self, LogFormat};
use bindstore_demo::trader::{KickOutcome, TraderViewModel};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(filter: Option<&str>, format: LogFormat) {
    if format == LogFormat::Json {
        let directives = filter
            .map(str::to_owned)
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_owned());
        let _ = init_json(Some(&directives));
        return;
    }
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}

/// Wait until everything queued so far has run on the affinity thread.
fn drain(context: &Arc<dyn AffinityContext>) -> bool {
    let (tx, rx) = mpsc::channel();
    context.submit(
        Box::new(move || {
            let _ = tx.send(());
        }),
        DispatchPriority::Background,
    );
    rx.recv_timeout(Duration::from_secs(10)).is_ok()
}

fn run(opts: &cli::Opts) -> Result<(), Box<dyn std::error::Error>> {
    let affinity = AffinityThread::start_named("bindstore-ui")?;
    let context = affinity.handle();
    let vm = TraderViewModel::new(&opts.trader, Arc::clone(&context), StoreConfig::from_env())?;

    let _sub = vm.props().subscribe(|vm: &TraderViewModel, name| {
        match vm.props().get_value_via_owner(name) {
            Ok(value) => info!(property = name, value = ?value, "changed"),
            Err(err) => warn!(property = name, error = %err, "changed but unreadable"),
        }
    });
    info!(
        priority = ?vm.props().config().notify_priority,
        subscribers = vm.props().subscriber_count(),
        "view model ready"
    );

    let workers: Vec<_> = (0..opts.workers)
        .map(|worker| {
            let vm = Arc::clone(&vm);
            let orders = opts.orders;
            thread::Builder::new()
                .name(format!("worker-{worker}"))
                .spawn(move || -> bindstore_core::Result<()> {
                    for _ in 0..orders {
                        vm.record_fill(worker)?;
                    }
                    Ok(())
                })
        })
        .collect::<Result<_, _>>()?;
    for worker in workers {
        match worker.join() {
            Ok(result) => result?,
            Err(_) => warn!("worker thread panicked"),
        }
    }

    let answer = opts.confirm_kick;
    match vm.kick_trader(&|title: &str, message: &str| {
        info!(%title, %message, answer, "confirmation requested");
        answer
    })? {
        KickOutcome::Kicked => println!("{} was kicked off", vm.trader_name()?),
        KickOutcome::Declined => println!("kick cancelled"),
        KickOutcome::NotConnected => println!("trader already disconnected"),
    }

    if !drain(&context) {
        warn!("affinity thread did not drain in time");
    }

    println!("orders filled: {}", vm.orders_filled()?);
    println!("status: {}", vm.status()?);
    for name in vm.props().registry().names() {
        let error = vm.error_for(name)?;
        if error.is_empty() {
            println!("{name}: ok");
        } else {
            println!("{name}: {error}");
        }
    }

    affinity.shutdown();
    Ok(())
}

fn main() {
    let opts = cli::Opts::parse();
    init_logging(opts.log.as_deref(), opts.log_format);

    if let Err(e) = run(&opts) {
        eprintln!("Demo failed: {e}");
        std::process::exit(1);
    }
}
