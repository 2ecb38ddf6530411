use fixed_pool::{Config, ThreadPool};
use clap::Parser;
use log::{error, info};
use rand::Rng;
use std::{
    process::exit,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};


#[derive(Parser)]
#[command(name = "fixed-pool-demo", version, about = "Fixed-size thread pool demo")]
struct Cli {
    /// Worker threads, 0 = number of CPUs
    #[arg(long, env = "POOL_THREADS", default_value_t = 4)]
    threads: usize,

    /// Jobs queued before the pool is started
    #[arg(long, env = "POOL_JOBS", default_value_t = 1_000_000)]
    jobs: usize,

    /// Pause between queuing and init, milliseconds
    #[arg(long, default_value_t = 2000)]
    delay_init_ms: u64,

    /// Pin workers to CPU cores
    #[arg(long)]
    affinity: bool,

    /// Metrics print interval, milliseconds
    #[arg(long, default_value_t = 1000)]
    monitor_ms: u64,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = multiplication_example(cli.affinity) {
        error!("{}", e);
        exit(1);
    }
    if let Err(e) = throughput_run(&cli) {
        error!("{}", e);
        exit(1);
    }
}

fn simulate_hard_computation() {
    let ms = rand::thread_rng().gen_range(10..50);
    thread::sleep(Duration::from_millis(ms));
}

fn multiplication_example(affinity: bool) -> Result<(), Box<dyn std::error::Error>> {
    let pool = ThreadPool::new(3);
    pool.init(affinity)?;

    for i in 1..3 {
        for j in 1..10 {
            pool.submit(move || {
                simulate_hard_computation();
                println!("{} * {} = {}", i, j, i * j);
            });
        }
    }

    // выходной параметр через разделяемое владение
    let output = Arc::new(Mutex::new(0));
    let out = output.clone();
    let (a, b) = (5, 6);
    pool.submit(move || {
        simulate_hard_computation();
        if let Ok(mut out) = out.lock() {
            *out = a * b;
        }
    })
    .get()?;
    println!("Last operation result is equals to {}", *output.lock().map_err(|e| e.to_string())?);

    let res = pool
        .submit(|| {
            simulate_hard_computation();
            5 * 3
        })
        .get()?;
    println!("Last operation result is equals to {}", res);

    pool.shutdown();
    Ok(())
}

fn throughput_run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let pool = ThreadPool::with_config(Config::default().with_threads(cli.threads));
    let counter = Arc::new(AtomicUsize::new(0));

    let t1 = Instant::now();
    for _ in 0..cli.jobs {
        let counter = counter.clone();
        pool.submit(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
    }
    let submit_elapsed = t1.elapsed();
    info!("submit end: {} jobs queued", pool.queue_size());

    thread::sleep(Duration::from_millis(cli.delay_init_ms));

    let monitor = pool.start_monitoring(Duration::from_millis(cli.monitor_ms), |m| {
        println!(
            "Queued {} jobs (utilization: {}, {:.1}%)...",
            m.queued_tasks,
            m.active_tasks,
            m.utilization() * 100.0
        );
    });

    pool.init(cli.affinity)?;
    info!("go!");

    let t3 = Instant::now();
    while pool.queue_size() > 0 || pool.num_running() > 0 {
        thread::sleep(Duration::from_millis(1));
    }
    let handling_elapsed = t3.elapsed();

    ThreadPool::stop_monitoring(monitor);
    pool.shutdown();

    let done = counter.load(Ordering::Relaxed);
    if done != cli.jobs {
        return Err(format!("counter = {}, expected {}", done, cli.jobs).into());
    }

    println!("done");
    println!("Task queue {:?}", submit_elapsed);
    println!("Task handling {:?}", handling_elapsed);
    Ok(())
}
