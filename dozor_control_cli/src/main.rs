use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use libdozor_control::config::Config;
use libdozor_control::execution::LocalExecutor;
use libdozor_control::header::FixedHeaderService;
use libdozor_control::process::{process, RunReport};
use libdozor_control::worker_status::{BarColor, WorkerStatus};

const RESULTS_FILE: &str = "dozor_results.yml";

fn make_template_config(path: &Path) {
    match Config::default().write_config_file(path) {
        Ok(()) => log::info!("Done."),
        Err(e) => log::error!("Could not write template config: {e}"),
    }
}

/// Send the library's spdlog output to a log file
fn init_file_logger() -> Result<(), spdlog::Error> {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from("./dozor_control.log"))
            .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()?,
    );
    let logger = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()?,
    );
    spdlog::set_default_logger(logger);
    Ok(())
}

fn write_results(report: &RunReport) {
    match serde_yaml::to_string(report) {
        Ok(yaml_str) => match std::fs::write(RESULTS_FILE, yaml_str) {
            Ok(()) => log::info!("Wrote image results to {RESULTS_FILE}"),
            Err(e) => log::error!("Could not write {RESULTS_FILE}: {e}"),
        },
        Err(e) => log::error!("Could not serialize results: {e}"),
    }
}

fn update_bar(pb: &ProgressBar, status: &WorkerStatus) {
    pb.set_position((status.progress * 100.0) as u64);
    pb.set_message(format!("batch starting at image {}", status.batch));
    if status.color == BarColor::RED {
        log::warn!(
            "Batch starting at image {} failed, check dozor_control.log",
            status.batch
        );
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("dozor_control_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }
    if let Err(e) = init_file_logger() {
        log::error!("Could not create log file: {e}");
        return;
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(path) => PathBuf::from(path),
        None => {
            log::error!("A config path is required (-p/--path)");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(&config_path);
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Working Path: {}", config.working_path.to_string_lossy());
    log::info!("Executable: {}", config.executor.executable);
    log::info!("Beamline: {}", config.beamline.as_deref().unwrap_or("None"));
    log::info!("Submit to cluster: {}", config.on_cluster);

    let header_service = match &config.header {
        Some(header) => FixedHeaderService::new(header.clone()),
        None => {
            log::error!("The config has no image header; one is required to run dozor");
            return;
        }
    };
    let executor = LocalExecutor::new(config.executor.clone());

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}") {
        pb.set_style(style);
    }
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    // Spawn the task!
    let handle =
        std::thread::spawn(move || process(config, &header_service, &executor, tx, 0));

    loop {
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(status) => update_bar(&pb, &status),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if handle.is_finished() {
            // Drain whatever the worker sent before finishing
            while let Ok(status) = rx.try_recv() {
                update_bar(&pb, &status);
            }
            break;
        }
    }

    pb.finish();

    match handle.join() {
        Ok(Ok(report)) => {
            if report.is_partial() {
                log::warn!(
                    "{} of {} batches failed; results are partial",
                    report.failed_batches.len(),
                    report.n_batches
                );
            }
            log::info!(
                "Processed {} images with detector {}",
                report.records.len(),
                report
                    .detector_type
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| String::from("unknown"))
            );
            if let Some(all) = &report.dozor_all_file {
                log::info!("Mesh results collected in {}", all.to_string_lossy());
            }
            write_results(&report);
        }
        Ok(Err(e)) => log::error!("Processing failed with error: {e}"),
        Err(_) => log::error!("Failed to join processing task!"),
    }

    log::info!("Done.");
}
