use pcdomain::{run_from_config, setup_logging, AppError, CliArgs, LoggingSettings, PipelineConfig};
use std::process::ExitCode;
use tracing::{error, info};

fn run(args: &CliArgs, loaded: Result<PipelineConfig, AppError>) -> Result<(), AppError> {
    let mut config = loaded?;
    info!(
        path = %args.config_path.display(),
        stages = config.stages.len(),
        "loaded pipeline"
    );
    config.apply_cli(args);

    let summary = run_from_config(&config)?;
    for (index, report) in summary.reports.iter().enumerate() {
        info!(index, ?report, "stage report");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let loaded = PipelineConfig::load_from_file(&args.config_path);

    let logging = LoggingSettings::resolve(loaded.as_ref().ok(), &args);
    if let Err(e) = setup_logging(&logging, args.json_logs) {
        eprintln!("pcdomain: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&args, loaded) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("pcdomain: {}", e);
            ExitCode::FAILURE
        }
    }
}
