use std::process::ExitCode;

use clap::Parser;
use edu_gradebook::{
    app_state::AppState,
    config::Config,
    errors::{AppError, AppResult, ErrorResponse},
    services::{
        auto_grading,
        evaluation_report::{self, EvaluationReport},
    },
};

#[derive(Debug, Parser)]
#[command(
    name = "edu-gradebook",
    version,
    about = "Gradebook for one class: view, grade and report"
)]
struct Args {
    /// Class to open; falls back to GRADEBOOK_CLASS_ID
    class_id: Option<String>,

    /// Grade pending submitted attempts before printing
    #[arg(long)]
    auto_grade: bool,

    /// Print the report for one evaluation instead of the grid
    #[arg(long, value_name = "EVALUATION_ID", conflicts_with = "remedial")]
    report: Option<String>,

    /// List students with a grade below MIN_GRADE
    #[arg(long, value_name = "MIN_GRADE", num_args = 0..=1, default_missing_value = "4.0")]
    remedial: Option<f64>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let body = ErrorResponse::from(&err);
            log::error!("{}", serde_json::to_string(&body).unwrap_or_else(|_| err.to_string()));
            eprintln!("error: {}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AppResult<()> {
    let args = Args::parse();
    let config = Config::from_env();
    config.validate_settings()?;
    if config.uses_default_token() {
        log::warn!("GRADEBOOK_API_TOKEN is not set, using the development token");
    }

    let class_id = args
        .class_id
        .clone()
        .or_else(|| config.class_id.clone())
        .ok_or_else(|| {
            AppError::ValidationError(
                "no class id given and GRADEBOOK_CLASS_ID is unset".to_string(),
            )
        })?;

    log::info!("Opening gradebook for class {} at {}", class_id, config.api_base_url);
    let state = AppState::new(config)?;
    let store = state.store_for(&class_id);
    let mut surface = state.surface(&class_id);

    if let Err(err) = surface.mount().await {
        // a stale snapshot can still be shown; without one there is nothing to print
        if store.snapshot().is_none() {
            return Err(err);
        }
    }

    if args.auto_grade {
        let summary = auto_grading::process_pending(&store).await?;
        for (key, err) in &summary.failures {
            eprintln!("auto-grading {} failed: {}", key, err.user_message());
        }
        if let Err(err) = surface.refresh().await {
            log::warn!("Reload after auto-grading failed: {}", err);
        }
    }

    if let Some(evaluation_id) = &args.report {
        let snapshot = store
            .snapshot()
            .ok_or_else(|| AppError::NotFound(format!("gradebook for class {}", class_id)))?;
        let report = EvaluationReport::build(&snapshot, evaluation_id)?;
        if args.json {
            println!("{}", to_json(&report)?);
        } else {
            println!("{}", report.to_csv());
        }
    } else if let Some(min_grade) = args.remedial {
        let snapshot = store
            .snapshot()
            .ok_or_else(|| AppError::NotFound(format!("gradebook for class {}", class_id)))?;
        let candidates = evaluation_report::remedial_candidates(&snapshot, min_grade);
        if args.json {
            println!("{}", to_json(&candidates)?);
        } else if candidates.is_empty() {
            println!("No grades below {:.1}", min_grade);
        } else {
            for (student, failed) in &candidates {
                let failed: Vec<String> = failed
                    .iter()
                    .map(|(evaluation, grade)| format!("{} ({:.1})", evaluation.title, grade))
                    .collect();
                println!("{}: {}", student.full_name(), failed.join(", "));
            }
        }
    } else {
        let view = surface.render();
        if args.json {
            println!("{}", to_json(&view)?);
        } else {
            println!("{}", view);
        }
    }

    surface.teardown();
    state.shutdown();
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string_pretty(value).map_err(|err| AppError::ValidationError(err.to_string()))
}
