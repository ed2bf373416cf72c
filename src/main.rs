//! Console front end: runs the configured analysis once, printing status
//! entries as they are delivered. The interactive UI plugs into the same
//! `LogSink`/`TaskRunner` surface this binary exercises.

use std::time::Duration;

use appraise::analysis::AlgorithmConfig;
use appraise::logging;
use appraise::settings;
use appraise::status_log::{self, LogEntry, LogSink, LogTarget, Severity};
use appraise::tasks::{TaskArg, TaskHandle, TaskRunner};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let settings = settings::load_or_default()?;
    let config = settings.analysis.to_algorithm_config()?;

    let sink = status_log::sink();
    sink.attach(Box::new(ConsoleTarget));

    let outcome = run_analysis(&sink, config);
    sink.detach();
    outcome?;
    Ok(())
}

/// Run one analysis to completion, keeping the owner thread draining its own
/// status queue while the worker progresses.
fn run_analysis(
    sink: &std::sync::Arc<LogSink>,
    config: AlgorithmConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    sink.info(format!("Starting {}", config.summary()));
    let worker_sink = sink.clone();
    let mut handle = TaskHandle::with_arg(
        move |arg| analysis_work(&worker_sink, arg),
        config,
    );
    let runner = TaskRunner::new(sink.clone());
    let drain_sink = sink.clone();
    runner.run(&mut handle, &mut || {
        drain_sink.deliver_pending();
    })?;
    sink.info("Analysis complete");
    sink.deliver_pending();
    Ok(())
}

/// Worker-side entry point. The statistical computation itself lives in the
/// analysis backend; this drives it step by step and reports progress.
fn analysis_work(sink: &LogSink, arg: Option<TaskArg>) -> Result<(), String> {
    let config = arg
        .ok_or_else(|| "analysis run started without a configuration".to_string())?
        .downcast::<AlgorithmConfig>()
        .map_err(|_| "analysis run argument was not an algorithm configuration".to_string())?;

    let steps: &[&str] = match *config {
        AlgorithmConfig::NaiveBayes(_) => {
            &["Loading assessment data", "Clustering", "Fitting class priors", "Scoring"]
        }
        AlgorithmConfig::DecisionTrees(_) => {
            &["Loading assessment data", "Clustering", "Splitting train/test", "Growing tree", "Scoring"]
        }
    };
    for (index, step) in steps.iter().enumerate() {
        sink.info(format!("[{}/{}] {step}", index + 1, steps.len()));
        // Placeholder for the backend call; keeps the demo observable.
        std::thread::sleep(Duration::from_millis(150));
    }
    Ok(())
}

/// Prints entries to stdout; "reveal" is a no-op for a scrolling console.
struct ConsoleTarget;

impl LogTarget for ConsoleTarget {
    fn append(&mut self, entry: &LogEntry) {
        let tag = match entry.severity {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        };
        println!("[{tag}] {}", entry.text);
    }

    fn reveal_latest(&mut self) {}
}
