use clap::Parser;
use startup_metrics::utils::error::{AnalysisError, ErrorSeverity};
use startup_metrics::utils::{logger, validation::Validate};
use startup_metrics::{
    AnalysisEngine, AssessmentPipeline, ChatNarrator, CliArgs, LocalStorage, Settings,
};
use std::sync::Arc;

fn exit_code(err: &AnalysisError) -> i32 {
    match err.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(err: &AnalysisError) -> ! {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        err,
        err.category(),
        err.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", err.recovery_suggestion());
    eprintln!("❌ {}", err.user_friendly_message());
    eprintln!("💡 {}", err.recovery_suggestion());
    std::process::exit(exit_code(err));
}

fn display_settings_summary(settings: &Settings) {
    tracing::info!("📋 Input: {}", settings.input.path);
    tracing::info!(
        "📋 Horizon: {} months / {} years, thresholds: LTV/CAC > {}, margin > {}, CAGR > {}",
        settings.metrics.horizon_months,
        settings.metrics.horizon_years,
        settings.metrics.ratio_threshold,
        settings.metrics.margin_threshold,
        settings.metrics.cagr_threshold
    );
    tracing::info!(
        "📋 Output: {} ({:?}{})",
        settings.output.path,
        settings.output.formats,
        if settings.output.compress { ", zipped" } else { "" }
    );
    if settings.narrative.enabled {
        tracing::info!(
            "📋 Narrative: {} deployment at {}",
            settings.narrative.deployment.as_deref().unwrap_or("?"),
            settings.narrative.endpoint.as_deref().unwrap_or("?")
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logger::init_cli_logger(args.verbose);

    tracing::info!("Starting startup-metrics");

    let settings = match args.resolve_settings() {
        Ok(settings) => settings,
        Err(e) => fail(&e),
    };
    if let Err(e) = settings.validate() {
        fail(&e);
    }
    display_settings_summary(&settings);

    let narrator = if settings.narrative.enabled && !args.dry_run {
        match ChatNarrator::from_settings(&settings.narrative) {
            Ok(narrator) => Some(narrator),
            Err(e) => fail(&e),
        }
    } else {
        None
    };

    let mut pipeline = AssessmentPipeline::new(LocalStorage::default(), settings);
    if let Some(narrator) = narrator {
        pipeline = pipeline.with_narrator(Arc::new(narrator));
    }

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        let report = match pipeline.dry_run().await {
            Ok(report) => report,
            Err(e) => fail(&e),
        };
        println!(
            "{} records, {} well-formed, {} malformed",
            report.total,
            report.well_formed,
            report.malformed.len()
        );
        for (index, reason) in report.malformed.iter().take(20) {
            println!("  row {}: {}", index, reason);
        }
        return Ok(());
    }

    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }
    let engine = AnalysisEngine::new_with_monitoring(pipeline, args.monitor);

    match engine.run().await {
        Ok(outcome) => {
            let summary = &outcome.summary;
            println!("✅ Assessed {} of {} startups", summary.assessed, summary.total);
            println!(
                "   Good: {}  Risky: {}  Failed: {}",
                summary.good, summary.risky, summary.failed
            );
            if summary.narrated + summary.narrative_failures > 0 {
                println!(
                    "   Narratives: {} written, {} failed",
                    summary.narrated, summary.narrative_failures
                );
            }
            println!("📁 Output saved to: {}", outcome.output_path);
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
