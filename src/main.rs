use anyhow::Context;
use clap::Parser;
use skills_timeline::utils::{logger, validation::Validate};
use skills_timeline::{CliArgs, LocalStorage, TimelineEngine, TimelineError, TimelinePipeline};

fn run(args: &CliArgs) -> anyhow::Result<()> {
    let config = args
        .resolve_config()
        .with_context(|| format!("Failed to load configuration '{}'", args.config_path().display()))?;

    config.validate()?;
    if args.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    // The only clock read in the whole run.
    let today = chrono::Local::now().date_naive();

    let pipeline = TimelinePipeline::new(LocalStorage::default(), config, today);
    let engine = TimelineEngine::new(pipeline);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        engine.dry_run()?;
        return Ok(());
    }

    let output = engine.run()?;
    println!("✅ Skills timeline generated successfully!");
    println!("📁 PNG: {}", output.png_path.display());
    if let Some(html_path) = &output.html_path {
        println!("🌐 Interactive: {}", html_path.display());
    }
    Ok(())
}

fn main() {
    let args = CliArgs::parse();

    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting skills-timeline");

    if let Err(e) = run(&args) {
        let exit_code = match e.downcast_ref::<TimelineError>() {
            Some(error) => {
                tracing::error!(
                    "❌ Timeline generation failed: {} (Category: {:?})",
                    error,
                    error.category()
                );
                eprintln!("❌ {}", error.user_friendly_message());
                eprintln!("💡 Suggestion: {}", error.recovery_suggestion());
                error.exit_code()
            }
            None => {
                tracing::error!("❌ Timeline generation failed: {:#}", e);
                eprintln!("❌ {:#}", e);
                1
            }
        };
        std::process::exit(exit_code);
    }
}
