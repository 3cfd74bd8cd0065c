use anyhow::Context;
use arxiv_monitor::utils::error::ErrorSeverity;
use arxiv_monitor::utils::{logger, validation::Validate};
use arxiv_monitor::{ArxivPipeline, CliConfig, LocalStorage, MonitorConfig, MonitorEngine, RunMode};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let mut config = MonitorConfig::load(cli.config.as_deref()).with_context(|| {
        format!(
            "failed to load configuration{}",
            cli.config
                .as_ref()
                .map(|p| format!(" from {}", p.display()))
                .unwrap_or_default()
        )
    })?;
    cli.apply_overrides(&mut config);

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose, &cli.base_dir.join(&config.output.logs_dir))
            .context("failed to initialise logging")?;
    }

    tracing::info!("Starting arxiv-monitor");
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    let mode = if cli.seed { RunMode::Seed } else { RunMode::Daily };
    let today = chrono::Local::now().date_naive();
    let storage = LocalStorage::new(cli.base_dir.clone());
    let pipeline = ArxivPipeline::new(storage, config.clone(), mode, today)?;

    if cli.dry_run {
        return dry_run(&pipeline, &config, mode).await;
    }

    let engine = MonitorEngine::new(pipeline);
    match engine.run().await {
        Ok(summary) => println!("{}", summary),
        Err(e) => {
            tracing::error!(
                "Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("{}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn dry_run(
    pipeline: &ArxivPipeline<LocalStorage>,
    config: &MonitorConfig,
    mode: RunMode,
) -> anyhow::Result<()> {
    let start_date = pipeline.start_date().await?;
    let request = pipeline.search_request(start_date);

    println!("Dry run, nothing will be fetched or written");
    println!("  Topic:        {}", config.topic.name);
    println!("  Mode:         {:?}", mode);
    println!("  Since:        {}", start_date);
    match request.max_results {
        Some(max) => println!("  Max results:  {}", max),
        None => println!("  Max results:  unlimited"),
    }
    println!("  Query:        {}", request.query);
    println!("  Code links:   {}", enabled(config.code_links.enabled));
    println!("  PDFs:         {}", enabled(config.pdf.enabled));
    println!("  Index:        {}", config.output.index);
    println!("  README:       {}", config.output.readme);
    println!("  Last run:     {}", config.output.last_run);
    Ok(())
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}
