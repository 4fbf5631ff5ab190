mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Commands};
use searchlayer_core::OverlayConfig;
use searchlayer_rs::runner::{run_compose, run_inspect, ComposeOptions};
use tracing_subscriber::EnvFilter;

fn init_logging(args: &Args) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

async fn run(args: Args) -> Result<()> {
  match args.command {
    Commands::Version => {
      println!("searchlayer {}", env!("CARGO_PKG_VERSION"));
    }
    Commands::Inspect {
      markup,
      transcript,
      no_repair,
      text,
    } => {
      let mut config = OverlayConfig {
        use_transcript: transcript.is_some(),
        repair_broken_boxes: !no_repair,
        ..Default::default()
      };
      text.apply(&mut config);
      let (index, report) = run_inspect(&markup, transcript.as_deref(), config).await?;
      println!("{}", serde_json::to_string_pretty(&index)?);
      tracing::info!(
        pages = index.len(),
        regions = index.total_regions(),
        unparsable = report.unparsable_elements.len(),
        "inspected markup"
      );
    }
    Commands::Compose {
      inputs,
      output,
      scale,
      target,
      page_size,
      text_color,
      use_transcript,
      dpi,
      font,
      text,
    } => {
      let mut config = OverlayConfig {
        scale_policy: scale.into(),
        target,
        page_size,
        text_color,
        use_transcript,
        ..Default::default()
      };
      text.apply(&mut config);
      let options = ComposeOptions {
        inputs,
        config,
        dpi,
        font,
      };
      let plan = run_compose(&options).await?;
      plan.write(&output).await?;
      tracing::info!(
        pages = plan.pages.len(),
        output = %output.display(),
        "wrote placement plan"
      );
    }
  }
  Ok(())
}

#[tokio::main]
async fn main() {
  let args = Args::parse();
  init_logging(&args);

  if let Err(e) = run(args).await {
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
  }
}
