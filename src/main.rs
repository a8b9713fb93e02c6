use aws_pricing::catalog::{Catalog, Region};
use aws_pricing::config::IngestConfig;
use aws_pricing::logging;
use aws_pricing::pipeline::{IngestReport, IngestionPipeline};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "aws_pricing")]
#[command(about = "AWS price list scraper and in-memory pricing catalog")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML file overriding endpoints, retry policy and source tables
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every pricing document and print an ingestion summary
    Ingest,
    /// Ingest, then list regions with product and storage class counts
    Regions,
    /// Ingest, then print one region's products and storage prices
    Products {
        /// Region identifier (canonical or any historical spelling)
        #[arg(long)]
        region: String,
    },
}

fn print_summary(report: &IngestReport) {
    println!("\n📊 Ingestion results:");
    println!(
        "   Sources fetched: {}/{}",
        report.sources_ok, report.sources_total
    );
    println!("   Sources failed: {}", report.sources_failed);

    if !report.diagnostics.is_empty() {
        println!("\n⚠️  Skipped sources/regions:");
        for diagnostic in &report.diagnostics {
            println!("   - [{}] {}", diagnostic.source, diagnostic.message);
        }
    }
}

fn price(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${}", v),
        None => "-".to_string(),
    }
}

fn print_region(region: &Region) {
    println!("\n🌍 {}", region.name);
    for product in region.product_types() {
        println!("   {} ({})", product.api_name, product.platform);
        for record in product.records() {
            println!(
                "      {:<24} upfront {:<10} rate {} {}",
                record.term.to_string(),
                price(record.upfront),
                price(record.rate),
                record.unit
            );
        }
    }
    if !region.storage_prices().is_empty() {
        println!("   storage:");
        for (class, storage) in region.storage_prices() {
            println!(
                "      {:<32} ${} {}",
                class, storage.rate, storage.unit
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => IngestConfig::load(path)?,
        None => IngestConfig::default(),
    };

    let pipeline = IngestionPipeline::with_default_http(config)?;
    println!("🔄 Fetching pricing documents...");
    let (catalog, report): (Catalog, IngestReport) = pipeline.run().await?;
    info!("catalog built");

    match cli.command {
        Commands::Ingest => {
            print_summary(&report);
            println!(
                "\n   Regions: {}   Product types: {}",
                catalog.list_regions().count(),
                catalog.list_all_product_types().count()
            );
        }
        Commands::Regions => {
            print_summary(&report);
            println!();
            for region in catalog.list_regions() {
                println!(
                    "   {:<16} {:>5} products, {:>2} storage classes",
                    region.name,
                    region.product_count(),
                    region.storage_prices().len()
                );
            }
        }
        Commands::Products { region } => {
            print_summary(&report);
            let region = catalog.get_region(&region)?;
            print_region(region);
        }
    }

    Ok(())
}
