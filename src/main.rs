use std::{env, fs, process::ExitCode, str::FromStr};

use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omsetku::{
    domain::{compute_unit_cost, AppState, CostCalculationInput, PricingRequest},
    infra::{AdvisorConfig, PricingAdvisor, SuggestionCacheStore},
    util::{
        money::{format_percent, format_rupiah},
        persistence::load_persisted_state,
        version::{version_label, APP_NAME},
    },
};

const USAGE: &str = "usage:
  omsetku hpp <input.json>          compute HPP and recommended price
  omsetku suggest <name> <hpp> [category]
                                    advisory selling price
  omsetku summary                   ledger summary of the saved data";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "omsetku=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("hpp") => run_hpp(&args[1..]),
        Some("suggest") => run_suggest(&args[1..]).await,
        Some("summary") => run_summary(),
        Some("--version") => {
            println!("{APP_NAME} {}", version_label());
            Ok(())
        }
        _ => Err(USAGE.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run_hpp(args: &[String]) -> Result<(), String> {
    let path = args.first().ok_or_else(|| USAGE.to_string())?;
    let raw = fs::read_to_string(path).map_err(|err| format!("cannot read {path}: {err}"))?;
    let input: CostCalculationInput =
        serde_json::from_str(&raw).map_err(|err| format!("invalid input file: {err}"))?;
    let result = compute_unit_cost(&input).map_err(|err| err.to_string())?;

    println!("Bahan baku       : {}", format_rupiah(result.raw_material_total));
    println!("Biaya operasional: {}", format_rupiah(result.operating_cost_total));
    println!("Total produksi   : {}", format_rupiah(result.batch_cost));
    println!("HPP per unit     : {}", format_rupiah(result.unit_cost));
    println!(
        "Harga jual ({})  : {}",
        format_percent(input.margin_percent),
        format_rupiah(result.recommended_price)
    );
    Ok(())
}

async fn run_suggest(args: &[String]) -> Result<(), String> {
    let (Some(name), Some(hpp)) = (args.first(), args.get(1)) else {
        return Err(USAGE.to_string());
    };
    let hpp = Decimal::from_str(hpp).map_err(|err| format!("invalid hpp {hpp}: {err}"))?;

    let advisor = PricingAdvisor::new(AdvisorConfig::from_env())
        .map_err(|err| err.to_string())?
        .with_disk_cache(SuggestionCacheStore::default_location());
    let suggestion = advisor
        .suggest(&PricingRequest {
            product_name: name.clone(),
            category: args.get(2).cloned(),
            hpp,
            current_price: None,
        })
        .await;

    println!("Harga disarankan : {}", format_rupiah(suggestion.recommended_price));
    println!(
        "Kisaran          : {} - {}",
        format_rupiah(suggestion.min_price),
        format_rupiah(suggestion.max_price)
    );
    println!("Margin           : {}", format_percent(suggestion.margin_percent));
    if !suggestion.rationale.is_empty() {
        println!("Alasan           : {}", suggestion.rationale);
    }
    println!("Sumber           : {:?}", suggestion.source);
    Ok(())
}

fn run_summary() -> Result<(), String> {
    let state = load_persisted_state()
        .map(AppState::from_persisted)
        .unwrap_or_default();
    let summary = state.ledger.summary(None, None);

    println!("Produk           : {}", state.catalog.len());
    println!("Transaksi        : {}", summary.transaction_count);
    println!("Pemasukan        : {}", format_rupiah(summary.income));
    println!("Pengeluaran      : {}", format_rupiah(summary.expense));
    println!("Pajak terkumpul  : {}", format_rupiah(summary.tax_collected));
    println!("HPP terjual      : {}", format_rupiah(summary.cost_of_goods));
    println!("Laba kotor       : {}", format_rupiah(summary.gross_profit));
    println!("Laba bersih      : {}", format_rupiah(summary.net_profit));
    if let Some(at) = state
        .ledger
        .transactions()
        .last()
        .and_then(|tx| tx.recorded_at_rfc3339())
    {
        println!("Transaksi terakhir: {at}");
    }
    Ok(())
}
