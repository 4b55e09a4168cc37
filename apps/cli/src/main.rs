#![deny(warnings)]

//! Headless CLI: estimate landed cost for a project file, in one market or
//! compared across several.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use cost_core::{CountryCode, FreightMode, Project};
use cost_engine::{view, CostResult, EngineConfig, FactorTable};
use cost_scenario::{rank, run_multi_country, run_scenario, LogisticsMode, ModeTables, RankBy, ScenarioEnv, ScenarioParams};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    project: Option<String>,
    factors: Option<String>,
    config: Option<String>,
    modes: Option<String>,
    countries: Vec<CountryCode>,
    price: Option<Decimal>,
    volume: Option<u64>,
    freight: Option<FreightMode>,
    legacy: bool,
    module: Option<String>,
    version: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--project" => args.project = it.next(),
            "--factors" => args.factors = it.next(),
            "--config" => args.config = it.next(),
            "--modes" => args.modes = it.next(),
            "--countries" => {
                args.countries = it
                    .next()
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(CountryCode::new)
                    .collect()
            }
            "--price" => {
                let raw = it.next().unwrap_or_default();
                args.price = Some(Decimal::from_str(&raw).with_context(|| format!("invalid --price {raw:?}"))?);
            }
            "--volume" => {
                let raw = it.next().unwrap_or_default();
                args.volume = Some(raw.parse().with_context(|| format!("invalid --volume {raw:?}"))?);
            }
            "--freight" => {
                args.freight = match it.next().as_deref() {
                    Some("sea") => Some(FreightMode::Sea),
                    Some("air") => Some(FreightMode::Air),
                    other => bail!("--freight expects sea or air, got {other:?}"),
                }
            }
            "--view" => {
                args.legacy = match it.next().as_deref() {
                    Some("legacy") => true,
                    Some("current") => false,
                    other => bail!("--view expects current or legacy, got {other:?}"),
                }
            }
            "--module" => args.module = it.next(),
            "--version" | "-V" => args.version = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    Ok(args)
}

fn load_table(path: Option<&str>) -> Result<FactorTable> {
    match path {
        Some(p) => factor_data::load_table_from_path(p).with_context(|| format!("loading factors from {p}")),
        None => factor_data::embedded_table().context("loading embedded factors"),
    }
}

fn read_optional(path: Option<&str>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {p}")),
        None => Ok(String::new()),
    }
}

fn render(result: &CostResult, args: &Args) -> Result<serde_json::Value> {
    if let Some(code) = &args.module {
        let Some(slice) = view::module_slice(result, code) else {
            bail!("unknown module {code:?}, expected M1..M8");
        };
        return Ok(serde_json::to_value(slice)?);
    }
    Ok(if args.legacy {
        view::legacy(result)
    } else {
        view::current(result)
    })
}

#[derive(Serialize)]
struct Report {
    generated_at: DateTime<Utc>,
    project: String,
    results: Vec<Entry>,
}

#[derive(Serialize)]
struct Entry {
    id: String,
    result: serde_json::Value,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    if args.version {
        println!(
            "{} {} ({} {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    let Some(project_path) = args.project.as_deref() else {
        bail!("--project <file.json> is required");
    };
    let project: Project = serde_json::from_str(
        &std::fs::read_to_string(project_path).with_context(|| format!("reading {project_path}"))?,
    )
    .with_context(|| format!("parsing project {project_path}"))?;

    let table = load_table(args.factors.as_deref())?;
    let env = ScenarioEnv {
        tables: ModeTables::from_yaml_str(&read_optional(args.modes.as_deref())?)?,
        config: EngineConfig::from_yaml_str(&read_optional(args.config.as_deref())?)?,
    };
    let params = ScenarioParams {
        price: args.price,
        monthly_sales: args.volume,
        logistics: args.freight.map(|m| match m {
            FreightMode::Sea => LogisticsMode::Sea,
            FreightMode::Air => LogisticsMode::Air,
        }),
        ..ScenarioParams::default()
    };
    info!(project = %project.id.0, records = table.len(), countries = args.countries.len(), "starting estimate");

    let results = if args.countries.is_empty() {
        let resolved = table.resolve(&project.industry, &project.target_country, project.sales_channel);
        info!(resolution = ?resolved.resolution, tier = ?resolved.factor.tier, "factor resolved");
        let result = run_scenario(&project, &resolved.factor, &params, &env)?;
        vec![Entry {
            id: project.target_country.to_string(),
            result: render(&result, &args)?,
        }]
    } else {
        let ranked = rank(
            run_multi_country(&project, &args.countries, &table, &params, &env),
            RankBy::Roi,
        );
        if ranked.is_empty() {
            bail!("no requested country could be evaluated");
        }
        ranked
            .iter()
            .map(|r| {
                Ok(Entry {
                    id: r.id.clone(),
                    result: render(&r.result, &args)?,
                })
            })
            .collect::<Result<Vec<_>>>()?
    };

    let report = Report {
        generated_at: Utc::now(),
        project: project.id.0.clone(),
        results,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
