//! Command line mission planner.
//!
//! Reads a mission JSON file, plans routes for the whole fleet and writes
//! route JSON (and optionally QGC waypoint files) to an output directory.
//!
//! Exit codes: 0 = routes for every aircraft, 1 = one or more aircraft
//! without a route, 2 = rejected by the no-fly pre-check, 3 = invalid input.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use skyplan_core::export::{export_mission_json, export_route_json, export_route_qgc};
use skyplan_core::models::LandingMode;
use skyplan_core::optimize::OptimizationAlgorithm;
use skyplan_core::orchestrator::{MissionOrchestrator, PlanOptions};
use skyplan_core::ordering::OptimizationMetric;
use skyplan_core::planners::Algorithm;
use skyplan_core::weather::WeatherManager;
use skyplan_weather::OpenMeteoClient;

#[derive(Parser, Debug)]
#[command(
    name = "skyplan",
    version,
    about = "Plan UAV mission routes from a mission JSON file"
)]
struct Args {
    /// Mission description (JSON)
    #[arg(long)]
    mission: PathBuf,

    /// Pathfinding algorithm: astar, thetastar or dstar
    #[arg(long, default_value = "astar")]
    algorithm: Algorithm,

    /// Route refinement: none, genetic, aco or pso
    #[arg(long, default_value = "none")]
    optimize: OptimizationAlgorithm,

    /// Target ordering metric: distance, energy or time
    #[arg(long, default_value = "distance")]
    metric: OptimizationMetric,

    /// Override the mission's landing mode: vertical or gradual
    #[arg(long)]
    landing: Option<LandingMode>,

    /// Seed for the refinement stage
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Skip weather fetching entirely
    #[arg(long)]
    no_weather: bool,

    /// Directory for planned route files
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also write QGC waypoint files next to the route JSON
    #[arg(long)]
    qgc: bool,
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(3)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let mission = skyplan_core::export::import_mission_json(&args.mission)
        .with_context(|| format!("failed to read mission file {}", args.mission.display()))?;
    mission.validate().context("invalid mission")?;

    let weather = if args.no_weather {
        WeatherManager::disabled()
    } else {
        WeatherManager::new(Box::new(OpenMeteoClient::new()), None)
    };

    let mut orchestrator = MissionOrchestrator::new(mission, weather);
    let options = PlanOptions {
        algorithm: args.algorithm,
        optimization_algorithm: args.optimize,
        optimization_metric: args.metric,
        landing_mode: args.landing,
        finish_point_type: None,
        finish_point: None,
        seed: args.seed,
    };

    let (routes, error) = orchestrator.plan_mission(&options);

    if let Some(message) = &error {
        eprintln!("{message}");
        if routes.is_empty() && message.starts_with("Cannot plan route") {
            return Ok(ExitCode::from(2));
        }
    }

    for (name, route) in &routes {
        let metrics = route.metrics.as_ref();
        let valid = route
            .validation
            .as_ref()
            .map(|v| if v.is_valid { "valid" } else { "INVALID" })
            .unwrap_or("unchecked");
        println!(
            "{name}: {} waypoints, {:.0} m, {:.0} s, {:.1} Wh [{valid}]",
            route.waypoints.len(),
            metrics.map(|m| m.total_distance_m).unwrap_or(0.0),
            metrics.map(|m| m.total_time_s).unwrap_or(0.0),
            metrics.map(|m| m.total_energy_wh).unwrap_or(0.0),
        );
        if let Some(verdict) = &route.validation {
            for violation in &verdict.violations {
                println!("  violation: {}", violation.message());
            }
            for warning in &verdict.warnings {
                println!("  warning: {}", warning.message());
            }
        }
    }

    if let Some(output) = &args.output {
        std::fs::create_dir_all(output)
            .with_context(|| format!("failed to create {}", output.display()))?;

        export_mission_json(orchestrator.mission(), output.join("mission.json"))
            .context("failed to write mission.json")?;

        for (name, route) in &routes {
            export_route_json(route, output.join(format!("route_{name}.json")))
                .with_context(|| format!("failed to write route for {name}"))?;
            if args.qgc {
                let aircraft = orchestrator.mission().aircraft(name);
                export_route_qgc(
                    route,
                    output.join(format!("{name}.waypoints")),
                    aircraft,
                )
                .with_context(|| format!("failed to write QGC file for {name}"))?;
            }
        }
    }

    let fleet_covered = orchestrator
        .mission()
        .fleet
        .iter()
        .all(|aircraft| routes.contains_key(&aircraft.name));

    if routes.is_empty() || !fleet_covered {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
