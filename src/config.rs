use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::BatteryParameters;
use crate::optimizer::{FormulationOptions, MutualExclusion};
use crate::solver::SolveOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub battery: BatteryConfig,
    pub solver: SolverConfig,
    pub prices: PricesConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub db: DbConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    /// Origin allowed when `enable_cors` is set.
    pub cors_origin: String,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatteryConfig {
    pub capacity_mwh: f64,
    pub max_charge_mw: f64,
    pub max_discharge_mw: f64,
    pub round_trip_efficiency: f64,
    pub initial_soc_mwh: f64,
    pub max_cycles: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolverConfig {
    pub time_limit_secs: Option<u64>,
    pub mip_gap: f64,
    pub mutual_exclusion: MutualExclusion,
    pub regulation_deployment: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricesConfig {
    pub energy_file: PathBuf,
    pub regulation_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DbConfig {
    pub url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("BESS__").split("__"));
        Ok(figment.extract()?)
    }

    pub fn battery_parameters(&self) -> BatteryParameters {
        BatteryParameters {
            capacity_mwh: self.battery.capacity_mwh,
            max_charge_mw: self.battery.max_charge_mw,
            max_discharge_mw: self.battery.max_discharge_mw,
            round_trip_efficiency: self.battery.round_trip_efficiency,
            initial_soc_mwh: self.battery.initial_soc_mwh,
            max_cycles: self.battery.max_cycles,
        }
    }

    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            time_limit: self.solver.time_limit_secs.map(Duration::from_secs),
            mip_gap: self.solver.mip_gap,
        }
    }

    pub fn formulation_options(&self) -> FormulationOptions {
        FormulationOptions {
            mutual_exclusion: self.solver.mutual_exclusion,
            regulation_deployment: self.solver.regulation_deployment,
        }
    }
}
