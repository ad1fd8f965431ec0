use serde::{Deserialize, Serialize};

use crate::domain::{BatteryParameters, Horizon};
use crate::error::ScheduleError;
use crate::optimizer::model::{DispatchModel, Relation, VarId};

/// Policy for keeping a period from charging and discharging at once.
///
/// With non-negative prices the efficiency loss already makes co-dispatch
/// strictly suboptimal, so the pure LP relaxation never produces it. A
/// negative price breaks that argument: the LP is then *paid* to burn
/// energy through simultaneous charge and discharge, and only a binary
/// mode indicator per period rules it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutualExclusion {
    /// Add binaries exactly when the horizon contains a negative price.
    #[default]
    Auto,
    /// Always add one binary mode indicator per period.
    Always,
    /// Never add binaries; callers accept LP co-dispatch under negative
    /// prices.
    Never,
}

/// Knobs of the model build that are not battery physics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormulationOptions {
    pub mutual_exclusion: MutualExclusion,
    /// Fraction of reserved regulation capacity that clears as deployed
    /// energy each period.
    pub regulation_deployment: f64,
}

impl Default for FormulationOptions {
    fn default() -> Self {
        Self {
            mutual_exclusion: MutualExclusion::default(),
            regulation_deployment: 0.1,
        }
    }
}

/// Per-period variable handles for the regulation market block.
#[derive(Debug, Clone)]
pub struct RegulationVars {
    pub up_capacity: Vec<VarId>,
    pub down_capacity: Vec<VarId>,
    pub up_deployed: Vec<VarId>,
    pub down_deployed: Vec<VarId>,
}

/// Variable handles of one formulated horizon.
#[derive(Debug, Clone)]
pub struct DispatchVars {
    pub charge: Vec<VarId>,
    pub discharge: Vec<VarId>,
    /// `soc[t]` is the stored energy entering period `t`; the vector has
    /// one extra entry for the terminal level after the last period.
    pub soc: Vec<VarId>,
    /// Mode binaries (1 = charging side), present when mutual exclusion is
    /// active for this horizon.
    pub charging_mode: Option<Vec<VarId>>,
    pub regulation: Option<RegulationVars>,
}

/// A fully built model plus the handles needed to read a solution back.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub model: DispatchModel,
    pub vars: DispatchVars,
}

impl Formulation {
    pub fn uses_binaries(&self) -> bool {
        self.vars.charging_mode.is_some()
    }
}

/// Builds the complete decision model for one horizon.
///
/// Variables, named constraints, and the maximized profit objective, per
/// period: energy arbitrage always; regulation awards when the horizon
/// carries regulation prices; cycle limits when the battery has one.
pub fn build(
    battery: &BatteryParameters,
    horizon: &Horizon,
    options: &FormulationOptions,
) -> Result<Formulation, ScheduleError> {
    // Horizon construction already rejects empty series; guard anyway so a
    // future constructor cannot smuggle one in.
    if horizon.is_empty() {
        return Err(ScheduleError::EmptyHorizon);
    }
    if !options.regulation_deployment.is_finite()
        || !(0.0..=1.0).contains(&options.regulation_deployment)
    {
        return Err(ScheduleError::invalid_parameter(
            "regulation_deployment",
            format!("must lie in [0, 1], got {}", options.regulation_deployment),
        ));
    }

    let n = horizon.len();
    let dt = horizon.duration_hours();
    let eta = battery.one_way_efficiency();
    let mut model = DispatchModel::new();

    // Energy legs. Objective: price[t]·(discharge − charge)·Δ.
    let charge: Vec<VarId> = (0..n)
        .map(|t| {
            model.add_var(
                format!("charge[{t}]"),
                0.0,
                battery.max_charge_mw,
                -horizon.price(t) * dt,
            )
        })
        .collect();
    let discharge: Vec<VarId> = (0..n)
        .map(|t| {
            model.add_var(
                format!("discharge[{t}]"),
                0.0,
                battery.max_discharge_mw,
                horizon.price(t) * dt,
            )
        })
        .collect();

    // soc[0..=n], each bounded by the energy capacity.
    let soc: Vec<VarId> = (0..=n)
        .map(|t| model.add_var(format!("soc[{t}]"), 0.0, battery.capacity_mwh, 0.0))
        .collect();

    let use_binaries = match options.mutual_exclusion {
        MutualExclusion::Always => true,
        MutualExclusion::Never => false,
        MutualExclusion::Auto => horizon.has_negative_prices(),
    };
    let charging_mode = use_binaries.then(|| {
        (0..n)
            .map(|t| model.add_binary(format!("charging_mode[{t}]"), 0.0))
            .collect::<Vec<_>>()
    });

    let regulation = horizon.has_regulation().then(|| {
        let lambda = options.regulation_deployment;
        let mut vars = RegulationVars {
            up_capacity: Vec::with_capacity(n),
            down_capacity: Vec::with_capacity(n),
            up_deployed: Vec::with_capacity(n),
            down_deployed: Vec::with_capacity(n),
        };
        for t in 0..n {
            // A period without a regulation offering must not bid: all four
            // quantities are pinned to zero through their bounds.
            let (up_price, down_price, up_cap, down_cap) = match horizon.regulation_price(t) {
                Some(p) => (p.up, p.down, battery.max_discharge_mw, battery.max_charge_mw),
                None => (0.0, 0.0, 0.0, 0.0),
            };
            // Capacity payments for both directions, energy settlement for
            // deployment: up deployment sells energy, down deployment buys.
            vars.up_capacity
                .push(model.add_var(format!("reg_up_cap[{t}]"), 0.0, up_cap, up_price * dt));
            vars.down_capacity.push(model.add_var(
                format!("reg_down_cap[{t}]"),
                0.0,
                down_cap,
                down_price * dt,
            ));
            vars.up_deployed.push(model.add_var(
                format!("reg_up_dep[{t}]"),
                0.0,
                up_cap,
                up_price * dt,
            ));
            vars.down_deployed.push(model.add_var(
                format!("reg_down_dep[{t}]"),
                0.0,
                down_cap,
                -down_price * dt,
            ));
            model.add_constraint(
                format!("deploy_up[{t}]"),
                vec![(vars.up_deployed[t], 1.0), (vars.up_capacity[t], -lambda)],
                Relation::Eq,
                0.0,
            );
            model.add_constraint(
                format!("deploy_down[{t}]"),
                vec![
                    (vars.down_deployed[t], 1.0),
                    (vars.down_capacity[t], -lambda),
                ],
                Relation::Eq,
                0.0,
            );
            // Market dispatch and regulation deployment share the inverter.
            model.add_constraint(
                format!("charge_power_cap[{t}]"),
                vec![(charge[t], 1.0), (vars.down_deployed[t], 1.0)],
                Relation::Le,
                battery.max_charge_mw,
            );
            model.add_constraint(
                format!("discharge_power_cap[{t}]"),
                vec![(discharge[t], 1.0), (vars.up_deployed[t], 1.0)],
                Relation::Le,
                battery.max_discharge_mw,
            );
        }
        vars
    });

    // Boundary condition: the horizon starts at the configured stored
    // energy. A decision variable pinned by an equality keeps the
    // constraint visible in the model rather than hidden in bounds.
    model.add_constraint(
        "initial_soc",
        vec![(soc[0], 1.0)],
        Relation::Eq,
        battery.initial_soc_mwh,
    );

    // SoC balance: soc[t+1] − soc[t] − √η·Δ·(charge + down_dep)
    //                                + Δ/√η·(discharge + up_dep) = 0.
    for t in 0..n {
        let mut terms = vec![
            (soc[t + 1], 1.0),
            (soc[t], -1.0),
            (charge[t], -eta * dt),
            (discharge[t], dt / eta),
        ];
        if let Some(reg) = &regulation {
            terms.push((reg.down_deployed[t], -eta * dt));
            terms.push((reg.up_deployed[t], dt / eta));
        }
        model.add_constraint(format!("soc_balance[{t}]"), terms, Relation::Eq, 0.0);
    }

    // Mode binaries: y = 1 permits charging, y = 0 permits discharging.
    if let Some(modes) = &charging_mode {
        for t in 0..n {
            model.add_constraint(
                format!("charge_mode[{t}]"),
                vec![(charge[t], 1.0), (modes[t], -battery.max_charge_mw)],
                Relation::Le,
                0.0,
            );
            model.add_constraint(
                format!("discharge_mode[{t}]"),
                vec![(discharge[t], 1.0), (modes[t], battery.max_discharge_mw)],
                Relation::Le,
                battery.max_discharge_mw,
            );
        }
    }

    // Throughput cap in equivalent full cycles, gross energy on each side.
    if let Some(cycles) = battery.max_cycles {
        let budget = cycles * battery.capacity_mwh;
        let mut charge_side: Vec<(VarId, f64)> = charge.iter().map(|&v| (v, dt)).collect();
        let mut discharge_side: Vec<(VarId, f64)> = discharge.iter().map(|&v| (v, dt)).collect();
        if let Some(reg) = &regulation {
            charge_side.extend(reg.down_deployed.iter().map(|&v| (v, dt)));
            discharge_side.extend(reg.up_deployed.iter().map(|&v| (v, dt)));
        }
        model.add_constraint("cycle_limit_charge", charge_side, Relation::Le, budget);
        model.add_constraint("cycle_limit_discharge", discharge_side, Relation::Le, budget);
    }

    Ok(Formulation {
        model,
        vars: DispatchVars {
            charge,
            discharge,
            soc,
            charging_mode,
            regulation,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PricePoint, RegulationPrice};
    use chrono::{Duration, TimeZone, Utc};

    fn battery() -> BatteryParameters {
        BatteryParameters {
            capacity_mwh: 100.0,
            max_charge_mw: 25.0,
            max_discharge_mw: 25.0,
            round_trip_efficiency: 0.81,
            initial_soc_mwh: 50.0,
            max_cycles: None,
        }
    }

    fn horizon(prices: &[f64]) -> Horizon {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        Horizon::hourly(
            prices
                .iter()
                .enumerate()
                .map(|(i, &price)| PricePoint {
                    timestamp: start + Duration::hours(i as i64),
                    price,
                })
                .collect(),
        )
        .unwrap()
    }

    fn constraint_names(f: &Formulation) -> Vec<&str> {
        f.model.constraints().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_arbitrage_model_shape() {
        let h = horizon(&[10.0, 50.0, 30.0]);
        let f = build(&battery(), &h, &FormulationOptions::default()).unwrap();

        // 3 charge + 3 discharge + 4 soc, no binaries for positive prices.
        assert_eq!(f.model.num_vars(), 10);
        assert!(!f.uses_binaries());
        // initial_soc + one balance per period.
        let names = constraint_names(&f);
        assert!(names.contains(&"initial_soc"));
        assert!(names.contains(&"soc_balance[0]"));
        assert!(names.contains(&"soc_balance[2]"));
        assert_eq!(f.model.num_constraints(), 4);
    }

    #[test]
    fn test_objective_coefficients_price_times_duration() {
        let h = horizon(&[10.0, 50.0]);
        let f = build(&battery(), &h, &FormulationOptions::default()).unwrap();
        let vars = f.model.variables();
        assert!((vars[f.vars.charge[0].index()].objective + 10.0).abs() < 1e-12);
        assert!((vars[f.vars.discharge[1].index()].objective - 50.0).abs() < 1e-12);
        // SoC carries no objective weight.
        assert!(vars[f.vars.soc[0].index()].objective.abs() < 1e-12);
    }

    #[test]
    fn test_balance_terms_use_split_efficiency() {
        let h = horizon(&[10.0]);
        let f = build(&battery(), &h, &FormulationOptions::default()).unwrap();
        let balance = f
            .model
            .constraints()
            .iter()
            .find(|c| c.name == "soc_balance[0]")
            .unwrap();
        // √0.81 = 0.9: charge coefficient −0.9, discharge +1/0.9.
        let coeff = |v: VarId| {
            balance
                .terms
                .iter()
                .find(|(id, _)| *id == v)
                .map(|(_, c)| *c)
                .unwrap()
        };
        assert!((coeff(f.vars.charge[0]) + 0.9).abs() < 1e-12);
        assert!((coeff(f.vars.discharge[0]) - 1.0 / 0.9).abs() < 1e-12);
        assert!((coeff(f.vars.soc[1]) - 1.0).abs() < 1e-12);
        assert!((coeff(f.vars.soc[0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_auto_policy_keys_on_negative_prices() {
        let opts = FormulationOptions::default();
        let without = build(&battery(), &horizon(&[10.0, 50.0]), &opts).unwrap();
        assert!(!without.uses_binaries());
        assert!(!without.model.has_binaries());

        let with = build(&battery(), &horizon(&[10.0, -5.0]), &opts).unwrap();
        assert!(with.uses_binaries());
        assert!(with.model.has_binaries());
        let names = constraint_names(&with);
        assert!(names.contains(&"charge_mode[0]"));
        assert!(names.contains(&"discharge_mode[1]"));
    }

    #[test]
    fn test_always_and_never_override_auto() {
        let positive = horizon(&[10.0, 50.0]);
        let always = FormulationOptions {
            mutual_exclusion: MutualExclusion::Always,
            ..FormulationOptions::default()
        };
        assert!(build(&battery(), &positive, &always).unwrap().uses_binaries());

        let negative = horizon(&[-10.0, 50.0]);
        let never = FormulationOptions {
            mutual_exclusion: MutualExclusion::Never,
            ..FormulationOptions::default()
        };
        assert!(!build(&battery(), &negative, &never).unwrap().uses_binaries());
    }

    #[test]
    fn test_cycle_limit_constraints() {
        let b = BatteryParameters {
            max_cycles: Some(1.5),
            ..battery()
        };
        let f = build(&b, &horizon(&[10.0, 50.0]), &FormulationOptions::default()).unwrap();
        let limit = f
            .model
            .constraints()
            .iter()
            .find(|c| c.name == "cycle_limit_charge")
            .unwrap();
        assert_eq!(limit.relation, Relation::Le);
        assert!((limit.rhs - 150.0).abs() < 1e-12);
        assert_eq!(limit.terms.len(), 2);
        assert!(constraint_names(&f).contains(&"cycle_limit_discharge"));
    }

    #[test]
    fn test_regulation_block() {
        let h = horizon(&[10.0, 50.0])
            .with_regulation(vec![
                Some(RegulationPrice { up: 8.0, down: 4.0 }),
                None,
            ])
            .unwrap();
        let f = build(&battery(), &h, &FormulationOptions::default()).unwrap();
        let reg = f.vars.regulation.as_ref().unwrap();

        // Offered period: capacities bounded by the power ratings.
        assert_eq!(f.model.bounds(reg.up_capacity[0]), (0.0, 25.0));
        // Non-offered period must not bid in either direction.
        assert_eq!(f.model.bounds(reg.up_capacity[1]), (0.0, 0.0));
        assert_eq!(f.model.bounds(reg.down_deployed[1]), (0.0, 0.0));

        // Capacity and deployment both earn the up price; down deployment
        // pays for the energy it absorbs.
        let vars = f.model.variables();
        assert!((vars[reg.up_capacity[0].index()].objective - 8.0).abs() < 1e-12);
        assert!((vars[reg.up_deployed[0].index()].objective - 8.0).abs() < 1e-12);
        assert!((vars[reg.down_capacity[0].index()].objective - 4.0).abs() < 1e-12);
        assert!((vars[reg.down_deployed[0].index()].objective + 4.0).abs() < 1e-12);

        let names = constraint_names(&f);
        for name in [
            "deploy_up[0]",
            "deploy_down[0]",
            "charge_power_cap[0]",
            "discharge_power_cap[0]",
        ] {
            assert!(names.contains(&name), "missing {name}");
        }

        // Balance rows pick up the deployment legs.
        let balance = f
            .model
            .constraints()
            .iter()
            .find(|c| c.name == "soc_balance[0]")
            .unwrap();
        assert_eq!(balance.terms.len(), 6);
    }

    #[test]
    fn test_deployment_ratio_outside_unit_interval_is_rejected() {
        let opts = FormulationOptions {
            regulation_deployment: 1.5,
            ..FormulationOptions::default()
        };
        let err = build(&battery(), &horizon(&[10.0]), &opts).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidParameter {
                name: "regulation_deployment",
                ..
            }
        ));
    }
}
