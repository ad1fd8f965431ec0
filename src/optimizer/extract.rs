use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    BatteryParameters, Horizon, RegulationAward, Schedule, SchedulePeriod, ScheduleQuality,
};
use crate::optimizer::formulation::Formulation;
use crate::solver::SolverSolution;

/// Solver output this close to zero or a bound is numerical noise, not a
/// dispatch decision.
const CLEANUP_TOLERANCE: f64 = 1e-6;

fn clean(value: f64, upper: f64) -> f64 {
    if value.abs() < CLEANUP_TOLERANCE {
        0.0
    } else if (upper - value).abs() < CLEANUP_TOLERANCE {
        upper
    } else {
        value.clamp(0.0, upper)
    }
}

/// Turns a raw solver solution back into a dispatch schedule.
///
/// Power and stored-energy values are snapped into their physical ranges,
/// per-period revenue is settled from the cleaned values, and the reported
/// total is the sum of those settlements so the schedule is arithmetically
/// self-consistent.
pub(crate) fn extract_schedule(
    battery: &BatteryParameters,
    horizon: &Horizon,
    formulation: &Formulation,
    solution: &SolverSolution,
    solver_name: &str,
) -> Schedule {
    let dt = horizon.duration_hours();
    let vars = &formulation.vars;
    let mut periods = Vec::with_capacity(horizon.len());
    let mut total_profit = 0.0;

    for t in 0..horizon.len() {
        let price = horizon.price(t);
        let charge_mw = clean(solution.value(vars.charge[t]), battery.max_charge_mw);
        let discharge_mw = clean(solution.value(vars.discharge[t]), battery.max_discharge_mw);
        let state_of_charge_mwh = clean(solution.value(vars.soc[t + 1]), battery.capacity_mwh);
        let mut revenue = price * (discharge_mw - charge_mw) * dt;

        let regulation = vars.regulation.as_ref().map(|reg| {
            let award = RegulationAward {
                up_capacity_mw: clean(solution.value(reg.up_capacity[t]), battery.max_discharge_mw),
                down_capacity_mw: clean(solution.value(reg.down_capacity[t]), battery.max_charge_mw),
                up_deployed_mw: clean(solution.value(reg.up_deployed[t]), battery.max_discharge_mw),
                down_deployed_mw: clean(solution.value(reg.down_deployed[t]), battery.max_charge_mw),
            };
            if let Some(prices) = horizon.regulation_price(t) {
                revenue += prices.up * (award.up_capacity_mw + award.up_deployed_mw) * dt;
                revenue += prices.down * (award.down_capacity_mw - award.down_deployed_mw) * dt;
            }
            award
        });

        total_profit += revenue;
        periods.push(SchedulePeriod {
            timestamp: horizon.timestamp(t),
            price,
            charge_mw,
            discharge_mw,
            state_of_charge_mwh,
            revenue,
            regulation,
        });
    }

    let quality = if solution.status.is_proven_optimal() {
        ScheduleQuality::Optimal
    } else {
        ScheduleQuality::TimeLimited
    };

    Schedule {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        quality,
        period_hours: dt,
        initial_soc_mwh: battery.initial_soc_mwh,
        periods,
        total_profit,
        optimizer_version: format!("{}+{}", env!("CARGO_PKG_VERSION"), solver_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PricePoint, RegulationPrice};
    use crate::optimizer::formulation::{self, FormulationOptions};
    use crate::solver::SolverStatus;
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

    fn solution_for(f: &Formulation, fill: impl Fn(usize) -> f64) -> SolverSolution {
        SolverSolution {
            status: SolverStatus::Optimal,
            objective: 0.0,
            values: (0..f.model.num_vars()).map(fill).collect(),
        }
    }

    #[test]
    fn test_noise_is_snapped_into_range() {
        let b = battery();
        let h = horizon(&[10.0, 50.0]);
        let f = formulation::build(&b, &h, &FormulationOptions::default()).unwrap();

        let mut values = vec![0.0; f.model.num_vars()];
        values[f.vars.charge[0].index()] = -3.0e-9;
        values[f.vars.discharge[1].index()] = 25.0 + 4.0e-8;
        values[f.vars.soc[1].index()] = 100.0 + 1.0e-9;
        let solution = SolverSolution {
            status: SolverStatus::Optimal,
            objective: 0.0,
            values,
        };

        let schedule = extract_schedule(&b, &h, &f, &solution, "microlp");
        assert_eq!(schedule.periods[0].charge_mw, 0.0);
        assert_eq!(schedule.periods[1].discharge_mw, 25.0);
        assert_eq!(schedule.periods[0].state_of_charge_mwh, 100.0);
    }

    #[test]
    fn test_values_just_under_a_bound_read_as_the_bound() {
        let b = battery();
        let h = horizon(&[10.0, 50.0]);
        let f = formulation::build(&b, &h, &FormulationOptions::default()).unwrap();

        // Simplex output like 24.9999995 is full-power dispatch, not a
        // deliberate fraction of a watt held back.
        let mut values = vec![0.0; f.model.num_vars()];
        values[f.vars.charge[0].index()] = 25.0 - 5.0e-7;
        values[f.vars.discharge[1].index()] = 25.0 - 5.0e-7;
        values[f.vars.soc[1].index()] = 100.0 - 2.0e-7;
        let solution = SolverSolution {
            status: SolverStatus::Optimal,
            objective: 0.0,
            values,
        };

        let schedule = extract_schedule(&b, &h, &f, &solution, "microlp");
        assert_eq!(schedule.periods[0].charge_mw, 25.0);
        assert_eq!(schedule.periods[1].discharge_mw, 25.0);
        assert_eq!(schedule.periods[0].state_of_charge_mwh, 100.0);
        // Revenue settles from the snapped powers.
        assert!((schedule.periods[0].revenue + 250.0).abs() < 1e-9);
        assert!((schedule.periods[1].revenue - 1250.0).abs() < 1e-9);
    }

    #[test]
    fn test_revenue_settlement_and_total() {
        let b = battery();
        let h = horizon(&[10.0, 50.0]);
        let f = formulation::build(&b, &h, &FormulationOptions::default()).unwrap();

        // Charge 20 MW at 10, discharge 15 MW at 50.
        let mut values = vec![0.0; f.model.num_vars()];
        values[f.vars.charge[0].index()] = 20.0;
        values[f.vars.discharge[1].index()] = 15.0;
        let solution = SolverSolution {
            status: SolverStatus::Optimal,
            objective: 0.0,
            values,
        };

        let schedule = extract_schedule(&b, &h, &f, &solution, "microlp");
        assert!((schedule.periods[0].revenue + 200.0).abs() < 1e-9);
        assert!((schedule.periods[1].revenue - 750.0).abs() < 1e-9);
        assert!((schedule.total_profit - 550.0).abs() < 1e-9);
    }

    #[test]
    fn test_end_of_period_state_reads_the_next_node() {
        let b = battery();
        let h = horizon(&[10.0]);
        let f = formulation::build(&b, &h, &FormulationOptions::default()).unwrap();

        let mut values = vec![0.0; f.model.num_vars()];
        values[f.vars.soc[0].index()] = 50.0;
        values[f.vars.soc[1].index()] = 68.0;
        let solution = SolverSolution {
            status: SolverStatus::Optimal,
            objective: 0.0,
            values,
        };

        let schedule = extract_schedule(&b, &h, &f, &solution, "microlp");
        assert_eq!(schedule.periods[0].state_of_charge_mwh, 68.0);
        assert_eq!(schedule.initial_soc_mwh, 50.0);
    }

    #[test]
    fn test_regulation_awards_and_settlement() {
        let b = battery();
        let h = horizon(&[10.0, 50.0])
            .with_regulation(vec![
                Some(RegulationPrice { up: 8.0, down: 4.0 }),
                None,
            ])
            .unwrap();
        let f = formulation::build(&b, &h, &FormulationOptions::default()).unwrap();
        let reg = f.vars.regulation.clone().unwrap();

        let mut values = vec![0.0; f.model.num_vars()];
        values[reg.up_capacity[0].index()] = 10.0;
        values[reg.up_deployed[0].index()] = 1.0;
        values[reg.down_capacity[0].index()] = 5.0;
        values[reg.down_deployed[0].index()] = 0.5;
        let solution = SolverSolution {
            status: SolverStatus::Optimal,
            objective: 0.0,
            values,
        };

        let schedule = extract_schedule(&b, &h, &f, &solution, "microlp");
        let award = schedule.periods[0].regulation.as_ref().unwrap();
        assert_eq!(award.up_capacity_mw, 10.0);
        assert_eq!(award.down_deployed_mw, 0.5);
        // 8·(10 + 1) + 4·(5 − 0.5) = 88 + 18 = 106.
        assert!((schedule.periods[0].revenue - 106.0).abs() < 1e-9);
        // The unoffered period reports a zero award, never a phantom one.
        let idle = schedule.periods[1].regulation.as_ref().unwrap();
        assert_eq!(idle.up_capacity_mw, 0.0);
        assert_eq!(idle.down_capacity_mw, 0.0);
    }

    #[test]
    fn test_quality_follows_solver_status() {
        let b = battery();
        let h = horizon(&[10.0]);
        let f = formulation::build(&b, &h, &FormulationOptions::default()).unwrap();

        let optimal = solution_for(&f, |_| 0.0);
        let schedule = extract_schedule(&b, &h, &f, &optimal, "microlp");
        assert_eq!(schedule.quality, ScheduleQuality::Optimal);

        let mut cut_short = solution_for(&f, |_| 0.0);
        cut_short.status = SolverStatus::TimeLimitReached;
        let schedule = extract_schedule(&b, &h, &f, &cut_short, "microlp");
        assert_eq!(schedule.quality, ScheduleQuality::TimeLimited);
    }
}
