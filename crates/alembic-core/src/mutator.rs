//! The solution mutator: applies one reaction step to a solution.
//!
//! [`apply`] performs the mass and heat bookkeeping for a single reaction
//! step in a fixed order:
//!
//! 1. Consumed reactants are removed. Their heat capacity leaves at the
//!    current temperature, so the temperature is unchanged.
//! 2. Products are inserted, either at an explicit product temperature
//!    (thermal mixing) or at the solution's current temperature.
//! 3. `thermal_energy_delta` joules are added.
//! 4. Anything above `max_volume` is discarded proportionally.
//!
//! Removing more of a reagent than is present is a logic error in the
//! caller's gating; it is clamped to zero, logged, and reported.

use smallvec::SmallVec;
use tracing::{debug, error};

use crate::id::ReagentId;
use crate::quantity::Quantity;
use crate::solution::Solution;

/// A product to be added by [`apply`].
#[derive(Clone, Debug, PartialEq)]
pub struct ProducedReagent {
    /// The produced reagent.
    pub reagent: ReagentId,
    /// Quantity produced.
    pub quantity: Quantity,
    /// Heat capacity per unit of the product.
    pub specific_heat: f32,
}

/// What [`apply`] had to correct while mutating a solution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutationReport {
    /// Reagents whose removal would have gone negative.
    pub underflows: SmallVec<[ReagentId; 2]>,
    /// Volume discarded because the result exceeded `max_volume`.
    pub overflow_discarded: Quantity,
}

impl MutationReport {
    /// Whether the step ran without any correction.
    pub fn is_clean(&self) -> bool {
        self.underflows.is_empty() && self.overflow_discarded.is_zero()
    }
}

/// Apply one reaction step to `solution`. See the module docs for ordering.
pub fn apply(
    solution: &mut Solution,
    consumed: &[(ReagentId, Quantity)],
    produced: &[ProducedReagent],
    product_temperature: Option<f32>,
    thermal_energy_delta: f32,
) -> MutationReport {
    let mut report = MutationReport::default();

    for (reagent, quantity) in consumed {
        let present = solution.quantity(reagent.as_str());
        if present < *quantity {
            error!(
                reagent = %reagent,
                present = %present,
                requested = %quantity,
                "reagent removal would go negative; clamping to zero"
            );
            report.underflows.push(reagent.clone());
        }
        solution.remove_reagent(reagent.as_str(), *quantity);
    }

    for product in produced {
        solution.insert(
            &product.reagent,
            product.specific_heat,
            product.quantity,
            product_temperature,
        );
    }

    if thermal_energy_delta.is_finite() {
        solution.add_thermal_energy(thermal_energy_delta);
    }

    let volume = solution.volume();
    let max = solution.max_volume();
    if volume > max {
        let discarded = solution.remove_proportional(volume - max);
        debug!(
            volume = %volume,
            max_volume = %max,
            discarded = %discarded,
            "discarded reaction overflow"
        );
        report.overflow_discarded = discarded;
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reagent::Reagent;

    fn x() -> Reagent {
        Reagent::new("x", 1.0)
    }

    fn produced(id: &str, units: i64, specific_heat: f32) -> ProducedReagent {
        ProducedReagent {
            reagent: ReagentId::new(id),
            quantity: Quantity::new(units),
            specific_heat,
        }
    }

    #[test]
    fn consumes_and_produces() {
        let mut s = Solution::new(Quantity::new(100)).with_reagent(&x(), Quantity::new(10));
        let report = apply(
            &mut s,
            &[(ReagentId::new("x"), Quantity::new(10))],
            &[produced("y", 5, 1.0)],
            None,
            0.0,
        );
        assert!(report.is_clean());
        assert_eq!(s.quantity("x"), Quantity::ZERO);
        assert_eq!(s.quantity("y"), Quantity::new(5));
        assert!((s.temperature() - crate::T20C).abs() < 1e-3);
    }

    #[test]
    fn underflow_is_clamped_and_reported() {
        let mut s = Solution::new(Quantity::new(100)).with_reagent(&x(), Quantity::new(1));
        let report = apply(&mut s, &[(ReagentId::new("x"), Quantity::new(2))], &[], None, 0.0);
        assert_eq!(report.underflows.as_slice(), &[ReagentId::new("x")]);
        assert_eq!(s.quantity("x"), Quantity::ZERO);
    }

    #[test]
    fn overflow_is_discarded() {
        let mut s = Solution::new(Quantity::new(10)).with_reagent(&x(), Quantity::new(10));
        let report = apply(&mut s, &[], &[produced("y", 10, 1.0)], None, 0.0);
        assert_eq!(report.overflow_discarded, Quantity::new(10));
        assert_eq!(s.volume(), Quantity::new(10));
        assert_eq!(s.quantity("x"), Quantity::new(5));
        assert_eq!(s.quantity("y"), Quantity::new(5));
    }

    #[test]
    fn heat_delta_warms_the_remaining_mixture() {
        let mut s = Solution::new(Quantity::new(100))
            .with_temperature(300.0)
            .with_reagent(&x(), Quantity::new(20));
        apply(
            &mut s,
            &[(ReagentId::new("x"), Quantity::new(10))],
            &[],
            None,
            100.0,
        );
        // 10u left at C=10 J/K; +100 J -> +10 K
        assert!((s.temperature() - 310.0).abs() < 1e-3);
    }

    #[test]
    fn explicit_product_temperature_mixes_thermally() {
        let mut s = Solution::new(Quantity::new(100))
            .with_temperature(300.0)
            .with_reagent(&x(), Quantity::new(20));
        apply(
            &mut s,
            &[(ReagentId::new("x"), Quantity::new(10))],
            &[produced("y", 10, 1.0)],
            Some(400.0),
            0.0,
        );
        assert!((s.temperature() - 350.0).abs() < 1e-3);
    }
}
