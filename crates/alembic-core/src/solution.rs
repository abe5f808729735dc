//! A mixture of reagents with volume and temperature.
//!
//! Heat capacity and volume are derived on demand from the contents rather
//! than cached, so they can never drift from the reagent quantities.
//! Each entry carries its reagent's specific heat, which lets the reaction
//! pipeline mutate a solution without consulting the [`ReagentRegistry`].
//!
//! [`ReagentRegistry`]: crate::ReagentRegistry

use indexmap::IndexMap;

use crate::id::ReagentId;
use crate::quantity::Quantity;
use crate::reagent::Reagent;

/// 20 °C in kelvin; the temperature of a freshly created solution.
pub const T20C: f32 = 293.15;

/// One reagent's share of a solution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolutionEntry {
    /// Amount of the reagent present. Never negative.
    pub quantity: Quantity,
    /// Heat capacity per unit of the reagent.
    pub specific_heat: f32,
}

/// A mixture of reagents held by a container.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    contents: IndexMap<ReagentId, SolutionEntry>,
    temperature: f32,
    max_volume: Quantity,
}

impl Solution {
    /// An empty solution at 20 °C that can hold up to `max_volume`.
    pub fn new(max_volume: Quantity) -> Self {
        Self {
            contents: IndexMap::new(),
            temperature: T20C,
            max_volume,
        }
    }

    /// Builder-style temperature override.
    pub fn with_temperature(mut self, kelvin: f32) -> Self {
        self.temperature = kelvin;
        self
    }

    /// Builder-style reagent insertion at the solution's temperature.
    pub fn with_reagent(mut self, reagent: &Reagent, quantity: Quantity) -> Self {
        self.add_reagent(reagent, quantity);
        self
    }

    /// Current temperature in kelvin.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Overwrite the temperature. Non-finite values are ignored.
    pub fn set_temperature(&mut self, kelvin: f32) {
        if kelvin.is_finite() {
            self.temperature = kelvin;
        }
    }

    /// Total quantity of all reagents.
    pub fn volume(&self) -> Quantity {
        self.contents.values().map(|e| e.quantity).sum()
    }

    /// Capacity of the owning container.
    pub fn max_volume(&self) -> Quantity {
        self.max_volume
    }

    /// Change the capacity. Existing contents are not trimmed.
    pub fn set_max_volume(&mut self, max_volume: Quantity) {
        self.max_volume = max_volume;
    }

    /// Free space left before `max_volume` is reached (never negative).
    pub fn available_volume(&self) -> Quantity {
        let volume = self.volume();
        if volume >= self.max_volume {
            Quantity::ZERO
        } else {
            self.max_volume - volume
        }
    }

    /// Sum over reagents of quantity × specific heat.
    pub fn heat_capacity(&self) -> f32 {
        self.contents
            .values()
            .map(|e| e.quantity.to_f32() * e.specific_heat)
            .sum()
    }

    /// Temperature × heat capacity.
    pub fn thermal_energy(&self) -> f32 {
        self.temperature * self.heat_capacity()
    }

    /// Set the thermal energy, recomputing the temperature from the
    /// current heat capacity. No-op on a solution without heat capacity.
    pub fn set_thermal_energy(&mut self, energy: f32) {
        let capacity = self.heat_capacity();
        if capacity > 0.0 {
            self.set_temperature(energy / capacity);
        }
    }

    /// Add `delta` joules of thermal energy.
    pub fn add_thermal_energy(&mut self, delta: f32) {
        if delta != 0.0 {
            self.set_thermal_energy(self.thermal_energy() + delta);
        }
    }

    /// Quantity of a reagent (zero if absent).
    pub fn quantity(&self, reagent: &str) -> Quantity {
        self.contents
            .get(reagent)
            .map(|e| e.quantity)
            .unwrap_or(Quantity::ZERO)
    }

    /// Whether a positive quantity of `reagent` is present.
    pub fn contains(&self, reagent: &str) -> bool {
        self.quantity(reagent).is_positive()
    }

    /// Whether the solution holds no reagents.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Number of distinct reagents present.
    pub fn reagent_count(&self) -> usize {
        self.contents.len()
    }

    /// Iterate `(reagent, entry)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ReagentId, &SolutionEntry)> {
        self.contents.iter()
    }

    /// Iterate the ids of the reagents present.
    pub fn reagent_ids(&self) -> impl Iterator<Item = &ReagentId> {
        self.contents.keys()
    }

    /// Add a reagent at the solution's own temperature, capped at the
    /// available volume. Returns the quantity actually added.
    pub fn add_reagent(&mut self, reagent: &Reagent, quantity: Quantity) -> Quantity {
        let quantity = quantity.min(self.available_volume());
        self.insert(&reagent.id, reagent.specific_heat, quantity, None);
        quantity.max(Quantity::ZERO)
    }

    /// Add a reagent arriving at `kelvin`, capped at the available volume.
    /// The mixture's temperature moves to the thermal-energy-weighted mean.
    pub fn add_reagent_at(&mut self, reagent: &Reagent, quantity: Quantity, kelvin: f32) -> Quantity {
        let quantity = quantity.min(self.available_volume());
        self.insert(&reagent.id, reagent.specific_heat, quantity, Some(kelvin));
        quantity.max(Quantity::ZERO)
    }

    /// Add a reagent ignoring `max_volume`.
    ///
    /// With `temperature = None` the reagent arrives at the solution's own
    /// temperature. `specific_heat` only applies to a reagent not yet
    /// present; an existing entry keeps its own. Non-positive quantities
    /// are ignored.
    pub fn insert(
        &mut self,
        reagent: &ReagentId,
        specific_heat: f32,
        quantity: Quantity,
        temperature: Option<f32>,
    ) {
        if !quantity.is_positive() {
            return;
        }
        let specific_heat = self
            .contents
            .get(reagent.as_str())
            .map_or(specific_heat, |e| e.specific_heat);
        let added_capacity = quantity.to_f32() * specific_heat;
        let arriving = temperature.unwrap_or(self.temperature);
        let energy = self.thermal_energy() + added_capacity * arriving;
        let capacity = self.heat_capacity() + added_capacity;

        let entry = self
            .contents
            .entry(reagent.clone())
            .or_insert(SolutionEntry {
                quantity: Quantity::ZERO,
                specific_heat,
            });
        entry.quantity += quantity;

        if capacity > 0.0 {
            self.set_temperature(energy / capacity);
        }
    }

    /// Remove up to `quantity` of a reagent. Returns the amount removed.
    /// Temperature is unchanged: the removed part leaves at the current
    /// temperature.
    pub fn remove_reagent(&mut self, reagent: &str, quantity: Quantity) -> Quantity {
        if !quantity.is_positive() {
            return Quantity::ZERO;
        }
        let Some(entry) = self.contents.get_mut(reagent) else {
            return Quantity::ZERO;
        };
        if quantity >= entry.quantity {
            let removed = entry.quantity;
            self.contents.shift_remove(reagent);
            removed
        } else {
            entry.quantity -= quantity;
            quantity
        }
    }

    /// Remove `to_take` in total, split across reagents in proportion to
    /// their share of the volume. Each share is rounded up so the total
    /// removed is never less than requested (bounded by the volume).
    pub fn remove_proportional(&mut self, to_take: Quantity) -> Quantity {
        let volume = self.volume();
        if !to_take.is_positive() || volume.is_zero() {
            return Quantity::ZERO;
        }
        if to_take >= volume {
            self.contents.clear();
            return volume;
        }
        let mut removed = Quantity::ZERO;
        self.contents.retain(|_, entry| {
            let share = entry.quantity.mul_div_ceil(to_take, volume).min(entry.quantity);
            entry.quantity -= share;
            removed += share;
            entry.quantity.is_positive()
        });
        removed
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.contents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Reagent {
        Reagent::new("water", 4.0)
    }

    fn oil() -> Reagent {
        Reagent::new("oil", 2.0)
    }

    #[test]
    fn volume_and_heat_capacity_are_derived() {
        let s = Solution::new(Quantity::new(100))
            .with_reagent(&water(), Quantity::new(10))
            .with_reagent(&oil(), Quantity::new(5));
        assert_eq!(s.volume(), Quantity::new(15));
        assert_eq!(s.available_volume(), Quantity::new(85));
        assert!((s.heat_capacity() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn add_reagent_is_capped_by_max_volume() {
        let mut s = Solution::new(Quantity::new(10));
        let added = s.add_reagent(&water(), Quantity::new(25));
        assert_eq!(added, Quantity::new(10));
        assert_eq!(s.volume(), Quantity::new(10));
        assert_eq!(s.add_reagent(&oil(), Quantity::new(1)), Quantity::ZERO);
    }

    #[test]
    fn mixing_at_temperature_weights_by_heat_capacity() {
        let mut s = Solution::new(Quantity::new(100))
            .with_temperature(300.0)
            .with_reagent(&water(), Quantity::new(10));
        // 10u water (C=40) at 300K + 10u oil (C=20) at 360K -> 320K
        s.add_reagent_at(&oil(), Quantity::new(10), 360.0);
        assert!((s.temperature() - 320.0).abs() < 1e-3);
    }

    #[test]
    fn insert_into_existing_entry_keeps_its_specific_heat() {
        let mut s = Solution::new(Quantity::new(100))
            .with_temperature(300.0)
            .with_reagent(&water(), Quantity::new(10));
        s.insert(&water().id, 1.0, Quantity::new(10), Some(360.0));
        assert!((s.heat_capacity() - 80.0).abs() < 1e-3);
        assert!((s.temperature() - 330.0).abs() < 1e-3);
    }

    #[test]
    fn thermal_energy_round_trips_through_temperature() {
        let mut s = Solution::new(Quantity::new(100)).with_reagent(&water(), Quantity::new(10));
        let e = s.thermal_energy();
        s.add_thermal_energy(400.0);
        assert!((s.thermal_energy() - (e + 400.0)).abs() < 1e-2);
        assert!((s.temperature() - (T20C + 10.0)).abs() < 1e-3);
    }

    #[test]
    fn thermal_energy_on_empty_solution_is_ignored() {
        let mut s = Solution::new(Quantity::new(10));
        s.add_thermal_energy(1000.0);
        assert_eq!(s.temperature(), T20C);
    }

    #[test]
    fn remove_reagent_clamps_and_drops_empty_entries() {
        let mut s = Solution::new(Quantity::new(100)).with_reagent(&water(), Quantity::new(3));
        assert_eq!(s.remove_reagent("water", Quantity::new(1)), Quantity::new(1));
        assert_eq!(s.remove_reagent("water", Quantity::new(5)), Quantity::new(2));
        assert!(s.is_empty());
        assert_eq!(s.remove_reagent("water", Quantity::new(1)), Quantity::ZERO);
    }

    #[test]
    fn remove_proportional_takes_at_least_requested() {
        let mut s = Solution::new(Quantity::new(100))
            .with_reagent(&water(), Quantity::new(10))
            .with_reagent(&oil(), Quantity::new(20));
        let removed = s.remove_proportional(Quantity::new(3));
        assert!(removed >= Quantity::new(3));
        assert_eq!(s.quantity("water"), Quantity::new(9));
        assert_eq!(s.quantity("oil"), Quantity::new(18));
    }

    #[test]
    fn remove_proportional_everything() {
        let mut s = Solution::new(Quantity::new(100)).with_reagent(&water(), Quantity::new(10));
        assert_eq!(s.remove_proportional(Quantity::new(50)), Quantity::new(10));
        assert!(s.is_empty());
    }
}
