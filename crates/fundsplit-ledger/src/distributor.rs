//! Proportional distributor
//!
//! Splits a pool across weighted categories with integer arithmetic and no
//! leftover.
//!
//! ## Recurrence
//!
//! ```text
//! share_i = floor(w_i * remaining_amount / remaining_weight)
//! remaining_amount -= share_i
//! remaining_weight -= w_i
//! ```
//!
//! Each share is computed against what is still left rather than against the
//! original totals. The last category with non-zero weight sees
//! `remaining_weight == w_i` and therefore takes everything that is left,
//! rounding dust included, so the shares always sum to the pool.

use fundsplit_common::{Amount, Category, FundError, Payout, Result, Weight};
use primitive_types::U256;
use tracing::trace;

/// Pure proportional split of a pool
pub struct ProportionalDistributor;

impl ProportionalDistributor {
    /// Split `total_amount` across `categories` in the given order
    ///
    /// Returns one payout per category that receives a non-zero share.
    /// Categories after the point where either the pool or the weight is
    /// exhausted get no record.
    ///
    /// # Errors
    /// - [`FundError::EmptyRegistry`] when `categories` is empty
    /// - [`FundError::ZeroWeight`] when every weight is zero
    ///
    /// # Example
    /// ```
    /// use fundsplit_common::{Address, AddressKind, Category};
    /// use fundsplit_ledger::ProportionalDistributor;
    ///
    /// let to = |l: &str| Address::derive(AddressKind::Account, l.as_bytes());
    /// let categories = vec![
    ///     Category::new("a", to("a"), 1),
    ///     Category::new("b", to("b"), 1),
    ///     Category::new("c", to("c"), 1),
    /// ];
    ///
    /// let payouts = ProportionalDistributor::distribute(10, &categories).unwrap();
    /// let amounts: Vec<u128> = payouts.iter().map(|p| p.amount).collect();
    /// assert_eq!(amounts, vec![3, 3, 4]);
    /// ```
    pub fn distribute(total_amount: Amount, categories: &[Category]) -> Result<Vec<Payout>> {
        if categories.is_empty() {
            return Err(FundError::EmptyRegistry);
        }

        let total_weight: u128 = categories.iter().map(|c| c.weight as u128).sum();
        if total_weight == 0 {
            return Err(FundError::ZeroWeight);
        }

        let mut payouts = Vec::with_capacity(categories.len());
        let mut remaining_amount = total_amount;
        let mut remaining_weight = total_weight;

        for category in categories {
            let share = proportional_share(category.weight, remaining_amount, remaining_weight)?;
            trace!(
                category = %category.id,
                weight = category.weight,
                remaining_amount,
                remaining_weight,
                share,
                "Computed share"
            );

            if share > 0 {
                payouts.push(Payout::new(
                    category.id.clone(),
                    category.destination.clone(),
                    share,
                ));
            }

            remaining_amount -= share;
            remaining_weight -= category.weight as u128;

            if remaining_amount == 0 || remaining_weight == 0 {
                break;
            }
        }

        Ok(payouts)
    }

    /// Sum of computed payouts
    pub fn total(payouts: &[Payout]) -> Amount {
        payouts.iter().map(|p| p.amount).sum()
    }
}

/// `floor(weight * amount / total_weight)` without overflowing
///
/// With `amount = q * total_weight + r`:
/// `floor(weight * amount / total_weight) = weight * q + floor(weight * r / total_weight)`.
/// `weight <= total_weight` keeps `weight * q <= amount`. The product
/// `weight * r` is formed in 256 bits, and the quotient is below `weight`.
pub fn proportional_share(weight: Weight, amount: Amount, total_weight: u128) -> Result<Amount> {
    if total_weight == 0 {
        return Err(FundError::ZeroWeight);
    }

    let quotient = amount / total_weight;
    let remainder = amount % total_weight;

    let whole = weight as u128 * quotient;
    let partial = (U256::from(weight) * U256::from(remainder) / U256::from(total_weight)).low_u128();

    Ok(whole + partial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundsplit_common::{Address, AddressKind};
    use proptest::prelude::*;

    fn categories(weights: &[(&str, Weight)]) -> Vec<Category> {
        weights
            .iter()
            .map(|(id, w)| Category::new(*id, Address::derive(AddressKind::Account, id.as_bytes()), *w))
            .collect()
    }

    fn amounts(payouts: &[Payout]) -> Vec<(&str, Amount)> {
        payouts
            .iter()
            .map(|p| (p.category_id.as_str(), p.amount))
            .collect()
    }

    #[test]
    fn test_weighted_split_last_absorbs_dust() {
        let cats = categories(&[("A", 30), ("B", 20), ("C", 50)]);
        let payouts = ProportionalDistributor::distribute(101, &cats).unwrap();

        assert_eq!(amounts(&payouts), vec![("A", 30), ("B", 20), ("C", 51)]);
        assert_eq!(ProportionalDistributor::total(&payouts), 101);
    }

    #[test]
    fn test_equal_weights() {
        let cats = categories(&[("A", 1), ("B", 1), ("C", 1)]);
        let payouts = ProportionalDistributor::distribute(10, &cats).unwrap();

        assert_eq!(amounts(&payouts), vec![("A", 3), ("B", 3), ("C", 4)]);
    }

    #[test]
    fn test_payouts_carry_destinations() {
        let cats = categories(&[("A", 1), ("B", 3)]);
        let payouts = ProportionalDistributor::distribute(8, &cats).unwrap();

        assert_eq!(payouts[1].destination, cats[1].destination);
        assert_eq!(payouts[1].amount, 6);
    }

    #[test]
    fn test_zero_pool_emits_nothing() {
        let cats = categories(&[("A", 5), ("B", 5)]);
        let payouts = ProportionalDistributor::distribute(0, &cats).unwrap();
        assert!(payouts.is_empty());
    }

    #[test]
    fn test_empty_registry() {
        let result = ProportionalDistributor::distribute(100, &[]);
        assert!(matches!(result, Err(FundError::EmptyRegistry)));
    }

    #[test]
    fn test_all_zero_weights() {
        let cats = categories(&[("A", 0), ("B", 0)]);
        let result = ProportionalDistributor::distribute(100, &cats);
        assert!(matches!(result, Err(FundError::ZeroWeight)));
    }

    #[test]
    fn test_zero_weight_category_gets_nothing() {
        let cats = categories(&[("A", 0), ("B", 2), ("C", 0), ("D", 2)]);
        let payouts = ProportionalDistributor::distribute(9, &cats).unwrap();

        assert_eq!(amounts(&payouts), vec![("B", 4), ("D", 5)]);
    }

    #[test]
    fn test_trailing_zero_weights_are_skipped() {
        let cats = categories(&[("A", 1), ("B", 0), ("C", 0)]);
        let payouts = ProportionalDistributor::distribute(7, &cats).unwrap();

        assert_eq!(amounts(&payouts), vec![("A", 7)]);
    }

    #[test]
    fn test_pool_smaller_than_category_count() {
        let cats = categories(&[("A", 1), ("B", 1), ("C", 1), ("D", 1)]);
        let payouts = ProportionalDistributor::distribute(2, &cats).unwrap();

        // A: floor(2/4)=0, B: floor(2/3)=0, C: floor(2/2)=1, D: 1
        assert_eq!(amounts(&payouts), vec![("C", 1), ("D", 1)]);
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let cats = categories(&[("A", u64::MAX / 2), ("B", u64::MAX / 4), ("C", 3)]);
        let pool = u128::MAX;
        let payouts = ProportionalDistributor::distribute(pool, &cats).unwrap();

        assert_eq!(ProportionalDistributor::total(&payouts), pool);
    }

    #[test]
    fn test_total_weight_beyond_u64() {
        let cats = categories(&[("A", u64::MAX), ("B", u64::MAX), ("C", u64::MAX)]);
        let payouts = ProportionalDistributor::distribute(u128::MAX, &cats).unwrap();

        let third = u128::MAX / 3;
        assert_eq!(amounts(&payouts), vec![("A", third), ("B", third), ("C", third)]);
        assert_eq!(ProportionalDistributor::total(&payouts), u128::MAX);
    }

    #[test]
    fn test_proportional_share_matches_naive() {
        for (weight, amount, total) in [(30u64, 101u128, 100u128), (7, 1_000_003, 13), (0, 55, 9)] {
            let naive = weight as u128 * amount / total;
            assert_eq!(proportional_share(weight, amount, total).unwrap(), naive);
        }
    }

    proptest! {
        #[test]
        fn prop_conservation(
            weights in prop::collection::vec(0u64..1_000_000, 1..32),
            amount in 0u128..1_000_000_000_000_000_000,
        ) {
            prop_assume!(weights.iter().any(|w| *w > 0));
            let ids: Vec<String> = (0..weights.len()).map(|i| format!("c{i}")).collect();
            let cats: Vec<Category> = ids
                .iter()
                .zip(&weights)
                .map(|(id, w)| Category::new(id.clone(), Address::derive(AddressKind::Account, id.as_bytes()), *w))
                .collect();

            let payouts = ProportionalDistributor::distribute(amount, &cats).unwrap();
            prop_assert_eq!(ProportionalDistributor::total(&payouts), amount);
            prop_assert!(payouts.iter().all(|p| p.amount > 0));
        }

        #[test]
        fn prop_order_independent_total(
            weights in prop::collection::vec(1u64..10_000, 2..16),
            amount in 0u128..10_000_000,
            rotation in 0usize..16,
        ) {
            let mut cats: Vec<Category> = weights
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let id = format!("c{i}");
                    Category::new(id.clone(), Address::derive(AddressKind::Account, id.as_bytes()), *w)
                })
                .collect();
            let forward = ProportionalDistributor::distribute(amount, &cats).unwrap();

            let len = cats.len();
            cats.rotate_left(rotation % len);
            cats.reverse();
            let permuted = ProportionalDistributor::distribute(amount, &cats).unwrap();

            prop_assert_eq!(ProportionalDistributor::total(&forward), amount);
            prop_assert_eq!(ProportionalDistributor::total(&permuted), amount);
        }

        #[test]
        fn prop_share_within_rounding_bounds(
            weights in prop::collection::vec(1u64..1_000, 1..10),
            amount in 0u128..1_000_000,
        ) {
            let total: u128 = weights.iter().map(|w| *w as u128).sum();
            let cats: Vec<Category> = weights
                .iter()
                .enumerate()
                .map(|(i, w)| Category::new(format!("c{i}"), Address::derive(AddressKind::Account, &[i as u8]), *w))
                .collect();

            let payouts = ProportionalDistributor::distribute(amount, &cats).unwrap();
            for payout in &payouts {
                let index: usize = payout.category_id[1..].parse().unwrap();
                let exact_floor = weights[index] as u128 * amount / total;
                prop_assert!(payout.amount >= exact_floor);
                prop_assert!(payout.amount <= exact_floor + weights.len() as u128);
            }
        }
    }
}
