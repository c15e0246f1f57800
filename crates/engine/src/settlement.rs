//! Net-balance aggregation and greedy debt simplification.
//!
//! Everything in this module is a pure, synchronous function over slices:
//! no I/O, no clocks, deterministic output. Derived values are recomputed
//! from current ledger state on demand and cached at the engine layer, not
//! maintained incrementally.

use std::collections::{HashMap, HashSet};

use crate::money::{EPSILON_MINOR, MoneyCents};
use crate::{EngineError, PairwiseBalance, ResultEngine};

/// One user's overall position across all pairwise balances of a group.
///
/// Positive = net creditor, negative = net debtor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetBalance {
    pub user_id: String,
    pub amount: MoneyCents,
}

/// A suggested payment produced by [`simplify`]. A plan entry, never a
/// ledger row: executing it means settling the real pairwise balances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestedTransfer {
    pub from: String,
    pub to: String,
    pub amount: MoneyCents,
}

/// How many transfers a settlement plan saves over paying each balance
/// separately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Savings {
    pub saved: usize,
    pub percentage: u32,
}

/// Folds pairwise balances into one signed net amount per user.
///
/// Each debt decreases the debtor's net and increases the creditor's net by
/// the same amount, so the results always sum to zero. Users whose net ends
/// up inside the settled threshold are dropped. Output is sorted by user id
/// to keep it deterministic.
pub fn net_balances(balances: &[PairwiseBalance]) -> Vec<NetBalance> {
    let mut net: HashMap<&str, i64> = HashMap::new();

    for balance in balances {
        *net.entry(balance.from_user.as_str()).or_insert(0) -= balance.amount_minor;
        *net.entry(balance.to_user.as_str()).or_insert(0) += balance.amount_minor;
    }

    let mut out: Vec<NetBalance> = net
        .into_iter()
        .filter(|(_, amount)| amount.abs() >= EPSILON_MINOR)
        .map(|(user_id, amount)| NetBalance {
            user_id: user_id.to_string(),
            amount: MoneyCents::new(amount),
        })
        .collect();
    out.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    out
}

/// Greedy largest-first debt simplification.
///
/// Repeatedly matches the largest creditor with the largest debtor and
/// transfers `min` of the two amounts. Not guaranteed globally minimal, but
/// bounded: at most `creditors + debtors - 1` transfers, and the transfer
/// total always equals the sum of positive net balances.
///
/// Inputs with negative magnitudes after partitioning cannot occur; a
/// malformed slice (duplicate users) is a caller contract violation and
/// rejected up front.
pub fn simplify(net: &[NetBalance]) -> ResultEngine<Vec<SuggestedTransfer>> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(net.len());
    for balance in net {
        if !seen.insert(balance.user_id.as_str()) {
            return Err(EngineError::InvalidAmount(format!(
                "duplicate net balance for user {}",
                balance.user_id
            )));
        }
    }

    let mut creditors: Vec<(String, i64)> = Vec::new();
    let mut debtors: Vec<(String, i64)> = Vec::new();
    for balance in net {
        let cents = balance.amount.cents();
        if cents > EPSILON_MINOR {
            creditors.push((balance.user_id.clone(), cents));
        } else if cents < -EPSILON_MINOR {
            debtors.push((balance.user_id.clone(), -cents));
        }
    }

    creditors.sort_by(|a, b| b.1.cmp(&a.1));
    debtors.sort_by(|a, b| b.1.cmp(&a.1));

    let mut transfers = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < creditors.len() && j < debtors.len() {
        let amount = creditors[i].1.min(debtors[j].1);

        if amount >= EPSILON_MINOR {
            transfers.push(SuggestedTransfer {
                from: debtors[j].0.clone(),
                to: creditors[i].0.clone(),
                amount: MoneyCents::new(amount),
            });
        }

        creditors[i].1 -= amount;
        debtors[j].1 -= amount;

        if creditors[i].1 < EPSILON_MINOR {
            i += 1;
        }
        if debtors[j].1 < EPSILON_MINOR {
            j += 1;
        }
    }

    Ok(transfers)
}

/// Reporting helper: transfers saved by a plan, as a count and a rounded
/// percentage of the original count.
pub fn savings(original_count: usize, optimized_count: usize) -> Savings {
    let saved = original_count.saturating_sub(optimized_count);
    let percentage = if original_count == 0 {
        0
    } else {
        ((saved as f64 / original_count as f64) * 100.0).round() as u32
    };
    Savings { saved, percentage }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn balance(group_id: Uuid, from: &str, to: &str, amount_minor: i64) -> PairwiseBalance {
        PairwiseBalance::new(group_id, from, to, amount_minor)
    }

    fn net(user: &str, cents: i64) -> NetBalance {
        NetBalance {
            user_id: user.to_string(),
            amount: MoneyCents::new(cents),
        }
    }

    #[test]
    fn triangle_of_equal_debts_nets_to_zero() {
        let group_id = Uuid::new_v4();
        let balances = vec![
            balance(group_id, "a", "b", 3000),
            balance(group_id, "b", "c", 3000),
            balance(group_id, "c", "a", 3000),
        ];

        let nets = net_balances(&balances);
        assert!(nets.is_empty());
        assert!(simplify(&nets).unwrap().is_empty());
    }

    #[test]
    fn star_with_single_creditor_yields_one_transfer_per_debtor() {
        let group_id = Uuid::new_v4();
        let balances = vec![
            balance(group_id, "a", "b", 10_000),
            balance(group_id, "c", "b", 5_000),
            balance(group_id, "d", "b", 2_500),
        ];

        let nets = net_balances(&balances);
        assert_eq!(
            nets,
            vec![
                net("a", -10_000),
                net("b", 17_500),
                net("c", -5_000),
                net("d", -2_500),
            ]
        );

        let transfers = simplify(&nets).unwrap();
        assert_eq!(transfers.len(), 3);
        assert_eq!(transfers[0].from, "a");
        assert_eq!(transfers[0].to, "b");
        assert_eq!(transfers[0].amount.cents(), 10_000);
        assert_eq!(transfers[1].from, "c");
        assert_eq!(transfers[1].amount.cents(), 5_000);
        assert_eq!(transfers[2].from, "d");
        assert_eq!(transfers[2].amount.cents(), 2_500);
    }

    #[test]
    fn net_balances_always_sum_to_zero() {
        let group_id = Uuid::new_v4();
        let cases = vec![
            vec![balance(group_id, "a", "b", 137)],
            vec![
                balance(group_id, "a", "b", 5_000),
                balance(group_id, "b", "a", 2_000),
            ],
            vec![
                balance(group_id, "a", "b", 1_234),
                balance(group_id, "b", "c", 567),
                balance(group_id, "c", "d", 8_888),
                balance(group_id, "d", "a", 3),
            ],
        ];

        for balances in cases {
            let total: i64 = net_balances(&balances)
                .iter()
                .map(|n| n.amount.cents())
                .sum();
            assert_eq!(total, 0);
        }
    }

    #[test]
    fn transfer_total_equals_positive_net_total() {
        let nets = vec![
            net("a", 7_000),
            net("b", -2_500),
            net("c", 1_500),
            net("d", -6_000),
        ];
        let transfers = simplify(&nets).unwrap();

        let transferred: i64 = transfers.iter().map(|t| t.amount.cents()).sum();
        assert_eq!(transferred, 8_500);
        assert!(transfers.iter().all(|t| t.amount.is_positive()));
    }

    #[test]
    fn transfer_count_stays_below_participant_bound() {
        let nets = vec![
            net("a", 9_000),
            net("b", 1_000),
            net("c", -3_000),
            net("d", -3_000),
            net("e", -4_000),
        ];
        let transfers = simplify(&nets).unwrap();
        // 2 creditors + 3 debtors - 1
        assert!(transfers.len() <= 4);
    }

    #[test]
    fn dust_balances_are_dropped() {
        let group_id = Uuid::new_v4();
        let balances = vec![
            balance(group_id, "a", "b", 1),
            balance(group_id, "c", "d", 500),
        ];

        let nets = net_balances(&balances);
        assert_eq!(nets, vec![net("c", -500), net("d", 500)]);

        // A one-cent creditor is inside the threshold and never matched.
        let transfers = simplify(&[net("a", 1), net("b", -1)]).unwrap();
        assert!(transfers.is_empty());
    }

    #[test]
    fn duplicate_users_are_rejected() {
        let nets = vec![net("a", 100), net("a", -100)];
        assert!(matches!(
            simplify(&nets),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn savings_guards_zero_original_count() {
        assert_eq!(savings(0, 0), Savings::default());
        assert_eq!(
            savings(6, 3),
            Savings {
                saved: 3,
                percentage: 50
            }
        );
        // An optimizer can never do worse, but the guard holds anyway.
        assert_eq!(savings(2, 5).saved, 0);
    }
}
