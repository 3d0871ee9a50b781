// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

//! Change making over the fixed set of zerocoin denominations.

use crate::consensus::{Money, COIN};
use crate::primitives::Denomination;
use crate::wallet::MintMeta;
use std::collections::BTreeMap;

/// Denomination to number of coins
pub type DenominationMap = BTreeMap<Denomination, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStatus {
    /// The selection adds up to the target
    Exact,

    /// The selection overpays the target by `change`
    Change { change: Money },

    /// Covering the target takes `needed` spends, more than allowed
    TooManySpends { needed: u64 },

    /// Every held coin together is `shortfall` short of the target
    InsufficientFunds { shortfall: Money },
}

impl SelectionStatus {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Exact | Self::Change { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub usage: DenominationMap,
    pub status: SelectionStatus,
}

impl Selection {
    /// Sum of the selected denominations
    #[must_use]
    pub fn value(&self) -> Money {
        sum(&self.usage)
    }

    /// Number of selected coins
    #[must_use]
    pub fn spends(&self) -> u64 {
        self.usage.values().sum()
    }
}

fn sum(usage: &DenominationMap) -> Money {
    usage
        .iter()
        .map(|(d, count)| d.amount() * *count as Money)
        .sum()
}

/// Picks which held denominations to spend in order to pay `target`.
///
/// Spends greedily from the largest denomination down. When no exact
/// combination exists the remainder is covered by one more coin: the
/// smallest sufficient one if `minimize_change` is set, the largest
/// otherwise. With `minimize_change` the result is then swapped for a
/// selection with less change when dropping redundant coins or paying with
/// a single coin gets closer to the target. Selections spending more than
/// `max_spends` coins fall back to a single coin covering the whole target,
/// or report how many spends would be needed.
#[must_use]
pub fn select_change(
    target: Money,
    max_spends: u64,
    minimize_change: bool,
    held: &DenominationMap,
) -> Selection {
    let total_held = sum(held);

    if target <= 0 {
        return Selection {
            usage: DenominationMap::new(),
            status: SelectionStatus::Exact,
        };
    }

    if total_held < target {
        return Selection {
            usage: held.clone(),
            status: SelectionStatus::InsufficientFunds {
                shortfall: target - total_held,
            },
        };
    }

    let mut usage = DenominationMap::new();
    let mut remaining = target;

    for d in Denomination::ALL.iter().rev() {
        let available = held.get(d).copied().unwrap_or(0);
        let wanted = (remaining / d.amount()) as u64;
        let used = available.min(wanted);

        if used > 0 {
            usage.insert(*d, used);
            remaining -= d.amount() * used as Money;
        }
    }

    if remaining > 0 {
        let unused = |usage: &DenominationMap, d: &Denomination| {
            held.get(d).copied().unwrap_or(0) > usage.get(d).copied().unwrap_or(0)
        };
        let mut cover = if minimize_change {
            Denomination::ALL
                .iter()
                .find(|d| d.amount() >= remaining && unused(&usage, d))
                .or_else(|| Denomination::ALL.iter().rev().find(|d| unused(&usage, d)))
        } else {
            Denomination::ALL.iter().rev().find(|d| unused(&usage, d))
        }
        .copied();

        // Covering coins can be smaller than the remainder, keep adding
        while remaining > 0 {
            let Some(d) = cover else {
                break;
            };

            *usage.entry(d).or_insert(0) += 1;
            remaining -= d.amount();
            cover = Denomination::ALL
                .iter()
                .rev()
                .copied()
                .find(|d| unused(&usage, d));
        }

        if minimize_change {
            usage = least_change(target, held, usage);
        }
    }

    let spends: u64 = usage.values().sum();

    if spends > max_spends {
        // A single coin paying for everything beats too many spends
        let single = Denomination::ALL
            .iter()
            .find(|d| d.amount() >= target && held.get(d).copied().unwrap_or(0) > 0);

        return match single {
            Some(d) if max_spends > 0 => Selection {
                usage: DenominationMap::from([(*d, 1)]),
                status: SelectionStatus::Change {
                    change: d.amount() - target,
                },
            },

            _ => Selection {
                usage,
                status: SelectionStatus::TooManySpends { needed: spends },
            },
        };
    }

    let status = match sum(&usage) - target {
        0 => SelectionStatus::Exact,
        change => SelectionStatus::Change { change },
    };

    Selection { usage, status }
}

/// Drops coins, largest first, that the rest of the selection does not need
/// to cover `target`
fn prune_redundant(target: Money, mut usage: DenominationMap) -> DenominationMap {
    let mut total = sum(&usage);

    for d in Denomination::ALL.iter().rev() {
        while usage.get(d).copied().unwrap_or(0) > 0 && total - d.amount() >= target {
            total -= d.amount();
            usage.entry(*d).and_modify(|count| *count -= 1);
        }
    }

    usage.retain(|_, count| *count > 0);
    usage
}

/// Out of the greedy selection, the greedy selection without redundant coins
/// and every single held coin covering `target`, returns the one with the
/// least change. Ties go to fewer spends.
fn least_change(target: Money, held: &DenominationMap, greedy: DenominationMap) -> DenominationMap {
    let key = |usage: &DenominationMap| (sum(usage) - target, usage.values().sum::<u64>());
    let pruned = prune_redundant(target, greedy.clone());
    let singles = Denomination::ALL
        .iter()
        .filter(|d| d.amount() >= target && held.get(d).copied().unwrap_or(0) > 0)
        .map(|d| DenominationMap::from([(*d, 1)]));
    let mut best = greedy;

    for candidate in std::iter::once(pruned).chain(singles) {
        if key(&candidate) < key(&best) {
            best = candidate;
        }
    }

    best
}

/// Decomposes `amount` into the fewest mintable denominations. Returns the
/// coins to mint and the remainder that cannot be minted.
#[must_use]
pub fn calculate_outputs(amount: Money) -> (DenominationMap, Money) {
    let mut outputs = DenominationMap::new();
    let mut remaining = amount.max(0);

    for d in Denomination::ALL.iter().rev() {
        let count = remaining / d.amount();

        if count > 0 {
            outputs.insert(*d, count as u64);
            remaining -= count * d.amount();
        }
    }

    (outputs, remaining)
}

/// Result of selecting owned mints for a spend
#[derive(Debug, Clone)]
pub struct MintSelection {
    pub mints: Vec<MintMeta>,
    pub selected_value: Money,
    pub status: SelectionStatus,
}

/// Chooses concrete mints out of `mints` for a spend of `target`. Only
/// unspent mints confirmed at `tip - confirmations` or earlier are eligible,
/// oldest first within a denomination.
#[must_use]
pub fn select_mints_from_list(
    target: Money,
    max_spends: u64,
    minimize_change: bool,
    mints: &[MintMeta],
    tip: u64,
    confirmations: u64,
) -> MintSelection {
    let mut eligible: Vec<&MintMeta> = mints
        .iter()
        .filter(|m| !m.is_used())
        .filter(|m| matches!(m.height, Some(h) if h > 0 && h + confirmations <= tip))
        .collect();
    eligible.sort_by_key(|m| m.height);

    let mut held = DenominationMap::new();

    for meta in &eligible {
        *held.entry(meta.denomination).or_insert(0) += 1;
    }

    let selection = select_change(target, max_spends, minimize_change, &held);

    if !selection.status.is_ok() {
        return MintSelection {
            mints: vec![],
            selected_value: 0,
            status: selection.status,
        };
    }

    let mut selected = vec![];

    for (d, count) in &selection.usage {
        selected.extend(
            eligible
                .iter()
                .filter(|m| m.denomination == *d)
                .take(*count as usize)
                .map(|m| (*m).clone()),
        );
    }

    MintSelection {
        selected_value: selection.value(),
        mints: selected,
        status: selection.status,
    }
}

/// Whole coins of `amount`, for display
#[must_use]
pub fn whole_coins(amount: Money) -> Money {
    amount / COIN
}
