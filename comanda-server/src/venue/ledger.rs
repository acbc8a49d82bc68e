//! Money calculation utilities using rust_decimal for precision
//!
//! All arithmetic is done with `Decimal` internally, then converted back
//! to `f64` for storage and the wire. Client-supplied floats are coerced
//! through `to_decimal`, which maps NaN/Infinity to zero.

use std::collections::HashMap;

use rust_decimal::prelude::*;

use shared::models::table::{CartItem, SHARED_PERSON, Table};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Line total for a single cart item (price * quantity)
pub fn line_total(item: &CartItem) -> Decimal {
    to_decimal(item.price) * Decimal::from(item.quantity)
}

/// Sum of line totals, rounded to 2 decimal places
pub fn calculate_total(items: &[CartItem]) -> f64 {
    let total: Decimal = items.iter().map(line_total).sum();
    to_f64(total)
}

/// Full recompute of the per-person ledger from served + pending items.
///
/// Items without an assigned diner land under the shared label.
pub fn consumption_by_person(table: &Table) -> HashMap<String, f64> {
    let mut ledger: HashMap<String, Decimal> = HashMap::new();

    for item in table.served_items.iter().chain(table.pending_cart.iter()) {
        let person = if item.person.is_empty() {
            SHARED_PERSON.to_string()
        } else {
            item.person.clone()
        };
        *ledger.entry(person).or_insert(Decimal::ZERO) += line_total(item);
    }

    ledger.into_iter().map(|(k, v)| (k, to_f64(v))).collect()
}

/// Incrementally add a line amount to one person's running total.
pub fn accumulate(ledger: &mut HashMap<String, f64>, person: &str, amount: Decimal) {
    let current = to_decimal(ledger.get(person).copied().unwrap_or(0.0));
    ledger.insert(person.to_string(), to_f64(current + amount));
}

/// Incrementally subtract a line amount from one person's running total.
///
/// The total is not clamped; a removal that was never accumulated can
/// leave a negative entry, exactly like the running cart math it mirrors.
pub fn deduct(ledger: &mut HashMap<String, f64>, person: &str, amount: Decimal) {
    let current = to_decimal(ledger.get(person).copied().unwrap_or(0.0));
    ledger.insert(person.to_string(), to_f64(current - amount));
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::table::{ItemStatus, TableId};

    fn item(price: f64, quantity: u32, person: &str) -> CartItem {
        CartItem {
            id: 1,
            product_id: 1,
            name: "Item".into(),
            price,
            quantity,
            notes: String::new(),
            person: person.into(),
            added_at: 0,
            added_at_formatted: "00:00:00".into(),
            status: ItemStatus::Pending,
            served_at: None,
            served_at_formatted: None,
        }
    }

    #[test]
    fn decimal_addition_is_exact() {
        // Classic floating point problem: 0.1 + 0.2 != 0.3
        let sum = to_decimal(0.1) + to_decimal(0.2);
        assert_eq!(to_f64(sum), 0.3);
    }

    #[test]
    fn accumulation_precision() {
        let mut total = Decimal::ZERO;
        for _ in 0..1000 {
            total += to_decimal(0.01);
        }
        assert_eq!(to_f64(total), 10.0);
    }

    #[test]
    fn nan_and_infinity_coerce_to_zero() {
        assert_eq!(to_decimal(f64::NAN), Decimal::ZERO);
        assert_eq!(to_decimal(f64::INFINITY), Decimal::ZERO);
        assert_eq!(to_decimal(f64::NEG_INFINITY), Decimal::ZERO);
        assert_eq!(calculate_total(&[item(f64::NAN, 3, "Todos")]), 0.0);
    }

    #[test]
    fn calculate_total_rounds_to_cents() {
        let items = vec![item(8.5, 2, "Todos"), item(3.333, 3, "Todos")];
        // 17.00 + 9.999 = 26.999 → 27.00
        assert_eq!(calculate_total(&items), 27.0);
    }

    #[test]
    fn ledger_full_recompute_covers_both_lists() {
        let mut table = Table::new(TableId::new(1).unwrap(), 0);
        table.pending_cart.push(item(10.0, 1, "Ana"));
        table.served_items.push(item(5.0, 2, "Luis"));
        table.served_items.push(item(2.5, 2, "Ana"));

        let ledger = consumption_by_person(&table);
        assert_eq!(ledger["Ana"], 15.0);
        assert_eq!(ledger["Luis"], 10.0);
    }

    #[test]
    fn empty_person_falls_back_to_shared() {
        let mut table = Table::new(TableId::new(1).unwrap(), 0);
        table.pending_cart.push(item(4.0, 1, ""));
        let ledger = consumption_by_person(&table);
        assert_eq!(ledger[SHARED_PERSON], 4.0);
    }

    #[test]
    fn incremental_add_then_remove_is_neutral() {
        let mut ledger = HashMap::new();
        accumulate(&mut ledger, "Ana", to_decimal(17.0));
        accumulate(&mut ledger, "Ana", to_decimal(4.5));
        deduct(&mut ledger, "Ana", to_decimal(17.0));
        assert_eq!(ledger["Ana"], 4.5);
        deduct(&mut ledger, "Ana", to_decimal(4.5));
        assert_eq!(ledger["Ana"], 0.0);
    }

    #[test]
    fn deduct_does_not_clamp() {
        let mut ledger = HashMap::new();
        deduct(&mut ledger, "Ana", to_decimal(3.0));
        assert_eq!(ledger["Ana"], -3.0);
    }
}
