//! Split calculator: equal split and per-item split.
//!
//! Both operations are pure arithmetic over client-supplied data. Amounts are
//! `f64` and no rounding is applied, so per-person figures reconcile with the
//! bill total only up to floating-point error.
//!
//! Tax and tip are always divided flat across everybody, even in a per-item
//! split where one person may have ordered far more than the rest.

use crate::bill::{subtotal, validate_charge, EqualSplit, ItemSplit, ItemSplitRequest, SplitRequest};
use crate::error::BillSplitError;
use tracing::debug;

/// Divide the whole bill evenly across `people_count` people.
pub fn split_equal(request: &SplitRequest) -> Result<EqualSplit, BillSplitError> {
    if request.people_count == 0 {
        return Err(BillSplitError::InvalidInput(
            "people_count must be at least 1".into(),
        ));
    }
    for item in &request.items {
        item.validate()?;
    }
    validate_charge("tax", request.tax)?;
    validate_charge("tip", request.tip)?;

    let people = f64::from(request.people_count);
    let subtotal = subtotal(&request.items);
    let total = subtotal + request.tax + request.tip;

    debug!(
        "Equal split ({}): {} items, {} people, total {}",
        request.split_type,
        request.items.len(),
        request.people_count,
        total
    );

    Ok(EqualSplit {
        subtotal,
        tax: request.tax,
        tip: request.tip,
        total,
        per_person: total / people,
        tax_per_person: request.tax / people,
        tip_per_person: request.tip / people,
    })
}

/// Split each item among the people flagged in its assignment row.
///
/// The number of people is the length of the assignment rows; every row must
/// have that same length, and there must be exactly one row per item.
/// Fails on the first item nobody is assigned to.
pub fn split_by_item(request: &ItemSplitRequest) -> Result<ItemSplit, BillSplitError> {
    let people = validate_assignments(request)?;
    for item in &request.items {
        item.validate()?;
    }
    validate_charge("tax", request.tax)?;
    validate_charge("tip", request.tip)?;

    let mut person_subtotals = vec![0.0_f64; people];

    for (item, row) in request.items.iter().zip(&request.assignments) {
        let assigned = row.iter().filter(|&&flag| flag == 1).count();
        if assigned == 0 {
            return Err(BillSplitError::InvalidInput(format!(
                "Item '{}' has no people assigned",
                item.name
            )));
        }

        let share = item.line_total() / assigned as f64;
        for (subtotal, &flag) in person_subtotals.iter_mut().zip(row) {
            if flag == 1 {
                *subtotal += share;
            }
        }
    }

    let tax_per_person = request.tax / people as f64;
    let tip_per_person = request.tip / people as f64;

    let person_totals: Vec<f64> = person_subtotals
        .iter()
        .map(|s| s + tax_per_person + tip_per_person)
        .collect();
    let total = person_totals.iter().sum();

    debug!(
        "Item split: {} items across {} people, total {}",
        request.items.len(),
        people,
        total
    );

    Ok(ItemSplit {
        person_subtotals,
        tax_per_person,
        tip_per_person,
        person_totals,
        total,
    })
}

/// Check the assignment matrix shape and return the number of people.
fn validate_assignments(request: &ItemSplitRequest) -> Result<usize, BillSplitError> {
    if request.items.is_empty() {
        return Err(BillSplitError::InvalidInput(
            "At least one item is required".into(),
        ));
    }
    if request.assignments.len() != request.items.len() {
        return Err(BillSplitError::InvalidInput(format!(
            "Expected one assignment row per item: {} items but {} rows",
            request.items.len(),
            request.assignments.len()
        )));
    }

    let people = request.assignments[0].len();
    if people == 0 {
        return Err(BillSplitError::InvalidInput(
            "Assignment rows must list at least one person".into(),
        ));
    }

    for (item, row) in request.items.iter().zip(&request.assignments) {
        if row.len() != people {
            return Err(BillSplitError::InvalidInput(format!(
                "Assignment row for item '{}' has {} entries, expected {}",
                item.name,
                row.len(),
                people
            )));
        }
        if let Some(bad) = row.iter().find(|&&flag| flag > 1) {
            return Err(BillSplitError::InvalidInput(format!(
                "Assignment flags must be 0 or 1, got {} for item '{}'",
                bad, item.name
            )));
        }
    }

    Ok(people)
}
