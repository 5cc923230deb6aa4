use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use serde::Serialize;

use crate::constants::AMOUNT_DECIMAL_PLACES;

/*
Shopping list text format, one line per ingredient name:

name   amount unit
Flour - 500 g
Egg - 2 pcs
*/

/// Rounds a summed amount so float noise never reaches the rendered list.
pub fn round_amount(amount: f64) -> f64 {
    let scale = 10f64.powi(AMOUNT_DECIMAL_PLACES);
    (amount * scale).round() / scale
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub amount: f64,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShoppingList {
    pub items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    /// Sums `(name, unit, amount)` lines by ingredient name.
    ///
    /// Groups keep the order in which their name first appears and the unit
    /// of that first line. Totals are rounded with [`round_amount`].
    pub fn aggregate<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (String, String, f64)>,
    {
        let mut items: Vec<ShoppingListItem> = vec![];
        let mut index: HashMap<String, usize> = HashMap::new();

        for (name, measurement_unit, amount) in lines {
            match index.get(&name) {
                Some(&i) => items[i].amount = round_amount(items[i].amount + amount),
                None => {
                    index.insert(name.clone(), items.len());
                    items.push(ShoppingListItem {
                        name,
                        amount: round_amount(amount),
                        measurement_unit,
                    });
                }
            }
        }

        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Display for ShoppingListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} {}", self.name, self.amount, self.measurement_unit)
    }
}

impl Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        Ok(())
    }
}
