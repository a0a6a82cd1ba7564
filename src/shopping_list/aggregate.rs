use std::collections::HashMap;

use serde::Serialize;

use crate::schema::CartLine;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

impl ShoppingListItem {
    pub fn line(&self) -> String {
        format!(
            "{} - {} {}",
            self.name, self.total_amount, self.measurement_unit
        )
    }
}

/// Merges cart lines by `(name, measurement_unit)`, summing amounts.
///
/// Items come out in the order their key was first seen, so feeding lines in
/// cart order then recipe order gives a stable list. The same ingredient
/// measured in two different units stays on two lines.
pub fn aggregate<I>(lines: I) -> Vec<ShoppingListItem>
where
    I: IntoIterator<Item = CartLine>,
{
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut items: Vec<ShoppingListItem> = vec![];

    for line in lines {
        let key = (line.name, line.measurement_unit);
        match index.get(&key) {
            Some(&position) => items[position].total_amount += i64::from(line.amount),
            None => {
                index.insert(key.clone(), items.len());
                items.push(ShoppingListItem {
                    name: key.0,
                    measurement_unit: key.1,
                    total_amount: line.amount.into(),
                });
            }
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn line(name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn item(name: &str, unit: &str, total_amount: i64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total_amount,
        }
    }

    #[rstest]
    fn test_two_recipes_sharing_flour() {
        let recipe_a = vec![line("Flour", "g", 200), line("Sugar", "g", 50)];
        let recipe_b = vec![line("Flour", "g", 300), line("Egg", "pcs", 2)];

        let items = aggregate(recipe_a.into_iter().chain(recipe_b));

        assert_eq!(
            items,
            vec![
                item("Flour", "g", 500),
                item("Sugar", "g", 50),
                item("Egg", "pcs", 2)
            ]
        );
        assert_eq!(items[0].line(), "Flour - 500 g");
    }

    #[rstest]
    fn test_single_recipe_is_identity() {
        let lines = vec![
            line("Milk", "ml", 250),
            line("Salt", "pinch", 1),
            line("Butter", "g", 30),
        ];

        let items = aggregate(lines.clone());

        assert_eq!(items.len(), lines.len());
        for (line, item) in lines.iter().zip(items.iter()) {
            assert_eq!(item.name, line.name);
            assert_eq!(item.total_amount, i64::from(line.amount));
        }
    }

    #[rstest]
    fn test_units_are_not_merged() {
        let items = aggregate(vec![
            line("Sugar", "g", 100),
            line("Sugar", "tbsp", 2),
            line("Sugar", "g", 20),
        ]);

        assert_eq!(items, vec![item("Sugar", "g", 120), item("Sugar", "tbsp", 2)]);
    }

    #[rstest]
    fn test_empty_cart() {
        assert!(aggregate(Vec::<CartLine>::new()).is_empty());
    }

    #[rstest]
    fn test_sums_do_not_overflow_row_type() {
        let items = aggregate(vec![line("Water", "ml", i32::MAX), line("Water", "ml", i32::MAX)]);
        assert_eq!(items[0].total_amount, 2 * i64::from(i32::MAX));
    }
}
