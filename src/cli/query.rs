//! Read-only commands (cost, recipe, menu, report, tree, allergens, flatten, lookup, convert)
//!
//! Each command resolves what it needs on the loaded kitchen and prints
//! the result, then any cost issues met along the way.

use anyhow::{anyhow, Result};
use serde::Serialize;

use super::output::{money, Output};
use crate::domain::{
    build_tree, menu_report, recipe_report, IngredientCost, Kitchen, KitchenError, Quantity,
    ReportRow, TreeNode, Unit,
};

fn require_item(kitchen: &Kitchen, name: &str) -> Result<()> {
    if kitchen.graph().contains(name) {
        Ok(())
    } else {
        Err(KitchenError::UnknownRecipe(name.to_string()).into())
    }
}

/// Cost of one ingredient line
pub fn cost(output: &Output, kitchen: &mut Kitchen, item: &str, ingredient: &str) -> Result<()> {
    let cost = kitchen.cost_of(item, ingredient)?;
    let issues = kitchen.take_issues();

    if output.is_json() {
        output.data_with_issues(
            &serde_json::json!({
                "item": item,
                "ingredient": ingredient,
                "cost": cost,
            }),
            &issues,
        );
    } else {
        println!("{} in {}: {}", ingredient, item, money(cost));
        output.issues(&issues);
    }
    Ok(())
}

#[derive(Serialize)]
struct MenuCost {
    item: String,
    lines: Vec<IngredientCost>,
    total: f64,
}

/// Every line of an item with its cost and the total
pub fn menu(output: &Output, kitchen: &mut Kitchen, item: &str) -> Result<()> {
    require_item(kitchen, item)?;
    let lines = kitchen.calculate_cost(item);
    let total = lines.iter().map(|l| l.cost).sum();
    let issues = kitchen.take_issues();

    if output.is_json() {
        let menu = MenuCost {
            item: item.to_string(),
            lines,
            total,
        };
        output.data_with_issues(&menu, &issues);
    } else {
        println!("{}:", item);
        println!("  {:<28} {:<14} {:>10}", "INGREDIENT", "QUANTITY", "COST");
        for line in &lines {
            println!(
                "  {:<28} {:<14} {:>10}",
                line.ingredient,
                line.quantity,
                money(line.cost)
            );
        }
        println!("  {:<28} {:<14} {:>10}", "total", "", money(total));
        output.issues(&issues);
    }
    Ok(())
}

/// A recipe's batch cost and its lines
pub fn recipe(output: &Output, kitchen: &mut Kitchen, name: &str, multipliers: &[f64]) -> Result<()> {
    kitchen.recipe_cost(name)?;
    let rows = recipe_report(kitchen, name, multipliers);
    let issues = kitchen.take_issues();

    if output.is_json() {
        output.data_with_issues(&rows, &issues);
    } else {
        print_rows(&rows, multipliers);
        output.issues(&issues);
    }
    Ok(())
}

/// Menu report: an item's lines, then each line's recipe
pub fn report(output: &Output, kitchen: &mut Kitchen, item: &str, multipliers: &[f64]) -> Result<()> {
    require_item(kitchen, item)?;
    let rows = menu_report(kitchen, item, multipliers);
    let issues = kitchen.take_issues();

    if output.is_json() {
        output.data_with_issues(&rows, &issues);
    } else {
        print_rows(&rows, multipliers);
        output.issues(&issues);
    }
    Ok(())
}

fn print_rows(rows: &[ReportRow], multipliers: &[f64]) {
    let mut header = format!(
        "{:<20} {:<28} {:<12} {:<12} {:>10}",
        "ITEM", "INGREDIENT", "QUANTITY", "EQUIV", "COST"
    );
    for m in multipliers {
        header.push_str(&format!(" {:>10}", format!("COST {:.1}x", m)));
    }
    header.push_str(&format!(" {:>10} {:>10}", "MENU", "DIFF"));
    println!("{}", header);

    for row in rows {
        let mut line = format!(
            "{:<20} {:<28} {:<12} {:<12} {:>10}",
            row.item,
            row.ingredient,
            row.quantity,
            row.equivalent.as_deref().unwrap_or(""),
            money(row.cost)
        );
        for multiple in &row.multiples {
            line.push_str(&format!(" {:>10}", money(multiple.cost)));
        }
        line.push_str(&format!(
            " {:>10} {:>10}",
            row.menu_price.map(money).unwrap_or_default(),
            row.difference.map(money).unwrap_or_default()
        ));
        println!("{}", line.trim_end());
    }
}

/// Nested recipe tree with resolved costs
pub fn tree(output: &Output, kitchen: &mut Kitchen, name: &str) -> Result<()> {
    require_item(kitchen, name)?;
    if kitchen.graph().is_recipe(name) {
        kitchen.recipe_cost(name)?;
    } else {
        kitchen.calculate_cost(name);
    }
    let tree = build_tree(kitchen.graph(), name);
    let issues = kitchen.take_issues();

    if output.is_json() {
        output.data_with_issues(&tree, &issues);
    } else {
        print_tree(&tree, 0);
        output.issues(&issues);
    }
    Ok(())
}

fn print_tree(node: &TreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    if node.quantity.is_empty() {
        println!("{}{} {}", indent, node.ingredient, money(node.cost));
    } else {
        println!(
            "{}{} ({}) {}",
            indent,
            node.ingredient,
            node.quantity,
            money(node.cost)
        );
    }
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}

/// Allergens found anywhere beneath an item
pub fn allergens(output: &Output, kitchen: &mut Kitchen, name: &str) -> Result<()> {
    if !kitchen.catalog().is_ingredient(name) {
        require_item(kitchen, name)?;
    }
    let allergens = kitchen.allergens_of(name);

    if output.is_json() {
        output.data(&serde_json::json!({
            "name": name,
            "allergens": allergens,
        }));
    } else if allergens.is_empty() {
        println!("{}: no allergens listed", name);
    } else {
        let tags: Vec<&str> = allergens.iter().map(String::as_str).collect();
        println!("{}: {}", name, tags.join(", "));
    }
    Ok(())
}

/// Base ingredients for an amount of an item
pub fn flatten(output: &Output, kitchen: &mut Kitchen, name: &str, quantity: &str) -> Result<()> {
    let quantity: Quantity = quantity
        .parse()
        .map_err(|e| anyhow!("Invalid quantity '{}': {}", quantity, e))?;
    let rows = kitchen.flatten(name, quantity)?;
    let issues = kitchen.take_issues();

    if output.is_json() {
        output.data_with_issues(&rows, &issues);
    } else {
        println!("{} for {}:", name, quantity);
        for row in &rows {
            println!("  {:<28} {}", row.ingredient, row.quantity);
        }
        output.issues(&issues);
    }
    Ok(())
}

#[derive(Serialize)]
struct LookupRow<'a> {
    nickname: &'a str,
    description: &'a str,
    supplier: &'a str,
    price: f64,
    size: &'a str,
    unit_cost: String,
    date: chrono::NaiveDate,
}

/// Price guide entries by nickname or description
pub fn lookup(output: &Output, kitchen: &Kitchen, term: &str) -> Result<()> {
    let rows: Vec<LookupRow<'_>> = kitchen
        .lookup(term)
        .into_iter()
        .map(|entry| LookupRow {
            nickname: &entry.nickname,
            description: &entry.description,
            supplier: &entry.supplier,
            price: entry.price,
            size: &entry.size_text,
            unit_cost: entry.unit_cost_label(),
            date: entry.date,
        })
        .collect();

    if output.is_json() {
        output.data(&rows);
    } else if rows.is_empty() {
        println!("No price guide entries match '{}'.", term);
    } else {
        println!(
            "{:<20} {:<30} {:<16} {:>10} {:<12} {:<14} DATE",
            "NICKNAME", "DESCRIPTION", "SUPPLIER", "PRICE", "SIZE", "UNIT COST"
        );
        for row in &rows {
            println!(
                "{:<20} {:<30} {:<16} {:>10} {:<12} {:<14} {}",
                row.nickname,
                row.description,
                row.supplier,
                money(row.price),
                row.size,
                row.unit_cost,
                row.date
            );
        }
    }
    Ok(())
}

/// Parses a conversion target: a quantity (`1 g`) or a bare unit (`g`)
fn parse_target(text: &str) -> Result<Quantity> {
    if let Some(unit) = Unit::from_token(&text.trim().to_lowercase()) {
        return Ok(Quantity::new(1.0, unit));
    }
    text.parse()
        .map_err(|e| anyhow!("Invalid target '{}': {}", text, e))
}

/// Converts a quantity of an ingredient into another unit
pub fn convert(output: &Output, kitchen: &Kitchen, ingredient: &str, from: &str, to: &str) -> Result<()> {
    let from_quantity: Quantity = from
        .parse()
        .map_err(|e| anyhow!("Invalid quantity '{}': {}", from, e))?;
    let target = parse_target(to)?;

    let converted = kitchen
        .convert(ingredient, from_quantity, target)
        .ok_or_else(|| {
            anyhow!(
                "No conversion from {} to {} for '{}'",
                from_quantity,
                target.unit(),
                ingredient
            )
        })?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "ingredient": ingredient,
            "from": from_quantity,
            "to": converted,
        }));
    } else {
        println!("{} = {}", from_quantity, converted);
    }
    Ok(())
}
