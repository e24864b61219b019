//! Commands that change the sheets (add, remove, set-price, set-size,
//! set-conversion, set-quantity, set-override, set-menu-price)

use anyhow::{anyhow, Result};
use clap::Args;

use super::output::{money, Output};
use crate::domain::{parse_conversion_ratios, Kitchen, RecipeEdge};
use crate::storage::{parse_number, Project};

/// Optional cells of a new recipe line
#[derive(Args, Debug, Default)]
pub struct LineFields {
    /// Entered cost for the line
    #[arg(long)]
    pub cost: Option<f64>,

    /// Conversion ratios, e.g. "1 cup per 240 g"
    #[arg(long)]
    pub conversion: Option<String>,

    /// Free-form note
    #[arg(long)]
    pub note: Option<String>,

    /// Selling price of the line
    #[arg(long)]
    pub menu_price: Option<f64>,
}

/// Adds a recipe line (use `recipe` as the item for a recipe header)
pub fn add(
    output: &Output,
    project: &Project,
    kitchen: &mut Kitchen,
    item: &str,
    ingredient: &str,
    quantity: &str,
    fields: LineFields,
) -> Result<()> {
    let mut edge = RecipeEdge::new(item, ingredient, quantity);
    edge.override_cost = fields.cost;
    edge.conversion = fields.conversion;
    edge.note = fields.note.unwrap_or_default();
    edge.menu_price = fields.menu_price;

    kitchen.add_ingredient(edge)?;
    project.save(kitchen)?;
    output.success(&format!("Added {} {} to {}", quantity, ingredient, item));
    Ok(())
}

/// Removes a recipe line
pub fn remove(output: &Output, project: &Project, kitchen: &mut Kitchen, item: &str, ingredient: &str) -> Result<()> {
    kitchen.remove_ingredient(item, ingredient)?;
    project.save(kitchen)?;
    output.success(&format!("Removed {} from {}", ingredient, item));
    Ok(())
}

/// Sets the price of every guide entry for a nickname
pub fn set_price(output: &Output, project: &Project, kitchen: &mut Kitchen, nickname: &str, price: &str) -> Result<()> {
    let price = parse_number(price).ok_or_else(|| anyhow!("Invalid price '{}'", price))?;
    let changed = kitchen.set_price(nickname, price)?;
    project.save(kitchen)?;
    output.success(&format!("Set {} to {} ({})", nickname, money(price), entries(changed)));
    Ok(())
}

/// Sets the pack size of every guide entry for a nickname
pub fn set_size(output: &Output, project: &Project, kitchen: &mut Kitchen, nickname: &str, size: &str) -> Result<()> {
    let changed = kitchen.set_size(nickname, size)?;
    project.save(kitchen)?;
    output.success(&format!("Set {} size to {} ({})", nickname, size, entries(changed)));
    Ok(())
}

/// Sets or clears (`none`) conversion ratios
///
/// With `item`, the ratios go on that recipe line; otherwise on every
/// guide entry of `name`.
pub fn set_conversion(
    output: &Output,
    project: &Project,
    kitchen: &mut Kitchen,
    name: &str,
    conversion: &str,
    item: Option<&str>,
) -> Result<()> {
    let conversion = none_or(conversion);
    if let Some(ratio) = conversion.filter(|c| parse_conversion_ratios(c).is_empty()) {
        return Err(anyhow!("Invalid conversion '{}', expected e.g. \"1 cup per 240 g\"", ratio));
    }

    let target = match item {
        Some(item) => {
            kitchen.set_edge_conversion(item, name, conversion)?;
            format!("{} in {}", name, item)
        }
        None => {
            let changed = kitchen.set_conversion(name, conversion)?;
            format!("{} ({})", name, entries(changed))
        }
    };
    project.save(kitchen)?;
    match conversion {
        Some(conversion) => output.success(&format!("Set conversion of {} to {}", target, conversion)),
        None => output.success(&format!("Cleared conversion of {}", target)),
    }
    Ok(())
}

/// Changes the quantity of a recipe line
pub fn set_quantity(
    output: &Output,
    project: &Project,
    kitchen: &mut Kitchen,
    item: &str,
    ingredient: &str,
    quantity: &str,
) -> Result<()> {
    kitchen.set_quantity(item, ingredient, quantity)?;
    project.save(kitchen)?;
    output.success(&format!("Set {} in {} to {}", ingredient, item, quantity));
    Ok(())
}

/// Sets or clears (`none`) the entered cost of a recipe line
pub fn set_override(
    output: &Output,
    project: &Project,
    kitchen: &mut Kitchen,
    item: &str,
    ingredient: &str,
    cost: &str,
) -> Result<()> {
    let cost = none_or(cost)
        .map(|c| parse_number(c).ok_or_else(|| anyhow!("Invalid cost '{}'", c)))
        .transpose()?;

    kitchen.set_override(item, ingredient, cost)?;
    project.save(kitchen)?;
    match cost {
        Some(cost) => output.success(&format!("Set cost of {} in {} to {}", ingredient, item, money(cost))),
        None => output.success(&format!("Cleared cost of {} in {}", ingredient, item)),
    }
    Ok(())
}

/// Sets or clears (`none`) the selling price of a recipe line
pub fn set_menu_price(
    output: &Output,
    project: &Project,
    kitchen: &mut Kitchen,
    item: &str,
    ingredient: &str,
    price: &str,
) -> Result<()> {
    let price = none_or(price)
        .map(|p| parse_number(p).ok_or_else(|| anyhow!("Invalid price '{}'", p)))
        .transpose()?;

    kitchen.set_menu_price(item, ingredient, price)?;
    project.save(kitchen)?;
    match price {
        Some(price) => output.success(&format!("Set menu price of {} in {} to {}", ingredient, item, money(price))),
        None => output.success(&format!("Cleared menu price of {} in {}", ingredient, item)),
    }
    Ok(())
}

/// `None` for the literal `none`, else the trimmed cell
fn none_or(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.eq_ignore_ascii_case("none")).then_some(value)
}

fn entries(count: usize) -> String {
    format!("{} entr{}", count, if count == 1 { "y" } else { "ies" })
}
