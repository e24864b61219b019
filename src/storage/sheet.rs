//! CSV storage for the price guide and recipe sheets
//!
//! The guide lives in `.menucost/guide.csv` and the recipe graph in
//! `.menucost/recipes.csv`. Columns are matched by header name, so their
//! order is free. Writes take an exclusive lock and go through a temp
//! file plus rename.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use fs2::FileExt;
use thiserror::Error;

use crate::domain::{
    default_price_date, PriceCatalog, PriceEntry, Quantity, RecipeEdge, RecipeGraph, RECIPE_HEADER,
};

pub const GUIDE_COLUMNS: [&str; 13] = [
    "supplier",
    "description",
    "number",
    "price",
    "unit",
    "size",
    "brand",
    "order",
    "nickname",
    "note",
    "allergen",
    "conversion",
    "date",
];

pub const RECIPE_COLUMNS: [&str; 7] = [
    "item",
    "ingredient",
    "quantity",
    "cost",
    "conversion",
    "note",
    "menu price",
];

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("{sheet} is missing the '{column}' column")]
    MissingColumn { sheet: String, column: String },
}

/// Header-name lookup for one sheet
struct Columns(HashMap<String, usize>);

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name.trim().to_lowercase(), i))
                .collect(),
        )
    }

    fn require(&self, sheet: &Path, names: &[&str]) -> Result<(), SheetError> {
        match names.iter().find(|name| !self.0.contains_key(**name)) {
            Some(missing) => Err(SheetError::MissingColumn {
                sheet: sheet.display().to_string(),
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.0
            .get(name)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .unwrap_or("")
    }

    /// True when `record` just repeats the header names
    fn is_header_echo(&self, record: &StringRecord) -> bool {
        !self.0.is_empty()
            && self
                .0
                .iter()
                .all(|(name, &i)| record.get(i).map(|c| c.trim().to_lowercase()).as_deref() == Some(name.as_str()))
    }
}

/// Parses a money or number cell, tolerating `$` and thousands separators
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses the date forms price guides tend to use
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m/%d/%y", "%m-%d-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(cell, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(cell).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            // "2024-03-05 00:00:00" and similar timestamp cells
            cell.split_whitespace()
                .next()
                .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        })
}

fn optional(cell: &str) -> Option<String> {
    (!cell.is_empty()).then(|| cell.to_string())
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Store for the two sheets of a project
pub struct SheetStore {
    guide: PathBuf,
    recipes: PathBuf,
    default_date: NaiveDate,
}

impl SheetStore {
    /// Creates a store over the given sheet paths
    pub fn new(guide: impl Into<PathBuf>, recipes: impl Into<PathBuf>) -> Self {
        Self {
            guide: guide.into(),
            recipes: recipes.into(),
            default_date: default_price_date(),
        }
    }

    /// Date given to guide rows whose date cell is empty or unreadable
    pub fn with_default_date(mut self, date: NaiveDate) -> Self {
        self.default_date = date;
        self
    }

    pub fn guide_path(&self) -> &Path {
        &self.guide
    }

    pub fn recipes_path(&self) -> &Path {
        &self.recipes
    }

    /// Reads the price guide; a missing file is an empty guide
    pub fn read_guide(&self) -> Result<PriceCatalog> {
        let mut catalog = PriceCatalog::new();
        let Some(file) = open_locked(&self.guide)? else {
            return Ok(catalog);
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(&file);
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", self.guide.display()))?
            .clone();
        let columns = Columns::new(&headers);
        columns.require(&self.guide, &["nickname", "price", "size"])?;

        for (line_num, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("Failed to parse line {} of {}", line_num + 2, self.guide.display())
            })?;
            if line_num == 0 && columns.is_header_echo(&record) {
                continue;
            }
            let nickname = columns.get(&record, "nickname");
            if nickname.is_empty() {
                continue;
            }

            let price_cell = columns.get(&record, "price");
            let price = parse_number(price_cell).unwrap_or_else(|| {
                tracing::warn!(nickname, price = price_cell, "unreadable price, using 0");
                0.0
            });
            let date_cell = columns.get(&record, "date");
            let date = parse_date(date_cell).unwrap_or_else(|| {
                if !date_cell.is_empty() {
                    tracing::debug!(nickname, date = date_cell, "unreadable date, using default");
                }
                self.default_date
            });
            let size_text = columns.get(&record, "size");

            catalog.insert(PriceEntry {
                nickname: nickname.to_string(),
                description: columns.get(&record, "description").to_string(),
                supplier: columns.get(&record, "supplier").to_string(),
                number: columns.get(&record, "number").to_string(),
                price,
                unit: columns.get(&record, "unit").to_string(),
                size: Quantity::parse_size(size_text),
                size_text: size_text.to_string(),
                brand: columns.get(&record, "brand").to_string(),
                order: parse_number(columns.get(&record, "order")),
                note: columns.get(&record, "note").to_string(),
                allergen: columns.get(&record, "allergen").to_string(),
                conversion: optional(columns.get(&record, "conversion")),
                date,
            });
        }

        tracing::debug!(entries = catalog.len(), path = %self.guide.display(), "loaded price guide");
        Ok(catalog)
    }

    /// Reads the recipe sheet
    ///
    /// A line the graph rejects (a repeated line, a self reference or a
    /// cycle) fails the whole read, naming the line, so a later save never
    /// drops it. Repeated recipe headers are kept with a warning.
    pub fn read_recipes(&self) -> Result<RecipeGraph> {
        let mut graph = RecipeGraph::new();
        let Some(file) = open_locked(&self.recipes)? else {
            return Ok(graph);
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(&file);
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", self.recipes.display()))?
            .clone();
        let columns = Columns::new(&headers);
        columns.require(&self.recipes, &["item", "ingredient", "quantity"])?;

        for (line_num, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("Failed to parse line {} of {}", line_num + 2, self.recipes.display())
            })?;
            if line_num == 0 && columns.is_header_echo(&record) {
                continue;
            }
            let item = columns.get(&record, "item");
            let ingredient = columns.get(&record, "ingredient");
            if item.is_empty() || ingredient.is_empty() {
                continue;
            }

            let mut edge = RecipeEdge::new(item, ingredient, columns.get(&record, "quantity"));
            edge.override_cost = parse_number(columns.get(&record, "cost"));
            edge.conversion = optional(columns.get(&record, "conversion"));
            edge.note = columns.get(&record, "note").to_string();
            edge.menu_price = parse_number(columns.get(&record, "menu price"));

            let repeated_header = edge.is_header() && graph.header(ingredient).is_some();
            graph.add_edge(edge).with_context(|| {
                format!(
                    "Rejected line {} of {} ({} uses {})",
                    line_num + 2,
                    self.recipes.display(),
                    item,
                    ingredient
                )
            })?;
            if repeated_header {
                tracing::warn!(
                    line = line_num + 2,
                    recipe = ingredient,
                    "duplicate recipe header, the first one is used"
                );
            }
        }

        tracing::debug!(edges = graph.len(), path = %self.recipes.display(), "loaded recipes");
        Ok(graph)
    }

    /// Writes the price guide in catalog order
    pub fn write_guide(&self, catalog: &PriceCatalog) -> Result<()> {
        write_atomic(&self.guide, |writer| {
            writer.write_record(GUIDE_COLUMNS)?;
            for entry in catalog.entries() {
                writer.write_record([
                    entry.supplier.as_str(),
                    entry.description.as_str(),
                    entry.number.as_str(),
                    entry.price.to_string().as_str(),
                    entry.unit.as_str(),
                    entry.size_text.as_str(),
                    entry.brand.as_str(),
                    format_optional(entry.order).as_str(),
                    entry.nickname.as_str(),
                    entry.note.as_str(),
                    entry.allergen.as_str(),
                    entry.conversion.as_deref().unwrap_or(""),
                    entry.date.format("%Y-%m-%d").to_string().as_str(),
                ])?;
            }
            Ok(())
        })
    }

    /// Writes the recipe sheet grouped by recipe
    ///
    /// Recipes come in name order, each header followed by its lines;
    /// lines of items without a header follow in insertion order. The
    /// cost column carries the entered override only.
    pub fn write_recipes(&self, graph: &RecipeGraph) -> Result<()> {
        write_atomic(&self.recipes, |writer| {
            writer.write_record(RECIPE_COLUMNS)?;
            for edge in sheet_order(graph) {
                writer.write_record([
                    edge.parent.as_str(),
                    edge.child.as_str(),
                    edge.quantity_text.as_str(),
                    format_optional(edge.override_cost).as_str(),
                    edge.conversion.as_deref().unwrap_or(""),
                    edge.note.as_str(),
                    format_optional(edge.menu_price).as_str(),
                ])?;
            }
            Ok(())
        })
    }
}

/// Edges in the order the recipe sheet lists them
fn sheet_order(graph: &RecipeGraph) -> Vec<&RecipeEdge> {
    let rank: HashMap<String, usize> = graph
        .recipes()
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    let mut edges = graph.edges();
    // Stable sort keeps insertion order within a group
    edges.sort_by_key(|edge| {
        if edge.parent == RECIPE_HEADER {
            (rank.get(&edge.child).copied().unwrap_or(usize::MAX), 0)
        } else {
            (rank.get(&edge.parent).copied().unwrap_or(usize::MAX), 1)
        }
    });
    edges
}

/// Opens `path` with a shared lock, or `None` if it doesn't exist
fn open_locked(path: &Path) -> Result<Option<File>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).with_context(|| format!("Failed to open sheet: {}", path.display()))?;
    file.lock_shared()
        .with_context(|| format!("Failed to acquire read lock on {}", path.display()))?;
    Ok(Some(file))
}

/// Writes a sheet to a temp file under an exclusive lock, then renames it in place
fn write_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<BufWriter<&File>>) -> csv::Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_path = path.with_extension("csv.tmp");
    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to acquire write lock on {}", temp_path.display()))?;

        let mut writer = WriterBuilder::new().from_writer(BufWriter::new(&file));
        fill(&mut writer).with_context(|| format!("Failed to write sheet: {}", path.display()))?;
        let mut inner = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush sheet {}: {}", path.display(), e.error()))?;
        inner.flush().context("Failed to flush sheet")?;
    }

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> SheetStore {
        SheetStore::new(dir.path().join("guide.csv"), dir.path().join("recipes.csv"))
    }

    #[test]
    fn missing_sheets_are_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.read_guide().unwrap().is_empty());
        assert!(store.read_recipes().unwrap().is_empty());
    }

    #[test]
    fn reads_guide_by_header_name() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(
            store.guide_path(),
            "nickname,price,size,unit,date,allergen,order\n\
             nickname,price,size,unit,date,allergen,order\n\
             flour , $25.00 , 50 lb ,lb,3/15/2024,wheat,\n\
             butter,\"$1,200\",36 lb,,not a date,milk,2\n\
             ,9.99,1 ct,,,,\n",
        )
        .unwrap();

        let catalog = store.read_guide().unwrap();
        assert_eq!(catalog.len(), 2);

        let flour = catalog.entries_for("flour")[0];
        assert_eq!(flour.price, 25.0);
        assert_eq!(flour.size_text, "50 lb");
        assert_eq!(flour.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(flour.order, None);

        let butter = catalog.entries_for("butter")[0];
        assert_eq!(butter.price, 1200.0);
        assert_eq!(butter.date, default_price_date());
        assert_eq!(butter.order, Some(2.0));
    }

    #[test]
    fn default_date_is_configurable() {
        let dir = TempDir::new().unwrap();
        let day = NaiveDate::from_ymd_opt(2022, 7, 4).unwrap();
        let store = store(&dir).with_default_date(day);
        fs::write(store.guide_path(), "nickname,price,size\nsalt,2,1 lb\n").unwrap();
        assert_eq!(store.read_guide().unwrap().entries()[0].date, day);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.recipes_path(), "item,quantity\nsoup,1 qt\n").unwrap();

        let err = store.read_recipes().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SheetError>(),
            Some(SheetError::MissingColumn { column, .. }) if column == "ingredient"
        ));
    }

    #[test]
    fn recipe_cost_column_is_an_override() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(
            store.recipes_path(),
            "item,ingredient,quantity,cost,conversion,note,menu price\n\
             recipe,soup,1 qt,,1 cup per 240 g,,\n\
             soup,stock,3 cup,$1.50,,house,\n\
             lunch,soup,1 cup,,,,$8\n",
        )
        .unwrap();

        let graph = store.read_recipes().unwrap();
        assert_eq!(graph.len(), 3);

        let stock = graph.edge("soup", "stock").unwrap();
        assert_eq!(stock.override_cost, Some(1.5));
        assert_eq!(stock.cost, 0.0);
        assert_eq!(stock.note, "house");
        assert_eq!(graph.header("soup").unwrap().conversion.as_deref(), Some("1 cup per 240 g"));
        assert_eq!(graph.edge("lunch", "soup").unwrap().menu_price, Some(8.0));
    }

    #[test]
    fn rejected_lines_fail_the_read() {
        use crate::domain::GraphError;

        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let header = "item,ingredient,quantity,cost,conversion,note,menu price\n\
                      recipe,soup,1 qt,,,,\n\
                      soup,stock,3 cup,,,,\n";

        for (extra, line, expected) in [
            (
                "soup,stock,1 cup,,,garnish,\n",
                4,
                GraphError::DuplicateEdge("soup".to_string(), "stock".to_string()),
            ),
            (
                "stock,soup,1 cup,,,,\n",
                4,
                GraphError::CycleDetected("stock".to_string(), "soup".to_string()),
            ),
        ] {
            let sheet = format!("{}{}", header, extra);
            fs::write(store.recipes_path(), &sheet).unwrap();

            let err = store.read_recipes().unwrap_err();
            assert_eq!(err.downcast_ref::<GraphError>(), Some(&expected));
            assert!(err.to_string().contains(&format!("line {}", line)));

            // Nothing was loaded, so nothing can be written back over the sheet
            assert_eq!(fs::read_to_string(store.recipes_path()).unwrap(), sheet);
        }
    }

    #[test]
    fn repeated_header_is_kept_on_save() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(
            store.recipes_path(),
            "item,ingredient,quantity,cost,conversion,note,menu price\n\
             recipe,soup,1 qt,,,,\n\
             recipe,soup,2 qt,,,,\n\
             soup,stock,3 cup,,,,\n",
        )
        .unwrap();

        let graph = store.read_recipes().unwrap();
        assert_eq!(graph.header_count("soup"), 2);
        assert_eq!(graph.header("soup").unwrap().quantity_text, "1 qt");

        store.write_recipes(&graph).unwrap();
        let written = fs::read_to_string(store.recipes_path()).unwrap();
        assert_eq!(written.lines().count(), 4);
        assert!(written.contains("recipe,soup,2 qt,,,,"));
    }

    #[test]
    fn writes_recipes_grouped_by_recipe() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut graph = RecipeGraph::new();
        for edge in [
            RecipeEdge::new("lunch", "soup", "1 cup").with_menu_price(8.0),
            RecipeEdge::new("soup", "stock", "3 cup").with_override(1.5),
            RecipeEdge::new("bread", "flour", "1 lb"),
            RecipeEdge::header("soup", "1 qt"),
            RecipeEdge::header("bread", "1 ct"),
        ] {
            graph.add_edge(edge).unwrap();
        }
        graph.set_cost("soup", "stock", 9.0);

        store.write_recipes(&graph).unwrap();
        let written = fs::read_to_string(store.recipes_path()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines,
            vec![
                "item,ingredient,quantity,cost,conversion,note,menu price",
                "recipe,bread,1 ct,,,,",
                "bread,flour,1 lb,,,,",
                "recipe,soup,1 qt,,,,",
                "soup,stock,3 cup,1.5,,,",
                "lunch,soup,1 cup,,,,8",
            ]
        );
        assert!(!store.recipes_path().with_extension("csv.tmp").exists());
    }

    #[test]
    fn guide_survives_write_and_read() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let catalog = PriceCatalog::from_entries([
            PriceEntry::new("rice", 30.0, "25 lb")
                .with_conversion("1 cup per 185 g")
                .with_allergen("none")
                .with_order(3.0),
        ]);

        store.write_guide(&catalog).unwrap();
        let loaded = store.read_guide().unwrap();
        assert_eq!(loaded.entries(), catalog.entries());
    }

    #[test]
    fn parses_common_date_forms() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_date("2024-03-05"), Some(day));
        assert_eq!(parse_date("3/5/2024"), Some(day));
        assert_eq!(parse_date("2024/3/5"), Some(day));
        assert_eq!(parse_date("2024-03-05T10:00:00Z"), Some(day));
        assert_eq!(parse_date("2024-03-05 00:00:00"), Some(day));
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn parses_money_cells() {
        assert_eq!(parse_number("$12.50"), Some(12.5));
        assert_eq!(parse_number(" 1,000 "), Some(1000.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
    }
}
