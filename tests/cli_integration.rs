//! CLI integration tests for menucost
//!
//! These tests drive the binary against a small bakery project, from
//! initialization through costing, reporting and sheet edits.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the menucost binary
fn menucost_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("menucost"))
}

const GUIDE: &str = "\
supplier,description,number,price,unit,size,brand,order,nickname,note,allergen,conversion,date
Sysco,All purpose flour,1001,$25.00,lb,50 lb,,,flour,,wheat,,2024-01-05
Sysco,Unsalted butter,1002,$4.00,,1 lb,,,butter,,milk,,2024-01-05
Costco,Creamy peanut butter,2001,$12.00,,5 lb,,,peanut butter,,peanut,,2024-02-01
Sysco,Marinara sauce,3001,$2.00,,1 cup,,,sauce,,,,2024-01-05
Sysco,Long grain rice,4001,$30.00,,25 lb,,,rice,,,1 cup per 185 g,2024-01-05
";

const RECIPES: &str = "\
item,ingredient,quantity,cost,conversion,note,menu price
recipe,bread,1 ct,,,,
bread,flour,2 lb,,,,
recipe,dough,1 lb,,,,
dough,flour,12 oz,,,,
dough,butter,4 oz,,,,
recipe,cookie,12 ct,,,,
cookie,dough,2 lb,,,,
cookie,peanut butter,1 lb,,,,
dessert,cookie,3 ct,,,,$4.00
pasta,sauce,2 tbsp,,,,
";

/// Create a temporary directory and initialize a menucost project with sheets
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    menucost_cmd().arg("init").arg(dir.path()).assert().success();
    fs::write(dir.path().join(".menucost/guide.csv"), GUIDE).unwrap();
    fs::write(dir.path().join(".menucost/recipes.csv"), RECIPES).unwrap();
    dir
}

/// Runs a command in `dir` with JSON output and parses stdout
fn json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = menucost_cmd()
        .current_dir(dir)
        .args(args)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "command failed: {:?}", args);
    serde_json::from_slice(&output.stdout).unwrap()
}

fn approx(value: &serde_json::Value, expected: f64) -> bool {
    value
        .as_f64()
        .map(|v| (v - expected).abs() < 1e-6)
        .unwrap_or(false)
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    menucost_cmd()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized menucost project"));

    assert!(dir.path().join(".menucost").is_dir());
    assert!(dir.path().join(".menucost/config.toml").is_file());
    assert!(dir.path().join(".menucost/guide.csv").is_file());
    assert!(dir.path().join(".menucost/recipes.csv").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = setup_project();

    menucost_cmd().arg("init").arg(dir.path()).assert().success();

    // Existing sheets are kept
    let recipes = fs::read_to_string(dir.path().join(".menucost/recipes.csv")).unwrap();
    assert_eq!(recipes, RECIPES);
}

#[test]
fn test_outside_project_fails() {
    let dir = TempDir::new().unwrap();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["menu", "dessert"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in a menucost project"));
}

// =============================================================================
// Costing Tests
// =============================================================================

#[test]
fn test_cost_of_leaf_line() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["cost", "bread", "flour"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$1.00"));
}

#[test]
fn test_cost_scales_small_measures() {
    let dir = setup_project();

    let result = json(dir.path(), &["cost", "pasta", "sauce"]);
    assert!(approx(&result["data"]["cost"], 0.25));
    assert_eq!(result["issues"].as_array().unwrap().len(), 0);
}

#[test]
fn test_cost_of_missing_line_fails() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["cost", "bread", "butter"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bread does not use butter"));
}

#[test]
fn test_recipe_cost() {
    let dir = setup_project();

    let rows = json(dir.path(), &["recipe", "dough"]);
    let rows = rows["data"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["item"], "recipe");
    assert!(approx(&rows[0]["cost"], 1.375));
    assert!(approx(&rows[2]["cost"], 1.0));
}

#[test]
fn test_unknown_recipe_fails() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["recipe", "dessert"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No recipe named 'dessert'"));
}

#[test]
fn test_menu_totals_nested_recipes() {
    let dir = setup_project();

    let result = json(dir.path(), &["menu", "dessert"]);
    // cookie batch: 2 lb dough at 1.375/lb + 1 lb peanut butter at 2.40 = 5.15 per dozen
    assert!(approx(&result["data"]["total"], 5.15 * 3.0 / 12.0));
    assert_eq!(result["data"]["lines"][0]["ingredient"], "cookie");

    menucost_cmd()
        .current_dir(dir.path())
        .args(["menu", "dessert"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$1.29"));
}

#[test]
fn test_report_includes_multiples_and_margin() {
    let dir = setup_project();

    let result = json(dir.path(), &["report", "dessert", "-m", "3"]);
    let rows = result["data"].as_array().unwrap();
    assert_eq!(rows[0]["ingredient"], "cookie");
    assert_eq!(rows[1]["item"], "recipe");
    assert_eq!(rows.len(), 4);

    let cost = 5.15 * 3.0 / 12.0;
    assert!(approx(&rows[0]["multiples"][0]["cost"], cost * 3.0));
    assert!(approx(&rows[0]["difference"], 4.0 - cost * 3.0));
}

#[test]
fn test_report_text_uses_configured_multipliers() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["report", "dessert"])
        .assert()
        .success()
        .stdout(predicate::str::contains("COST 3.0x"))
        .stdout(predicate::str::contains("COST 3.5x"));
}

#[test]
fn test_tree_nests_recipes() {
    let dir = setup_project();

    let tree = json(dir.path(), &["tree", "cookie"]);
    let tree = &tree["data"];
    assert_eq!(tree["ingredient"], "cookie");
    assert_eq!(tree["children"][0]["ingredient"], "dough");
    assert_eq!(tree["children"][0]["children"][1]["ingredient"], "butter");
    assert!(approx(&tree["cost"], 5.15));
}

#[test]
fn test_missing_price_is_reported_not_fatal() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["add", "pasta", "basil", "1 ct"])
        .assert()
        .success();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["menu", "pasta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Issues (1)"))
        .stdout(predicate::str::contains("basil"));

    let result = json(dir.path(), &["menu", "pasta"]);
    assert_eq!(result["issues"][0]["kind"], "unknown_recipe");
}

#[test]
fn test_policy_flag_is_accepted() {
    let dir = setup_project();

    let result = json(dir.path(), &["cost", "bread", "flour", "--policy", "all"]);
    assert!(approx(&result["data"]["cost"], 1.0));

    menucost_cmd()
        .current_dir(dir.path())
        .args(["cost", "bread", "flour", "--policy", "cheapest"])
        .assert()
        .failure();
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_allergens_propagate() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["allergens", "dessert"])
        .assert()
        .success()
        .stdout(predicate::str::contains("milk, peanut, wheat"));

    let result = json(dir.path(), &["allergens", "dough"]);
    assert_eq!(result["allergens"], serde_json::json!(["milk", "wheat"]));
}

#[test]
fn test_flatten_to_base_ingredients() {
    let dir = setup_project();

    let result = json(dir.path(), &["flatten", "cookie", "24 ct"]);
    let rows = result["data"].as_array().unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r["ingredient"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["flour", "butter", "peanut butter"]);
    assert_eq!(rows[0]["quantity"], "48 oz");
}

#[test]
fn test_lookup_by_nickname_and_description() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["lookup", "butter"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unsalted butter"))
        .stdout(predicate::str::contains("$4.00 / lb"));

    let result = json(dir.path(), &["lookup", "GRAIN"]);
    assert_eq!(result[0]["nickname"], "rice");
}

#[test]
fn test_convert_between_dimensions() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["convert", "rice", "2 cup", "g"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 cup = 370 g"));

    menucost_cmd()
        .current_dir(dir.path())
        .args(["convert", "flour", "2 cup", "g"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No conversion"));
}

// =============================================================================
// Editing Tests
// =============================================================================

#[test]
fn test_set_price_propagates_and_saves() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-price", "butter", "$8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entry"));

    let result = json(dir.path(), &["cost", "dessert", "cookie"]);
    // dough doubles its butter: 0.375 + 2.00 per lb
    assert!(approx(&result["data"]["cost"], (4.75 + 2.4) * 3.0 / 12.0));

    let guide = fs::read_to_string(dir.path().join(".menucost/guide.csv")).unwrap();
    assert!(guide.contains(",8,"));
}

#[test]
fn test_set_quantity_and_override() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-quantity", "bread", "flour", "4 lb"])
        .assert()
        .success();
    let result = json(dir.path(), &["cost", "bread", "flour"]);
    assert!(approx(&result["data"]["cost"], 2.0));

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-override", "bread", "flour", "0.5"])
        .assert()
        .success();
    let preferred = json(dir.path(), &["cost", "bread", "flour", "--prefer-override"]);
    assert!(approx(&preferred["data"]["cost"], 0.5));
    let computed = json(dir.path(), &["cost", "bread", "flour"]);
    assert!(approx(&computed["data"]["cost"], 2.0));

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-override", "bread", "flour", "none"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared"));
}

#[test]
fn test_set_size_propagates_and_saves() {
    let dir = setup_project();
    json(dir.path(), &["cost", "dessert", "cookie"]);

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-size", "butter", "2 lb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entry"));

    // dough: 0.375 flour + 0.50 butter per lb
    let result = json(dir.path(), &["cost", "dessert", "cookie"]);
    assert!(approx(&result["data"]["cost"], (1.75 + 2.4) * 3.0 / 12.0));

    let guide = fs::read_to_string(dir.path().join(".menucost/guide.csv")).unwrap();
    assert!(guide.contains(",2 lb,"));

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-size", "salt", "1 lb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No price guide entry for 'salt'"));
}

#[test]
fn test_set_conversion_on_guide_and_line() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["add", "pasta", "rice", "1 cup"])
        .assert()
        .success();
    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-conversion", "rice", "1 cup per 1 lb"])
        .assert()
        .success();
    let result = json(dir.path(), &["cost", "pasta", "rice"]);
    assert!(approx(&result["data"]["cost"], 1.2));

    menucost_cmd()
        .current_dir(dir.path())
        .args(["add", "pasta", "flour", "1 cup"])
        .assert()
        .success();
    let result = json(dir.path(), &["cost", "pasta", "flour"]);
    assert_eq!(result["issues"][0]["kind"], "unresolved_conversion");

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-conversion", "flour", "1 cup per 4 oz", "--item", "pasta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flour in pasta"));
    let result = json(dir.path(), &["cost", "pasta", "flour"]);
    assert!(approx(&result["data"]["cost"], 0.125));

    let recipes = fs::read_to_string(dir.path().join(".menucost/recipes.csv")).unwrap();
    assert!(recipes.contains("pasta,flour,1 cup,,1 cup per 4 oz,,"));

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-conversion", "rice", "about a cup"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid conversion"));
}

#[test]
fn test_set_menu_price_updates_margin() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-menu-price", "dessert", "cookie", "$5"])
        .assert()
        .success();

    let result = json(dir.path(), &["report", "dessert", "-m", "3"]);
    let cost = 5.15 * 3.0 / 12.0;
    assert!(approx(&result["data"][0]["difference"], 5.0 - cost * 3.0));

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-menu-price", "dessert", "cookie", "none"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared menu price"));
    let recipes = fs::read_to_string(dir.path().join(".menucost/recipes.csv")).unwrap();
    assert!(recipes.lines().any(|line| line == "dessert,cookie,3 ct,,,,"));
}

#[test]
fn test_add_and_remove_lines() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["add", "dessert", "bread", "1 ct", "--menu-price", "3.50"])
        .assert()
        .success();

    let recipes = fs::read_to_string(dir.path().join(".menucost/recipes.csv")).unwrap();
    assert!(recipes.contains("dessert,bread,1 ct,,,,3.5"));

    menucost_cmd()
        .current_dir(dir.path())
        .args(["remove", "dessert", "bread"])
        .assert()
        .success();

    let recipes = fs::read_to_string(dir.path().join(".menucost/recipes.csv")).unwrap();
    assert!(!recipes.contains("dessert,bread"));
}

#[test]
fn test_cycle_is_rejected() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["add", "dough", "cookie", "1 ct"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("would create a cycle"));

    // The sheet is unchanged
    let recipes = fs::read_to_string(dir.path().join(".menucost/recipes.csv")).unwrap();
    assert_eq!(recipes, RECIPES);
}

#[test]
fn test_rejected_sheet_line_blocks_edits() {
    let dir = setup_project();
    let broken = format!("{}dough,cookie,1 ct,,,,\n", RECIPES);
    let path = dir.path().join(".menucost/recipes.csv");
    fs::write(&path, &broken).unwrap();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["set-price", "butter", "$8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Rejected line 12"))
        .stderr(predicate::str::contains("would create a cycle"));

    assert_eq!(fs::read_to_string(&path).unwrap(), broken);
}

#[test]
fn test_saved_sheet_is_grouped_by_recipe() {
    let dir = setup_project();

    menucost_cmd()
        .current_dir(dir.path())
        .args(["add", "recipe", "pasta", "1 ct"])
        .assert()
        .success();

    let recipes = fs::read_to_string(dir.path().join(".menucost/recipes.csv")).unwrap();
    let lines: Vec<&str> = recipes.lines().collect();
    assert_eq!(lines[1], "recipe,bread,1 ct,,,,");
    assert_eq!(lines[3], "recipe,cookie,12 ct,,,,");
    assert_eq!(lines[9], "recipe,pasta,1 ct,,,,");
    assert_eq!(lines[10], "pasta,sauce,2 tbsp,,,,");
    assert_eq!(lines[11], "dessert,cookie,3 ct,,,,4");
}
