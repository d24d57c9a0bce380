//! Prompts for the loading-plan model.
//!
//! The prompt is the whole placement algorithm: everything the model knows
//! about trailers, pallets and clearances is written here.

use db::models::{
    loading_plan::{OptimizationResult, TruckPlan},
    order_data::LineItem,
};

use super::loading_optimizer::TruckBatch;

/// Interior of a standard 53' dry van, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruckDimensions {
    pub length: u32,
    pub width: u32,
    pub height_nose: u32,
    pub height_rear: u32,
    pub height_door_opening: u32,
}

pub const TRUCK_DIMENSIONS: TruckDimensions = TruckDimensions {
    length: 631,
    width: 100,
    height_nose: 100,
    height_rear: 112,
    height_door_opening: 111,
};

/// System instruction plus user prompt for one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingPrompt {
    pub system: String,
    pub user: String,
}

const TRUCK_SCHEMA: &str = r#"{
  "truckNumber": number,
  "loadingPlan": "Specific description of overall strategy",
  "sequence": [
    "1. Load Item #10202638 (2 pallets) at 0-4 feet from front, left side",
    "2. Load Item #10195770 (2 pallets) at 0-4 feet from front, right side"
  ],
  "itemPlacements": [
    {
      "itemNumber": "10202638",
      "palletCount": 2,
      "distanceFromFront": "0-4 feet",
      "side": "left",
      "stacked": false
    }
  ],
  "specialNotes": "Include specific height clearances and weight distribution notes",
  "spaceUtilization": "Percentage",
  "heightClearance": "Specific measurements at different points"
}"#;

const BASE_SYSTEM: &str = "You are a logistics expert. Provide responses in pure JSON format only.";
const ESCAPE_RULE: &str = "Each string should be properly escaped.";

fn plan_schema() -> String {
    let indented = TRUCK_SCHEMA.replace('\n', "\n    ");
    format!("{{\n  \"trucks\": [\n    {}\n  ]\n}}", indented)
}

fn truck_dimensions_block() -> String {
    let d = TRUCK_DIMENSIONS;
    format!(
        "Standard Truck Dimensions:
- Interior Length: {}'{}\" ({} inches)
- Interior Width: {} inches (fits 2 standard pallets side by side with proper spacing)
- Interior Height: {} inches at nose, {} inches at rear, {} inches door opening",
        d.length / 12,
        d.length % 12,
        d.length,
        d.width,
        d.height_nose,
        d.height_rear,
        d.height_door_opening
    )
}

fn loading_rules(allow_stacking: Option<bool>) -> String {
    let stacking_rule = match allow_stacking {
        Some(true) => "Pallets may be stacked if needed",
        Some(false) => "NO STACKING ALLOWED - All pallets must be placed directly on the floor",
        None => "Keep the stacking policy of the current plan unless the feedback changes it",
    };

    format!(
        "CRITICAL LOADING RULES:
1. Standard pallet size is 48\" x 40\" (width x depth)
2. Minimum 2\" gap between pallets and walls
3. Minimum 4\" gap between side-by-side pallets for forklift access
4. Load pallets in pairs (left and right) when possible
5. {}
6. Cardboard boxes may compress - ensure stable loading
7. Start loading from the front wall of the trailer
8. Leave minimum 6\" between rows of pallets for forklift access",
        stacking_rule
    )
}

fn dimension(value: Option<f64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn line_item_block(item: &LineItem) -> String {
    format!(
        "- Item #{}:
  * Quantity: {} boxes
  * Box Dimensions: {}″ x {}″ x {}″
  * Total Pallets: {}
  * Boxes per pallet: {}
  * Overhang: {}
  * Overhang both sides: {}
  * One side overhang: {}″
  * Other side overhang: {}″",
        item.item,
        item.quantity_ordered,
        dimension(item.length),
        dimension(item.width),
        dimension(item.height),
        item.total_pallets,
        item.qty_per_pallet,
        item.overhang,
        item.overhang_both_sides,
        item.one_side_overhang,
        item.other_side_overhang
    )
}

fn line_items_block(line_items: &[LineItem]) -> String {
    line_items
        .iter()
        .map(line_item_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Prompt for one batch of trucks.
pub fn batch_prompt(
    batch: &TruckBatch,
    line_items: &[LineItem],
    allow_stacking: bool,
) -> LoadingPrompt {
    let stacking = if allow_stacking {
        "ALLOWED"
    } else {
        "STRICTLY PROHIBITED - DO NOT STACK ANY PALLETS"
    };

    let user = format!(
        "As a logistics expert specializing in cardboard box shipments, optimize the loading of {} truck(s) (trucks {} to {}). IMPORTANT: Stacking is {}.

{}

{}

Items to load (all are palletized cardboard boxes):
{}

Format the response as JSON with the following structure:
{}",
        batch.truck_count(),
        batch.first_truck,
        batch.last_truck,
        stacking,
        truck_dimensions_block(),
        loading_rules(Some(allow_stacking)),
        line_items_block(line_items),
        plan_schema()
    );

    let stacking_system = if allow_stacking {
        "Stacking is allowed when appropriate."
    } else {
        "NEVER suggest stacking pallets - all pallets must be placed directly on the floor."
    };

    LoadingPrompt {
        system: format!("{} {} {}", BASE_SYSTEM, stacking_system, ESCAPE_RULE),
        user,
    }
}

/// Prompt asking for a replacement plan for a single truck.
pub fn truck_regeneration_prompt(
    truck_index: usize,
    current: &TruckPlan,
    feedback: &str,
    line_items: &[LineItem],
) -> LoadingPrompt {
    let truck_number = truck_index + 1;
    let user = format!(
        "You are a logistics expert. I need you to regenerate the loading instructions for truck {} based on this feedback: \"{}\"

Current plan for truck {}:
{}

{}

{}

Items on the order (all are palletized cardboard boxes):
{}

Respond with a single JSON object for truck {} using this structure:
{}",
        truck_number,
        feedback,
        truck_number,
        pretty_json(current),
        truck_dimensions_block(),
        loading_rules(None),
        line_items_block(line_items),
        truck_number,
        TRUCK_SCHEMA
    );

    LoadingPrompt {
        system: format!("{} {}", BASE_SYSTEM, ESCAPE_RULE),
        user,
    }
}

/// Prompt asking for a replacement of the complete plan.
pub fn full_regeneration_prompt(
    current: &OptimizationResult,
    feedback: &str,
    line_items: &[LineItem],
) -> LoadingPrompt {
    let user = format!(
        "You are a logistics expert. I need you to regenerate the complete loading instructions for all trucks based on this feedback: \"{}\"

Current plan ({} truck(s)):
{}

{}

{}

Items on the order (all are palletized cardboard boxes):
{}

Format the response as JSON with the following structure:
{}",
        feedback,
        current.trucks.len(),
        pretty_json(&current.trucks),
        truck_dimensions_block(),
        loading_rules(None),
        line_items_block(line_items),
        plan_schema()
    );

    LoadingPrompt {
        system: format!("{} {}", BASE_SYSTEM, ESCAPE_RULE),
        user,
    }
}
