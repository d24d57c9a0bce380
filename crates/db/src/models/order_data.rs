//! OCR payload stored in `orders.raw_ocr_data` and the edit buffer used to
//! change its line items.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumString};
use thiserror::Error;

use super::lenient;

/// Pallets needed for `quantity_ordered` boxes at `qty_per_pallet` per
/// pallet. Zero when the per-pallet quantity is unknown.
pub fn total_pallets(quantity_ordered: u32, qty_per_pallet: u32) -> u32 {
    if qty_per_pallet > 0 {
        quantity_ordered.div_ceil(qty_per_pallet)
    } else {
        0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHeader {
    #[serde(default, deserialize_with = "lenient::text")]
    pub order_number: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub ack_date: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub po_number: String,
}

/// One purchase-order line as extracted by OCR.
///
/// `total_pallets` is derived; use [`LineItem::recompute_total_pallets`]
/// after touching either quantity. Fields OCR sends that are not modelled
/// here (e.g. `amount`) are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient::text")]
    pub item: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub quantity_ordered: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_pallets: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub qty_per_pallet: u32,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub length: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub width: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub overhang: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub overhang_both_sides: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub one_side_overhang: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub other_side_overhang: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LineItem {
    pub fn recompute_total_pallets(&mut self) {
        self.total_pallets = total_pallets(self.quantity_ordered, self.qty_per_pallet);
    }

    /// OCR reads currency lines ("Currency: USD") as items.
    pub fn is_currency_artifact(&self) -> bool {
        self.item.to_lowercase().contains("currency:")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    #[serde(default)]
    pub order_header: OrderHeader,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OrderData {
    pub fn with_recomputed_pallets(mut self) -> Self {
        self.line_items
            .iter_mut()
            .for_each(LineItem::recompute_total_pallets);
        self
    }

    /// Copy of the data with OCR currency lines removed.
    pub fn without_currency_items(&self) -> Self {
        Self {
            order_header: self.order_header.clone(),
            line_items: self
                .line_items
                .iter()
                .filter(|item| !item.is_currency_artifact())
                .cloned()
                .collect(),
            extra: self.extra.clone(),
        }
    }
}

/// Editable line-item columns, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "camelCase")]
pub enum LineItemField {
    Item,
    QuantityOrdered,
    TotalPallets,
    QtyPerPallet,
    Overhang,
    OverhangBothSides,
    OneSideOverhang,
    OtherSideOverhang,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("line item {index} does not exist ({len} items)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("{0} is derived and cannot be edited")]
    ReadOnlyField(LineItemField),
}

/// Edit buffer over an [`OrderData`]: edits go to a working copy, which is
/// either committed or thrown away.
#[derive(Debug, Clone)]
pub struct LineItemDraft {
    original: OrderData,
    edited: OrderData,
}

impl LineItemDraft {
    pub fn new(data: OrderData) -> Self {
        Self {
            edited: data.clone(),
            original: data,
        }
    }

    pub fn edited(&self) -> &OrderData {
        &self.edited
    }

    pub fn is_dirty(&self) -> bool {
        self.original != self.edited
    }

    pub fn set_field(
        &mut self,
        index: usize,
        field: LineItemField,
        value: &str,
    ) -> Result<(), DraftError> {
        let len = self.edited.line_items.len();
        let item = self
            .edited
            .line_items
            .get_mut(index)
            .ok_or(DraftError::IndexOutOfRange { index, len })?;

        match field {
            LineItemField::Item => item.item = value.to_string(),
            LineItemField::QuantityOrdered => {
                item.quantity_ordered = lenient::parse_int_or_zero(value);
                item.recompute_total_pallets();
            }
            LineItemField::QtyPerPallet => {
                item.qty_per_pallet = lenient::parse_int_or_zero(value);
                item.recompute_total_pallets();
            }
            LineItemField::Overhang => item.overhang = value.to_string(),
            LineItemField::OverhangBothSides => item.overhang_both_sides = value.to_string(),
            LineItemField::OneSideOverhang => item.one_side_overhang = value.to_string(),
            LineItemField::OtherSideOverhang => item.other_side_overhang = value.to_string(),
            LineItemField::TotalPallets => return Err(DraftError::ReadOnlyField(field)),
        }
        Ok(())
    }

    pub fn commit(self) -> OrderData {
        self.edited
    }

    pub fn discard(self) -> OrderData {
        self.original
    }
}
