//! # Master Sheet Engine
//!
//! The master sheet is the day's load manifest: items down the side,
//! customers (hotels) across the top, quantities in the cells.
//!
//! ## Grid Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 col#1 "OMX"   col#2 "CC"    col#4 "PER"    total       │
//! │  row#1 Tomato       5            2              -            7         │
//! │  row#2 Onion        -           10              3           13         │
//! │  row#3 Ginger     0.5            -              -          0.5         │
//! │                 ───────      ───────        ───────       ──────       │
//! │  column total     5.5           12              3          20.5        │
//! │                                                                         │
//! │  Cells are keyed by (row id, column id), never by position, so         │
//! │  removing col#2 cannot shift PER's quantities into CC's slot.          │
//! │  Ids are never reused within a grid.                                   │
//! │                                                                         │
//! │  Every edit recomputes row totals, column totals and the grand total   │
//! │  before returning.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Saved sheets ([`MasterSheet`]) use positional `headerColumns` /
//! `values` arrays; conversion happens only at that boundary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use ts_rs::TS;

use crate::codes::{column_label_key, CustomerCodes};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{line_amount, Money, Quantity};
use crate::pricing::{PriceLookup, PriceSource};
use crate::types::{
    normalize_key, BillLineDraft, MasterSheet, SheetDraft, SheetRow, SheetRowDraft, Unit,
};
use crate::validation::{validate_name, validate_quantity, validate_sequence_number};

// =============================================================================
// Identifiers
// =============================================================================

/// Stable identity of a grid column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(transparent)]
pub struct ColumnId(u32);

/// Stable identity of a grid row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(transparent)]
pub struct RowId(u32);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column #{}", self.0)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row #{}", self.0)
    }
}

// =============================================================================
// Grid
// =============================================================================

/// A customer column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SheetColumn {
    pub id: ColumnId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
struct GridRow {
    id: RowId,
    item_name: String,
    cells: BTreeMap<ColumnId, Quantity>,
    total: Quantity,
}

/// The in-progress, editable master sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    columns: Vec<SheetColumn>,
    rows: Vec<GridRow>,
    column_totals: HashMap<ColumnId, Quantity>,
    total_qty: Quantity,
    next_id: u32,
}

impl SheetGrid {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// Adds a customer column. Labels are stored uppercased; adding a label
    /// that already exists returns the existing column.
    pub fn add_column(&mut self, label: &str) -> CoreResult<ColumnId> {
        let label = column_label_key(&validate_name("label", label)?);
        if let Some(existing) = self.find_column(&label) {
            return Ok(existing);
        }

        let id = ColumnId(self.allocate_id());
        self.columns.push(SheetColumn { id, label });
        self.recompute();
        Ok(id)
    }

    pub fn rename_column(&mut self, id: ColumnId, label: &str) -> CoreResult<()> {
        let label = column_label_key(&validate_name("label", label)?);
        if let Some(other) = self.find_column(&label).filter(|other| *other != id) {
            return Err(ValidationError::Duplicate {
                field: "label".to_string(),
                value: format!("{} ({})", label, other),
            }
            .into());
        }

        let column = self
            .columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CoreError::ColumnNotFound(id.to_string()))?;
        column.label = label;
        Ok(())
    }

    /// Removes a column and every cell under it.
    pub fn remove_column(&mut self, id: ColumnId) -> CoreResult<SheetColumn> {
        let position = self
            .columns
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CoreError::ColumnNotFound(id.to_string()))?;

        let removed = self.columns.remove(position);
        for row in &mut self.rows {
            row.cells.remove(&id);
        }
        self.recompute();
        Ok(removed)
    }

    /// Finds a column by case-insensitive exact label.
    pub fn find_column(&self, label: &str) -> Option<ColumnId> {
        let key = column_label_key(label);
        self.columns.iter().find(|c| c.label == key).map(|c| c.id)
    }

    pub fn columns(&self) -> &[SheetColumn] {
        &self.columns
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Adds an item row. A name that already exists (any casing) returns the
    /// existing row.
    pub fn add_row(&mut self, item_name: &str) -> CoreResult<RowId> {
        let item_name = validate_name("itemName", item_name)?;
        if let Some(existing) = self.find_row(&item_name) {
            return Ok(existing);
        }

        let id = RowId(self.allocate_id());
        self.rows.push(GridRow {
            id,
            item_name,
            cells: BTreeMap::new(),
            total: Quantity::zero(),
        });
        Ok(id)
    }

    /// Adds several rows, skipping blanks and names already present.
    /// Returns the ids of rows actually created.
    pub fn add_rows<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<RowId> {
        let mut added = Vec::new();
        for name in names {
            let name = name.as_ref();
            if name.trim().is_empty() || self.find_row(name).is_some() {
                continue;
            }
            if let Ok(id) = self.add_row(name) {
                added.push(id);
            }
        }
        added
    }

    pub fn rename_row(&mut self, id: RowId, item_name: &str) -> CoreResult<()> {
        let item_name = validate_name("itemName", item_name)?;
        if let Some(other) = self.find_row(&item_name).filter(|other| *other != id) {
            return Err(ValidationError::Duplicate {
                field: "itemName".to_string(),
                value: format!("{} ({})", item_name, other),
            }
            .into());
        }

        let row = self.row_mut(id)?;
        row.item_name = item_name;
        Ok(())
    }

    pub fn remove_row(&mut self, id: RowId) -> CoreResult<String> {
        let position = self
            .rows
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CoreError::RowNotFound(id.to_string()))?;

        let removed = self.rows.remove(position);
        self.recompute();
        Ok(removed.item_name)
    }

    /// Finds a row by case-insensitive item name.
    pub fn find_row(&self, item_name: &str) -> Option<RowId> {
        let key = normalize_key(item_name);
        self.rows
            .iter()
            .find(|r| normalize_key(&r.item_name) == key)
            .map(|r| r.id)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_mut(&mut self, id: RowId) -> CoreResult<&mut GridRow> {
        self.rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::RowNotFound(id.to_string()))
    }

    fn row(&self, id: RowId) -> CoreResult<&GridRow> {
        self.rows
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::RowNotFound(id.to_string()))
    }

    // =========================================================================
    // Cells
    // =========================================================================

    /// Sets one cell. Zero clears it.
    pub fn set_cell(&mut self, row: RowId, column: ColumnId, qty: Quantity) -> CoreResult<()> {
        validate_quantity("qty", qty)?;
        if !self.columns.iter().any(|c| c.id == column) {
            return Err(CoreError::ColumnNotFound(column.to_string()));
        }

        let row = self.row_mut(row)?;
        if qty.is_zero() {
            row.cells.remove(&column);
        } else {
            row.cells.insert(column, qty);
        }
        self.recompute();
        Ok(())
    }

    /// Sets the quantity of `item_name` for the column labelled
    /// `column_label`, adding the item row if it is missing.
    ///
    /// This is the entry point for spoken edits ("tomato five for omx").
    pub fn set_quantity(
        &mut self,
        item_name: &str,
        column_label: &str,
        qty: Quantity,
    ) -> CoreResult<RowId> {
        validate_quantity("qty", qty)?;
        let column = self
            .find_column(column_label)
            .ok_or_else(|| CoreError::ColumnNotFound(column_label.trim().to_string()))?;
        let row = self.add_row(item_name)?;
        self.set_cell(row, column, qty)?;
        Ok(row)
    }

    /// Zeroes every cell, keeping rows and columns.
    pub fn clear_quantities(&mut self) {
        for row in &mut self.rows {
            row.cells.clear();
        }
        self.recompute();
    }

    pub fn cell(&self, row: RowId, column: ColumnId) -> Quantity {
        self.row(row)
            .ok()
            .and_then(|r| r.cells.get(&column).copied())
            .unwrap_or_default()
    }

    // =========================================================================
    // Totals
    // =========================================================================

    fn recompute(&mut self) {
        let mut column_totals: HashMap<ColumnId, Quantity> = HashMap::new();
        for row in &mut self.rows {
            row.total = row.cells.values().sum();
            for (column, qty) in &row.cells {
                *column_totals.entry(*column).or_default() += *qty;
            }
        }
        self.total_qty = self.rows.iter().map(|r| r.total).sum();
        self.column_totals = column_totals;
    }

    pub fn row_total(&self, row: RowId) -> Quantity {
        self.row(row).map(|r| r.total).unwrap_or_default()
    }

    pub fn column_total(&self, column: ColumnId) -> Quantity {
        self.column_totals.get(&column).copied().unwrap_or_default()
    }

    pub fn total_qty(&self) -> Quantity {
        self.total_qty
    }

    // =========================================================================
    // Edit Commands
    // =========================================================================

    /// Applies one edit command.
    pub fn apply(&mut self, edit: SheetEdit) -> CoreResult<()> {
        match edit {
            SheetEdit::AddColumn { label } => self.add_column(&label).map(|_| ()),
            SheetEdit::RenameColumn { column, label } => self.rename_column(column, &label),
            SheetEdit::RemoveColumn { column } => self.remove_column(column).map(|_| ()),
            SheetEdit::AddRows { names } => {
                self.add_rows(&names);
                Ok(())
            }
            SheetEdit::RenameRow { row, name } => self.rename_row(row, &name),
            SheetEdit::RemoveRow { row } => self.remove_row(row).map(|_| ()),
            SheetEdit::SetCell { row, column, qty } => self.set_cell(row, column, qty),
            SheetEdit::SetQuantity { item, column, qty } => {
                self.set_quantity(&item, &column, qty).map(|_| ())
            }
            SheetEdit::ClearQuantities => {
                self.clear_quantities();
                Ok(())
            }
        }
    }

    // =========================================================================
    // Positional Boundary
    // =========================================================================

    /// Rebuilds an editable grid from a saved sheet.
    pub fn from_sheet(sheet: &MasterSheet) -> Self {
        let rows: Vec<(&str, &[Quantity])> = sheet
            .data_rows
            .iter()
            .map(|r| (r.item_name.as_str(), r.values.as_slice()))
            .collect();
        Self::from_positional(&sheet.header_columns, &rows)
    }

    /// Rebuilds a grid from positional columns and rows.
    ///
    /// Columns are taken exactly as given (no de-duplication) so positions
    /// keep their meaning. Values beyond the header count are ignored.
    pub fn from_positional(headers: &[String], rows: &[(&str, &[Quantity])]) -> Self {
        let mut grid = SheetGrid::new();

        let column_ids: Vec<ColumnId> = headers
            .iter()
            .map(|label| {
                let id = ColumnId(grid.allocate_id());
                grid.columns.push(SheetColumn {
                    id,
                    label: column_label_key(label),
                });
                id
            })
            .collect();

        for (item_name, values) in rows {
            let id = RowId(grid.allocate_id());
            let cells = column_ids
                .iter()
                .zip(values.iter())
                .filter(|(_, qty)| qty.is_positive())
                .map(|(column, qty)| (*column, *qty))
                .collect();
            grid.rows.push(GridRow {
                id,
                item_name: item_name.trim().to_string(),
                cells,
                total: Quantity::zero(),
            });
        }

        grid.recompute();
        grid
    }

    /// Flattens the grid into the positional shape used by saved sheets.
    pub fn to_positional(&self) -> (Vec<String>, Vec<SheetRow>) {
        let headers = self.columns.iter().map(|c| c.label.clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| SheetRow {
                item_name: row.item_name.clone(),
                values: self
                    .columns
                    .iter()
                    .map(|c| row.cells.get(&c.id).copied().unwrap_or_default())
                    .collect(),
                total: row.total,
            })
            .collect();
        (headers, rows)
    }

    /// Builds a save request from the current grid.
    pub fn to_draft(&self, date: NaiveDate, vehicle_no: &str) -> SheetDraft {
        let (header_columns, rows) = self.to_positional();
        SheetDraft {
            sheet_no: None,
            date,
            vehicle_no: vehicle_no.trim().to_string(),
            header_columns,
            data_rows: rows
                .into_iter()
                .map(|r| SheetRowDraft {
                    item_name: r.item_name,
                    values: r.values,
                })
                .collect(),
        }
    }

    /// Presentation view: ordered columns, rows with aligned values, totals.
    pub fn view(&self) -> SheetGridView {
        let (_, positional) = self.to_positional();
        SheetGridView {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .zip(positional)
                .map(|(row, flat)| SheetGridRowView {
                    id: row.id,
                    item_name: flat.item_name,
                    values: flat.values,
                    total: flat.total,
                })
                .collect(),
            column_totals: self
                .columns
                .iter()
                .map(|c| self.column_total(c.id))
                .collect(),
            total_qty: self.total_qty,
        }
    }

    // =========================================================================
    // Projection
    // =========================================================================

    /// Projects one customer's column into draft bill lines.
    ///
    /// ## Algorithm
    /// ```text
    /// customer "Omex"
    ///     │
    ///     ├─ candidates: OMEX, OMX ──► first label with a column wins
    ///     │                            (none → no lines)
    ///     ▼
    /// for each row with qty > 0 in that column:
    ///     price = prices.resolve(row.item_name, customer)
    ///     line  = { name, qty, price.rate, price.unit, amount }
    /// ```
    ///
    /// Rows with zero in that column are left out: zero means "not loaded
    /// for this customer today".
    pub fn project_for_customer(
        &self,
        customer_label: &str,
        codes: &CustomerCodes,
        prices: &impl PriceLookup,
    ) -> Vec<ProjectedLine> {
        let Some(column) = codes
            .candidates(customer_label)
            .iter()
            .find_map(|candidate| self.find_column(candidate))
        else {
            return Vec::new();
        };

        // Overrides are keyed by full customer name; a bare code resolves to it.
        let customer_name = codes.name_for(customer_label).unwrap_or(customer_label);

        self.rows
            .iter()
            .filter_map(|row| {
                let qty = row.cells.get(&column).copied()?;
                if !qty.is_positive() {
                    return None;
                }
                let price = prices.resolve(&row.item_name, Some(customer_name));
                Some(ProjectedLine {
                    name: row.item_name.clone(),
                    amount: line_amount(qty, price.rate, &price.unit),
                    unit: price.unit,
                    qty,
                    rate: price.rate,
                    source: price.source,
                })
            })
            .collect()
    }
}

// =============================================================================
// Views and Commands
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SheetGridRowView {
    pub id: RowId,
    pub item_name: String,

    #[ts(type = "Array<number>")]
    pub values: Vec<Quantity>,

    #[ts(type = "number")]
    pub total: Quantity,
}

/// What clients render for the in-progress sheet.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SheetGridView {
    pub columns: Vec<SheetColumn>,
    pub rows: Vec<SheetGridRowView>,

    #[ts(type = "Array<number>")]
    pub column_totals: Vec<Quantity>,

    #[ts(type = "number")]
    pub total_qty: Quantity,
}

/// A single edit to the in-progress sheet. Manual edits and parsed voice
/// commands both arrive in this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum SheetEdit {
    AddColumn {
        label: String,
    },
    RenameColumn {
        column: ColumnId,
        label: String,
    },
    RemoveColumn {
        column: ColumnId,
    },
    AddRows {
        names: Vec<String>,
    },
    RenameRow {
        row: RowId,
        name: String,
    },
    RemoveRow {
        row: RowId,
    },
    SetCell {
        row: RowId,
        column: ColumnId,
        #[ts(type = "number")]
        qty: Quantity,
    },
    SetQuantity {
        item: String,
        column: String,
        #[ts(type = "number")]
        qty: Quantity,
    },
    ClearQuantities,
}

/// A draft bill line derived from a master sheet column.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ProjectedLine {
    pub name: String,

    #[ts(type = "string")]
    pub unit: Unit,

    #[ts(type = "number")]
    pub qty: Quantity,

    #[ts(type = "number")]
    pub rate: Money,

    #[ts(type = "number")]
    pub amount: Money,

    pub source: PriceSource,
}

impl From<ProjectedLine> for BillLineDraft {
    fn from(line: ProjectedLine) -> Self {
        BillLineDraft {
            name: line.name,
            unit: line.unit,
            qty: line.qty,
            rate: line.rate,
        }
    }
}

// =============================================================================
// Saving
// =============================================================================

/// Validates a sheet draft and produces the saved record with recomputed
/// totals.
///
/// ## Rules
/// - `headerColumns` labels are non-empty (stored trimmed, casing kept;
///   lookups compare through [`column_label_key`])
/// - every row has a non-empty item name
/// - every row has exactly one value per header column
/// - no value is negative
pub fn finalize_sheet(
    draft: SheetDraft,
    sheet_no: i64,
    id: String,
    created_at: DateTime<Utc>,
) -> Result<MasterSheet, ValidationError> {
    validate_sequence_number("sheetNo", sheet_no)?;

    let header_columns = draft
        .header_columns
        .iter()
        .enumerate()
        .map(|(i, label)| {
            validate_name(&format!("headerColumns[{}]", i), label)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut data_rows = Vec::with_capacity(draft.data_rows.len());
    for (i, row) in draft.data_rows.into_iter().enumerate() {
        let item_name = validate_name(&format!("dataRows[{}].itemName", i), &row.item_name)?;
        if row.values.len() != header_columns.len() {
            return Err(ValidationError::LengthMismatch {
                field: format!("dataRows[{}].values", i),
                expected: header_columns.len(),
                actual: row.values.len(),
            });
        }
        for (j, qty) in row.values.iter().enumerate() {
            validate_quantity(&format!("dataRows[{}].values[{}]", i, j), *qty)?;
        }
        let total = row.values.iter().sum();
        data_rows.push(SheetRow {
            item_name,
            values: row.values,
            total,
        });
    }

    let total_qty = data_rows.iter().map(|r| r.total).sum();

    Ok(MasterSheet {
        id,
        sheet_no,
        date: draft.date,
        vehicle_no: draft.vehicle_no.trim().to_string(),
        header_columns,
        data_rows,
        total_qty,
        created_at,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PriceBook;
    use crate::types::{normalize_key, CustomerPriceOverride, Item};

    fn qty(units: i64) -> Quantity {
        Quantity::from_whole(units)
    }

    /// OMX / CC / PER grid from the module docs.
    fn sample_grid() -> (SheetGrid, [ColumnId; 3], [RowId; 3]) {
        let mut grid = SheetGrid::new();
        let omx = grid.add_column("OMX").unwrap();
        let cc = grid.add_column("cc").unwrap();
        let per = grid.add_column("Per").unwrap();
        let tomato = grid.add_row("Tomato").unwrap();
        let onion = grid.add_row("Onion").unwrap();
        let ginger = grid.add_row("Ginger").unwrap();

        grid.set_cell(tomato, omx, qty(5)).unwrap();
        grid.set_cell(tomato, cc, qty(2)).unwrap();
        grid.set_cell(onion, cc, qty(10)).unwrap();
        grid.set_cell(onion, per, qty(3)).unwrap();
        grid.set_cell(ginger, omx, Quantity::from_milli(500)).unwrap();

        (grid, [omx, cc, per], [tomato, onion, ginger])
    }

    fn catalog_item(name: &str, unit: Unit, rupees: i64) -> Item {
        Item {
            id: format!("item-{name}"),
            name: name.to_string(),
            unit,
            default_rate: Money::from_rupees(rupees),
            updated_at: Utc::now(),
        }
    }

    fn price_override(customer: &str, item: &str, unit: Unit, rupees: i64) -> CustomerPriceOverride {
        CustomerPriceOverride {
            id: format!("ovr-{customer}-{item}"),
            customer_name: normalize_key(customer),
            item_name: normalize_key(item),
            unit,
            rate: Money::from_rupees(rupees),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_totals_recompute_on_every_edit() {
        let (mut grid, [omx, cc, per], [tomato, onion, _]) = sample_grid();

        assert_eq!(grid.row_total(tomato), qty(7));
        assert_eq!(grid.row_total(onion), qty(13));
        assert_eq!(grid.column_total(omx), Quantity::from_milli(5_500));
        assert_eq!(grid.column_total(cc), qty(12));
        assert_eq!(grid.column_total(per), qty(3));
        assert_eq!(grid.total_qty(), Quantity::from_milli(20_500));

        grid.set_cell(tomato, omx, qty(8)).unwrap();
        assert_eq!(grid.row_total(tomato), qty(10));
        assert_eq!(grid.total_qty(), Quantity::from_milli(23_500));

        grid.set_cell(tomato, omx, Quantity::zero()).unwrap();
        assert_eq!(grid.cell(tomato, omx), Quantity::zero());
        assert_eq!(grid.row_total(tomato), qty(2));
    }

    #[test]
    fn test_remove_column_drops_exactly_that_slot() {
        let (mut grid, [_, cc, _], _) = sample_grid();
        let (_, before) = grid.to_positional();
        assert_eq!(before[1].values, vec![qty(0), qty(10), qty(3)]);

        let removed = grid.remove_column(cc).unwrap();
        assert_eq!(removed.label, "CC");

        let (headers, rows) = grid.to_positional();
        assert_eq!(headers, vec!["OMX", "PER"]);
        // Tomato [5, 2, 0] → [5, 0]; Onion [0, 10, 3] → [0, 3]; Ginger [0.5, 0, 0] → [0.5, 0]
        assert_eq!(rows[0].values, vec![qty(5), qty(0)]);
        assert_eq!(rows[1].values, vec![qty(0), qty(3)]);
        assert_eq!(rows[2].values, vec![Quantity::from_milli(500), qty(0)]);
        for row in &rows {
            assert_eq!(row.total, row.values.iter().sum::<Quantity>());
        }
        assert_eq!(grid.total_qty(), Quantity::from_milli(8_500));

        assert!(matches!(
            grid.remove_column(cc),
            Err(CoreError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_labels_and_names_are_not_added_twice() {
        let mut grid = SheetGrid::new();
        let a = grid.add_column("omx").unwrap();
        let b = grid.add_column(" OMX ").unwrap();
        assert_eq!(a, b);
        assert_eq!(grid.columns().len(), 1);

        let added = grid.add_rows(&["Tomato", "tomato", "", "Onion"]);
        assert_eq!(added.len(), 2);
        assert_eq!(grid.row_count(), 2);
    }

    #[test]
    fn test_rename_rejects_collisions() {
        let (mut grid, [omx, cc, _], [tomato, onion, _]) = sample_grid();
        assert!(grid.rename_column(cc, "omx").is_err());
        grid.rename_column(omx, "Omex").unwrap();
        assert_eq!(grid.find_column("OMEX"), Some(omx));

        assert!(grid.rename_row(onion, "TOMATO").is_err());
        grid.rename_row(tomato, "Cherry Tomato").unwrap();
        assert_eq!(grid.find_row("cherry tomato"), Some(tomato));
    }

    #[test]
    fn test_set_quantity_adds_missing_row() {
        let (mut grid, [_, _, per], _) = sample_grid();
        let row = grid.set_quantity("Lemon", "per", qty(4)).unwrap();
        assert_eq!(grid.cell(row, per), qty(4));
        assert_eq!(grid.row_count(), 4);

        assert!(matches!(
            grid.set_quantity("Lemon", "Nowhere", qty(1)),
            Err(CoreError::ColumnNotFound(_))
        ));
        assert!(grid.set_quantity("Lemon", "PER", Quantity::from_milli(-1)).is_err());
    }

    #[test]
    fn test_clear_quantities_keeps_layout() {
        let (mut grid, _, _) = sample_grid();
        grid.clear_quantities();
        assert_eq!(grid.total_qty(), Quantity::zero());
        assert_eq!(grid.columns().len(), 3);
        assert_eq!(grid.row_count(), 3);
    }

    #[test]
    fn test_apply_tagged_edits() {
        let mut grid = SheetGrid::new();
        let edits: Vec<SheetEdit> = serde_json::from_str(
            r#"[
                {"op": "addColumn", "label": "OMX"},
                {"op": "addRows", "names": ["Tomato", "Onion"]},
                {"op": "setQuantity", "item": "Tomato", "column": "omx", "qty": 3},
                {"op": "setQuantity", "item": "Beans", "column": "OMX", "qty": "1.5"}
            ]"#,
        )
        .unwrap();
        for edit in edits {
            grid.apply(edit).unwrap();
        }

        let view = grid.view();
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.column_totals, vec![Quantity::from_milli(4_500)]);
        assert_eq!(view.total_qty, Quantity::from_milli(4_500));
    }

    #[test]
    fn test_projection_uses_resolver_and_skips_zero_rows() {
        let (grid, _, _) = sample_grid();
        let prices = PriceBook::new(
            vec![
                catalog_item("Tomato", Unit::Kg, 20),
                catalog_item("Ginger", Unit::Gm, 120),
            ],
            vec![price_override("Omex", "Tomato", Unit::Kg, 25)],
        );

        let lines = grid.project_for_customer("Omex", &CustomerCodes::default(), &prices);

        // Onion has nothing under OMX and is excluded.
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].name, "Tomato");
        assert_eq!(lines[0].rate, Money::from_rupees(25));
        assert_eq!(lines[0].source, PriceSource::Override);
        assert_eq!(lines[0].amount, Money::from_rupees(125));

        // Ginger 0.5 in a gram unit at ₹120/kg
        assert_eq!(lines[1].unit, Unit::Gm);
        assert_eq!(lines[1].amount, Money::from_paise(6));
    }

    #[test]
    fn test_projection_sum_matches_direct_computation() {
        let (grid, [_, cc, _], rows) = sample_grid();
        let prices = PriceBook::new(
            vec![
                catalog_item("Tomato", Unit::Kg, 20),
                catalog_item("Onion", Unit::Kg, 30),
                catalog_item("Ginger", Unit::Gm, 120),
            ],
            vec![price_override("Carnatic Cafe", "Onion", Unit::Kg, 28)],
        );

        let lines = grid.project_for_customer("Carnatic Cafe", &CustomerCodes::default(), &prices);
        let projected: Money = lines.iter().map(|l| l.amount).sum();

        let direct: Money = rows
            .iter()
            .filter(|row| grid.cell(**row, cc).is_positive())
            .map(|row| {
                let name = &grid.row(*row).unwrap().item_name;
                let price = prices.resolve(name, Some("Carnatic Cafe"));
                line_amount(grid.cell(*row, cc), price.rate, &price.unit)
            })
            .sum();

        assert_eq!(projected, direct);
        // Tomato 2 × 20 + Onion 10 × 28
        assert_eq!(projected, Money::from_rupees(320));
    }

    #[test]
    fn test_projection_without_matching_column_is_empty() {
        let (grid, _, _) = sample_grid();
        let lines = grid.project_for_customer("Manam", &CustomerCodes::default(), &PriceBook::default());
        assert!(lines.is_empty());
    }

    #[test]
    fn test_projection_accepts_code_as_customer() {
        let (grid, _, _) = sample_grid();
        let prices = PriceBook::new(vec![], vec![price_override("Perch", "Onion", Unit::Kg, 33)]);
        let lines = grid.project_for_customer("per", &CustomerCodes::default(), &prices);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].rate, Money::from_rupees(33));
    }

    #[test]
    fn test_positional_roundtrip_through_saved_sheet() {
        let (grid, _, _) = sample_grid();
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let draft = grid.to_draft(date, " KA-01-1234 ");
        let sheet = finalize_sheet(draft, 4, "sheet-1".to_string(), Utc::now()).unwrap();

        assert_eq!(sheet.vehicle_no, "KA-01-1234");
        assert_eq!(sheet.total_qty, grid.total_qty());

        let rebuilt = SheetGrid::from_sheet(&sheet);
        assert_eq!(rebuilt.view().rows.len(), 3);
        assert_eq!(rebuilt.total_qty(), grid.total_qty());
        assert_eq!(rebuilt.to_positional().1, sheet.data_rows);
    }

    #[test]
    fn test_finalize_sheet_rejects_misaligned_rows() {
        let draft = SheetDraft {
            sheet_no: None,
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            vehicle_no: String::new(),
            header_columns: vec!["OMX".to_string(), "CC".to_string()],
            data_rows: vec![SheetRowDraft {
                item_name: "Tomato".to_string(),
                values: vec![qty(1)],
            }],
        };
        assert!(matches!(
            finalize_sheet(draft, 1, "s".to_string(), Utc::now()),
            Err(ValidationError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_finalize_sheet_recomputes_totals() {
        let draft = SheetDraft {
            sheet_no: Some(1),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            vehicle_no: "TN-09".to_string(),
            header_columns: vec!["omx".to_string(), "cc".to_string()],
            data_rows: vec![
                SheetRowDraft {
                    item_name: "Tomato".to_string(),
                    values: vec![qty(1), qty(2)],
                },
                SheetRowDraft {
                    item_name: "Onion".to_string(),
                    values: vec![qty(0), qty(4)],
                },
            ],
        };
        let sheet = finalize_sheet(draft, 1, "s".to_string(), Utc::now()).unwrap();
        assert_eq!(sheet.header_columns, vec!["omx", "cc"]);
        assert_eq!(sheet.data_rows[0].total, qty(3));
        assert_eq!(sheet.total_qty, qty(7));
    }

    #[test]
    fn test_finalize_sheet_keeps_header_casing() {
        let draft = SheetDraft {
            sheet_no: Some(1),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            vehicle_no: String::new(),
            header_columns: vec![" Omx ".to_string(), "Carnatic Cafe".to_string()],
            data_rows: vec![SheetRowDraft {
                item_name: "Tomato".to_string(),
                values: vec![qty(5), qty(2)],
            }],
        };
        let sheet = finalize_sheet(draft, 1, "s".to_string(), Utc::now()).unwrap();
        assert_eq!(sheet.header_columns, vec!["Omx", "Carnatic Cafe"]);

        // Matching still ignores case
        let grid = SheetGrid::from_sheet(&sheet);
        let omx = grid.find_column("OMX").unwrap();
        assert_eq!(grid.find_column("omx"), Some(omx));
        assert!(grid.find_column("CARNATIC CAFE").is_some());
    }
}
