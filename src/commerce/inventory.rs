//! Products, stock movements and stock adjustments
//!
//! Quantity on hand is never stored: it is the fold of a product's
//! movements in recorded order.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::commerce::documents::*;
use crate::ledger::Ledger;
use crate::numbering::DocumentKind;
use crate::traits::*;
use crate::types::*;
use crate::utils::money;

/// Reference recorded on the movement created for opening stock
pub const OPENING_BALANCE_REFERENCE: &str = "Opening Balance";

/// Opening quantity of a new product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningStock {
    pub quantity: BigDecimal,
    pub date: NaiveDate,
}

/// Manual stock change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: BigDecimal,
    pub unit_cost: BigDecimal,
    pub reason: AdjustmentReason,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub date: NaiveDate,
}

/// Filter for listing stock movements; dates inclusive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &StockMovement) -> bool {
        self.product_id.is_none_or(|id| movement.product_id == id)
            && self.movement_type.is_none_or(|t| movement.movement_type == t)
            && self.start_date.is_none_or(|start| movement.date >= start)
            && self.end_date.is_none_or(|end| movement.date <= end)
    }
}

/// One row of a product's stock history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockHistoryRow {
    pub movement: StockMovement,
    pub quantity_after: BigDecimal,
}

impl AdjustmentReason {
    pub fn label(&self) -> &'static str {
        match self {
            AdjustmentReason::Broken => "Broken / Damaged",
            AdjustmentReason::Lost => "Lost / Missing",
            AdjustmentReason::Expired => "Expired",
            AdjustmentReason::Returned => "Customer Return",
            AdjustmentReason::Correction => "Count Correction",
            AdjustmentReason::Theft => "Theft / Shrinkage",
            AdjustmentReason::Restock => "Restock / Replenish",
            AdjustmentReason::Production => "Used in Production",
            AdjustmentReason::Sample => "Sample / Giveaway",
            AdjustmentReason::Other => "Other",
        }
    }
}

/// A document line that moves stock, paired with its product
#[derive(Debug, Clone)]
pub(crate) struct StockedLine {
    pub item: LineItem,
    pub product: Product,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a product, generating a SKU when none is given and recording
    /// opening stock as an `in` movement
    pub async fn create_product(
        &mut self,
        mut product: Product,
        opening_stock: Option<OpeningStock>,
    ) -> LedgerResult<Product> {
        if !self.config.business_type.tracks_inventory() {
            product.is_service = true;
        }
        validate_product(&product)?;

        if product.sku.as_deref().is_none_or(|sku| sku.trim().is_empty()) {
            let kind = if product.is_service {
                DocumentKind::Service
            } else {
                DocumentKind::Product
            };
            product.sku = Some(self.next_number(kind).await?);
        }
        self.ensure_unique_sku(&product).await?;

        let mut unit = UnitOfWork::new();
        unit.push(Change::SaveProduct(product.clone()));

        if let Some(opening) = opening_stock {
            if opening.quantity < money::zero() {
                return Err(LedgerError::Validation(
                    "Opening stock cannot be negative".to_string(),
                ));
            }
            if !product.is_service && opening.quantity > money::zero() {
                let movement = StockMovement::new(
                    product.id,
                    MovementType::In,
                    opening.quantity,
                    product.cost_price.clone(),
                    opening.date,
                )
                .with_reference(OPENING_BALANCE_REFERENCE);
                unit.push(Change::RecordMovement(movement));
            }
        }

        self.commit(unit).await?;
        tracing::info!(tenant = %self.tenant_id, sku = ?product.sku, "product created");
        Ok(product)
    }

    pub async fn update_product(&mut self, product: &Product) -> LedgerResult<Product> {
        validate_product(product)?;
        let existing = self.get_product_required(product.id).await?;
        self.ensure_unique_sku(product).await?;

        let mut updated = product.clone();
        updated.created_at = existing.created_at;
        if !self.config.business_type.tracks_inventory() {
            updated.is_service = true;
        }
        self.commit(Change::SaveProduct(updated.clone()).into()).await?;
        Ok(updated)
    }

    /// Delete a product that no document or movement references
    pub async fn delete_product(&mut self, product_id: Uuid) -> LedgerResult<()> {
        let product = self.get_product_required(product_id).await?;

        let moved = !self
            .storage
            .list_movements(&self.tenant_id, Some(product_id))
            .await?
            .is_empty();
        let references = |items: &[LineItem]| items.iter().any(|i| i.product_id == Some(product_id));
        let invoiced = self
            .storage
            .list_invoices(&self.tenant_id)
            .await?
            .iter()
            .any(|i| references(&i.items));
        let billed = self
            .storage
            .list_bills(&self.tenant_id)
            .await?
            .iter()
            .any(|b| references(&b.items));

        if moved || invoiced || billed {
            return Err(LedgerError::Validation(format!(
                "Product '{}' has stock history or documents and cannot be deleted",
                product.name
            )));
        }

        self.commit(Change::DeleteProduct(product_id).into()).await?;
        tracing::info!(tenant = %self.tenant_id, product = %product.name, "product deleted");
        Ok(())
    }

    pub async fn get_product(&self, product_id: Uuid) -> LedgerResult<Option<Product>> {
        self.storage.get_product(&self.tenant_id, product_id).await
    }

    pub async fn get_product_required(&self, product_id: Uuid) -> LedgerResult<Product> {
        self.get_product(product_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product", product_id))
    }

    /// Products ordered by name
    pub async fn list_products(&self) -> LedgerResult<Vec<Product>> {
        let mut products = self.storage.list_products(&self.tenant_id).await?;
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    pub async fn quantity_on_hand(&self, product_id: Uuid) -> LedgerResult<BigDecimal> {
        let movements = self
            .storage
            .list_movements(&self.tenant_id, Some(product_id))
            .await?;
        Ok(quantity_on_hand(&movements))
    }

    /// Record a manual stock change. No journal entry is created.
    pub async fn adjust_stock(&mut self, adjustment: StockAdjustment) -> LedgerResult<StockMovement> {
        let product = self.get_product_required(adjustment.product_id).await?;
        if product.is_service || !self.config.business_type.tracks_inventory() {
            return Err(LedgerError::Validation(format!(
                "'{}' is a service and has no stock",
                product.name
            )));
        }

        match adjustment.movement_type {
            MovementType::In | MovementType::Out if adjustment.quantity <= money::zero() => {
                return Err(LedgerError::Validation(
                    "Adjustment quantity must be positive".to_string(),
                ));
            }
            MovementType::Adjustment if adjustment.quantity < money::zero() => {
                return Err(LedgerError::Validation(
                    "Counted quantity cannot be negative".to_string(),
                ));
            }
            _ => {}
        }
        if adjustment.unit_cost < money::zero() {
            return Err(LedgerError::Validation("Unit cost cannot be negative".to_string()));
        }

        let before = self.quantity_on_hand(product.id).await?;
        let label = adjustment.reason.label();
        let reference = adjustment
            .reference
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| format!("Adjustment: {}", label));

        let mut movement = StockMovement::new(
            product.id,
            adjustment.movement_type,
            adjustment.quantity,
            adjustment.unit_cost,
            adjustment.date,
        )
        .with_reference(reference);
        movement.reason = Some(adjustment.reason);
        movement.notes = Some(
            format!("[{}] {}", label, adjustment.notes.unwrap_or_default())
                .trim_end()
                .to_string(),
        );

        self.commit(Change::RecordMovement(movement.clone()).into()).await?;

        tracing::info!(
            tenant = %self.tenant_id,
            product = %product.name,
            before = %before,
            after = %movement.apply_to(before.clone()),
            reason = label,
            "stock adjusted"
        );
        Ok(movement)
    }

    /// Movements matching `filter`, in recorded order
    pub async fn stock_movements(&self, filter: &MovementFilter) -> LedgerResult<Vec<StockMovement>> {
        let movements = self
            .storage
            .list_movements(&self.tenant_id, filter.product_id)
            .await?;
        Ok(movements.into_iter().filter(|m| filter.matches(m)).collect())
    }

    /// Every movement of a product with the quantity after it
    pub async fn product_history(&self, product_id: Uuid) -> LedgerResult<Vec<StockHistoryRow>> {
        self.get_product_required(product_id).await?;
        let movements = self
            .storage
            .list_movements(&self.tenant_id, Some(product_id))
            .await?;

        let mut on_hand = money::zero();
        Ok(movements
            .into_iter()
            .map(|movement| {
                on_hand = movement.apply_to(on_hand.clone());
                StockHistoryRow {
                    quantity_after: on_hand.clone(),
                    movement,
                }
            })
            .collect())
    }

    /// Lines of a document that move stock. Lines without a product,
    /// service products and every line of a service tenant are skipped.
    pub(crate) async fn stocked_lines(&self, items: &[LineItem]) -> LedgerResult<Vec<StockedLine>> {
        let mut lines = Vec::new();
        for item in items {
            let Some(product_id) = item.product_id else {
                continue;
            };
            let product = self.get_product_required(product_id).await?;
            if product.is_service || !self.config.business_type.tracks_inventory() {
                continue;
            }
            lines.push(StockedLine {
                item: item.clone(),
                product,
            });
        }
        Ok(lines)
    }

    /// Products whose requested quantity exceeds what is on hand
    pub(crate) async fn stock_shortages(&self, lines: &[StockedLine]) -> LedgerResult<Vec<StockShortage>> {
        let mut requested: Vec<(Product, BigDecimal)> = Vec::new();
        for line in lines {
            match requested.iter_mut().find(|(p, _)| p.id == line.product.id) {
                Some((_, quantity)) => *quantity += &line.item.quantity,
                None => requested.push((line.product.clone(), line.item.quantity.clone())),
            }
        }

        let mut shortages = Vec::new();
        for (product, quantity) in requested {
            let available = self.quantity_on_hand(product.id).await?;
            if quantity > available {
                shortages.push(StockShortage {
                    product_id: product.id,
                    product_name: product.name,
                    short: &quantity - &available,
                    requested: quantity,
                    available,
                });
            }
        }
        Ok(shortages)
    }

    async fn ensure_unique_sku(&self, product: &Product) -> LedgerResult<()> {
        let Some(sku) = product.sku.as_deref() else {
            return Ok(());
        };
        let clash = self
            .storage
            .list_products(&self.tenant_id)
            .await?
            .iter()
            .any(|p| p.id != product.id && p.sku.as_deref() == Some(sku));
        if clash {
            return Err(LedgerError::Validation(format!("SKU '{}' is already in use", sku)));
        }
        Ok(())
    }
}

/// Stock movement for each stocked line, in line order
pub(crate) fn movements_for(
    lines: &[StockedLine],
    movement_type: MovementType,
    date: NaiveDate,
    reference: &str,
    notes: &str,
    unit_cost: impl Fn(&StockedLine) -> BigDecimal,
) -> Vec<StockMovement> {
    lines
        .iter()
        .map(|line| {
            let mut movement = StockMovement::new(
                line.product.id,
                movement_type,
                line.item.quantity.clone(),
                unit_cost(line),
                date,
            )
            .with_reference(reference);
            movement.notes = Some(notes.to_string());
            movement
        })
        .collect()
}

/// On-hand quantity of every product, keyed by product id
pub(crate) fn quantities_by_product(movements: &[StockMovement]) -> HashMap<Uuid, BigDecimal> {
    let mut quantities: HashMap<Uuid, BigDecimal> = HashMap::new();
    for movement in movements {
        let on_hand = quantities.remove(&movement.product_id).unwrap_or_else(money::zero);
        quantities.insert(movement.product_id, movement.apply_to(on_hand));
    }
    quantities
}

fn validate_product(product: &Product) -> LedgerResult<()> {
    if product.name.trim().is_empty() {
        return Err(LedgerError::Validation("Product name cannot be empty".to_string()));
    }
    if product.selling_price < money::zero() || product.cost_price < money::zero() {
        return Err(LedgerError::Validation(format!(
            "Prices of '{}' cannot be negative",
            product.name
        )));
    }
    if product.reorder_level < money::zero() {
        return Err(LedgerError::Validation(format!(
            "Reorder level of '{}' cannot be negative",
            product.name
        )));
    }
    Ok(())
}
