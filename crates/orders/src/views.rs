//! Read models with catalog names resolved for display.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use common::{ColorId, OrderId, ProductId, SizeId, UserId};
use domain::{Money, Order, OrderItem, OrderStatus, ShippingInfo};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use store::CatalogReader;

use crate::error::Result;

/// An order line as shown to readers.
///
/// Names are `None` when the catalog no longer knows the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemView {
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub size_id: SizeId,
    pub size_name: Option<String>,
    pub color_id: ColorId,
    pub color_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
    pub stock_before_purchase: u32,
    pub stock_at_purchase: u32,
}

/// An order as shown to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItemView>,
    pub total: Money,
    pub tracking_number: Option<String>,
    pub shipping_company: Option<String>,
    pub admin_comment: Option<String>,
    pub shipping_info: Option<ShippingInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog names looked up once for a batch of orders.
#[derive(Debug, Default)]
struct Names {
    products: HashMap<ProductId, String>,
    sizes: HashMap<SizeId, String>,
    colors: HashMap<ColorId, String>,
}

impl Names {
    async fn resolve<C: CatalogReader>(catalog: &C, orders: &[Order]) -> Result<Self> {
        let items = || orders.iter().flat_map(|order| order.items());
        let product_ids: BTreeSet<&ProductId> = items().map(|i| &i.product_id).collect();
        let size_ids: BTreeSet<&SizeId> = items().map(|i| &i.size_id).collect();
        let color_ids: BTreeSet<&ColorId> = items().map(|i| &i.color_id).collect();

        let products = try_join_all(product_ids.into_iter().map(|id| async move {
            let name = catalog.get_product(id).await?.map(|p| p.name);
            Ok::<_, store::StoreError>((id.clone(), name))
        }))
        .await?;
        let sizes = try_join_all(size_ids.into_iter().map(|id| async move {
            Ok::<_, store::StoreError>((id.clone(), catalog.size_name(id).await?))
        }))
        .await?;
        let colors = try_join_all(color_ids.into_iter().map(|id| async move {
            Ok::<_, store::StoreError>((id.clone(), catalog.color_name(id).await?))
        }))
        .await?;

        Ok(Self {
            products: known(products),
            sizes: known(sizes),
            colors: known(colors),
        })
    }

    fn item_view(&self, item: &OrderItem) -> OrderItemView {
        OrderItemView {
            product_name: self.products.get(&item.product_id).cloned(),
            size_name: self.sizes.get(&item.size_id).cloned(),
            color_name: self.colors.get(&item.color_id).cloned(),
            product_id: item.product_id.clone(),
            size_id: item.size_id.clone(),
            color_id: item.color_id.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total(),
            stock_before_purchase: item.stock_before_purchase,
            stock_at_purchase: item.stock_at_purchase,
        }
    }

    fn order_view(&self, order: &Order) -> OrderView {
        OrderView {
            order_id: order.id(),
            user_id: order.user_id(),
            status: order.status(),
            items: order.items().iter().map(|item| self.item_view(item)).collect(),
            total: order.total(),
            tracking_number: order.tracking_number().map(str::to_string),
            shipping_company: order.shipping_company().map(str::to_string),
            admin_comment: order.admin_comment().map(str::to_string),
            shipping_info: order.shipping_info().cloned(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

fn known<K: std::hash::Hash + Eq>(pairs: Vec<(K, Option<String>)>) -> HashMap<K, String> {
    pairs
        .into_iter()
        .filter_map(|(id, name)| name.map(|name| (id, name)))
        .collect()
}

/// Builds display views for a batch of orders, looking each catalog
/// reference up once.
pub async fn build_views<C: CatalogReader>(catalog: &C, orders: &[Order]) -> Result<Vec<OrderView>> {
    let names = Names::resolve(catalog, orders).await?;
    Ok(orders.iter().map(|order| names.order_view(order)).collect())
}

/// Builds the display view of one order.
pub async fn build_view<C: CatalogReader>(catalog: &C, order: &Order) -> Result<OrderView> {
    let names = Names::resolve(catalog, std::slice::from_ref(order)).await?;
    Ok(names.order_view(order))
}
