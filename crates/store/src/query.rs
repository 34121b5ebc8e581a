use std::collections::BTreeSet;

use sea_orm::sea_query::Order;
use serde::{Deserialize, Serialize};

use aisthesis_model::EntityProperty;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl From<SortOrder> for Order {
    fn from(value: SortOrder) -> Self {
        match value {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub property: EntityProperty,
    pub order: SortOrder,
}

/// What a caller asked to read: an optional select list (empty means every
/// property) and result ordering. Row mapping consumes this read-only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityQuery {
    pub select: BTreeSet<EntityProperty>,
    pub order_by: Vec<OrderBy>,
}

impl EntityQuery {
    pub fn selecting(properties: impl IntoIterator<Item = EntityProperty>) -> Self {
        Self {
            select: properties.into_iter().collect(),
            order_by: Vec::new(),
        }
    }

    pub fn ordered_by(mut self, property: EntityProperty, order: SortOrder) -> Self {
        self.order_by.push(OrderBy { property, order });
        self
    }

    pub fn wants(&self, property: EntityProperty) -> bool {
        self.select.is_empty() || self.select.contains(&property)
    }
}

#[cfg(test)]
mod tests {
    use super::EntityQuery;
    use aisthesis_model::EntityProperty;

    #[test]
    fn empty_select_means_all() {
        let query = EntityQuery::default();
        assert!(query.wants(EntityProperty::Result));
        let query = EntityQuery::selecting([EntityProperty::Name]);
        assert!(query.wants(EntityProperty::Name));
        assert!(!query.wants(EntityProperty::Result));
    }
}
