use std::sync::Arc;

use order_flow::OrderEngine;

use crate::catalog::Catalog;

/// Fallbacks for fields a request leaves out
#[derive(Debug, Clone, Default)]
pub struct OrderDefaults {
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone)]
pub struct ServeState {
    pub(crate) engine: OrderEngine,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) defaults: Arc<OrderDefaults>,
}

impl ServeState {
    pub fn new(engine: OrderEngine, catalog: Catalog, defaults: OrderDefaults) -> Self {
        Self {
            engine,
            catalog: Arc::new(catalog),
            defaults: Arc::new(defaults),
        }
    }

    pub fn engine(&self) -> &OrderEngine {
        &self.engine
    }

    /// Request value, else the configured default; blank counts as missing.
    pub(crate) fn phone_or_default(&self, requested: Option<String>) -> Option<String> {
        pick(requested, self.defaults.phone_number.as_ref())
    }

    pub(crate) fn address_or_default(&self, requested: Option<String>) -> Option<String> {
        pick(requested, self.defaults.address.as_ref())
    }
}

fn pick(requested: Option<String>, fallback: Option<&String>) -> Option<String> {
    requested
        .filter(|value| !value.trim().is_empty())
        .or_else(|| fallback.cloned())
        .filter(|value| !value.trim().is_empty())
}
