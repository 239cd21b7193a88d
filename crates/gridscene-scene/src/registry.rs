use std::rc::Rc;

use gridscene_core::Projector;

use crate::layer::LayerHandle;

/// Ordered collection of layers. Membership is by handle identity, so two
/// distinct layers may share an identifier.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: Vec<LayerHandle>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Linear identity scan.
    pub fn contains(&self, layer: &LayerHandle) -> bool {
        self.layers.iter().any(|l| l.ptr_eq(layer))
    }

    /// Append unless this exact layer is already registered. Returns whether it was added.
    pub fn insert(&mut self, layer: LayerHandle) -> bool {
        if self.contains(&layer) {
            return false;
        }
        self.layers.push(layer);
        true
    }

    pub fn remove(&mut self, layer: &LayerHandle) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| !l.ptr_eq(layer));
        self.layers.len() != before
    }

    /// All layers when `filter` is `None` or empty, otherwise those whose id equals it.
    pub fn query_all(&self, filter: Option<&str>) -> Vec<LayerHandle> {
        match filter.filter(|f| !f.is_empty()) {
            None => self.layers.clone(),
            Some(id) => self
                .layers
                .iter()
                .filter(|l| l.borrow().id == id)
                .cloned()
                .collect(),
        }
    }

    pub fn query(&self, filter: Option<&str>) -> Option<LayerHandle> {
        match filter.filter(|f| !f.is_empty()) {
            None => self.layers.first().cloned(),
            Some(id) => self.layers.iter().find(|l| l.borrow().id == id).cloned(),
        }
    }

    /// Projector of the first layer that has loaded content.
    pub fn first_projector(&self) -> Option<Rc<dyn Projector>> {
        self.layers.iter().find_map(|l| l.borrow().projector())
    }

    pub fn first(&self) -> Option<&LayerHandle> {
        self.layers.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerHandle> {
        self.layers.iter()
    }

    /// Remove and return every layer, in order.
    pub fn drain(&mut self) -> Vec<LayerHandle> {
        std::mem::take(&mut self.layers)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
