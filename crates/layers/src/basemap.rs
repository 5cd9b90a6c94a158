use tracing::warn;

use crate::layer::{Layer, LayerId, LayerKind, LayerStatus};

/// Remote vector-tile style rendered by the host engine. Passive: the layer
/// only records where the style lives and whether it loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct BasemapLayer {
    id: LayerId,
    pub style_url: String,
    pub attribution: String,
    status: LayerStatus,
}

impl BasemapLayer {
    pub const Z_INDEX: i32 = 0;

    pub fn new(id: u64, style_url: impl Into<String>, attribution: impl Into<String>) -> Self {
        Self {
            id: LayerId(id),
            style_url: style_url.into(),
            attribution: attribution.into(),
            status: LayerStatus::Pending,
        }
    }

    pub fn mark_loaded(&mut self) {
        self.status = LayerStatus::Ready;
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(layer = self.id.0, %reason, "basemap style failed to load");
        self.status = LayerStatus::Degraded(reason);
    }
}

impl Layer for BasemapLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Basemap
    }

    fn z_index(&self) -> i32 {
        Self::Z_INDEX
    }

    fn status(&self) -> LayerStatus {
        self.status.clone()
    }
}
