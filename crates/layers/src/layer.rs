#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Basemap,
    FeatureOverlay,
    SearchMarkers,
}

/// Load state of a layer backed by a remote resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LayerStatus {
    #[default]
    Pending,
    Ready,
    /// The layer renders empty; the reason is kept for diagnostics.
    Degraded(String),
}

impl LayerStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, LayerStatus::Degraded(_))
    }
}

pub trait Layer {
    fn id(&self) -> LayerId;

    fn kind(&self) -> LayerKind;

    /// Stacking order; higher draws on top.
    fn z_index(&self) -> i32;

    fn status(&self) -> LayerStatus {
        LayerStatus::Ready
    }
}
