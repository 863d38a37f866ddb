pub mod annotation;
pub mod chart;
pub mod colors;
pub mod instruments;
pub mod layers;
pub mod metrics;
pub mod normalize;
pub mod region;
pub mod series;

pub use annotation::{Annotation, AnnotationIndex, AnnotationKind, Impact};
pub use chart::{ChannelSummary, Correlation, Trend, correlate, trend, trends};
pub use colors::ColorScale;
pub use instruments::InstrumentSelection;
pub use layers::{ImageryLayer, LayerKind, LayerSpec, LayerToggles, derive_layers};
pub use metrics::NasaData;
pub use region::{Region, TimeRange};
pub use series::TimeDataPoint;
