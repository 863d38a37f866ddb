pub mod config;
pub mod placeholder;
pub mod playback;
pub mod requests;
pub mod resolver;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use playback::{PlaybackController, PlaybackEvent, PlaybackState, PlaybackStatus};
pub use requests::{AnnotationsRequest, LiveMetricsRequest, TimeSeriesRequest, YearImageRequest};
pub use resolver::{DataResolver, DatasetRequest, ProviderDeclined, ResolvedDataset, Tier};
pub use session::{DashboardSession, DashboardView, LoadStatus};
