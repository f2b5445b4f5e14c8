mod body;
mod layer;

pub use body::ObservedBody;
pub use layer::{MetricsLayer, MetricsService};
