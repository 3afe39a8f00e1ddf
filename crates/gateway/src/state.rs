use crate::fetch::ImageFetcher;
use crate::metrics::GatewayMetrics;
use inference::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub fetcher: ImageFetcher,
    pub metrics: GatewayMetrics,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, fetcher: ImageFetcher) -> Self {
        Self {
            dispatcher,
            fetcher,
            metrics: GatewayMetrics::new("gateway"),
        }
    }
}
