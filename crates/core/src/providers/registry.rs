use super::http_api::HttpApiClient;
use super::traits::CandleProvider;
#[cfg(not(target_arch = "wasm32"))]
use super::yahoo_finance::YahooCandleProvider;

/// Registry of available candle providers.
///
/// Routes requests by timeframe. Providers are kept in registration
/// order, which is also the fallback order.
pub struct CandleProviderRegistry {
    providers: Vec<Box<dyn CandleProvider>>,
}

impl CandleProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Journal backend first, Yahoo Finance as fallback (native only).
    pub fn new_with_defaults(api: &HttpApiClient) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(api.clone()));

        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Ok(yahoo) = YahooCandleProvider::new() {
                registry.register(Box::new(yahoo));
            }
        }

        registry
    }

    /// Provider names in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Register a new candle provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn CandleProvider>) {
        self.providers.push(provider);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Find the first provider that serves the given timeframe.
    pub fn get_provider_for(&self, timeframe: &str) -> Option<&dyn CandleProvider> {
        self.get_providers_for(timeframe).into_iter().next()
    }

    /// All providers serving the timeframe, in priority order.
    pub fn get_providers_for(&self, timeframe: &str) -> Vec<&dyn CandleProvider> {
        let tf = timeframe.to_lowercase();
        self.providers
            .iter()
            .filter(|p| p.supported_timeframes().iter().any(|s| *s == tf))
            .map(|p| p.as_ref())
            .collect()
    }
}

impl Default for CandleProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
