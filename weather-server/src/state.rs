use std::{sync::Arc, time::Instant};

use weather_core::WeatherService;

pub struct AppState {
    pub service: WeatherService,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: WeatherService) -> Arc<Self> {
        Arc::new(Self {
            service,
            start_time: Instant::now(),
        })
    }
}
