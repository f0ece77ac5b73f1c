mod http;
mod mqtt;

pub use http::HaHttpClient;
pub use mqtt::HaMqttClient;
