mod bus;
mod http;
mod monitoring;
mod mqtt;

pub use bus::{EventBus, EventEmitter, EventListener};
pub use http::HttpClientConfig;
pub use monitoring::{EnvFilterConfig, MonitoringConfig, OtlpConfig};
pub use mqtt::{Mqtt, MqttConfig, MqttInMessage, MqttSubscription};
