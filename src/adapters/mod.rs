//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements                                     | Connects to                 |
//! |---------------|------------------------------------------------|-----------------------------|
//! | `analytics`   | TransitionSink                                 | in-memory disposal ring     |
//! | `config_file` | ConfigPort                                     | JSON file on disk           |
//! | `display`     | TransitionSink                                 | any DisplayPort             |
//! | `hardware`    | SensorPort                                     | embedded-hal input pins     |
//! | `http_api`    | `route` over AppService                        | REST request → AppCommand   |
//! | `log_sink`    | TransitionSink                                 | `log` facade                |
//! | `mqtt`        | TransitionSink                                 | any MessagePublisher        |
//! | `sim`         | Sensor/Camera/Classifier/Indicator/DisplayPort | host simulation             |
//! | `time`        | TimePort                                       | `std::time::Instant`        |

pub mod analytics;
pub mod config_file;
pub mod display;
pub mod hardware;
pub mod http_api;
pub mod log_sink;
pub mod mqtt;
pub mod sim;
pub mod time;
