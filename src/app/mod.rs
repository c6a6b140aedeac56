//! Application core: the station's rules behind port traits.
//!
//! [`service::AppService`] is the one entry point shared by the hardware
//! loop, the scheduler's timers and every front-end.  All interaction with
//! hardware and transports happens through the **port traits** in
//! [`ports`], so the core is testable without real peripherals.

pub mod commands;
pub mod ports;
pub mod service;
