//! GPIO sensor bank: bridges proximity sensor pins to [`SensorPort`].
//!
//! Generic over any `embedded_hal` 1.0 [`InputPin`], so the same adapter
//! serves a Raspberry Pi GPIO crate, an expander, or a test double.  The
//! proximity sensors pull their line low when an object is present; the
//! bank applies that inversion per binding.

use embedded_hal::digital::InputPin;
use log::info;

use crate::app::ports::SensorPort;
use crate::config::SensorBinding;
use crate::error::SensorError;
use crate::sensors::SensorId;

struct BoundPin<P> {
    pin: P,
    active_low: bool,
}

/// One input pin per sensor.
pub struct PinSensorBank<P> {
    slots: [Option<BoundPin<P>>; SensorId::COUNT],
}

impl<P: InputPin> Default for PinSensorBank<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: InputPin> PinSensorBank<P> {
    pub fn new() -> Self {
        Self {
            slots: [None, None, None, None],
        }
    }

    /// Attach `pin` to `id`, replacing any earlier binding.
    pub fn bind(&mut self, id: SensorId, pin: P, active_low: bool) -> &mut Self {
        self.slots[id as usize] = Some(BoundPin { pin, active_low });
        self
    }

    /// Bind every configured sensor, opening each pin number with `open`.
    pub fn from_bindings<E>(
        bindings: &[SensorBinding],
        mut open: impl FnMut(u8) -> Result<P, E>,
    ) -> Result<Self, E> {
        let mut bank = Self::new();
        for b in bindings {
            bank.bind(b.id, open(b.pin)?, b.active_low);
            info!(
                "GPIO: {} sensor on pin {}{}",
                b.id,
                b.pin,
                if b.active_low { " (active-low)" } else { "" }
            );
        }
        Ok(bank)
    }
}

impl<P: InputPin> SensorPort for PinSensorBank<P> {
    fn sensor_read(&mut self, id: SensorId) -> Result<bool, SensorError> {
        let slot = self.slots[id as usize]
            .as_mut()
            .ok_or(SensorError::Unbound)?;
        let high = slot
            .pin
            .is_high()
            .map_err(|_| SensorError::GpioReadFailed)?;
        Ok(high != slot.active_low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    struct FakePin(Result<bool, ErrorKind>);

    impl ErrorType for FakePin {
        type Error = ErrorKind;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            self.0
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.0.map(|h| !h)
        }
    }

    #[test]
    fn active_low_pin_reads_present_when_low() {
        let mut bank = PinSensorBank::new();
        bank.bind(SensorId::Object, FakePin(Ok(false)), true)
            .bind(SensorId::Blue, FakePin(Ok(true)), true)
            .bind(SensorId::Yellow, FakePin(Ok(true)), false);

        assert_eq!(bank.sensor_read(SensorId::Object), Ok(true));
        assert_eq!(bank.sensor_read(SensorId::Blue), Ok(false));
        assert_eq!(bank.sensor_read(SensorId::Yellow), Ok(true));
    }

    #[test]
    fn unbound_and_failing_pins_error() {
        let mut bank = PinSensorBank::new();
        bank.bind(SensorId::Blue, FakePin(Err(ErrorKind::Other)), true);
        assert_eq!(bank.sensor_read(SensorId::Brown), Err(SensorError::Unbound));
        assert_eq!(bank.sensor_read(SensorId::Blue), Err(SensorError::GpioReadFailed));
        assert!(bank.read_levels().is_err());
    }

    #[test]
    fn builds_from_config_bindings() {
        let config = crate::config::SystemConfig::default();
        let mut bank = PinSensorBank::from_bindings(&config.sensors, |pin| {
            // Only the intake pin (26) sees something.
            Ok::<_, ()>(FakePin(Ok(pin != 26)))
        })
        .unwrap();
        let levels = bank.read_levels().unwrap();
        assert!(levels.get(SensorId::Object));
        assert!(!levels.get(SensorId::Brown));
    }
}
