//! High-level session with an AXi power supply behind a Corsair Link dongle.
//!
//! For method naming we follow the convention that "read" returns a measured
//! value while "get"-style accessors return configuration. All telemetry
//! goes through the page-addressed register client; the dongle-identity
//! queries are the one exception and talk to the transport directly, since
//! they predate register and page semantics.

use core::ops::RangeInclusive;

use embedded_io::{Read, Write};
use fugit::Duration;
use strum_macros::{Display, EnumIter};

use crate::client::{PageSpace, RegisterClient};
use crate::error::{Error, Result};
use crate::linear11::decode_linear11;
use crate::registers::CommandCode;
use crate::transport::{MAX_REPLY_LEN, Transport};

/// Raw query bytes understood by the dongle itself.
const DONGLE_NAME_QUERY: u8 = 0x02;
const DONGLE_VERSION_QUERY: u8 = 0x00;

/// Undocumented wake sequence. Some PSUs return stale telemetry until this
/// has been sent once; meaning unknown, reply discarded.
const WAKE_SEQUENCE: [u8; 7] = [17, 2, 100, 0, 0, 0, 0];

/// Per-channel OCP readings above this are treated as "no per-channel
/// limit configured".
const OCP_CEILING_AMPS: f32 = 40.0;

/// PSU families with distinct 12V channel layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsuModel {
    Ax1200i,
    Ax1500i,
    /// Any other AXi family member (AX760i, AX860i, AX1600i, ...).
    Other,
}

impl PsuModel {
    pub fn from_name(name: &str) -> Self {
        match name {
            "AX1200i" => PsuModel::Ax1200i,
            "AX1500i" => PsuModel::Ax1500i,
            _ => PsuModel::Other,
        }
    }

    /// Ordered ids of the individually monitored 12V output channels.
    ///
    /// This is a declared table per model, not something the firmware
    /// reports.
    pub fn twelve_volt_channels(self) -> RangeInclusive<u8> {
        match self {
            PsuModel::Ax1200i => 1..=10,
            PsuModel::Ax1500i => 1..=3,
            PsuModel::Other => 2..=6,
        }
    }
}

/// The three main-page rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[repr(u8)]
pub enum Rail {
    #[strum(serialize = "+12V")]
    Plus12V = 0x0,
    #[strum(serialize = "+5V")]
    Plus5V = 0x1,
    #[strum(serialize = "+3.3V")]
    Plus3V3 = 0x2,
}

impl Rail {
    /// Main page value selecting this rail.
    pub fn page(self) -> u8 {
        self as u8
    }
}

/// Fan control mode (vendor register 0xF0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum FanControlMode {
    Hardware = 0x0,
    Software = 0x1,
}

impl TryFrom<u8> for FanControlMode {
    type Error = ();
    fn try_from(value: u8) -> core::result::Result<Self, ()> {
        match value {
            0x0 => Ok(FanControlMode::Hardware),
            0x1 => Ok(FanControlMode::Software),
            _ => Err(()),
        }
    }
}

/// 12V OCP wiring mode (vendor register 0xD8). Best-effort: the reply
/// format was observed on hardware, never documented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum OcpMode {
    #[strum(serialize = "Single rail")]
    SingleRail = 0x1,
    #[strum(serialize = "Multi rail")]
    MultiRail = 0x2,
}

impl TryFrom<u8> for OcpMode {
    type Error = ();
    fn try_from(value: u8) -> core::result::Result<Self, ()> {
        match value {
            0x1 => Ok(OcpMode::SingleRail),
            0x2 => Ok(OcpMode::MultiRail),
            _ => Err(()),
        }
    }
}

/// Identity read once at session start.
#[derive(Debug, Clone)]
pub struct DongleInfo {
    pub dongle_name: heapless::String<32>,
    pub dongle_version: f32,
    /// Model string as reported, e.g. `"AX1200i"`.
    pub psu_name: heapless::String<8>,
    pub psu_model: PsuModel,
}

/// One voltage/current/power measurement triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RailSample {
    pub volts: f32,
    pub amps: f32,
    pub watts: f32,
}

/// Over-current protection descriptor for a 12V channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcpSetting {
    pub enabled: bool,
    pub limit_amps: f32,
}

impl OcpSetting {
    /// Readings above the 40 A ceiling and the firmware's -0.5 marker both
    /// mean the channel runs without a per-channel limit.
    pub fn from_raw(raw: f32) -> Self {
        if raw > OCP_CEILING_AMPS || raw == -0.5 {
            OcpSetting {
                enabled: false,
                limit_amps: OCP_CEILING_AMPS,
            }
        } else {
            OcpSetting {
                enabled: true,
                limit_amps: raw.max(0.0),
            }
        }
    }
}

/// Full reading for one individually monitored 12V output channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RailReading {
    pub channel: u8,
    pub sample: RailSample,
    pub ocp: OcpSetting,
}

/// A monitoring session with one PSU.
///
/// Create one per physical connection from any interface implementing
/// [`embedded_io::Read`] and [`embedded_io::Write`]; the session owns the
/// channel for its lifetime. The PSU model string is cached after the first
/// identification and drives the 12V channel enumeration.
pub struct AxPsu<S: Read + Write, const L: usize = 1056> {
    client: RegisterClient<S, L>,
    model: Option<PsuModel>,
}

impl<S: Read + Write, const L: usize> AxPsu<S, L> {
    pub fn new(interface: S) -> Self {
        Self {
            client: RegisterClient::new(Transport::new(interface)),
            model: None,
        }
    }

    /// Identify the dongle and the PSU behind it.
    ///
    /// Runs the wake sequence; telemetry read without it is stale on some
    /// units. Any failure here leaves the session without a confirmed
    /// model, which makes it unusable for the 12V channel sweep.
    pub fn identify(&mut self) -> Result<DongleInfo, S::Error> {
        let dongle_name = self.read_dongle_name()?;
        self.wake()?;
        let dongle_version = self.read_dongle_version()?;
        let (psu_name, psu_model) = self.read_psu_model()?;
        log::debug!("dongle \"{dongle_name}\" v{dongle_version}, PSU {psu_name}");
        self.model = Some(psu_model);
        Ok(DongleInfo {
            dongle_name,
            dongle_version,
            psu_name,
            psu_model,
        })
    }

    /// The PSU model, identifying first if nothing is cached yet.
    pub fn model(&mut self) -> Result<PsuModel, S::Error> {
        match self.model {
            Some(model) => Ok(model),
            None => Ok(self.identify()?.psu_model),
        }
    }

    /// Ordered ids of this PSU's individually monitored 12V channels.
    pub fn twelve_volt_channels(&mut self) -> Result<RangeInclusive<u8>, S::Error> {
        Ok(self.model()?.twelve_volt_channels())
    }

    fn read_dongle_name(&mut self) -> Result<heapless::String<32>, S::Error> {
        let transport = self.client.transport_mut();
        transport.write(0, &[DONGLE_NAME_QUERY])?;
        let mut reply = transport.read(MAX_REPLY_LEN)?;
        trim_nul_padding(&mut reply);
        text(&reply)
    }

    fn read_dongle_version(&mut self) -> Result<f32, S::Error> {
        let transport = self.client.transport_mut();
        transport.write(0, &[DONGLE_VERSION_QUERY])?;
        let reply = transport.read(5)?;
        let digits = reply.get(1).copied().ok_or(Error::InvalidReply)?;
        Ok(((digits >> 4) + (digits & 0xF)) as f32 / 10.0)
    }

    fn wake(&mut self) -> Result<(), S::Error> {
        let transport = self.client.transport_mut();
        transport.write(0, &WAKE_SEQUENCE)?;
        transport.read(1)?;
        Ok(())
    }

    fn read_psu_model(&mut self) -> Result<(heapless::String<8>, PsuModel), S::Error> {
        let mut raw = self.client.read_register(CommandCode::MfrModel, 7)?;
        trim_nul_padding(&mut raw);
        let name: heapless::String<8> = text(&raw)?;
        let model = PsuModel::from_name(&name);
        Ok((name, model))
    }

    /// Input voltage in volts.
    pub fn read_input_voltage(&mut self) -> Result<f32, S::Error> {
        self.read_linear11(CommandCode::ReadVin)
    }

    /// Input current in amps.
    pub fn read_input_current(&mut self) -> Result<f32, S::Error> {
        self.read_linear11(CommandCode::ReadIin)
    }

    /// First temperature sensor, degrees Celsius.
    pub fn read_temperature_1(&mut self) -> Result<f32, S::Error> {
        self.read_linear11(CommandCode::ReadTemperature1)
    }

    /// Second temperature sensor, degrees Celsius.
    pub fn read_temperature_2(&mut self) -> Result<f32, S::Error> {
        self.read_linear11(CommandCode::ReadTemperature2)
    }

    /// Fan speed in rpm.
    pub fn read_fan_speed(&mut self) -> Result<f32, S::Error> {
        self.read_linear11(CommandCode::ReadFanSpeed1)
    }

    /// Total output power across all rails, in watts.
    pub fn read_output_power(&mut self) -> Result<f32, S::Error> {
        self.read_linear11(CommandCode::ReadTotalPout)
    }

    /// Current fan control mode.
    pub fn fan_control_mode(&mut self) -> Result<FanControlMode, S::Error> {
        let raw = self.client.read_register(CommandCode::FanControlMode, 1)?;
        let byte = raw.first().copied().ok_or(Error::InvalidReply)?;
        FanControlMode::try_from(byte).map_err(|()| Error::InvalidReply)
    }

    /// 12V OCP wiring mode. Best-effort, see [`OcpMode`].
    pub fn twelve_volt_ocp_mode(&mut self) -> Result<OcpMode, S::Error> {
        let raw = self.client.read_register(CommandCode::OcpMode, 1)?;
        let byte = raw.first().copied().ok_or(Error::InvalidReply)?;
        OcpMode::try_from(byte).map_err(|()| Error::InvalidReply)
    }

    /// Uptime since the PSU last powered on.
    pub fn read_uptime(&mut self) -> Result<Duration<u32, 1, 1>, S::Error> {
        self.read_seconds(CommandCode::Uptime)
    }

    /// Total accumulated powered-on time.
    pub fn read_total_uptime(&mut self) -> Result<Duration<u32, 1, 1>, S::Error> {
        self.read_seconds(CommandCode::TotalUptime)
    }

    /// Voltage, current and power of one main rail. Selects the main page
    /// first (skipped when it is already confirmed).
    pub fn read_main_rail(&mut self, rail: Rail) -> Result<RailSample, S::Error> {
        self.client.ensure_page(rail.page(), PageSpace::Main)?;
        Ok(RailSample {
            volts: self.read_linear11(CommandCode::ReadVout)?,
            amps: self.read_linear11(CommandCode::ReadIout)?,
            watts: self.read_linear11(CommandCode::ReadPout)?,
        })
    }

    /// Full reading of one individually monitored 12V output channel.
    ///
    /// Always re-selects the 12V sub-page; a failed selection aborts only
    /// this channel, the session stays usable.
    pub fn read_rail(&mut self, channel: u8) -> Result<RailReading, S::Error> {
        self.client.select_page(channel, PageSpace::TwelveVolt)?;
        let sample = RailSample {
            volts: self.read_linear11(CommandCode::ReadVout)?,
            amps: self.read_linear11(CommandCode::Read12VIout)?,
            watts: self.read_linear11(CommandCode::Read12VPout)?,
        };
        let ocp = OcpSetting::from_raw(self.read_linear11(CommandCode::Read12VOcp)?);
        Ok(RailReading {
            channel,
            sample,
            ocp,
        })
    }

    /// Read `len` bytes from a register on the currently selected page.
    pub fn read_register(
        &mut self,
        register: impl Into<u8>,
        len: usize,
    ) -> Result<heapless::Vec<u8, L>, S::Error> {
        self.client.read_register(register, len)
    }

    /// Write bytes to a register; returns the ack byte when one is sent.
    pub fn write_register(
        &mut self,
        register: impl Into<u8>,
        data: &[u8],
    ) -> Result<Option<u8>, S::Error> {
        self.client.write_register(register, data)
    }

    /// Select a page with the space's verify-and-retry policy.
    pub fn select_page(&mut self, page: u8, space: PageSpace) -> Result<(), S::Error> {
        self.client.select_page(page, space)
    }

    fn read_linear11(&mut self, command: CommandCode) -> Result<f32, S::Error> {
        let raw = self.client.read_register(command, 2)?;
        let word: [u8; 2] = raw.as_slice().try_into().map_err(|_| Error::InvalidReply)?;
        Ok(decode_linear11(word))
    }

    fn read_seconds(&mut self, command: CommandCode) -> Result<Duration<u32, 1, 1>, S::Error> {
        let raw = self.client.read_register(command, 4)?;
        let bytes: [u8; 4] = raw.as_slice().try_into().map_err(|_| Error::InvalidReply)?;
        // The two 16-bit halves arrive swapped; observed on hardware.
        let secs = u32::from_le_bytes([bytes[2], bytes[3], bytes[0], bytes[1]]);
        Ok(Duration::<u32, 1, 1>::secs(secs))
    }
}

fn trim_nul_padding<const N: usize>(bytes: &mut heapless::Vec<u8, N>) {
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
}

fn text<const N: usize, I: embedded_io::Error>(bytes: &[u8]) -> Result<heapless::String<N>, I> {
    let s = core::str::from_utf8(bytes).map_err(|_| Error::InvalidReply)?;
    heapless::String::try_from(s).map_err(|_| Error::InvalidReply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::linear11::encode_linear11;
    use crate::mock_serial::MockSerial;
    use strum::IntoEnumIterator;

    fn reply(data: &[u8]) -> heapless::Vec<u8, 128> {
        let mut out = heapless::Vec::new();
        codec::encode_frame(7, data, &mut out).unwrap();
        out
    }

    /// Responses for one whole `read_register(register, len)` exchange,
    /// with a trailing status byte after the payload.
    fn queue_register_read(serial: &mut MockSerial, payload: &[u8]) {
        serial.queue_read_data(&reply(&[])).unwrap();
        let mut body: heapless::Vec<u8, 16> = heapless::Vec::new();
        body.extend_from_slice(payload).unwrap();
        body.push(0x00).unwrap(); // status byte
        serial.queue_read_data(&reply(&body)).unwrap();
    }

    fn queue_identify(serial: &mut MockSerial, model: &[u8]) {
        // Name reply, NUL terminated like the hardware sends it.
        serial
            .queue_read_data(&reply(b"Corsair Dongle\x00"))
            .unwrap();
        // Wake ack.
        serial.queue_read_data(&reply(&[0x00])).unwrap();
        // Version: digit nibbles 2 and 8 sum to 10 -> v1.0.
        serial
            .queue_read_data(&reply(&[0x00, 0x28, 0x00, 0x00, 0x00]))
            .unwrap();
        queue_register_read(serial, model);
    }

    #[test]
    fn identify_decodes_the_canned_capture() {
        let mut serial = MockSerial::new();
        queue_identify(&mut serial, b"AX1200i");

        let mut psu: AxPsu<MockSerial> = AxPsu::new(serial);
        let info = psu.identify().unwrap();
        assert_eq!(info.dongle_name.as_str(), "Corsair Dongle");
        assert_eq!(info.dongle_version, 1.0);
        assert_eq!(info.psu_name.as_str(), "AX1200i");
        assert_eq!(info.psu_model, PsuModel::Ax1200i);

        // The model is cached: no further exchanges needed.
        assert_eq!(psu.twelve_volt_channels().unwrap(), 1..=10);
    }

    #[test]
    fn channel_enumeration_follows_the_model_table() {
        assert_eq!(
            PsuModel::from_name("AX1200i").twelve_volt_channels().count(),
            10
        );
        assert_eq!(
            PsuModel::from_name("AX1500i").twelve_volt_channels(),
            1..=3
        );
        // Unknown models fall back to the five-channel layout.
        assert_eq!(PsuModel::from_name("AX860i").twelve_volt_channels(), 2..=6);
    }

    #[test]
    fn ocp_decoding_policy() {
        assert_eq!(
            OcpSetting::from_raw(45.0),
            OcpSetting {
                enabled: false,
                limit_amps: 40.0
            }
        );
        assert_eq!(
            OcpSetting::from_raw(-0.5),
            OcpSetting {
                enabled: false,
                limit_amps: 40.0
            }
        );
        assert_eq!(
            OcpSetting::from_raw(-2.0),
            OcpSetting {
                enabled: true,
                limit_amps: 0.0
            }
        );
        assert_eq!(
            OcpSetting::from_raw(12.5),
            OcpSetting {
                enabled: true,
                limit_amps: 12.5
            }
        );
    }

    #[test]
    fn rail_pages_match_the_firmware_layout() {
        let pages: heapless::Vec<u8, 3> = Rail::iter().map(Rail::page).collect();
        assert_eq!(pages.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn read_rail_selects_the_sub_page_and_decodes_ocp() {
        let mut serial = MockSerial::new();
        // Page select, accepted on the first verify read.
        serial.queue_read_data(&reply(&[])).unwrap();
        queue_register_read(&mut serial, &[3]);
        // Voltage, current, power, then a disabled-OCP marker.
        queue_register_read(&mut serial, &encode_linear11(12.25, 4));
        queue_register_read(&mut serial, &encode_linear11(10.0, 4));
        queue_register_read(&mut serial, &encode_linear11(122.5, 1));
        queue_register_read(&mut serial, &encode_linear11(45.0, 0));

        let mut psu: AxPsu<MockSerial> = AxPsu::new(serial);
        let reading = psu.read_rail(3).unwrap();
        assert_eq!(reading.channel, 3);
        assert_eq!(reading.sample.volts, 12.25);
        assert_eq!(reading.sample.amps, 10.0);
        assert_eq!(reading.sample.watts, 122.5);
        assert_eq!(
            reading.ocp,
            OcpSetting {
                enabled: false,
                limit_amps: 40.0
            }
        );
    }

    #[test]
    fn main_rail_sample_reads_the_selected_page() {
        let mut serial = MockSerial::new();
        serial.queue_read_data(&reply(&[])).unwrap();
        queue_register_read(&mut serial, &[Rail::Plus5V.page()]);
        queue_register_read(&mut serial, &encode_linear11(5.0, 4));
        queue_register_read(&mut serial, &encode_linear11(8.5, 2));
        queue_register_read(&mut serial, &encode_linear11(42.5, 1));

        let mut psu: AxPsu<MockSerial> = AxPsu::new(serial);
        let sample = psu.read_main_rail(Rail::Plus5V).unwrap();
        assert_eq!(sample.volts, 5.0);
        assert_eq!(sample.amps, 8.5);
        assert_eq!(sample.watts, 42.5);
    }

    #[test]
    fn uptime_reorders_the_16_bit_halves() {
        let mut serial = MockSerial::new();
        queue_register_read(&mut serial, &[0x01, 0x00, 0x3C, 0x00]);

        let mut psu: AxPsu<MockSerial> = AxPsu::new(serial);
        let uptime = psu.read_uptime().unwrap();
        assert_eq!(uptime.to_secs(), 0x0001_003C);
    }

    #[test]
    fn fan_control_mode_rejects_unknown_values() {
        let mut serial = MockSerial::new();
        queue_register_read(&mut serial, &[0x07]);

        let mut psu: AxPsu<MockSerial> = AxPsu::new(serial);
        assert!(matches!(
            psu.fan_control_mode(),
            Err(Error::InvalidReply)
        ));
    }
}
