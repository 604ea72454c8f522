//! PMBus command codes understood by the AXi PSUs.
//!
//! Standard PMBus codes plus the Corsair vendor extensions in the 0xD1-0xF0
//! range. All reads are scoped to whichever page is currently selected in
//! the firmware (see [`PageSpace`](crate::client::PageSpace)).

/// Register addresses, one byte each.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    /// __R/W__ - Main page select: `0` = +12V, `1` = +5V, `2` = +3.3V.
    Page = 0x00,
    /// __R__ - Input voltage, linear11.
    ReadVin = 0x88,
    /// __R__ - Input current, linear11.
    ReadIin = 0x89,
    /// __R__ - Output voltage of the selected page, linear11.
    ReadVout = 0x8B,
    /// __R__ - Output current of the selected page, linear11.
    ReadIout = 0x8C,
    /// __R__ - Temperature sensor 1, linear11.
    ReadTemperature1 = 0x8D,
    /// __R__ - Temperature sensor 2, linear11.
    ReadTemperature2 = 0x8E,
    /// __R__ - Fan speed in rpm, linear11.
    ReadFanSpeed1 = 0x90,
    /// __R__ - Output power of the selected page, linear11.
    ReadPout = 0x96,
    /// __R__ - PSU model string, 7 ASCII bytes.
    MfrModel = 0x9A,
    /// __R__ - Total powered-on time, 4 bytes of seconds. (Vendor.)
    TotalUptime = 0xD1,
    /// __R__ - Uptime since last power-on, 4 bytes of seconds. (Vendor.)
    Uptime = 0xD2,
    /// __R__ - 12V OCP wiring mode. (Vendor; reply format observed on
    /// hardware, not documented.)
    OcpMode = 0xD8,
    /// __R/W__ - 12V sub-page select: one individually monitored 12V output
    /// channel. (Vendor.)
    Page12V = 0xE7,
    /// __R__ - Selected 12V channel current, linear11. (Vendor.)
    Read12VIout = 0xE8,
    /// __R__ - Selected 12V channel power, linear11. (Vendor.)
    Read12VPout = 0xE9,
    /// __R__ - Selected 12V channel OCP limit, linear11. (Vendor.)
    Read12VOcp = 0xEA,
    /// __R__ - Total output power, linear11. (Vendor.)
    ReadTotalPout = 0xEE,
    /// __R/W__ - Fan control mode: `0` hardware, `1` software. (Vendor.)
    FanControlMode = 0xF0,
}

impl From<CommandCode> for u8 {
    fn from(value: CommandCode) -> Self {
        value as u8
    }
}
