use std::env;

use corsair_ax_psu::psu::{AxPsu, Rail};
use inquire::Select;
use serialport::SerialPort;
use strum::IntoEnumIterator;

const BAUD_RATE: u32 = 115200;
// The dongle answers quickly but the first exchange after plug-in can lag.
const SERIAL_TIMEOUT_MS: u64 = 1000;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn main() {
    env_logger::init();

    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let port = serialport::new(&port_name, BAUD_RATE)
        .timeout(std::time::Duration::from_millis(SERIAL_TIMEOUT_MS))
        .open()
        .expect("Failed to open serial port");

    let port = PortWrapper(port);

    let mut psu: AxPsu<PortWrapper> = AxPsu::new(port);

    let info = psu.identify().expect("Failed to identify the PSU");
    println!(
        "Dongle: {} (firmware v{:.1})",
        info.dongle_name, info.dongle_version
    );
    println!("PSU:    {}", info.psu_name);

    println!("\n--- Input ---");
    let vin = psu.read_input_voltage().unwrap();
    let iin = psu.read_input_current().unwrap();
    println!("Input: {:.1}V {:.2}A", vin, iin);

    println!("\n--- Environment ---");
    println!("Temperature 1: {:.1}C", psu.read_temperature_1().unwrap());
    println!("Temperature 2: {:.1}C", psu.read_temperature_2().unwrap());
    println!("Fan speed:     {:.0} rpm", psu.read_fan_speed().unwrap());
    match psu.fan_control_mode() {
        Ok(mode) => println!("Fan control:   {}", mode),
        Err(e) => println!("Fan control:   unreadable ({e})"),
    }

    println!("\n--- Main rails ---");
    for rail in Rail::iter() {
        let sample = psu.read_main_rail(rail).unwrap();
        println!(
            "{:>6}: {:6.3}V {:6.2}A {:7.1}W",
            rail.to_string(),
            sample.volts,
            sample.amps,
            sample.watts
        );
    }
    println!(
        "Total output power: {:.1}W",
        psu.read_output_power().unwrap()
    );

    println!("\n--- 12V channels ---");
    match psu.twelve_volt_ocp_mode() {
        Ok(mode) => println!("OCP mode: {}", mode),
        Err(e) => println!("OCP mode: unreadable ({e})"),
    }
    for channel in psu.twelve_volt_channels().unwrap() {
        match psu.read_rail(channel) {
            Ok(reading) => {
                let ocp = if reading.ocp.enabled {
                    format!("OCP {:.1}A", reading.ocp.limit_amps)
                } else {
                    "OCP off".to_string()
                };
                println!(
                    "ch {:2}: {:6.3}V {:6.2}A {:7.1}W  {}",
                    reading.channel,
                    reading.sample.volts,
                    reading.sample.amps,
                    reading.sample.watts,
                    ocp
                );
            }
            Err(e) => println!("ch {:2}: skipped ({e})", channel),
        }
    }

    println!("\n--- Uptime ---");
    let uptime = psu.read_uptime().unwrap();
    let total = psu.read_total_uptime().unwrap();
    println!("Since power-on: {}s", uptime.to_secs());
    println!("Lifetime:       {}s", total.to_secs());
}
