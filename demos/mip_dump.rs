//! MIP packet dumper
//!
//! Opens the node's serial port and prints every parsed packet with its
//! fields in hex for protocol analysis. Does not configure the node; run it
//! while another process (or the node's startup settings) has it streaming.
//!
//! ```text
//! cargo run --example mip_dump -- /dev/ttyACM0 [seconds]
//! ```

use mip_ahrs::channels::{ChannelField, DataPacket};
use mip_ahrs::mip::PacketReader;
use mip_ahrs::mip::constants::DESC_SET_IMU_DATA;
use mip_ahrs::transport::SerialTransport;
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port = args.get(1).map(String::as_str).unwrap_or("/dev/ttyACM0");
    let seconds = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);

    log::info!("Opening {} at 115200 baud...", port);
    let mut transport = SerialTransport::open(port, 115_200)?;
    let mut reader = PacketReader::new();

    let start = Instant::now();
    let duration = Duration::from_secs(seconds);
    let mut total_bytes = 0;
    let mut packet_count = 0;

    while start.elapsed() < duration {
        total_bytes += reader.fill(&mut transport)?;

        while let Some(packet) = reader.next_packet() {
            packet_count += 1;
            println!(
                "[{:8.3}s] SET=0x{:02X} LEN={}",
                start.elapsed().as_secs_f64(),
                packet.descriptor_set(),
                packet.payload().len()
            );

            for field in packet.fields() {
                let name = if packet.descriptor_set() == DESC_SET_IMU_DATA {
                    ChannelField::from_descriptor(field.descriptor)
                        .map(|f| format!("{:?}", f))
                        .unwrap_or_else(|| "?".to_string())
                } else {
                    String::new()
                };
                println!(
                    "    0x{:02X} {:<22} {:02X?}",
                    field.descriptor, name, field.data
                );
            }

            if packet.descriptor_set() == DESC_SET_IMU_DATA {
                for point in DataPacket::from_rx(&packet).data() {
                    println!("      {:<22} {:>12.6}", point.channel_name, point.value);
                }
            }
        }
    }

    log::info!("=== Capture Complete ===");
    log::info!("Total bytes received: {}", total_bytes);
    log::info!("Packets parsed: {}", packet_count);
    log::info!("Checksum errors: {}", reader.checksum_errors());

    Ok(())
}
