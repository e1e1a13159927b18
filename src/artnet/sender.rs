//! Art-Net UDP Sender
//!
//! One socket, bound to the Art-Net port with broadcast enabled. DMX
//! streams are split into one ArtDMX packet per universe per output.
//! Send errors never backpressure the pipeline: they are logged at most
//! once per output per minute and transmission retries next tick.

use std::collections::HashMap;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

use artnet::{build_artdmx_packet, PortAddress, ARTNET_PORT, DMX_CHANNELS};
use log::{error, info};

use super::models::ArtNetOutput;

const SEND_ERROR_LOG_INTERVAL: Duration = Duration::from_secs(60);

pub struct ArtNetSender {
    socket: Option<UdpSocket>,
    /// Monotonic ArtDMX sequence per (output, universe).
    sequences: HashMap<(String, u16), u8>,
    last_error_log: HashMap<String, Instant>,
    /// Substitute each output's target with its subnet broadcast address.
    pub broadcast: bool,
}

impl ArtNetSender {
    pub fn new(broadcast: bool) -> Self {
        let socket = Self::bind();
        Self {
            socket,
            sequences: HashMap::new(),
            last_error_log: HashMap::new(),
            broadcast,
        }
    }

    fn bind() -> Option<UdpSocket> {
        // Source port 6454 per the protocol; fall back to ephemeral when
        // something else already owns it (a second engine instance).
        let socket = UdpSocket::bind(("0.0.0.0", ARTNET_PORT))
            .or_else(|e| {
                info!("[artnet] port {} busy ({}), using ephemeral port", ARTNET_PORT, e);
                UdpSocket::bind("0.0.0.0:0")
            })
            .ok()?;
        let _ = socket.set_broadcast(true);
        let _ = socket.set_nonblocking(true);
        Some(socket)
    }

    pub fn is_bound(&self) -> bool {
        self.socket.is_some()
    }

    fn target_for(&self, output: &ArtNetOutput) -> String {
        let host = if self.broadcast {
            output.broadcast_address()
        } else {
            output.target_ip.clone()
        };
        format!("{}:{}", host, ARTNET_PORT)
    }

    /// Send one output's DMX stream, one packet per 512-channel universe
    /// starting at `start_universe`.
    pub fn send(&mut self, output: &ArtNetOutput, dmx: &[u8]) {
        if dmx.is_empty() {
            return;
        }
        let socket = match &self.socket {
            Some(s) => s,
            None => return,
        };
        let target = self.target_for(output);

        let mut send_error: Option<std::io::Error> = None;
        for (index, chunk) in dmx.chunks(DMX_CHANNELS).enumerate() {
            let universe = output.start_universe.wrapping_add(index as u16);
            let key = (output.id.clone(), universe);
            let sequence = self.sequences.entry(key).or_insert(0);
            *sequence = sequence.wrapping_add(1);

            let packet =
                build_artdmx_packet(*sequence, PortAddress::from_flat(universe), chunk);
            if let Err(e) = socket.send_to(&packet, &target) {
                send_error = Some(e);
            }
        }

        if let Some(e) = send_error {
            let now = Instant::now();
            let should_log = self
                .last_error_log
                .get(&output.id)
                .map(|last| now.duration_since(*last) >= SEND_ERROR_LOG_INTERVAL)
                .unwrap_or(true);
            if should_log {
                error!("[artnet] send to {} failed: {}", target, e);
                self.last_error_log.insert(output.id.clone(), now);
            }
        }
    }

    /// Full-zero packets on every universe an output spans. Part of the
    /// shutdown sequence and the stop path.
    pub fn blackout(&mut self, output: &ArtNetOutput, channel_count: usize) {
        if channel_count == 0 {
            return;
        }
        let zeros = vec![0u8; channel_count];
        self.send(output, &zeros);
    }

    pub fn reset_output(&mut self, output_id: &str) {
        self.sequences.retain(|(id, _), _| id != output_id);
        self.last_error_log.remove(output_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artnet::parse_artdmx_packet;

    #[test]
    fn stream_splits_into_universe_packets() {
        // 700 channels starting at universe 2 → universes 2 and 3.
        let dmx = vec![7u8; 700];
        let chunks: Vec<&[u8]> = dmx.chunks(DMX_CHANNELS).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 512);
        assert_eq!(chunks[1].len(), 188);

        let packet = build_artdmx_packet(1, PortAddress::from_flat(3), chunks[1]);
        let parsed = parse_artdmx_packet(&packet).unwrap();
        assert_eq!(parsed.data.len(), 188);
        assert_eq!(parsed.port_address.universe(), 3);
    }

    #[test]
    fn sender_survives_unroutable_target() {
        let mut sender = ArtNetSender::new(false);
        if !sender.is_bound() {
            return; // sandboxed environments may forbid binding
        }
        let output = ArtNetOutput::new("out-1", "o", "203.0.113.1");
        // Must not panic or error out of the pipeline.
        sender.send(&output, &[1, 2, 3]);
        sender.blackout(&output, 3);
    }
}
