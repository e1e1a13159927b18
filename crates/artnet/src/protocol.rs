use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read};

use crate::types::{
    PortAddress, ARTNET_HEADER, DMX_CHANNELS, OP_DMX, OP_POLL, OP_POLL_REPLY, PROTOCOL_VERSION,
};

/// A parsed ArtDmx packet.
#[derive(Debug, Clone)]
pub struct ArtDmx {
    pub sequence: u8,
    pub physical: u8,
    pub port_address: PortAddress,
    pub data: Vec<u8>,
}

/// Build an ArtDmx packet.
///
/// Layout: "Art-Net\0" + opcode 0x5000 (LE) + protocol 14 (BE) + sequence +
/// physical + port address (SubUni then Net) + length (BE) + data.
/// Data longer than 512 channels is truncated; the length field always
/// reflects the bytes actually carried.
pub fn build_artdmx_packet(sequence: u8, port_address: PortAddress, data: &[u8]) -> Vec<u8> {
    let len = data.len().min(DMX_CHANNELS);
    let mut packet = Vec::with_capacity(18 + len);
    packet.extend_from_slice(ARTNET_HEADER);
    packet.write_u16::<LittleEndian>(OP_DMX).unwrap();
    packet.write_u16::<BigEndian>(PROTOCOL_VERSION).unwrap();
    packet.push(sequence);
    packet.push(0x00); // physical input port, informational only
    packet.push((port_address.0 & 0xFF) as u8); // SubUni
    packet.push(((port_address.0 >> 8) & 0x7F) as u8); // Net
    packet.write_u16::<BigEndian>(len as u16).unwrap();
    packet.extend_from_slice(&data[..len]);
    packet
}

/// Parse an ArtDmx packet. Rejects wrong header, opcode, or truncated data.
pub fn parse_artdmx_packet(data: &[u8]) -> io::Result<ArtDmx> {
    let mut cursor = Cursor::new(data);

    let mut header = [0u8; 8];
    cursor.read_exact(&mut header)?;
    if &header != ARTNET_HEADER {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not an Art-Net packet",
        ));
    }

    let opcode = cursor.read_u16::<LittleEndian>()?;
    if opcode != OP_DMX {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected OpDmx, got opcode 0x{:04X}", opcode),
        ));
    }

    let _protocol = cursor.read_u16::<BigEndian>()?;
    let sequence = cursor.read_u8()?;
    let physical = cursor.read_u8()?;
    let sub_uni = cursor.read_u8()? as u16;
    let net = cursor.read_u8()? as u16;
    let length = cursor.read_u16::<BigEndian>()? as usize;

    let mut dmx = vec![0u8; length];
    cursor.read_exact(&mut dmx)?;

    Ok(ArtDmx {
        sequence,
        physical,
        port_address: PortAddress((net << 8) | sub_uni),
        data: dmx,
    })
}

/// Build an ArtPoll packet (node discovery broadcast).
pub fn build_artpoll_packet() -> Vec<u8> {
    let mut packet = Vec::with_capacity(14);
    packet.extend_from_slice(ARTNET_HEADER);
    packet.write_u16::<LittleEndian>(OP_POLL).unwrap();
    packet.write_u16::<BigEndian>(PROTOCOL_VERSION).unwrap();
    packet.push(0x00); // TalkToMe: reply only when polled
    packet.push(0x00); // priority
    packet
}

/// Subset of an ArtPollReply a controller cares about.
#[derive(Debug, Clone)]
pub struct PollReply {
    pub short_name: String,
    pub long_name: String,
    pub port_address: PortAddress,
}

/// Parse an ArtPollReply. Field offsets per the Art-Net 4 table:
/// NetSwitch at 18, SubSwitch at 19, short name at 26 (18 bytes),
/// long name at 44 (64 bytes).
pub fn parse_artpoll_reply(data: &[u8]) -> io::Result<PollReply> {
    if data.len() < 108 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "ArtPollReply too short",
        ));
    }
    if &data[0..8] != ARTNET_HEADER {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not an Art-Net packet",
        ));
    }

    let opcode = (data[9] as u16) << 8 | (data[8] as u16);
    if opcode != OP_POLL_REPLY {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected OpPollReply, got opcode 0x{:04X}", opcode),
        ));
    }

    let net = data[18] as u16;
    let sub = data[19] as u16;

    let short_name = String::from_utf8_lossy(&data[26..26 + 18])
        .trim_matches(char::from(0))
        .to_string();
    let long_name = String::from_utf8_lossy(&data[44..44 + 64])
        .trim_matches(char::from(0))
        .to_string();

    Ok(PollReply {
        short_name,
        long_name,
        port_address: PortAddress((net << 8) | (sub << 4)),
    })
}
