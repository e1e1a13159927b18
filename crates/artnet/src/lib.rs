pub mod protocol;
pub mod types;

pub use protocol::{
    build_artdmx_packet, build_artpoll_packet, parse_artdmx_packet, parse_artpoll_reply, ArtDmx,
    PollReply,
};
pub use types::{PortAddress, ARTNET_HEADER, ARTNET_PORT, DMX_CHANNELS, OP_DMX, OP_POLL, OP_POLL_REPLY, PROTOCOL_VERSION};
