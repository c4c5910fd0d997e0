use bytes::{Buf, BufMut};
use gsmcore_buffer::{Layer, MsgBuf};

use crate::error::{Result, TapError};

/// GSMTAP header version.
pub const GSMTAP_VERSION: u8 = 0x02;

/// Payload type: Um interface (air interface) message.
pub const GSMTAP_TYPE_UM: u8 = 0x01;

/// Header size: 15 bytes of fields + 1 reserved = 16 bytes (4 words).
pub const HEADER_SIZE: usize = 16;

/// Radio context a mirrored message was sent or received in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioContext {
    pub arfcn: u16,
    pub timeslot: u8,
    pub sub_slot: u8,
    /// GSMTAP channel subtype, see [`chantype`](crate::chantype).
    pub chan_type: u8,
    pub frame_number: u32,
    pub signal_dbm: i8,
    pub snr_db: u8,
}

/// Decoded GSMTAP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GsmtapHeader {
    pub version: u8,
    /// Header length in 32-bit words.
    pub hdr_len: u8,
    pub msg_type: u8,
    pub timeslot: u8,
    pub sub_slot: u8,
    pub arfcn: u16,
    pub snr_db: u8,
    pub signal_dbm: i8,
    pub frame_number: u32,
    pub sub_type: u8,
    pub antenna_nr: u8,
}

impl GsmtapHeader {
    /// Header for an Um message in the given radio context.
    pub fn um(ctx: &RadioContext) -> Self {
        Self {
            version: GSMTAP_VERSION,
            hdr_len: (HEADER_SIZE / 4) as u8,
            msg_type: GSMTAP_TYPE_UM,
            timeslot: ctx.timeslot,
            sub_slot: ctx.sub_slot,
            arfcn: ctx.arfcn,
            snr_db: ctx.snr_db,
            signal_dbm: ctx.signal_dbm,
            frame_number: ctx.frame_number,
            sub_type: ctx.chan_type,
            antenna_nr: 0,
        }
    }

    /// Encode the header into the wire format.
    ///
    /// Wire format (multi-byte fields big-endian):
    /// ```text
    /// ┌─────┬─────┬──────┬────┬──────┬───────┬─────┬────────┬──────────┬─────────┬─────────┬─────┐
    /// │ ver │ len │ type │ ts │ ss   │ arfcn │ snr │ signal │ fn       │ subtype │ antenna │ res │
    /// │ 1B  │ 1B  │ 1B   │ 1B │ 1B   │ 2B    │ 1B  │ 1B     │ 4B       │ 1B      │ 1B      │ 1B  │
    /// └─────┴─────┴──────┴────┴──────┴───────┴─────┴────────┴──────────┴─────────┴─────────┴─────┘
    /// ```
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.version);
        dst.put_u8(self.hdr_len);
        dst.put_u8(self.msg_type);
        dst.put_u8(self.timeslot);
        dst.put_u8(self.sub_slot);
        dst.put_u16(self.arfcn);
        dst.put_u8(self.snr_db);
        dst.put_i8(self.signal_dbm);
        dst.put_u32(self.frame_number);
        dst.put_u8(self.sub_type);
        dst.put_u8(self.antenna_nr);
        dst.put_u8(0);
    }

    /// Decode a datagram into its header and payload.
    pub fn decode(src: &[u8]) -> Result<(Self, &[u8])> {
        if src.len() < HEADER_SIZE {
            return Err(TapError::Truncated {
                len: src.len(),
                needed: HEADER_SIZE,
            });
        }

        let mut buf = src;
        let header = Self {
            version: buf.get_u8(),
            hdr_len: buf.get_u8(),
            msg_type: buf.get_u8(),
            timeslot: buf.get_u8(),
            sub_slot: buf.get_u8(),
            arfcn: buf.get_u16(),
            snr_db: buf.get_u8(),
            signal_dbm: buf.get_i8(),
            frame_number: buf.get_u32(),
            sub_type: buf.get_u8(),
            antenna_nr: buf.get_u8(),
        };

        if header.version != GSMTAP_VERSION {
            return Err(TapError::InvalidHeader(format!(
                "unsupported version {}",
                header.version
            )));
        }

        let header_bytes = usize::from(header.hdr_len) * 4;
        if header_bytes < HEADER_SIZE {
            return Err(TapError::InvalidHeader(format!(
                "header length {} words is below the minimum",
                header.hdr_len
            )));
        }
        if header_bytes > src.len() {
            return Err(TapError::Truncated {
                len: src.len(),
                needed: header_bytes,
            });
        }

        Ok((header, &src[header_bytes..]))
    }
}

/// Build a tap message: a GSMTAP header for `ctx` followed by `payload`.
///
/// The payload (the L2 frame) is marked as [`Layer::L2`].
pub fn make_msg(ctx: &RadioContext, payload: &[u8]) -> Result<MsgBuf> {
    let mut msg = MsgBuf::alloc(HEADER_SIZE + payload.len(), "gsmtap_tx")?;

    let mut hdr: &mut [u8] = msg.put(HEADER_SIZE)?;
    GsmtapHeader::um(ctx).encode(&mut hdr);

    msg.set_mark(Layer::L2, HEADER_SIZE)?;
    msg.put_slice(payload)?;

    Ok(msg)
}
