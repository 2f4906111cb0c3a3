//! Decred transaction wire format.
//!
//! ```text
//! version: u16 | ser_type: u16          (one little-endian u32)
//! prefix:  varint n_in  { outpoint hash[32] index u32 tree u8 sequence u32 }
//!          varint n_out { value i64 script_version u16 varbytes script }
//!          lock_time u32 | expiry u32
//! witness: varint n_in  { value_in i64 block_height u32 block_index u32 varbytes sig_script }
//! ```
//! The transaction hash is BLAKE-256 over the prefix-only serialization.

use crate::blake256::blake256;
use crate::error::WireError;
use crate::types::{Hash256, OutPoint};

/// Regular transaction version.
pub const TX_VERSION: u16 = 1;

/// Version carrying treasury semantics.
pub const TX_VERSION_TREASURY: u16 = 3;

/// Default input sequence number.
pub const MAX_TX_IN_SEQUENCE_NUM: u32 = u32::MAX;

/// Sentinel block height and index for witness data not yet in a block.
pub const NULL_BLOCK_HEIGHT: u32 = 0;
pub const NULL_BLOCK_INDEX: u32 = u32::MAX;
pub const NULL_VALUE_IN: i64 = -1;

/// Largest payload of a single wire message.
pub const MAX_MESSAGE_PAYLOAD: usize = 1024 * 1024 * 32;

/// Smallest possible serialized prefix input and output.
const MIN_TX_IN_PREFIX_LEN: usize = 32 + 4 + 1 + 4;
const MIN_TX_OUT_LEN: usize = 8 + 2 + 1;
const MIN_TX_IN_WITNESS_LEN: usize = 8 + 4 + 4 + 1;

/// Which parts of a transaction a serialization carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum SerType {
    #[default]
    Full = 0,
    NoWitness = 1,
    OnlyWitness = 2,
}

impl TryFrom<u16> for SerType {
    type Error = WireError;

    fn try_from(v: u16) -> Result<Self, WireError> {
        match v {
            0 => Ok(SerType::Full),
            1 => Ok(SerType::NoWitness),
            2 => Ok(SerType::OnlyWitness),
            other => Err(WireError::UnsupportedSerType(other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub previous_outpoint: OutPoint,
    pub sequence: u32,
    pub value_in: i64,
    pub block_height: u32,
    pub block_index: u32,
    pub signature_script: Vec<u8>,
}

impl TxIn {
    /// A new unsigned input spending `previous_outpoint` of `value_in` atoms.
    pub fn new(previous_outpoint: OutPoint, value_in: i64) -> Self {
        Self {
            previous_outpoint,
            sequence: MAX_TX_IN_SEQUENCE_NUM,
            value_in,
            block_height: NULL_BLOCK_HEIGHT,
            block_index: NULL_BLOCK_INDEX,
            signature_script: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: i64,
    pub version: u16,
    pub pk_script: Vec<u8>,
}

impl TxOut {
    pub fn new(value: i64, pk_script: Vec<u8>) -> Self {
        Self { value, version: 0, pk_script }
    }

    /// Serialized size of this output.
    pub fn serialize_size(&self) -> usize {
        8 + 2 + var_int_size(self.pk_script.len() as u64) + self.pk_script.len()
    }
}

/// A Decred transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgTx {
    pub ser_type: SerType,
    pub version: u16,
    pub tx_in: Vec<TxIn>,
    pub tx_out: Vec<TxOut>,
    pub lock_time: u32,
    pub expiry: u32,
}

impl Default for MsgTx {
    fn default() -> Self {
        Self {
            ser_type: SerType::Full,
            version: TX_VERSION,
            tx_in: Vec::new(),
            tx_out: Vec::new(),
            lock_time: 0,
            expiry: 0,
        }
    }
}

/// Encoded size of a compact-size integer.
pub fn var_int_size(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

pub fn write_var_int(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_var_int(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Cursor over a byte slice with bounds-checked reads.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::UnexpectedEof { need: n, have: self.remaining() });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn var_int(&mut self) -> Result<u64, WireError> {
        let (value, min) = match self.u8()? {
            0xfd => (u64::from(self.u16()?), 0xfd),
            0xfe => (u64::from(self.u32()?), 0x1_0000),
            0xff => (u64::from_le_bytes(self.array()?), 0x1_0000_0000),
            b => return Ok(u64::from(b)),
        };
        if value < min {
            return Err(WireError::NonCanonicalVarInt);
        }
        Ok(value)
    }

    /// Read an element count. Counts no message could carry are `TooMany`;
    /// counts the remaining bytes cannot hold are a truncation.
    fn count(&mut self, what: &'static str, min_elem_len: usize) -> Result<usize, WireError> {
        let count = self.var_int()?;
        let max = (MAX_MESSAGE_PAYLOAD / min_elem_len) as u64;
        if count > max {
            return Err(WireError::TooMany { what, count, max });
        }
        let need = count as usize * min_elem_len;
        if need > self.remaining() {
            return Err(WireError::UnexpectedEof { need, have: self.remaining() });
        }
        Ok(count as usize)
    }

    fn var_bytes(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.var_int()?;
        if len > self.remaining() as u64 {
            return Err(WireError::UnexpectedEof {
                need: len.min(usize::MAX as u64) as usize,
                have: self.remaining(),
            });
        }
        Ok(self.bytes(len as usize)?.to_vec())
    }
}

impl MsgTx {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_prefix(&self, buf: &mut Vec<u8>) {
        write_var_int(buf, self.tx_in.len() as u64);
        for input in &self.tx_in {
            let op = &input.previous_outpoint;
            buf.extend_from_slice(op.hash.as_bytes());
            buf.extend_from_slice(&op.index.to_le_bytes());
            buf.push(op.tree as u8);
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_var_int(buf, self.tx_out.len() as u64);
        for output in &self.tx_out {
            buf.extend_from_slice(&output.value.to_le_bytes());
            buf.extend_from_slice(&output.version.to_le_bytes());
            write_var_bytes(buf, &output.pk_script);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf.extend_from_slice(&self.expiry.to_le_bytes());
    }

    fn write_witness(&self, buf: &mut Vec<u8>) {
        write_var_int(buf, self.tx_in.len() as u64);
        for input in &self.tx_in {
            buf.extend_from_slice(&input.value_in.to_le_bytes());
            buf.extend_from_slice(&input.block_height.to_le_bytes());
            buf.extend_from_slice(&input.block_index.to_le_bytes());
            write_var_bytes(buf, &input.signature_script);
        }
    }

    /// Serialize with an explicit serialization type.
    pub fn serialize_as(&self, ser_type: SerType) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serialize_size_as(ser_type));
        let header = u32::from(self.version) | (u32::from(ser_type as u16) << 16);
        buf.extend_from_slice(&header.to_le_bytes());
        match ser_type {
            SerType::Full => {
                self.write_prefix(&mut buf);
                self.write_witness(&mut buf);
            }
            SerType::NoWitness => self.write_prefix(&mut buf),
            SerType::OnlyWitness => self.write_witness(&mut buf),
        }
        buf
    }

    /// Serialize with this transaction's own serialization type.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.serialize_as(self.ser_type)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    fn prefix_size(&self) -> usize {
        var_int_size(self.tx_in.len() as u64)
            + self.tx_in.len() * MIN_TX_IN_PREFIX_LEN
            + var_int_size(self.tx_out.len() as u64)
            + self.tx_out.iter().map(TxOut::serialize_size).sum::<usize>()
            + 8
    }

    fn witness_size(&self) -> usize {
        var_int_size(self.tx_in.len() as u64)
            + self
                .tx_in
                .iter()
                .map(|i| {
                    16 + var_int_size(i.signature_script.len() as u64) + i.signature_script.len()
                })
                .sum::<usize>()
    }

    pub fn serialize_size_as(&self, ser_type: SerType) -> usize {
        4 + match ser_type {
            SerType::Full => self.prefix_size() + self.witness_size(),
            SerType::NoWitness => self.prefix_size(),
            SerType::OnlyWitness => self.witness_size(),
        }
    }

    pub fn serialize_size(&self) -> usize {
        self.serialize_size_as(self.ser_type)
    }

    /// Transaction hash: BLAKE-256 of the prefix serialization.
    pub fn tx_hash(&self) -> Hash256 {
        Hash256(blake256(&self.serialize_as(SerType::NoWitness)))
    }

    /// Decode a transaction, requiring every byte to be consumed.
    pub fn from_bytes(data: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader::new(data);
        let header = r.u32()?;
        let version = (header & 0xffff) as u16;
        let ser_type = SerType::try_from((header >> 16) as u16)?;
        let mut tx = MsgTx { ser_type, version, ..MsgTx::default() };

        match ser_type {
            SerType::Full => {
                tx.read_prefix(&mut r)?;
                tx.read_witness(&mut r, false)?;
            }
            SerType::NoWitness => tx.read_prefix(&mut r)?,
            SerType::OnlyWitness => tx.read_witness(&mut r, true)?,
        }

        if r.remaining() != 0 {
            return Err(WireError::TrailingBytes(r.remaining()));
        }
        Ok(tx)
    }

    /// Decode from hex. Odd-length input is left padded with a zero nibble.
    pub fn from_hex(s: &str) -> Result<Self, WireError> {
        let bytes = if s.len() % 2 != 0 {
            hex::decode(format!("0{s}"))
        } else {
            hex::decode(s)
        }
        .map_err(|e| WireError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    fn read_prefix(&mut self, r: &mut Reader<'_>) -> Result<(), WireError> {
        let n_in = r.count("inputs", MIN_TX_IN_PREFIX_LEN)?;
        self.tx_in = Vec::with_capacity(n_in);
        for _ in 0..n_in {
            let hash = Hash256(r.array()?);
            let index = r.u32()?;
            let tree = r.u8()? as i8;
            let sequence = r.u32()?;
            let mut input = TxIn::new(OutPoint::new(hash, index, tree), 0);
            input.sequence = sequence;
            self.tx_in.push(input);
        }

        let n_out = r.count("outputs", MIN_TX_OUT_LEN)?;
        self.tx_out = Vec::with_capacity(n_out);
        for _ in 0..n_out {
            let value = r.i64()?;
            let version = r.u16()?;
            let pk_script = r.var_bytes()?;
            self.tx_out.push(TxOut { value, version, pk_script });
        }

        self.lock_time = r.u32()?;
        self.expiry = r.u32()?;
        Ok(())
    }

    fn read_witness(&mut self, r: &mut Reader<'_>, witness_only: bool) -> Result<(), WireError> {
        let n = r.count("witnesses", MIN_TX_IN_WITNESS_LEN)?;
        if witness_only {
            self.tx_in = (0..n).map(|_| TxIn::new(OutPoint::null(), 0)).collect();
        } else if n != self.tx_in.len() {
            return Err(WireError::WitnessMismatch { witness: n as u64, inputs: self.tx_in.len() as u64 });
        }
        for input in &mut self.tx_in {
            input.value_in = r.i64()?;
            input.block_height = r.u32()?;
            input.block_index = r.u32()?;
            input.signature_script = r.var_bytes()?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const REVOCATION_HEX: &str = "0200000001d0da473318d6f1af55a53cbbfd236ce8d0778b2771092ed770928fcf8584aa120000000001ffffffff0121fea7620500000000001abc76a9145902fea3162e16f5fb0886e4302e567500c0250a88ac00000000000000000121fea76205000000afba0e000600000000";
    pub(crate) const TREASURYBASE_HEX: &str = "03000000010000000000000000000000000000000000000000000000000000000000000000ffffffff00ffffffff020d3aac0300000000000001c1000000000000000000000e6a0ce55d0f00cdac931bfecd43700000000000000000010d3aac030000000000000000ffffffff00";

    #[test]
    fn decodes_revocation() {
        let tx = MsgTx::from_hex(REVOCATION_HEX).unwrap();
        assert_eq!(tx.version, 2);
        assert_eq!(tx.ser_type, SerType::Full);
        assert_eq!(tx.tx_in.len(), 1);
        assert_eq!(tx.tx_in[0].previous_outpoint.tree, 1);
        assert_eq!(tx.tx_in[0].value_in, 23_130_013_217);
        assert_eq!(tx.tx_in[0].block_height, 965_295);
        assert_eq!(tx.tx_in[0].block_index, 6);
        assert_eq!(tx.tx_out.len(), 1);
        assert_eq!(tx.tx_out[0].value, 23_130_013_217);
        assert_eq!(tx.tx_out[0].pk_script[0], 0xbc);
        assert_eq!(
            tx.tx_hash().to_string(),
            "ae1d2a040ae48b7126d43694e66c3b360e23e3d0b076350fba7c30bed91b91d3"
        );
    }

    #[test]
    fn reserialization_is_identical() {
        for h in [REVOCATION_HEX, TREASURYBASE_HEX] {
            let tx = MsgTx::from_hex(h).unwrap();
            assert_eq!(tx.to_hex(), h);
            assert_eq!(tx.serialize_size(), h.len() / 2);
        }
    }

    #[test]
    fn treasurybase_hash() {
        let tx = MsgTx::from_hex(TREASURYBASE_HEX).unwrap();
        assert!(tx.tx_in[0].previous_outpoint.is_null());
        assert_eq!(
            tx.tx_hash().to_string(),
            "fdbd86ddb24617ab16bc6eecd9d6cda7cc53f030a57a70648b781099d2e7450e"
        );
    }

    #[test]
    fn prefix_only_and_witness_only_forms() {
        let tx = MsgTx::from_hex(REVOCATION_HEX).unwrap();
        let prefix = tx.serialize_as(SerType::NoWitness);
        let decoded = MsgTx::from_bytes(&prefix).unwrap();
        assert_eq!(decoded.ser_type, SerType::NoWitness);
        assert_eq!(decoded.tx_hash(), tx.tx_hash());

        let witness = tx.serialize_as(SerType::OnlyWitness);
        let decoded = MsgTx::from_bytes(&witness).unwrap();
        assert_eq!(decoded.tx_in.len(), 1);
        assert_eq!(decoded.tx_in[0].value_in, 23_130_013_217);
        assert!(decoded.tx_out.is_empty());
    }

    #[test]
    fn odd_length_hex_is_padded() {
        // Leading "0" of the version is dropped.
        let tx = MsgTx::from_hex(&REVOCATION_HEX[1..]).unwrap();
        assert_eq!(tx.to_hex(), REVOCATION_HEX);
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = hex::decode(REVOCATION_HEX).unwrap();
        bytes.push(0);
        assert_eq!(MsgTx::from_bytes(&bytes).unwrap_err(), WireError::TrailingBytes(1));
    }

    #[test]
    fn rejects_truncated() {
        let bytes = hex::decode(REVOCATION_HEX).unwrap();
        assert!(matches!(
            MsgTx::from_bytes(&bytes[..bytes.len() - 3]),
            Err(WireError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn every_short_cut_is_a_truncation() {
        let bytes = hex::decode(REVOCATION_HEX).unwrap();
        for cut in 1..=bytes.len() - 4 {
            let err = MsgTx::from_bytes(&bytes[..bytes.len() - cut]).unwrap_err();
            assert!(matches!(err, WireError::UnexpectedEof { .. }), "cut {cut}: {err:?}");
        }
    }

    #[test]
    fn count_beyond_remaining_bytes_is_a_truncation() {
        // Two inputs announced, none present.
        let bytes = [1, 0, 0, 0, 2];
        assert_eq!(
            MsgTx::from_bytes(&bytes).unwrap_err(),
            WireError::UnexpectedEof { need: 2 * MIN_TX_IN_PREFIX_LEN, have: 0 }
        );
    }

    #[test]
    fn rejects_unknown_ser_type() {
        assert_eq!(
            MsgTx::from_bytes(&[1, 0, 9, 0]).unwrap_err(),
            WireError::UnsupportedSerType(9)
        );
    }

    #[test]
    fn rejects_huge_counts() {
        let bytes = [1, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff, 0x00];
        assert!(matches!(MsgTx::from_bytes(&bytes), Err(WireError::TooMany { what: "inputs", .. })));
    }

    #[test]
    fn non_canonical_varint() {
        let mut r = Reader::new(&[0xfd, 0x10, 0x00]);
        assert_eq!(r.var_int().unwrap_err(), WireError::NonCanonicalVarInt);
        let mut buf = Vec::new();
        write_var_int(&mut buf, 0x1_0000);
        assert_eq!(buf, vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(var_int_size(0x1_0000), 5);
    }

    #[test]
    fn witness_count_must_match() {
        let mut tx = MsgTx::from_hex(REVOCATION_HEX).unwrap();
        let mut bytes = tx.serialize_as(SerType::NoWitness);
        bytes[2] = 0;
        bytes.push(0); // zero witnesses
        assert!(matches!(MsgTx::from_bytes(&bytes), Err(WireError::WitnessMismatch { .. })));
        tx.tx_in.clear();
        assert_eq!(tx.serialize_size(), tx.to_bytes().len());
    }
}
