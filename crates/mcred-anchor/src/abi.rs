//! # Registry ABI
//!
//! Calldata encoding and return-data decoding for the root registry
//! contract:
//!
//! ```solidity
//! function publishRoot(bytes32 root, string termId, uint256 totalStudents) external;
//! function getRoot(bytes32 root) external view returns (
//!     bool published, string termId, uint256 totalStudents,
//!     uint256 publishedAt, address publisher
//! );
//! ```
//!
//! Selectors are the first four bytes of keccak-256 of the signature.
//! Reverts carrying `Error(string)` are decoded to their reason.

use alloy_primitives::{keccak256, Address, Bytes, U256};
use mcred_core::{PublishCall, RootCommitment, RootLookup, TermId};
use thiserror::Error;

pub const PUBLISH_ROOT_SIGNATURE: &str = "publishRoot(bytes32,string,uint256)";
pub const GET_ROOT_SIGNATURE: &str = "getRoot(bytes32)";
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

const WORD: usize = 32;

/// Return data that does not decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("return data truncated at byte {0}")]
    Truncated(usize),
    #[error("word {0} is not a valid {1}")]
    InvalidWord(usize, &'static str),
    #[error("string is not UTF-8")]
    InvalidUtf8,
}

/// Function selector of a signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn uint_word(value: U256) -> [u8; WORD] {
    value.to_be_bytes::<WORD>()
}

/// Calldata for `publishRoot`.
pub fn encode_publish_root(call: &PublishCall) -> Bytes {
    let term = call.term_id.as_str().as_bytes();
    let padding = (WORD - term.len() % WORD) % WORD;

    let mut out = Vec::with_capacity(4 + 4 * WORD + term.len() + padding);
    out.extend_from_slice(&selector(PUBLISH_ROOT_SIGNATURE));
    out.extend_from_slice(call.root.as_bytes());
    // Head is three words, so the string body starts at 0x60.
    out.extend_from_slice(&uint_word(U256::from(3 * WORD as u64)));
    out.extend_from_slice(&uint_word(call.total_students));
    out.extend_from_slice(&uint_word(U256::from(term.len() as u64)));
    out.extend_from_slice(term);
    out.resize(out.len() + padding, 0);
    Bytes::from(out)
}

/// Calldata for `getRoot`.
pub fn encode_get_root(root: &RootCommitment) -> Bytes {
    let mut out = Vec::with_capacity(4 + WORD);
    out.extend_from_slice(&selector(GET_ROOT_SIGNATURE));
    out.extend_from_slice(root.as_bytes());
    Bytes::from(out)
}

fn word(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    let start = index.checked_mul(WORD).ok_or(AbiError::Truncated(usize::MAX))?;
    word_at(data, start)
}

/// Bytes `start..start + len`, with the end computed without overflow.
fn span(data: &[u8], start: usize, len: usize) -> Result<&[u8], AbiError> {
    let end = start.checked_add(len).ok_or(AbiError::Truncated(start))?;
    data.get(start..end).ok_or(AbiError::Truncated(start))
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    span(data, offset, WORD)
}

fn read_u64(w: &[u8], index: usize) -> Result<u64, AbiError> {
    if w[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::InvalidWord(index, "u64"));
    }
    let mut be = [0u8; 8];
    be.copy_from_slice(&w[24..]);
    Ok(u64::from_be_bytes(be))
}

fn read_usize(w: &[u8], index: usize) -> Result<usize, AbiError> {
    usize::try_from(read_u64(w, index)?).map_err(|_| AbiError::InvalidWord(index, "offset"))
}

fn read_bool(w: &[u8], index: usize) -> Result<bool, AbiError> {
    if w[..31].iter().any(|b| *b != 0) || w[31] > 1 {
        return Err(AbiError::InvalidWord(index, "bool"));
    }
    Ok(w[31] == 1)
}

fn read_address(w: &[u8], index: usize) -> Result<Address, AbiError> {
    if w[..12].iter().any(|b| *b != 0) {
        return Err(AbiError::InvalidWord(index, "address"));
    }
    Ok(Address::from_slice(&w[12..]))
}

fn read_string(data: &[u8], offset: usize) -> Result<String, AbiError> {
    let len = read_usize(word_at(data, offset)?, offset / WORD)?;
    let start = offset.checked_add(WORD).ok_or(AbiError::Truncated(offset))?;
    let bytes = span(data, start, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
}

/// Decode `getRoot` return data.
pub fn decode_get_root(data: &[u8]) -> Result<RootLookup, AbiError> {
    let published = read_bool(word(data, 0)?, 0)?;
    let term_offset = read_usize(word(data, 1)?, 1)?;
    let total_students = U256::from_be_slice(word(data, 2)?);
    let published_at = read_u64(word(data, 3)?, 3)?;
    let publisher = read_address(word(data, 4)?, 4)?;
    let term_id = read_string(data, term_offset)?;

    Ok(RootLookup {
        published,
        term_id: (!term_id.is_empty()).then_some(term_id),
        total_students,
        published_at: (published_at > 0).then_some(published_at),
        publisher: (publisher != Address::ZERO).then_some(publisher),
    })
}

/// Decode `publishRoot` calldata. Bytes after the encoded arguments are
/// ignored.
pub fn decode_publish_root(data: &[u8]) -> Result<PublishCall, AbiError> {
    let args = data
        .strip_prefix(&selector(PUBLISH_ROOT_SIGNATURE))
        .ok_or(AbiError::Truncated(0))?;
    let mut root = [0u8; WORD];
    root.copy_from_slice(word(args, 0)?);
    let term_offset = read_usize(word(args, 1)?, 1)?;
    let total_students = U256::from_be_slice(word(args, 2)?);
    let term_id =
        TermId::new(read_string(args, term_offset)?)
            .map_err(|_| AbiError::InvalidWord(1, "term id"))?;
    Ok(PublishCall {
        root: RootCommitment::from_bytes(root),
        term_id,
        total_students,
    })
}

/// The reason carried by an `Error(string)` revert, if `data` is one.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let body = data.strip_prefix(&ERROR_STRING_SELECTOR)?;
    let offset = read_usize(word(body, 0).ok()?, 0).ok()?;
    read_string(body, offset).ok()
}

/// Encode an `Error(string)` revert payload.
pub fn encode_revert_reason(reason: &str) -> Bytes {
    let bytes = reason.as_bytes();
    let padding = (WORD - bytes.len() % WORD) % WORD;
    let mut out = Vec::with_capacity(4 + 2 * WORD + bytes.len() + padding);
    out.extend_from_slice(&ERROR_STRING_SELECTOR);
    out.extend_from_slice(&uint_word(U256::from(WORD as u64)));
    out.extend_from_slice(&uint_word(U256::from(bytes.len() as u64)));
    out.extend_from_slice(bytes);
    out.resize(out.len() + padding, 0);
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcred_core::TermId;

    #[test]
    fn known_selectors() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("Error(string)"), ERROR_STRING_SELECTOR);
    }

    #[test]
    fn publish_root_layout() {
        let call = PublishCall {
            root: RootCommitment::from_bytes([0x11; 32]),
            term_id: TermId::new("2024-FALL").unwrap(),
            total_students: U256::from(40u64),
        };
        let data = encode_publish_root(&call);
        assert_eq!(data.len(), 4 + 5 * 32);
        assert_eq!(&data[..4], &selector(PUBLISH_ROOT_SIGNATURE));
        assert_eq!(&data[4..36], &[0x11; 32]);
        assert_eq!(data[36 + 31], 0x60);
        assert_eq!(data[68 + 31], 40);
        assert_eq!(data[100 + 31], 9);
        assert_eq!(&data[132..141], b"2024-FALL");
        assert!(data[141..].iter().all(|b| *b == 0));
    }

    #[test]
    fn publish_root_decodes_with_trailing_bytes() {
        let call = PublishCall {
            root: RootCommitment::from_bytes([0x22; 32]),
            term_id: TermId::new("2025-SPRING").unwrap(),
            total_students: U256::from(7u64),
        };
        let mut data = encode_publish_root(&call).to_vec();
        data.extend_from_slice(&[0xff; 8]);
        assert_eq!(decode_publish_root(&data).unwrap(), call);
        assert!(decode_publish_root(&data[4..]).is_err());
    }

    #[test]
    fn get_root_calldata() {
        let root = RootCommitment::from_bytes([0xab; 32]);
        let data = encode_get_root(&root);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[4..], root.as_bytes());
    }

    fn get_root_return(
        published: bool,
        term: &str,
        total: u64,
        at: u64,
        publisher: Address,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&uint_word(U256::from(published as u64)));
        out.extend_from_slice(&uint_word(U256::from(5 * 32u64)));
        out.extend_from_slice(&uint_word(U256::from(total)));
        out.extend_from_slice(&uint_word(U256::from(at)));
        let mut addr = [0u8; 32];
        addr[12..].copy_from_slice(publisher.as_slice());
        out.extend_from_slice(&addr);
        out.extend_from_slice(&uint_word(U256::from(term.len() as u64)));
        out.extend_from_slice(term.as_bytes());
        out.resize(out.len() + (32 - term.len() % 32) % 32, 0);
        out
    }

    #[test]
    fn decodes_published_root() {
        let publisher = Address::repeat_byte(0x42);
        let data = get_root_return(true, "2024-FALL", 40, 1_700_000_000, publisher);
        let lookup = decode_get_root(&data).unwrap();
        assert!(lookup.published);
        assert_eq!(lookup.term_id.as_deref(), Some("2024-FALL"));
        assert_eq!(lookup.total_students, U256::from(40u64));
        assert_eq!(lookup.published_at, Some(1_700_000_000));
        assert_eq!(lookup.publisher, Some(publisher));
    }

    #[test]
    fn decodes_unpublished_root() {
        let data = get_root_return(false, "", 0, 0, Address::ZERO);
        let lookup = decode_get_root(&data).unwrap();
        assert!(!lookup.published);
        assert!(lookup.term_id.is_none());
        assert!(lookup.publisher.is_none());
    }

    #[test]
    fn truncated_return_is_rejected() {
        let data = get_root_return(true, "T", 1, 1, Address::repeat_byte(1));
        assert!(matches!(
            decode_get_root(&data[..100]),
            Err(AbiError::Truncated(_))
        ));
    }

    #[test]
    fn revert_reason_round_trip() {
        let payload = encode_revert_reason("root already published");
        assert_eq!(
            decode_revert_reason(&payload).as_deref(),
            Some("root already published")
        );
        assert!(decode_revert_reason(&[0xde, 0xad]).is_none());
    }

    #[test]
    fn oversized_string_length_is_truncated() {
        let mut data = get_root_return(true, "2024-FALL", 40, 1, Address::repeat_byte(0x42));
        data[160..192].copy_from_slice(&uint_word(U256::from(u64::MAX - 8)));
        assert!(decode_get_root(&data).is_err());
    }

    #[test]
    fn oversized_offsets_are_rejected() {
        let mut payload = encode_revert_reason("root already published").to_vec();
        payload[4..36].copy_from_slice(&uint_word(U256::from(u64::MAX - 8)));
        assert!(decode_revert_reason(&payload).is_none());

        let mut data = get_root_return(true, "2024-FALL", 40, 1, Address::repeat_byte(0x42));
        data[32..64].copy_from_slice(&uint_word(U256::from(u64::MAX - 8)));
        assert!(decode_get_root(&data).is_err());
    }
}
