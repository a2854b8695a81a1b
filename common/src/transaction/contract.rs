use crate::crypto::{hash, Address, ADDRESS_SIZE};

// RLP encoding of an unsigned integer: minimal big-endian bytes
fn rlp_u64(value: u64, out: &mut Vec<u8>) {
    match value {
        0 => out.push(0x80),
        1..=0x7f => out.push(value as u8),
        _ => {
            let bytes = value.to_be_bytes();
            let skip = bytes.iter().take_while(|b| **b == 0).count();
            out.push(0x80 + (8 - skip) as u8);
            out.extend_from_slice(&bytes[skip..]);
        }
    }
}

/// Address of a contract created by `sender` at `nonce`:
/// `keccak256(rlp([sender, nonce]))[12..]`
pub fn contract_address(sender: &Address, nonce: u64) -> Address {
    let mut payload = Vec::with_capacity(1 + ADDRESS_SIZE + 9);
    payload.push(0x80 + ADDRESS_SIZE as u8);
    payload.extend_from_slice(sender.as_bytes());
    rlp_u64(nonce, &mut payload);

    // Payload is at most 30 bytes so the short list form always applies
    let mut encoded = Vec::with_capacity(1 + payload.len());
    encoded.push(0xc0 + payload.len() as u8);
    encoded.extend_from_slice(&payload);

    let digest = hash(&encoded);
    let mut bytes = [0u8; ADDRESS_SIZE];
    bytes.copy_from_slice(&digest.as_bytes()[12..]);
    Address::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_contract_addresses() {
        let sender: Address = "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"
            .parse()
            .unwrap();
        assert_eq!(
            contract_address(&sender, 0).to_string(),
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
        );
        assert_eq!(
            contract_address(&sender, 1).to_string(),
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8"
        );
    }

    #[test]
    fn test_large_nonce_is_stable() {
        let sender = Address::new([1; ADDRESS_SIZE]);
        assert_eq!(
            contract_address(&sender, u64::MAX),
            contract_address(&sender, u64::MAX)
        );
        assert_ne!(
            contract_address(&sender, 0x80),
            contract_address(&sender, 0x7f)
        );
    }
}
