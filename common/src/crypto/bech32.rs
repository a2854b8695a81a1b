// BIP-173 bech32 encoding, used to render addresses with the chain prefixes.

use super::CryptoError;

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const GENERATOR: [u32; 5] = [
    0x3b6a_57b2,
    0x2650_8e6d,
    0x1ea1_19fa,
    0x3d42_33dd,
    0x2a14_62b3,
];
const SEPARATOR: char = '1';
const CHECKSUM_LEN: usize = 6;
const MAX_LEN: usize = 90;

fn polymod(values: &[u8]) -> u32 {
    let mut chk: u32 = 1;
    for value in values {
        let top = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ (*value as u32);
        for (i, generator) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(hrp.len() * 2 + 1);
    result.extend(hrp.iter().map(|c| c >> 5));
    result.push(0);
    result.extend(hrp.iter().map(|c| c & 31));
    result
}

fn create_checksum(hrp: &[u8], data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0u8; CHECKSUM_LEN]);
    let pm = polymod(&values) ^ 1;

    let mut checksum = [0u8; CHECKSUM_LEN];
    for (i, c) in checksum.iter_mut().enumerate() {
        *c = ((pm >> (5 * (5 - i))) & 31) as u8;
    }
    checksum
}

fn verify_checksum(hrp: &[u8], data: &[u8]) -> bool {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    polymod(&values) == 1
}

/// Regroup a stream of `from` bits values into `to` bits values
pub fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>, CryptoError> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max_value: u32 = (1 << to) - 1;
    let max_acc: u32 = (1 << (from + to - 1)) - 1;
    let mut result = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for value in data {
        let v = *value as u32;
        if v >> from != 0 {
            return Err(CryptoError::Bech32(format!("invalid {}-bit value {}", from, v)));
        }
        acc = ((acc << from) | v) & max_acc;
        bits += from;
        while bits >= to {
            bits -= to;
            result.push(((acc >> bits) & max_value) as u8);
        }
    }

    if pad {
        if bits > 0 {
            result.push(((acc << (to - bits)) & max_value) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & max_value) != 0 {
        return Err(CryptoError::Bech32("invalid padding".to_string()));
    }

    Ok(result)
}

fn check_hrp(hrp: &str) -> Result<(), CryptoError> {
    if hrp.is_empty() {
        return Err(CryptoError::Bech32("empty human readable part".to_string()));
    }
    if hrp.bytes().any(|c| !(33..=126).contains(&c)) {
        return Err(CryptoError::Bech32(
            "invalid character in human readable part".to_string(),
        ));
    }
    Ok(())
}

pub fn encode(hrp: &str, data: &[u8]) -> Result<String, CryptoError> {
    check_hrp(hrp)?;
    let hrp = hrp.to_lowercase();
    let data = convert_bits(data, 8, 5, true)?;
    let checksum = create_checksum(hrp.as_bytes(), &data);

    let mut result = String::with_capacity(hrp.len() + 1 + data.len() + CHECKSUM_LEN);
    result.push_str(&hrp);
    result.push(SEPARATOR);
    for value in data.iter().chain(checksum.iter()) {
        result.push(CHARSET[*value as usize] as char);
    }

    if result.len() > MAX_LEN {
        return Err(CryptoError::Bech32(format!(
            "encoded length {} exceeds {}",
            result.len(),
            MAX_LEN
        )));
    }
    Ok(result)
}

/// Decode a bech32 string into its prefix and 8-bit payload
pub fn decode(value: &str) -> Result<(String, Vec<u8>), CryptoError> {
    if value.len() > MAX_LEN {
        return Err(CryptoError::Bech32("string too long".to_string()));
    }

    let has_lower = value.bytes().any(|c| c.is_ascii_lowercase());
    let has_upper = value.bytes().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(CryptoError::Bech32("mixed case".to_string()));
    }
    let value = value.to_lowercase();

    let pos = value
        .rfind(SEPARATOR)
        .ok_or_else(|| CryptoError::Bech32("missing separator".to_string()))?;
    if pos == 0 || pos + 1 + CHECKSUM_LEN > value.len() {
        return Err(CryptoError::Bech32("invalid separator position".to_string()));
    }

    let hrp = &value[..pos];
    check_hrp(hrp)?;

    let mut data = Vec::with_capacity(value.len() - pos - 1);
    for c in value[pos + 1..].bytes() {
        let index = CHARSET
            .iter()
            .position(|x| *x == c)
            .ok_or_else(|| CryptoError::Bech32(format!("invalid character '{}'", c as char)))?;
        data.push(index as u8);
    }

    if !verify_checksum(hrp.as_bytes(), &data) {
        return Err(CryptoError::Bech32("invalid checksum".to_string()));
    }

    data.truncate(data.len() - CHECKSUM_LEN);
    let bytes = convert_bits(&data, 5, 8, false)?;
    Ok((hrp.to_string(), bytes))
}
