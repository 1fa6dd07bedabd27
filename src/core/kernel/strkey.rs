use crate::core::errors::LedgerError;
use crc::{Crc, CRC_16_XMODEM};
use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Version byte for `G...` account ids.
pub const VERSION_ACCOUNT_ID: u8 = 6 << 3;
/// Version byte for `S...` secret seeds.
pub const VERSION_SEED: u8 = 18 << 3;

const CHECKSUM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC16-XModem (poly 0x1021, init 0).
pub fn crc16(data: &[u8]) -> u16 {
    CHECKSUM.checksum(data)
}

/// Encode a 32-byte payload under the given version byte.
pub fn encode(version: u8, payload: &[u8; 32]) -> String {
    let mut raw = Vec::with_capacity(35);
    raw.push(version);
    raw.extend_from_slice(payload);
    let checksum = crc16(&raw);
    raw.extend_from_slice(&checksum.to_le_bytes());
    BASE32_NOPAD.encode(&raw)
}

/// Decode a strkey, checking its version byte and checksum.
pub fn decode(version: u8, key: &str) -> Option<[u8; 32]> {
    if key.len() != 56 {
        return None;
    }
    let raw = BASE32_NOPAD.decode(key.as_bytes()).ok()?;
    if raw.len() != 35 || raw[0] != version {
        return None;
    }
    let (body, checksum) = raw.split_at(33);
    if crc16(body).to_le_bytes() != [checksum[0], checksum[1]] {
        return None;
    }
    let mut payload = [0u8; 32];
    payload.copy_from_slice(&body[1..]);
    Some(payload)
}

pub fn validate_address(address: &str) -> Result<(), LedgerError> {
    decode(VERSION_ACCOUNT_ID, address)
        .map(|_| ())
        .ok_or_else(|| LedgerError::InvalidAddress(address.to_string()))
}

/// Seeds are never echoed back in the error.
pub fn validate_seed(seed: &str) -> Result<(), LedgerError> {
    decode(VERSION_SEED, seed)
        .map(|_| ())
        .ok_or_else(|| LedgerError::InvalidSeed("malformed secret seed".to_string()))
}

/// An Ed25519 public key in its `G...` strkey form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(VERSION_ACCOUNT_ID, &self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

impl FromStr for AccountId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(VERSION_ACCOUNT_ID, s)
            .map(Self)
            .ok_or_else(|| LedgerError::InvalidAddress(s.to_string()))
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "GBY7XDYKXBDHQ2B523SF7K6BNJNRYHVQMWY7AYAEKTYLCQMYVFHL57UM";
    const SEED: &str = "SAFOI5YIH5MXO6HCICLBG3UYOER6PDYQXHP47JUB7XNWHNT2YISAOMAQ";

    #[test]
    fn test_crc16_xmodem_check_value() {
        assert_eq!(crc16(b"123456789"), 0x31c3);
    }

    #[test]
    fn test_zero_key_encoding() {
        assert_eq!(
            encode(VERSION_ACCOUNT_ID, &[0u8; 32]),
            "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF"
        );
    }

    #[test]
    fn test_round_trip_known_keys() {
        let payload = decode(VERSION_ACCOUNT_ID, ADDRESS).unwrap();
        assert_eq!(encode(VERSION_ACCOUNT_ID, &payload), ADDRESS);

        let seed = decode(VERSION_SEED, SEED).unwrap();
        assert_eq!(encode(VERSION_SEED, &seed), SEED);
    }

    #[test]
    fn test_rejects_wrong_version_and_checksum() {
        assert!(decode(VERSION_SEED, ADDRESS).is_none());
        assert!(decode(VERSION_ACCOUNT_ID, SEED).is_none());

        let mut corrupted = ADDRESS.to_string();
        corrupted.replace_range(10..11, if &ADDRESS[10..11] == "A" { "B" } else { "A" });
        assert!(validate_address(&corrupted).is_err());
        assert!(validate_address("GABC").is_err());
        assert!(validate_address("not-base32-at-all-not-base32-at-all-not-base32-at-all!!").is_err());
        assert!(validate_address(&ADDRESS.to_lowercase()).is_err());
    }

    #[test]
    fn test_account_id_parse_and_display() {
        let id: AccountId = ADDRESS.parse().unwrap();
        assert_eq!(id.to_string(), ADDRESS);
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", ADDRESS));
    }
}
