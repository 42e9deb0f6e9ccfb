//! Store-path resolution and the cashu address codec.

use std::env;
use std::path::PathBuf;

use crate::error::WalletError;

/// Environment override for the wallet store location.
pub const WALLET_DB_ENV: &str = "CASHU_WALLET_DB";

const WALLET_DIR: &str = ".cashu-silent";
const WALLET_DB_FILE: &str = "wallet.db";

/// Resolve the wallet store path: `CASHU_WALLET_DB` when set, otherwise
/// `~/.cashu-silent/wallet.db`.
pub fn wallet_db_path() -> Result<PathBuf, WalletError> {
    if let Ok(path) = env::var(WALLET_DB_ENV) {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| WalletError::StoreFailure("could not determine home directory".into()))?;
    Ok(home.join(WALLET_DIR).join(WALLET_DB_FILE))
}

/// A parsed `mint_url:scan_pub:spend_pub` address.
///
/// Keys are kept as compressed bytes; curve validity is only checked when a
/// payment actually needs the points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashuAddress {
    pub mint_url: String,
    pub scan_pubkey: [u8; 33],
    pub spend_pubkey: [u8; 33],
}

/// Format an address for display/sharing.
pub fn format_address(mint_url: &str, scan_pubkey: &[u8; 33], spend_pubkey: &[u8; 33]) -> String {
    format!(
        "{}:{}:{}",
        mint_url.trim_end_matches('/'),
        hex::encode(scan_pubkey),
        hex::encode(spend_pubkey)
    )
}

/// Parse an address. The mint URL may itself contain colons, so the two key
/// fields are taken from the *last* two separators.
pub fn parse_address(input: &str) -> Result<CashuAddress, WalletError> {
    let mut parts = input.rsplitn(3, ':');
    let spend_hex = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WalletError::AddressParse("missing key separators".into()))?;
    let scan_hex = parts
        .next()
        .ok_or_else(|| WalletError::AddressParse("missing key separators".into()))?;
    let mint_url = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WalletError::AddressParse("missing mint url".into()))?;

    Ok(CashuAddress {
        mint_url: mint_url.to_string(),
        scan_pubkey: parse_pubkey_hex(scan_hex, "scan")?,
        spend_pubkey: parse_pubkey_hex(spend_hex, "spend")?,
    })
}

fn parse_pubkey_hex(input: &str, which: &str) -> Result<[u8; 33], WalletError> {
    if input.len() != 66 {
        return Err(WalletError::AddressParse(format!(
            "{which} key must be 66 hex chars, got {}",
            input.len()
        )));
    }
    let bytes = hex::decode(input)
        .map_err(|_| WalletError::AddressParse(format!("{which} key is not valid hex")))?;
    let mut key = [0u8; 33];
    key.copy_from_slice(&bytes);
    if key[0] != 0x02 && key[0] != 0x03 {
        return Err(WalletError::AddressParse(format!(
            "{which} key has invalid prefix {:#04x}",
            key[0]
        )));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(prefix: u8, body: u8) -> [u8; 33] {
        let mut k = [body; 33];
        k[0] = prefix;
        k
    }

    #[test]
    fn address_round_trip() {
        let scan = key(0x02, 0xaa);
        let spend = key(0x03, 0xbb);
        let formatted = format_address("http://m:8085", &scan, &spend);
        let parsed = parse_address(&formatted).unwrap();
        assert_eq!(parsed.mint_url, "http://m:8085");
        assert_eq!(parsed.scan_pubkey, scan);
        assert_eq!(parsed.spend_pubkey, spend);
    }

    #[test]
    fn parse_keeps_colons_in_mint_url() {
        let addr = format!(
            "https://mint.example.com:3338:{}:{}",
            hex::encode(key(0x02, 0x11)),
            hex::encode(key(0x03, 0x22))
        );
        let parsed = parse_address(&addr).unwrap();
        assert_eq!(parsed.mint_url, "https://mint.example.com:3338");
    }

    #[test]
    fn parse_rejects_short_keys() {
        let err = parse_address("http://m:8085:02ab:03cd").unwrap_err();
        assert!(matches!(err, WalletError::AddressParse(_)));
    }

    #[test]
    fn parse_rejects_bad_prefix() {
        let addr = format!(
            "http://m:8085:{}:{}",
            hex::encode(key(0x04, 0xaa)),
            hex::encode(key(0x03, 0xbb))
        );
        let err = parse_address(&addr).unwrap_err();
        assert!(matches!(err, WalletError::AddressParse(_)));
    }

    #[test]
    fn parse_rejects_non_hex() {
        let addr = format!("http://m:8085:02{}:{}", "zz".repeat(32), hex::encode(key(0x03, 0xbb)));
        let err = parse_address(&addr).unwrap_err();
        assert!(matches!(err, WalletError::AddressParse(_)));
    }

    #[test]
    fn parse_rejects_missing_separators() {
        assert!(parse_address("http://m.example").is_err());
        assert!(parse_address("").is_err());
    }
}
