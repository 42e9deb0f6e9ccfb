//! SQLite-backed persistent wallet state.
//!
//! One file holds everything the wallet owns: the mnemonic, the silent
//! payment key pair, the proof set, and cached mint metadata. Every mutation
//! is a single statement; there is no cross-table transactionality and none
//! is required (single-writer store).

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::crypto::SilentKeys;
use crate::error::WalletError;
use crate::types::{CachedMintMetadata, KeySet, KeySetInfo, Proof};

/// Cached mint metadata is served for this long before a refetch.
pub const MINT_METADATA_TTL_SECS: i64 = 3600;

pub struct WalletDb {
    conn: Connection,
}

impl WalletDb {
    /// Open or create the wallet database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WalletError::StoreFailure(format!("create wallet dir: {e}")))?;
        }
        let conn = Connection::open(path.as_ref())?;
        let db = Self { conn };
        db.init_schema()?;
        info!("opened wallet store at {:?}", path.as_ref());
        Ok(db)
    }

    /// In-memory database for tests.
    pub fn in_memory() -> Result<Self, WalletError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Close the store, surfacing any pending error.
    pub fn close(self) -> Result<(), WalletError> {
        self.conn
            .close()
            .map_err(|(_, e)| WalletError::StoreFailure(e.to_string()))
    }

    fn init_schema(&self) -> Result<(), WalletError> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS proofs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount INTEGER NOT NULL,
                secret TEXT NOT NULL UNIQUE,
                c TEXT NOT NULL,
                keyset_id TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_proofs_secret ON proofs(secret);

            CREATE TABLE IF NOT EXISTS silent_payment_keys (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                scan_secret TEXT NOT NULL,
                spend_secret TEXT NOT NULL,
                scan_pubkey TEXT NOT NULL,
                spend_pubkey TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );

            CREATE TABLE IF NOT EXISTS mint_keysets (
                mint_url TEXT PRIMARY KEY,
                keysets_json TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS mint_keys (
                mint_url TEXT NOT NULL,
                keyset_id TEXT NOT NULL,
                keys_json TEXT NOT NULL,
                cached_at INTEGER NOT NULL,
                PRIMARY KEY (mint_url, keyset_id)
            );

            CREATE TABLE IF NOT EXISTS mint_info (
                mint_url TEXT PRIMARY KEY,
                info_json TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            );
            "#,
            )
            .map_err(|e| WalletError::StoreFailure(format!("schema init failed: {e}")))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Proofs
    // ------------------------------------------------------------------

    /// Sum of all stored proof amounts; 0 when empty.
    pub fn get_balance(&self) -> Result<u64, WalletError> {
        let balance: i64 =
            self.conn
                .query_row("SELECT COALESCE(SUM(amount), 0) FROM proofs", [], |row| {
                    row.get(0)
                })?;
        Ok(balance as u64)
    }

    /// Upsert proofs by secret; a duplicate secret replaces the old row.
    pub fn add_proofs(&self, proofs: &[Proof]) -> Result<(), WalletError> {
        let mut stmt = self.conn.prepare(
            r#"
            INSERT INTO proofs (amount, secret, c, keyset_id)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(secret) DO UPDATE SET
                amount = excluded.amount,
                c = excluded.c,
                keyset_id = excluded.keyset_id
            "#,
        )?;
        for proof in proofs {
            stmt.execute(params![
                proof.amount as i64,
                proof.secret,
                proof.c,
                proof.keyset_id
            ])?;
        }
        debug!("stored {} proof(s)", proofs.len());
        Ok(())
    }

    /// Delete proofs by secret; silent when nothing matches.
    pub fn remove_proofs(&self, secrets: &[String]) -> Result<(), WalletError> {
        let mut stmt = self.conn.prepare("DELETE FROM proofs WHERE secret = ?1")?;
        let mut removed = 0;
        for secret in secrets {
            removed += stmt.execute(params![secret])?;
        }
        debug!("removed {removed} proof(s)");
        Ok(())
    }

    /// All stored proofs, smallest denominations first.
    pub fn list_proofs(&self) -> Result<Vec<Proof>, WalletError> {
        let mut stmt = self.conn.prepare(
            "SELECT amount, secret, c, keyset_id FROM proofs ORDER BY amount ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Proof {
                amount: row.get::<_, i64>(0)? as u64,
                secret: row.get(1)?,
                c: row.get(2)?,
                keyset_id: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ------------------------------------------------------------------
    // Config / key material
    // ------------------------------------------------------------------

    pub fn get_mnemonic(&self) -> Result<Option<String>, WalletError> {
        self.conn
            .query_row(
                "SELECT value FROM config WHERE key = 'mnemonic'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Insert-only: the mnemonic is written once for the lifetime of the
    /// wallet and never replaced.
    pub fn save_mnemonic(&self, mnemonic: &str) -> Result<(), WalletError> {
        if self.get_mnemonic()?.is_some() {
            return Err(WalletError::StoreFailure(
                "a mnemonic is already stored".into(),
            ));
        }
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES ('mnemonic', ?1)",
            params![mnemonic],
        )?;
        Ok(())
    }

    pub fn get_silent_keys(&self) -> Result<Option<SilentKeys>, WalletError> {
        let row = self
            .conn
            .query_row(
                "SELECT scan_secret, spend_secret, scan_pubkey, spend_pubkey
                 FROM silent_payment_keys WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((scan_secret, spend_secret, scan_pub, spend_pub)) = row else {
            return Ok(None);
        };

        let keys = SilentKeys::from_secrets(
            &decode_key_hex::<32>(&scan_secret)?,
            &decode_key_hex::<32>(&spend_secret)?,
        )?;
        let stored_scan = decode_key_hex::<33>(&scan_pub)?;
        let stored_spend = decode_key_hex::<33>(&spend_pub)?;
        if !keys.pubkeys_match(&stored_scan, &stored_spend) {
            return Err(WalletError::StoreFailure(
                "silent payment key material is corrupted".into(),
            ));
        }
        Ok(Some(keys))
    }

    /// Singleton upsert.
    pub fn save_silent_keys(&self, keys: &SilentKeys) -> Result<(), WalletError> {
        let (scan_secret, spend_secret) = keys.export_secrets();
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO silent_payment_keys
                (id, scan_secret, spend_secret, scan_pubkey, spend_pubkey)
            VALUES (1, ?1, ?2, ?3, ?4)
            "#,
            params![
                hex::encode(scan_secret),
                hex::encode(spend_secret),
                hex::encode(keys.scan_pubkey),
                hex::encode(keys.spend_pubkey)
            ],
        )?;
        info!("silent payment keys persisted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mint metadata cache
    // ------------------------------------------------------------------

    /// Cached metadata for `mint_url`, or `None` when absent or older than
    /// [`MINT_METADATA_TTL_SECS`].
    pub fn get_cached_mint_meta(
        &self,
        mint_url: &str,
        now: i64,
    ) -> Result<Option<CachedMintMetadata>, WalletError> {
        let keysets_row = self
            .conn
            .query_row(
                "SELECT keysets_json, cached_at FROM mint_keysets WHERE mint_url = ?1",
                params![mint_url],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let Some((keysets_json, cached_at)) = keysets_row else {
            return Ok(None);
        };
        if now - cached_at >= MINT_METADATA_TTL_SECS {
            debug!("mint metadata cache for {mint_url} expired");
            return Ok(None);
        }

        let keysets: Vec<KeySetInfo> = serde_json::from_str(&keysets_json)
            .map_err(|e| WalletError::StoreFailure(format!("corrupt keysets cache: {e}")))?;

        let mut stmt = self
            .conn
            .prepare("SELECT keys_json FROM mint_keys WHERE mint_url = ?1 ORDER BY keyset_id")?;
        let keys = stmt
            .query_map(params![mint_url], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?
            .iter()
            .map(|json| {
                serde_json::from_str::<KeySet>(json)
                    .map_err(|e| WalletError::StoreFailure(format!("corrupt keys cache: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let info_json: Option<String> = self
            .conn
            .query_row(
                "SELECT info_json FROM mint_info WHERE mint_url = ?1",
                params![mint_url],
                |row| row.get(0),
            )
            .optional()?;
        let info = match info_json {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| WalletError::StoreFailure(format!("corrupt info cache: {e}")))?,
            None => serde_json::Value::Null,
        };

        Ok(Some(CachedMintMetadata {
            keysets,
            keys,
            info,
            cached_at,
        }))
    }

    /// Replace all cached metadata for `mint_url`.
    pub fn cache_mint_meta(
        &self,
        mint_url: &str,
        meta: &CachedMintMetadata,
    ) -> Result<(), WalletError> {
        let keysets_json = serde_json::to_string(&meta.keysets)
            .map_err(|e| WalletError::StoreFailure(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO mint_keysets (mint_url, keysets_json, cached_at) VALUES (?1, ?2, ?3)",
            params![mint_url, keysets_json, meta.cached_at],
        )?;

        self.conn.execute(
            "DELETE FROM mint_keys WHERE mint_url = ?1",
            params![mint_url],
        )?;
        for keyset in &meta.keys {
            let keys_json = serde_json::to_string(keyset)
                .map_err(|e| WalletError::StoreFailure(e.to_string()))?;
            self.conn.execute(
                "INSERT INTO mint_keys (mint_url, keyset_id, keys_json, cached_at) VALUES (?1, ?2, ?3, ?4)",
                params![mint_url, keyset.id, keys_json, meta.cached_at],
            )?;
        }

        let info_json = serde_json::to_string(&meta.info)
            .map_err(|e| WalletError::StoreFailure(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO mint_info (mint_url, info_json, cached_at) VALUES (?1, ?2, ?3)",
            params![mint_url, info_json, meta.cached_at],
        )?;

        debug!("cached mint metadata for {mint_url}");
        Ok(())
    }
}

fn decode_key_hex<const N: usize>(input: &str) -> Result<[u8; N], WalletError> {
    let bytes = hex::decode(input)
        .map_err(|e| WalletError::StoreFailure(format!("corrupt key hex: {e}")))?;
    let array: [u8; N] = bytes
        .try_into()
        .map_err(|_| WalletError::StoreFailure("corrupt key length".into()))?;
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof(amount: u64, secret: &str) -> Proof {
        Proof {
            keyset_id: "00ad268c4d1f5826".into(),
            amount,
            secret: secret.into(),
            c: "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea".into(),
        }
    }

    #[test]
    fn balance_starts_at_zero() {
        let db = WalletDb::in_memory().unwrap();
        assert_eq!(db.get_balance().unwrap(), 0);
    }

    #[test]
    fn add_list_remove_proofs() {
        let db = WalletDb::in_memory().unwrap();
        db.add_proofs(&[proof(1, "a"), proof(4, "b"), proof(2, "c")])
            .unwrap();
        assert_eq!(db.get_balance().unwrap(), 7);

        let listed = db.list_proofs().unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].amount, 1);
        assert_eq!(listed[2].amount, 4);

        db.remove_proofs(&["b".into(), "missing".into()]).unwrap();
        assert_eq!(db.get_balance().unwrap(), 3);
    }

    #[test]
    fn duplicate_secret_replaces() {
        let db = WalletDb::in_memory().unwrap();
        db.add_proofs(&[proof(1, "a")]).unwrap();
        db.add_proofs(&[proof(8, "a")]).unwrap();
        let listed = db.list_proofs().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].amount, 8);
    }

    #[test]
    fn mnemonic_is_insert_once() {
        let db = WalletDb::in_memory().unwrap();
        assert!(db.get_mnemonic().unwrap().is_none());
        db.save_mnemonic("abandon ability able").unwrap();
        assert_eq!(
            db.get_mnemonic().unwrap().as_deref(),
            Some("abandon ability able")
        );
        assert!(db.save_mnemonic("other words").is_err());
    }

    #[test]
    fn silent_keys_round_trip() {
        let db = WalletDb::in_memory().unwrap();
        assert!(db.get_silent_keys().unwrap().is_none());

        let keys = SilentKeys::from_seed(&[5u8; 64]).unwrap();
        db.save_silent_keys(&keys).unwrap();

        let loaded = db.get_silent_keys().unwrap().unwrap();
        assert!(loaded.pubkeys_match(&keys.scan_pubkey, &keys.spend_pubkey));
    }

    #[test]
    fn mint_metadata_ttl_is_enforced() {
        let db = WalletDb::in_memory().unwrap();
        let meta = CachedMintMetadata {
            keysets: vec![KeySetInfo {
                id: "00ad268c4d1f5826".into(),
                unit: "sat".into(),
                active: true,
                input_fee_ppk: None,
            }],
            keys: vec![],
            info: serde_json::json!({"name": "test mint"}),
            cached_at: 1_000,
        };
        db.cache_mint_meta("http://m:3338", &meta).unwrap();

        let fresh = db
            .get_cached_mint_meta("http://m:3338", 1_000 + MINT_METADATA_TTL_SECS - 1)
            .unwrap();
        assert!(fresh.is_some());
        assert_eq!(fresh.unwrap().keysets[0].unit, "sat");

        let stale = db
            .get_cached_mint_meta("http://m:3338", 1_000 + MINT_METADATA_TTL_SECS)
            .unwrap();
        assert!(stale.is_none());

        let other = db.get_cached_mint_meta("http://other:3338", 1_001).unwrap();
        assert!(other.is_none());
    }

    #[test]
    fn caching_replaces_previous_entry() {
        let db = WalletDb::in_memory().unwrap();
        let mut meta = CachedMintMetadata {
            keysets: vec![],
            keys: vec![KeySet {
                id: "00ad268c4d1f5826".into(),
                unit: "sat".into(),
                final_expiry: None,
                keys: [(1u64, "02aa".to_string())].into_iter().collect(),
            }],
            info: serde_json::Value::Null,
            cached_at: 50,
        };
        db.cache_mint_meta("http://m:3338", &meta).unwrap();

        meta.keys[0].id = "00bb31bc65e00b8a".into();
        meta.cached_at = 60;
        db.cache_mint_meta("http://m:3338", &meta).unwrap();

        let loaded = db.get_cached_mint_meta("http://m:3338", 61).unwrap().unwrap();
        assert_eq!(loaded.keys.len(), 1);
        assert_eq!(loaded.keys[0].id, "00bb31bc65e00b8a");
    }
}
