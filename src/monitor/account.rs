use std::{collections::HashSet, fmt, str};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

const PUBKEY_BYTES: usize = 32;

/// A base58 encoded ed25519 public key.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl str::FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|err| anyhow!("invalid address {}: {}", s, err))?;

        if bytes.len() != PUBKEY_BYTES {
            bail!(
                "invalid address {}: decodes to {} bytes, expected {}",
                s,
                bytes.len(),
                PUBKEY_BYTES
            );
        }

        Ok(Self(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MonitoredAccount {
    pub name: String,
    pub address: Address,
    pub min_lamports: u64,
}

/// One element of the `ACCOUNTS` list. Deployments use either bare addresses or
/// objects with a label and their own minimum, both may appear in one list.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AccountEntry {
    Address(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        address: String,
        #[serde(default, rename = "minLamports", alias = "min_lamports")]
        min_lamports: Option<u64>,
    },
}

impl AccountEntry {
    fn resolve(self, default_min_lamports: Option<u64>) -> Result<MonitoredAccount> {
        let (name, address, min_lamports) = match self {
            AccountEntry::Address(address) => (None, address, None),
            AccountEntry::Detailed {
                name,
                address,
                min_lamports,
            } => (name, address, min_lamports),
        };

        let address: Address = address.parse()?;
        let min_lamports = min_lamports.or(default_min_lamports).with_context(|| {
            format!(
                "no minLamports for {} and MINIMUM_LAMPORTS is not set",
                address
            )
        })?;
        let name = name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| address.to_string());

        Ok(MonitoredAccount {
            name,
            address,
            min_lamports,
        })
    }
}

/// Validates every entry and applies the global minimum where an entry has none.
pub fn resolve_accounts(
    entries: Vec<AccountEntry>,
    default_min_lamports: Option<u64>,
) -> Result<Vec<MonitoredAccount>> {
    if entries.is_empty() {
        bail!("account list is empty");
    }

    let mut seen = HashSet::new();
    let mut accounts = Vec::with_capacity(entries.len());

    for entry in entries {
        let account = entry.resolve(default_min_lamports)?;
        if !seen.insert(account.address.clone()) {
            bail!("address {} is listed more than once", account.address);
        }
        accounts.push(account);
    }

    Ok(accounts)
}
