//! Bitcoin-style message signing for ownership proofs.
//!
//! A signature is the base64 of 65 bytes: a header byte followed by the compact
//! `r || s`. The header carries the recovery id and the address type the signer
//! used. Verification recovers the public key from the signature and checks that it
//! hashes to the claimed address; nothing about the key is stored.

use crate::error::{ChainError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::SECRET_KEY_SIZE,
    ecdsa::{RecoverableSignature, RecoveryId},
    hashes::{hash160, Hash},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

const MESSAGE_MAGIC: &[u8] = b"\x18Bitcoin Signed Message:\n";
const SIGNATURE_LEN: usize = 65;
const HEADER_BASE: u8 = 27;
const HEADER_MAX: u8 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    fn pubkey_hash_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    fn script_hash_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x05,
            Network::Testnet => 0xc4,
        }
    }
}

/// Address type announced by a signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// Legacy P2PKH over the uncompressed key (header 27-30).
    P2pkhUncompressed,
    /// Legacy P2PKH over the compressed key (header 31-34).
    P2pkh,
    /// P2SH-wrapped P2WPKH (header 35-38).
    P2shP2wpkh,
    /// Native bech32 P2WPKH (header 39-42).
    P2wpkh,
}

impl AddressKind {
    fn header_base(self) -> u8 {
        match self {
            AddressKind::P2pkhUncompressed => 27,
            AddressKind::P2pkh => 31,
            AddressKind::P2shP2wpkh => 35,
            AddressKind::P2wpkh => 39,
        }
    }

    fn from_header(header: u8) -> Option<(Self, i32)> {
        if !(HEADER_BASE..=HEADER_MAX).contains(&header) {
            return None;
        }
        let offset = header - HEADER_BASE;
        let kind = match offset / 4 {
            0 => AddressKind::P2pkhUncompressed,
            1 => AddressKind::P2pkh,
            2 => AddressKind::P2shP2wpkh,
            _ => AddressKind::P2wpkh,
        };
        Some((kind, i32::from(offset % 4)))
    }

    fn is_compressed(self) -> bool {
        self != AddressKind::P2pkhUncompressed
    }
}

/// What an address commits to, once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    PubkeyHash([u8; 20]),
    ScriptHash([u8; 20]),
    WitnessPubkeyHash([u8; 20]),
}

fn decode_address(address: &str) -> Option<Destination> {
    if let Ok((_hrp, version, program)) = bech32::segwit::decode(address) {
        if version != bech32::Fe32::Q || program.len() != 20 {
            return None;
        }
        return program.try_into().ok().map(Destination::WitnessPubkeyHash);
    }

    let data = bs58::decode(address).with_check(None).into_vec().ok()?;
    if data.len() != 21 {
        return None;
    }
    let hash: [u8; 20] = data[1..].try_into().ok()?;
    match data[0] {
        0x00 | 0x6f => Some(Destination::PubkeyHash(hash)),
        0x05 | 0xc4 => Some(Destination::ScriptHash(hash)),
        _ => None,
    }
}

fn hash160_bytes(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// `hash160` of the P2WPKH redeem script `OP_0 PUSH20 <pubkey hash>`.
fn p2sh_p2wpkh_hash(pubkey_hash: &[u8; 20]) -> [u8; 20] {
    let mut redeem_script = Vec::with_capacity(22);
    redeem_script.extend_from_slice(&[0x00, 0x14]);
    redeem_script.extend_from_slice(pubkey_hash);
    hash160_bytes(&redeem_script)
}

fn push_varint(buf: &mut Vec<u8>, n: usize) {
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
            buf.extend_from_slice(&(n as u64).to_le_bytes());
        }
    }
}

/// Double SHA-256 of the magic-prefixed message, the digest Bitcoin wallets sign.
pub fn message_digest(message: &str) -> [u8; 32] {
    let mut buf = Vec::with_capacity(MESSAGE_MAGIC.len() + 9 + message.len());
    buf.extend_from_slice(MESSAGE_MAGIC);
    push_varint(&mut buf, message.len());
    buf.extend_from_slice(message.as_bytes());
    Sha256::digest(Sha256::digest(&buf)).into()
}

fn recover_public_key(message: &str, signature: &str) -> Result<(PublicKey, AddressKind)> {
    let raw = STANDARD
        .decode(signature.trim())
        .map_err(|e| ChainError::CryptoError(format!("Signature is not base64: {}", e)))?;
    if raw.len() != SIGNATURE_LEN {
        return Err(ChainError::CryptoError(format!(
            "Signature must be exactly {} bytes, got {}",
            SIGNATURE_LEN,
            raw.len()
        )));
    }

    let (kind, rec_id) = AddressKind::from_header(raw[0])
        .ok_or_else(|| ChainError::CryptoError(format!("Invalid signature header byte {}", raw[0])))?;
    let recovery_id = RecoveryId::from_i32(rec_id)
        .map_err(|e| ChainError::CryptoError(format!("Invalid recovery id: {}", e)))?;
    let recoverable = RecoverableSignature::from_compact(&raw[1..], recovery_id)
        .map_err(|e| ChainError::CryptoError(format!("Invalid signature: {}", e)))?;

    let digest = message_digest(message);
    let message = Message::from_digest_slice(&digest)
        .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

    let public_key = SECP256K1_CONTEXT
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| ChainError::CryptoError(format!("Public key recovery failed: {}", e)))?;
    Ok((public_key, kind))
}

/// Verify a Bitcoin message signature against an address.
///
/// Returns `Ok(false)` for a well-formed signature made by some other key, and an
/// error when the signature cannot be parsed or the address is not recognised.
/// Compressed legacy headers are also accepted for segwit addresses, which is how
/// Electrum signs for them.
pub fn verify_message(message: &str, address: &str, signature: &str) -> Result<bool> {
    let destination = decode_address(address)
        .ok_or_else(|| ChainError::CryptoError(format!("Unsupported or invalid address: {}", address)))?;
    let (public_key, kind) = recover_public_key(message, signature)?;

    let pubkey_hash = if kind.is_compressed() {
        hash160_bytes(&public_key.serialize())
    } else {
        hash160_bytes(&public_key.serialize_uncompressed())
    };

    let matches = match (destination, kind) {
        (Destination::PubkeyHash(h), AddressKind::P2pkhUncompressed | AddressKind::P2pkh) => {
            h == pubkey_hash
        }
        (Destination::ScriptHash(h), AddressKind::P2shP2wpkh | AddressKind::P2pkh) => {
            h == p2sh_p2wpkh_hash(&pubkey_hash)
        }
        (Destination::WitnessPubkeyHash(h), AddressKind::P2wpkh | AddressKind::P2pkh) => {
            h == pubkey_hash
        }
        _ => false,
    };
    Ok(matches)
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| ChainError::CryptoError(format!("Invalid secret key hex: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    fn pubkey_hash(&self, kind: AddressKind) -> [u8; 20] {
        if kind.is_compressed() {
            hash160_bytes(&self.public_key.serialize())
        } else {
            hash160_bytes(&self.public_key.serialize_uncompressed())
        }
    }

    /// Address of the given kind controlled by this key.
    pub fn address(&self, kind: AddressKind, network: Network) -> Result<String> {
        let pubkey_hash = self.pubkey_hash(kind);
        let base58 = |version: u8, hash: [u8; 20]| {
            let mut payload = Vec::with_capacity(21);
            payload.push(version);
            payload.extend_from_slice(&hash);
            bs58::encode(payload).with_check().into_string()
        };

        match kind {
            AddressKind::P2pkhUncompressed | AddressKind::P2pkh => {
                Ok(base58(network.pubkey_hash_version(), pubkey_hash))
            }
            AddressKind::P2shP2wpkh => Ok(base58(
                network.script_hash_version(),
                p2sh_p2wpkh_hash(&pubkey_hash),
            )),
            AddressKind::P2wpkh => {
                let hrp = match network {
                    Network::Mainnet => bech32::hrp::BC,
                    Network::Testnet => bech32::hrp::TB,
                };
                bech32::segwit::encode(hrp, bech32::segwit::VERSION_0, &pubkey_hash)
                    .map_err(|e| ChainError::CryptoError(format!("Failed to encode address: {}", e)))
            }
        }
    }

    /// Sign `message` the way a Bitcoin wallet does, returning the base64 signature.
    pub fn sign_message(&self, message: &str, kind: AddressKind) -> Result<String> {
        let digest = message_digest(message);
        let msg = Message::from_digest_slice(&digest)
            .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

        let signature = SECP256K1_CONTEXT.sign_ecdsa_recoverable(&msg, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut raw = Vec::with_capacity(SIGNATURE_LEN);
        raw.push(kind.header_base() + recovery_id.to_i32() as u8);
        raw.extend_from_slice(&compact);
        Ok(STANDARD.encode(raw))
    }
}
