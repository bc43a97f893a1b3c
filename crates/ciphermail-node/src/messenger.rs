//! End-to-end send and open flow.
//!
//! `send` resolves the recipient in the registry, encrypts to its
//! current key, serializes the wire blob, hashes it and posts the hash
//! as a delivery proof. `open` fetches the proof, checks that the blob
//! matches it and decrypts with any key the wallet holds.

use ciphermail_contract::PostReceipt;
use ciphermail_crypto::ecdh::X25519PublicKey;
use ciphermail_protocol::commitment::{content_hash, verify_delivery};
use ciphermail_protocol::e2e;
use ciphermail_protocol::envelope::EncryptedMessage;
use ciphermail_protocol::nonce::NonceSequence;
use ciphermail_types::{CiphermailError, ContractError, Identity, Nickname, Result};
use ciphermail_wallet::wallet::IdentityWallet;

use crate::client::LedgerClient;

/// Sends and opens messages as one registered identity.
pub struct Messenger {
    client: LedgerClient,
    wallet: IdentityWallet,
    nonces: NonceSequence,
}

impl Messenger {
    /// # Errors
    ///
    /// `CiphermailError::CryptoError` if `wallet` is locked.
    pub fn new(client: LedgerClient, wallet: IdentityWallet) -> Result<Self> {
        wallet.secret()?;
        Ok(Self {
            client,
            wallet,
            nonces: NonceSequence::new(),
        })
    }

    pub fn client(&self) -> &LedgerClient {
        &self.client
    }

    pub fn wallet(&self) -> &IdentityWallet {
        &self.wallet
    }

    /// Mutable wallet access, e.g. for key rotation.
    pub fn wallet_mut(&mut self) -> &mut IdentityWallet {
        &mut self.wallet
    }

    /// Registers this wallet's current public key under `nickname`.
    pub async fn register(&self, nickname: Nickname) -> Result<u32> {
        self.client
            .register(nickname, self.wallet.public_key())
            .await
    }

    /// Rotates the wallet key and publishes the new public key.
    ///
    /// The retired key stays in the wallet so earlier messages still
    /// open.
    pub async fn rotate_key(&mut self, password: &str) -> Result<()> {
        let new_pubkey = self.wallet.rotate(password)?;
        self.client.update_pubkey(new_pubkey).await
    }

    /// Encrypts `plaintext` to `nickname` and posts its delivery
    /// proof. Returns the wire blob to hand to the transport.
    ///
    /// # Errors
    ///
    /// - `ProtocolError` if `nickname` is not registered.
    /// - `Contract` if the post is rejected after all retries.
    pub async fn send(
        &mut self,
        nickname: Nickname,
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, PostReceipt)> {
        let recipient = self
            .client
            .lookup_user(nickname)
            .await?
            .ok_or_else(|| CiphermailError::ProtocolError {
                reason: format!("recipient '{nickname}' is not registered"),
            })?;

        let recipient_pk = X25519PublicKey::from_bytes(*recipient.pubkey.as_bytes());
        let message = e2e::encrypt(plaintext, self.wallet.secret()?, &recipient_pk)?;
        let blob = message.serialize();
        let hash = content_hash(&blob);

        let receipt = self
            .client
            .post_with_retry(recipient.owner, hash, &mut self.nonces)
            .await?;
        tracing::debug!(
            receiver = %recipient.owner,
            log_index = receipt.log_index,
            blob_len = blob.len(),
            "message sent"
        );
        Ok((blob, receipt))
    }

    /// Opens a blob addressed to this identity, trusting the sender
    /// recorded in the log entry.
    pub async fn open(&self, blob: &[u8], log_index: u32) -> Result<Option<Vec<u8>>> {
        self.open_inner(blob, log_index, None).await
    }

    /// Like [`open`](Self::open), but also requires the log entry to
    /// name `sender`.
    pub async fn open_from(
        &self,
        blob: &[u8],
        log_index: u32,
        sender: &Identity,
    ) -> Result<Option<Vec<u8>>> {
        self.open_inner(blob, log_index, Some(sender)).await
    }

    /// Returns `Ok(None)` if the proof is gone from the log window,
    /// does not match the blob, or the blob does not decrypt.
    ///
    /// # Errors
    ///
    /// `MalformedInput` if `blob` is shorter than the wire header.
    async fn open_inner(
        &self,
        blob: &[u8],
        log_index: u32,
        sender: Option<&Identity>,
    ) -> Result<Option<Vec<u8>>> {
        let message = EncryptedMessage::deserialize(blob)?;

        let entry = match self.client.get_message_meta(log_index).await {
            Ok(entry) => entry,
            Err(CiphermailError::Contract {
                code: ContractError::IndexOutOfWindow,
            }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let expected_sender = sender.copied().unwrap_or(entry.sender);
        if !verify_delivery(blob, &entry, &expected_sender, &self.client.identity()) {
            tracing::debug!(log_index, "delivery proof does not match blob");
            return Ok(None);
        }

        self.wallet.decrypt_any(&message)
    }
}
