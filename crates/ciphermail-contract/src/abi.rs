//! Fixed-width little-endian byte interface.
//!
//! Every entrypoint takes and returns a packed struct with no length
//! prefixes. Layouts are encoded with bincode's fixed-int
//! little-endian options, which serialize `[u8; 32]` fields as raw
//! bytes and integers at their natural width.
//!
//! ```text
//! RegisterUser       in   nickname:32 pubkey:32
//!                    out  slot_index:i32
//! UpdatePubkey       in   new_pubkey:32
//!                    out  success:u8
//! DeactivateUser     in   (empty)
//!                    out  success:u8
//! PostMessageMeta    in   receiver:32 content_hash:32 nonce:u32
//!                    out  success:u8 error_code:u8 log_index:u32
//! LookupUser         in   nickname:32
//!                    out  pubkey:32 owner:32 registered_tick:u32 found:u8
//! LookupUserByOwner  in   owner:32
//!                    out  nickname:32 pubkey:32 found:u8
//! GetMessageMeta     in   log_index:u32
//!                    out  sender:32 receiver:32 content_hash:32 tick:u32 nonce:u32 valid:u8
//! ```
//!
//! Rejections are encoded as result codes, never as errors. An input
//! of the wrong length is the only failure that surfaces as `Err`, and
//! it is detected before the state is touched.

use bincode::Options;
use ciphermail_types::{
    CiphermailError, ContentHash, ContractError, Identity, Nickname, PublicKeyBytes, Result,
    Tick,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::call::{Call, CallContext, CallKind, CallOutput};
use crate::state::ContractState;

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegisterUserInput {
    pub nickname: Nickname,
    pub pubkey: PublicKeyBytes,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegisterUserOutput {
    /// `>= 0` slot on success, negative rejection code otherwise.
    pub slot_index: i32,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct UpdatePubkeyInput {
    pub new_pubkey: PublicKeyBytes,
}

/// Output of `UpdatePubkey` and `DeactivateUser`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StatusOutput {
    pub success: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PostMessageMetaInput {
    pub receiver: Identity,
    pub content_hash: ContentHash,
    pub nonce: u32,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PostMessageMetaOutput {
    pub success: u8,
    /// `0` ok, `1` not registered, `2` bad nonce, `3` rate limited,
    /// `4` self-message.
    pub error_code: u8,
    pub log_index: u32,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LookupUserInput {
    pub nickname: Nickname,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LookupUserOutput {
    pub pubkey: PublicKeyBytes,
    pub owner: Identity,
    pub registered_tick: Tick,
    pub found: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LookupUserByOwnerInput {
    pub owner: Identity,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LookupUserByOwnerOutput {
    pub nickname: Nickname,
    pub pubkey: PublicKeyBytes,
    pub found: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GetMessageMetaInput {
    pub log_index: u32,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GetMessageMetaOutput {
    pub sender: Identity,
    pub receiver: Identity,
    pub content_hash: ContentHash,
    pub tick: Tick,
    pub nonce: u32,
    pub valid: u8,
}

/// Exact input length of `kind`.
pub fn input_len(kind: CallKind) -> usize {
    match kind {
        CallKind::RegisterUser => 64,
        CallKind::UpdatePubkey => 32,
        CallKind::DeactivateUser => 0,
        CallKind::PostMessageMeta => 68,
        CallKind::LookupUser => 32,
        CallKind::LookupUserByOwner => 32,
        CallKind::GetMessageMeta => 4,
    }
}

/// Exact output length of `kind`.
pub fn output_len(kind: CallKind) -> usize {
    match kind {
        CallKind::RegisterUser => 4,
        CallKind::UpdatePubkey | CallKind::DeactivateUser => 1,
        CallKind::PostMessageMeta => 6,
        CallKind::LookupUser => 69,
        CallKind::LookupUserByOwner => 65,
        CallKind::GetMessageMeta => 105,
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Encodes a layout struct.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    options()
        .serialize(value)
        .map_err(|e| CiphermailError::ProtocolError {
            reason: format!("abi encode failed: {e}"),
        })
}

/// Decodes a layout struct, rejecting short and trailing input.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    options()
        .deserialize(bytes)
        .map_err(|e| CiphermailError::MalformedInput {
            reason: format!("abi decode failed: {e}"),
        })
}

/// Decodes the input bytes of `kind` into a typed call.
///
/// # Errors
///
/// [`CiphermailError::MalformedInput`] if `input` is not exactly
/// [`input_len`] bytes.
pub fn decode_call(kind: CallKind, input: &[u8]) -> Result<Call> {
    let expected = input_len(kind);
    if input.len() != expected {
        return Err(CiphermailError::MalformedInput {
            reason: format!(
                "{kind} input must be {expected} bytes, got {}",
                input.len()
            ),
        });
    }

    let call = match kind {
        CallKind::RegisterUser => {
            let i: RegisterUserInput = decode(input)?;
            Call::RegisterUser {
                nickname: i.nickname,
                pubkey: i.pubkey,
            }
        }
        CallKind::UpdatePubkey => {
            let i: UpdatePubkeyInput = decode(input)?;
            Call::UpdatePubkey {
                new_pubkey: i.new_pubkey,
            }
        }
        CallKind::DeactivateUser => Call::DeactivateUser,
        CallKind::PostMessageMeta => {
            let i: PostMessageMetaInput = decode(input)?;
            Call::PostMessageMeta {
                receiver: i.receiver,
                content_hash: i.content_hash,
                nonce: i.nonce,
            }
        }
        CallKind::LookupUser => {
            let i: LookupUserInput = decode(input)?;
            Call::LookupUser {
                nickname: i.nickname,
            }
        }
        CallKind::LookupUserByOwner => {
            let i: LookupUserByOwnerInput = decode(input)?;
            Call::LookupUserByOwner { owner: i.owner }
        }
        CallKind::GetMessageMeta => {
            let i: GetMessageMetaInput = decode(input)?;
            Call::GetMessageMeta {
                log_index: i.log_index,
            }
        }
    };
    Ok(call)
}

/// Encodes a typed call as the input bytes of its kind.
pub fn encode_call(call: &Call) -> Result<Vec<u8>> {
    match call {
        Call::RegisterUser { nickname, pubkey } => encode(&RegisterUserInput {
            nickname: *nickname,
            pubkey: *pubkey,
        }),
        Call::UpdatePubkey { new_pubkey } => encode(&UpdatePubkeyInput {
            new_pubkey: *new_pubkey,
        }),
        Call::DeactivateUser => Ok(Vec::new()),
        Call::PostMessageMeta {
            receiver,
            content_hash,
            nonce,
        } => encode(&PostMessageMetaInput {
            receiver: *receiver,
            content_hash: *content_hash,
            nonce: *nonce,
        }),
        Call::LookupUser { nickname } => encode(&LookupUserInput {
            nickname: *nickname,
        }),
        Call::LookupUserByOwner { owner } => encode(&LookupUserByOwnerInput { owner: *owner }),
        Call::GetMessageMeta { log_index } => encode(&GetMessageMetaInput {
            log_index: *log_index,
        }),
    }
}

/// Encodes the outcome of a `kind` call as its output bytes,
/// folding rejections into result codes.
pub fn encode_outcome(
    kind: CallKind,
    outcome: std::result::Result<CallOutput, ContractError>,
) -> Result<Vec<u8>> {
    match (kind, outcome) {
        (CallKind::RegisterUser, Ok(CallOutput::Registered { slot })) => {
            let slot_index = i32::try_from(slot).map_err(|_| CiphermailError::ProtocolError {
                reason: format!("slot {slot} does not fit the output field"),
            })?;
            encode(&RegisterUserOutput { slot_index })
        }
        (CallKind::RegisterUser, Err(code)) => encode(&RegisterUserOutput {
            slot_index: code.register_code(),
        }),

        (CallKind::UpdatePubkey, Ok(CallOutput::PubkeyUpdated))
        | (CallKind::DeactivateUser, Ok(CallOutput::Deactivated)) => {
            encode(&StatusOutput { success: 1 })
        }
        (CallKind::UpdatePubkey | CallKind::DeactivateUser, Err(_)) => {
            encode(&StatusOutput { success: 0 })
        }

        (CallKind::PostMessageMeta, Ok(CallOutput::Posted(receipt))) => {
            encode(&PostMessageMetaOutput {
                success: 1,
                error_code: 0,
                log_index: receipt.log_index,
            })
        }
        (CallKind::PostMessageMeta, Err(code)) => encode(&PostMessageMetaOutput {
            success: 0,
            error_code: code.post_code(),
            log_index: 0,
        }),

        (CallKind::LookupUser, Ok(CallOutput::User(found))) => {
            let out = found.map_or_else(LookupUserOutput::default, |u| LookupUserOutput {
                pubkey: u.pubkey,
                owner: u.owner,
                registered_tick: u.registered_tick,
                found: 1,
            });
            encode(&out)
        }

        (CallKind::LookupUserByOwner, Ok(CallOutput::UserByOwner(found))) => {
            let out = found.map_or_else(LookupUserByOwnerOutput::default, |u| {
                LookupUserByOwnerOutput {
                    nickname: u.nickname,
                    pubkey: u.pubkey,
                    found: 1,
                }
            });
            encode(&out)
        }

        (CallKind::GetMessageMeta, Ok(CallOutput::Message(entry))) => {
            encode(&GetMessageMetaOutput {
                sender: entry.sender,
                receiver: entry.receiver,
                content_hash: entry.content_hash,
                tick: entry.tick,
                nonce: entry.nonce,
                valid: 1,
            })
        }
        (CallKind::GetMessageMeta, Err(_)) => encode(&GetMessageMetaOutput::default()),

        (kind, outcome) => Err(CiphermailError::ProtocolError {
            reason: format!("{kind} produced unexpected outcome {outcome:?}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

impl ContractState {
    /// Executes one call given as raw input bytes and returns the raw
    /// output bytes.
    ///
    /// # Errors
    ///
    /// [`CiphermailError::MalformedInput`] if `input` does not match
    /// the layout of `kind`. The state is untouched in that case.
    pub fn invoke(
        &mut self,
        caller: Identity,
        tick: Tick,
        kind: CallKind,
        input: &[u8],
    ) -> Result<Vec<u8>> {
        let call = decode_call(kind, input)?;
        let outcome = self.apply(&CallContext { caller, tick }, &call);
        encode_outcome(kind, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciphermail_types::MessageMetaEntry;

    use crate::call::{PostReceipt, UserLookup};

    #[test]
    fn layouts_have_fixed_widths() -> Result<()> {
        let inputs = [
            (encode(&RegisterUserInput::default())?, CallKind::RegisterUser),
            (encode(&PostMessageMetaInput::default())?, CallKind::PostMessageMeta),
            (encode(&GetMessageMetaInput::default())?, CallKind::GetMessageMeta),
        ];
        for (bytes, kind) in inputs {
            assert_eq!(bytes.len(), input_len(kind), "{kind} input");
        }

        let outputs = [
            (encode(&RegisterUserOutput::default())?, CallKind::RegisterUser),
            (encode(&PostMessageMetaOutput::default())?, CallKind::PostMessageMeta),
            (encode(&LookupUserOutput::default())?, CallKind::LookupUser),
            (encode(&LookupUserByOwnerOutput::default())?, CallKind::LookupUserByOwner),
            (encode(&GetMessageMetaOutput::default())?, CallKind::GetMessageMeta),
        ];
        for (bytes, kind) in outputs {
            assert_eq!(bytes.len(), output_len(kind), "{kind} output");
        }
        Ok(())
    }

    #[test]
    fn integers_are_little_endian() -> Result<()> {
        let bytes = encode(&PostMessageMetaInput {
            receiver: Identity::new([0xEE; 32]),
            content_hash: ContentHash::new([0x11; 32]),
            nonce: 0x0102_0304,
        })?;
        assert_eq!(&bytes[..32], &[0xEE; 32]);
        assert_eq!(&bytes[32..64], &[0x11; 32]);
        assert_eq!(&bytes[64..], &[0x04, 0x03, 0x02, 0x01]);

        let out = encode(&RegisterUserOutput { slot_index: -2 })?;
        assert_eq!(out, (-2i32).to_le_bytes().to_vec());
        Ok(())
    }

    #[test]
    fn wrong_input_length_rejected() {
        for kind in CallKind::ALL {
            let too_long = vec![0u8; input_len(kind) + 1];
            assert!(decode_call(kind, &too_long).is_err(), "{kind}");
            if input_len(kind) > 0 {
                let too_short = vec![0u8; input_len(kind) - 1];
                assert!(decode_call(kind, &too_short).is_err(), "{kind}");
            }
        }
    }

    #[test]
    fn call_bytes_roundtrip() -> Result<()> {
        let call = Call::PostMessageMeta {
            receiver: Identity::new([3; 32]),
            content_hash: ContentHash::new([4; 32]),
            nonce: 99,
        };
        let bytes = encode_call(&call)?;
        assert_eq!(decode_call(call.kind(), &bytes)?, call);
        Ok(())
    }

    #[test]
    fn rejections_fold_into_codes() -> Result<()> {
        let reg = encode_outcome(CallKind::RegisterUser, Err(ContractError::NicknameTaken))?;
        assert_eq!(decode::<RegisterUserOutput>(&reg)?.slot_index, -1);

        let post = encode_outcome(CallKind::PostMessageMeta, Err(ContractError::RateLimited))?;
        assert_eq!(
            decode::<PostMessageMetaOutput>(&post)?,
            PostMessageMetaOutput {
                success: 0,
                error_code: 3,
                log_index: 0
            }
        );

        let meta = encode_outcome(CallKind::GetMessageMeta, Err(ContractError::IndexOutOfWindow))?;
        assert_eq!(decode::<GetMessageMetaOutput>(&meta)?.valid, 0);
        Ok(())
    }

    #[test]
    fn successes_encode_payloads() -> Result<()> {
        let post = encode_outcome(
            CallKind::PostMessageMeta,
            Ok(CallOutput::Posted(PostReceipt {
                log_index: 7,
                sequence: 7,
            })),
        )?;
        assert_eq!(post, vec![1, 0, 7, 0, 0, 0]);

        let entry = MessageMetaEntry {
            sender: Identity::new([1; 32]),
            receiver: Identity::new([2; 32]),
            content_hash: ContentHash::new([3; 32]),
            tick: 4,
            nonce: 5,
        };
        let meta = encode_outcome(CallKind::GetMessageMeta, Ok(CallOutput::Message(entry)))?;
        assert_eq!(meta.len(), output_len(CallKind::GetMessageMeta));
        assert_eq!(meta[104], 1);

        let user = encode_outcome(
            CallKind::LookupUser,
            Ok(CallOutput::User(Some(UserLookup {
                pubkey: PublicKeyBytes::new([9; 32]),
                owner: Identity::new([8; 32]),
                registered_tick: 3,
            }))),
        )?;
        let decoded: LookupUserOutput = decode(&user)?;
        assert_eq!((decoded.registered_tick, decoded.found), (3, 1));
        Ok(())
    }

    #[test]
    fn mismatched_outcome_is_an_error() {
        assert!(encode_outcome(CallKind::LookupUser, Ok(CallOutput::Deactivated)).is_err());
    }
}
