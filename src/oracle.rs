// Client side of the randomness oracle protocol.
//
// The raffle talks to the oracle program twice per round: a request CPI
// issued here, acknowledged with an 8-byte request id in return data, and
// a FulfillRandomness instruction the oracle operator submits later,
// handled by the processor. Requests the oracle does not recognize are
// rejected at the oracle's own boundary; this side only ever sees
// fulfillments it can match against the stored id.

use arrayref::array_ref;
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::error::RaffleError;

/// Number of random words requested for winner selection
pub const NUM_RANDOM_WORDS: u8 = 1;

/// Instruction tag of the oracle's request entry point
pub const REQUEST_TAG: u8 = 0;

/// Routing parameters of a single randomness request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomnessRequest {
    /// Oracle billing subscription to charge
    pub subscription_id: u64,
    /// Words the oracle should deliver in the fulfillment
    pub num_words: u8,
    /// Compute budget the oracle should reserve for the callback
    pub callback_compute_units: u32,
    /// Correlation entropy from the requester, echoed by some oracles
    pub client_seed: u64,
}

/// Build the oracle's request instruction.
///
/// Wire format: `[REQUEST_TAG][subscription_id: u64 le][num_words: u8]
/// [callback_compute_units: u32 le][client_seed: u64 le]`.
///
/// Accounts expected by the oracle:
/// 0. `[signer]` The requesting program's authority (the raffle PDA)
/// 1. `[writable]` The oracle queue the request is routed to
/// 2. `[signer, writable]` The payer covering the request
/// 3. `[]` The system program
pub fn request_instruction(
    oracle_program: &Pubkey,
    requester: &Pubkey,
    queue: &Pubkey,
    payer: &Pubkey,
    request: &RandomnessRequest,
) -> Instruction {
    let mut data = Vec::with_capacity(22);
    data.push(REQUEST_TAG);
    data.extend_from_slice(&request.subscription_id.to_le_bytes());
    data.push(request.num_words);
    data.extend_from_slice(&request.callback_compute_units.to_le_bytes());
    data.extend_from_slice(&request.client_seed.to_le_bytes());

    let accounts = vec![
        AccountMeta::new_readonly(*requester, true),
        AccountMeta::new(*queue, false),
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(solana_program::system_program::id(), false),
    ];

    Instruction {
        program_id: *oracle_program,
        accounts,
        data,
    }
}

/// Issue a randomness request to the oracle program and return the
/// request id it acknowledges through return data. The requester signs
/// through `signer_seeds`.
#[allow(clippy::too_many_arguments)]
pub fn request_randomness<'a>(
    oracle_program_info: &AccountInfo<'a>,
    requester_info: &AccountInfo<'a>,
    queue_info: &AccountInfo<'a>,
    payer_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    request: &RandomnessRequest,
    signer_seeds: &[&[u8]],
) -> Result<u64, ProgramError> {
    let instruction = request_instruction(
        oracle_program_info.key,
        requester_info.key,
        queue_info.key,
        payer_info.key,
        request,
    );

    invoke_signed(
        &instruction,
        &[
            requester_info.clone(),
            queue_info.clone(),
            payer_info.clone(),
            system_program_info.clone(),
            oracle_program_info.clone(),
        ],
        &[signer_seeds],
    )?;

    // The oracle acknowledges by placing the assigned request id in
    // return data as 8 little-endian bytes.
    let (responder, data) = match get_return_data() {
        Some(return_data) => return_data,
        None => {
            msg!("Oracle did not acknowledge the request");
            return Err(RaffleError::InvalidOracleResponse.into());
        }
    };
    if responder != *oracle_program_info.key {
        msg!("Request acknowledgement came from {}", responder);
        return Err(RaffleError::InvalidOracleResponse.into());
    }
    if data.len() != 8 {
        msg!("Malformed request acknowledgement, {} bytes", data.len());
        return Err(RaffleError::InvalidOracleResponse.into());
    }

    Ok(u64::from_le_bytes(*array_ref![data, 0, 8]))
}

/// Map a random word onto a table index. None when the table is empty.
pub fn random_index(word: u64, len: u64) -> Option<usize> {
    word.checked_rem(len).map(|index| index as usize)
}
