use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    error::RaffleError,
    event::RaffleEvent,
    instruction::RaffleInstruction,
    oracle::{self, RandomnessRequest},
    state::{Raffle, RaffleState, MAX_PLAYERS, RAFFLE_SEED},
    utils,
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::Initialize {
                entrance_fee,
                interval,
                subscription_id,
                callback_compute_units,
            } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(
                    accounts,
                    entrance_fee,
                    interval,
                    subscription_id,
                    callback_compute_units,
                    program_id,
                )
            }
            RaffleInstruction::Enter { amount } => {
                msg!("Instruction: Enter");
                Self::process_enter(accounts, amount, program_id)
            }
            RaffleInstruction::CheckUpkeep {} => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
            RaffleInstruction::PerformUpkeep {} => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomness {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Randomness");
                Self::process_fulfill_randomness(accounts, request_id, &random_words, program_id)
            }
        }
    }

    /// Process the Initialize instruction
    ///
    /// Creates the singleton raffle account at its PDA and writes the
    /// immutable configuration. There is no update path; a second call
    /// fails once the account is initialized.
    fn process_initialize(
        accounts: &[AccountInfo],
        entrance_fee: u64,
        interval: i64,
        subscription_id: u64,
        callback_compute_units: u32,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let oracle_program_info = next_account_info(account_info_iter)?;
        let oracle_queue_info = next_account_info(account_info_iter)?;
        let oracle_identity_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        // Verify the payer signed the transaction
        if !payer_info.is_signer {
            msg!("Payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        // Verify that the provided raffle account is the expected PDA
        let (expected_raffle_pubkey, bump_seed) = utils::find_raffle_address(program_id);
        if *raffle_info.key != expected_raffle_pubkey {
            msg!("Invalid raffle account address");
            return Err(ProgramError::InvalidArgument);
        }

        // The oracle program must be executable to receive request CPIs
        if !oracle_program_info.executable {
            msg!("Oracle program account must be executable");
            return Err(ProgramError::InvalidArgument);
        }

        // Validate configuration inputs
        if entrance_fee == 0 {
            msg!("Entrance fee must be greater than zero");
            return Err(ProgramError::InvalidArgument);
        }
        if interval <= 0 {
            msg!("Interval must be greater than zero");
            return Err(ProgramError::InvalidArgument);
        }

        // Create the raffle account at the PDA if it does not exist yet.
        // The address may already hold donated lamports, which a bare
        // create_account rejects, so fund any rent shortfall and then
        // allocate and assign under the PDA signature.
        if raffle_info.owner != program_id {
            msg!("Creating raffle account");
            let rent = Rent::get()?;
            let rent_lamports = rent.minimum_balance(Raffle::LEN);

            let shortfall = rent_lamports.saturating_sub(raffle_info.lamports());
            if shortfall > 0 {
                invoke(
                    &system_instruction::transfer(payer_info.key, raffle_info.key, shortfall),
                    &[
                        payer_info.clone(),
                        raffle_info.clone(),
                        system_program_info.clone(),
                    ],
                )?;
            }
            invoke_signed(
                &system_instruction::allocate(raffle_info.key, Raffle::LEN as u64),
                &[raffle_info.clone(), system_program_info.clone()],
                &[&[RAFFLE_SEED, &[bump_seed]]],
            )?;
            invoke_signed(
                &system_instruction::assign(raffle_info.key, program_id),
                &[raffle_info.clone(), system_program_info.clone()],
                &[&[RAFFLE_SEED, &[bump_seed]]],
            )?;
        }

        // Reject a second initialization
        let raffle = Raffle::unpack_unchecked(&raffle_info.data.borrow())?;
        if raffle.is_initialized {
            msg!("Raffle account is already initialized");
            return Err(RaffleError::AlreadyInitialized.into());
        }

        // The round starts open and empty, with the settlement clock at now
        let clock = Clock::get()?;
        let raffle = Raffle {
            is_initialized: true,
            state: RaffleState::Open,
            bump: bump_seed,
            entrance_fee,
            interval,
            oracle_program: *oracle_program_info.key,
            oracle_queue: *oracle_queue_info.key,
            oracle_identity: *oracle_identity_info.key,
            subscription_id,
            callback_compute_units,
            last_settlement_time: clock.unix_timestamp,
            pending_request_id: 0,
            recent_winner: Pubkey::default(),
            pool_lamports: 0,
            player_count: 0,
            players: [Pubkey::default(); MAX_PLAYERS],
        };
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: fee={} lamports, interval={}s, oracle={}",
            entrance_fee,
            interval,
            oracle_program_info.key
        );
        Ok(())
    }

    /// Process the Enter instruction
    fn process_enter(accounts: &[AccountInfo], amount: u64, program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        // Verify the player signed the transaction
        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        // Check that the raffle account is owned by our program
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle = Raffle::unpack(&raffle_info.data.borrow())?;

        // Entries are only accepted while the round is open
        if raffle.state != RaffleState::Open {
            msg!("Raffle is calculating a winner, entries are blocked");
            return Err(RaffleError::RaffleNotOpen.into());
        }

        // The attached payment must cover the entrance fee
        if amount < raffle.entrance_fee {
            msg!(
                "Payment of {} lamports is below the entrance fee of {}",
                amount,
                raffle.entrance_fee
            );
            return Err(RaffleError::NotEnoughFunds.into());
        }

        // The player table is fixed-capacity
        if raffle.player_count as usize >= MAX_PLAYERS {
            msg!("Raffle round is full ({} players)", MAX_PLAYERS);
            return Err(RaffleError::RaffleFull.into());
        }

        // Move the payment into the pool
        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, amount),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        // Record the entry. Each entry takes its own slot, so a player
        // entering twice holds two slots.
        raffle.players[raffle.player_count as usize] = *player_info.key;
        raffle.player_count = raffle
            .player_count
            .checked_add(1)
            .ok_or(RaffleError::Overflow)?;
        raffle.pool_lamports = raffle
            .pool_lamports
            .checked_add(amount)
            .ok_or(RaffleError::Overflow)?;
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        RaffleEvent::Entered {
            player: *player_info.key,
            amount,
        }
        .emit();

        msg!(
            "Player {} entered with {} SOL, pool is now {} lamports across {} entries",
            player_info.key,
            utils::lamports_to_sol(amount),
            raffle.pool_lamports,
            raffle.player_count
        );
        Ok(())
    }

    /// Process the CheckUpkeep instruction
    ///
    /// Read-only. The verdict goes out as a single byte of return data
    /// so an off-chain crank can poll it through transaction simulation
    /// without mutating anything.
    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;

        // Check that the raffle account is owned by our program
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }

        let raffle = Raffle::unpack(&raffle_info.data.borrow())?;
        let clock = Clock::get()?;
        let upkeep_needed = raffle.is_upkeep_needed(clock.unix_timestamp);

        set_return_data(&[upkeep_needed as u8]);

        msg!(
            "Upkeep needed: {} (pool={} lamports, players={}, state={:?})",
            upkeep_needed,
            raffle.pool_lamports,
            raffle.player_count,
            raffle.state
        );
        Ok(())
    }

    /// Process the PerformUpkeep instruction
    ///
    /// Re-validates the eligibility predicate, locks the round and issues
    /// the one randomness request of this round. The state flag is packed
    /// before the outbound CPI so nothing observing the account mid-call
    /// can see an open round with a request in flight.
    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let oracle_program_info = next_account_info(account_info_iter)?;
        let oracle_queue_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        // The caller funds the oracle request and must sign.
        // Upkeep itself is permissionless.
        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        // Check that the raffle account is owned by our program
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle = Raffle::unpack(&raffle_info.data.borrow())?;

        // The request must go to the configured oracle
        if *oracle_program_info.key != raffle.oracle_program {
            msg!("Oracle program does not match the configured oracle");
            return Err(ProgramError::InvalidArgument);
        }
        if *oracle_queue_info.key != raffle.oracle_queue {
            msg!("Oracle queue does not match the configured queue");
            return Err(ProgramError::InvalidArgument);
        }

        // Never trust an external eligibility poll to still hold
        let clock = Clock::get()?;
        if !raffle.is_upkeep_needed(clock.unix_timestamp) {
            msg!(
                "Upkeep not needed: pool={} lamports, players={}, state={:?}",
                raffle.pool_lamports,
                raffle.player_count,
                raffle.state
            );
            return Err(RaffleError::UpkeepNotNeeded.into());
        }

        // Lock the round before the outbound CPI. Both Enter and a second
        // PerformUpkeep require an open state, so the flag rules out a
        // concurrent second request.
        raffle.state = RaffleState::Calculating;
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        let request = RandomnessRequest {
            subscription_id: raffle.subscription_id,
            num_words: oracle::NUM_RANDOM_WORDS,
            callback_compute_units: raffle.callback_compute_units,
            client_seed: clock.unix_timestamp as u64,
        };
        let request_id = oracle::request_randomness(
            oracle_program_info,
            raffle_info,
            oracle_queue_info,
            caller_info,
            system_program_info,
            &request,
            &[RAFFLE_SEED, &[raffle.bump]],
        )?;

        raffle.pending_request_id = request_id;
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        RaffleEvent::RequestedWinner { request_id }.emit();

        msg!("Randomness requested, request id {}", request_id);
        Ok(())
    }

    /// Process the FulfillRandomness instruction
    ///
    /// The oracle's asynchronous callback. Settlement bookkeeping is
    /// finalized and packed strictly before the payout moves, so a
    /// reentrant call during the transfer sees a consistent open round.
    fn process_fulfill_randomness(
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[u64],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let oracle_identity_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        // Check that the raffle account is owned by our program
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle = Raffle::unpack(&raffle_info.data.borrow())?;

        // Only the configured oracle identity may deliver randomness
        if !oracle_identity_info.is_signer {
            msg!("Oracle identity must sign the fulfillment");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *oracle_identity_info.key != raffle.oracle_identity {
            msg!("Fulfillment not signed by the configured oracle identity");
            return Err(RaffleError::UnauthorizedOracle.into());
        }

        // A fulfillment is only meaningful while a request is outstanding.
        // This also rejects replays after the round has settled.
        if raffle.state != RaffleState::Calculating {
            msg!("No randomness request is pending");
            return Err(RaffleError::NoPendingRequest.into());
        }

        // The delivered id must match the one issued for this round
        if request_id != raffle.pending_request_id {
            msg!(
                "Request id {} does not match pending request {}",
                request_id,
                raffle.pending_request_id
            );
            return Err(RaffleError::RequestIdMismatch.into());
        }

        if random_words.is_empty() {
            msg!("Fulfillment carried no random words");
            return Err(RaffleError::InvalidOracleResponse.into());
        }

        // The player table is frozen while calculating, so the count the
        // request was issued against still holds.
        let winner_index = match oracle::random_index(random_words[0], raffle.player_count) {
            Some(index) => index,
            None => {
                msg!("Raffle entered calculating state with no players");
                return Err(ProgramError::InvalidAccountData);
            }
        };
        let winner = raffle.players[winner_index];

        // The operator computes the winner off-chain and supplies the
        // account; re-deriving the index here means a wrong account
        // cannot redirect the payout.
        if *winner_info.key != winner {
            msg!(
                "Winner account does not match drawn participant at index {}",
                winner_index
            );
            return Err(RaffleError::WinnerMismatch.into());
        }

        // Settle the books before any lamports move: clear the table,
        // zero the pool, reopen the round, restart the interval clock.
        let clock = Clock::get()?;
        let payout = raffle.pool_lamports;
        raffle.recent_winner = winner;
        raffle.players = [Pubkey::default(); MAX_PLAYERS];
        raffle.player_count = 0;
        raffle.pool_lamports = 0;
        raffle.pending_request_id = 0;
        raffle.state = RaffleState::Open;
        raffle.last_settlement_time = clock.unix_timestamp;
        Raffle::pack(raffle, &mut raffle_info.data.borrow_mut())?;

        // Pay out the pool by direct lamport movement. The rent-exempt
        // reserve stays behind so the account survives into the next
        // round.
        let raffle_lamports = raffle_info.lamports();
        **raffle_info.lamports.borrow_mut() = raffle_lamports
            .checked_sub(payout)
            .ok_or(RaffleError::Overflow)?;
        **winner_info.lamports.borrow_mut() = winner_info
            .lamports()
            .checked_add(payout)
            .ok_or(RaffleError::Overflow)?;

        RaffleEvent::WinnerPicked { winner, payout }.emit();

        msg!(
            "Winner {} picked at index {}, paid {} SOL, round reopened",
            winner,
            winner_index,
            utils::lamports_to_sol(payout)
        );
        Ok(())
    }
}
