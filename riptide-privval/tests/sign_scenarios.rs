//! End-to-end signing scenarios: monotonic progression, crash replays,
//! the equivocation guard, and vote extensions.

use riptide_crypto::Scheme;
use riptide_privval::{FilePv, PrivvalError, Step};
use riptide_types::canonical;
use riptide_types::{BlockId, PartSetHeader, Proposal, SignedMsgType, Vote};
use tempfile::TempDir;

const CHAIN_ID: &str = "riptide-test-1";

fn new_pv(dir: &TempDir) -> FilePv {
    FilePv::generate(
        dir.path().join("priv_validator_key.json"),
        dir.path().join("priv_validator_state.json"),
        Scheme::Ed25519,
    )
    .unwrap()
}

fn block(byte: u8) -> BlockId {
    BlockId {
        hash: [byte; 32],
        part_set_header: PartSetHeader {
            total: 1,
            hash: [byte; 32],
        },
    }
}

fn vote(
    vote_type: SignedMsgType,
    height: i64,
    round: i32,
    block_id: Option<BlockId>,
    timestamp: u64,
) -> Vote {
    Vote {
        vote_type,
        height,
        round,
        block_id,
        timestamp,
        validator_address: Default::default(),
        validator_index: 0,
        signature: vec![],
        extension: vec![],
        extension_signature: vec![],
        non_rp_extension: vec![],
        non_rp_extension_signature: vec![],
    }
}

fn proposal(height: i64, round: i32, block_id: Option<BlockId>, timestamp: u64) -> Proposal {
    Proposal {
        height,
        round,
        pol_round: -1,
        block_id,
        timestamp,
        signature: vec![],
    }
}

fn state_file_contents(dir: &TempDir) -> Vec<u8> {
    std::fs::read(dir.path().join("priv_validator_state.json")).unwrap()
}

#[test]
fn monotonic_prevote_then_precommit() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut prevote = vote(SignedMsgType::Prevote, 10, 0, Some(block(1)), 100);
    pv.sign_vote(CHAIN_ID, &mut prevote, true).unwrap();
    assert!(!prevote.signature.is_empty());
    assert_eq!(pv.last_sign_state.height, 10);
    assert_eq!(pv.last_sign_state.step, Step::Prevote);

    // Nil precommit: signs fine, no extension signatures.
    let mut precommit = vote(SignedMsgType::Precommit, 10, 0, None, 101);
    pv.sign_vote(CHAIN_ID, &mut precommit, true).unwrap();
    assert!(!precommit.signature.is_empty());
    assert!(precommit.extension_signature.is_empty());
    assert!(precommit.non_rp_extension_signature.is_empty());
    assert_eq!(pv.last_sign_state.step, Step::Precommit);
}

#[test]
fn crash_replay_returns_cached_signature() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut original = vote(SignedMsgType::Precommit, 10, 0, Some(block(1)), 100);
    pv.sign_vote(CHAIN_ID, &mut original, true).unwrap();
    let persisted = state_file_contents(&dir);

    // Same vote again, as after a crash before the WAL write.
    let mut replay = vote(SignedMsgType::Precommit, 10, 0, Some(block(1)), 100);
    pv.sign_vote(CHAIN_ID, &mut replay, true).unwrap();

    assert_eq!(replay.signature, original.signature);
    assert_eq!(state_file_contents(&dir), persisted, "replay must not rewrite the state file");
}

#[test]
fn timestamp_only_replay_rewrites_timestamp() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut original = vote(SignedMsgType::Precommit, 10, 0, Some(block(1)), 100);
    pv.sign_vote(CHAIN_ID, &mut original, true).unwrap();
    let persisted = state_file_contents(&dir);

    let mut replay = vote(SignedMsgType::Precommit, 10, 0, Some(block(1)), 999);
    pv.sign_vote(CHAIN_ID, &mut replay, true).unwrap();

    assert_eq!(replay.timestamp, 100, "timestamp must revert to the recorded one");
    assert_eq!(replay.signature, original.signature);
    assert_eq!(state_file_contents(&dir), persisted);
}

#[test]
fn conflicting_replay_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut original = vote(SignedMsgType::Precommit, 10, 0, Some(block(1)), 100);
    pv.sign_vote(CHAIN_ID, &mut original, true).unwrap();
    let persisted = state_file_contents(&dir);

    // Same coordinate, different block: equivocation attempt.
    let mut conflicting = vote(SignedMsgType::Precommit, 10, 0, Some(block(2)), 100);
    let err = pv.sign_vote(CHAIN_ID, &mut conflicting, true).unwrap_err();

    assert!(matches!(err, PrivvalError::ConflictingData));
    assert!(conflicting.signature.is_empty(), "no signature may leak on rejection");
    assert_eq!(state_file_contents(&dir), persisted);
}

#[test]
fn height_regression_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut precommit = vote(SignedMsgType::Precommit, 10, 0, Some(block(1)), 100);
    pv.sign_vote(CHAIN_ID, &mut precommit, true).unwrap();

    let mut stale = vote(SignedMsgType::Prevote, 9, 0, Some(block(1)), 100);
    let err = pv.sign_vote(CHAIN_ID, &mut stale, true).unwrap_err();
    assert!(matches!(err, PrivvalError::HeightRegression { got: 9, last: 10 }));
}

#[test]
fn round_and_step_regressions_are_rejected() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut precommit = vote(SignedMsgType::Precommit, 10, 5, Some(block(1)), 100);
    pv.sign_vote(CHAIN_ID, &mut precommit, true).unwrap();

    let mut stale_round = vote(SignedMsgType::Precommit, 10, 4, Some(block(1)), 100);
    assert!(matches!(
        pv.sign_vote(CHAIN_ID, &mut stale_round, true),
        Err(PrivvalError::RoundRegression { .. })
    ));

    let mut stale_step = vote(SignedMsgType::Prevote, 10, 5, Some(block(1)), 100);
    assert!(matches!(
        pv.sign_vote(CHAIN_ID, &mut stale_step, true),
        Err(PrivvalError::StepRegression { .. })
    ));
}

#[test]
fn precommit_with_extension_carries_three_signatures() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut precommit = vote(SignedMsgType::Precommit, 11, 0, Some(block(3)), 100);
    precommit.extension = b"x".to_vec();
    precommit.non_rp_extension = b"y".to_vec();
    pv.sign_vote(CHAIN_ID, &mut precommit, true).unwrap();

    let pub_key = pv.pub_key();
    let base_bytes = canonical::vote_sign_bytes(CHAIN_ID, &precommit);
    let (rp_bytes, non_rp_bytes) = canonical::vote_extension_sign_bytes(CHAIN_ID, &precommit);

    assert!(pub_key.verify(&base_bytes, &precommit.signature));
    assert!(pub_key.verify(&rp_bytes, &precommit.extension_signature));
    assert!(pub_key.verify(&non_rp_bytes, &precommit.non_rp_extension_signature));
    assert_eq!(pv.last_sign_state.height, 11);
    assert_eq!(pv.last_sign_state.step, Step::Precommit);
}

#[test]
fn empty_extension_is_still_signed() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    // Non-nil precommit with zero-length extension payloads: the extension
    // signatures are produced anyway.
    let mut precommit = vote(SignedMsgType::Precommit, 11, 0, Some(block(3)), 100);
    pv.sign_vote(CHAIN_ID, &mut precommit, true).unwrap();

    assert!(!precommit.extension_signature.is_empty());
    assert!(!precommit.non_rp_extension_signature.is_empty());
}

#[test]
fn unexpected_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut prevote = vote(SignedMsgType::Prevote, 10, 0, Some(block(1)), 100);
    prevote.extension = b"x".to_vec();
    assert!(matches!(
        pv.sign_vote(CHAIN_ID, &mut prevote, true),
        Err(PrivvalError::UnexpectedExtension)
    ));

    let mut nil_precommit = vote(SignedMsgType::Precommit, 10, 0, None, 100);
    nil_precommit.non_rp_extension = b"y".to_vec();
    assert!(matches!(
        pv.sign_vote(CHAIN_ID, &mut nil_precommit, true),
        Err(PrivvalError::UnexpectedExtension)
    ));
}

#[test]
fn sign_extension_false_leaves_extensions_untouched() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut precommit = vote(SignedMsgType::Precommit, 11, 0, Some(block(3)), 100);
    precommit.extension = b"x".to_vec();
    precommit.extension_signature = b"preexisting".to_vec();
    pv.sign_vote(CHAIN_ID, &mut precommit, false).unwrap();

    assert_eq!(precommit.extension_signature, b"preexisting");
    assert!(!precommit.signature.is_empty());
}

#[test]
fn extension_signatures_are_fresh_on_replay() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut first = vote(SignedMsgType::Precommit, 11, 0, Some(block(3)), 100);
    first.extension = b"ext-a".to_vec();
    pv.sign_vote(CHAIN_ID, &mut first, true).unwrap();

    // Replay with a different application extension: base signature is
    // reused, extension signature covers the new payload.
    let mut replay = vote(SignedMsgType::Precommit, 11, 0, Some(block(3)), 100);
    replay.extension = b"ext-b".to_vec();
    pv.sign_vote(CHAIN_ID, &mut replay, true).unwrap();

    assert_eq!(replay.signature, first.signature);
    assert_ne!(replay.extension_signature, first.extension_signature);

    let (rp_bytes, _) = canonical::vote_extension_sign_bytes(CHAIN_ID, &replay);
    assert!(pv.pub_key().verify(&rp_bytes, &replay.extension_signature));
}

#[test]
fn replay_survives_restart() {
    let dir = TempDir::new().unwrap();
    let key_path = dir.path().join("priv_validator_key.json");
    let state_path = dir.path().join("priv_validator_state.json");

    let original_signature = {
        let mut pv = FilePv::generate(&key_path, &state_path, Scheme::Ed25519).unwrap();
        let mut precommit = vote(SignedMsgType::Precommit, 10, 0, Some(block(1)), 100);
        pv.sign_vote(CHAIN_ID, &mut precommit, true).unwrap();
        precommit.signature
    };

    // Fresh process, same files.
    let mut pv = FilePv::load(&key_path, &state_path);

    let mut replay = vote(SignedMsgType::Precommit, 10, 0, Some(block(1)), 100);
    pv.sign_vote(CHAIN_ID, &mut replay, true).unwrap();
    assert_eq!(replay.signature, original_signature);

    let mut conflicting = vote(SignedMsgType::Precommit, 10, 0, Some(block(9)), 100);
    assert!(matches!(
        pv.sign_vote(CHAIN_ID, &mut conflicting, true),
        Err(PrivvalError::ConflictingData)
    ));
}

#[test]
fn proposal_signing_and_replay() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut original = proposal(5, 0, Some(block(1)), 100);
    pv.sign_proposal(CHAIN_ID, &mut original).unwrap();

    let bytes = canonical::proposal_sign_bytes(CHAIN_ID, &original);
    assert!(pv.pub_key().verify(&bytes, &original.signature));
    assert_eq!(pv.last_sign_state.step, Step::Propose);

    // Timestamp-only replay.
    let mut replay = proposal(5, 0, Some(block(1)), 777);
    pv.sign_proposal(CHAIN_ID, &mut replay).unwrap();
    assert_eq!(replay.timestamp, 100);
    assert_eq!(replay.signature, original.signature);

    // Conflicting replay.
    let mut conflicting = proposal(5, 0, Some(block(2)), 100);
    assert!(matches!(
        pv.sign_proposal(CHAIN_ID, &mut conflicting),
        Err(PrivvalError::ConflictingData)
    ));

    // Proposal then prevote at the same (height, round) is a step advance.
    let mut prevote = vote(SignedMsgType::Prevote, 5, 0, Some(block(1)), 101);
    pv.sign_vote(CHAIN_ID, &mut prevote, true).unwrap();
    assert_eq!(pv.last_sign_state.step, Step::Prevote);
}

#[test]
fn returned_votes_verify_and_match_bitwise() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut first = vote(SignedMsgType::Prevote, 3, 0, Some(block(1)), 50);
    pv.sign_vote(CHAIN_ID, &mut first, true).unwrap();

    let mut second = vote(SignedMsgType::Prevote, 3, 0, Some(block(1)), 60);
    pv.sign_vote(CHAIN_ID, &mut second, true).unwrap();

    // Both returned messages canonicalize identically after the timestamp
    // rewrite, and their signatures are bitwise equal.
    assert_eq!(second.timestamp, first.timestamp);
    assert_eq!(second.signature, first.signature);
    assert_eq!(
        canonical::vote_sign_bytes(CHAIN_ID, &first),
        canonical::vote_sign_bytes(CHAIN_ID, &second)
    );
    assert!(pv
        .pub_key()
        .verify(&canonical::vote_sign_bytes(CHAIN_ID, &second), &second.signature));
}

#[test]
fn state_roundtrips_through_disk() {
    let dir = TempDir::new().unwrap();
    let key_path = dir.path().join("priv_validator_key.json");
    let state_path = dir.path().join("priv_validator_state.json");

    let mut pv = FilePv::generate(&key_path, &state_path, Scheme::Secp256k1).unwrap();
    let mut precommit = vote(SignedMsgType::Precommit, 42, 7, Some(block(4)), 100);
    pv.sign_vote(CHAIN_ID, &mut precommit, true).unwrap();
    pv.save();

    let loaded = FilePv::load(&key_path, &state_path);
    assert_eq!(loaded.last_sign_state.height, pv.last_sign_state.height);
    assert_eq!(loaded.last_sign_state.round, pv.last_sign_state.round);
    assert_eq!(loaded.last_sign_state.step, pv.last_sign_state.step);
    assert_eq!(loaded.last_sign_state.sign_bytes, pv.last_sign_state.sign_bytes);
    assert_eq!(loaded.last_sign_state.signature, pv.last_sign_state.signature);
}

#[test]
fn reset_allows_resigning_from_genesis() {
    let dir = TempDir::new().unwrap();
    let mut pv = new_pv(&dir);

    let mut precommit = vote(SignedMsgType::Precommit, 10, 0, Some(block(1)), 100);
    pv.sign_vote(CHAIN_ID, &mut precommit, true).unwrap();

    pv.reset();
    assert_eq!(pv.last_sign_state.height, 0);
    assert_eq!(pv.last_sign_state.step, Step::None);

    let mut early = vote(SignedMsgType::Prevote, 1, 0, Some(block(1)), 5);
    pv.sign_vote(CHAIN_ID, &mut early, true).unwrap();
}
