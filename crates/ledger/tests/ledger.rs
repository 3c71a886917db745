// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! Ledger behavior tests.
//!
//! These live as an integration test rather than an in-module `#[cfg(test)]`
//! block because they rely on the `test-assets` fixtures, and `test-assets`
//! depends on `attestor-ledger`. Compiling them inside the crate would link two
//! distinct builds of `attestor-ledger` (the `cfg(test)` lib and the plain lib
//! `test-assets` sees), making otherwise-identical types mismatch.

use alloy_primitives::{Address, U256};
use attestor_ledger::{Ledger, LedgerError};
use attestor_task::{
    CredentialLevel, CredentialOutcome, ProjectOutcome, ProjectSpec, TaskCategory, TaskId,
    TaskResponded, TaskStatus,
};
use rstest::rstest;
use test_assets::{
    seeded_ledger, sign_credential_outcome, sign_project_outcome, EXPIRY_THRESHOLD,
    OPERATOR_SIGNER, OWNER_ADDRESS, REQUESTER_ADDRESS, SUBJECT_ADDRESS, UNREGISTERED_SIGNER,
};
use test_log::test;

    fn credential_outcome(level: CredentialLevel) -> CredentialOutcome {
        CredentialOutcome {
            level,
            score: 88,
            credits: U256::from(2_000u64),
            proof_uri: "ipfs://credential-proof".to_string(),
        }
    }

    fn project_outcome() -> ProjectOutcome {
        ProjectOutcome {
            approved: true,
            score: 91,
            credits: U256::from(12_500u64),
            proof_uri: "ipfs://project-proof".to_string(),
        }
    }

    fn respond_at_level(
        ledger: &mut Ledger,
        task_id: TaskId,
        level: CredentialLevel,
    ) -> Result<(), LedgerError> {
        let outcome = credential_outcome(level);
        let signature = sign_credential_outcome(ledger, task_id, SUBJECT_ADDRESS, &outcome);
        ledger.respond_to_credential_task(
            task_id,
            OPERATOR_SIGNER.address(),
            outcome,
            &signature,
        )
    }

    #[test]
    fn position_advances_once_per_submitted_transaction() {
        let mut ledger = seeded_ledger();
        let before = ledger.current_position();

        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-1",
            )
            .unwrap();
        assert_eq!(ledger.current_position(), before + 1);
        assert_eq!(
            ledger.get_credential_task(task_id).unwrap().created_at,
            before + 1
        );

        respond_at_level(&mut ledger, task_id, CredentialLevel::Basic).unwrap();
        assert_eq!(ledger.current_position(), before + 2);

        // The acceptance is observable as an event at the response position.
        let responses = ledger.credential_responses_in(before, before + 2);
        assert_eq!(
            responses,
            vec![TaskResponded {
                position: before + 2,
                task_id,
                operator: OPERATOR_SIGNER.address(),
            }]
        );
    }

    #[test]
    fn task_ids_are_sequential_and_start_at_one() {
        let mut ledger = seeded_ledger();
        let first = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-1",
            )
            .unwrap();
        let second = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                Address::repeat_byte(0x77),
                CredentialLevel::Advanced,
                "req-2",
            )
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[test]
    fn null_requirement_is_rejected() {
        let mut ledger = seeded_ledger();
        assert_eq!(
            ledger.create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::None,
                "req-1",
            ),
            Err(LedgerError::InvalidRequirement)
        );
        assert_eq!(
            ledger.create_project_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                ProjectSpec::default(),
                "req-2",
            ),
            Err(LedgerError::InvalidRequirement)
        );
    }

    #[test]
    fn unknown_requesters_cannot_create_tasks() {
        let mut ledger = seeded_ledger();
        let outsider = Address::repeat_byte(0x99);
        assert_eq!(
            ledger.create_credential_task(
                outsider,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-1",
            ),
            Err(LedgerError::NotAuthorized { caller: outsider })
        );
    }

    #[test]
    fn completed_credential_flow_reports_levels_monotonically() {
        let mut ledger = seeded_ledger();
        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Intermediate,
                "req-1",
            )
            .unwrap();

        respond_at_level(&mut ledger, task_id, CredentialLevel::Intermediate).unwrap();

        let task = ledger.get_credential_task(task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);

        assert!(ledger.has_valid_credential(SUBJECT_ADDRESS, CredentialLevel::Basic));
        assert!(ledger.has_valid_credential(SUBJECT_ADDRESS, CredentialLevel::Intermediate));
        assert!(!ledger.has_valid_credential(SUBJECT_ADDRESS, CredentialLevel::Advanced));
        assert_eq!(
            ledger.credential_level(SUBJECT_ADDRESS),
            CredentialLevel::Intermediate
        );

        let record = ledger.get_credential(SUBJECT_ADDRESS).unwrap();
        assert_eq!(record.verified_by, OPERATOR_SIGNER.address());
        assert!(record.active);
        assert!(record.expires_at.is_some());
    }

    #[test]
    fn second_response_fails_task_not_pending_and_keeps_the_original_result() {
        let mut ledger = seeded_ledger();
        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Intermediate,
                "req-1",
            )
            .unwrap();

        respond_at_level(&mut ledger, task_id, CredentialLevel::Intermediate).unwrap();
        // A second, equally well-signed response at a different level.
        let err = respond_at_level(&mut ledger, task_id, CredentialLevel::Advanced).unwrap_err();

        assert_eq!(
            err,
            LedgerError::TaskNotPending {
                task_id,
                status: TaskStatus::Completed,
            }
        );
        assert_eq!(
            ledger.get_credential(SUBJECT_ADDRESS).unwrap().outcome.level,
            CredentialLevel::Intermediate
        );
    }

    #[test]
    fn late_response_expires_the_task_and_subsequent_attempts_see_not_pending() {
        let mut ledger = seeded_ledger();
        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-1",
            )
            .unwrap();

        ledger.advance_by(EXPIRY_THRESHOLD);
        // The response transaction itself lands one past the threshold.
        let err = respond_at_level(&mut ledger, task_id, CredentialLevel::Basic).unwrap_err();
        assert!(matches!(err, LedgerError::TaskExpired { .. }));
        assert_eq!(
            ledger.get_credential_task(task_id).unwrap().status,
            TaskStatus::Expired
        );
        assert!(!ledger.has_valid_credential(SUBJECT_ADDRESS, CredentialLevel::Basic));

        // Expiry is reported once; afterwards the terminal state wins.
        let err = respond_at_level(&mut ledger, task_id, CredentialLevel::Basic).unwrap_err();
        assert_eq!(
            err,
            LedgerError::TaskNotPending {
                task_id,
                status: TaskStatus::Expired,
            }
        );
    }

    #[test]
    fn response_exactly_at_the_threshold_is_still_accepted() {
        let mut ledger = seeded_ledger();
        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-1",
            )
            .unwrap();

        // age == threshold after the response transaction advances.
        ledger.advance_by(EXPIRY_THRESHOLD - 1);
        respond_at_level(&mut ledger, task_id, CredentialLevel::Basic).unwrap();
        assert_eq!(
            ledger.get_credential_task(task_id).unwrap().status,
            TaskStatus::Completed
        );
    }

    #[test]
    fn signature_from_a_different_key_is_rejected() {
        let mut ledger = seeded_ledger();
        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-1",
            )
            .unwrap();

        let outcome = credential_outcome(CredentialLevel::Basic);
        let signature = UNREGISTERED_SIGNER
            .sign_response(
                task_id,
                SUBJECT_ADDRESS,
                &outcome,
                ledger.credential_book_address(),
            )
            .unwrap();

        // Claimed identity is the registered operator, but the signature
        // recovers to someone else.
        let claimed = OPERATOR_SIGNER.address();
        let err = ledger
            .respond_to_credential_task(
                task_id,
                claimed,
                outcome,
                signature.as_bytes().as_slice(),
            )
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidSignature { claimed });
        assert_eq!(
            ledger.get_credential_task(task_id).unwrap().status,
            TaskStatus::Pending
        );
    }

    #[test]
    fn malformed_signature_bytes_are_rejected_not_fatal() {
        let mut ledger = seeded_ledger();
        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-1",
            )
            .unwrap();

        let claimed = OPERATOR_SIGNER.address();
        let err = ledger
            .respond_to_credential_task(
                task_id,
                claimed,
                credential_outcome(CredentialLevel::Basic),
                &[0xde, 0xad, 0xbe, 0xef],
            )
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidSignature { claimed });
    }

    #[test]
    fn valid_signature_from_an_unregistered_key_fails_not_operator() {
        let mut ledger = seeded_ledger();
        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-1",
            )
            .unwrap();

        let outcome = credential_outcome(CredentialLevel::Basic);
        let signature = UNREGISTERED_SIGNER
            .sign_response(
                task_id,
                SUBJECT_ADDRESS,
                &outcome,
                ledger.credential_book_address(),
            )
            .unwrap();

        let signer = UNREGISTERED_SIGNER.address();
        let err = ledger
            .respond_to_credential_task(task_id, signer, outcome, signature.as_bytes().as_slice())
            .unwrap_err();
        assert_eq!(err, LedgerError::NotOperator { address: signer });
    }

    #[test]
    fn response_to_unknown_task_fails() {
        let mut ledger = seeded_ledger();
        let err = respond_at_level(&mut ledger, 42, CredentialLevel::Basic).unwrap_err();
        assert_eq!(err, LedgerError::TaskNotFound { task_id: 42 });
    }

    #[test]
    fn live_satisfying_credential_blocks_a_new_task() {
        let mut ledger = seeded_ledger();
        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Intermediate,
                "req-1",
            )
            .unwrap();
        respond_at_level(&mut ledger, task_id, CredentialLevel::Intermediate).unwrap();

        // Same or lower requirement is already satisfied.
        assert_eq!(
            ledger.create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-2",
            ),
            Err(LedgerError::AlreadySatisfied {
                subject: SUBJECT_ADDRESS
            })
        );
        // A higher requirement is new work.
        ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Advanced,
                "req-3",
            )
            .unwrap();
    }

    #[test]
    fn revoked_credentials_stop_counting_and_unblock_new_tasks() {
        let mut ledger = seeded_ledger();
        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Intermediate,
                "req-1",
            )
            .unwrap();
        respond_at_level(&mut ledger, task_id, CredentialLevel::Intermediate).unwrap();

        assert!(ledger.revoke_credential(OWNER_ADDRESS, SUBJECT_ADDRESS).unwrap());
        assert!(!ledger.has_valid_credential(SUBJECT_ADDRESS, CredentialLevel::Basic));
        assert_eq!(ledger.credential_level(SUBJECT_ADDRESS), CredentialLevel::None);
        // Already inactive: nothing to deactivate.
        assert!(!ledger.revoke_credential(OWNER_ADDRESS, SUBJECT_ADDRESS).unwrap());

        ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-2",
            )
            .unwrap();
    }

    #[test]
    fn result_staleness_is_checked_at_read_time() {
        let mut ledger = seeded_ledger();
        let task_id = ledger
            .create_credential_task(
                REQUESTER_ADDRESS,
                SUBJECT_ADDRESS,
                CredentialLevel::Basic,
                "req-1",
            )
            .unwrap();
        respond_at_level(&mut ledger, task_id, CredentialLevel::Basic).unwrap();

        let expires_at = ledger
            .get_credential(SUBJECT_ADDRESS)
            .unwrap()
            .expires_at
            .unwrap();

        assert!(ledger.has_valid_credential_at(
            SUBJECT_ADDRESS,
            CredentialLevel::Basic,
            expires_at - 1
        ));
        assert!(!ledger.has_valid_credential_at(
            SUBJECT_ADDRESS,
            CredentialLevel::Basic,
            expires_at
        ));
        assert_eq!(
            ledger.credential_level_at(SUBJECT_ADDRESS, expires_at),
            CredentialLevel::None
        );
        // The record itself is still there; nothing expired it in place.
        assert!(ledger.get_credential(SUBJECT_ADDRESS).unwrap().active);
    }

    #[test]
    fn project_results_are_keyed_by_task_and_do_not_age_out() {
        let mut ledger = seeded_ledger();
        let spec = ProjectSpec {
            category: "reforestation".to_string(),
            metadata: r#"{"hectares":120}"#.to_string(),
        };
        let first = ledger
            .create_project_task(REQUESTER_ADDRESS, SUBJECT_ADDRESS, spec.clone(), "req-1")
            .unwrap();
        let second = ledger
            .create_project_task(REQUESTER_ADDRESS, SUBJECT_ADDRESS, spec, "req-2")
            .unwrap();

        for task_id in [first, second] {
            let outcome = project_outcome();
            let signature = sign_project_outcome(&ledger, task_id, SUBJECT_ADDRESS, &outcome);
            ledger
                .respond_to_project_task(
                    task_id,
                    OPERATOR_SIGNER.address(),
                    outcome,
                    &signature,
                )
                .unwrap();
        }

        let first_record = ledger.get_project_result(first).unwrap();
        let second_record = ledger.get_project_result(second).unwrap();
        assert_eq!(first_record.expires_at, None);
        assert!(first_record.is_live(u64::MAX));
        assert_eq!(second_record.verified_by, OPERATOR_SIGNER.address());
    }

    #[test]
    fn creation_events_respect_the_half_open_range() {
        let mut ledger = seeded_ledger();
        let base = ledger.current_position();
        for n in 0..3 {
            ledger
                .create_credential_task(
                    REQUESTER_ADDRESS,
                    Address::repeat_byte(0x50 + n),
                    CredentialLevel::Basic,
                    format!("req-{n}"),
                )
                .unwrap();
        }

        // (base, base+1] holds exactly the first creation.
        let events = ledger.credential_tasks_created_in(base, base + 1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].task_id, 1);

        // The lower bound is exclusive.
        let events = ledger.credential_tasks_created_in(base + 1, base + 3);
        assert_eq!(
            events.iter().map(|e| e.task_id).collect::<Vec<_>>(),
            vec![2, 3]
        );

        assert!(ledger
            .credential_tasks_created_in(base + 3, base + 10)
            .is_empty());
    }

    // Isolated so the `#[rstest]`-generated `#[test]` resolves `test` to the
    // prelude unambiguously (this scope does not import `test_log::test`).
    mod owner_gated {
        use alloy_primitives::Address;
        use attestor_ledger::LedgerError;
        use attestor_task::TaskCategory;
        use rstest::rstest;
        use test_assets::{seeded_ledger, OWNER_ADDRESS};

        #[rstest]
        #[case(TaskCategory::Credential)]
        #[case(TaskCategory::Project)]
        fn admin_calls_are_owner_gated(#[case] category: TaskCategory) {
            let mut ledger = seeded_ledger();
            let outsider = Address::repeat_byte(0x99);
            assert_eq!(
                ledger.set_expiry_threshold(outsider, category, 10),
                Err(LedgerError::NotAuthorized { caller: outsider })
            );
            ledger
                .set_expiry_threshold(OWNER_ADDRESS, category, 10)
                .unwrap();
        }
    }

    #[test]
    fn operator_registry_is_a_pure_predicate() {
        let mut ledger = seeded_ledger();
        let newcomer = Address::repeat_byte(0x66);
        assert!(!ledger.is_operator(newcomer));
        ledger.register_operator(OWNER_ADDRESS, newcomer).unwrap();
        assert!(ledger.is_operator(newcomer));
        ledger.deregister_operator(OWNER_ADDRESS, newcomer).unwrap();
        assert!(!ledger.is_operator(newcomer));
    }
