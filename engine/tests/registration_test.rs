//! User directory tests: registration, referral graph and per-user views

#![allow(clippy::disallowed_methods)]

mod common;

use std::sync::atomic::Ordering;

use common::*;
use vcn_referral_common::{
    config::MAX_ENTRIES_PER_PAGE,
    referral::{is_valid_referral_code, Currency, ReferralConfig, ReferralError, User},
};
use vcn_referral_engine::{
    config::EngineConfig,
    core::{
        error::EngineError,
        rewards::RewardRequest,
        storage::{MemoryStorage, UserProvider},
    },
};

fn referral_error(result: Result<impl std::fmt::Debug, EngineError>) -> ReferralError {
    match result {
        Err(EngineError::Referral(e)) => e,
        other => panic!("expected a referral error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_register_without_referrer() {
    let engine = memory_engine();
    let alice = engine.register("  Alice@Example.COM ", None).await;

    assert_eq!(alice.id, "alice@example.com");
    assert!(is_valid_referral_code(&alice.referral_code));
    assert!(alice.referrer_id.is_none());
    assert!(alice.grand_referrer_id.is_none());
    assert_eq!(alice.referral_count, 0);
    assert_eq!(alice.created_at, TIMESTAMP);

    // Lookups are case-insensitive
    assert_eq!(engine.user("ALICE@example.com").await, alice);
    assert_eq!(engine.storage.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_register_chain_snapshots_grand_referrer() {
    let engine = memory_engine();
    let (alice, bob, carol) = engine.chain().await;

    assert_eq!(bob.referrer_id.as_deref(), Some(alice.id.as_str()));
    assert!(bob.grand_referrer_id.is_none());
    assert_eq!(carol.referrer_id.as_deref(), Some(bob.id.as_str()));
    assert_eq!(carol.grand_referrer_id.as_deref(), Some(alice.id.as_str()));

    assert_eq!(engine.user(&alice.id).await.referral_count, 1);
    assert_eq!(engine.user(&bob.id).await.referral_count, 1);
    assert_eq!(engine.user(&carol.id).await.referral_count, 0);
}

#[tokio::test]
async fn test_referral_code_is_case_insensitive() {
    let engine = memory_engine();
    let alice = engine.register("alice@example.com", None).await;

    let code = format!("  {} ", alice.referral_code.to_lowercase());
    let bob = engine
        .directory
        .register_user("bob@example.com", Some(&code), TIMESTAMP)
        .await
        .unwrap();

    assert_eq!(bob.referrer_id.as_deref(), Some("alice@example.com"));
}

#[tokio::test]
async fn test_blank_referral_code_means_no_referrer() {
    let engine = memory_engine();
    let bob = engine
        .directory
        .register_user("bob@example.com", Some("   "), TIMESTAMP)
        .await
        .unwrap();
    assert!(bob.referrer_id.is_none());
}

#[tokio::test]
async fn test_register_errors() {
    let engine = memory_engine();
    let alice = engine.register("alice@example.com", None).await;

    let err = referral_error(
        engine
            .directory
            .register_user("ALICE@example.com", None, TIMESTAMP)
            .await,
    );
    assert_eq!(err, ReferralError::AlreadyRegistered("alice@example.com".to_owned()));

    let err = referral_error(engine.directory.register_user("   ", None, TIMESTAMP).await);
    assert_eq!(err, ReferralError::EmptyUserKey);

    let unknown = if alice.referral_code == "ZZZZZZ" { "YYYYYY" } else { "ZZZZZZ" };
    let err = referral_error(
        engine
            .directory
            .register_user("bob@example.com", Some(unknown), TIMESTAMP)
            .await,
    );
    assert_eq!(err, ReferralError::UnknownReferralCode(unknown.to_owned()));

    let err = referral_error(
        engine
            .directory
            .register_user("bob@example.com", Some("AB-12"), TIMESTAMP)
            .await,
    );
    assert_eq!(err, ReferralError::InvalidReferralCode("AB-12".to_owned()));

    // Failed registrations leave nothing behind
    assert!(engine.directory.get_user("bob@example.com").await.unwrap().is_none());
    assert_eq!(engine.user(&alice.id).await.referral_count, 0);
}

#[tokio::test]
async fn test_insert_counts_referral_only_when_stored() {
    let storage = MemoryStorage::new();
    let alice = User::new("alice@example.com".to_owned(), "AAAAAA".to_owned(), None, TIMESTAMP);
    let bob = User::new("bob@example.com".to_owned(), "BBBBBB".to_owned(), Some(&alice), TIMESTAMP);

    assert!(matches!(
        storage.insert_user(&bob).await,
        Err(EngineError::UserNotFound(key)) if key == "alice@example.com"
    ));
    assert_eq!(storage.count_users().await.unwrap(), 0);
    assert!(!storage.has_referral_code("BBBBBB").await.unwrap());

    storage.insert_user(&alice).await.unwrap();
    storage.insert_user(&bob).await.unwrap();
    let alice = storage.get_user("alice@example.com").await.unwrap().unwrap();
    assert_eq!(alice.referral_count, 1);
    assert_eq!(
        storage.get_direct_referrals(&alice.id, 0, 10).await.unwrap().items,
        vec!["bob@example.com"]
    );
}

#[tokio::test]
async fn test_failed_registration_can_be_retried() {
    let engine = TestEngine::new(FaultyStorage::new());
    let alice = engine.register("alice@example.com", None).await;

    engine.storage.failing_inserts.store(1, Ordering::SeqCst);
    assert!(engine
        .directory
        .register_user("bob@example.com", Some(&alice.referral_code), TIMESTAMP)
        .await
        .is_err());
    assert!(engine.directory.get_user("bob@example.com").await.unwrap().is_none());
    assert_eq!(engine.user(&alice.id).await.referral_count, 0);

    let bob = engine.register("bob@example.com", Some(&alice)).await;
    assert_eq!(bob.referrer_id.as_deref(), Some(alice.id.as_str()));
    assert_eq!(engine.user(&alice.id).await.referral_count, 1);
    let page = engine.directory.direct_referrals(&alice.id, 0, 10).await.unwrap();
    assert_eq!(page.items, vec!["bob@example.com"]);
}

#[tokio::test]
async fn test_codes_are_unique() {
    let engine = memory_engine();
    let mut codes = std::collections::HashSet::new();
    for i in 0..200 {
        let user = engine.register(&format!("user{}@example.com", i), None).await;
        assert!(codes.insert(user.referral_code));
    }
}

#[tokio::test]
async fn test_zero_attempts_still_tries_once() {
    let config = EngineConfig {
        referral_code_attempts: 0,
        ..Default::default()
    };
    let engine = TestEngine::with_config(MemoryStorage::new(), &config);
    engine.register("alice@example.com", None).await;
}

#[tokio::test]
async fn test_referral_summary() {
    let engine = memory_engine();
    let (alice, bob, carol) = engine.chain().await;
    engine.register_referrals(&alice, "friend", 4).await;
    let config = ReferralConfig::default();

    let request = RewardRequest::new("subscription", carol.id.as_str(), 100.0, Currency::Usd)
        .with_tx_hash("0xsummary");
    engine
        .rewards
        .process_referral_rewards(&config, &request)
        .await
        .unwrap();

    let summary = engine
        .directory
        .referral_summary("Alice@example.com", &config)
        .await
        .unwrap();
    assert_eq!(summary.user_id, alice.id);
    assert_eq!(summary.referral_code, alice.referral_code);
    assert_eq!(summary.referral_count, 5);
    assert_eq!(summary.level, config.level_info(5));
    assert_eq!(summary.level.level, 6);
    assert_eq!(summary.level.rank.as_ref().unwrap().name, "Bronze");
    assert_eq!(summary.level.invites_to_next, Some(1));
    // Alice is carol's grand referrer, at level 6
    assert_close(summary.total_rewards_usd, 100.0 * 0.05 * config.multiplier(6));
    assert_close(summary.total_rewards_vcn, 0.0);

    let summary = engine
        .directory
        .referral_summary(&bob.id, &config)
        .await
        .unwrap();
    assert_eq!(summary.referrer_id.as_deref(), Some(alice.id.as_str()));
    // Bob referred carol, so he is at level 2
    assert_close(summary.total_rewards_usd, 100.0 * 0.10 * config.multiplier(2));

    let err = engine
        .directory
        .referral_summary("ghost@example.com", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UserNotFound(key) if key == "ghost@example.com"));
}

#[tokio::test]
async fn test_direct_referrals_pages() {
    let engine = memory_engine();
    let alice = engine.register("alice@example.com", None).await;
    engine.register_referrals(&alice, "friend", 5).await;

    let page = engine
        .directory
        .direct_referrals(&alice.id, 0, 2)
        .await
        .unwrap();
    assert_eq!(page.items, vec!["friend0@example.com", "friend1@example.com"]);
    assert_eq!(page.total_count, 5);
    assert!(page.has_more);

    let page = engine
        .directory
        .direct_referrals(&alice.id, 4, 2)
        .await
        .unwrap();
    assert_eq!(page.items, vec!["friend4@example.com"]);
    assert!(!page.has_more);

    let page = engine
        .directory
        .direct_referrals(&alice.id, 10, 2)
        .await
        .unwrap();
    assert!(page.is_empty());

    let err = referral_error(
        engine
            .directory
            .direct_referrals(&alice.id, 0, MAX_ENTRIES_PER_PAGE + 1)
            .await,
    );
    assert_eq!(
        err,
        ReferralError::PageSizeTooLarge {
            max: MAX_ENTRIES_PER_PAGE,
            requested: MAX_ENTRIES_PER_PAGE + 1
        }
    );
}

#[tokio::test]
async fn test_reward_history_newest_first() {
    let engine = memory_engine();
    let alice = engine.register("alice@example.com", None).await;
    let bob = engine.register("bob@example.com", Some(&alice)).await;
    let config = flat_config(0.10, 0.05);

    for (i, amount) in [10.0, 20.0, 30.0].into_iter().enumerate() {
        engine
            .rewards
            .process_referral_rewards(
                &config,
                &usd_request("subscription", &bob, amount, &format!("0x{}", i)),
            )
            .await
            .unwrap();
    }

    let history = engine
        .directory
        .reward_history(&alice.id, 0, 10)
        .await
        .unwrap();
    assert_eq!(history.total_count, 3);
    let amounts: Vec<f64> = history.items.iter().map(|r| r.amount).collect();
    assert_close(amounts[0], 3.0);
    assert_close(amounts[1], 2.0);
    assert_close(amounts[2], 1.0);

    let history = engine
        .directory
        .reward_history(&alice.id, 1, 1)
        .await
        .unwrap();
    assert_eq!(history.items.len(), 1);
    assert_close(history.items[0].amount, 2.0);
    assert!(history.has_more);

    let history = engine.directory.reward_history(&bob.id, 0, 10).await.unwrap();
    assert!(history.is_empty());
    assert_eq!(history.total_count, 0);
}
