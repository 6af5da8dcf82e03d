//! Fund manager feeding a token sender
//!
//! A category of the fund manager points at the sender. The sender then
//! mints to recipients, pays for the mints with the native value it
//! received, and the owner claims back what is left.

use std::sync::Arc;

use fundsplit_common::{
    Address, AddressKind, EventLog, FailurePolicy, InMemoryBank, LedgerEvent, MemoryEventSink,
};
use fundsplit_ledger::FundManager;
use fundsplit_sender::{
    Distribution, InMemoryToken, InMemoryTokenDirectory, TokenLedger, TokenSender, MINT_THRESHOLD,
};

fn account(label: &str) -> Address {
    Address::derive(AddressKind::Account, label.as_bytes())
}

fn contract(label: &str) -> Address {
    Address::derive(AddressKind::Contract, label.as_bytes())
}

#[tokio::test]
async fn test_manager_funds_sender_mints() {
    let owner = account("owner");
    let sender_address = contract("token-sender");

    // Fund manager pays 60% of its pool to the sender
    let manager_bank = Arc::new(InMemoryBank::with_balance(contract("fund-manager"), 10_000));
    let manager = FundManager::new(owner.clone(), manager_bank.clone())
        .with_events(EventLog::silent("fund-manager"));
    manager
        .add_category(&owner, "rewards", sender_address.clone(), 60)
        .unwrap();
    manager
        .add_category(&owner, "team", account("team"), 40)
        .unwrap();

    let receipt = manager.distribute(10_000).await.unwrap();
    assert!(receipt.is_complete());
    let received = manager_bank.balance(&sender_address);
    assert_eq!(received, 6_000);

    // The sender's own bank starts with what the manager paid it
    let sender_bank = Arc::new(InMemoryBank::with_balance(sender_address.clone(), received));
    let token = Arc::new(InMemoryToken::new(contract("comp"), "Compound"));
    let directory = Arc::new(InMemoryTokenDirectory::new());
    directory.register(token.clone());

    let sink = Arc::new(MemoryEventSink::new());
    let sender = TokenSender::new(owner.clone(), sender_bank.clone(), directory)
        .with_events(EventLog::silent("token-sender").with_sink(sink.clone()));
    sender.receive_native(&owner, received).unwrap();
    sender.add_accepted_token(&owner, token.address()).unwrap();

    let batch = vec![
        Distribution::new(account("alice"), 40_000),
        Distribution::new(account("bob"), MINT_THRESHOLD + 1),
        Distribution::new(account("dust"), 10),
    ];
    let report = sender
        .mint_and_distribute(&owner, token.address(), &batch, FailurePolicy::AbortForAccounts)
        .await
        .unwrap();

    assert_eq!(report.delivered.len(), 2);
    assert_eq!(report.skipped, vec![Distribution::new(account("dust"), 10)]);
    // 40_000 / 20 + 2_001 / 20
    assert_eq!(token.native_received(), 2_000 + 100);
    assert_eq!(sender_bank.balance(&sender_address), 6_000 - 2_100);

    let claimed = sender.claim_native(&owner, 0).await.unwrap();
    assert_eq!(claimed, 3_900);
    assert_eq!(sender_bank.balance(&owner), 3_900);

    let events = sink.events();
    assert_eq!(events[0], LedgerEvent::FundReceived { value: 6_000 });
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, LedgerEvent::TokenDistributed { .. }))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_token_batch_continue_reports_failures() {
    let owner = account("owner");
    let bank = Arc::new(InMemoryBank::new(contract("token-sender")));
    let token = Arc::new(InMemoryToken::new(contract("usd"), "Dollar"));
    let directory = Arc::new(InMemoryTokenDirectory::new());
    directory.register(token.clone());

    let sender = TokenSender::new(owner.clone(), bank, directory)
        .with_events(EventLog::silent("token-sender"));
    sender.add_accepted_token(&owner, token.address()).unwrap();
    token.credit(sender.address(), 25);
    token.reject_deposits(&account("closed"));

    let batch = vec![
        Distribution::new(account("closed"), 5),
        Distribution::new(account("a"), 10),
        Distribution::new(account("b"), 20),
    ];
    let report = sender
        .distribute_token(&owner, token.address(), &batch, FailurePolicy::Continue)
        .await
        .unwrap();

    // closed refuses, a settles, b exceeds the remaining 15
    assert_eq!(report.delivered, vec![Distribution::new(account("a"), 10)]);
    assert_eq!(report.failed.len(), 2);
    assert!(!report.is_complete());

    let balances = sender.token_balances().await.unwrap();
    assert_eq!(balances[0].balance, 15);
    assert_eq!(balances[0].name, "Dollar");
}
