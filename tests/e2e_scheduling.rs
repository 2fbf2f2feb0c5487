mod common;

use serde_json::{Value, json};

use ledger_agent_kit::{LedgerOperation, ScheduleId, ToolResponse};

use common::{ERC20_CONTRACT, NFT_TOKEN, OPERATOR};

/// One valid call per mutating tool. Each runs after a `create_topic` call
/// that creates topic 0.0.1001.
fn mutating_calls() -> Vec<(&'static str, Value)> {
    vec![
        ("transfer_hbar", json!({"transfers": [{"account_id": "0.0.800", "amount": 2.5}]})),
        ("create_account", json!({"initial_balance": 1})),
        ("delete_account", json!({"account_id": "0.0.4242"})),
        ("create_topic", json!({"topic_memo": "news"})),
        ("submit_topic_message", json!({"topic_id": "0.0.1001", "message": "hello"})),
        ("delete_topic", json!({"topic_id": "0.0.1001"})),
        ("create_fungible_token", json!({"token_name": "Gold", "token_symbol": "GLD"})),
        ("create_non_fungible_token", json!({"token_name": "Art", "token_symbol": "ART"})),
        ("mint_non_fungible_token", json!({"token_id": "0.0.5005", "uris": ["ipfs://a"]})),
        ("associate_token", json!({"account_id": "0.0.4242", "token_ids": ["0.0.5005"]})),
        (
            "transfer_erc20",
            json!({"contract_id": "0.0.6000", "recipient_address": "0.0.800", "amount": 10}),
        ),
    ]
}

fn schedule_id(response: &ToolResponse) -> ScheduleId {
    response
        .get("schedule_id")
        .and_then(|v| v.as_str())
        .expect("schedule_id in result")
        .parse()
        .unwrap()
}

#[tokio::test]
async fn test_scheduled_mint_is_not_executed() {
    let ledger = common::sandbox();
    let dispatcher = common::dispatcher(&ledger, &common::account_and_token_config());

    let response = dispatcher
        .dispatch(
            "mint_non_fungible_token",
            json!({
                "token_id": "0.0.5005",
                "uris": ["ipfs://QmTest123"],
                "scheduling_params": {
                    "is_scheduled": true,
                    "expiration_time": "2025-11-11T10:00:00",
                    "wait_for_expiry": true
                }
            }),
        )
        .await;

    assert!(response.is_success(), "{:?}", response.error_message());
    assert_eq!(response.get("scheduled"), Some(&json!(true)));
    assert!(response.get("serial_numbers").is_none());
    let id = schedule_id(&response);
    assert!(response.human_message.contains(&id.to_string()));
    assert!(response.human_message.starts_with("Scheduled NFT mint created successfully."));

    assert_eq!(ledger.token_supply(&NFT_TOKEN), Some(0));
    assert_eq!(ledger.is_schedule_executed(&id), Some(false));

    let submissions = ledger.submissions();
    assert_eq!(submissions.len(), 1);
    let LedgerOperation::ScheduleCreate(create) = &submissions[0] else {
        panic!("expected a schedule create, got {:?}", submissions[0]);
    };
    assert!(create.wait_for_expiry);
    assert_eq!(create.payer_account_id, Some(OPERATOR));
    assert_eq!(
        create.scheduled,
        LedgerOperation::TokenMint {
            token_id: NFT_TOKEN,
            metadata: vec![b"ipfs://QmTest123".to_vec()],
        }
    );
}

#[tokio::test]
async fn test_unscheduled_flag_is_a_no_op() {
    for (tool, args) in mutating_calls() {
        let mut flagged = args.clone();
        flagged["scheduling_params"] = json!({
            "is_scheduled": false,
            "admin_key": true,
            "payer_account_id": "0.0.4242"
        });

        let plain_ledger = common::sandbox();
        let plain = common::dispatcher(&plain_ledger, &common::core_config());
        assert!(plain.dispatch("create_topic", json!({})).await.is_success());
        let expected = plain.dispatch(tool, args).await;
        assert!(expected.is_success(), "{tool}: {:?}", expected.error_message());

        let flagged_ledger = common::sandbox();
        let with_flag = common::dispatcher(&flagged_ledger, &common::core_config());
        assert!(with_flag.dispatch("create_topic", json!({})).await.is_success());
        let response = with_flag.dispatch(tool, flagged).await;
        assert!(response.is_success(), "{tool}: {:?}", response.error_message());
        assert!(response.get("scheduled").is_none(), "{tool}");

        assert_eq!(
            plain_ledger.submissions(),
            flagged_ledger.submissions(),
            "{tool}"
        );
    }
}

#[tokio::test]
async fn test_every_mutating_tool_can_be_scheduled() {
    for (tool, mut args) in mutating_calls() {
        args["scheduling_params"] = json!({"is_scheduled": true});

        let ledger = common::sandbox();
        let dispatcher = common::dispatcher(&ledger, &common::core_config());
        assert!(dispatcher.dispatch("create_topic", json!({})).await.is_success());
        let response = dispatcher.dispatch(tool, args).await;

        assert!(response.is_success(), "{tool}: {:?}", response.error_message());
        assert!(
            response.human_message.starts_with("Scheduled "),
            "{tool}: {}",
            response.human_message
        );
        let id = schedule_id(&response);
        assert_eq!(ledger.is_schedule_executed(&id), Some(false), "{tool}");
        assert!(
            matches!(ledger.submissions().last(), Some(LedgerOperation::ScheduleCreate(_))),
            "{tool}"
        );
    }
}

#[tokio::test]
async fn test_scheduled_account_deletion_runs_on_signature() {
    let ledger = common::sandbox();
    let dispatcher = common::dispatcher(&ledger, &common::core_config());

    let scheduled = dispatcher
        .dispatch(
            "delete_account",
            json!({"account_id": "0.0.4242", "scheduling_params": {"is_scheduled": true}}),
        )
        .await;
    assert!(scheduled.is_success(), "{:?}", scheduled.error_message());
    assert!(scheduled.human_message.starts_with("Scheduled account deletion"));
    let balance = json!({"account_id": "0.0.4242"});
    let before = dispatcher.dispatch("get_hbar_balance", balance.clone()).await;
    assert_eq!(before.get("balance_tinybars"), Some(&json!(1_000_000_000)));

    let signed = dispatcher
        .dispatch(
            "sign_schedule_transaction",
            json!({"schedule_id": schedule_id(&scheduled).to_string()}),
        )
        .await;
    assert!(signed.is_success(), "{:?}", signed.error_message());

    let after = dispatcher.dispatch("get_hbar_balance", balance).await;
    assert!(!after.is_success());
}

#[tokio::test]
async fn test_scheduled_erc20_transfer_calls_contract_once_signed() {
    let ledger = common::sandbox();
    let dispatcher = common::dispatcher(&ledger, &common::core_config());

    let scheduled = dispatcher
        .dispatch(
            "transfer_erc20",
            json!({
                "contract_id": "0.0.6000",
                "recipient_address": "0x1234567890123456789012345678901234567890",
                "amount": 5,
                "scheduling_params": {"is_scheduled": true}
            }),
        )
        .await;
    assert!(scheduled.is_success(), "{:?}", scheduled.error_message());
    assert_eq!(ledger.contract_calls(&ERC20_CONTRACT), Some(0));

    let signed = dispatcher
        .dispatch(
            "sign_schedule_transaction",
            json!({"schedule_id": schedule_id(&scheduled).to_string()}),
        )
        .await;
    assert!(signed.is_success(), "{:?}", signed.error_message());
    assert_eq!(ledger.contract_calls(&ERC20_CONTRACT), Some(1));
}

#[tokio::test]
async fn test_scheduled_transfer_executes_once_signed() {
    let ledger = common::sandbox();
    let dispatcher = common::dispatcher(&ledger, &common::account_and_token_config());

    let scheduled = dispatcher
        .dispatch(
            "transfer_hbar",
            json!({
                "transfers": [{"account_id": "0.0.800", "amount": 1}],
                "scheduling_params": {"is_scheduled": true, "payer_account_id": "0.0.4242"}
            }),
        )
        .await;
    assert!(scheduled.is_success(), "{:?}", scheduled.error_message());
    let id = schedule_id(&scheduled);
    assert_eq!(ledger.is_schedule_executed(&id), Some(false));

    let signed = dispatcher
        .dispatch("sign_schedule_transaction", json!({"schedule_id": id.to_string()}))
        .await;
    assert!(signed.is_success(), "{:?}", signed.error_message());
    assert!(signed.get("scheduled_transaction_id").is_some());
    assert_eq!(ledger.is_schedule_executed(&id), Some(true));
}

#[tokio::test]
async fn test_schedule_delete_needs_admin_key() {
    let ledger = common::sandbox();
    let dispatcher = common::dispatcher(&ledger, &common::account_and_token_config());

    let immutable = dispatcher
        .dispatch(
            "associate_token",
            json!({
                "account_id": "0.0.4242",
                "token_ids": ["0.0.5005"],
                "scheduling_params": {"is_scheduled": true}
            }),
        )
        .await;
    let response = dispatcher
        .dispatch(
            "schedule_delete",
            json!({"schedule_id": schedule_id(&immutable).to_string()}),
        )
        .await;
    assert!(response.error_message().unwrap().contains("SCHEDULE_IS_IMMUTABLE"));

    let deletable = dispatcher
        .dispatch(
            "associate_token",
            json!({
                "account_id": "0.0.4242",
                "token_ids": ["0.0.5005"],
                "scheduling_params": {"is_scheduled": true, "admin_key": true}
            }),
        )
        .await;
    let response = dispatcher
        .dispatch(
            "schedule_delete",
            json!({"schedule_id": schedule_id(&deletable).to_string()}),
        )
        .await;
    assert!(response.is_success(), "{:?}", response.error_message());
}

#[tokio::test]
async fn test_non_schedulable_tool_rejects_scheduling_params() {
    let ledger = common::sandbox();
    let dispatcher = common::dispatcher(&ledger, &common::account_and_token_config());

    for tool in ["sign_schedule_transaction", "schedule_delete"] {
        let response = dispatcher
            .dispatch(
                tool,
                json!({
                    "schedule_id": "0.0.1001",
                    "scheduling_params": {"is_scheduled": true}
                }),
            )
            .await;

        let error = response.error_message().unwrap();
        assert!(error.contains("scheduling_params"), "{error}");
        assert!(error.contains("does not support scheduling"), "{error}");
    }
    assert_eq!(ledger.submission_count(), 0);
}

#[tokio::test]
async fn test_wait_for_expiry_requires_expiration_time() {
    let ledger = common::sandbox();
    let dispatcher = common::dispatcher(&ledger, &common::account_and_token_config());

    let response = dispatcher
        .dispatch(
            "mint_non_fungible_token",
            json!({
                "token_id": "0.0.5005",
                "uris": ["ipfs://QmTest123"],
                "scheduling_params": {"is_scheduled": true, "wait_for_expiry": true}
            }),
        )
        .await;

    assert!(
        response
            .error_message()
            .unwrap()
            .contains("scheduling_params.expiration_time")
    );
    assert_eq!(ledger.submission_count(), 0);
}
