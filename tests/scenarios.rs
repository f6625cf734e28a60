//! Ledger scenario tests
//!
//! These tests drive the [`Ledger`] facade the way the host environment does: one
//! call per transaction, each with its own transaction id and a strictly increasing
//! deterministic time. Escrow callbacks are driven from the contracts recorded by
//! [`LocalContracts`].

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use token_ledger::core::TxContext;
    use token_ledger::service::{AccountWithBalance, CallbackOutcome, Ledger, PayRequest, TransferRequest};
    use token_ledger::types::{
        AccountType, Address, Amount, BalanceLogType, Contract, LedgerError, PageRequest, PendingSort, QueryResult,
        SortOrder, TimeRange, TokenMeta, TxTime,
    };
    use token_ledger::{LedgerConfig, LocalContracts, MemoryStore, StaticTokenMeta};

    const H1: &str = "1111111111111111111111111111111111111111";
    const H2: &str = "2222222222222222222222222222222222222222";
    const H3: &str = "3333333333333333333333333333333333333333";
    const START: i64 = 1_700_000_000;

    fn amount(value: i64) -> Amount {
        Amount::from_i64(value)
    }

    fn meta(max_supply: i64, initial_supply: i64, fee: Option<&str>) -> TokenMeta {
        TokenMeta {
            decimal: 0,
            max_supply: amount(max_supply),
            initial_supply: amount(initial_supply),
            fee: fee.map(str::to_string),
            target_address: None,
        }
    }

    /// Every page of a listing, two records at a time
    fn pages<T>(mut fetch: impl FnMut(PageRequest) -> QueryResult<T>) -> Vec<Vec<T>> {
        let mut pages = Vec::new();
        let mut bookmark = None;
        loop {
            let result = fetch(PageRequest::new(bookmark.take(), 2, SortOrder::Asc));
            if result.records.is_empty() {
                return pages;
            }
            bookmark = Some(result.meta.bookmark.clone());
            pages.push(result.records);
        }
    }

    /// Ledger over a fresh store with token ABC issued by H1
    struct Harness {
        ledger: Ledger,
        contracts: Arc<LocalContracts>,
        tx: Cell<u32>,
    }

    impl Harness {
        fn new(meta: TokenMeta) -> Self {
            Self::with_config(meta, LedgerConfig::default())
        }

        fn with_config(meta: TokenMeta, config: LedgerConfig) -> Self {
            let contracts = Arc::new(LocalContracts::new());
            let ledger = Ledger::new(
                Arc::new(MemoryStore::new()),
                contracts.clone(),
                Arc::new(StaticTokenMeta::default().with_token("ABC", meta)),
                config,
            );
            let harness = Harness {
                ledger,
                contracts,
                tx: Cell::new(0),
            };
            let created = harness.ledger.token_create(harness.ctx(H1), "ABC", &[]).unwrap();
            assert!(created.applied().is_some());
            harness
        }

        /// Context of the next transaction, one second after the previous one
        fn next_ctx(&self) -> TxContext {
            let tx = self.tx.get() + 1;
            self.tx.set(tx);
            TxContext::new(format!("tx-{:05}", tx), TxTime::from_unix(START + tx as i64, 0).unwrap())
        }

        fn ctx(&self, invoker: &str) -> TxContext {
            self.next_ctx().with_invoker(invoker)
        }

        fn service_ctx(&self) -> TxContext {
            self.next_ctx().from_contract_service()
        }

        fn personal(&self, holder: &str) -> Address {
            Address::derive("ABC", AccountType::Personal, holder).unwrap()
        }

        fn open(&self, holder: &str) -> Address {
            self.ledger.account_create(self.ctx(holder), "ABC", &[]).unwrap();
            self.personal(holder)
        }

        fn genesis(&self) -> Address {
            self.ledger.token_get(self.ctx(H1), "ABC").unwrap().genesis_account
        }

        fn balance(&self, address: &Address) -> Amount {
            self.account(address).balance.amount
        }

        fn account(&self, address: &Address) -> AccountWithBalance {
            self.ledger.account_get(self.ctx(H1), &address.to_string()).unwrap()
        }

        /// Fee-exempt transfer from the genesis account
        fn fund(&self, receiver: &Address, value: i64) {
            let request = TransferRequest {
                sender: Some(self.genesis().to_string()),
                ..TransferRequest::new(receiver.to_string(), amount(value))
            };
            self.ledger.transfer(self.ctx(H1), request).unwrap();
        }

        fn fee_count(&self) -> usize {
            let page = PageRequest::new(None, 200, Default::default());
            self.ledger
                .fee_list(self.ctx(H1), "ABC", TimeRange::default(), page)
                .unwrap()
                .records
                .len()
        }

        /// Joint account of H1 and H2 created through escrow
        fn joint(&self) -> Address {
            self.open(H1);
            let h2 = self.open(H2);
            let outcome = self
                .ledger
                .account_create(self.ctx(H1), "ABC", &[h2.to_string()])
                .unwrap();
            let contract = outcome.contract().cloned().unwrap();
            match self.execute(&contract).unwrap() {
                CallbackOutcome::Account(created) => created.account.address().clone(),
                other => panic!("unexpected callback outcome {:?}", other),
            }
        }

        fn execute(&self, contract: &Contract) -> Result<CallbackOutcome, LedgerError> {
            let document = contract.document.to_json().unwrap();
            self.ledger.contract_execute(self.service_ctx(), &contract.id, &document)
        }

        fn cancel(&self, contract: &Contract) -> Result<CallbackOutcome, LedgerError> {
            let document = contract.document.to_json().unwrap();
            self.ledger.contract_cancel(self.service_ctx(), &contract.id, &document)
        }

        /// H1 transfers `value` from the H1/H2 joint account to H3, escrowed for both signers
        fn escrowed_transfer(&self, joint: &Address, value: i64) -> (Contract, Address, String) {
            let h3 = self.open(H3);
            let ctx = self.ctx(H1);
            let pending_id = ctx.tx_id().to_string();
            let request = TransferRequest {
                sender: Some(joint.to_string()),
                ..TransferRequest::new(h3.to_string(), amount(value))
            };
            let contract = self.ledger.transfer(ctx, request).unwrap().contract().cloned().unwrap();
            (contract, h3, pending_id)
        }

        /// Joint account of H1, H2 and H3; H3 is added through escrow
        fn three_holder_joint(&self) -> Address {
            let joint = self.joint();
            let h3 = self.open(H3);
            let added = self
                .ledger
                .account_holder_add(self.ctx(H1), &joint.to_string(), &h3.to_string())
                .unwrap();
            let contract = added.contract().cloned().unwrap();
            self.execute(&contract).unwrap();
            assert!(self.account(&joint).account.has_holder(H3));
            joint
        }
    }

    #[test]
    fn test_scenario_a_mint_on_single_holder_token() {
        let h = Harness::new(meta(1000, 100, None));
        let genesis = h.genesis();
        assert_eq!(h.balance(&genesis), amount(100));

        let result = h.ledger.token_mint(h.ctx(H1), "ABC", amount(50)).unwrap().applied().unwrap();

        assert_eq!(result.token.supply, amount(150));
        assert_eq!(result.balance_log.log_type, BalanceLogType::Mint);
        assert_eq!(result.balance_log.diff, amount(50));
        assert_eq!(result.balance_log.amount, amount(150));
        assert_eq!(h.balance(&genesis), amount(150));

        let mints = h
            .ledger
            .balance_logs(
                h.ctx(H1),
                &genesis.to_string(),
                Some(BalanceLogType::Mint),
                TimeRange::default(),
                PageRequest::default(),
            )
            .unwrap();
        let diffs: Vec<Amount> = mints.records.iter().map(|log| log.diff.clone()).collect();
        assert_eq!(diffs, vec![amount(100), amount(50)]);
    }

    #[rstest]
    #[case::one_percent_floors_to_zero("transfer=0.01", 0)]
    #[case::ten_percent("transfer=0.1", 3)]
    #[case::ratio_form("transfer=1/10", 3)]
    #[case::capped("transfer=0.5,2", 2)]
    fn test_scenario_b_transfer_fee(#[case] fee_text: &str, #[case] expected_fee: i64) {
        let h = Harness::new(meta(1000, 1000, Some(fee_text)));
        let h1 = h.open(H1);
        let h2 = h.open(H2);
        h.fund(&h1, 100);
        assert_eq!(h.fee_count(), 0);

        let log = h
            .ledger
            .transfer(h.ctx(H1), TransferRequest::new(h2.to_string(), amount(30)))
            .unwrap()
            .applied()
            .unwrap();

        assert_eq!(log.log_type, BalanceLogType::Send);
        assert_eq!(log.diff, amount(-30 - expected_fee));
        assert_eq!(h.balance(&h1), amount(100 - 30 - expected_fee));
        assert_eq!(h.balance(&h2), amount(30));
        assert_eq!(h.fee_count(), usize::from(expected_fee > 0));
    }

    #[test]
    fn test_scenario_c_escrowed_transfer_cancelled() {
        let h = Harness::new(meta(1000, 1000, Some("transfer=0.1")));
        let joint = h.joint();
        h.fund(&joint, 100);

        let (contract, h3, pending_id) = h.escrowed_transfer(&joint, 30);

        assert_eq!(contract.signers.len(), 2);
        assert_eq!(h.balance(&joint), amount(67));
        let pending = h.ledger.pending_get(h.ctx(H1), &pending_id).unwrap();
        assert_eq!(pending.amount, amount(30));
        assert_eq!(pending.fee, Some(amount(3)));
        assert_eq!(pending.rid, contract.id);

        match h.cancel(&contract).unwrap() {
            CallbackOutcome::Withdrawn(log) => assert_eq!(log.diff, amount(33)),
            other => panic!("unexpected callback outcome {:?}", other),
        }

        assert_eq!(h.balance(&joint), amount(100));
        assert_eq!(h.balance(&h3), amount(0));
        assert_eq!(h.fee_count(), 0);
        assert!(matches!(
            h.ledger.pending_get(h.ctx(H1), &pending_id),
            Err(LedgerError::PendingBalanceNotFound { .. })
        ));
    }

    #[test]
    fn test_escrowed_transfer_finalized() {
        let h = Harness::new(meta(1000, 1000, Some("transfer=0.1")));
        let joint = h.joint();
        h.fund(&joint, 100);
        let (contract, h3, pending_id) = h.escrowed_transfer(&joint, 30);

        match h.execute(&contract).unwrap() {
            CallbackOutcome::Credited(log) => {
                assert_eq!(log.address, h3);
                assert_eq!(log.diff, amount(30));
            }
            other => panic!("unexpected callback outcome {:?}", other),
        }

        assert_eq!(h.balance(&joint), amount(67));
        assert_eq!(h.balance(&h3), amount(30));
        assert_eq!(h.fee_count(), 1);
        assert!(h.ledger.pending_get(h.ctx(H1), &pending_id).is_err());
    }

    #[rstest]
    #[case::finalize_then_cancel(true)]
    #[case::cancel_then_finalize(false)]
    fn test_escrow_terminates_once(#[case] finalize_first: bool) {
        let h = Harness::new(meta(1000, 1000, None));
        let joint = h.joint();
        h.fund(&joint, 100);
        let (contract, h3, _) = h.escrowed_transfer(&joint, 40);

        let (first, second) = if finalize_first {
            (h.execute(&contract), h.cancel(&contract))
        } else {
            (h.cancel(&contract), h.execute(&contract))
        };

        assert!(first.is_ok());
        assert!(matches!(second, Err(LedgerError::PendingBalanceNotFound { .. })));
        let total = h.balance(&joint) + h.balance(&h3);
        assert_eq!(total, amount(100));
    }

    #[test]
    fn test_callbacks_require_contract_service_origin() {
        let h = Harness::new(meta(1000, 1000, None));
        let joint = h.joint();
        h.fund(&joint, 100);
        let (contract, _, pending_id) = h.escrowed_transfer(&joint, 40);
        let document = contract.document.to_json().unwrap();

        let result = h.ledger.contract_execute(h.ctx(H1), &contract.id, &document);

        assert!(matches!(result, Err(LedgerError::InvalidAccess { .. })));
        assert!(h.ledger.pending_get(h.ctx(H1), &pending_id).is_ok());
    }

    #[test]
    fn test_callback_checks_document_against_pending_balance() {
        let h = Harness::new(meta(1000, 1000, None));
        let joint = h.joint();
        h.fund(&joint, 100);
        let (contract, _, pending_id) = h.escrowed_transfer(&joint, 40);
        let tampered = contract.document.to_json().unwrap().replace("\"40\"", "\"90\"");

        let result = h.ledger.contract_execute(h.service_ctx(), &contract.id, &tampered);
        assert!(matches!(result, Err(LedgerError::PendingBalanceMismatch { .. })));

        let wrong_contract = h
            .ledger
            .contract_cancel(h.service_ctx(), "contract-other", &contract.document.to_json().unwrap());
        assert!(matches!(wrong_contract, Err(LedgerError::PendingBalanceMismatch { .. })));

        let garbage = h.ledger.contract_execute(h.service_ctx(), &contract.id, "{\"type\":\"drop-tables\"}");
        assert!(matches!(garbage, Err(LedgerError::InvalidDocument { .. })));

        assert!(h.ledger.pending_get(h.ctx(H1), &pending_id).is_ok());
        assert_eq!(h.balance(&joint), amount(60));
    }

    #[test]
    fn test_scenario_d_partial_refunds_bounded_by_pay_amount() {
        let h = Harness::new(meta(1000, 1000, Some("pay=0.05")));
        let merchant = h.open(H2);
        let payer = h.open(H3);
        h.fund(&payer, 200);

        let request = PayRequest {
            order_id: Some("order-1".to_string()),
            ..PayRequest::new(merchant.to_string(), amount(100))
        };
        let paid = h.ledger.pay(h.ctx(H3), request).unwrap().applied().unwrap();
        assert_eq!(paid.pay.fee, amount(5));
        assert_eq!(paid.balance_log.diff, amount(-100));
        assert_eq!(h.balance(&payer), amount(100));
        assert_eq!(h.balance(&merchant), amount(0));
        let pay_id = paid.pay.pay_id.clone();

        let refund = h.ledger.pay_refund(h.ctx(H2), &pay_id, amount(40), "damaged").unwrap();
        assert_eq!(refund.address, payer);
        assert_eq!(refund.diff, amount(40));
        assert_eq!(h.balance(&payer), amount(140));

        let root = h.ledger.pay_get(h.ctx(H2), Some(&pay_id), None).unwrap();
        assert_eq!(root.total_refund, amount(40));
        let rows = h
            .ledger
            .pay_list(h.ctx(H2), "ABC", TimeRange::default(), PageRequest::default())
            .unwrap()
            .records;
        let refund_row = rows.iter().find(|row| row.is_refund()).unwrap();
        assert_eq!(refund_row.amount, amount(-40));
        assert_eq!(refund_row.fee, amount(-2));
        assert_eq!(refund_row.parent_id.as_deref(), Some(pay_id.as_str()));

        let rejected = h.ledger.pay_refund(h.ctx(H2), &pay_id, amount(61), "");
        assert!(matches!(rejected, Err(LedgerError::RefundExceedsOriginal { .. })));
        assert_eq!(h.balance(&payer), amount(140));
        let root = h.ledger.pay_get(h.ctx(H2), None, Some("order-1")).unwrap();
        assert_eq!(root.total_refund, amount(40));

        let refund_of_refund = h.ledger.pay_refund(h.ctx(H2), &refund_row.pay_id, amount(1), "");
        assert!(refund_of_refund.is_err());
    }

    #[test]
    fn test_pay_prune_credits_net_and_charges_fee_to_merchant() {
        let h = Harness::new(meta(1000, 1000, Some("pay=0.05")));
        let merchant = h.open(H2);
        let payer = h.open(H3);
        h.fund(&payer, 200);
        let paid = h
            .ledger
            .pay(h.ctx(H3), PayRequest::new(merchant.to_string(), amount(100)))
            .unwrap()
            .applied()
            .unwrap();
        h.ledger.pay_refund(h.ctx(H2), &paid.pay.pay_id, amount(40), "").unwrap();

        let sum = h.ledger.pay_prune(h.ctx(H2), "ABC", false, None).unwrap();

        assert_eq!(sum.count, 2);
        assert_eq!(sum.sum, amount(60));
        assert_eq!(sum.fee, amount(3));
        assert!(!sum.has_more);
        assert_eq!(h.balance(&merchant), amount(57));
        assert_eq!(h.fee_count(), 1);

        let again = h.ledger.pay_prune(h.ctx(H2), "ABC", false, None).unwrap();
        assert_eq!(again.count, 0);
        assert_eq!(h.balance(&merchant), amount(57));
    }

    #[test]
    fn test_scenario_e_fee_prune_in_batches() {
        let h = Harness::new(meta(1_000_000, 100_000, Some("transfer=0.1")));
        let genesis = h.genesis();
        let sender = h.open(H2);
        let receiver = h.open(H3);
        h.fund(&sender, 11_000);
        let genesis_before = h.balance(&genesis);

        for _ in 0..1000 {
            h.ledger
                .transfer(h.ctx(H2), TransferRequest::new(receiver.to_string(), amount(10)))
                .unwrap();
        }
        assert_eq!(h.balance(&sender), amount(0));

        let first = h.ledger.fee_prune(h.ctx(H1), "ABC", false, None).unwrap();
        assert_eq!(first.count, 900);
        assert_eq!(first.sum, amount(900));
        assert!(first.has_more);
        let token = h.ledger.token_get(h.ctx(H1), "ABC").unwrap();
        assert_eq!(token.last_pruned_fee_id, first.end);

        let second = h.ledger.fee_prune(h.ctx(H1), "ABC", false, None).unwrap();
        assert_eq!(second.count, 100);
        assert_eq!(second.sum, amount(100));
        assert!(!second.has_more);
        assert!(second.start > first.end);

        let third = h.ledger.fee_prune(h.ctx(H1), "ABC", false, None).unwrap();
        assert_eq!(third.count, 0);
        assert_eq!(h.balance(&genesis), genesis_before + amount(1000));
    }

    #[test]
    fn test_safe_fee_prune_skips_recent_fees() {
        let h = Harness::new(meta(1000, 1000, Some("transfer=0.1")));
        let sender = h.open(H2);
        let receiver = h.open(H3);
        h.fund(&sender, 100);
        h.ledger
            .transfer(h.ctx(H2), TransferRequest::new(receiver.to_string(), amount(50)))
            .unwrap();

        let safe = h.ledger.fee_prune(h.ctx(H1), "ABC", true, None).unwrap();
        assert_eq!(safe.count, 0);

        let unsafe_prune = h.ledger.fee_prune(h.ctx(H1), "ABC", false, None).unwrap();
        assert_eq!(unsafe_prune.count, 1);
        assert_eq!(unsafe_prune.sum, amount(5));
    }

    #[test]
    fn test_fee_prune_requires_genesis_holder() {
        let h = Harness::new(meta(1000, 1000, Some("transfer=0.1")));
        h.open(H2);
        let result = h.ledger.fee_prune(h.ctx(H2), "ABC", false, None);
        assert!(matches!(result, Err(LedgerError::NotHolder { .. })));
    }

    #[rstest]
    #[case::small(30, "transfer=0.1")]
    #[case::large(999, "transfer=0.1")]
    #[case::capped(900, "transfer=0.1,7")]
    #[case::no_policy(55, "")]
    fn test_instant_transfer_conserves_value(#[case] value: i64, #[case] fee_text: &str) {
        let fee = Some(fee_text).filter(|text| !text.is_empty());
        let h = Harness::new(meta(10_000, 10_000, fee));
        let sender = h.open(H2);
        let receiver = h.open(H3);
        h.fund(&sender, 2_000);
        let sender_before = h.balance(&sender);
        let receiver_before = h.balance(&receiver);

        let log = h
            .ledger
            .transfer(h.ctx(H2), TransferRequest::new(receiver.to_string(), amount(value)))
            .unwrap()
            .applied()
            .unwrap();
        let fee = log.fee.unwrap_or(Amount::ZERO);

        let sent = sender_before - h.balance(&sender);
        let received = h.balance(&receiver) - receiver_before;
        assert_eq!(sent, amount(value) + fee);
        assert_eq!(received, amount(value));
    }

    #[test]
    fn test_rejected_transfer_leaves_no_trace() {
        let h = Harness::new(meta(1000, 1000, Some("transfer=0.1")));
        let sender = h.open(H2);
        let receiver = h.open(H3);
        h.fund(&sender, 32);

        let result = h
            .ledger
            .transfer(h.ctx(H2), TransferRequest::new(receiver.to_string(), amount(30)));

        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(h.balance(&sender), amount(32));
        assert_eq!(h.balance(&receiver), amount(0));
        assert_eq!(h.fee_count(), 0);
    }

    #[test]
    fn test_supply_stays_within_bounds() {
        let h = Harness::new(meta(1000, 900, None));
        let genesis = h.genesis();

        let minted = h.ledger.token_mint(h.ctx(H1), "ABC", amount(500)).unwrap().applied().unwrap();
        assert_eq!(minted.token.supply, amount(1000));
        assert_eq!(minted.balance_log.diff, amount(100));

        let at_max = h.ledger.token_mint(h.ctx(H1), "ABC", amount(1));
        assert!(matches!(at_max, Err(LedgerError::Supply { .. })));

        let holder = h.open(H2);
        h.fund(&holder, 400);
        let burned = h.ledger.token_burn(h.ctx(H1), "ABC", amount(5000)).unwrap().applied().unwrap();
        assert_eq!(burned.balance_log.diff, amount(-600));
        assert_eq!(burned.token.supply, amount(400));
        assert_eq!(h.balance(&genesis), amount(0));

        let nothing = h.ledger.token_burn(h.ctx(H1), "ABC", amount(1));
        assert!(matches!(nothing, Err(LedgerError::Supply { .. })));
    }

    #[rstest]
    #[case::from_genesis(true)]
    #[case::from_personal(false)]
    fn test_fee_exemption_for_genesis(#[case] from_genesis: bool) {
        let h = Harness::new(meta(1000, 1000, Some("transfer=0.5")));
        let genesis = h.genesis();
        let personal = h.open(H1);
        let receiver = h.open(H2);
        h.fund(&personal, 100);

        let sender = if from_genesis { genesis } else { personal };
        let request = TransferRequest {
            sender: Some(sender.to_string()),
            ..TransferRequest::new(receiver.to_string(), amount(40))
        };
        let before = h.balance(&sender);
        h.ledger.transfer(h.ctx(H1), request).unwrap();

        let expected_fee = if from_genesis { 0 } else { 20 };
        assert_eq!(
            before - h.balance(&sender),
            amount(40 + expected_fee)
        );
    }

    #[test]
    fn test_time_locked_transfer_withdrawn_by_receiver_after_release() {
        let h = Harness::new(meta(1000, 1000, None));
        let sender = h.open(H2);
        let receiver = h.open(H3);
        h.fund(&sender, 100);

        let ctx = h.ctx(H2);
        let pending_id = ctx.tx_id().to_string();
        let release = ctx.timestamp().plus_seconds(5);
        let request = TransferRequest {
            pending_time: Some(release),
            ..TransferRequest::new(receiver.to_string(), amount(25))
        };
        h.ledger.transfer(ctx, request).unwrap();
        assert_eq!(h.balance(&sender), amount(75));
        assert_eq!(h.balance(&receiver), amount(0));

        let early = h.ledger.pending_withdraw(h.ctx(H3), &pending_id);
        assert!(matches!(early, Err(LedgerError::TooEarlyWithdrawal { .. })));

        for _ in 0..5 {
            h.next_ctx();
        }
        let log = h.ledger.pending_withdraw(h.ctx(H3), &pending_id).unwrap();
        assert_eq!(log.diff, amount(25));
        assert_eq!(h.balance(&receiver), amount(25));
        assert!(h.ledger.pending_get(h.ctx(H3), &pending_id).is_err());
    }

    #[test]
    fn test_mint_on_joint_genesis_is_escrowed_until_finalized() {
        let h = Harness::new(meta(1000, 100, None));
        let genesis = h.genesis();
        let h2 = h.open(H2);

        let added = h
            .ledger
            .account_holder_add(h.ctx(H1), &genesis.to_string(), &h2.to_string())
            .unwrap();
        let contract = added.contract().cloned().unwrap();
        match h.execute(&contract).unwrap() {
            CallbackOutcome::Account(updated) => assert!(updated.account.has_holder(H2)),
            other => panic!("unexpected callback outcome {:?}", other),
        }

        let outcome = h.ledger.token_mint(h.ctx(H1), "ABC", amount(10)).unwrap();
        let contract = outcome.contract().cloned().unwrap();
        assert_eq!(h.ledger.token_get(h.ctx(H1), "ABC").unwrap().supply, amount(100));

        match h.execute(&contract).unwrap() {
            CallbackOutcome::Supply(result) => assert_eq!(result.token.supply, amount(110)),
            other => panic!("unexpected callback outcome {:?}", other),
        }
        assert_eq!(h.balance(&genesis), amount(110));
        assert_eq!(h.contracts.len(), 2);
    }

    #[test]
    fn test_refund_to_suspended_payer_is_rejected() {
        let h = Harness::new(meta(1000, 1000, Some("pay=0.05")));
        let merchant = h.open(H2);
        let payer = h.open(H3);
        h.fund(&payer, 200);
        let paid = h
            .ledger
            .pay(h.ctx(H3), PayRequest::new(merchant.to_string(), amount(100)))
            .unwrap()
            .applied()
            .unwrap();
        h.ledger.account_suspend(h.ctx(H3), "ABC").unwrap();

        let result = h.ledger.pay_refund(h.ctx(H2), &paid.pay.pay_id, amount(40), "");

        assert!(matches!(result, Err(LedgerError::AccountSuspended { .. })));
        assert_eq!(h.balance(&payer), amount(100));
        let root = h.ledger.pay_get(h.ctx(H2), Some(&paid.pay.pay_id), None).unwrap();
        assert_eq!(root.total_refund, amount(0));

        h.ledger.account_unsuspend(h.ctx(H3), "ABC").unwrap();
        h.ledger.pay_refund(h.ctx(H2), &paid.pay.pay_id, amount(40), "").unwrap();
        assert_eq!(h.balance(&payer), amount(140));
    }

    #[rstest]
    #[case::transfer_from_suspended_sender(false, H2)]
    #[case::transfer_to_suspended_receiver(false, H3)]
    #[case::pay_from_suspended_payer(true, H2)]
    #[case::pay_to_suspended_merchant(true, H3)]
    fn test_suspended_accounts_cannot_move_value(#[case] as_pay: bool, #[case] suspended: &str) {
        let h = Harness::new(meta(1000, 1000, None));
        let sender = h.open(H2);
        let receiver = h.open(H3);
        h.fund(&sender, 100);
        h.ledger.account_suspend(h.ctx(suspended), "ABC").unwrap();

        let result = if as_pay {
            h.ledger
                .pay(h.ctx(H2), PayRequest::new(receiver.to_string(), amount(30)))
                .map(|_| ())
        } else {
            h.ledger
                .transfer(h.ctx(H2), TransferRequest::new(receiver.to_string(), amount(30)))
                .map(|_| ())
        };

        assert!(matches!(result, Err(LedgerError::AccountSuspended { .. })));
        assert_eq!(h.balance(&sender), amount(100));
        assert_eq!(h.balance(&receiver), amount(0));
    }

    #[test]
    fn test_holder_removing_themself_applies_immediately() {
        let h = Harness::new(meta(1000, 1000, None));
        let joint = h.three_holder_joint();
        let h3 = h.personal(H3);
        let contracts_before = h.contracts.len();

        let outcome = h
            .ledger
            .account_holder_remove(h.ctx(H3), &joint.to_string(), &h3.to_string())
            .unwrap();

        let removed = outcome.applied().unwrap();
        assert!(!removed.account.has_holder(H3));
        assert_eq!(h.contracts.len(), contracts_before);
        assert!(!h.account(&joint).account.has_holder(H3));
        let held = h.ledger.account_list(h.ctx(H3), Some("ABC"), PageRequest::default()).unwrap();
        assert!(held.records.iter().all(|row| row.address != joint));

        let below_minimum =
            h.ledger
                .account_holder_remove(h.ctx(H2), &joint.to_string(), &h.personal(H2).to_string());
        assert!(matches!(below_minimum, Err(LedgerError::HolderLimit { .. })));
    }

    #[test]
    fn test_removing_another_holder_is_signed_by_the_rest() {
        let h = Harness::new(meta(1000, 1000, None));
        let joint = h.three_holder_joint();

        let outcome = h
            .ledger
            .account_holder_remove(h.ctx(H1), &joint.to_string(), &h.personal(H2).to_string())
            .unwrap();

        let contract = outcome.contract().cloned().unwrap();
        assert_eq!(contract.signers, BTreeSet::from([H1.to_string(), H3.to_string()]));
        assert!(h.account(&joint).account.has_holder(H2));

        match h.execute(&contract).unwrap() {
            CallbackOutcome::Account(updated) => {
                assert_eq!(updated.account.holders(), BTreeSet::from([H1.to_string(), H3.to_string()]));
            }
            other => panic!("unexpected callback outcome {:?}", other),
        }
        assert!(!h.account(&joint).account.has_holder(H2));
    }

    #[test]
    fn test_removing_another_holder_keeps_the_minimum() {
        let h = Harness::new(meta(1000, 1000, None));
        let joint = h.joint();

        let result = h
            .ledger
            .account_holder_remove(h.ctx(H1), &joint.to_string(), &h.personal(H2).to_string());

        assert!(matches!(result, Err(LedgerError::HolderLimit { .. })));
        assert!(h.account(&joint).account.has_holder(H2));
    }

    #[test]
    fn test_account_list_pages_through_holdings() {
        let h = Harness::new(meta(1000, 1000, None));
        let joint = h.joint();
        let everything = h
            .ledger
            .account_list(h.ctx(H1), None, PageRequest::new(None, 200, SortOrder::Asc))
            .unwrap()
            .records;
        assert_eq!(everything.len(), 3);
        assert!(everything.iter().any(|row| row.address == joint));
        assert!(everything.iter().any(|row| row.address == h.genesis()));

        let pages = pages(|page| h.ledger.account_list(h.ctx(H1), Some("ABC"), page).unwrap());

        assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 1]);
        let paged: Vec<Address> = pages.into_iter().flatten().map(|row| row.address).collect();
        let listed: Vec<Address> = everything.into_iter().map(|row| row.address).collect();
        assert_eq!(paged, listed);
    }

    #[rstest]
    #[case::by_created_time(PendingSort::CreatedTime, false)]
    #[case::by_release_time(PendingSort::PendingTime, true)]
    fn test_pending_list_pages_in_sort_order(#[case] sort: PendingSort, #[case] reversed: bool) {
        let h = Harness::new(meta(1000, 1000, None));
        let sender = h.open(H2);
        let receiver = h.open(H3);
        h.fund(&sender, 100);

        let mut created = Vec::new();
        for i in 0..5 {
            let ctx = h.ctx(H2);
            created.push(ctx.tx_id().to_string());
            let request = TransferRequest {
                pending_time: Some(ctx.timestamp().plus_seconds(1000 - i * 100)),
                ..TransferRequest::new(receiver.to_string(), amount(10))
            };
            h.ledger.transfer(ctx, request).unwrap();
        }
        if reversed {
            created.reverse();
        }

        let pages = pages(|page| {
            h.ledger
                .pending_list(h.ctx(H3), &receiver.to_string(), sort, page)
                .unwrap()
        });

        assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        let ids: Vec<String> = pages.into_iter().flatten().map(|pending| pending.id).collect();
        assert_eq!(ids, created);
        let sender_side = h
            .ledger
            .pending_list(h.ctx(H2), &sender.to_string(), sort, PageRequest::default())
            .unwrap();
        assert!(sender_side.records.is_empty());
    }
}
