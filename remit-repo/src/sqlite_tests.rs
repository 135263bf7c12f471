//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use remit_types::{
        Actor, Currency, GatewayKind, KnownDevice, Money, Payment, PaymentStatus, Recipient,
        Transaction, TransactionId, TransactionStatus, TransferRepository, Transition,
    };

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    fn pending_transaction(user_id: Uuid, idempotency_key: Option<&str>) -> Transaction {
        let now = Utc::now();
        Transaction::from_parts(
            TransactionId::new(),
            user_id,
            Recipient::Email("recipient@example.com".into()),
            Money::new(50000, Currency::ZAR).unwrap(),
            Currency::USD,
            17.845,
            Money::new(1750, Currency::ZAR).unwrap(),
            12.0,
            vec!["new_device".into()],
            TransactionStatus::Pending,
            None,
            None,
            idempotency_key.map(String::from),
            now,
            now,
        )
    }

    #[tokio::test]
    async fn test_transaction_roundtrip() {
        let repo = setup_repo().await;
        let tx = pending_transaction(Uuid::new_v4(), Some("idem-1"));

        repo.create_transaction(&tx).await.unwrap();
        let fetched = repo.get_transaction(tx.id).await.unwrap().unwrap();

        assert_eq!(fetched.id, tx.id);
        assert_eq!(fetched.user_id, tx.user_id);
        assert_eq!(fetched.recipient, tx.recipient);
        assert_eq!(fetched.send_amount.amount(), 50000);
        assert_eq!(fetched.send_amount.currency(), Currency::ZAR);
        assert_eq!(fetched.destination_currency, Currency::USD);
        assert!((fetched.rate - 17.845).abs() < 1e-9);
        assert_eq!(fetched.fee.amount(), 1750);
        assert_eq!(fetched.risk_factors, vec!["new_device".to_string()]);
        assert_eq!(fetched.status, TransactionStatus::Pending);
        assert_eq!(fetched.idempotency_key.as_deref(), Some("idem-1"));
    }

    #[tokio::test]
    async fn test_get_transaction_not_found() {
        let repo = setup_repo().await;
        let result = repo.get_transaction(TransactionId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_idempotency_key_returns_existing() {
        let repo = setup_repo().await;
        let user_id = Uuid::new_v4();

        let first = pending_transaction(user_id, Some("idem-dup"));
        repo.create_transaction(&first).await.unwrap();

        // A second transaction with the same key collides on the UNIQUE
        // constraint and comes back as the original row.
        let second = pending_transaction(user_id, Some("idem-dup"));
        let returned = repo.create_transaction(&second).await.unwrap();

        assert_eq!(returned.id, first.id);
        assert_eq!(
            repo.list_transactions_for_user(user_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_guarded_status_update() {
        let repo = setup_repo().await;
        let mut tx = pending_transaction(Uuid::new_v4(), None);
        repo.create_transaction(&tx).await.unwrap();

        let event = tx
            .apply(
                Transition::Complete {
                    payment_reference: "ch_1".into(),
                },
                &Actor::Gateway(GatewayKind::Card),
                Utc::now(),
            )
            .unwrap();

        let applied = repo
            .update_transaction_status(
                tx.id,
                tx.status,
                None,
                tx.payment_reference.as_deref(),
                &event,
            )
            .await
            .unwrap();
        assert!(applied);

        let fetched = repo.get_transaction(tx.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TransactionStatus::Completed);
        assert_eq!(fetched.payment_reference.as_deref(), Some("ch_1"));

        // The guard refuses a second transition and appends no event.
        let again = repo
            .update_transaction_status(
                tx.id,
                TransactionStatus::Failed,
                Some("late webhook"),
                None,
                &event,
            )
            .await
            .unwrap();
        assert!(!again);

        let events = repo.list_events(tx.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from_status, TransactionStatus::Pending);
        assert_eq!(events[0].to_status, TransactionStatus::Completed);
        assert_eq!(events[0].actor, "gateway:card");
    }

    #[tokio::test]
    async fn test_list_pending_older_than() {
        let repo = setup_repo().await;
        let user_id = Uuid::new_v4();

        let mut stale = pending_transaction(user_id, None);
        stale.created_at = Utc::now() - Duration::hours(2);
        repo.create_transaction(&stale).await.unwrap();

        let fresh = pending_transaction(user_id, None);
        repo.create_transaction(&fresh).await.unwrap();

        let cutoff = Utc::now() - Duration::minutes(30);
        let found = repo.list_pending_older_than(cutoff).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, stale.id);
    }

    #[tokio::test]
    async fn test_payment_roundtrip_and_external_lookup() {
        let repo = setup_repo().await;
        let tx = pending_transaction(Uuid::new_v4(), None);
        repo.create_transaction(&tx).await.unwrap();

        let payment = Payment::new(
            tx.id,
            GatewayKind::Card,
            Money::new(51750, Currency::ZAR).unwrap(),
        );
        repo.create_payment(&payment).await.unwrap();

        let updated = repo
            .update_payment(
                payment.id,
                PaymentStatus::Pending,
                Some("ch_42"),
                &serde_json::json!({"provider_status": "processing"}),
            )
            .await
            .unwrap();
        assert!(updated);

        let found = repo
            .find_payment_by_external(GatewayKind::Card, "ch_42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, payment.id);
        assert_eq!(found.transaction_id, tx.id);
        assert_eq!(found.amount.amount(), 51750);

        // Wrong gateway does not match the reference.
        assert!(repo
            .find_payment_by_external(GatewayKind::Eft, "ch_42")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_terminal_payment_update_refused() {
        let repo = setup_repo().await;
        let tx = pending_transaction(Uuid::new_v4(), None);
        repo.create_transaction(&tx).await.unwrap();

        let payment = Payment::new(
            tx.id,
            GatewayKind::Eft,
            Money::new(51750, Currency::ZAR).unwrap(),
        );
        repo.create_payment(&payment).await.unwrap();

        assert!(repo
            .update_payment(
                payment.id,
                PaymentStatus::Succeeded,
                Some("tr_1"),
                &serde_json::Value::Null,
            )
            .await
            .unwrap());

        // Terminal: a duplicate delivery must not flip the status back.
        assert!(!repo
            .update_payment(
                payment.id,
                PaymentStatus::Failed,
                None,
                &serde_json::Value::Null,
            )
            .await
            .unwrap());

        let fetched = repo.get_payment(payment.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_user_history_aggregates() {
        let repo = setup_repo().await;
        let user_id = Uuid::new_v4();

        let mut old = pending_transaction(user_id, None);
        old.created_at = Utc::now() - Duration::days(60);
        repo.create_transaction(&old).await.unwrap();

        let mut failed = pending_transaction(user_id, None);
        repo.create_transaction(&failed).await.unwrap();
        let event = failed
            .apply(
                Transition::Fail {
                    reason: "timeout".into(),
                },
                &Actor::Reaper,
                Utc::now(),
            )
            .unwrap();
        repo.update_transaction_status(
            failed.id,
            failed.status,
            failed.failure_reason.as_deref(),
            None,
            &event,
        )
        .await
        .unwrap();

        repo.create_transaction(&pending_transaction(user_id, None))
            .await
            .unwrap();

        let window_start = Utc::now() - Duration::days(30);
        let history = repo.user_history(user_id, window_start).await.unwrap();

        // Two inside the window, one outside; average covers all three.
        assert_eq!(history.recent_count, 2);
        assert_eq!(history.average_amount, 50000);
        assert_eq!(history.failed_count, 1);

        // A user with no transactions gets all zeros.
        let empty = repo.user_history(Uuid::new_v4(), window_start).await.unwrap();
        assert_eq!(empty.recent_count, 0);
        assert_eq!(empty.average_amount, 0);
        assert_eq!(empty.failed_count, 0);
    }

    #[tokio::test]
    async fn test_device_upsert_refreshes_sighting() {
        let repo = setup_repo().await;
        let user_id = Uuid::new_v4();

        let first_seen = Utc::now() - Duration::days(3);
        repo.upsert_device(&KnownDevice {
            user_id,
            fingerprint: "fp_1".into(),
            country: "ZA".into(),
            latitude: -26.2,
            longitude: 28.0,
            last_seen_at: first_seen,
        })
        .await
        .unwrap();

        let now = Utc::now();
        repo.upsert_device(&KnownDevice {
            user_id,
            fingerprint: "fp_1".into(),
            country: "MW".into(),
            latitude: -13.9,
            longitude: 33.8,
            last_seen_at: now,
        })
        .await
        .unwrap();

        let device = repo.get_device(user_id, "fp_1").await.unwrap().unwrap();
        assert_eq!(device.country, "MW");
        assert!(device.last_seen_at > first_seen);

        assert!(repo.get_device(user_id, "fp_other").await.unwrap().is_none());
    }
}
